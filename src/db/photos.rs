//! Photo rows: blob keys plus uploader metadata, grouped by kind.

use anyhow::Result;
use rusqlite::{params, Row};

use super::{now_timestamp, Database};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoKind {
    Audit,
    Install,
    Brief,
}

impl PhotoKind {
    pub const ALL: [PhotoKind; 3] = [PhotoKind::Audit, PhotoKind::Install, PhotoKind::Brief];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoKind::Audit => "audit",
            PhotoKind::Install => "install",
            PhotoKind::Brief => "brief",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PhotoKind::Audit => "Audit Photos",
            PhotoKind::Install => "Install Photos",
            PhotoKind::Brief => "Brief Photos",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "audit" => Some(PhotoKind::Audit),
            "install" => Some(PhotoKind::Install),
            "brief" => Some(PhotoKind::Brief),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Photo {
    pub id: String,
    pub location_id: String,
    pub kind: PhotoKind,
    pub storage_path: String,
    pub thumbnail_path: String,
    pub uploaded_by: Option<String>,
    pub uploaded_at: String,
}

fn row_to_photo(row: &Row) -> rusqlite::Result<Photo> {
    let kind_str: String = row.get(2)?;
    let kind = PhotoKind::from_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown photo kind '{}'", kind_str).into(),
        )
    })?;
    Ok(Photo {
        id: row.get(0)?,
        location_id: row.get(1)?,
        kind,
        storage_path: row.get(3)?,
        thumbnail_path: row.get(4)?,
        uploaded_by: row.get(5)?,
        uploaded_at: row.get(6)?,
    })
}

const PHOTO_COLUMNS: &str =
    "id, location_id, kind, storage_path, thumbnail_path, uploaded_by, uploaded_at";

impl Database {
    pub fn list_photos(&self, location_id: &str) -> Result<Vec<Photo>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM photos WHERE location_id = ? ORDER BY uploaded_at DESC",
            PHOTO_COLUMNS
        ))?;
        let photos = stmt
            .query_map([location_id], row_to_photo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    pub fn list_photos_by_kind(&self, location_id: &str, kind: PhotoKind) -> Result<Vec<Photo>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM photos WHERE location_id = ? AND kind = ? ORDER BY uploaded_at DESC",
            PHOTO_COLUMNS
        ))?;
        let photos = stmt
            .query_map(params![location_id, kind.as_str()], row_to_photo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    pub fn get_photo(&self, id: &str) -> Result<Option<Photo>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM photos WHERE id = ?", PHOTO_COLUMNS),
            [id],
            row_to_photo,
        );
        match result {
            Ok(photo) => Ok(Some(photo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Record a photo whose blobs are already persisted. The id is supplied
    /// by the caller because it names the blob keys.
    pub fn insert_photo(
        &self,
        id: &str,
        location_id: &str,
        kind: PhotoKind,
        storage_path: &str,
        thumbnail_path: &str,
        uploaded_by: Option<&str>,
    ) -> Result<Photo> {
        let now = now_timestamp();
        self.conn.execute(
            r#"
            INSERT INTO photos (id, location_id, kind, storage_path, thumbnail_path, uploaded_by, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                id,
                location_id,
                kind.as_str(),
                storage_path,
                thumbnail_path,
                uploaded_by,
                now
            ],
        )?;
        Ok(Photo {
            id: id.to_string(),
            location_id: location_id.to_string(),
            kind,
            storage_path: storage_path.to_string(),
            thumbnail_path: thumbnail_path.to_string(),
            uploaded_by: uploaded_by.map(str::to_string),
            uploaded_at: now,
        })
    }

    pub fn delete_photo(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM photos WHERE id = ?", [id])?;
        Ok(())
    }
}
