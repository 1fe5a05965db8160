//! Location (marker) row CRUD.
//!
//! Coordinates are percentages in [0, 100] on the store's floor plan. Every
//! write path clamps them so a bad caller can never persist an off-plan
//! marker.

use anyhow::Result;
use rusqlite::{params, Row};

use super::{new_id, now_timestamp, Database};
use crate::markers::clamp_percent;

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub created_at: String,
    pub updated_at: String,
}

fn row_to_location(row: &Row) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        store_id: row.get(1)?,
        name: row.get(2)?,
        x: row.get(3)?,
        y: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const LOCATION_COLUMNS: &str = "id, store_id, name, x, y, created_at, updated_at";

impl Database {
    pub fn list_locations(&self, store_id: &str) -> Result<Vec<Location>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM locations WHERE store_id = ? ORDER BY name",
            LOCATION_COLUMNS
        ))?;
        let locations = stmt
            .query_map([store_id], row_to_location)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(locations)
    }

    pub fn get_location(&self, id: &str) -> Result<Option<Location>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM locations WHERE id = ?", LOCATION_COLUMNS),
            [id],
            row_to_location,
        );
        match result {
            Ok(location) => Ok(Some(location)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_location(&self, store_id: &str, name: &str, x: f64, y: f64) -> Result<Location> {
        let id = new_id();
        let now = now_timestamp();
        let (x, y) = (clamp_percent(x), clamp_percent(y));
        self.conn.execute(
            r#"
            INSERT INTO locations (id, store_id, name, x, y, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![id, store_id, name, x, y, now, now],
        )?;
        Ok(Location {
            id,
            store_id: store_id.to_string(),
            name: name.to_string(),
            x,
            y,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Persist the final position of a drag, clamped per axis.
    pub fn update_location_position(&self, id: &str, x: f64, y: f64) -> Result<()> {
        self.conn.execute(
            "UPDATE locations SET x = ?, y = ?, updated_at = ? WHERE id = ?",
            params![clamp_percent(x), clamp_percent(y), now_timestamp(), id],
        )?;
        Ok(())
    }

    pub fn rename_location(&self, id: &str, name: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE locations SET name = ?, updated_at = ? WHERE id = ?",
            params![name, now_timestamp(), id],
        )?;
        Ok(())
    }

    /// Delete a location. Measurement data and photo rows cascade; blob
    /// cleanup is the caller's responsibility.
    pub fn delete_location(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM locations WHERE id = ?", [id])?;
        Ok(())
    }
}
