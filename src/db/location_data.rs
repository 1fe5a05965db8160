//! Measurement data attached to a location: at most one record, upserted
//! whole.
//!
//! The measurement payload is a tagged union keyed by `measurement_type`.
//! In Rust it is a sum type, so a record whose discriminator disagrees with
//! its payload shape cannot be constructed; rows written by other tools are
//! verified on read and rejected on mismatch.

use anyhow::{bail, Result};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::{new_id, now_timestamp, Database};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementType {
    Column,
    MirrorDoor,
    Wall,
}

impl MeasurementType {
    pub const ALL: [MeasurementType; 3] = [
        MeasurementType::Column,
        MeasurementType::MirrorDoor,
        MeasurementType::Wall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Column => "column",
            MeasurementType::MirrorDoor => "mirror_door",
            MeasurementType::Wall => "wall",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MeasurementType::Column => "Column",
            MeasurementType::MirrorDoor => "Mirror Door",
            MeasurementType::Wall => "Wall",
        }
    }
}

/// Measurement shapes, one variant per location type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Measurement {
    Column { front_back: String, sides: String },
    MirrorDoor { top: String, bottom: String },
    Wall { description: String },
}

impl Measurement {
    pub fn kind(&self) -> MeasurementType {
        match self {
            Measurement::Column { .. } => MeasurementType::Column,
            Measurement::MirrorDoor { .. } => MeasurementType::MirrorDoor,
            Measurement::Wall { .. } => MeasurementType::Wall,
        }
    }

    /// Empty measurement of the given type, for fresh forms.
    pub fn default_for(kind: MeasurementType) -> Self {
        match kind {
            MeasurementType::Column => Measurement::Column {
                front_back: String::new(),
                sides: String::new(),
            },
            MeasurementType::MirrorDoor => Measurement::MirrorDoor {
                top: String::new(),
                bottom: String::new(),
            },
            MeasurementType::Wall => Measurement::Wall {
                description: String::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationData {
    pub id: String,
    pub location_id: String,
    pub measurement: Measurement,
    pub notes: Option<String>,
    pub last_audit_date: Option<String>,
    pub last_install_date: Option<String>,
    pub last_edited_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields collected by the measurement form.
#[derive(Debug, Clone)]
pub struct LocationDataForm {
    pub measurement: Measurement,
    pub notes: Option<String>,
    pub last_audit_date: Option<String>,
    pub last_install_date: Option<String>,
}

fn row_to_location_data(row: &Row) -> rusqlite::Result<(LocationData, String)> {
    let measurements_json: String = row.get(3)?;
    let measurement: Measurement =
        serde_json::from_str(&measurements_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let stored_type: String = row.get(2)?;
    Ok((
        LocationData {
            id: row.get(0)?,
            location_id: row.get(1)?,
            measurement,
            notes: row.get(4)?,
            last_audit_date: row.get(5)?,
            last_install_date: row.get(6)?,
            last_edited_by: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        },
        stored_type,
    ))
}

impl Database {
    pub fn get_location_data(&self, location_id: &str) -> Result<Option<LocationData>> {
        let result = self.conn.query_row(
            r#"
            SELECT id, location_id, measurement_type, measurements,
                   notes, last_audit_date, last_install_date, last_edited_by,
                   created_at, updated_at
            FROM location_data
            WHERE location_id = ?
            "#,
            [location_id],
            row_to_location_data,
        );
        match result {
            Ok((data, stored_type)) => {
                if data.measurement.kind().as_str() != stored_type {
                    bail!(
                        "measurement shape '{}' does not match stored type '{}' for location {}",
                        data.measurement.kind().as_str(),
                        stored_type,
                        location_id
                    );
                }
                Ok(Some(data))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert or replace the whole measurement record for a location.
    pub fn upsert_location_data(
        &self,
        location_id: &str,
        form: &LocationDataForm,
        edited_by: Option<&str>,
    ) -> Result<LocationData> {
        let now = now_timestamp();
        let measurement_type = form.measurement.kind().as_str();
        let measurements_json = serde_json::to_string(&form.measurement)?;
        let id = new_id();
        self.conn.execute(
            r#"
            INSERT INTO location_data
                (id, location_id, measurement_type, measurements,
                 notes, last_audit_date, last_install_date, last_edited_by,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(location_id) DO UPDATE SET
                measurement_type = excluded.measurement_type,
                measurements = excluded.measurements,
                notes = excluded.notes,
                last_audit_date = excluded.last_audit_date,
                last_install_date = excluded.last_install_date,
                last_edited_by = excluded.last_edited_by,
                updated_at = excluded.updated_at
            "#,
            params![
                id,
                location_id,
                measurement_type,
                measurements_json,
                form.notes,
                form.last_audit_date,
                form.last_install_date,
                edited_by,
                now,
                now
            ],
        )?;
        self.get_location_data(location_id)?
            .ok_or_else(|| anyhow::anyhow!("location_data vanished after upsert"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreForm;

    fn db_with_location() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let store = db
            .create_store(
                &StoreForm {
                    name: "S".to_string(),
                    location: "L".to_string(),
                    address: "A".to_string(),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        let location = db.create_location(&store.id, "M", 5.0, 5.0).unwrap();
        (db, location.id)
    }

    fn column_form() -> LocationDataForm {
        LocationDataForm {
            measurement: Measurement::Column {
                front_back: "42cm".to_string(),
                sides: "30cm".to_string(),
            },
            notes: Some("needs repaint".to_string()),
            last_audit_date: Some("2026-08-01".to_string()),
            last_install_date: None,
        }
    }

    #[test]
    fn test_upsert_then_read_back() {
        let (db, location_id) = db_with_location();
        let data = db
            .upsert_location_data(&location_id, &column_form(), Some("pat"))
            .unwrap();
        assert_eq!(data.measurement.kind(), MeasurementType::Column);
        assert_eq!(data.notes.as_deref(), Some("needs repaint"));
        assert_eq!(data.last_edited_by.as_deref(), Some("pat"));
    }

    #[test]
    fn test_upsert_replaces_whole_record() {
        let (db, location_id) = db_with_location();
        db.upsert_location_data(&location_id, &column_form(), None)
            .unwrap();

        let wall = LocationDataForm {
            measurement: Measurement::Wall {
                description: "plaster, 3m".to_string(),
            },
            notes: None,
            last_audit_date: None,
            last_install_date: Some("2026-02-14".to_string()),
        };
        let data = db.upsert_location_data(&location_id, &wall, None).unwrap();
        assert_eq!(data.measurement.kind(), MeasurementType::Wall);
        assert!(data.notes.is_none());
        assert_eq!(data.last_install_date.as_deref(), Some("2026-02-14"));

        // Still exactly one row for the location
        let count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM location_data WHERE location_id = ?",
                [location_id.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_mismatched_discriminator_is_rejected_on_read() {
        let (db, location_id) = db_with_location();
        db.upsert_location_data(&location_id, &column_form(), None)
            .unwrap();

        // Corrupt the row the way a foreign writer could
        db.conn
            .execute(
                "UPDATE location_data SET measurement_type = 'wall' WHERE location_id = ?",
                [location_id.as_str()],
            )
            .unwrap();

        let err = db.get_location_data(&location_id).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_deleting_location_cascades_to_data() {
        let (db, location_id) = db_with_location();
        db.upsert_location_data(&location_id, &column_form(), None)
            .unwrap();
        db.delete_location(&location_id).unwrap();
        assert!(db.get_location_data(&location_id).unwrap().is_none());
    }

    #[test]
    fn test_measurement_serde_tag() {
        let m = Measurement::MirrorDoor {
            top: "180cm".to_string(),
            bottom: "175cm".to_string(),
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"type\":\"mirror_door\""));
        assert_eq!(serde_json::from_str::<Measurement>(&json).unwrap(), m);
    }
}
