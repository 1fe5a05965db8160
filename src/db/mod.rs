mod schema;
pub mod location_data;
pub mod locations;
pub mod photos;
pub mod stores;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub use location_data::{LocationData, LocationDataForm, Measurement, MeasurementType};
pub use locations::Location;
pub use photos::{Photo, PhotoKind};
pub use stores::{Store, StoreForm, StoreStats};

use schema::{MIGRATIONS, SCHEMA};

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (or create) the database file. Foreign keys are switched on so
    /// store and location deletes cascade to their dependents.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            // Ignore "duplicate column" failures on already-migrated files
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }
}

/// UTC timestamp in the format stored throughout the database.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Fresh row identifier.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_are_rfc3339_utc() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
