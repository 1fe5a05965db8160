//! Store row CRUD and per-store completion stats.

use anyhow::Result;
use rusqlite::{params, Row};

use super::{new_id, now_timestamp, Database};

#[derive(Debug, Clone)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub location: String,
    pub address: String,
    pub floor_plan_path: Option<String>,
    pub manager: Option<String>,
    pub phone: Option<String>,
    pub last_edited_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Editable store fields as collected by the store form.
#[derive(Debug, Clone, Default)]
pub struct StoreForm {
    pub name: String,
    pub location: String,
    pub address: String,
    pub manager: Option<String>,
    pub phone: Option<String>,
}

/// Marker counts for the store list: a location counts as completed once it
/// has measurement data attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub total_locations: i64,
    pub completed_locations: i64,
}

fn row_to_store(row: &Row) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        address: row.get(3)?,
        floor_plan_path: row.get(4)?,
        manager: row.get(5)?,
        phone: row.get(6)?,
        last_edited_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const STORE_COLUMNS: &str = "id, name, location, address, floor_plan_path, manager, phone, last_edited_by, created_at, updated_at";

impl Database {
    pub fn list_stores(&self) -> Result<Vec<Store>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM stores ORDER BY name", STORE_COLUMNS))?;
        let stores = stmt
            .query_map([], row_to_store)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stores)
    }

    pub fn get_store(&self, id: &str) -> Result<Option<Store>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM stores WHERE id = ?", STORE_COLUMNS),
            [id],
            row_to_store,
        );
        match result {
            Ok(store) => Ok(Some(store)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_store(&self, form: &StoreForm, edited_by: Option<&str>) -> Result<Store> {
        let id = new_id();
        let now = now_timestamp();
        self.conn.execute(
            r#"
            INSERT INTO stores (id, name, location, address, manager, phone, last_edited_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                id,
                form.name,
                form.location,
                form.address,
                form.manager,
                form.phone,
                edited_by,
                now,
                now
            ],
        )?;
        Ok(Store {
            id,
            name: form.name.clone(),
            location: form.location.clone(),
            address: form.address.clone(),
            floor_plan_path: None,
            manager: form.manager.clone(),
            phone: form.phone.clone(),
            last_edited_by: edited_by.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn update_store(&self, id: &str, form: &StoreForm, edited_by: Option<&str>) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE stores
            SET name = ?, location = ?, address = ?, manager = ?, phone = ?,
                last_edited_by = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                form.name,
                form.location,
                form.address,
                form.manager,
                form.phone,
                edited_by,
                now_timestamp(),
                id
            ],
        )?;
        Ok(())
    }

    /// Point the store at a new floor-plan blob key.
    pub fn set_store_floor_plan(&self, id: &str, blob_key: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE stores SET floor_plan_path = ?, updated_at = ? WHERE id = ?",
            params![blob_key, now_timestamp(), id],
        )?;
        Ok(())
    }

    /// Delete a store. Locations, measurement data, and photo rows cascade;
    /// blob cleanup is the caller's responsibility.
    pub fn delete_store(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM stores WHERE id = ?", [id])?;
        Ok(())
    }

    pub fn store_stats(&self, id: &str) -> Result<StoreStats> {
        let stats = self.conn.query_row(
            r#"
            SELECT COUNT(l.id),
                   COUNT(d.id)
            FROM locations l
            LEFT JOIN location_data d ON d.location_id = l.id
            WHERE l.store_id = ?
            "#,
            [id],
            |row| {
                Ok(StoreStats {
                    total_locations: row.get(0)?,
                    completed_locations: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str) -> StoreForm {
        StoreForm {
            name: name.to_string(),
            location: "Downtown".to_string(),
            address: "1 Main St".to_string(),
            manager: Some("Sam".to_string()),
            phone: None,
        }
    }

    #[test]
    fn test_create_and_list_sorted_by_name() {
        let db = Database::open_in_memory().unwrap();
        db.create_store(&form("Zeta"), None).unwrap();
        db.create_store(&form("Alpha"), Some("pat")).unwrap();

        let stores = db.list_stores().unwrap();
        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].name, "Alpha");
        assert_eq!(stores[0].last_edited_by.as_deref(), Some("pat"));
        assert_eq!(stores[1].name, "Zeta");
    }

    #[test]
    fn test_update_store_fields() {
        let db = Database::open_in_memory().unwrap();
        let store = db.create_store(&form("Old"), None).unwrap();

        let mut updated = form("New");
        updated.phone = Some("555-0101".to_string());
        db.update_store(&store.id, &updated, Some("kim")).unwrap();

        let fetched = db.get_store(&store.id).unwrap().unwrap();
        assert_eq!(fetched.name, "New");
        assert_eq!(fetched.phone.as_deref(), Some("555-0101"));
        assert_eq!(fetched.last_edited_by.as_deref(), Some("kim"));
    }

    #[test]
    fn test_set_floor_plan_key() {
        let db = Database::open_in_memory().unwrap();
        let store = db.create_store(&form("S"), None).unwrap();
        db.set_store_floor_plan(&store.id, "s/floor-plan.jpg").unwrap();
        let fetched = db.get_store(&store.id).unwrap().unwrap();
        assert_eq!(fetched.floor_plan_path.as_deref(), Some("s/floor-plan.jpg"));
    }

    #[test]
    fn test_get_missing_store_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_store("nope").unwrap().is_none());
    }

    #[test]
    fn test_stats_count_completed_locations() {
        let db = Database::open_in_memory().unwrap();
        let store = db.create_store(&form("S"), None).unwrap();
        let a = db.create_location(&store.id, "A", 10.0, 10.0).unwrap();
        db.create_location(&store.id, "B", 20.0, 20.0).unwrap();

        let data = crate::db::LocationDataForm {
            measurement: crate::db::Measurement::Wall {
                description: "brick".to_string(),
            },
            notes: None,
            last_audit_date: None,
            last_install_date: None,
        };
        db.upsert_location_data(&a.id, &data, None).unwrap();

        let stats = db.store_stats(&store.id).unwrap();
        assert_eq!(stats.total_locations, 2);
        assert_eq!(stats.completed_locations, 1);
    }
}
