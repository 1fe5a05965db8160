//! Cached reads over the database with a shared freshness window.
//!
//! Every collection the views render comes through here: a read within the
//! freshness window returns the cached copy, a successful mutation
//! invalidates the affected collection, and the marker-drag path applies an
//! optimistic patch that is rolled back to the pre-mutation snapshot if the
//! write fails.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::db::{Database, Location, LocationData, Photo, Store};
use crate::markers::clamp_percent;

/// Shared minimum freshness window for all cached collections.
pub const STALE_AFTER: Duration = Duration::from_secs(30);

struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> Cached<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

pub struct QueryCache {
    ttl: Duration,
    stores: Option<Cached<Vec<Store>>>,
    locations: HashMap<String, Cached<Vec<Location>>>,
    location_data: HashMap<String, Cached<Option<LocationData>>>,
    photos: HashMap<String, Cached<Vec<Photo>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_ttl(STALE_AFTER)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            stores: None,
            locations: HashMap::new(),
            location_data: HashMap::new(),
            photos: HashMap::new(),
        }
    }

    pub fn stores(&mut self, db: &Database) -> Result<Vec<Store>> {
        if let Some(cached) = &self.stores {
            if cached.is_fresh(self.ttl) {
                return Ok(cached.value.clone());
            }
        }
        let stores = db.list_stores()?;
        self.stores = Some(Cached::new(stores.clone()));
        Ok(stores)
    }

    pub fn locations(&mut self, db: &Database, store_id: &str) -> Result<Vec<Location>> {
        if let Some(cached) = self.locations.get(store_id) {
            if cached.is_fresh(self.ttl) {
                return Ok(cached.value.clone());
            }
        }
        let locations = db.list_locations(store_id)?;
        self.locations
            .insert(store_id.to_string(), Cached::new(locations.clone()));
        Ok(locations)
    }

    pub fn location_data(
        &mut self,
        db: &Database,
        location_id: &str,
    ) -> Result<Option<LocationData>> {
        if let Some(cached) = self.location_data.get(location_id) {
            if cached.is_fresh(self.ttl) {
                return Ok(cached.value.clone());
            }
        }
        let data = db.get_location_data(location_id)?;
        self.location_data
            .insert(location_id.to_string(), Cached::new(data.clone()));
        Ok(data)
    }

    pub fn photos(&mut self, db: &Database, location_id: &str) -> Result<Vec<Photo>> {
        if let Some(cached) = self.photos.get(location_id) {
            if cached.is_fresh(self.ttl) {
                return Ok(cached.value.clone());
            }
        }
        let photos = db.list_photos(location_id)?;
        self.photos
            .insert(location_id.to_string(), Cached::new(photos.clone()));
        Ok(photos)
    }

    pub fn invalidate_stores(&mut self) {
        self.stores = None;
    }

    pub fn invalidate_locations(&mut self, store_id: &str) {
        self.locations.remove(store_id);
    }

    pub fn invalidate_location_data(&mut self, location_id: &str) {
        self.location_data.remove(location_id);
    }

    pub fn invalidate_photos(&mut self, location_id: &str) {
        self.photos.remove(location_id);
    }

    pub fn invalidate_all(&mut self) {
        self.stores = None;
        self.locations.clear();
        self.location_data.clear();
        self.photos.clear();
    }

    /// Move a cached marker to its new position before running the mutation,
    /// so the view never snaps back while the write is in flight. On failure
    /// the cached list is restored to the pre-mutation snapshot; on success
    /// the collection is invalidated so the next read refetches.
    pub fn update_location_position<F>(
        &mut self,
        store_id: &str,
        location_id: &str,
        x: f64,
        y: f64,
        mutate: F,
    ) -> Result<()>
    where
        F: FnOnce(f64, f64) -> Result<()>,
    {
        let (x, y) = (clamp_percent(x), clamp_percent(y));
        let snapshot = self.locations.get(store_id).map(|c| c.value.clone());

        if let Some(cached) = self.locations.get_mut(store_id) {
            for location in &mut cached.value {
                if location.id == location_id {
                    location.x = x;
                    location.y = y;
                }
            }
        }

        match mutate(x, y) {
            Ok(()) => {
                self.invalidate_locations(store_id);
                Ok(())
            }
            Err(e) => {
                if let (Some(snapshot), Some(cached)) =
                    (snapshot, self.locations.get_mut(store_id))
                {
                    cached.value = snapshot;
                }
                Err(e)
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreForm;

    fn db_with_store() -> (Database, String) {
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
        (db, store.id)
    }

    #[test]
    fn test_fresh_read_hits_cache() {
        let (db, store_id) = db_with_store();
        let mut cache = QueryCache::new();
        assert_eq!(cache.locations(&db, &store_id).unwrap().len(), 0);

        // A write the cache has not seen stays invisible within the window
        db.create_location(&store_id, "M", 5.0, 5.0).unwrap();
        assert_eq!(cache.locations(&db, &store_id).unwrap().len(), 0);

        cache.invalidate_locations(&store_id);
        assert_eq!(cache.locations(&db, &store_id).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_ttl_always_refetches() {
        let (db, store_id) = db_with_store();
        let mut cache = QueryCache::with_ttl(Duration::ZERO);
        assert_eq!(cache.locations(&db, &store_id).unwrap().len(), 0);
        db.create_location(&store_id, "M", 5.0, 5.0).unwrap();
        assert_eq!(cache.locations(&db, &store_id).unwrap().len(), 1);
    }

    #[test]
    fn test_optimistic_update_applies_before_mutation_lands() {
        let (db, store_id) = db_with_store();
        let loc = db.create_location(&store_id, "M", 10.0, 10.0).unwrap();
        let mut cache = QueryCache::new();
        cache.locations(&db, &store_id).unwrap();

        cache
            .update_location_position(&store_id, &loc.id, 60.0, 70.0, |x, y| {
                db.update_location_position(&loc.id, x, y)
            })
            .unwrap();

        let fetched = db.get_location(&loc.id).unwrap().unwrap();
        assert_eq!((fetched.x, fetched.y), (60.0, 70.0));
        // Collection was invalidated, so the read reflects the new position
        let locations = cache.locations(&db, &store_id).unwrap();
        assert_eq!((locations[0].x, locations[0].y), (60.0, 70.0));
    }

    #[test]
    fn test_failed_mutation_restores_snapshot_exactly() {
        let (db, store_id) = db_with_store();
        let loc = db.create_location(&store_id, "M", 10.0, 10.0).unwrap();
        let mut cache = QueryCache::new();
        let before = cache.locations(&db, &store_id).unwrap();

        let err = cache.update_location_position(&store_id, &loc.id, 60.0, 70.0, |_, _| {
            anyhow::bail!("network down")
        });
        assert!(err.is_err());

        let after = cache.locations(&db, &store_id).unwrap();
        assert_eq!(before, after, "optimistic position must not survive a failure");
    }

    #[test]
    fn test_optimistic_update_clamps_coordinates() {
        let (db, store_id) = db_with_store();
        let loc = db.create_location(&store_id, "M", 10.0, 10.0).unwrap();
        let mut cache = QueryCache::new();
        cache.locations(&db, &store_id).unwrap();

        cache
            .update_location_position(&store_id, &loc.id, 150.0, -20.0, |x, y| {
                assert_eq!((x, y), (100.0, 0.0));
                db.update_location_position(&loc.id, x, y)
            })
            .unwrap();
    }
}
