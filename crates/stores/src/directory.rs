//! The store directory: an ordered, id-unique collection of stores.

use crate::error::{Result, StoreError};
use crate::store::Store;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use wandur_geofence::GeofenceZone;
use wandur_navigation::{Destination, DestinationResolver};

#[derive(Debug, Clone, Default)]
pub struct StoreDirectory {
    stores: BTreeMap<String, Store>,
}

impl StoreDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory, rejecting duplicate ids and invalid radii.
    pub fn from_stores(stores: impl IntoIterator<Item = Store>) -> Result<Self> {
        let mut directory = Self::new();
        for store in stores {
            directory.insert(store)?;
        }
        Ok(directory)
    }

    /// Parse a JSON array of store records.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let stores: Vec<Store> = serde_json::from_str(json)?;
        Self::from_stores(stores)
    }

    /// Load a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let directory = Self::from_json_str(&content)?;
        tracing::info!(path = %path.display(), stores = directory.len(), "loaded store catalog");
        Ok(directory)
    }

    pub fn insert(&mut self, store: Store) -> Result<()> {
        if let Some(radius) = store.geofence_radius {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(StoreError::InvalidRadius {
                    id: store.id,
                    radius,
                });
            }
        }
        if self.stores.contains_key(&store.id) {
            return Err(StoreError::DuplicateStore { id: store.id });
        }
        self.stores.insert(store.id.clone(), store);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Store> {
        self.stores.get(id)
    }

    /// Stores in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Store> {
        self.stores.values()
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Store> + 'a {
        self.stores
            .values()
            .filter(move |s| s.tags.iter().any(|t| t == tag))
    }

    /// One geofence zone per store, centered on its location.
    pub fn zones(&self, cooldown: Duration) -> Vec<GeofenceZone> {
        self.stores
            .values()
            .map(|store| {
                GeofenceZone::new(store.id.clone(), store.location, store.effective_radius())
                    .with_cooldown(cooldown)
                    .with_tags(store.tags.iter().cloned())
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl DestinationResolver for StoreDirectory {
    fn resolve(&self, store_id: &str) -> Option<Destination> {
        self.get(store_id)
            .map(|store| Destination::new(store.id.clone(), store.name.clone(), store.location))
    }
}
