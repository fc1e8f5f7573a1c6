//! Destination lookup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use wandur_position::Point3;

/// A resolved navigation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub store_id: String,
    pub store_name: String,
    pub point: Point3<f64>,
}

impl Destination {
    pub fn new(store_id: impl Into<String>, store_name: impl Into<String>, point: Point3<f64>) -> Self {
        Self {
            store_id: store_id.into(),
            store_name: store_name.into(),
            point,
        }
    }
}

/// Resolves store identifiers to destinations (the store catalog).
pub trait DestinationResolver: Send + Sync {
    fn resolve(&self, store_id: &str) -> Option<Destination>;
}

impl<T: DestinationResolver + ?Sized> DestinationResolver for Arc<T> {
    fn resolve(&self, store_id: &str) -> Option<Destination> {
        (**self).resolve(store_id)
    }
}

/// Fixed in-memory resolver, handy for tests and single-venue setups.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    destinations: HashMap<String, Destination>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, destination: Destination) -> Self {
        self.insert(destination);
        self
    }

    pub fn insert(&mut self, destination: Destination) {
        self.destinations
            .insert(destination.store_id.clone(), destination);
    }
}

impl DestinationResolver for StaticResolver {
    fn resolve(&self, store_id: &str) -> Option<Destination> {
        self.destinations.get(store_id).cloned()
    }
}
