use serde::{Deserialize, Serialize};
use wandur_position::Point3;

/// Geofence radius for a standalone store without an explicit one (meters).
pub const DEFAULT_GEOFENCE_RADIUS: f64 = 50.0;

/// Geofence radius for a mall without an explicit one (meters).
pub const MALL_GEOFENCE_RADIUS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Mall,
    #[default]
    Standalone,
}

impl StoreKind {
    pub fn default_geofence_radius(self) -> f64 {
        match self {
            StoreKind::Mall => MALL_GEOFENCE_RADIUS,
            StoreKind::Standalone => DEFAULT_GEOFENCE_RADIUS,
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: StoreKind,
    /// Entrance marker in venue coordinates.
    pub location: Point3<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geofence_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Store {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: StoreKind,
        location: Point3<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            location,
            geofence_radius: None,
            tags: Vec::new(),
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.geofence_radius = Some(radius);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Configured radius, falling back to the default for the store kind.
    pub fn effective_radius(&self) -> f64 {
        self.geofence_radius
            .unwrap_or_else(|| self.kind.default_geofence_radius())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_radius_defaults_by_kind() {
        let mall = Store::new("m1", "Galleria", StoreKind::Mall, Point3::origin());
        let shop = Store::new("s1", "Lumen", StoreKind::Standalone, Point3::origin());

        assert_eq!(mall.effective_radius(), 100.0);
        assert_eq!(shop.effective_radius(), 50.0);
        assert_eq!(shop.with_radius(12.0).effective_radius(), 12.0);
    }

    #[test]
    fn test_deserialize_store_record() {
        let json = r#"{
            "id": "s1",
            "name": "Lumen Optics",
            "type": "mall",
            "location": [4.0, 0.0, 18.0],
            "tags": ["eyewear"]
        }"#;
        let store: Store = serde_json::from_str(json).unwrap();

        assert_eq!(store.kind, StoreKind::Mall);
        assert_eq!(store.location, Point3::new(4.0, 0.0, 18.0));
        assert_eq!(store.geofence_radius, None);
        assert_eq!(store.tags, vec!["eyewear"]);
    }
}
