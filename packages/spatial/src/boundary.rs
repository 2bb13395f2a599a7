//! Reference region used to filter features to an administrative area.

use geo::MultiPolygon;
use safety_map_overpass_models::RawFeature;
use safety_map_poi_models::Coordinates;

use crate::{SpatialError, area_sq_km, feature_to_multipolygon, parse_features, within_polygon};

/// A polygonal region loaded once from a boundary document.
#[derive(Debug, Clone)]
pub struct ReferenceRegion {
    name: Option<String>,
    polygon: MultiPolygon<f64>,
    area_sq_km: f64,
}

impl ReferenceRegion {
    /// Builds a region from an already-parsed polygon.
    #[must_use]
    pub fn new(name: Option<String>, polygon: MultiPolygon<f64>) -> Self {
        let area_sq_km = area_sq_km(&polygon);
        Self {
            name,
            polygon,
            area_sq_km,
        }
    }

    /// Loads the first feature of a `GeoJSON` document as the region.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the document is invalid, empty, or its
    /// first feature is not a polygon.
    pub fn from_geojson_str(text: &str) -> Result<Self, SpatialError> {
        let features = parse_features(text)?;
        let first = features.first().ok_or(SpatialError::NoFeatures)?;
        let polygon = feature_to_multipolygon(first)?;
        let name = first
            .property("name")
            .and_then(|value| value.as_str())
            .map(String::from);

        let region = Self::new(name, polygon);
        log::info!(
            "Loaded reference region {} ({:.2} sq.km)",
            region.name().unwrap_or("<unnamed>"),
            region.area_sq_km
        );
        Ok(region)
    }

    /// Region name from the `name` property, if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Region geometry.
    #[must_use]
    pub const fn polygon(&self) -> &MultiPolygon<f64> {
        &self.polygon
    }

    /// Spherical area in square kilometers.
    #[must_use]
    pub const fn area_sq_km(&self) -> f64 {
        self.area_sq_km
    }

    /// Whether `at` falls inside the region (boundary included).
    #[must_use]
    pub fn contains(&self, at: Coordinates) -> bool {
        within_polygon(at, &self.polygon)
    }

    /// Keeps the features positioned inside the region. Features without
    /// a position are dropped.
    #[must_use]
    pub fn filter_inside(&self, features: Vec<RawFeature>) -> Vec<RawFeature> {
        let before = features.len();
        let inside: Vec<RawFeature> = features
            .into_iter()
            .filter(|feature| feature.position.is_some_and(|at| self.contains(at)))
            .collect();
        log::debug!("{} of {before} features inside region", inside.len());
        inside
    }
}
