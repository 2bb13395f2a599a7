//! Application configuration.
//!
//! Defaults are embedded from `config/default.toml` at compile time. A
//! user file with the same layout replaces them wholesale, and the
//! `OVERPASS_URL` environment variable overrides the gateway endpoint
//! either way.

use std::collections::BTreeSet;
use std::path::Path;

use safety_map_overpass::{BoundingBox, OverpassConfig};
use safety_map_poi_models::NamedLocation;
use safety_map_visibility::VisibilityConfig;
use serde::Deserialize;

use crate::AnalysisError;

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Environment variable that overrides [`OverpassConfig::endpoint`].
pub const OVERPASS_URL_ENV: &str = "OVERPASS_URL";

/// Map view settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MapConfig {
    /// Zoom the session starts at.
    pub initial_zoom: i32,
    /// Layer zoom thresholds.
    #[serde(flatten)]
    pub visibility: VisibilityConfig,
}

/// Fixed query regions.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RegionConfig {
    /// Box searched for district emergency and tourism features
    /// (`[south, west, north, east]`).
    pub district_bbox: [f64; 4],
    /// Box searched for nearest-route candidates.
    pub route_bbox: [f64; 4],
}

impl RegionConfig {
    /// District search box.
    #[must_use]
    pub fn district(&self) -> BoundingBox {
        self.district_bbox.into()
    }

    /// Route search box.
    #[must_use]
    pub fn route(&self) -> BoundingBox {
        self.route_bbox.into()
    }
}

/// Proximity analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ProximityConfig {
    /// Radius used when the caller does not give one.
    pub default_radius_m: f64,
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Gateway settings.
    #[serde(default)]
    pub overpass: OverpassConfig,
    /// Map view settings.
    pub map: MapConfig,
    /// Query regions.
    pub region: RegionConfig,
    /// Proximity settings.
    pub proximity: ProximityConfig,
    /// Named locations, fixed for the life of the process.
    pub locations: Vec<NamedLocation>,
}

impl AppConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the TOML is malformed or fails
    /// validation.
    pub fn from_toml_str(text: &str) -> Result<Self, AnalysisError> {
        let config: Self = toml::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the embedded file is invalid.
    pub fn embedded() -> Result<Self, AnalysisError> {
        Self::from_toml_str(DEFAULT_TOML)
    }

    /// Loads `path` if given, otherwise the embedded defaults, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, AnalysisError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_toml_str(&std::fs::read_to_string(path)?)?
            }
            None => Self::embedded()?,
        };

        if let Some(endpoint) = std::env::var(OVERPASS_URL_ENV)
            .ok()
            .filter(|endpoint| !endpoint.is_empty())
        {
            log::info!("Using Overpass endpoint from {OVERPASS_URL_ENV}: {endpoint}");
            config.overpass.endpoint = endpoint;
        }

        Ok(config)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |message: String| Err(AnalysisError::InvalidConfig { message });

        if self.locations.is_empty() {
            return invalid("at least one location is required".to_string());
        }

        let mut keys = BTreeSet::new();
        for location in &self.locations {
            if !keys.insert(location.key.to_ascii_lowercase()) {
                return invalid(format!("duplicate location key '{}'", location.key));
            }
        }

        let radius = self.proximity.default_radius_m;
        if !radius.is_finite() || radius <= 0.0 {
            return invalid(format!("default_radius_m must be positive, got {radius}"));
        }

        if self.overpass.timeout_secs == 0 {
            return invalid("overpass.timeout_secs must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use safety_map_poi_models::LocationCategory;

    use super::*;

    #[test]
    fn embedded_defaults_are_valid() {
        let config = AppConfig::embedded().unwrap();
        assert_eq!(config.locations.len(), 4);
        assert_eq!(config.map.visibility.zoom_threshold, 11);
        assert_eq!(config.map.visibility.marker_zoom, 13);
        assert_eq!(config.overpass.timeout_secs, 25);
        assert_eq!(config.region.route().south, 27.5);
    }

    #[test]
    fn location_keys_are_unique() {
        let config = AppConfig::embedded().unwrap();
        let keys: BTreeSet<_> = config.locations.iter().map(|l| l.key.as_str()).collect();
        assert_eq!(keys.len(), config.locations.len());
    }

    #[test]
    fn university_location_round_trips() {
        let config = AppConfig::embedded().unwrap();
        let university = config
            .locations
            .iter()
            .find(|l| l.key == "university")
            .unwrap();
        assert_eq!(university.category, LocationCategory::University);
        assert!((university.coordinates.lon - 85.538_791_654).abs() < 1e-6);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let text = DEFAULT_TOML.replace(r#"key = "school""#, r#"key = "home""#);
        assert!(matches!(
            AppConfig::from_toml_str(&text),
            Err(AnalysisError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_zero_radius() {
        let text = DEFAULT_TOML.replace("default_radius_m = 1000.0", "default_radius_m = 0.0");
        assert!(matches!(
            AppConfig::from_toml_str(&text),
            Err(AnalysisError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn missing_overpass_section_uses_defaults() {
        let text = DEFAULT_TOML
            .replace("[overpass]", "[unused]")
            .replace("endpoint =", "ignored_endpoint =")
            .replace("timeout_secs =", "ignored_timeout =");
        let config = AppConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.overpass, OverpassConfig::default());
    }
}
