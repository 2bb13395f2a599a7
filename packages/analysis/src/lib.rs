#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analysis pipelines for the safety map.
//!
//! Three pipelines sit on top of the geo query gateway:
//!
//! 1. **Proximity** ([`proximity`]): for every named location, query the
//!    emergency services within a radius, classify and count them, and
//!    aggregate a region summary. Locations are queried concurrently; each
//!    query returns its own result and a single merge step combines them in
//!    name order.
//! 2. **Nearest route** ([`route`]): pick the facility of a chosen type
//!    closest to a named location and produce the route request for an
//!    external routing engine.
//! 3. **District** ([`district`]): filter emergency and tourism features
//!    to a reference polygon and tally them for popups.
//!
//! [`session::Session`] owns the state between UI events (zoom, toggles,
//! the latest reports) and exposes the entry points the UI calls.

pub mod config;
pub mod district;
pub mod proximity;
pub mod route;
pub mod session;

use safety_map_classify::ServiceCategory;
use safety_map_overpass::OverpassError;
use safety_map_spatial::SpatialError;
use thiserror::Error;

pub use config::AppConfig;
pub use session::Session;

/// Errors from analysis operations.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A gateway query failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] OverpassError),

    /// A boundary document could not be used.
    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// A configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration values are inconsistent.
    #[error("Invalid config: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },

    /// No named location has this key.
    #[error("Unknown location: {key}")]
    UnknownLocation {
        /// The key that was requested.
        key: String,
    },

    /// Search radius was zero, negative, or not finite.
    #[error("Invalid radius: {radius_m}")]
    InvalidRadius {
        /// The rejected radius in meters.
        radius_m: f64,
    },

    /// The category cannot be searched for.
    #[error("Unsupported service category: {category}")]
    UnsupportedCategory {
        /// The rejected category.
        category: ServiceCategory,
    },

    /// A spatial query needed the reference region before it was loaded.
    #[error("Reference region not loaded")]
    NoReferenceGeometry,

    /// The nearest-facility search had nothing to choose from.
    #[error("No {category} facilities found")]
    NoCandidates {
        /// The searched category.
        category: ServiceCategory,
    },
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use safety_map_overpass::{FeatureFilter, FeatureSource, OverpassError, QueryArea};
    use safety_map_overpass_models::{ElementType, RawFeature};
    use safety_map_poi_models::{Coordinates, LocationCategory, NamedLocation};

    pub fn feature(id: i64, tags: &[(&str, &str)], position: Option<Coordinates>) -> RawFeature {
        RawFeature {
            id,
            element_type: ElementType::Node,
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
            position,
        }
    }

    pub fn location(key: &str, name: &str, lat: f64, lon: f64) -> NamedLocation {
        NamedLocation {
            key: key.to_string(),
            name: name.to_string(),
            category: LocationCategory::School,
            coordinates: Coordinates::new(lat, lon),
        }
    }

    /// What a stub query should return.
    #[derive(Clone)]
    pub enum Canned {
        Features(Vec<RawFeature>),
        Fail,
    }

    /// Canned gateway keyed by the area's center latitude (for `Around`
    /// queries) or by filter (for bounding-box queries).
    #[derive(Default)]
    pub struct StubSource {
        pub around: Vec<(f64, Canned)>,
        pub bounded: Vec<(FeatureFilter, Canned)>,
        /// Queries with exactly this radius sleep before answering.
        pub slow_radius: Option<(f64, Duration)>,
        /// Bounding-box queries with this filter sleep before answering.
        pub slow_filter: Option<(FeatureFilter, Duration)>,
    }

    #[async_trait]
    impl FeatureSource for StubSource {
        async fn query_features(
            &self,
            area: &QueryArea,
            filter: &FeatureFilter,
        ) -> Result<Vec<RawFeature>, OverpassError> {
            let canned = match area {
                QueryArea::Around { center, radius_m } => {
                    let delay = self
                        .slow_radius
                        .filter(|(slow, _)| (slow - radius_m).abs() < f64::EPSILON)
                        .map(|(_, delay)| delay);
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    self.around
                        .iter()
                        .find(|(lat, _)| (lat - center.lat).abs() < 1e-9)
                        .map(|(_, canned)| canned.clone())
                }
                QueryArea::Bounds(_) => {
                    let delay = self
                        .slow_filter
                        .as_ref()
                        .filter(|(slow, _)| slow == filter)
                        .map(|(_, delay)| *delay);
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    self.bounded
                        .iter()
                        .find(|(f, _)| f == filter)
                        .map(|(_, canned)| canned.clone())
                }
            };

            match canned {
                Some(Canned::Features(features)) => Ok(features),
                Some(Canned::Fail) => Err(OverpassError::Status { status: 504 }),
                None => Ok(Vec::new()),
            }
        }
    }
}
