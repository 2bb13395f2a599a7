#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Structured presentation data for the safety map.
//!
//! Pipelines produce plain data objects ([`LocationSummary`],
//! [`RegionSummary`], [`FeatureDot`], [`DistrictPopup`], [`NearestPopup`]);
//! turning them into markup or terminal text is the job of a
//! [`render::Renderer`], so the output format can be swapped without
//! touching the analysis code.

pub mod render;

use safety_map_classify::{AmenityCounts, CountSummary, TourismCounts};
use safety_map_overpass_models::RawFeature;
use safety_map_poi_models::{Coordinates, LocationCategory, NamedLocation};
use serde::Serialize;

pub use render::{HtmlRenderer, Renderer, TextRenderer};

/// Whether a location has emergency coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SafetyStatus {
    /// The query returned at least one feature.
    Safe,
    /// The query succeeded and returned nothing.
    NotSafe,
    /// The query failed, so coverage is unknown.
    DataUnavailable,
}

/// Per-location result of a proximity run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    /// Location name.
    pub name: String,
    /// Kind of place.
    pub category: LocationCategory,
    /// Location position.
    pub coordinates: Coordinates,
    /// Coverage verdict.
    pub status: SafetyStatus,
    /// Tracked service counts (all zero when unavailable).
    pub counts: CountSummary,
    /// Failure description when `status` is [`SafetyStatus::DataUnavailable`].
    pub unavailable_reason: Option<String>,
}

impl LocationSummary {
    /// Summary for a location whose query succeeded. `found` is the number
    /// of features returned (tracked or not).
    #[must_use]
    pub fn available(location: &NamedLocation, counts: CountSummary, found: usize) -> Self {
        Self {
            name: location.name.clone(),
            category: location.category,
            coordinates: location.coordinates,
            status: if found > 0 {
                SafetyStatus::Safe
            } else {
                SafetyStatus::NotSafe
            },
            counts,
            unavailable_reason: None,
        }
    }

    /// Summary for a location whose query failed.
    #[must_use]
    pub fn unavailable(location: &NamedLocation, reason: impl Into<String>) -> Self {
        Self {
            name: location.name.clone(),
            category: location.category,
            coordinates: location.coordinates,
            status: SafetyStatus::DataUnavailable,
            counts: CountSummary::default(),
            unavailable_reason: Some(reason.into()),
        }
    }
}

/// Region-wide totals across every location of a proximity run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    /// Summed counts over locations with data.
    pub totals: CountSummary,
    /// Names of locations whose query failed.
    pub unavailable: Vec<String>,
}

impl RegionSummary {
    /// Aggregates location summaries. Unavailable locations contribute no
    /// counts and are listed by name instead.
    #[must_use]
    pub fn build(locations: &[LocationSummary]) -> Self {
        let totals = locations.iter().map(|l| l.counts).sum();
        let unavailable = locations
            .iter()
            .filter(|l| l.status == SafetyStatus::DataUnavailable)
            .map(|l| l.name.clone())
            .collect();
        Self {
            totals,
            unavailable,
        }
    }
}

/// A single feature marker with its popup content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDot {
    /// Bold first line (feature type).
    pub heading: String,
    /// Feature name.
    pub name: String,
    /// Feature position.
    pub coordinates: Coordinates,
    /// Decimal places for the coordinate line.
    pub precision: usize,
}

const UNNAMED: &str = "Unnamed";
const UNKNOWN: &str = "Unknown";

impl FeatureDot {
    /// Dot for the proximity view: heading is the raw `amenity`.
    /// Returns `None` for features without a position.
    #[must_use]
    pub fn proximity(feature: &RawFeature) -> Option<Self> {
        Some(Self {
            heading: feature.amenity().unwrap_or(UNKNOWN).to_string(),
            name: feature.name().unwrap_or(UNNAMED).to_string(),
            coordinates: feature.position?,
            precision: 5,
        })
    }

    /// Marker for the district emergency layer: heading is the amenity
    /// with underscores shown as spaces, falling back to the `police` tag.
    #[must_use]
    pub fn emergency(feature: &RawFeature) -> Option<Self> {
        let kind = feature
            .amenity()
            .or_else(|| feature.tag("police"))
            .unwrap_or(UNKNOWN);
        Some(Self {
            heading: kind.replace('_', " "),
            name: feature.name().unwrap_or(UNNAMED).to_string(),
            coordinates: feature.position?,
            precision: 4,
        })
    }

    /// Marker for the district tourism layer.
    #[must_use]
    pub fn tourism(feature: &RawFeature) -> Option<Self> {
        Some(Self {
            heading: format!("Type: {}", feature.tag("tourism").unwrap_or(UNKNOWN)),
            name: feature.name().unwrap_or(UNNAMED).to_string(),
            coordinates: feature.position?,
            precision: 4,
        })
    }
}

/// Popup for a click inside the reference district.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictPopup {
    /// District name, if the boundary carried one.
    pub district: Option<String>,
    /// Clicked position.
    pub at: Coordinates,
    /// District area in square kilometers.
    pub area_sq_km: f64,
    /// Emergency tally, when the emergency toggle is on.
    pub emergency: Option<AmenityCounts>,
    /// Tourism tally, when the tourism toggle is on.
    pub tourism: Option<TourismCounts>,
}

/// Popup for the facility chosen by a nearest-route request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestPopup {
    /// Requested service, spaced for display (e.g. "fire station").
    pub service: String,
    /// Facility name or "Unnamed".
    pub facility: String,
    /// Facility position.
    pub at: Coordinates,
    /// Great-circle distance from the origin in meters.
    pub distance_m: f64,
}

impl NearestPopup {
    /// Builds the popup for `feature`, which must have a position.
    #[must_use]
    pub fn new(service: &str, feature: &RawFeature, distance_m: f64) -> Option<Self> {
        Some(Self {
            service: service.replace('_', " "),
            facility: feature.name().unwrap_or(UNNAMED).to_string(),
            at: feature.position?,
            distance_m,
        })
    }
}
