//! Region-wide tallies for the district view.
//!
//! Unlike [`crate::CountSummary`], these count raw tag values: clinics
//! stay separate from hospitals, and tourism features are bucketed by
//! whatever their `tourism` tag says.

use std::collections::BTreeMap;

use safety_map_overpass_models::RawFeature;
use serde::{Deserialize, Serialize};

/// Emergency amenities by raw `amenity` value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenityCounts {
    /// `amenity=hospital`.
    pub hospital: u64,
    /// `amenity=clinic`.
    pub clinic: u64,
    /// `amenity=police`.
    pub police: u64,
    /// `amenity=fire_station`.
    pub fire_station: u64,
}

impl AmenityCounts {
    /// Counts features whose `amenity` is one of the four tracked values.
    /// Other amenities are ignored.
    #[must_use]
    pub fn from_features<'a>(features: impl IntoIterator<Item = &'a RawFeature>) -> Self {
        let mut counts = Self::default();
        for feature in features {
            match feature.amenity() {
                Some("hospital") => counts.hospital += 1,
                Some("clinic") => counts.clinic += 1,
                Some("police") => counts.police += 1,
                Some("fire_station") => counts.fire_station += 1,
                _ => {}
            }
        }
        counts
    }

    /// Labelled buckets in display order.
    #[must_use]
    pub const fn entries(&self) -> [(&'static str, u64); 4] {
        [
            ("Hospital", self.hospital),
            ("Clinic", self.clinic),
            ("Police", self.police),
            ("Fire Station", self.fire_station),
        ]
    }
}

/// Tourism features keyed by their `tourism` tag value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourismCounts(pub BTreeMap<String, u64>);

impl TourismCounts {
    /// Bucket used for features without a `tourism` value.
    pub const UNKNOWN: &'static str = "Unknown";

    /// Counts features by `tourism` value.
    #[must_use]
    pub fn from_features<'a>(features: impl IntoIterator<Item = &'a RawFeature>) -> Self {
        let mut counts = BTreeMap::new();
        for feature in features {
            let category = feature.tag("tourism").unwrap_or(Self::UNKNOWN);
            *counts.entry(category.to_string()).or_insert(0) += 1;
        }
        Self(counts)
    }

    /// Iterates `(category, count)` in category order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Total number of tourism features.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}
