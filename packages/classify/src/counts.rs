//! Per-location emergency service counts.

use safety_map_overpass_models::RawFeature;
use serde::{Deserialize, Serialize};

use crate::{ServiceCategory, classify};

/// Number of tracked services found for one location, or across a region.
///
/// Only [`ServiceCategory::tracked`] categories are counted. Values are
/// unsigned so a count can never go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountSummary {
    /// Hospitals and clinics.
    pub hospital: u64,
    /// Police stations and traffic police.
    pub police: u64,
    /// Fire stations.
    pub fire_station: u64,
}

impl CountSummary {
    /// Builds a summary from scratch over `features`.
    ///
    /// This is the only way a location's summary is produced, so a new
    /// radius or dataset always yields a full rebuild.
    #[must_use]
    pub fn from_features<'a>(features: impl IntoIterator<Item = &'a RawFeature>) -> Self {
        features
            .into_iter()
            .map(classify)
            .fold(Self::default(), Self::accumulate)
    }

    /// Returns a copy with `category`'s bucket incremented. Unknown
    /// categories leave the summary unchanged.
    #[must_use]
    pub const fn accumulate(mut self, category: ServiceCategory) -> Self {
        match category {
            ServiceCategory::Hospital => self.hospital += 1,
            ServiceCategory::Police => self.police += 1,
            ServiceCategory::FireStation => self.fire_station += 1,
            ServiceCategory::Unknown => {}
        }
        self
    }

    /// Adds another summary's buckets onto this one.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            hospital: self.hospital + other.hospital,
            police: self.police + other.police,
            fire_station: self.fire_station + other.fire_station,
        }
    }

    /// Count for a single category (always 0 for unknown).
    #[must_use]
    pub const fn get(&self, category: ServiceCategory) -> u64 {
        match category {
            ServiceCategory::Hospital => self.hospital,
            ServiceCategory::Police => self.police,
            ServiceCategory::FireStation => self.fire_station,
            ServiceCategory::Unknown => 0,
        }
    }

    /// Sum of all tracked buckets.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.hospital + self.police + self.fire_station
    }

    /// Whether every bucket is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::iter::Sum for CountSummary {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Self::merge)
    }
}
