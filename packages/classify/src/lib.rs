#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Emergency service taxonomy.
//!
//! Maps raw OSM tags onto the fixed [`ServiceCategory`] set and accumulates
//! per-location [`CountSummary`] values. Classification is total: every
//! feature lands in exactly one category, [`ServiceCategory::Unknown`] when
//! nothing matches.

pub mod counts;
pub mod tally;

use safety_map_overpass_models::RawFeature;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use counts::CountSummary;
pub use tally::{AmenityCounts, TourismCounts};

/// Canonical emergency service categories.
///
/// Clinics are folded into [`Self::Hospital`] and traffic police posts into
/// [`Self::Police`] during classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ServiceCategory {
    /// Hospitals and clinics.
    Hospital,
    /// Police stations and traffic police.
    Police,
    /// Fire stations.
    FireStation,
    /// Anything else. Shown as a raw dot, never counted.
    Unknown,
}

impl ServiceCategory {
    /// Categories that contribute to a [`CountSummary`], in display order.
    #[must_use]
    pub const fn tracked() -> &'static [Self] {
        &[Self::Hospital, Self::Police, Self::FireStation]
    }

    /// Whether this category is counted in summaries.
    #[must_use]
    pub const fn is_tracked(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Human-readable label (e.g. "Fire Station").
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hospital => "Hospital",
            Self::Police => "Police",
            Self::FireStation => "Fire Station",
            Self::Unknown => "Unknown",
        }
    }
}

/// Classifies a feature. First matching rule wins:
///
/// 1. `police=traffic_police` is police, whatever the amenity says.
/// 2. `amenity=clinic` is a hospital.
/// 3. `amenity` of `hospital`, `police` or `fire_station` maps directly.
/// 4. Everything else is unknown.
#[must_use]
pub fn classify(feature: &RawFeature) -> ServiceCategory {
    if feature.tag("police") == Some("traffic_police") {
        return ServiceCategory::Police;
    }

    match feature.amenity() {
        Some("clinic" | "hospital") => ServiceCategory::Hospital,
        Some("police") => ServiceCategory::Police,
        Some("fire_station") => ServiceCategory::FireStation,
        _ => ServiceCategory::Unknown,
    }
}
