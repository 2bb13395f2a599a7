#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Named point-of-interest types.
//!
//! A [`NamedLocation`] is one of the fixed places (home, school, college,
//! university) that proximity analysis and routing are anchored on. The set
//! is defined once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// What kind of place a [`NamedLocation`] is.
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
#[strum(ascii_case_insensitive)]
pub enum LocationCategory {
    /// A residence.
    Home,
    /// A primary or secondary school.
    School,
    /// A higher-secondary school or college.
    College,
    /// A university campus.
    University,
}

impl LocationCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Home, Self::School, Self::College, Self::University]
    }
}

/// A WGS84 latitude/longitude pair.
///
/// Stored latitude-first to match how coordinates are usually written, but
/// converts to a [`geo::Point`] in `(x = lon, y = lat)` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns the coordinates as a `geo` point (`x` = longitude).
    #[must_use]
    pub const fn to_point(self) -> geo::Point<f64> {
        geo::Point(geo::Coord {
            x: self.lon,
            y: self.lat,
        })
    }
}

impl From<geo::Point<f64>> for Coordinates {
    fn from(point: geo::Point<f64>) -> Self {
        Self {
            lat: point.y(),
            lon: point.x(),
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// A fixed point of interest used as an analysis anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    /// Short lookup key (e.g. `"home"`, `"university"`).
    pub key: String,
    /// Display name (e.g. "Kathmandu University").
    pub name: String,
    /// Kind of place.
    pub category: LocationCategory,
    /// Position of the place.
    #[serde(flatten)]
    pub coordinates: Coordinates,
}

/// Finds a location by its lookup key (case-insensitive).
#[must_use]
pub fn find_location<'a>(locations: &'a [NamedLocation], key: &str) -> Option<&'a NamedLocation> {
    locations
        .iter()
        .find(|location| location.key.eq_ignore_ascii_case(key))
}
