//! Overpass QL query construction.
//!
//! Every query is a union of tag selectors applied to one search area,
//! ending in `out center;` so ways and relations come back with a
//! representative point.

use std::fmt::Write as _;

use safety_map_poi_models::Coordinates;
use serde::{Deserialize, Serialize};

/// A `south, west, north, east` bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude.
    pub south: f64,
    /// Minimum longitude.
    pub west: f64,
    /// Maximum latitude.
    pub north: f64,
    /// Maximum longitude.
    pub east: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its edges.
    #[must_use]
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([south, west, north, east]: [f64; 4]) -> Self {
        Self::new(south, west, north, east)
    }
}

/// Region a query is restricted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryArea {
    /// Circle of `radius_m` meters around `center`.
    Around {
        /// Circle center.
        center: Coordinates,
        /// Radius in meters.
        radius_m: f64,
    },
    /// Axis-aligned box.
    Bounds(BoundingBox),
}

impl QueryArea {
    /// Checks the area is usable: positive finite radius around an
    /// in-range center, or a non-empty finite box with latitudes in range.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the area is invalid.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::Around { center, radius_m } => {
                if !radius_m.is_finite() || radius_m <= 0.0 {
                    return Err(format!("radius must be positive, got {radius_m}"));
                }
                if !(-90.0..=90.0).contains(&center.lat) {
                    return Err(format!("latitude out of range: {}", center.lat));
                }
                if !(-180.0..=180.0).contains(&center.lon) {
                    return Err(format!("longitude out of range: {}", center.lon));
                }
                Ok(())
            }
            Self::Bounds(bbox) => {
                let edges = [bbox.south, bbox.west, bbox.north, bbox.east];
                if !edges.iter().all(|edge| edge.is_finite()) {
                    return Err(format!("bounding box edges must be finite, got {edges:?}"));
                }
                if bbox.south >= bbox.north || bbox.west >= bbox.east {
                    return Err(format!("empty bounding box {edges:?}"));
                }
                if bbox.south < -90.0 || bbox.north > 90.0 {
                    return Err("bounding box latitude out of range".to_string());
                }
                Ok(())
            }
        }
    }

    fn clause(&self) -> String {
        match *self {
            Self::Around { center, radius_m } => {
                format!("(around:{radius_m},{},{})", center.lat, center.lon)
            }
            Self::Bounds(bbox) => format!(
                "({},{},{},{})",
                bbox.south, bbox.west, bbox.north, bbox.east
            ),
        }
    }
}

/// Closed set of feature classes the gateway knows how to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureFilter {
    /// Hospitals, clinics, police (including traffic police) and fire
    /// stations, as nodes or ways.
    Emergency,
    /// Emergency amenities as nodes, plus fire stations mapped as ways or
    /// relations.
    DistrictEmergency,
    /// Hospitals and clinics.
    Hospital,
    /// Police stations and traffic police posts.
    Police,
    /// Fire stations.
    FireStation,
    /// Any node carrying a `tourism` tag.
    Tourism,
    /// Nodes and ways with `key`, optionally equal to `value`.
    Tag {
        /// Tag key.
        key: String,
        /// Exact value to match; `None` matches any value.
        value: Option<String>,
    },
}

const NODE_WAY: &[&str] = &["node", "way"];
const WAY_RELATION: &[&str] = &["way", "relation"];
const NODE: &[&str] = &["node"];

impl FeatureFilter {
    fn selectors(&self) -> Vec<(&'static [&'static str], String)> {
        match self {
            Self::Emergency => vec![
                (NODE_WAY, r#"["amenity"~"hospital|clinic"]"#.to_string()),
                (NODE_WAY, r#"["amenity"="police"]"#.to_string()),
                (NODE_WAY, r#"["amenity"="fire_station"]"#.to_string()),
                (NODE_WAY, r#"["police"="traffic_police"]"#.to_string()),
            ],
            Self::DistrictEmergency => vec![
                (
                    NODE,
                    r#"["amenity"~"hospital|clinic|police|fire_station"]"#.to_string(),
                ),
                (WAY_RELATION, r#"["amenity"="fire_station"]"#.to_string()),
            ],
            Self::Hospital => vec![
                (NODE_WAY, r#"["amenity"="hospital"]"#.to_string()),
                (NODE_WAY, r#"["amenity"="clinic"]"#.to_string()),
            ],
            Self::Police => vec![
                (NODE_WAY, r#"["amenity"="police"]"#.to_string()),
                (NODE_WAY, r#"["police"="traffic_police"]"#.to_string()),
            ],
            Self::FireStation => vec![(NODE_WAY, r#"["amenity"="fire_station"]"#.to_string())],
            Self::Tourism => vec![(NODE, r#"["tourism"]"#.to_string())],
            Self::Tag { key, value } => {
                let selector = value.as_ref().map_or_else(
                    || format!(r#"["{}"]"#, escape(key)),
                    |value| format!(r#"["{}"="{}"]"#, escape(key), escape(value)),
                );
                vec![(NODE_WAY, selector)]
            }
        }
    }
}

/// Escapes a string for use inside a double-quoted Overpass QL literal.
fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Builds the Overpass QL text for `filter` restricted to `area`.
#[must_use]
pub fn build_query(area: &QueryArea, filter: &FeatureFilter, timeout_secs: u64) -> String {
    let clause = area.clause();
    let mut query = format!("[out:json][timeout:{timeout_secs}];(");

    for (kinds, selector) in filter.selectors() {
        for kind in kinds {
            write!(query, "{kind}{selector}{clause};").ok();
        }
    }

    query.push_str(");out center;");
    query
}
