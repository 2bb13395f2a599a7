#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Overpass API wire types and the normalized [`RawFeature`] record.
//!
//! The Overpass interpreter answers `[out:json]` queries with an `elements`
//! array. Nodes carry `lat`/`lon` directly; ways and relations only carry a
//! `center` when the query ends in `out center`. Anything without either is
//! kept as a [`RawFeature`] with no position so callers can drop it.

use std::collections::BTreeMap;

use safety_map_poi_models::Coordinates;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Top-level Overpass JSON response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassResponse {
    /// Matched OSM elements.
    #[serde(default)]
    pub elements: Vec<OsmElement>,
}

/// OSM element kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElementType {
    /// A single point.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A group of other elements.
    Relation,
    /// Element kinds this crate does not model (e.g. `area`).
    #[serde(other)]
    Other,
}

/// Center point emitted by `out center` for ways and relations.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Center {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// A single element as it appears in the `elements` array.
#[derive(Debug, Clone, Deserialize)]
pub struct OsmElement {
    /// Element kind.
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// OSM id (unique per element kind).
    pub id: i64,
    /// Node latitude.
    pub lat: Option<f64>,
    /// Node longitude.
    pub lon: Option<f64>,
    /// Computed center for ways/relations.
    pub center: Option<Center>,
    /// OSM tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl OsmElement {
    /// Resolves the element's position, preferring its own `lat`/`lon`
    /// and falling back to `center`.
    #[must_use]
    pub fn position(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => self.center.map(|c| Coordinates::new(c.lat, c.lon)),
        }
    }
}

/// A feature returned by the geo query gateway. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    /// OSM id.
    pub id: i64,
    /// OSM element kind.
    pub element_type: ElementType,
    /// OSM tags.
    pub tags: BTreeMap<String, String>,
    /// Resolved position, if the element had any geometry.
    pub position: Option<Coordinates>,
}

impl RawFeature {
    /// Returns the value of `key`, if tagged.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns the `name` tag.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.tag("name")
    }

    /// Returns the `amenity` tag.
    #[must_use]
    pub fn amenity(&self) -> Option<&str> {
        self.tag("amenity")
    }
}

impl From<OsmElement> for RawFeature {
    fn from(element: OsmElement) -> Self {
        let position = element.position();
        Self {
            id: element.id,
            element_type: element.element_type,
            tags: element.tags,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> Vec<RawFeature> {
        let response: OverpassResponse = serde_json::from_value(value).unwrap();
        response.elements.into_iter().map(RawFeature::from).collect()
    }

    #[test]
    fn node_uses_own_coordinates() {
        let features = parse(serde_json::json!({
            "elements": [{
                "type": "node",
                "id": 1,
                "lat": 27.7,
                "lon": 85.3,
                "tags": {"amenity": "hospital", "name": "Bir Hospital"}
            }]
        }));
        assert_eq!(features[0].position, Some(Coordinates::new(27.7, 85.3)));
        assert_eq!(features[0].name(), Some("Bir Hospital"));
        assert_eq!(features[0].element_type, ElementType::Node);
    }

    #[test]
    fn way_falls_back_to_center() {
        let features = parse(serde_json::json!({
            "elements": [{
                "type": "way",
                "id": 2,
                "center": {"lat": 27.65, "lon": 85.31},
                "tags": {"amenity": "fire_station"}
            }]
        }));
        assert_eq!(features[0].position, Some(Coordinates::new(27.65, 85.31)));
    }

    #[test]
    fn way_without_geometry_has_no_position() {
        let features = parse(serde_json::json!({
            "elements": [{"type": "way", "id": 3, "tags": {"amenity": "police"}}]
        }));
        assert!(features[0].position.is_none());
        assert_eq!(features[0].amenity(), Some("police"));
    }

    #[test]
    fn missing_tags_and_unknown_types_are_tolerated() {
        let features = parse(serde_json::json!({
            "elements": [{"type": "area", "id": 4}]
        }));
        assert_eq!(features[0].element_type, ElementType::Other);
        assert!(features[0].tags.is_empty());
    }

    #[test]
    fn missing_elements_is_empty() {
        assert!(parse(serde_json::json!({"version": 0.6})).is_empty());
    }
}
