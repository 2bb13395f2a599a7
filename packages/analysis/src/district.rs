//! District view: emergency and tourism features inside the reference
//! region.

use safety_map_classify::{AmenityCounts, TourismCounts};
use safety_map_overpass::{BoundingBox, FeatureFilter, FeatureSource, OverpassError, QueryArea};
use safety_map_overpass_models::RawFeature;
use safety_map_poi_models::Coordinates;
use safety_map_spatial::ReferenceRegion;
use safety_map_summary::{DistrictPopup, FeatureDot};
use serde::Serialize;

/// Markers and tally for one district layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictLayer<T> {
    /// One marker per feature inside the region.
    pub markers: Vec<FeatureDot>,
    /// Counts over the same features.
    pub tally: T,
}

/// Load status of a district layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LayerData<T> {
    /// The query succeeded.
    Loaded(DistrictLayer<T>),
    /// The query failed; the layer stays detached.
    Unavailable {
        /// Error description.
        message: String,
    },
}

impl<T> LayerData<T> {
    /// The layer contents, if loaded.
    #[must_use]
    pub const fn loaded(&self) -> Option<&DistrictLayer<T>> {
        match self {
            Self::Loaded(layer) => Some(layer),
            Self::Unavailable { .. } => None,
        }
    }

    fn from_query(
        name: &str,
        result: Result<Vec<RawFeature>, OverpassError>,
        region: &ReferenceRegion,
        build: impl FnOnce(&[RawFeature]) -> DistrictLayer<T>,
    ) -> Self {
        match result {
            Ok(features) => {
                let inside = region.filter_inside(features);
                log::info!("Loaded {} {name} features inside district", inside.len());
                Self::Loaded(build(&inside))
            }
            Err(e) => {
                log::warn!("Failed to load {name} layer: {e}");
                Self::Unavailable {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Both district layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictData {
    /// Hospitals, clinics, police and fire stations.
    pub emergency: LayerData<AmenityCounts>,
    /// Tourism sites bucketed by `tourism` value.
    pub tourism: LayerData<TourismCounts>,
}

/// Queries both district layers in `bounds` concurrently and keeps the
/// features inside `region`.
pub async fn load_district<S: FeatureSource + ?Sized>(
    source: &S,
    region: &ReferenceRegion,
    bounds: BoundingBox,
) -> DistrictData {
    let area = QueryArea::Bounds(bounds);
    let (emergency, tourism) = futures::join!(
        source.query_features(&area, &FeatureFilter::DistrictEmergency),
        source.query_features(&area, &FeatureFilter::Tourism),
    );

    DistrictData {
        emergency: LayerData::from_query("emergency", emergency, region, |features| {
            DistrictLayer {
                markers: features.iter().filter_map(FeatureDot::emergency).collect(),
                tally: AmenityCounts::from_features(features),
            }
        }),
        tourism: LayerData::from_query("tourism", tourism, region, |features| DistrictLayer {
            markers: features.iter().filter_map(FeatureDot::tourism).collect(),
            tally: TourismCounts::from_features(features),
        }),
    }
}

/// Builds the popup for a click at `at`.
///
/// Returns `None` when `at` is outside the region. A tally section is
/// included only when its toggle is on and its layer loaded.
#[must_use]
pub fn district_popup(
    region: &ReferenceRegion,
    data: Option<&DistrictData>,
    at: Coordinates,
    show_emergency: bool,
    show_tourism: bool,
) -> Option<DistrictPopup> {
    if !region.contains(at) {
        log::debug!("Click at {at} is outside the district");
        return None;
    }

    let emergency = data
        .filter(|_| show_emergency)
        .and_then(|d| d.emergency.loaded())
        .map(|layer| layer.tally);
    let tourism = data
        .filter(|_| show_tourism)
        .and_then(|d| d.tourism.loaded())
        .map(|layer| layer.tally.clone());

    Some(DistrictPopup {
        district: region.name().map(str::to_string),
        at,
        area_sq_km: region.area_sq_km(),
        emergency,
        tourism,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use safety_map_poi_models::Coordinates;
    use safety_map_spatial::ReferenceRegion;

    /// A square district from (27.6, 85.25) to (27.8, 85.4).
    pub const DISTRICT: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": { "name": "Kathmandu" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [85.25, 27.6], [85.4, 27.6], [85.4, 27.8], [85.25, 27.8], [85.25, 27.6]
                ]]
            }
        }]
    }"#;

    pub const INSIDE: Coordinates = Coordinates::new(27.7, 85.3);
    pub const OUTSIDE: Coordinates = Coordinates::new(27.9, 85.3);

    pub fn region() -> ReferenceRegion {
        ReferenceRegion::from_geojson_str(DISTRICT).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{INSIDE, OUTSIDE, region};
    use super::*;
    use crate::test_support::{Canned, StubSource, feature};

    const BOUNDS: BoundingBox = BoundingBox::new(27.6, 85.25, 27.8, 85.4);

    fn source() -> StubSource {
        StubSource {
            bounded: vec![
                (
                    FeatureFilter::DistrictEmergency,
                    Canned::Features(vec![
                        feature(1, &[("amenity", "clinic")], Some(INSIDE)),
                        feature(2, &[("amenity", "fire_station")], Some(INSIDE)),
                        feature(3, &[("amenity", "hospital")], Some(OUTSIDE)),
                        feature(4, &[("amenity", "hospital")], None),
                    ]),
                ),
                (
                    FeatureFilter::Tourism,
                    Canned::Features(vec![
                        feature(5, &[("tourism", "museum")], Some(INSIDE)),
                        feature(6, &[("tourism", "museum")], Some(INSIDE)),
                        feature(7, &[("tourism", "hotel")], Some(OUTSIDE)),
                    ]),
                ),
            ],
            ..StubSource::default()
        }
    }

    #[tokio::test]
    async fn keeps_only_features_inside_region() {
        let data = load_district(&source(), &region(), BOUNDS).await;

        let emergency = data.emergency.loaded().unwrap();
        assert_eq!(emergency.tally.clinic, 1);
        assert_eq!(emergency.tally.fire_station, 1);
        assert_eq!(emergency.tally.hospital, 0);
        assert_eq!(emergency.markers.len(), 2);
        assert_eq!(emergency.markers[1].heading, "fire station");

        let tourism = data.tourism.loaded().unwrap();
        assert_eq!(tourism.tally.total(), 2);
        assert_eq!(tourism.markers[0].heading, "Type: museum");
    }

    #[tokio::test]
    async fn failed_layer_is_unavailable() {
        let mut source = source();
        source.bounded[1].1 = Canned::Fail;
        let data = load_district(&source, &region(), BOUNDS).await;
        assert!(data.emergency.loaded().is_some());
        assert!(matches!(data.tourism, LayerData::Unavailable { .. }));
    }

    #[tokio::test]
    async fn popup_follows_toggles() {
        let region = region();
        let data = load_district(&source(), &region, BOUNDS).await;

        let popup = district_popup(&region, Some(&data), INSIDE, true, false).unwrap();
        assert_eq!(popup.district.as_deref(), Some("Kathmandu"));
        assert!(popup.area_sq_km > 0.0);
        assert_eq!(popup.emergency.unwrap().clinic, 1);
        assert!(popup.tourism.is_none());

        let popup = district_popup(&region, Some(&data), INSIDE, false, true).unwrap();
        assert!(popup.emergency.is_none());
        assert_eq!(popup.tourism.unwrap().total(), 2);
    }

    #[test]
    fn click_outside_is_a_no_op() {
        assert!(district_popup(&region(), None, OUTSIDE, true, true).is_none());
    }

    #[test]
    fn popup_before_data_loads_has_no_sections() {
        let popup = district_popup(&region(), None, INSIDE, true, true).unwrap();
        assert!(popup.emergency.is_none());
        assert!(popup.tourism.is_none());
    }
}
