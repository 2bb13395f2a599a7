//! Nearest-facility routing.
//!
//! Only the route request is produced here. Drawing the route is left to
//! an external routing engine that takes the two waypoints.

use safety_map_classify::ServiceCategory;
use safety_map_overpass::{BoundingBox, FeatureFilter, FeatureSource, QueryArea};
use safety_map_overpass_models::RawFeature;
use safety_map_poi_models::{Coordinates, NamedLocation, find_location};
use safety_map_spatial::nearest;
use safety_map_summary::NearestPopup;
use serde::Serialize;

use crate::AnalysisError;

/// A route request from a named location to the closest facility.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestRoute {
    /// Route start.
    pub origin: NamedLocation,
    /// The chosen facility.
    pub facility: RawFeature,
    /// `[origin, facility]`.
    pub waypoints: [Coordinates; 2],
    /// Popup shown at the facility.
    pub popup: NearestPopup,
}

const fn filter_for(category: ServiceCategory) -> Option<FeatureFilter> {
    match category {
        ServiceCategory::Hospital => Some(FeatureFilter::Hospital),
        ServiceCategory::Police => Some(FeatureFilter::Police),
        ServiceCategory::FireStation => Some(FeatureFilter::FireStation),
        ServiceCategory::Unknown => None,
    }
}

/// Finds the `category` facility in `bounds` closest to the location
/// keyed `key`.
///
/// # Errors
///
/// * [`AnalysisError::UnknownLocation`] if no location has `key`
/// * [`AnalysisError::UnsupportedCategory`] for [`ServiceCategory::Unknown`]
/// * [`AnalysisError::Gateway`] if the query fails
/// * [`AnalysisError::NoCandidates`] if no positioned facility was found
pub async fn find_nearest_route<S: FeatureSource + ?Sized>(
    source: &S,
    locations: &[NamedLocation],
    key: &str,
    category: ServiceCategory,
    bounds: BoundingBox,
) -> Result<NearestRoute, AnalysisError> {
    let origin = find_location(locations, key).ok_or_else(|| AnalysisError::UnknownLocation {
        key: key.to_string(),
    })?;
    let filter = filter_for(category).ok_or(AnalysisError::UnsupportedCategory { category })?;

    let features = source
        .query_features(&QueryArea::Bounds(bounds), &filter)
        .await?;
    let candidates: Vec<(Coordinates, RawFeature)> = features
        .into_iter()
        .filter_map(|feature| feature.position.map(|at| (at, feature)))
        .collect();
    log::debug!(
        "{} {category} candidates for route from {}",
        candidates.len(),
        origin.name
    );

    let best = nearest(origin.coordinates, &candidates, |(at, _)| *at)
        .map_err(|_| AnalysisError::NoCandidates { category })?;
    let (at, facility) = best.item;
    let popup = NearestPopup::new(category.as_ref(), facility, best.distance_m)
        .ok_or(AnalysisError::NoCandidates { category })?;

    log::info!(
        "Nearest {category} to {}: {} at {:.0} m",
        origin.name,
        popup.facility,
        best.distance_m
    );

    Ok(NearestRoute {
        origin: origin.clone(),
        facility: facility.clone(),
        waypoints: [origin.coordinates, *at],
        popup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Canned, StubSource, feature, location};

    const BOUNDS: BoundingBox = BoundingBox {
        south: 27.5,
        west: 85.2,
        north: 27.7,
        east: 85.6,
    };

    fn locations() -> Vec<NamedLocation> {
        vec![location("home", "Home", 27.59, 85.26)]
    }

    fn stub(filter: FeatureFilter, canned: Canned) -> StubSource {
        StubSource {
            bounded: vec![(filter, canned)],
            ..StubSource::default()
        }
    }

    #[tokio::test]
    async fn picks_closest_positioned_facility() {
        let source = stub(
            FeatureFilter::FireStation,
            Canned::Features(vec![
                feature(1, &[("amenity", "fire_station")], None),
                feature(
                    2,
                    &[("amenity", "fire_station"), ("name", "Far")],
                    Some(Coordinates::new(27.68, 85.3)),
                ),
                feature(
                    3,
                    &[("amenity", "fire_station")],
                    Some(Coordinates::new(27.6, 85.27)),
                ),
            ]),
        );
        let route = find_nearest_route(
            &source,
            &locations(),
            "HOME",
            ServiceCategory::FireStation,
            BOUNDS,
        )
        .await
        .unwrap();

        assert_eq!(route.facility.id, 3);
        assert_eq!(route.popup.facility, "Unnamed");
        assert_eq!(route.popup.service, "fire station");
        assert_eq!(route.waypoints[0], Coordinates::new(27.59, 85.26));
        assert_eq!(route.waypoints[1], Coordinates::new(27.6, 85.27));
        assert!(route.popup.distance_m > 0.0);
    }

    #[tokio::test]
    async fn errors_without_candidates() {
        let source = stub(
            FeatureFilter::Hospital,
            Canned::Features(vec![feature(1, &[("amenity", "hospital")], None)]),
        );
        let result = find_nearest_route(
            &source,
            &locations(),
            "home",
            ServiceCategory::Hospital,
            BOUNDS,
        )
        .await;
        assert!(matches!(result, Err(AnalysisError::NoCandidates { .. })));
    }

    #[tokio::test]
    async fn rejects_unknown_inputs() {
        let source = StubSource::default();
        assert!(matches!(
            find_nearest_route(&source, &locations(), "office", ServiceCategory::Police, BOUNDS)
                .await,
            Err(AnalysisError::UnknownLocation { .. })
        ));
        assert!(matches!(
            find_nearest_route(&source, &locations(), "home", ServiceCategory::Unknown, BOUNDS)
                .await,
            Err(AnalysisError::UnsupportedCategory { .. })
        ));
    }

    #[tokio::test]
    async fn surfaces_gateway_failure() {
        let source = stub(FeatureFilter::Police, Canned::Fail);
        assert!(matches!(
            find_nearest_route(&source, &locations(), "home", ServiceCategory::Police, BOUNDS)
                .await,
            Err(AnalysisError::Gateway(_))
        ));
    }
}
