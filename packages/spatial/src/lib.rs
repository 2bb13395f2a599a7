#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial predicates for the safety map.
//!
//! Wraps the `geo` algorithms the analysis pipelines need: point-in-polygon,
//! great-circle distance, nearest candidate, and spherical area. Both
//! containment predicates are boundary-inclusive. Datasets are small, so
//! every lookup is a linear scan with one predicate call per
//! (feature, reference geometry) pair and no spatial index.
//!
//! Boundary documents (`GeoJSON` feature collections) are loaded through
//! [`boundary::ReferenceRegion`] and [`local_units::LocalUnits`].

pub mod boundary;
pub mod local_units;

use geo::{ChamberlainDuquetteArea, Distance, Haversine, Intersects, MultiPolygon};
use geojson::{Feature, GeoJson};
use safety_map_poi_models::Coordinates;
use thiserror::Error;

pub use boundary::ReferenceRegion;
pub use local_units::{LocalUnit, LocalUnitStats, LocalUnits};

/// Errors from spatial operations.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The document was not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The document held no usable feature.
    #[error("GeoJSON document has no features")]
    NoFeatures,

    /// A feature had no geometry.
    #[error("Feature has no geometry")]
    NoGeometry,

    /// A feature's geometry was not a polygon or multipolygon.
    #[error("Unsupported geometry type: {kind}")]
    UnsupportedGeometry {
        /// The geometry type that was found.
        kind: String,
    },

    /// Nearest-point lookup over an empty candidate set.
    #[error("No candidates to search")]
    EmptyCandidates,
}

/// Whether `at` lies inside `polygon` or on its boundary.
#[must_use]
pub fn within_polygon(at: Coordinates, polygon: &MultiPolygon<f64>) -> bool {
    at.to_point().intersects(polygon)
}

/// Great-circle distance in meters.
#[must_use]
pub fn distance_m(a: Coordinates, b: Coordinates) -> f64 {
    Haversine.distance(a.to_point(), b.to_point())
}

/// Whether `at` is no further than `radius_m` meters from `center`.
#[must_use]
pub fn within_radius(at: Coordinates, center: Coordinates, radius_m: f64) -> bool {
    distance_m(at, center) <= radius_m
}

/// Spherical area in square kilometers.
#[must_use]
pub fn area_sq_km(polygon: &MultiPolygon<f64>) -> f64 {
    polygon.chamberlain_duquette_unsigned_area() / 1e6
}

/// Result of a nearest-candidate search.
#[derive(Debug, PartialEq)]
pub struct Nearest<'a, T> {
    /// The closest candidate.
    pub item: &'a T,
    /// Its distance from the search origin in meters.
    pub distance_m: f64,
}

/// Finds the candidate closest to `from`.
///
/// Ties go to the candidate seen first.
///
/// # Errors
///
/// Returns [`SpatialError::EmptyCandidates`] if `candidates` is empty.
pub fn nearest<'a, T>(
    from: Coordinates,
    candidates: &'a [T],
    position: impl Fn(&T) -> Coordinates,
) -> Result<Nearest<'a, T>, SpatialError> {
    let mut best: Option<Nearest<'a, T>> = None;

    for item in candidates {
        let distance = distance_m(from, position(item));
        if best.as_ref().is_some_and(|current| distance >= current.distance_m) {
            continue;
        }
        best = Some(Nearest {
            item,
            distance_m: distance,
        });
    }

    best.ok_or(SpatialError::EmptyCandidates)
}

/// Parses a `GeoJSON` document into its features.
///
/// A bare geometry or single feature is treated as a one-element
/// collection.
fn parse_features(text: &str) -> Result<Vec<Feature>, SpatialError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(geometry) => Ok(vec![Feature::from(geometry)]),
    }
}

/// Converts a feature's geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn feature_to_multipolygon(feature: &Feature) -> Result<MultiPolygon<f64>, SpatialError> {
    let geometry = feature.geometry.clone().ok_or(SpatialError::NoGeometry)?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        other => Err(SpatialError::UnsupportedGeometry {
            kind: geometry_kind(&other).to_string(),
        }),
    }
}

const fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
