//! Proximity pipeline: emergency coverage around each named location.

use futures::future::join_all;
use safety_map_classify::CountSummary;
use safety_map_overpass::{FeatureFilter, FeatureSource, OverpassError, QueryArea};
use safety_map_overpass_models::RawFeature;
use safety_map_poi_models::NamedLocation;
use safety_map_summary::{FeatureDot, LocationSummary, RegionSummary};
use serde::Serialize;

use crate::AnalysisError;

/// What a single location query produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueryOutcome {
    /// The query succeeded with at least one feature.
    Found {
        /// Features inside the radius.
        features: Vec<RawFeature>,
    },
    /// The query succeeded and nothing matched.
    Empty,
    /// The query failed.
    Unavailable {
        /// Transport failure rather than a malformed answer.
        network: bool,
        /// Error description.
        message: String,
    },
}

impl QueryOutcome {
    /// Features found, empty for [`Self::Empty`] and [`Self::Unavailable`].
    #[must_use]
    pub fn features(&self) -> &[RawFeature] {
        match self {
            Self::Found { features } => features,
            Self::Empty | Self::Unavailable { .. } => &[],
        }
    }
}

/// Result for one named location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
    /// Location key.
    pub key: String,
    /// Raw query outcome.
    pub outcome: QueryOutcome,
    /// Presentation summary.
    pub summary: LocationSummary,
    /// One dot per positioned feature.
    pub dots: Vec<FeatureDot>,
}

/// Result of one proximity run across every location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityReport {
    /// Generation this run was started under.
    pub generation: u64,
    /// Search radius in meters.
    pub radius_m: f64,
    /// Per-location results sorted by location name.
    pub locations: Vec<LocationReport>,
    /// Totals over every location with data.
    pub region: RegionSummary,
}

/// Checks that `radius_m` is a usable search radius.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidRadius`] for zero, negative, or
/// non-finite values.
pub fn validate_radius(radius_m: f64) -> Result<(), AnalysisError> {
    if radius_m.is_finite() && radius_m > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidRadius { radius_m })
    }
}

fn outcome(
    location: &NamedLocation,
    radius_m: f64,
    result: Result<Vec<RawFeature>, OverpassError>,
) -> QueryOutcome {
    match result {
        // `around` matches ways and relations on any part of their geometry,
        // so every returned element counts even if its center lies outside.
        Ok(features) if features.is_empty() => {
            log::debug!("{}: nothing within {radius_m} m", location.name);
            QueryOutcome::Empty
        }
        Ok(features) => {
            log::debug!(
                "{}: {} features within {radius_m} m",
                location.name,
                features.len()
            );
            QueryOutcome::Found { features }
        }
        Err(e) => {
            log::warn!("{}: query failed: {e}", location.name);
            QueryOutcome::Unavailable {
                network: e.is_network(),
                message: e.to_string(),
            }
        }
    }
}

/// Queries and summarizes a single location.
pub async fn analyze_location<S: FeatureSource + ?Sized>(
    source: &S,
    location: &NamedLocation,
    radius_m: f64,
) -> LocationReport {
    let area = QueryArea::Around {
        center: location.coordinates,
        radius_m,
    };
    let result = source
        .query_features(&area, &FeatureFilter::Emergency)
        .await;
    let outcome = outcome(location, radius_m, result);

    let summary = match &outcome {
        QueryOutcome::Unavailable { message, .. } => {
            LocationSummary::unavailable(location, message.clone())
        }
        QueryOutcome::Found { features } => LocationSummary::available(
            location,
            CountSummary::from_features(features),
            features.len(),
        ),
        QueryOutcome::Empty => LocationSummary::available(location, CountSummary::default(), 0),
    };
    let dots = outcome
        .features()
        .iter()
        .filter_map(FeatureDot::proximity)
        .collect();

    LocationReport {
        key: location.key.clone(),
        outcome,
        summary,
        dots,
    }
}

/// Runs the proximity pipeline for every location concurrently.
///
/// Each location is queried independently. Once all queries finish the
/// reports are sorted by location name and merged into a
/// [`RegionSummary`], so the totals never depend on completion order.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidRadius`] if `radius_m` is not positive.
/// Query failures do not fail the run; they show up as
/// [`QueryOutcome::Unavailable`] on the affected location.
pub async fn run_proximity_analysis<S: FeatureSource + ?Sized>(
    source: &S,
    locations: &[NamedLocation],
    radius_m: f64,
    generation: u64,
) -> Result<ProximityReport, AnalysisError> {
    validate_radius(radius_m)?;
    log::info!(
        "Proximity run {generation}: {} locations, radius {radius_m} m",
        locations.len()
    );

    let mut reports = join_all(
        locations
            .iter()
            .map(|location| analyze_location(source, location, radius_m)),
    )
    .await;
    reports.sort_by(|a, b| a.summary.name.cmp(&b.summary.name));

    let summaries: Vec<LocationSummary> = reports.iter().map(|r| r.summary.clone()).collect();
    let region = RegionSummary::build(&summaries);
    log::info!(
        "Proximity run {generation} done: {} services, {} locations unavailable",
        region.totals.total(),
        region.unavailable.len()
    );

    Ok(ProximityReport {
        generation,
        radius_m,
        locations: reports,
        region,
    })
}
