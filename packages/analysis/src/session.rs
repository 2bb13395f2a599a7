//! State shared between UI events.
//!
//! A [`Session`] is what the surrounding UI talks to. It owns the gateway,
//! the visibility controller, and the latest result of every pipeline.
//! Locks are held only for short synchronous sections and never across a
//! gateway call. Proximity runs, route requests, and district refreshes
//! each carry their own generation counter; an answer is stored only if
//! no newer request of the same kind started while it was in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use safety_map_classify::ServiceCategory;
use safety_map_overpass::{FeatureSource, OverpassClient};
use safety_map_poi_models::{Coordinates, NamedLocation};
use safety_map_spatial::{LocalUnitStats, LocalUnits, ReferenceRegion};
use safety_map_summary::{DistrictPopup, FeatureDot};
use safety_map_visibility::{Layer, LayerChange, VisibilityController};

use crate::district::{DistrictData, district_popup, load_district};
use crate::proximity::{self, ProximityReport, validate_radius};
use crate::route::{NearestRoute, find_nearest_route};
use crate::{AnalysisError, AppConfig};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Map session state and entry points.
pub struct Session<S> {
    source: S,
    config: AppConfig,
    generation: AtomicU64,
    route_generation: AtomicU64,
    district_generation: AtomicU64,
    visibility: Mutex<VisibilityController>,
    proximity: Mutex<Option<Arc<ProximityReport>>>,
    route: Mutex<Option<Arc<NearestRoute>>>,
    region: Mutex<Option<Arc<ReferenceRegion>>>,
    district: Mutex<Option<Arc<DistrictData>>>,
    local_units: Mutex<Option<Arc<LocalUnits>>>,
}

impl Session<OverpassClient> {
    /// Creates a session backed by the live Overpass API.
    #[must_use]
    pub fn connect(config: AppConfig) -> Self {
        let client = OverpassClient::new(config.overpass.clone());
        Self::new(client, config)
    }
}

impl<S: FeatureSource> Session<S> {
    /// Creates a session at the configured initial zoom with nothing
    /// loaded.
    #[must_use]
    pub fn new(source: S, config: AppConfig) -> Self {
        let visibility = VisibilityController::new(config.map.visibility, config.map.initial_zoom);
        Self {
            source,
            config,
            generation: AtomicU64::new(0),
            route_generation: AtomicU64::new(0),
            district_generation: AtomicU64::new(0),
            visibility: Mutex::new(visibility),
            proximity: Mutex::new(None),
            route: Mutex::new(None),
            region: Mutex::new(None),
            district: Mutex::new(None),
            local_units: Mutex::new(None),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The named locations.
    #[must_use]
    pub fn locations(&self) -> &[NamedLocation] {
        &self.config.locations
    }

    /// Generation of the most recently started proximity run.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Snapshot of the visibility controller.
    #[must_use]
    pub fn visibility(&self) -> VisibilityController {
        lock(&self.visibility).clone()
    }

    /// Handles a zoom-change event.
    pub fn on_zoom_changed(&self, zoom: i32) -> Vec<LayerChange> {
        lock(&self.visibility).on_zoom_changed(zoom)
    }

    /// Handles a layer toggle.
    pub fn set_toggle(&self, layer: Layer, enabled: bool) -> Vec<LayerChange> {
        lock(&self.visibility).set_toggle(layer, enabled)
    }

    /// Runs the proximity pipeline with a new generation.
    ///
    /// Returns `Ok(None)` if another run started while this one was in
    /// flight; the newer run owns the displayed state.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidRadius`] if `radius_m` is not
    /// positive.
    pub async fn run_proximity_analysis(
        &self,
        radius_m: f64,
    ) -> Result<Option<Arc<ProximityReport>>, AnalysisError> {
        validate_radius(radius_m)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let report = proximity::run_proximity_analysis(
            &self.source,
            &self.config.locations,
            radius_m,
            generation,
        )
        .await?;

        let report = {
            let mut latest = lock(&self.proximity);
            if self.generation() != generation {
                log::warn!("Discarding superseded proximity run {generation}");
                return Ok(None);
            }
            let report = Arc::new(report);
            *latest = Some(report.clone());
            report
        };

        lock(&self.visibility).on_data_loaded(Layer::ProximityDots);
        Ok(Some(report))
    }

    /// The latest accepted proximity report.
    #[must_use]
    pub fn proximity_report(&self) -> Option<Arc<ProximityReport>> {
        lock(&self.proximity).clone()
    }

    /// Dots of the latest proximity report, if the dot layer is attached.
    #[must_use]
    pub fn proximity_dots(&self) -> Vec<FeatureDot> {
        if !lock(&self.visibility).is_attached(Layer::ProximityDots) {
            return Vec::new();
        }
        self.proximity_report()
            .map(|report| {
                report
                    .locations
                    .iter()
                    .flat_map(|location| location.dots.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Routes from the location keyed `key` to the nearest `category`
    /// facility in the configured route box, replacing any previous route.
    ///
    /// Returns `Ok(None)` if another route request started while this one
    /// was in flight.
    ///
    /// # Errors
    ///
    /// See [`find_nearest_route`]. On error the previous route is kept.
    pub async fn run_nearest_route(
        &self,
        key: &str,
        category: ServiceCategory,
    ) -> Result<Option<Arc<NearestRoute>>, AnalysisError> {
        let generation = self.route_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let route = find_nearest_route(
            &self.source,
            &self.config.locations,
            key,
            category,
            self.config.region.route(),
        )
        .await?;

        let mut current = lock(&self.route);
        if self.route_generation.load(Ordering::SeqCst) != generation {
            log::warn!("Discarding superseded route request {generation}");
            return Ok(None);
        }
        let route = Arc::new(route);
        *current = Some(route.clone());
        drop(current);
        Ok(Some(route))
    }

    /// The current route, if any.
    #[must_use]
    pub fn current_route(&self) -> Option<Arc<NearestRoute>> {
        lock(&self.route).clone()
    }

    /// Loads the reference district from a `GeoJSON` document.
    ///
    /// Previously loaded district layers are cleared and detached, and any
    /// refresh still in flight for the old boundary is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Spatial`] if the document has no usable
    /// polygon.
    pub fn load_region(&self, geojson: &str) -> Result<Vec<LayerChange>, AnalysisError> {
        let region = ReferenceRegion::from_geojson_str(geojson)?;
        *lock(&self.region) = Some(Arc::new(region));

        let mut district = lock(&self.district);
        self.district_generation.fetch_add(1, Ordering::SeqCst);
        *district = None;
        let mut visibility = lock(&self.visibility);
        let mut changes = visibility.on_data_unloaded(Layer::Emergency);
        changes.extend(visibility.on_data_unloaded(Layer::Tourism));
        drop(visibility);
        drop(district);

        Ok(changes)
    }

    /// The loaded reference district.
    #[must_use]
    pub fn region(&self) -> Option<Arc<ReferenceRegion>> {
        lock(&self.region).clone()
    }

    /// Queries the district layers. Layers that loaded are marked loaded;
    /// layers that failed are marked unloaded, so a layer attached by an
    /// earlier refresh detaches instead of showing stale markers.
    ///
    /// Returns `Ok(None)` if another refresh or a new boundary arrived
    /// while this one was in flight.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoReferenceGeometry`] if no region has
    /// been loaded. Failed layers are reported inside [`DistrictData`].
    pub async fn refresh_district(
        &self,
    ) -> Result<Option<(Arc<DistrictData>, Vec<LayerChange>)>, AnalysisError> {
        let generation = self.district_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let region = self.region().ok_or(AnalysisError::NoReferenceGeometry)?;
        let bounds = self.config.region.district();
        let data = Arc::new(load_district(&self.source, &region, bounds).await);

        let mut latest = lock(&self.district);
        if self.district_generation.load(Ordering::SeqCst) != generation {
            log::warn!("Discarding superseded district refresh {generation}");
            return Ok(None);
        }
        *latest = Some(data.clone());

        let mut visibility = lock(&self.visibility);
        let mut changes = Vec::new();
        for (layer, loaded) in [
            (Layer::Emergency, data.emergency.loaded().is_some()),
            (Layer::Tourism, data.tourism.loaded().is_some()),
        ] {
            changes.extend(if loaded {
                visibility.on_data_loaded(layer)
            } else {
                visibility.on_data_unloaded(layer)
            });
        }
        drop(visibility);
        drop(latest);

        Ok(Some((data, changes)))
    }

    /// The latest district layers.
    #[must_use]
    pub fn district(&self) -> Option<Arc<DistrictData>> {
        lock(&self.district).clone()
    }

    /// Markers of a district layer, if that layer is attached.
    #[must_use]
    pub fn district_markers(&self, layer: Layer) -> Vec<FeatureDot> {
        if !lock(&self.visibility).is_attached(layer) {
            return Vec::new();
        }
        let Some(data) = self.district() else {
            return Vec::new();
        };
        let markers = match layer {
            Layer::Emergency => data.emergency.loaded().map(|l| &l.markers),
            Layer::Tourism => data.tourism.loaded().map(|l| &l.markers),
            Layer::LocalUnits | Layer::ProximityDots => None,
        };
        markers.cloned().unwrap_or_default()
    }

    /// Handles a click at `at`. Returns `None` when no district is loaded
    /// or the click is outside it.
    #[must_use]
    pub fn district_popup(&self, at: Coordinates) -> Option<DistrictPopup> {
        let Some(region) = self.region() else {
            log::debug!("Ignoring district click before the boundary loaded");
            return None;
        };
        let (show_emergency, show_tourism) = {
            let visibility = lock(&self.visibility);
            (
                visibility.toggle(Layer::Emergency),
                visibility.toggle(Layer::Tourism),
            )
        };
        let data = self.district();
        district_popup(&region, data.as_deref(), at, show_emergency, show_tourism)
    }

    /// Loads local-unit boundaries from a `GeoJSON` document.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Spatial`] if no named unit could be read.
    pub fn load_local_units(&self, geojson: &str) -> Result<Vec<LayerChange>, AnalysisError> {
        let units = LocalUnits::from_geojson_str(geojson)?;
        log::info!("Loaded {} local units", units.units().len());
        *lock(&self.local_units) = Some(Arc::new(units));
        Ok(lock(&self.visibility).on_data_loaded(Layer::LocalUnits))
    }

    /// Stats for the local unit at `at`, if the local-unit layer is
    /// attached and a unit contains the point.
    #[must_use]
    pub fn local_unit_popup(&self, at: Coordinates) -> Option<LocalUnitStats> {
        if !lock(&self.visibility).is_attached(Layer::LocalUnits) {
            return None;
        }
        let units = lock(&self.local_units).clone()?;
        units.unit_at(at).map(|unit| unit.stats())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use safety_map_overpass::{FeatureFilter, OverpassError, QueryArea};
    use safety_map_overpass_models::RawFeature;

    use super::*;
    use crate::district::test_support::{DISTRICT, INSIDE, OUTSIDE};
    use crate::test_support::{Canned, StubSource, feature, location};

    fn config() -> AppConfig {
        let mut config = AppConfig::embedded().unwrap();
        config.locations = vec![
            location("home", "Home", 27.59, 85.26),
            location("school", "School", 27.61, 85.27),
        ];
        config
    }

    fn hospital_at(lat: f64, lon: f64) -> Canned {
        Canned::Features(vec![feature(
            1,
            &[("amenity", "hospital")],
            Some(Coordinates::new(lat, lon)),
        )])
    }

    #[tokio::test]
    async fn superseded_run_is_discarded() {
        let source = StubSource {
            around: vec![(27.59, hospital_at(27.591, 85.26))],
            slow_radius: Some((500.0, Duration::from_millis(100))),
            ..StubSource::default()
        };
        let session = Session::new(source, config());

        let (slow, fast) = tokio::join!(
            session.run_proximity_analysis(500.0),
            session.run_proximity_analysis(1000.0),
        );

        assert!(slow.unwrap().is_none());
        let fast = fast.unwrap().unwrap();
        assert_eq!(fast.generation, 2);
        assert_eq!(session.generation(), 2);

        let latest = session.proximity_report().unwrap();
        assert_eq!(latest.generation, 2);
        assert!((latest.radius_m - 1000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn dots_follow_marker_zoom() {
        let source = StubSource {
            around: vec![(27.59, hospital_at(27.591, 85.26))],
            ..StubSource::default()
        };
        let session = Session::new(source, config());
        session.run_proximity_analysis(1000.0).await.unwrap();

        assert!(session.proximity_dots().is_empty());
        assert_eq!(
            session.on_zoom_changed(13),
            vec![LayerChange::Attach(Layer::ProximityDots)]
        );
        assert_eq!(session.proximity_dots().len(), 1);
    }

    #[tokio::test]
    async fn invalid_radius_does_not_advance_generation() {
        let session = Session::new(StubSource::default(), config());
        assert!(session.run_proximity_analysis(-1.0).await.is_err());
        assert_eq!(session.generation(), 0);
    }

    #[tokio::test]
    async fn new_route_replaces_previous() {
        let source = StubSource {
            bounded: vec![
                (FeatureFilter::Hospital, hospital_at(27.6, 85.27)),
                (FeatureFilter::Police, Canned::Fail),
            ],
            ..StubSource::default()
        };
        let session = Session::new(source, config());
        assert!(session.current_route().is_none());

        let first = session
            .run_nearest_route("home", ServiceCategory::Hospital)
            .await
            .unwrap()
            .unwrap();
        let second = session
            .run_nearest_route("school", ServiceCategory::Hospital)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.origin.key, "home");
        assert_eq!(session.current_route().unwrap(), second);

        assert!(
            session
                .run_nearest_route("home", ServiceCategory::Police)
                .await
                .is_err()
        );
        assert_eq!(session.current_route().unwrap().origin.key, "school");
    }

    #[tokio::test]
    async fn slow_route_does_not_replace_newer_one() {
        let source = StubSource {
            bounded: vec![
                (FeatureFilter::Hospital, hospital_at(27.6, 85.27)),
                (FeatureFilter::Police, hospital_at(27.6, 85.27)),
            ],
            slow_filter: Some((FeatureFilter::Hospital, Duration::from_millis(100))),
            ..StubSource::default()
        };
        let session = Session::new(source, config());

        let (slow, fast) = tokio::join!(
            session.run_nearest_route("home", ServiceCategory::Hospital),
            session.run_nearest_route("school", ServiceCategory::Police),
        );

        assert!(slow.unwrap().is_none());
        let fast = fast.unwrap().unwrap();
        assert_eq!(fast.origin.key, "school");
        assert_eq!(session.current_route().unwrap(), fast);
    }

    #[tokio::test]
    async fn district_requires_boundary() {
        let session = Session::new(StubSource::default(), config());
        assert!(matches!(
            session.refresh_district().await,
            Err(AnalysisError::NoReferenceGeometry)
        ));
        assert!(session.district_popup(INSIDE).is_none());
    }

    #[tokio::test]
    async fn district_layers_attach_after_load() {
        let source = StubSource {
            bounded: vec![
                (
                    FeatureFilter::DistrictEmergency,
                    Canned::Features(vec![feature(1, &[("amenity", "police")], Some(INSIDE))]),
                ),
                (FeatureFilter::Tourism, Canned::Fail),
            ],
            ..StubSource::default()
        };
        let session = Session::new(source, config());
        assert!(session.load_region(DISTRICT).unwrap().is_empty());

        let (data, changes) = session.refresh_district().await.unwrap().unwrap();
        assert_eq!(changes, vec![LayerChange::Attach(Layer::Emergency)]);
        assert!(data.tourism.loaded().is_none());
        assert_eq!(session.district_markers(Layer::Emergency).len(), 1);
        assert!(session.district_markers(Layer::Tourism).is_empty());

        let popup = session.district_popup(INSIDE).unwrap();
        assert_eq!(popup.emergency.unwrap().police, 1);
        assert!(popup.tourism.is_none());
        assert!(session.district_popup(OUTSIDE).is_none());

        session.set_toggle(Layer::Emergency, false);
        assert!(session.district_popup(INSIDE).unwrap().emergency.is_none());
        assert!(session.district_markers(Layer::Emergency).is_empty());
    }

    /// Answers the district emergency query once, fails the second time,
    /// and succeeds again afterwards. Tourism is always empty.
    #[derive(Default)]
    struct FlakyDistrict {
        emergency_calls: AtomicUsize,
    }

    #[async_trait]
    impl FeatureSource for FlakyDistrict {
        async fn query_features(
            &self,
            _area: &QueryArea,
            filter: &FeatureFilter,
        ) -> Result<Vec<RawFeature>, OverpassError> {
            if *filter != FeatureFilter::DistrictEmergency {
                return Ok(Vec::new());
            }
            match self.emergency_calls.fetch_add(1, Ordering::SeqCst) {
                1 => Err(OverpassError::Status { status: 504 }),
                _ => Ok(vec![feature(1, &[("amenity", "police")], Some(INSIDE))]),
            }
        }
    }

    #[tokio::test]
    async fn failed_refresh_detaches_loaded_layer() {
        let session = Session::new(FlakyDistrict::default(), config());
        session.load_region(DISTRICT).unwrap();

        let (_, changes) = session.refresh_district().await.unwrap().unwrap();
        assert_eq!(changes, vec![LayerChange::Attach(Layer::Emergency)]);
        assert_eq!(session.district_markers(Layer::Emergency).len(), 1);

        let (data, changes) = session.refresh_district().await.unwrap().unwrap();
        assert_eq!(changes, vec![LayerChange::Detach(Layer::Emergency)]);
        assert!(data.emergency.loaded().is_none());
        assert!(!session.visibility().is_attached(Layer::Emergency));
        assert!(session.district_markers(Layer::Emergency).is_empty());

        let (_, changes) = session.refresh_district().await.unwrap().unwrap();
        assert_eq!(changes, vec![LayerChange::Attach(Layer::Emergency)]);

        assert_eq!(
            session.load_region(DISTRICT).unwrap(),
            vec![LayerChange::Detach(Layer::Emergency)]
        );
        assert!(session.district().is_none());
        assert!(!session.visibility().is_attached(Layer::Emergency));
    }

    #[tokio::test]
    async fn new_boundary_discards_refresh_in_flight() {
        let source = StubSource {
            bounded: vec![(
                FeatureFilter::DistrictEmergency,
                Canned::Features(vec![feature(1, &[("amenity", "police")], Some(INSIDE))]),
            )],
            slow_filter: Some((FeatureFilter::DistrictEmergency, Duration::from_millis(100))),
            ..StubSource::default()
        };
        let session = Session::new(source, config());
        session.load_region(DISTRICT).unwrap();

        let (refresh, reload) = tokio::join!(session.refresh_district(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.load_region(DISTRICT)
        });

        assert!(refresh.unwrap().is_none());
        assert!(reload.unwrap().is_empty());
        assert!(session.district().is_none());
        assert!(!session.visibility().is_attached(Layer::Emergency));
    }

    #[test]
    fn local_units_need_toggle() {
        let units = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "GaPa_NaPa": "Kirtipur" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [85.25, 27.6], [85.4, 27.6], [85.4, 27.8], [85.25, 27.8], [85.25, 27.6]
                    ]]
                }
            }]
        }"#;
        let session = Session::new(StubSource::default(), config());
        assert!(session.load_local_units(units).unwrap().is_empty());
        assert!(session.local_unit_popup(INSIDE).is_none());

        session.set_toggle(Layer::LocalUnits, true);
        let stats = session.local_unit_popup(INSIDE).unwrap();
        assert_eq!(stats.name, "Kirtipur");
        assert!(stats.population.is_some());
        assert!(session.local_unit_popup(OUTSIDE).is_none());
    }
}
