#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layer visibility controller.
//!
//! Each map layer is either [`LayerState::Hidden`] or
//! [`LayerState::Visible`]. A layer is visible iff its data has loaded, its
//! toggle is on, and (for zoom-gated layers) the current zoom is at or
//! above the layer's threshold. The controller is re-evaluated on zoom
//! changes, toggle changes, and data-load completion, and only reports
//! layers whose state actually changed, so repeated evaluations with the
//! same inputs never detach and re-attach a layer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default minimum zoom for point layers.
pub const DEFAULT_ZOOM_THRESHOLD: i32 = 11;

/// Default minimum zoom for per-feature dots in the proximity view.
pub const DEFAULT_MARKER_ZOOM: i32 = 13;

/// Map layers the controller manages.
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
pub enum Layer {
    /// District emergency service markers.
    Emergency,
    /// District tourism markers.
    Tourism,
    /// Local unit boundaries. Not zoom-gated.
    LocalUnits,
    /// Per-feature dots around each named location.
    ProximityDots,
}

impl Layer {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Emergency,
            Self::Tourism,
            Self::LocalUnits,
            Self::ProximityDots,
        ]
    }

    /// Initial checkbox state.
    #[must_use]
    pub const fn default_toggle(self) -> bool {
        matches!(self, Self::Emergency | Self::ProximityDots)
    }
}

/// Whether a layer is attached to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerState {
    /// Detached.
    Hidden,
    /// Attached.
    Visible,
}

/// An attach/detach instruction for the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerChange {
    /// Add the layer to the map.
    Attach(Layer),
    /// Remove the layer from the map.
    Detach(Layer),
}

/// The visibility rule for a zoom-gated layer.
#[must_use]
pub const fn is_visible(zoom: i32, threshold: i32, toggle: bool) -> bool {
    zoom >= threshold && toggle
}

/// Zoom thresholds for the managed layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VisibilityConfig {
    /// Minimum zoom for emergency and tourism markers.
    #[serde(default = "default_zoom_threshold")]
    pub zoom_threshold: i32,
    /// Minimum zoom for proximity dots.
    #[serde(default = "default_marker_zoom")]
    pub marker_zoom: i32,
}

const fn default_zoom_threshold() -> i32 {
    DEFAULT_ZOOM_THRESHOLD
}

const fn default_marker_zoom() -> i32 {
    DEFAULT_MARKER_ZOOM
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            zoom_threshold: DEFAULT_ZOOM_THRESHOLD,
            marker_zoom: DEFAULT_MARKER_ZOOM,
        }
    }
}

impl VisibilityConfig {
    /// Minimum zoom for `layer`, or `None` if it ignores zoom.
    #[must_use]
    pub const fn threshold(&self, layer: Layer) -> Option<i32> {
        match layer {
            Layer::Emergency | Layer::Tourism => Some(self.zoom_threshold),
            Layer::ProximityDots => Some(self.marker_zoom),
            Layer::LocalUnits => None,
        }
    }
}

/// Tracks zoom, toggles, loaded data, and attached layers.
#[derive(Debug, Clone)]
pub struct VisibilityController {
    config: VisibilityConfig,
    zoom: i32,
    toggles: BTreeMap<Layer, bool>,
    loaded: BTreeSet<Layer>,
    states: BTreeMap<Layer, LayerState>,
}

impl VisibilityController {
    /// Creates a controller at `zoom` with default toggles and nothing
    /// loaded.
    #[must_use]
    pub fn new(config: VisibilityConfig, zoom: i32) -> Self {
        Self {
            config,
            zoom,
            toggles: Layer::all()
                .iter()
                .map(|layer| (*layer, layer.default_toggle()))
                .collect(),
            loaded: BTreeSet::new(),
            states: Layer::all()
                .iter()
                .map(|layer| (*layer, LayerState::Hidden))
                .collect(),
        }
    }

    /// Current zoom level.
    #[must_use]
    pub const fn zoom(&self) -> i32 {
        self.zoom
    }

    /// Current toggle for `layer`.
    #[must_use]
    pub fn toggle(&self, layer: Layer) -> bool {
        self.toggles.get(&layer).copied().unwrap_or(false)
    }

    /// Current attached state of `layer`.
    #[must_use]
    pub fn state(&self, layer: Layer) -> LayerState {
        self.states
            .get(&layer)
            .copied()
            .unwrap_or(LayerState::Hidden)
    }

    /// Whether `layer` is currently attached.
    #[must_use]
    pub fn is_attached(&self, layer: Layer) -> bool {
        self.state(layer) == LayerState::Visible
    }

    /// Whether `layer` would be shown with the current zoom and toggle,
    /// regardless of whether its data has loaded.
    #[must_use]
    pub fn wants(&self, layer: Layer) -> bool {
        let toggle = self.toggle(layer);
        self.config
            .threshold(layer)
            .map_or(toggle, |threshold| is_visible(self.zoom, threshold, toggle))
    }

    /// Handles a zoom-change event.
    pub fn on_zoom_changed(&mut self, zoom: i32) -> Vec<LayerChange> {
        log::debug!("Zoom changed {} -> {zoom}", self.zoom);
        self.zoom = zoom;
        self.recompute()
    }

    /// Handles a toggle-change event.
    pub fn set_toggle(&mut self, layer: Layer, enabled: bool) -> Vec<LayerChange> {
        log::debug!("Toggle {layer} -> {enabled}");
        self.toggles.insert(layer, enabled);
        self.recompute()
    }

    /// Marks `layer`'s data as loaded (or reloaded) and re-evaluates.
    pub fn on_data_loaded(&mut self, layer: Layer) -> Vec<LayerChange> {
        self.loaded.insert(layer);
        self.recompute()
    }

    /// Marks `layer`'s data as gone (failed reload or cleared source) and
    /// re-evaluates. An attached layer detaches.
    pub fn on_data_unloaded(&mut self, layer: Layer) -> Vec<LayerChange> {
        self.loaded.remove(&layer);
        self.recompute()
    }

    /// Re-evaluates every layer, returning only the layers whose state
    /// changed.
    pub fn recompute(&mut self) -> Vec<LayerChange> {
        let mut changes = Vec::new();

        for layer in Layer::all() {
            let desired = if self.loaded.contains(layer) && self.wants(*layer) {
                LayerState::Visible
            } else {
                LayerState::Hidden
            };

            if self.state(*layer) == desired {
                continue;
            }

            self.states.insert(*layer, desired);
            changes.push(match desired {
                LayerState::Visible => LayerChange::Attach(*layer),
                LayerState::Hidden => LayerChange::Detach(*layer),
            });
        }

        changes
    }
}
