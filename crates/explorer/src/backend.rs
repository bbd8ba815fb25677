//! Capability seam over the external mapping library.
//!
//! The engine never draws anything itself. Everything it needs from the
//! library (markers, popups, the layer group, the camera and pixel
//! projection) goes through [`MapBackend`]. Library events (marker click,
//! empty-map click, movement finished, popup action) are forwarded by the
//! host into the matching `Explorer::on_*` methods.

use catalog::CountryKind;
use foundation::handles::Handle;
use foundation::math::{LatLng, Projector, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::popup::PopupContent;

/// Opaque reference to one library-side marker instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    pub class_name: &'static str,
    /// Added to the library's latitude-based stacking order.
    pub z_index_offset: i32,
}

impl MarkerStyle {
    pub fn for_kind(kind: CountryKind) -> Self {
        match kind {
            CountryKind::Sovereign => Self {
                class_name: "country-marker",
                z_index_offset: 1000,
            },
            CountryKind::DeFacto => Self {
                class_name: "de-facto-marker",
                z_index_offset: 750,
            },
            CountryKind::Territory => Self {
                class_name: "territory-marker",
                z_index_offset: 500,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub country_id: String,
    pub position: LatLng,
    pub style: MarkerStyle,
}

/// Options used when the map instance is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Panning is limited to `±max_bounds_lat` / `±max_bounds_lng`.
    pub max_bounds_lat: f64,
    /// Wider than one world so the outer marker copies stay reachable.
    pub max_bounds_lng: f64,
    pub world_copy_jump: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center_lat: 20.0,
            center_lng: 0.0,
            zoom: 2.0,
            min_zoom: 2.0,
            max_zoom: 10.0,
            max_bounds_lat: 85.0,
            max_bounds_lng: 540.0,
            world_copy_jump: false,
        }
    }
}

impl MapOptions {
    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lng)
    }
}

pub trait MapBackend: Projector {
    fn create_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerHandle, BackendError>;
    fn remove_marker(&mut self, marker: MarkerHandle);
    fn marker_exists(&self, marker: MarkerHandle) -> bool;

    /// Adds the marker to the rendered layer group.
    fn attach(&mut self, marker: MarkerHandle) -> Result<(), BackendError>;
    /// Removes the marker from the rendered layer group without destroying it.
    fn detach(&mut self, marker: MarkerHandle) -> Result<(), BackendError>;
    fn is_attached(&self, marker: MarkerHandle) -> bool;

    /// Groups attach/detach calls into one rendering pass.
    fn begin_batch(&mut self) {}
    fn end_batch(&mut self) {}

    fn bind_popup(&mut self, marker: MarkerHandle, content: PopupContent)
    -> Result<(), BackendError>;
    fn open_popup(&mut self, marker: MarkerHandle) -> Result<(), BackendError>;
    /// Closes whichever popup is open; no-op when none is.
    fn close_popup(&mut self);
    fn open_popup_marker(&self) -> Option<MarkerHandle>;

    fn center(&self) -> LatLng;
    fn zoom(&self) -> f64;
    fn viewport_size(&self) -> Vec2;
    fn resize(&mut self, size: Vec2);
    /// Starts an eased pan/zoom. A new call supersedes any flight in progress.
    fn fly_to(&mut self, center: LatLng, zoom: f64, duration_ms: u64);

    fn dispose(&mut self);
    fn is_disposed(&self) -> bool;
}
