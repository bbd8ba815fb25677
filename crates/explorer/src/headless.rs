//! In-memory [`MapBackend`] used by tests and the CLI.
//!
//! Projection is exact Web-Mercator. Flights are recorded and only land when
//! [`HeadlessMap::complete_flight`] is called, so callers decide whether a
//! "movement finished" signal ever happens.

use std::collections::HashSet;

use foundation::handles::Handle;
use foundation::math::{LatLng, Projector, Vec2, WebMercator};

use crate::backend::{MapBackend, MapOptions, MarkerHandle, MarkerSpec};
use crate::error::BackendError;
use crate::popup::PopupContent;

#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    pub from_center: LatLng,
    pub from_zoom: f64,
    pub center: LatLng,
    pub zoom: f64,
    pub duration_ms: u64,
}

#[derive(Debug)]
struct HeadlessMarker {
    spec: MarkerSpec,
    attached: bool,
    popup: Option<PopupContent>,
    removed: bool,
}

#[derive(Debug)]
pub struct HeadlessMap {
    instance: u32,
    markers: Vec<HeadlessMarker>,
    center: LatLng,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    size: Vec2,
    flight: Option<Flight>,
    flights_started: usize,
    open_popup: Option<MarkerHandle>,
    popups_opened: usize,
    batch_depth: usize,
    batch_dirty: bool,
    render_passes: usize,
    failing_countries: HashSet<String>,
    disposed: bool,
}

impl HeadlessMap {
    pub fn new(options: &MapOptions, size: Vec2) -> Self {
        Self {
            instance: 0,
            markers: Vec::new(),
            center: options.center(),
            zoom: options.zoom,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            size,
            flight: None,
            flights_started: 0,
            open_popup: None,
            popups_opened: 0,
            batch_depth: 0,
            batch_dirty: false,
            render_passes: 0,
            failing_countries: HashSet::new(),
            disposed: false,
        }
    }

    /// Tags handles with `instance` so handles from another map never resolve here.
    pub fn with_instance(mut self, instance: u32) -> Self {
        self.instance = instance;
        self
    }

    /// Makes `create_marker` fail for every copy of `country_id`.
    pub fn fail_markers_for(&mut self, country_id: impl Into<String>) {
        self.failing_countries.insert(country_id.into());
    }

    pub fn pending_flight(&self) -> Option<&Flight> {
        self.flight.as_ref()
    }

    /// Lands the pending flight. Returns `false` if nothing was in the air.
    pub fn complete_flight(&mut self) -> bool {
        let Some(flight) = self.flight.take() else {
            return false;
        };
        self.center = flight.center;
        self.zoom = flight.zoom;
        true
    }

    /// Moves the camera immediately, cancelling any flight (a user drag).
    pub fn jump_to(&mut self, center: LatLng, zoom: f64) {
        self.flight = None;
        self.center = center;
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn markers_created(&self) -> usize {
        self.markers.len()
    }

    pub fn attached_count(&self) -> usize {
        self.markers
            .iter()
            .filter(|m| m.attached && !m.removed)
            .count()
    }

    pub fn flights_started(&self) -> usize {
        self.flights_started
    }

    pub fn popups_opened(&self) -> usize {
        self.popups_opened
    }

    pub fn render_passes(&self) -> usize {
        self.render_passes
    }

    pub fn marker_spec(&self, marker: MarkerHandle) -> Option<&MarkerSpec> {
        self.resolve(marker).map(|idx| &self.markers[idx].spec)
    }

    pub fn popup_content(&self, marker: MarkerHandle) -> Option<&PopupContent> {
        self.resolve(marker)
            .and_then(|idx| self.markers[idx].popup.as_ref())
    }

    fn resolve(&self, marker: MarkerHandle) -> Option<usize> {
        if self.disposed || marker.0.generation() != self.instance {
            return None;
        }
        let idx = marker.0.index() as usize;
        self.markers
            .get(idx)
            .filter(|m| !m.removed)
            .map(|_| idx)
    }

    fn resolve_or_err(&self, marker: MarkerHandle) -> Result<usize, BackendError> {
        if self.disposed {
            return Err(BackendError::Disposed);
        }
        self.resolve(marker).ok_or(BackendError::UnknownMarker)
    }

    fn mark_rendered(&mut self) {
        if self.batch_depth > 0 {
            self.batch_dirty = true;
        } else {
            self.render_passes += 1;
        }
    }
}

impl Projector for HeadlessMap {
    fn project(&self, at: LatLng, zoom: f64) -> Vec2 {
        WebMercator.project(at, zoom)
    }

    fn unproject(&self, pixel: Vec2, zoom: f64) -> LatLng {
        WebMercator.unproject(pixel, zoom)
    }
}

impl MapBackend for HeadlessMap {
    fn create_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerHandle, BackendError> {
        if self.disposed {
            return Err(BackendError::Disposed);
        }
        if self.failing_countries.contains(&spec.country_id) {
            return Err(BackendError::MarkerRejected {
                country_id: spec.country_id.clone(),
                reason: "injected failure".to_string(),
            });
        }
        if !spec.position.is_valid() {
            return Err(BackendError::MarkerRejected {
                country_id: spec.country_id.clone(),
                reason: "invalid position".to_string(),
            });
        }
        let handle = MarkerHandle(Handle::new(self.markers.len() as u32, self.instance));
        self.markers.push(HeadlessMarker {
            spec: spec.clone(),
            attached: false,
            popup: None,
            removed: false,
        });
        Ok(handle)
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        let Some(idx) = self.resolve(marker) else {
            return;
        };
        if self.open_popup == Some(marker) {
            self.open_popup = None;
        }
        let m = &mut self.markers[idx];
        m.removed = true;
        m.attached = false;
    }

    fn marker_exists(&self, marker: MarkerHandle) -> bool {
        self.resolve(marker).is_some()
    }

    fn attach(&mut self, marker: MarkerHandle) -> Result<(), BackendError> {
        let idx = self.resolve_or_err(marker)?;
        if !self.markers[idx].attached {
            self.markers[idx].attached = true;
            self.mark_rendered();
        }
        Ok(())
    }

    fn detach(&mut self, marker: MarkerHandle) -> Result<(), BackendError> {
        let idx = self.resolve_or_err(marker)?;
        if self.markers[idx].attached {
            self.markers[idx].attached = false;
            if self.open_popup == Some(marker) {
                self.open_popup = None;
            }
            self.mark_rendered();
        }
        Ok(())
    }

    fn is_attached(&self, marker: MarkerHandle) -> bool {
        self.resolve(marker)
            .is_some_and(|idx| self.markers[idx].attached)
    }

    fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 && self.batch_dirty {
            self.batch_dirty = false;
            self.render_passes += 1;
        }
    }

    fn bind_popup(
        &mut self,
        marker: MarkerHandle,
        content: PopupContent,
    ) -> Result<(), BackendError> {
        let idx = self.resolve_or_err(marker)?;
        self.markers[idx].popup = Some(content);
        Ok(())
    }

    fn open_popup(&mut self, marker: MarkerHandle) -> Result<(), BackendError> {
        let idx = self.resolve_or_err(marker)?;
        let m = &self.markers[idx];
        if m.popup.is_none() {
            return Err(BackendError::MarkerRejected {
                country_id: m.spec.country_id.clone(),
                reason: "no popup bound".to_string(),
            });
        }
        if !m.attached {
            return Err(BackendError::MarkerRejected {
                country_id: m.spec.country_id.clone(),
                reason: "marker is not on the map".to_string(),
            });
        }
        self.open_popup = Some(marker);
        self.popups_opened += 1;
        Ok(())
    }

    fn close_popup(&mut self) {
        self.open_popup = None;
    }

    fn open_popup_marker(&self) -> Option<MarkerHandle> {
        self.open_popup
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn viewport_size(&self) -> Vec2 {
        self.size
    }

    fn resize(&mut self, size: Vec2) {
        self.size = size;
    }

    fn fly_to(&mut self, center: LatLng, zoom: f64, duration_ms: u64) {
        if self.disposed {
            return;
        }
        self.flights_started += 1;
        self.flight = Some(Flight {
            from_center: self.center,
            from_zoom: self.zoom,
            center,
            zoom: zoom.clamp(self.min_zoom, self.max_zoom),
            duration_ms,
        });
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.flight = None;
        self.open_popup = None;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
