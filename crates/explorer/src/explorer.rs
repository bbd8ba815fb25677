//! The controller that owns one mounted map and everything hanging off it.
//!
//! Hosts forward rendering-library events (`on_marker_click`, `on_map_click`,
//! `on_move_end`, `on_popup_action`), UI input (`set_query`, `on_search_key`,
//! filters, panels, viewport) and URL changes (`on_url_changed`), then call
//! [`Explorer::advance`] as time passes and drain [`HostRequest`]s.
//!
//! Map-facing methods are no-ops unless a map is mounted and ready.

use catalog::{Catalog, CountryKind, CountryRecord, Region};
use foundation::math::Vec2;
use foundation::time::Time;
use rand::SeedableRng;
use rand::rngs::StdRng;
use runtime::{EventBus, EventLoop, TimerId};
use tracing::{debug, info, warn};

use crate::backend::{MapBackend, MapOptions, MarkerHandle};
use crate::centering::{
    DeviceClass, PanelState, ViewportChrome, compute_centering_target, container_point,
};
use crate::config::ExplorerConfig;
use crate::deep_link::{DeepLinkSync, LinkAction, country_param};
use crate::discovery::RandomDiscovery;
use crate::error::BackendError;
use crate::markers::{InitSummary, MarkerRegistry};
use crate::popup::PopupAction;
use crate::search::{KeyOutcome, SearchIndex, SearchKey, SearchRow, SearchState};
use crate::selection::{ActiveSelection, SelectionMachine, SelectionOrigin, SelectionPhase, nearest_copy};
use crate::visibility::{MapViewState, RegionFilter, VisibilityEngine, visible_country_ids};

/// Builds a backend for the given options and container size.
pub type MapFactory<B> = Box<dyn FnMut(&MapOptions, Vec2) -> Result<B, BackendError>>;

/// Side effects the host must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    /// Set (`Some`) or remove (`None`) the `country` query parameter.
    WriteCountryParam(Option<String>),
    /// Navigate to the detail page of a country.
    NavigateToProfile(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Unmounted,
    Initializing,
    Ready,
    /// Gave up after `max_init_attempts`.
    Failed,
    Disposed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Task {
    RetryInit,
    Reconcile,
    SettleCheck(u64),
    SafetyTimeout(u64),
}

const DEFAULT_VIEWPORT: Vec2 = Vec2 { x: 1280.0, y: 800.0 };

pub struct Explorer<B: MapBackend> {
    config: ExplorerConfig,
    catalog: Catalog,
    search_index: SearchIndex,
    factory: MapFactory<B>,
    map: Option<B>,
    lifecycle: Lifecycle,
    attempts: u32,
    last_init: Option<InitSummary>,
    registry: MarkerRegistry,
    visibility: VisibilityEngine,
    view: MapViewState,
    selection: SelectionMachine,
    search: SearchState,
    deep_link: DeepLinkSync,
    discovery: RandomDiscovery,
    events: EventLoop<Task>,
    outbox: EventBus<HostRequest>,
    rng: StdRng,
    viewport: Vec2,
    device: DeviceClass,
    panels: PanelState,
    /// Latest `country` value seen before the map was ready.
    pending_url: Option<Option<String>>,
    settle_timers: Vec<TimerId>,
}

impl<B: MapBackend> Explorer<B> {
    pub fn new(
        config: ExplorerConfig,
        catalog: Catalog,
        factory: impl FnMut(&MapOptions, Vec2) -> Result<B, BackendError> + 'static,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let device = DeviceClass::classify(DEFAULT_VIEWPORT.x, config.mobile_breakpoint_px);
        Self {
            search_index: SearchIndex::new(&catalog),
            config,
            catalog,
            factory: Box::new(factory),
            map: None,
            lifecycle: Lifecycle::Unmounted,
            attempts: 0,
            last_init: None,
            registry: MarkerRegistry::new(),
            visibility: VisibilityEngine::new(),
            view: MapViewState::default(),
            selection: SelectionMachine::new(),
            search: SearchState::new(),
            deep_link: DeepLinkSync::new(),
            discovery: RandomDiscovery::new(),
            events: EventLoop::new(),
            outbox: EventBus::new(),
            rng,
            viewport: DEFAULT_VIEWPORT,
            device,
            panels: PanelState::default(),
            pending_url: None,
            settle_timers: Vec::new(),
        }
    }

    // ---- accessors ----

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn init_attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_init(&self) -> Option<&InitSummary> {
        self.last_init.as_ref()
    }

    pub fn map(&self) -> Option<&B> {
        self.map.as_ref()
    }

    /// Direct backend access for hosts relaying library state (and for tests).
    pub fn map_mut(&mut self) -> Option<&mut B> {
        self.map.as_mut()
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    pub fn view(&self) -> &MapViewState {
        &self.view
    }

    pub fn active_country_id(&self) -> Option<&str> {
        self.view.active_country_id.as_deref()
    }

    pub fn phase(&self) -> &SelectionPhase {
        self.selection.phase()
    }

    pub fn active_selection(&self) -> Option<&ActiveSelection> {
        self.selection.active()
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn search_rows(&self) -> Vec<SearchRow<'_>> {
        self.search.rows(&self.catalog)
    }

    pub fn deep_link(&self) -> &DeepLinkSync {
        &self.deep_link
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn panels(&self) -> PanelState {
        self.panels
    }

    pub fn chrome(&self) -> ViewportChrome {
        self.config.chrome.for_device(self.device).resolve(self.panels)
    }

    pub fn now(&self) -> Time {
        self.events.now()
    }

    pub fn pending_tasks(&self) -> usize {
        self.events.pending()
    }

    pub fn requests(&self) -> impl Iterator<Item = &HostRequest> {
        self.outbox.events().iter().map(|e| &e.payload)
    }

    pub fn drain_requests(&mut self) -> Vec<HostRequest> {
        self.outbox.drain().into_iter().map(|e| e.payload).collect()
    }

    fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    // ---- lifecycle ----

    /// Creates the map and its markers, retrying on failure.
    pub fn mount(&mut self) {
        match self.lifecycle {
            Lifecycle::Initializing | Lifecycle::Ready => return,
            Lifecycle::Unmounted | Lifecycle::Failed | Lifecycle::Disposed => {}
        }
        self.lifecycle = Lifecycle::Initializing;
        self.attempts = 0;
        self.try_init();
    }

    fn try_init(&mut self) {
        self.attempts += 1;
        let attempt = self.attempts;
        let mut map = match (self.factory)(&self.config.map, self.viewport) {
            Ok(map) => map,
            Err(error) => {
                if attempt >= self.config.max_init_attempts {
                    warn!(attempt, %error, "map initialization failed, giving up");
                    self.lifecycle = Lifecycle::Failed;
                } else {
                    warn!(attempt, %error, "map initialization failed, retrying");
                    self.events
                        .defer(self.config.init_retry_delay_ms, Task::RetryInit);
                }
                return;
            }
        };

        map.resize(self.viewport);
        let summary = self.registry.initialize(&mut map, &self.catalog.subsets());
        info!(
            attempt,
            markers = summary.created,
            failures = summary.failures.len(),
            countries = self.registry.country_count(),
            "map ready"
        );
        self.last_init = Some(summary);
        self.map = Some(map);
        self.lifecycle = Lifecycle::Ready;

        // Filters may have changed before the map existed.
        self.request_reconcile();

        if let Some(param) = self.pending_url.take() {
            self.apply_country_param(param);
        }
    }

    /// Tears everything down. Nothing scheduled before this call runs afterwards.
    pub fn unmount(&mut self) {
        let cancelled = self.events.clear();
        self.settle_timers.clear();
        self.visibility.cancel();
        if let Some(mut map) = self.map.take() {
            map.close_popup();
            self.registry.release(&mut map);
            map.dispose();
        }
        self.selection.clear();
        self.discovery.reset();
        self.search.clear();
        self.deep_link.reset();
        self.view.active_country_id = None;
        self.pending_url = None;
        self.lifecycle = Lifecycle::Disposed;
        debug!(cancelled, "explorer unmounted");
    }

    /// Runs every task due within the next `ms` milliseconds.
    pub fn advance(&mut self, ms: u64) {
        let until = self.events.now().after(ms);
        while let Some(task) = self.events.pop_due(until) {
            self.run(task);
        }
        self.events.settle_at(until);
    }

    /// Runs tasks deferred to the next tick.
    pub fn flush(&mut self) {
        self.advance(0);
    }

    fn run(&mut self, task: Task) {
        match task {
            Task::RetryInit => {
                if self.lifecycle == Lifecycle::Initializing {
                    self.try_init();
                }
            }
            Task::Reconcile => self.reconcile_now(),
            Task::SettleCheck(generation) => self.settle_check(generation),
            Task::SafetyTimeout(generation) => {
                if self.guard(generation).is_some() {
                    debug!(generation, "safety timeout forcing popup");
                    self.open_popup_for(generation);
                }
            }
        }
    }

    // ---- viewport and filters ----

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Vec2::new(width.max(1.0), height.max(1.0));
        self.device = DeviceClass::classify(self.viewport.x, self.config.mobile_breakpoint_px);
        if let Some(map) = self.map.as_mut() {
            map.resize(self.viewport);
        }
    }

    pub fn set_panels(&mut self, panels: PanelState) {
        self.panels = panels;
    }

    pub fn set_region_filter(&mut self, filter: RegionFilter) {
        if self.view.region_filter != filter {
            self.view.region_filter = filter;
            self.request_reconcile();
        }
    }

    pub fn set_territories_visible(&mut self, visible: bool) {
        if self.view.territories_visible != visible {
            self.view.territories_visible = visible;
            self.request_reconcile();
        }
    }

    pub fn set_de_facto_visible(&mut self, visible: bool) {
        if self.view.de_facto_visible != visible {
            self.view.de_facto_visible = visible;
            self.request_reconcile();
        }
    }

    fn request_reconcile(&mut self) {
        if self.visibility.request() {
            self.events.next_tick(Task::Reconcile);
        }
    }

    fn reconcile_now(&mut self) {
        let Some(map) = self.map.as_mut() else {
            self.visibility.cancel();
            return;
        };
        let outcome = self.visibility.reconcile(&self.registry, map, &self.view);
        if outcome.active_hidden {
            debug!(
                country_id = ?self.view.active_country_id,
                "active country filtered out"
            );
            self.deselect();
        }
    }

    /// Adjusts toggles and region so a country of this kind and region is visible.
    fn ensure_visible(&mut self, kind: CountryKind, region: Region) {
        let mut changed = false;
        match kind {
            CountryKind::Territory if !self.view.territories_visible => {
                self.view.territories_visible = true;
                changed = true;
            }
            CountryKind::DeFacto if !self.view.de_facto_visible => {
                self.view.de_facto_visible = true;
                changed = true;
            }
            _ => {}
        }
        if !self.view.region_filter.admits(region) {
            self.view.region_filter = RegionFilter::All;
            changed = true;
        }
        if changed {
            self.request_reconcile();
        }
    }

    // ---- selection ----

    /// Selects `country_id` on behalf of the host. Returns `false` if the map
    /// is not ready or the id has no marker.
    pub fn select_country(&mut self, country_id: &str) -> bool {
        let Some(record) = self.catalog.get(country_id) else {
            debug!(country_id, "select: unknown country");
            return false;
        };
        let (kind, region) = (record.kind, record.region);
        if !self.is_ready() {
            return false;
        }
        self.ensure_visible(kind, region);
        self.select(country_id, SelectionOrigin::Api).is_some()
    }

    fn select(&mut self, country_id: &str, origin: SelectionOrigin) -> Option<u64> {
        let center_lng = self.map.as_ref()?.center().lng;
        let registry = &self.registry;
        let view = &self.view;
        let Some(entry) = nearest_copy(registry, country_id, center_lng, |i| {
            registry.entry(i).is_some_and(|e| view.admits_entry(e))
        }) else {
            debug!(country_id, "no visible marker copy");
            return None;
        };
        self.begin_selection(entry, origin)
    }

    fn begin_selection(&mut self, entry_idx: usize, origin: SelectionOrigin) -> Option<u64> {
        let entry = self.registry.entry(entry_idx)?.clone();
        let chrome = self.chrome();
        let device = self.device;

        let map = self.map.as_mut()?;
        map.close_popup();
        let target = compute_centering_target(
            &*map,
            entry.position,
            map.zoom(),
            map.viewport_size(),
            &chrome,
            device,
            &self.config.centering,
        );
        map.fly_to(target.center, target.zoom, self.config.fly_duration_ms);

        self.cancel_settle_timers();
        let generation = self.selection.begin(
            entry.country_id.clone(),
            entry_idx,
            entry.handle,
            target,
            origin,
        );
        self.view.active_country_id = Some(entry.country_id.clone());

        let extra = match origin {
            SelectionOrigin::DeepLink => self.config.settle.deep_link_extra_delay_ms,
            _ => 0,
        };
        let settle = &self.config.settle;
        let check = self
            .events
            .defer(settle.check_delay_ms + extra, Task::SettleCheck(generation));
        let safety = self
            .events
            .defer(settle.safety_timeout_ms + extra, Task::SafetyTimeout(generation));
        self.settle_timers.extend([check, safety]);

        if origin.writes_url() {
            self.deep_link.mark_processed(entry.country_id.clone());
            self.outbox.emit(
                self.events.now(),
                HostRequest::WriteCountryParam(Some(entry.country_id.clone())),
            );
        }

        debug!(
            country_id = %entry.country_id,
            generation,
            ?origin,
            zoom = target.zoom,
            longitude_offset = entry.longitude_offset,
            "selection centering"
        );
        Some(generation)
    }

    /// Clears the active country, closes its popup and drops the URL parameter.
    pub fn deselect(&mut self) {
        let Some(previous) = self.selection.clear() else {
            return;
        };
        self.cancel_settle_timers();
        self.view.active_country_id = None;
        self.discovery.reset();
        self.deep_link.reset();
        if let Some(map) = self.map.as_mut() {
            map.close_popup();
        }
        self.outbox
            .emit(self.events.now(), HostRequest::WriteCountryParam(None));
        debug!(country_id = %previous.country_id, "selection cleared");
    }

    fn cancel_settle_timers(&mut self) {
        for id in self.settle_timers.drain(..) {
            self.events.cancel(id);
        }
    }

    /// Returns the live selection for `generation` if every reference it
    /// holds is still valid.
    fn guard(&self, generation: u64) -> Option<&ActiveSelection> {
        let Some(map) = self.map.as_ref().filter(|m| !m.is_disposed()) else {
            debug!(generation, "stale callback: map gone");
            return None;
        };
        if !self.selection.is_current(generation) || !self.selection.is_centering() {
            debug!(generation, "stale callback: superseded");
            return None;
        }
        let sel = self.selection.active()?;
        if !map.marker_exists(sel.handle) || !map.is_attached(sel.handle) {
            debug!(generation, country_id = %sel.country_id, "stale callback: marker gone");
            return None;
        }
        Some(sel)
    }

    fn camera_settled(&self, sel: &ActiveSelection) -> bool {
        let (Some(map), Some(entry)) = (self.map.as_ref(), self.registry.entry(sel.entry)) else {
            return false;
        };
        if (map.zoom() - sel.target.zoom).abs() > self.config.settle.zoom_tolerance {
            return false;
        }
        let at = container_point(
            map,
            entry.position,
            map.center(),
            map.zoom(),
            map.viewport_size(),
        );
        at.distance(sel.target.screen_point) <= self.config.settle.tolerance_px
    }

    fn settle_check(&mut self, generation: u64) {
        let settled = match self.guard(generation) {
            Some(sel) => self.camera_settled(sel),
            None => return,
        };
        if settled {
            self.open_popup_for(generation);
        } else {
            debug!(generation, "camera not settled yet");
        }
    }

    fn open_popup_for(&mut self, generation: u64) {
        let Some(sel) = self.selection.settle(generation) else {
            return;
        };
        self.cancel_settle_timers();
        self.discovery.reset();
        let Some(map) = self.map.as_mut() else {
            return;
        };
        match map.open_popup(sel.handle) {
            Ok(()) => debug!(country_id = %sel.country_id, generation, "popup open"),
            Err(error) => {
                warn!(country_id = %sel.country_id, %error, "popup failed to open");
                self.deselect();
            }
        }
    }

    // ---- library events ----

    /// A marker copy was clicked: select exactly that copy.
    pub fn on_marker_click(&mut self, marker: MarkerHandle) {
        if !self.is_ready() {
            return;
        }
        let Some(idx) = self.registry.index_of(marker) else {
            debug!(?marker, "click on unknown marker");
            return;
        };
        self.begin_selection(idx, SelectionOrigin::MarkerClick);
    }

    /// Click on empty map.
    pub fn on_map_click(&mut self) {
        if self.is_ready() {
            self.deselect();
        }
    }

    /// The camera stopped moving.
    pub fn on_move_end(&mut self) {
        let Some(generation) = self.selection.active().map(|s| s.generation) else {
            return;
        };
        let settled = match self.guard(generation) {
            Some(sel) => self.camera_settled(sel),
            None => return,
        };
        if settled {
            self.open_popup_for(generation);
        }
    }

    pub fn on_popup_action(&mut self, country_id: &str, action: PopupAction) {
        if !self.is_ready() || self.catalog.get(country_id).is_none() {
            return;
        }
        match action {
            PopupAction::ViewProfile => {
                info!(country_id, "navigate to profile");
                self.outbox.emit(
                    self.events.now(),
                    HostRequest::NavigateToProfile(country_id.to_string()),
                );
            }
        }
    }

    // ---- search ----

    pub fn set_query(&mut self, query: &str) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        self.search
            .set_query(&self.search_index, query, self.config.search_limit);
    }

    pub fn on_search_key(&mut self, key: SearchKey) -> KeyOutcome {
        if self.lifecycle == Lifecycle::Disposed {
            return KeyOutcome::Nothing;
        }
        let outcome = self.search.handle_key(key);
        if let KeyOutcome::Select(position) = outcome {
            self.select_from_search(position);
        }
        outcome
    }

    /// Pointer selection of the `row`-th search result.
    pub fn select_search_result(&mut self, row: usize) -> bool {
        match self.search.results().get(row).copied() {
            Some(position) => self.select_from_search(position),
            None => false,
        }
    }

    fn select_from_search(&mut self, position: usize) -> bool {
        let Some((id, kind, region)) = self.record_key(position) else {
            return false;
        };
        self.search.clear();
        if !self.is_ready() {
            return false;
        }
        self.ensure_visible(kind, region);
        self.select(&id, SelectionOrigin::Search).is_some()
    }

    fn record_key(&self, position: usize) -> Option<(String, CountryKind, Region)> {
        self.catalog
            .record(position)
            .map(|r: &CountryRecord| (r.id.clone(), r.kind, r.region))
    }

    // ---- deep link ----

    /// The URL query string changed (or was read on mount).
    pub fn on_url_changed(&mut self, query: &str) {
        let param = country_param(query);
        match self.lifecycle {
            Lifecycle::Ready => self.apply_country_param(param),
            Lifecycle::Unmounted | Lifecycle::Initializing => self.pending_url = Some(param),
            Lifecycle::Failed | Lifecycle::Disposed => {}
        }
    }

    fn apply_country_param(&mut self, param: Option<String>) {
        match self.deep_link.observe(param.as_deref()) {
            LinkAction::Ignore => {}
            LinkAction::Reset => debug!("country parameter removed"),
            LinkAction::Apply(id) => {
                self.deep_link.mark_processed(id.clone());
                let Some(record) = self.catalog.get(&id) else {
                    debug!(country_id = %id, "deep link to unknown country");
                    return;
                };
                let (kind, region) = (record.kind, record.region);
                self.ensure_visible(kind, region);
                self.select(&id, SelectionOrigin::DeepLink);
            }
        }
    }

    // ---- random discovery ----

    /// Picks a random visible country and selects it. Returns its id.
    pub fn pick_random(&mut self) -> Option<String> {
        if !self.is_ready() {
            return None;
        }
        if self.discovery.is_in_flight(&self.selection) {
            debug!("random pick already in flight");
            return None;
        }
        let ids = visible_country_ids(&self.registry, &self.view);
        let id = self.discovery.choose(&ids, &mut self.rng)?.to_string();
        let generation = self.select(&id, SelectionOrigin::Random)?;
        self.discovery.started(generation);
        Some(id)
    }
}
