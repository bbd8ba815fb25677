use std::collections::HashSet;
use std::str::FromStr;

use catalog::{CatalogError, CountryKind, Region};
use tracing::{debug, warn};

use crate::backend::MapBackend;
use crate::markers::{MarkerEntry, MarkerRegistry};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum RegionFilter {
    #[default]
    All,
    Region(Region),
}

impl RegionFilter {
    pub fn admits(&self, region: Region) -> bool {
        match self {
            RegionFilter::All => true,
            RegionFilter::Region(r) => *r == region,
        }
    }
}

impl std::fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionFilter::All => f.write_str("All"),
            RegionFilter::Region(r) => write!(f, "{r}"),
        }
    }
}

impl FromStr for RegionFilter {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(RegionFilter::All);
        }
        s.parse::<Region>().map(RegionFilter::Region)
    }
}

/// Filter and selection state shared by every component of one mounted map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapViewState {
    pub region_filter: RegionFilter,
    pub territories_visible: bool,
    pub de_facto_visible: bool,
    pub active_country_id: Option<String>,
}

impl Default for MapViewState {
    fn default() -> Self {
        Self {
            region_filter: RegionFilter::All,
            territories_visible: true,
            de_facto_visible: true,
            active_country_id: None,
        }
    }
}

impl MapViewState {
    pub fn admits(&self, region: Region, kind: CountryKind) -> bool {
        self.region_filter.admits(region)
            && (kind != CountryKind::Territory || self.territories_visible)
            && (kind != CountryKind::DeFacto || self.de_facto_visible)
    }

    pub fn admits_entry(&self, entry: &MarkerEntry) -> bool {
        self.admits(entry.region, entry.kind)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub attached: usize,
    pub detached: usize,
    pub visible: usize,
    /// The active country has no visible copy left.
    pub active_hidden: bool,
}

/// Brings layer attachment in line with a [`MapViewState`].
///
/// Markers are never created or removed here. Callers coalesce requests with
/// [`VisibilityEngine::request`] so several state changes in one turn cost a
/// single pass.
#[derive(Debug, Default)]
pub struct VisibilityEngine {
    pending: bool,
    passes: usize,
}

impl VisibilityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a reconcile as wanted. Returns `true` only for the first request
    /// since the last pass, i.e. when the caller must schedule one.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn cancel(&mut self) {
        self.pending = false;
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn reconcile<B: MapBackend + ?Sized>(
        &mut self,
        registry: &MarkerRegistry,
        map: &mut B,
        state: &MapViewState,
    ) -> ReconcileOutcome {
        self.pending = false;
        let mut out = ReconcileOutcome::default();
        if map.is_disposed() {
            return out;
        }

        map.begin_batch();
        for entry in registry.entries() {
            let want = state.admits_entry(entry);
            if want {
                out.visible += 1;
            }
            match (want, map.is_attached(entry.handle)) {
                (true, false) => match map.attach(entry.handle) {
                    Ok(()) => out.attached += 1,
                    Err(error) => warn!(country_id = %entry.country_id, %error, "attach failed"),
                },
                (false, true) => match map.detach(entry.handle) {
                    Ok(()) => out.detached += 1,
                    Err(error) => warn!(country_id = %entry.country_id, %error, "detach failed"),
                },
                _ => {}
            }
        }
        map.end_batch();
        self.passes += 1;

        if let Some(active) = state.active_country_id.as_deref() {
            out.active_hidden = !is_country_visible(registry, state, active);
        }

        debug!(
            attached = out.attached,
            detached = out.detached,
            visible = out.visible,
            region = %state.region_filter,
            "visibility reconciled"
        );
        out
    }
}

pub fn is_country_visible(registry: &MarkerRegistry, state: &MapViewState, country_id: &str) -> bool {
    registry
        .copies_of(country_id)
        .iter()
        .filter_map(|&i| registry.entry(i))
        .any(|e| state.admits_entry(e))
}

/// Unique ids of every country with at least one visible copy, in registry order.
pub fn visible_country_ids<'a>(registry: &'a MarkerRegistry, state: &MapViewState) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    registry
        .entries()
        .iter()
        .filter(|e| state.admits_entry(e))
        .map(|e| e.country_id.as_str())
        .filter(|id| seen.insert(*id))
        .collect()
}
