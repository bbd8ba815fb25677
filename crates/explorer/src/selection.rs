//! Selection lifecycle: `Idle -> Centering -> PopupOpen -> Idle`.
//!
//! Every transition into `Centering` bumps a generation counter. Deferred
//! work (settle checks, safety timeouts) carries the generation it was
//! scheduled under and is dropped if the counter has moved on.

use crate::backend::MarkerHandle;
use crate::centering::CenteringTarget;
use crate::markers::MarkerRegistry;

/// Who asked for the selection. Decides URL writes and settle delays.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SelectionOrigin {
    MarkerClick,
    Search,
    DeepLink,
    Random,
    Api,
}

impl SelectionOrigin {
    /// Whether the selection should be reflected in the `country` parameter.
    pub fn writes_url(&self) -> bool {
        !matches!(self, SelectionOrigin::DeepLink)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSelection {
    pub country_id: String,
    pub entry: usize,
    pub handle: MarkerHandle,
    pub generation: u64,
    pub target: CenteringTarget,
    pub origin: SelectionOrigin,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SelectionPhase {
    #[default]
    Idle,
    Centering(ActiveSelection),
    PopupOpen(ActiveSelection),
}

impl SelectionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionPhase::Idle => "idle",
            SelectionPhase::Centering(_) => "centering",
            SelectionPhase::PopupOpen(_) => "popup_open",
        }
    }
}

#[derive(Debug, Default)]
pub struct SelectionMachine {
    phase: SelectionPhase,
    generation: u64,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SelectionPhase {
        &self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active(&self) -> Option<&ActiveSelection> {
        match &self.phase {
            SelectionPhase::Idle => None,
            SelectionPhase::Centering(s) | SelectionPhase::PopupOpen(s) => Some(s),
        }
    }

    pub fn is_centering(&self) -> bool {
        matches!(self.phase, SelectionPhase::Centering(_))
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.active().is_some()
    }

    /// Enters `Centering`, superseding whatever was in flight.
    pub fn begin(
        &mut self,
        country_id: impl Into<String>,
        entry: usize,
        handle: MarkerHandle,
        target: CenteringTarget,
        origin: SelectionOrigin,
    ) -> u64 {
        self.generation += 1;
        self.phase = SelectionPhase::Centering(ActiveSelection {
            country_id: country_id.into(),
            entry,
            handle,
            generation: self.generation,
            target,
            origin,
        });
        self.generation
    }

    /// Moves `Centering -> PopupOpen` if `generation` is still the live one.
    ///
    /// Returns the selection whose popup should now open. A stale or repeated
    /// settle returns `None`.
    pub fn settle(&mut self, generation: u64) -> Option<ActiveSelection> {
        if generation != self.generation {
            return None;
        }
        match std::mem::take(&mut self.phase) {
            SelectionPhase::Centering(sel) => {
                self.phase = SelectionPhase::PopupOpen(sel.clone());
                Some(sel)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Returns to `Idle`. Outstanding deferred work becomes stale.
    pub fn clear(&mut self) -> Option<ActiveSelection> {
        let previous = match std::mem::take(&mut self.phase) {
            SelectionPhase::Idle => None,
            SelectionPhase::Centering(s) | SelectionPhase::PopupOpen(s) => Some(s),
        };
        if previous.is_some() {
            self.generation += 1;
        }
        previous
    }
}

/// Picks the copy of `country_id` whose longitude is closest to `center_lng`.
///
/// `allowed` lets the caller skip copies that are not currently rendered.
pub fn nearest_copy(
    registry: &MarkerRegistry,
    country_id: &str,
    center_lng: f64,
    mut allowed: impl FnMut(usize) -> bool,
) -> Option<usize> {
    registry
        .copies_of(country_id)
        .iter()
        .copied()
        .filter(|&i| allowed(i))
        .filter_map(|i| registry.entry(i).map(|e| (i, (e.position.lng - center_lng).abs())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::{SelectionMachine, SelectionOrigin, SelectionPhase, nearest_copy};
    use crate::backend::{MapOptions, MarkerHandle};
    use crate::centering::CenteringTarget;
    use crate::headless::HeadlessMap;
    use crate::markers::MarkerRegistry;
    use catalog::{Catalog, CountryKind, CountryRecord, Region};
    use foundation::handles::Handle;
    use foundation::math::{LatLng, Vec2};

    fn target() -> CenteringTarget {
        CenteringTarget {
            center: LatLng::new(0.0, 0.0),
            zoom: 5.5,
            screen_point: Vec2::new(512.0, 464.0),
        }
    }

    fn handle(i: u32) -> MarkerHandle {
        MarkerHandle(Handle::new(i, 0))
    }

    #[test]
    fn begin_settle_clear_cycle() {
        let mut m = SelectionMachine::new();
        assert_eq!(m.phase(), &SelectionPhase::Idle);

        let g = m.begin("fr", 1, handle(1), target(), SelectionOrigin::Search);
        assert!(m.is_centering());
        assert!(m.is_current(g));

        let settled = m.settle(g).unwrap();
        assert_eq!(settled.country_id, "fr");
        assert_eq!(m.phase().name(), "popup_open");
        assert!(m.settle(g).is_none());

        let cleared = m.clear().unwrap();
        assert_eq!(cleared.country_id, "fr");
        assert_eq!(m.phase(), &SelectionPhase::Idle);
        assert!(!m.is_current(g));
    }

    #[test]
    fn newer_selection_supersedes_older_callbacks() {
        let mut m = SelectionMachine::new();
        let first = m.begin("fr", 1, handle(1), target(), SelectionOrigin::Random);
        let second = m.begin("jp", 4, handle(4), target(), SelectionOrigin::Random);
        assert!(m.settle(first).is_none());
        assert!(m.is_centering());
        assert_eq!(m.settle(second).unwrap().country_id, "jp");
    }

    #[test]
    fn clear_on_idle_keeps_generation() {
        let mut m = SelectionMachine::new();
        assert!(m.clear().is_none());
        assert_eq!(m.generation(), 0);
    }

    #[test]
    fn deep_link_selections_do_not_write_url() {
        assert!(!SelectionOrigin::DeepLink.writes_url());
        assert!(SelectionOrigin::MarkerClick.writes_url());
        assert!(SelectionOrigin::Random.writes_url());
    }

    #[test]
    fn nearest_copy_tracks_view_center() {
        let catalog = Catalog::new(vec![CountryRecord {
            id: "fj".to_string(),
            name: "Fiji".to_string(),
            capital: "Suva".to_string(),
            region: Region::Oceania,
            lat: -18.1,
            lng: 178.4,
            flag: String::new(),
            kind: CountryKind::Sovereign,
        }])
        .unwrap();
        let mut map = HeadlessMap::new(&MapOptions::default(), Vec2::new(800.0, 600.0));
        let mut registry = MarkerRegistry::new();
        registry.initialize(&mut map, &catalog.subsets());

        let offset_of = |i: usize| registry.entry(i).unwrap().longitude_offset;
        assert_eq!(offset_of(nearest_copy(&registry, "fj", 170.0, |_| true).unwrap()), 0.0);
        assert_eq!(offset_of(nearest_copy(&registry, "fj", -170.0, |_| true).unwrap()), -360.0);
        assert_eq!(offset_of(nearest_copy(&registry, "fj", 400.0, |_| true).unwrap()), 360.0);

        let centre_copy = registry.copies_of("fj")[1];
        let skipped = nearest_copy(&registry, "fj", 170.0, |i| i != centre_copy).unwrap();
        assert_eq!(offset_of(skipped), -360.0);
        assert!(nearest_copy(&registry, "zz", 0.0, |_| true).is_none());
    }
}
