use rand::Rng;
use rand::seq::IndexedRandom;

use crate::selection::SelectionMachine;

/// "Surprise me": a uniformly random visible country.
///
/// Only one random pick may be centering at a time. A pick stops counting as
/// in flight once its popup opens, it is superseded, or it is cleared.
#[derive(Debug, Default)]
pub struct RandomDiscovery {
    in_flight: Option<u64>,
}

impl RandomDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, selection: &SelectionMachine) -> bool {
        self.in_flight
            .is_some_and(|g| selection.is_current(g) && selection.is_centering())
    }

    pub fn choose<'a, R: Rng + ?Sized>(&self, visible_ids: &[&'a str], rng: &mut R) -> Option<&'a str> {
        visible_ids.choose(rng).copied()
    }

    pub fn started(&mut self, generation: u64) {
        self.in_flight = Some(generation);
    }

    pub fn reset(&mut self) {
        self.in_flight = None;
    }
}
