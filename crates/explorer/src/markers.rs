use std::collections::HashMap;

use catalog::{CatalogSubsets, CountryKind, Region};
use foundation::math::LatLng;
use tracing::{debug, warn};

use crate::backend::{MapBackend, MarkerHandle, MarkerSpec, MarkerStyle};
use crate::error::BackendError;
use crate::popup::PopupContent;

/// One marker per world copy so the map wraps horizontally without gaps.
pub const LONGITUDE_OFFSETS: [f64; 3] = [-360.0, 0.0, 360.0];

/// One rendered copy of a country marker.
///
/// The handle belongs to this entry alone; it is created once and only ever
/// attached to or detached from the layer afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry {
    pub country_id: String,
    pub region: Region,
    pub kind: CountryKind,
    pub longitude_offset: f64,
    pub position: LatLng,
    pub handle: MarkerHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFailure {
    pub country_id: String,
    pub longitude_offset: f64,
    pub error: BackendError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitSummary {
    pub created: usize,
    pub failures: Vec<MarkerFailure>,
    pub already_initialized: bool,
}

/// Owns every marker entry for one mounted map.
///
/// Ordering contract:
/// - `entries()` follows the subset order (sovereign, territory, de facto),
///   catalog order within a subset, offsets ascending within a country.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    entries: Vec<MarkerEntry>,
    by_country: HashMap<String, Vec<usize>>,
    initialized: bool,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Creates, styles, binds and attaches three copies per record.
    ///
    /// A record whose marker cannot be created is logged and skipped; the
    /// rest of the batch still goes through. Calling this twice is a no-op.
    pub fn initialize<B: MapBackend + ?Sized>(
        &mut self,
        map: &mut B,
        subsets: &CatalogSubsets<'_>,
    ) -> InitSummary {
        if self.initialized {
            return InitSummary {
                already_initialized: true,
                ..InitSummary::default()
            };
        }

        let mut summary = InitSummary::default();
        self.entries.reserve(subsets.total() * LONGITUDE_OFFSETS.len());

        map.begin_batch();
        for record in subsets.iter() {
            let style = MarkerStyle::for_kind(record.kind);
            let popup = PopupContent::for_record(record);
            for offset in LONGITUDE_OFFSETS {
                let spec = MarkerSpec {
                    country_id: record.id.clone(),
                    position: LatLng::new(record.lat, record.lng).shifted(offset),
                    style,
                };
                let handle = match map.create_marker(&spec) {
                    Ok(handle) => handle,
                    Err(error) => {
                        warn!(
                            country_id = %record.id,
                            longitude_offset = offset,
                            %error,
                            "marker creation failed"
                        );
                        summary.failures.push(MarkerFailure {
                            country_id: record.id.clone(),
                            longitude_offset: offset,
                            error,
                        });
                        continue;
                    }
                };

                if let Err(error) = map.bind_popup(handle, popup.clone()) {
                    warn!(country_id = %record.id, %error, "popup bind failed");
                }
                if let Err(error) = map.attach(handle) {
                    warn!(country_id = %record.id, %error, "marker attach failed");
                }

                let idx = self.entries.len();
                self.entries.push(MarkerEntry {
                    country_id: record.id.clone(),
                    region: record.region,
                    kind: record.kind,
                    longitude_offset: offset,
                    position: spec.position,
                    handle,
                });
                self.by_country
                    .entry(record.id.clone())
                    .or_default()
                    .push(idx);
                summary.created += 1;
            }
        }
        map.end_batch();

        self.initialized = true;
        summary
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn country_count(&self) -> usize {
        self.by_country.len()
    }

    pub fn entries(&self) -> &[MarkerEntry] {
        &self.entries
    }

    pub fn entry(&self, idx: usize) -> Option<&MarkerEntry> {
        self.entries.get(idx)
    }

    /// Entry indices for every surviving copy of `country_id`.
    pub fn copies_of(&self, country_id: &str) -> &[usize] {
        self.by_country
            .get(country_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn index_of(&self, handle: MarkerHandle) -> Option<usize> {
        self.entries.iter().position(|e| e.handle == handle)
    }

    /// Removes every marker from `map` and forgets them. Used on unmount only.
    pub fn release<B: MapBackend + ?Sized>(&mut self, map: &mut B) -> usize {
        let n = self.entries.len();
        if !map.is_disposed() {
            for entry in &self.entries {
                map.remove_marker(entry.handle);
            }
        }
        self.entries.clear();
        self.by_country.clear();
        self.initialized = false;
        debug!(released = n, "marker registry released");
        n
    }
}
