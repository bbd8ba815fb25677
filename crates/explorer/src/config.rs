use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::MapOptions;
use crate::centering::{CenteringParams, ChromeProfiles};
use crate::error::ConfigError;

/// Settle detection knobs.
///
/// The values are tuned against an eased ~0.8 s flight; the only hard
/// contract is that `safety_timeout_ms` bounds how long a selection can sit
/// in the centering state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    /// Delay before the proximity check runs.
    pub check_delay_ms: u64,
    /// Forces the popup open even if no movement-finished signal arrived.
    pub safety_timeout_ms: u64,
    /// Added to both delays for deep-linked selections.
    pub deep_link_extra_delay_ms: u64,
    pub tolerance_px: f64,
    pub zoom_tolerance: f64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            check_delay_ms: 900,
            safety_timeout_ms: 1300,
            deep_link_extra_delay_ms: 400,
            tolerance_px: 50.0,
            zoom_tolerance: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub map: MapOptions,
    pub centering: CenteringParams,
    pub settle: SettleConfig,
    pub chrome: ChromeProfiles,
    pub fly_duration_ms: u64,
    pub init_retry_delay_ms: u64,
    pub max_init_attempts: u32,
    /// Viewports narrower than this are treated as mobile.
    pub mobile_breakpoint_px: f64,
    pub search_limit: usize,
    /// Fixed seed for random discovery; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            map: MapOptions::default(),
            centering: CenteringParams::default(),
            settle: SettleConfig::default(),
            chrome: ChromeProfiles::default(),
            fly_duration_ms: 800,
            init_retry_delay_ms: 100,
            max_init_attempts: 50,
            mobile_breakpoint_px: 768.0,
            search_limit: 20,
            rng_seed: None,
        }
    }
}

impl ExplorerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<ExplorerConfig>(raw)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.fly_duration_ms == 0 {
            return invalid("fly_duration_ms must be positive");
        }
        if self.settle.safety_timeout_ms == 0 {
            return invalid("settle.safety_timeout_ms must be positive");
        }
        if self.settle.check_delay_ms > self.settle.safety_timeout_ms {
            return invalid("settle.check_delay_ms must not exceed settle.safety_timeout_ms");
        }
        if !(self.settle.tolerance_px > 0.0) || !(self.settle.zoom_tolerance >= 0.0) {
            return invalid("settle tolerances must be non-negative and tolerance_px positive");
        }
        if !(self.map.min_zoom <= self.map.max_zoom) {
            return invalid("map.min_zoom must not exceed map.max_zoom");
        }
        if !(self.centering.min_zoom_desktop <= self.map.max_zoom)
            || !(self.centering.min_zoom_mobile <= self.map.max_zoom)
        {
            return invalid("centering minimum zoom exceeds map.max_zoom");
        }
        if !self.chrome.desktop.is_valid() || !self.chrome.mobile.is_valid() {
            return invalid("chrome sizes must be finite and non-negative");
        }
        if !(self.mobile_breakpoint_px > 0.0) {
            return invalid("mobile_breakpoint_px must be positive");
        }
        if self.search_limit == 0 {
            return invalid("search_limit must be positive");
        }
        if self.max_init_attempts == 0 {
            return invalid("max_init_attempts must be at least 1");
        }
        Ok(())
    }
}
