pub mod backend;
pub mod centering;
pub mod config;
pub mod deep_link;
pub mod discovery;
pub mod error;
pub mod explorer;
pub mod headless;
pub mod markers;
pub mod popup;
pub mod search;
pub mod selection;
pub mod visibility;

pub use backend::{MapBackend, MapOptions, MarkerHandle, MarkerSpec, MarkerStyle};
pub use centering::{
    CenteringParams, CenteringTarget, ChromeProfile, ChromeProfiles, DeviceClass, PanelState,
    SafeZone, ViewportChrome, compute_centering_target, container_point, safe_zone,
};
pub use config::{ExplorerConfig, SettleConfig};
pub use deep_link::{COUNTRY_PARAM, DeepLinkSync, LinkAction, country_param, with_country_param};
pub use error::{BackendError, ConfigError};
pub use explorer::{Explorer, HostRequest, Lifecycle, MapFactory};
pub use headless::{Flight, HeadlessMap};
pub use markers::{InitSummary, LONGITUDE_OFFSETS, MarkerEntry, MarkerRegistry};
pub use popup::{PopupAction, PopupContent, PopupField};
pub use search::{KeyOutcome, SearchIndex, SearchKey, SearchRow, SearchState, normalize_text};
pub use selection::{ActiveSelection, SelectionOrigin, SelectionPhase};
pub use visibility::{MapViewState, RegionFilter};
