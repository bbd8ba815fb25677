//! Camera target computation that keeps a marker's popup clear of UI chrome.
//!
//! Everything here is pure: the caller supplies the projection, the current
//! zoom, the viewport size and the chrome, and gets back where to fly.

use foundation::math::{LatLng, Projector, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn classify(width_px: f64, breakpoint_px: f64) -> Self {
        if width_px < breakpoint_px {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

/// Screen regions covered by navigation bars and panels, in pixels.
///
/// The sidebar sits on the left edge, the bottom sheet along the bottom.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ViewportChrome {
    pub top_obstruction_px: f64,
    pub sidebar_width_px: f64,
    pub bottom_obstruction_px: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PanelState {
    pub sidebar_open: bool,
    pub bottom_sheet_open: bool,
}

/// Chrome dimensions for one device class; panels toggle parts of it.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeProfile {
    pub top_bar_px: f64,
    pub sidebar_width_px: f64,
    pub bottom_sheet_px: f64,
}

impl Default for ChromeProfile {
    fn default() -> Self {
        Self {
            top_bar_px: 64.0,
            sidebar_width_px: 0.0,
            bottom_sheet_px: 0.0,
        }
    }
}

impl ChromeProfile {
    pub fn is_valid(&self) -> bool {
        [self.top_bar_px, self.sidebar_width_px, self.bottom_sheet_px]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn resolve(&self, panels: PanelState) -> ViewportChrome {
        ViewportChrome {
            top_obstruction_px: self.top_bar_px,
            sidebar_width_px: if panels.sidebar_open {
                self.sidebar_width_px
            } else {
                0.0
            },
            bottom_obstruction_px: if panels.bottom_sheet_open {
                self.bottom_sheet_px
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeProfiles {
    pub desktop: ChromeProfile,
    pub mobile: ChromeProfile,
}

impl Default for ChromeProfiles {
    fn default() -> Self {
        Self {
            desktop: ChromeProfile {
                top_bar_px: 64.0,
                sidebar_width_px: 380.0,
                bottom_sheet_px: 0.0,
            },
            mobile: ChromeProfile {
                top_bar_px: 56.0,
                sidebar_width_px: 0.0,
                bottom_sheet_px: 260.0,
            },
        }
    }
}

impl ChromeProfiles {
    pub fn for_device(&self, device: DeviceClass) -> &ChromeProfile {
        match device {
            DeviceClass::Desktop => &self.desktop,
            DeviceClass::Mobile => &self.mobile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenteringParams {
    pub min_zoom_desktop: f64,
    pub min_zoom_mobile: f64,
    /// How far below the safe-zone center the marker sits, so the popup
    /// drawn above it ends up centered instead.
    pub popup_offset_px: f64,
}

impl Default for CenteringParams {
    fn default() -> Self {
        Self {
            min_zoom_desktop: 5.5,
            min_zoom_mobile: 4.5,
            popup_offset_px: 80.0,
        }
    }
}

impl CenteringParams {
    pub fn min_zoom(&self, device: DeviceClass) -> f64 {
        match device {
            DeviceClass::Desktop => self.min_zoom_desktop,
            DeviceClass::Mobile => self.min_zoom_mobile,
        }
    }
}

/// Unobstructed rectangle of the viewport, in container pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SafeZone {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl SafeZone {
    pub fn center(&self) -> Vec2 {
        Vec2::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

/// Falls back to the whole viewport when the chrome leaves less than a pixel.
pub fn safe_zone(viewport: Vec2, chrome: &ViewportChrome) -> SafeZone {
    let full = SafeZone {
        left: 0.0,
        top: 0.0,
        right: viewport.x,
        bottom: viewport.y,
    };
    let zone = SafeZone {
        left: chrome.sidebar_width_px.max(0.0),
        top: chrome.top_obstruction_px.max(0.0),
        right: viewport.x,
        bottom: viewport.y - chrome.bottom_obstruction_px.max(0.0),
    };
    if zone.right - zone.left < 1.0 || zone.bottom - zone.top < 1.0 {
        return full;
    }
    zone
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CenteringTarget {
    pub center: LatLng,
    pub zoom: f64,
    /// Where the marker lands on screen once the camera reaches `center`.
    pub screen_point: Vec2,
}

/// Container-pixel position of `at` for a camera at `center`/`zoom`.
pub fn container_point<P: Projector + ?Sized>(
    projector: &P,
    at: LatLng,
    center: LatLng,
    zoom: f64,
    viewport: Vec2,
) -> Vec2 {
    projector.project(at, zoom) - projector.project(center, zoom) + viewport.scale(0.5)
}

/// Computes where to fly so `marker` and its popup land inside the safe zone.
///
/// The zoom only ever increases. Projection happens at the target zoom: the
/// pixel offsets are meaningless at any other zoom level.
pub fn compute_centering_target<P: Projector + ?Sized>(
    projector: &P,
    marker: LatLng,
    current_zoom: f64,
    viewport: Vec2,
    chrome: &ViewportChrome,
    device: DeviceClass,
    params: &CenteringParams,
) -> CenteringTarget {
    let zoom = current_zoom.max(params.min_zoom(device));

    let zone = safe_zone(viewport, chrome);
    let zone_center = zone.center();
    let screen_point = Vec2::new(
        zone_center.x,
        (zone_center.y + params.popup_offset_px).min(zone.bottom),
    );

    let marker_px = projector.project(marker, zoom);
    let delta = screen_point - viewport.scale(0.5);
    let center = projector.unproject(marker_px - delta, zoom);

    CenteringTarget {
        center,
        zoom,
        screen_point,
    }
}
