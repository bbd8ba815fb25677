//! Spherical Web-Mercator (EPSG:3857) pixel projection.
//!
//! Pixel space follows the slippy-map convention: at zoom `z` the world is a
//! square of `TILE_SIZE * 2^z` pixels, origin at the north-west corner.
//! Longitudes are not wrapped, so `lng + 360` lands one world-width to the
//! right. That is what lets marker copies sit side by side.

use std::f64::consts::PI;

use super::Vec2;

/// Side of one tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude at which the Mercator square is clipped.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Geographic coordinate in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Same point shifted by `offset` degrees of longitude.
    pub fn shifted(self, offset: f64) -> Self {
        Self::new(self.lat, self.lng + offset)
    }

    pub fn is_valid(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && (-90.0..=90.0).contains(&self.lat)
    }
}

/// Conversion between geographic and pixel coordinates at an arbitrary zoom.
pub trait Projector {
    fn project(&self, at: LatLng, zoom: f64) -> Vec2;
    fn unproject(&self, pixel: Vec2, zoom: f64) -> LatLng;
}

/// World size in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct WebMercator;

impl Projector for WebMercator {
    fn project(&self, at: LatLng, zoom: f64) -> Vec2 {
        let size = world_size(zoom);
        let lat = at.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = (at.lng + 180.0) / 360.0 * size;
        let y = (0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI)) * size;
        Vec2::new(x, y)
    }

    fn unproject(&self, pixel: Vec2, zoom: f64) -> LatLng {
        let size = world_size(zoom);
        let lng = pixel.x / size * 360.0 - 180.0;
        let n = PI * (1.0 - 2.0 * pixel.y / size);
        let lat = n.sinh().atan().to_degrees();
        LatLng::new(lat, lng)
    }
}
