use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Pixel size of one raster tile.
pub const TILE_SIZE: f64 = 256.0;

/// Two coordinates closer than this on both axes are the same place.
pub const COORD_TOLERANCE: f64 = 1e-4;

const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.686;
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Strictly within `COORD_TOLERANCE` on both axes.
    pub fn same_place(&self, other: &LatLng) -> bool {
        (self.lat - other.lat).abs() < COORD_TOLERANCE && (self.lng - other.lng).abs() < COORD_TOLERANCE
    }

    /// Parse the `x`/`y` string pair used by the place search API.
    pub fn from_xy(x: &str, y: &str) -> Option<Self> {
        let lng = x.trim().parse::<f64>().ok()?;
        let lat = y.trim().parse::<f64>().ok()?;
        (lat.is_finite() && lng.is_finite()).then_some(Self { lat, lng })
    }

    /// Position in world pixels at a fractional tile zoom.
    pub fn to_world(&self, zoom: f64) -> (f64, f64) {
        let scale = TILE_SIZE * 2.0_f64.powf(zoom);
        let lat = self.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
        let x = (self.lng + 180.0) / 360.0 * scale;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
        (x, y)
    }

    pub fn from_world(x: f64, y: f64, zoom: f64) -> Self {
        let scale = TILE_SIZE * 2.0_f64.powf(zoom);
        let lng = x / scale * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y / scale)).sinh().atan().to_degrees();
        Self {
            lat,
            lng: wrap_lng(lng),
        }
    }
}

fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Ground distance covered by one pixel at `lat` and tile zoom `zoom`.
pub fn meters_per_pixel(lat: f64, zoom: f64) -> f64 {
    EARTH_CIRCUMFERENCE_M * lat.to_radians().cos() / (TILE_SIZE * 2.0_f64.powf(zoom))
}
