//! Ground area of a glacier mask inside a geographic bounding box.
//!
//! The mask grid is assumed to cover the bounding box uniformly (equirectangular). The only
//! correction applied is the latitude-dependent length of one degree, evaluated at the
//! box's mean latitude, so the estimate degrades as the box grows. Zones are expected to be
//! small enough for this to be negligible.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::postprocess::glacier_pixel_count;

/// `(lon_min, lat_min, lon_max, lat_max)` in degrees. Serialized as a 4-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([lon_min, lat_min, lon_max, lat_max]: [f64; 4]) -> Self {
        Self {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.lon_min, bbox.lat_min, bbox.lon_max, bbox.lat_max]
    }
}

impl BoundingBox {
    pub const fn new(lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> Self {
        Self {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
        }
    }

    pub fn width_deg(&self) -> f64 {
        (self.lon_max - self.lon_min).abs()
    }

    pub fn height_deg(&self) -> f64 {
        (self.lat_max - self.lat_min).abs()
    }

    pub fn mean_latitude(&self) -> f64 {
        (self.lat_min + self.lat_max) / 2.0
    }

    /// Returns a description of the first violated invariant, if any.
    pub fn check(&self) -> Option<String> {
        let coords = [self.lon_min, self.lat_min, self.lon_max, self.lat_max];
        if coords.iter().any(|c| !c.is_finite()) {
            return Some("coordinates must be finite".to_string());
        }
        if self.lon_min >= self.lon_max {
            return Some(format!(
                "lon_min ({}) must be less than lon_max ({})",
                self.lon_min, self.lon_max
            ));
        }
        if self.lat_min >= self.lat_max {
            return Some(format!(
                "lat_min ({}) must be less than lat_max ({})",
                self.lat_min, self.lat_max
            ));
        }
        if self.lat_min < -90.0 || self.lat_max > 90.0 {
            return Some("latitudes must lie within [-90, 90]".to_string());
        }
        None
    }
}

/// Length in meters of one degree of latitude and of longitude at `latitude_deg`.
///
/// Series expansion for the WGS84 ellipsoid.
pub fn meters_per_degree(latitude_deg: f64) -> (f64, f64) {
    let lat = latitude_deg.to_radians();
    let per_lat = 111_132.92 - 559.82 * (2.0 * lat).cos() + 1.175 * (4.0 * lat).cos();
    let per_lon = 111_412.84 * lat.cos() - 93.5 * (3.0 * lat).cos();
    (per_lat, per_lon)
}

/// Ground footprint in m² of one cell of a `width`x`height` grid spread over `bbox`.
pub fn pixel_area_m2(bbox: &BoundingBox, width: usize, height: usize) -> f64 {
    let deg_per_px_x = bbox.width_deg() / width as f64;
    let deg_per_px_y = bbox.height_deg() / height as f64;
    let (m_per_deg_lat, m_per_deg_lon) = meters_per_degree(bbox.mean_latitude());
    let area = (deg_per_px_x * m_per_deg_lon) * (deg_per_px_y * m_per_deg_lat);
    debug!(
        mean_latitude = bbox.mean_latitude(),
        m_per_deg_lat,
        m_per_deg_lon,
        deg_per_px_x,
        deg_per_px_y,
        pixel_area_m2 = area,
        "geodetic scale"
    );
    area
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaEstimate {
    pub glacier_pixels: usize,
    pub pixel_area_m2: f64,
    pub area_m2: f64,
}

impl AreaEstimate {
    pub fn area_km2(&self) -> f64 {
        m2_to_km2(self.area_m2)
    }
}

pub fn m2_to_km2(area_m2: f64) -> f64 {
    area_m2 / 1_000_000.0
}

/// Glacier area covered by a probability map laid over `bbox`.
pub fn estimate_area(probabilities: ArrayView2<f32>, bbox: &BoundingBox) -> AreaEstimate {
    let (height, width) = probabilities.dim();
    let glacier_pixels = glacier_pixel_count(probabilities);
    let pixel_area_m2 = pixel_area_m2(bbox, width, height);
    debug!(width, height, glacier_pixels, pixel_area_m2, "area estimate");
    AreaEstimate {
        glacier_pixels,
        pixel_area_m2,
        area_m2: glacier_pixels as f64 * pixel_area_m2,
    }
}
