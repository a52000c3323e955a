//! Geographic ↔ projected coordinate conversion and the zoom-indexed resolution table.

use once_cell::sync::Lazy;
use std::f64::consts::PI;
use std::fmt;

use crate::{
    core::{
        constants::{EARTH_CIRCUMFERENCE, EARTH_RADIUS, MAX_ZOOM, TILE_SIZE},
        geo::{LngLat, Point},
    },
    MapError, Result,
};

/// Capability of converting between geographic and projected planar coordinates.
///
/// The default is [`SphericalMercator`]; a map source can substitute its own
/// projection without the rest of the pipeline noticing.
pub trait Projection: Send + Sync + fmt::Debug {
    /// Degrees to projected units. Latitude at ±90° yields non-finite output.
    fn forward(&self, lng_lat: LngLat) -> Point;

    /// Projected units back to degrees.
    fn inverse(&self, point: Point) -> LngLat;

    /// Like [`Projection::forward`] but reports a non-finite result as an error.
    fn try_forward(&self, lng_lat: LngLat) -> Result<Point> {
        let point = self.forward(lng_lat);
        if point.is_finite() {
            Ok(point)
        } else {
            Err(MapError::ProjectionDomain { lat: lng_lat.lat })
        }
    }
}

/// Web Mercator (EPSG:3857) on a sphere of radius [`EARTH_RADIUS`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SphericalMercator;

impl Projection for SphericalMercator {
    fn forward(&self, lng_lat: LngLat) -> Point {
        let x = lng_lat.lng.to_radians() * EARTH_RADIUS;
        let sin = lng_lat.lat.to_radians().sin();
        let y = (EARTH_RADIUS / 2.0) * ((1.0 + sin) / (1.0 - sin)).ln();
        Point::new(x, y)
    }

    fn inverse(&self, point: Point) -> LngLat {
        let lng = (point.x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        LngLat::new(lng, lat)
    }
}

/// Projected units per pixel, indexed by zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionTable {
    resolutions: Vec<f64>,
}

/// Table for the default 256px tiles, zoom 0 through [`MAX_ZOOM`].
pub static WEB_MERCATOR_RESOLUTIONS: Lazy<ResolutionTable> =
    Lazy::new(|| ResolutionTable::web_mercator(TILE_SIZE, MAX_ZOOM));

impl ResolutionTable {
    /// Build a table from explicit per-zoom resolutions.
    pub fn new(resolutions: Vec<f64>) -> Result<Self> {
        if resolutions.is_empty() {
            return Err(MapError::Config("resolution table is empty".to_string()));
        }
        if let Some(bad) = resolutions.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
            return Err(MapError::Config(format!("invalid resolution {bad}")));
        }
        Ok(Self { resolutions })
    }

    /// Standard table: `circumference / (2^zoom * tile_size)` for `0..=max_zoom`.
    pub fn web_mercator(tile_size: u32, max_zoom: u8) -> Self {
        let resolutions = (0..=max_zoom)
            .map(|zoom| resolution_for(zoom, tile_size))
            .collect();
        Self { resolutions }
    }

    pub fn resolution_at(&self, zoom: u8) -> Result<f64> {
        self.resolutions
            .get(zoom as usize)
            .copied()
            .ok_or(MapError::ZoomOutOfRange(zoom))
    }

    pub fn max_zoom(&self) -> u8 {
        (self.resolutions.len() - 1).min(u8::MAX as usize) as u8
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }
}

impl Default for ResolutionTable {
    fn default() -> Self {
        WEB_MERCATOR_RESOLUTIONS.clone()
    }
}

/// Projected units per pixel at `zoom` for square tiles of `tile_size` pixels.
pub fn resolution_for(zoom: u8, tile_size: u32) -> f64 {
    let tile_count = 2_f64.powi(zoom as i32);
    EARTH_CIRCUMFERENCE / (tile_count * tile_size as f64)
}
