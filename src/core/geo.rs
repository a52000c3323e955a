use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::constants::MAX_LATITUDE;

/// A geographic coordinate in degrees, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    /// Creates a new LngLat coordinate
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Clamps latitude to the range the Mercator projection can represent
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Returns a copy with the latitude clamped to the projectable range
    pub fn clamped(&self) -> Self {
        Self::new(self.lng, Self::clamp_lat(self.lat))
    }
}

impl Default for LngLat {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<(f64, f64)> for LngLat {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self::new(lng, lat)
    }
}

/// A point in projected, world-pixel or screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(&self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Row/column of a tile within the grid of one zoom level.
///
/// `row` counts along the projected x axis and `col` along the projected y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub row: i32,
    pub col: i32,
}

impl TileCoord {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Top-left world pixel of this tile
    pub fn origin_pixel(&self, tile_size: u32) -> Point {
        Point::new(
            self.row as f64 * tile_size as f64,
            self.col as f64 * tile_size as f64,
        )
    }

    pub fn offset(&self, d_row: i32, d_col: i32) -> Self {
        Self::new(self.row + d_row, self.col + d_col)
    }

    /// Like [`offset`](Self::offset), `None` if either index leaves the `i32` range
    pub fn checked_offset(&self, d_row: i32, d_col: i32) -> Option<Self> {
        Some(Self::new(self.row.checked_add(d_row)?, self.col.checked_add(d_col)?))
    }

    pub fn at_zoom(&self, zoom: u8) -> TileKey {
        TileKey::new(self.row, self.col, zoom)
    }
}

/// Identity of one tile: two keys are the same tile iff all three fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub row: i32,
    pub col: i32,
    pub zoom: u8,
}

impl TileKey {
    pub fn new(row: i32, col: i32, zoom: u8) -> Self {
        Self { row, col, zoom }
    }

    pub fn coord(&self) -> TileCoord {
        TileCoord::new(self.row, self.col)
    }
}

/// Formats as `{row}_{col}_{zoom}`, the key used in logs.
impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.row, self.col, self.zoom)
    }
}
