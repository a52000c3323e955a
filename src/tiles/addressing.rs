//! Tile and pixel addressing: projected point → origin-shifted → tile row/col or world pixel.

use serde::{Deserialize, Serialize};

use crate::{
    core::{
        constants::{EARTH_CIRCUMFERENCE, TILE_SIZE},
        geo::{LngLat, Point, TileCoord},
        projection::{Projection, ResolutionTable, SphericalMercator},
    },
    prelude::Arc,
    Result,
};

/// Where a tile grid puts its (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Top-left corner of the world map, y growing southwards
    #[default]
    TopLeft,
    /// The projection's natural origin, y growing northwards
    Center,
}

/// Translate a projected point into the grid's origin convention.
pub fn origin_shift(point: Point, origin: Origin) -> Point {
    match origin {
        Origin::TopLeft => Point::new(
            point.x + EARTH_CIRCUMFERENCE / 2.0,
            EARTH_CIRCUMFERENCE / 2.0 - point.y,
        ),
        Origin::Center => point,
    }
}

/// Everything needed to turn a geographic coordinate into tile or pixel indices.
#[derive(Debug, Clone)]
pub struct TileGrid {
    pub projection: Arc<dyn Projection>,
    pub resolutions: Arc<ResolutionTable>,
    pub origin: Origin,
    pub tile_size: u32,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            projection: Arc::new(SphericalMercator),
            resolutions: Arc::new(ResolutionTable::default()),
            origin: Origin::TopLeft,
            tile_size: TILE_SIZE,
        }
    }
}

impl TileGrid {
    /// Origin-shifted projected position of `lng_lat`
    fn shifted(&self, lng_lat: LngLat) -> Result<Point> {
        let projected = self.projection.try_forward(lng_lat)?;
        Ok(origin_shift(projected, self.origin))
    }

    /// Tile containing `lng_lat` at `zoom`.
    ///
    /// Floors rather than truncates so that negative coordinates land in the right tile.
    pub fn tile_coordinate(&self, lng_lat: LngLat, zoom: u8) -> Result<TileCoord> {
        let point = self.shifted(lng_lat)?;
        let span = self.resolutions.resolution_at(zoom)? * self.tile_size as f64;
        Ok(TileCoord::new(
            (point.x / span).floor() as i32,
            (point.y / span).floor() as i32,
        ))
    }

    /// Position of `lng_lat` in the whole-world pixel grid at `zoom`, floored.
    pub fn pixel_coordinate(&self, lng_lat: LngLat, zoom: u8) -> Result<Point> {
        let point = self.shifted(lng_lat)?;
        let resolution = self.resolutions.resolution_at(zoom)?;
        Ok(Point::new(point.x / resolution, point.y / resolution).floor())
    }
}
