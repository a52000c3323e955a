use serde::{Deserialize, Serialize};

use crate::{
    core::{constants::MAX_VIEWPORT_SIZE, geo::LngLat},
    MapError, Result,
};

/// The current view of the map: center, integer zoom and canvas size in pixels.
///
/// Supplied by whatever drives the map (gesture handling, animation); the tile
/// pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view, latitude clamped to the Mercator range
    pub center: LngLat,
    /// The current zoom level; checked against the source's resolution table when rendering
    pub zoom: u8,
    /// Canvas width in pixels
    pub width: f64,
    /// Canvas height in pixels
    pub height: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LngLat, zoom: u8, width: f64, height: f64) -> Self {
        Self {
            center: center.clamped(),
            zoom,
            width,
            height,
        }
    }

    pub fn set_center(&mut self, center: LngLat) {
        self.center = center.clamped();
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Rejects empty, negative, non-finite or oversized canvas sizes
    pub fn validate(&self) -> Result<()> {
        let usable = |v: f64| v.is_finite() && v > 0.0 && v <= MAX_VIEWPORT_SIZE;
        if usable(self.width) && usable(self.height) {
            Ok(())
        } else {
            Err(MapError::InvalidViewport {
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn half_size(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}
