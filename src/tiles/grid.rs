//! Viewport tile-set calculation.
//!
//! Works out the minimal set of tiles covering a viewport and where each one sits
//! on screen. Screen positions are relative to the viewport center: a tile at
//! `(x, y)` covers `[x, x + tile_size) × [y, y + tile_size)` with `(0, 0)` being
//! the center pixel.

use crate::{
    core::{
        constants::MAX_TILES_PER_VIEW,
        geo::{Point, TileCoord, TileKey},
        viewport::Viewport,
    },
    prelude::HashSet,
    tiles::source::MapSource,
    MapError, Result,
};

/// One tile of the covering set and its screen position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub key: TileKey,
    pub position: Point,
}

/// Tiles needed to cover one viewport
#[derive(Debug, Clone, PartialEq)]
pub struct TileSet {
    pub zoom: u8,
    pub tile_size: u32,
    /// Tile containing the viewport center
    pub center_tile: TileCoord,
    /// Center pixel relative to the center tile's grid corner, each axis in `[0, tile_size)`
    pub offset: Point,
    /// Tiles needed before/after the center tile along rows (x)
    pub row_range: (i32, i32),
    /// Tiles needed before/after the center tile along columns (y)
    pub col_range: (i32, i32),
    pub placements: Vec<TilePlacement>,
}

impl TileSet {
    /// Compute the covering tile set for `viewport` on `source`'s grid.
    ///
    /// Fails with `InvalidViewport` for empty, non-finite or oversized sizes and
    /// when the covering set would exceed [`MAX_TILES_PER_VIEW`]. Fails with
    /// `ZoomOutOfRange` when the source's resolution table has no entry for the zoom.
    pub fn compute(viewport: &Viewport, source: &MapSource) -> Result<Self> {
        viewport.validate()?;

        let grid = source.grid();
        let zoom = viewport.zoom;
        let tile_size = grid.tile_size;
        let size = tile_size as f64;

        let center = match &source.lng_lat_transform {
            Some(transform) => transform(viewport.center),
            None => viewport.center,
        };

        let center_tile = grid.tile_coordinate(center, zoom)?;
        let center_pixel = grid.pixel_coordinate(center, zoom)?;
        let offset = center_pixel.subtract(&center_tile.origin_pixel(tile_size));

        let (half_width, half_height) = viewport.half_size();
        let row_min = ((half_width - offset.x) / size).ceil() as i32;
        let col_min = ((half_height - offset.y) / size).ceil() as i32;
        let row_max = ((half_width - (size - offset.x)) / size).ceil() as i32;
        let col_max = ((half_height - (size - offset.y)) / size).ceil() as i32;

        let too_many = || MapError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        };
        let rows = usize::try_from(i64::from(row_min) + i64::from(row_max) + 1).unwrap_or(0);
        let cols = usize::try_from(i64::from(col_min) + i64::from(col_max) + 1).unwrap_or(0);
        let count = rows.checked_mul(cols).ok_or_else(too_many)?;
        if count > MAX_TILES_PER_VIEW {
            return Err(too_many());
        }
        let mut placements = Vec::with_capacity(count);

        for i in -row_min..=row_max {
            for j in -col_min..=col_max {
                let key = center_tile
                    .checked_offset(i, j)
                    .ok_or(MapError::ZoomOutOfRange(zoom))?
                    .at_zoom(zoom);
                let x = i as f64 * size - offset.x;
                // A y-up grid measures the offset from the tile's bottom edge and
                // counts columns towards the top of the screen.
                let y = if source.axis_y_up {
                    -(j as f64) * size - (size - offset.y)
                } else {
                    j as f64 * size - offset.y
                };
                placements.push(TilePlacement {
                    key,
                    position: Point::new(x, y),
                });
            }
        }

        log::debug!(
            "tile set z{} center {:?} offset ({}, {}): {} tiles",
            zoom,
            center_tile,
            offset.x,
            offset.y,
            placements.len()
        );

        Ok(Self {
            zoom,
            tile_size,
            center_tile,
            offset,
            row_range: (row_min, row_max),
            col_range: (col_min, col_max),
            placements,
        })
    }

    /// Keys of every tile in the set
    pub fn needed(&self) -> HashSet<TileKey> {
        self.placements.iter().map(|p| p.key).collect()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
