//! Prelude module for common tilelet types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilelet::prelude::*;`

pub use crate::core::{
    config::TileLoadingConfig,
    geo::{LngLat, Point, TileCoord, TileKey},
    projection::{Projection, ResolutionTable, SphericalMercator},
    viewport::Viewport,
};

pub use crate::tiles::{
    addressing::{Origin, TileGrid},
    cache::TileCache,
    grid::{TilePlacement, TileSet},
    image::{HttpImageFetcher, ImageFetcher, ImageLoader, LoadOutcome, TileImage},
    loader::TileLoader,
    source::{MapSource, MapSourceConfig},
    tile::{Tile, TileState},
    url::UrlResolver,
};

pub use crate::layers::{base::LayerTrait, tile::TileLayer};

pub use crate::rendering::{
    context::{DrawCommand, DrawSurface, RenderContext},
    raster::RasterSurface,
};

pub use crate::runtime::{spawn, AsyncHandle, AsyncSpawner};

pub use crate::{MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use instant::Instant;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::future::BoxFuture;
