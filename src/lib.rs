//! # tilelet
//!
//! Slippy-map raster tile pipeline.
//!
//! Given a geographic center, a zoom level and a viewport size, tilelet works out
//! which tiles cover the viewport, loads their imagery asynchronously with bounded
//! retry, keeps the loaded tiles cached across render passes and composites them
//! onto a caller-supplied drawing surface with an optional fade-in.

pub mod animation;
pub mod core;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod tiles;
pub use crate::core::constants;

use std::time::Duration;

// Re-export public API
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
    loader::{LoadEvent, TileLoader},
    source::{MapSource, MapSourceBuilder, MapSourceConfig},
    tile::{Tile, TileState},
    url::UrlResolver,
};

pub use crate::layers::{
    base::{LayerProperties, LayerTrait},
    tile::TileLayer,
};

pub use crate::rendering::{
    context::{DrawCommand, DrawSurface, RenderContext},
    raster::RasterSurface,
};

/// Install an `env_logger` backend for the `log` macros, honouring `RUST_LOG`.
///
/// Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("latitude {lat} cannot be projected (must be within the Mercator range)")]
    ProjectionDomain { lat: f64 },

    #[error("tile load of {url} timed out after {after:?}")]
    TileLoadTimeout { url: String, after: Duration },

    #[error("gave up loading {url} after {attempts} attempts")]
    TileLoadExhausted { url: String, attempts: u32 },

    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    #[error("zoom level {0} is outside the resolution table")]
    ZoomOutOfRange(u8),

    #[error("invalid url template: {0}")]
    InvalidTemplate(String),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;
