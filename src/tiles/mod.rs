pub mod addressing;
pub mod cache;
pub mod grid;
pub mod image;
pub mod loader;
pub mod source;
pub mod tile;
pub mod url;

// Re-exports for convenience
pub use addressing::{Origin, TileGrid};
pub use cache::TileCache;
pub use grid::{TilePlacement, TileSet};
pub use image::{HttpImageFetcher, ImageFetcher, ImageLoader, LoadOutcome, TileImage};
pub use loader::{LoadEvent, TileLoader};
pub use source::{MapSource, MapSourceBuilder, MapSourceConfig};
pub use tile::{Tile, TileState};
pub use url::UrlResolver;
