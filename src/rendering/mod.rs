pub mod context;
pub mod raster;

// Re-export main types
pub use context::{DrawCommand, DrawSurface, RenderContext};
pub use raster::RasterSurface;
