pub mod base;
pub mod tile;

pub use base::{LayerProperties, LayerTrait};
pub use tile::TileLayer;
