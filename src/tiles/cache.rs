use crate::{
    core::geo::TileKey,
    prelude::{HashMap, HashSet},
    tiles::tile::Tile,
};

/// Tile entities keyed by (row, col, zoom) plus the current frame's needed set.
///
/// Entities are kept for the whole session; nothing is evicted. The needed set
/// is rebuilt from scratch on every render pass. Tiles are boxed so an entity
/// keeps its address while the map grows.
#[derive(Debug, Default)]
pub struct TileCache {
    tiles: HashMap<TileKey, Box<Tile>>,
    needed: HashSet<TileKey>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the needed set for a new frame
    pub fn set_needed(&mut self, needed: HashSet<TileKey>) {
        self.needed = needed;
    }

    pub fn needed(&self) -> &HashSet<TileKey> {
        &self.needed
    }

    pub fn is_needed(&self, key: &TileKey) -> bool {
        self.needed.contains(key)
    }

    pub fn get(&self, key: &TileKey) -> Option<&Tile> {
        self.tiles.get(key).map(Box::as_ref)
    }

    pub fn get_mut(&mut self, key: &TileKey) -> Option<&mut Tile> {
        self.tiles.get_mut(key).map(Box::as_mut)
    }

    /// Mutable access to a tile alongside read access to the needed set
    pub fn split_mut(&mut self, key: &TileKey) -> Option<(&mut Tile, &HashSet<TileKey>)> {
        let needed = &self.needed;
        self.tiles.get_mut(key).map(|tile| (tile.as_mut(), needed))
    }

    /// Every tile together with the needed set
    pub fn iter_mut_with_needed(&mut self) -> (impl Iterator<Item = &mut Tile>, &HashSet<TileKey>) {
        (self.tiles.values_mut().map(Box::as_mut), &self.needed)
    }

    pub fn insert(&mut self, tile: Tile) -> &mut Tile {
        let key = tile.key();
        log::debug!("caching tile {}", key);
        self.tiles.entry(key).or_insert_with(|| Box::new(tile))
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values().map(Box::as_ref)
    }
}
