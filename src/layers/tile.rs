//! Render orchestration for one raster tile source.
//!
//! A render pass computes the covering tile set, refreshes the needed set and
//! either re-renders cached tiles at their new position or creates and starts
//! loading new ones. Load completions are applied later, out of band, through
//! [`TileLayer::process_load_results`], which re-renders only the tiles they
//! settle.

use crate::{
    core::{config::TileLoadingConfig, geo::TileKey, viewport::Viewport},
    layers::base::{LayerProperties, LayerSurface, LayerTrait},
    prelude::{Arc, Instant},
    rendering::context::DrawSurface,
    tiles::{
        cache::TileCache,
        grid::TileSet,
        image::{HttpImageFetcher, ImageFetcher},
        loader::TileLoader,
        source::MapSource,
        tile::{Tile, TileState},
        url::UrlResolver,
    },
    Result,
};

/// A layer that displays raster tiles from a [`MapSource`]
pub struct TileLayer {
    /// Base layer properties
    properties: LayerProperties,
    source: Arc<MapSource>,
    config: TileLoadingConfig,
    resolver: UrlResolver,
    loader: TileLoader,
    cache: TileCache,
    /// Tile set of the most recent render pass
    last_set: Option<TileSet>,
}

impl TileLayer {
    pub fn new(
        id: impl Into<String>,
        source: MapSource,
        fetcher: Arc<dyn ImageFetcher>,
        config: TileLoadingConfig,
    ) -> Self {
        let id = id.into();
        let properties = LayerProperties::new(id.clone(), source.name.clone());
        Self {
            properties,
            source: Arc::new(source),
            loader: TileLoader::new(fetcher, config.clone()),
            config,
            resolver: UrlResolver::new(),
            cache: TileCache::new(),
            last_set: None,
        }
    }

    /// Layer fetching over HTTP(S)
    pub fn with_http(id: impl Into<String>, source: MapSource, config: TileLoadingConfig) -> Self {
        Self::new(id, source, Arc::new(HttpImageFetcher), config)
    }

    pub fn source(&self) -> &MapSource {
        &self.source
    }

    pub fn config(&self) -> &TileLoadingConfig {
        &self.config
    }

    /// Run a render pass for `viewport`.
    ///
    /// `fade_in` re-fades tiles that are already visible, e.g. after a zoom change.
    /// Fails only for an invalid viewport; draw errors of individual tiles are
    /// logged and skipped.
    pub fn render(&mut self, viewport: &Viewport, surface: &mut dyn DrawSurface, fade_in: bool) -> Result<()> {
        self.render_at(viewport, surface, fade_in, Instant::now())
    }

    pub fn render_at(
        &mut self,
        viewport: &Viewport,
        surface: &mut dyn DrawSurface,
        fade_in: bool,
        now: Instant,
    ) -> Result<()> {
        let set = TileSet::compute(viewport, &self.source)?;
        self.cache.set_needed(set.needed());

        if !self.properties.visible {
            self.last_set = Some(set);
            return Ok(());
        }

        let z_index = self.properties.z_index;
        let mut surface = LayerSurface::new(surface, self.properties.opacity);
        let mut created = 0;

        for placement in &set.placements {
            if let Some((tile, needed)) = self.cache.split_mut(&placement.key) {
                tile.update_pos(placement.position).update_layer(z_index);
                if tile.state() == TileState::Created {
                    tile.start_loading(&self.loader);
                }
                if let Err(e) = tile.render(needed, &mut surface, fade_in, now, &self.config) {
                    log::warn!("failed to draw tile {}: {}", placement.key, e);
                }
            } else {
                let urls = self.resolver.resolve_all(placement.key, &self.source);
                let mut tile = Tile::new(
                    placement.key,
                    urls,
                    placement.position,
                    self.source.tile_size,
                    &self.config,
                );
                tile.update_layer(z_index).start_loading(&self.loader);
                self.cache.insert(tile);
                created += 1;
            }
        }

        log::debug!(
            "layer {}: {} tiles needed, {} new, {} cached",
            self.properties.id,
            set.len(),
            created,
            self.cache.len()
        );
        self.last_set = Some(set);
        Ok(())
    }

    /// Apply load completions that arrived since the last call.
    ///
    /// Each tile settled by a completion is rendered on its own; the rest of the
    /// viewport is left untouched. Returns the number of tiles settled.
    pub fn process_load_results(&mut self, surface: &mut dyn DrawSurface) -> usize {
        self.process_load_results_at(surface, Instant::now())
    }

    pub fn process_load_results_at(&mut self, surface: &mut dyn DrawSurface, now: Instant) -> usize {
        let events = self.loader.try_recv_events();
        if events.is_empty() {
            return 0;
        }

        let mut surface = LayerSurface::new(surface, self.properties.opacity);
        let visible = self.properties.visible;
        let mut settled = 0;

        for event in events {
            let key = event.key;
            let Some((tile, needed)) = self.cache.split_mut(&key) else {
                log::debug!("load event for unknown tile {}", key);
                continue;
            };
            if !tile.complete_load(event) {
                continue;
            }
            settled += 1;
            if visible {
                if let Err(e) = tile.render(needed, &mut surface, false, now, &self.config) {
                    log::warn!("failed to draw tile {}: {}", key, e);
                }
            }
        }
        settled
    }

    /// Advance every running fade to `now` and redraw the affected tiles.
    ///
    /// Returns whether any fade is still running.
    pub fn tick(&mut self, now: Instant, surface: &mut dyn DrawSurface) -> bool {
        let mut surface = LayerSurface::new(surface, self.properties.opacity);
        let (tiles, needed) = self.cache.iter_mut_with_needed();
        let mut running = false;
        for tile in tiles.filter(|tile| tile.is_fading()) {
            match tile.advance_fade(needed, &mut surface, now) {
                Ok(still_fading) => running |= still_fading,
                Err(e) => log::warn!("failed to draw tile {}: {}", tile.key(), e),
            }
        }
        running
    }

    /// Abort in-flight loads of tiles outside the current needed set.
    ///
    /// The tiles stay cached and reload the next time they are needed. Returns
    /// the number of tiles whose loads were cancelled.
    pub fn cancel_unneeded(&mut self) -> usize {
        let (tiles, needed) = self.cache.iter_mut_with_needed();
        let cancelled = tiles
            .filter(|tile| !needed.contains(&tile.key()))
            .map(|tile| tile.cancel_loads())
            .filter(|&cancelled| cancelled)
            .count();
        if cancelled > 0 {
            log::info!("layer {}: cancelled loads of {} tiles", self.properties.id, cancelled);
        }
        cancelled
    }

    pub fn tile(&self, key: &TileKey) -> Option<&Tile> {
        self.cache.get(key)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn needed_len(&self) -> usize {
        self.cache.needed().len()
    }

    pub fn is_needed(&self, key: &TileKey) -> bool {
        self.cache.is_needed(key)
    }

    /// Image loads still outstanding across all tiles
    pub fn pending_loads(&self) -> usize {
        self.cache.tiles().map(Tile::pending).sum()
    }

    /// No tile is waiting for imagery
    pub fn is_settled(&self) -> bool {
        self.pending_loads() == 0 && !self.loader.has_pending_events()
    }

    pub fn is_animating(&self) -> bool {
        self.cache.tiles().any(Tile::is_fading)
    }

    /// Tile set computed by the most recent render pass
    pub fn last_tile_set(&self) -> Option<&TileSet> {
        self.last_set.as_ref()
    }
}

impl LayerTrait for TileLayer {
    fn id(&self) -> &str {
        &self.properties.id
    }

    fn name(&self) -> &str {
        &self.properties.name
    }

    fn is_visible(&self) -> bool {
        self.properties.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.properties.visible = visible;
    }

    fn opacity(&self) -> f32 {
        self.properties.opacity
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.properties.opacity = opacity.clamp(0.0, 1.0);
    }

    fn z_index(&self) -> i32 {
        self.properties.z_index
    }

    fn set_z_index(&mut self, z_index: i32) {
        self.properties.z_index = z_index;
    }

    fn render(&mut self, surface: &mut dyn DrawSurface, viewport: &Viewport) -> Result<()> {
        TileLayer::render(self, viewport, surface, false)
    }

    fn update(&mut self, surface: &mut dyn DrawSurface, now: Instant) -> Result<bool> {
        self.process_load_results_at(surface, now);
        let fading = self.tick(now, surface);
        Ok(fading || !self.is_settled())
    }
}
