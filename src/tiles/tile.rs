//! The tile entity: one grid cell's imagery, load progress and fade state.

use crate::{
    animation::FadeIn,
    core::{
        config::TileLoadingConfig,
        geo::{Point, TileKey},
    },
    prelude::{HashSet, Instant},
    rendering::context::DrawSurface,
    runtime::AsyncHandle,
    tiles::{
        image::TileImage,
        loader::{LoadEvent, TileLoader},
    },
    Result,
};

/// Lifecycle of a tile: `Created -> Loading -> {Loaded, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Created,
    Loading,
    /// Every load finished and at least one image decoded
    Loaded,
    /// Every load finished without an image; the area stays blank
    Failed,
}

pub struct Tile {
    key: TileKey,
    urls: Vec<String>,
    images: Vec<Option<TileImage>>,
    pending: usize,
    generation: u64,
    state: TileState,
    position: Point,
    tile_size: u32,
    z_index: i32,
    opacity: f32,
    fade: Option<FadeIn>,
    handles: Vec<Box<dyn AsyncHandle>>,
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .field("pending", &self.pending)
            .finish()
    }
}

impl Tile {
    /// A tile that has not started loading yet.
    ///
    /// Tiles start hidden when fading is enabled so their first appearance fades in.
    pub fn new(key: TileKey, urls: Vec<String>, position: Point, tile_size: u32, config: &TileLoadingConfig) -> Self {
        Self {
            key,
            urls,
            images: Vec::new(),
            pending: 0,
            generation: 0,
            state: TileState::Created,
            position,
            tile_size,
            z_index: 0,
            opacity: if config.fade_in { 0.0 } else { 1.0 },
            fade: None,
            handles: Vec::new(),
        }
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Loads still outstanding for the current generation
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Decoded images, in template order
    pub fn images(&self) -> impl Iterator<Item = &TileImage> {
        self.images.iter().flatten()
    }

    pub fn has_images(&self) -> bool {
        self.images.iter().any(Option::is_some)
    }

    pub fn update_pos(&mut self, position: Point) -> &mut Self {
        self.position = position;
        self
    }

    pub fn update_layer(&mut self, z_index: i32) -> &mut Self {
        self.z_index = z_index;
        self
    }

    /// Start one image load per URL. No-op unless the tile is `Created`.
    pub fn start_loading(&mut self, loader: &TileLoader) {
        if self.state != TileState::Created {
            return;
        }
        if self.urls.is_empty() {
            log::warn!("tile {} has no urls", self.key);
            self.state = TileState::Failed;
            return;
        }

        self.images = vec![None; self.urls.len()];
        self.pending = self.urls.len();
        self.state = TileState::Loading;
        self.handles = loader.start(self.key, self.generation, &self.urls);
    }

    /// Record one finished image load.
    ///
    /// Returns `true` when this event settled the tile. Events from an older
    /// generation or for a tile that is not loading are ignored.
    pub fn complete_load(&mut self, event: LoadEvent) -> bool {
        if event.key != self.key
            || event.generation != self.generation
            || self.state != TileState::Loading
            || event.slot >= self.images.len()
        {
            log::debug!("dropping stale load event for tile {}", event.key);
            return false;
        }

        if let Some(error) = event.outcome.error() {
            log::warn!("tile {}: {}", self.key, error);
        }
        self.images[event.slot] = event.outcome.image;
        self.pending = self.pending.saturating_sub(1);
        if self.pending > 0 {
            return false;
        }

        self.handles.clear();
        self.state = if self.has_images() {
            TileState::Loaded
        } else {
            TileState::Failed
        };
        log::debug!("tile {} settled as {:?}", self.key, self.state);
        true
    }

    /// Abort outstanding loads and return to `Created`.
    ///
    /// Results of the aborted loads are ignored if they still arrive.
    pub fn cancel_loads(&mut self) -> bool {
        if self.state != TileState::Loading {
            return false;
        }
        for handle in self.handles.drain(..) {
            handle.cancel();
        }
        self.generation += 1;
        self.images.clear();
        self.pending = 0;
        self.state = TileState::Created;
        log::debug!("cancelled loads of tile {}", self.key);
        true
    }

    /// Whether this tile would draw anything for the frame described by `needed`
    pub fn should_render(&self, needed: &HashSet<TileKey>) -> bool {
        self.state == TileState::Loaded && self.has_images() && needed.contains(&self.key)
    }

    /// Composite the tile's images onto `surface` at its current position.
    ///
    /// `fade_in` restarts the fade of a tile that is already visible. Returns
    /// whether anything was drawn.
    pub fn render(
        &mut self,
        needed: &HashSet<TileKey>,
        surface: &mut dyn DrawSurface,
        fade_in: bool,
        now: Instant,
        config: &TileLoadingConfig,
    ) -> Result<bool> {
        if !self.should_render(needed) {
            return Ok(false);
        }

        if config.fade_in {
            if fade_in && self.opacity != 0.0 {
                self.hide();
            }
            if self.opacity < 1.0 && self.fade.is_none() {
                self.fade = Some(FadeIn::new(self.opacity, now, config.fade_in_duration()));
            }
            self.step_fade(now);
        } else {
            self.fade = None;
            self.opacity = 1.0;
        }

        self.draw(surface)?;
        Ok(true)
    }

    /// Advance a running fade to `now` and redraw.
    ///
    /// Returns whether the fade is still running afterwards.
    pub fn advance_fade(&mut self, needed: &HashSet<TileKey>, surface: &mut dyn DrawSurface, now: Instant) -> Result<bool> {
        if self.fade.is_none() {
            return Ok(false);
        }
        if !self.should_render(needed) {
            // Not on screen; finish silently so it does not keep the layer animating
            self.fade = None;
            self.opacity = 1.0;
            return Ok(false);
        }
        self.step_fade(now);
        self.draw(surface)?;
        Ok(self.fade.is_some())
    }

    fn hide(&mut self) {
        self.opacity = 0.0;
        self.fade = None;
    }

    fn step_fade(&mut self, now: Instant) {
        if let Some(fade) = self.fade {
            self.opacity = fade.opacity_at(now);
            if fade.is_done(now) {
                self.opacity = 1.0;
                self.fade = None;
            }
        }
    }

    /// Screen rectangle (min, max) covered by the tile
    pub fn bounds(&self) -> (Point, Point) {
        let size = self.tile_size as f64;
        (self.position, self.position.add(&Point::new(size, size)))
    }

    fn draw(&self, surface: &mut dyn DrawSurface) -> Result<()> {
        let bounds = self.bounds();
        surface.set_layer(self.z_index);
        surface.clear(Some(bounds))?;
        for image in self.images() {
            surface.draw_image(image, bounds, self.opacity)?;
        }
        Ok(())
    }
}
