use crate::{
    core::{geo::Point, viewport::Viewport},
    prelude::Instant,
    rendering::context::DrawSurface,
    tiles::image::TileImage,
    Result,
};

#[derive(Debug, Clone)]
pub struct LayerProperties {
    pub id: String,
    pub name: String,
    pub z_index: i32,
    pub opacity: f32,
    pub visible: bool,
}

impl LayerProperties {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            z_index: 0,
            opacity: 1.0,
            visible: true,
        }
    }
}

impl Default for LayerProperties {
    fn default() -> Self {
        Self::new("default".to_string(), "Default Layer".to_string())
    }
}

/// Common operations for anything that draws onto a [`DrawSurface`].
pub trait LayerTrait: Send {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Check if layer is visible
    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    /// Get layer opacity (0.0 to 1.0)
    fn opacity(&self) -> f32;

    fn set_opacity(&mut self, opacity: f32);

    /// Get layer z-index for ordering
    fn z_index(&self) -> i32;

    fn set_z_index(&mut self, z_index: i32);

    /// Render the layer for `viewport`
    fn render(&mut self, surface: &mut dyn DrawSurface, viewport: &Viewport) -> Result<()>;

    /// Apply work that completed since the last call.
    ///
    /// Returns whether the layer still has work in flight.
    fn update(&mut self, _surface: &mut dyn DrawSurface, _now: Instant) -> Result<bool> {
        Ok(false)
    }
}

/// Scales every draw by the layer opacity
pub(crate) struct LayerSurface<'a> {
    inner: &'a mut dyn DrawSurface,
    opacity: f32,
}

impl<'a> LayerSurface<'a> {
    pub(crate) fn new(inner: &'a mut dyn DrawSurface, opacity: f32) -> Self {
        Self {
            inner,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

impl DrawSurface for LayerSurface<'_> {
    fn draw_image(&mut self, image: &TileImage, bounds: (Point, Point), opacity: f32) -> Result<()> {
        self.inner.draw_image(image, bounds, opacity * self.opacity)
    }

    fn clear(&mut self, region: Option<(Point, Point)>) -> Result<()> {
        self.inner.clear(region)
    }

    fn set_layer(&mut self, z_index: i32) {
        self.inner.set_layer(z_index)
    }
}
