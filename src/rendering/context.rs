use crate::{core::geo::Point, tiles::image::TileImage, MapError, Result};

/// Where tiles get composited.
///
/// Coordinates are screen pixels relative to the viewport center. Implementations
/// may be immediate-mode (a pixel buffer) or retained (a recorded command list).
pub trait DrawSurface {
    /// Draw `image` scaled into `bounds` (min, max) at `opacity`
    fn draw_image(&mut self, image: &TileImage, bounds: (Point, Point), opacity: f32) -> Result<()>;

    /// Clear `region`, or everything when `None`
    fn clear(&mut self, region: Option<(Point, Point)>) -> Result<()>;

    /// Select the draw layer for subsequent calls
    fn set_layer(&mut self, _z_index: i32) {}
}

/// Commands that can be issued to the render context
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Image {
        image: TileImage,
        bounds: (Point, Point), // min, max screen coordinates
        opacity: f32,
        layer: i32,
    },
    Clear {
        region: Option<(Point, Point)>,
        layer: i32,
    },
}

/// Recording surface: queues draw commands instead of rasterizing them
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    /// Drawing primitives queue, in issue order
    pub drawing_queue: Vec<DrawCommand>,
    /// Viewport clipping bounds (min, max) in screen coordinates
    pub clip_bounds: Option<(Point, Point)>,
    layer: i32,
}

impl RenderContext {
    /// Create a new render context
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MapError::InvalidViewport {
                width: width as f64,
                height: height as f64,
            });
        }
        Ok(Self {
            width,
            height,
            drawing_queue: Vec::new(),
            clip_bounds: None,
            layer: 0,
        })
    }

    /// Begin a frame
    pub fn begin_frame(&mut self) {
        self.drawing_queue.clear();
    }

    /// Get the current drawing queue
    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }

    /// Image draws only, in issue order
    pub fn image_draws(&self) -> impl Iterator<Item = (&(Point, Point), f32)> {
        self.drawing_queue.iter().filter_map(|cmd| match cmd {
            DrawCommand::Image { bounds, opacity, .. } => Some((bounds, *opacity)),
            DrawCommand::Clear { .. } => None,
        })
    }

    /// Cull draws that fall completely outside `min..max`
    pub fn set_clip_bounds(&mut self, min: Point, max: Point) {
        self.clip_bounds = Some((min, max));
    }

    pub fn clear_clip_bounds(&mut self) {
        self.clip_bounds = None;
    }

    /// Clip test against the viewport (false if completely outside)
    fn is_visible(&self, bounds: (Point, Point)) -> bool {
        match self.clip_bounds {
            Some((clip_min, clip_max)) => {
                let (tile_min, tile_max) = bounds;
                !(tile_max.x <= clip_min.x
                    || tile_min.x >= clip_max.x
                    || tile_max.y <= clip_min.y
                    || tile_min.y >= clip_max.y)
            }
            None => true,
        }
    }

    /// Clear the drawing queue
    pub fn clear_queue(&mut self) {
        self.drawing_queue.clear();
    }
}

impl DrawSurface for RenderContext {
    fn draw_image(&mut self, image: &TileImage, bounds: (Point, Point), opacity: f32) -> Result<()> {
        if bounds.0.x >= bounds.1.x || bounds.0.y >= bounds.1.y {
            return Err(MapError::Config(format!("invalid draw bounds {:?}", bounds)));
        }
        if !(0.0..=1.0).contains(&opacity) {
            return Err(MapError::Config(format!("opacity {} outside 0..=1", opacity)));
        }
        if self.is_visible(bounds) {
            self.drawing_queue.push(DrawCommand::Image {
                image: image.clone(),
                bounds,
                opacity,
                layer: self.layer,
            });
        }
        Ok(())
    }

    fn clear(&mut self, region: Option<(Point, Point)>) -> Result<()> {
        self.drawing_queue.push(DrawCommand::Clear {
            region,
            layer: self.layer,
        });
        Ok(())
    }

    fn set_layer(&mut self, z_index: i32) {
        self.layer = z_index;
    }
}
