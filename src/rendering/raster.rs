use image::{imageops, Rgba, RgbaImage};
use std::path::Path;

use crate::{
    core::geo::Point,
    rendering::context::DrawSurface,
    tiles::image::TileImage,
    MapError, Result,
};

/// Software compositing surface backed by an RGBA buffer.
///
/// Screen coordinates are centered: `(0, 0)` is the middle of the canvas.
pub struct RasterSurface {
    canvas: RgbaImage,
    background: Rgba<u8>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_background(width, height, Rgba([0, 0, 0, 0]))
    }

    pub fn with_background(width: u32, height: u32, background: Rgba<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MapError::InvalidViewport {
                width: width as f64,
                height: height as f64,
            });
        }
        Ok(Self {
            canvas: RgbaImage::from_pixel(width, height, background),
            background,
        })
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }

    /// Write the canvas to disk; the format follows the file extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.canvas.save(path)?;
        Ok(())
    }

    /// Centered screen rectangle to clamped canvas pixel ranges
    fn to_canvas(&self, bounds: (Point, Point)) -> Option<(i64, i64, i64, i64)> {
        let half_w = self.canvas.width() as f64 / 2.0;
        let half_h = self.canvas.height() as f64 / 2.0;
        let x0 = (bounds.0.x + half_w).round() as i64;
        let y0 = (bounds.0.y + half_h).round() as i64;
        let x1 = (bounds.1.x + half_w).round() as i64;
        let y1 = (bounds.1.y + half_h).round() as i64;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }
}

/// Source-over blend of `src` onto `dst` with an extra opacity factor
fn blend(dst: &mut Rgba<u8>, src: &Rgba<u8>, opacity: f32) {
    let src_a = src[3] as f32 / 255.0 * opacity;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for c in 0..3 {
        let s = src[c] as f32 / 255.0;
        let d = dst[c] as f32 / 255.0;
        let out = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = (out * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

impl DrawSurface for RasterSurface {
    fn draw_image(&mut self, image: &TileImage, bounds: (Point, Point), opacity: f32) -> Result<()> {
        let Some((x0, y0, x1, y1)) = self.to_canvas(bounds) else {
            return Ok(());
        };
        let (w, h) = ((x1 - x0) as u32, (y1 - y0) as u32);

        let resized;
        let pixels = if image.width() == w && image.height() == h {
            image.pixels()
        } else {
            resized = imageops::resize(image.pixels(), w, h, imageops::FilterType::Nearest);
            &resized
        };

        let (cw, ch) = (self.canvas.width() as i64, self.canvas.height() as i64);
        for cy in y0.max(0)..y1.min(ch) {
            for cx in x0.max(0)..x1.min(cw) {
                let src = pixels.get_pixel((cx - x0) as u32, (cy - y0) as u32);
                blend(self.canvas.get_pixel_mut(cx as u32, cy as u32), src, opacity);
            }
        }
        Ok(())
    }

    fn clear(&mut self, region: Option<(Point, Point)>) -> Result<()> {
        let background = self.background;
        match region {
            None => {
                for pixel in self.canvas.pixels_mut() {
                    *pixel = background;
                }
            }
            Some(bounds) => {
                let Some((x0, y0, x1, y1)) = self.to_canvas(bounds) else {
                    return Ok(());
                };
                let (cw, ch) = (self.canvas.width() as i64, self.canvas.height() as i64);
                for cy in y0.max(0)..y1.min(ch) {
                    for cx in x0.max(0)..x1.min(cw) {
                        self.canvas.put_pixel(cx as u32, cy as u32, background);
                    }
                }
            }
        }
        Ok(())
    }
}
