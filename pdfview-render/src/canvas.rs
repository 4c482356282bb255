use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbaImage};
use pdfview_core::{Canvas, Point, Rect, RenderImage, Rgba, Transform};

/// Software canvas over an RGBA8 image. Fills are alpha blended; surfaces
/// are composited with their own per-pixel alpha.
pub struct RasterCanvas {
    image: RgbaImage,
    transform: Transform,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            transform: Transform::IDENTITY,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.image.width() && y < self.image.height() {
            Some(self.image.get_pixel(x, y).0)
        } else {
            None
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("failed to write {:?}", path))
    }

    /// Pixel span `[start, end)` covered by a device interval, clipped to `limit`.
    fn span(start: f64, length: f64, limit: u32) -> (u32, u32) {
        let (lo, hi) = if length < 0.0 {
            (start + length, start)
        } else {
            (start, start + length)
        };
        let clip = |v: f64| v.round().clamp(0.0, limit as f64) as u32;
        (clip(lo), clip(hi))
    }
}

impl Canvas for RasterCanvas {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    fn clear(&mut self, color: Rgba) {
        let [r, g, b] = to_rgb8(color);
        let a = channel(color.a);
        for pixel in self.image.pixels_mut() {
            pixel.0 = [r, g, b, a];
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let device = self.transform.apply_rect(rect);
        let (x0, x1) = Self::span(device.x, device.width, self.image.width());
        let (y0, y1) = Self::span(device.y, device.height, self.image.height());
        let rgb = to_rgb8(color);
        let alpha = color.a as f32;
        for y in y0..y1 {
            for x in x0..x1 {
                blend_pixel(&mut self.image.get_pixel_mut(x, y).0, rgb, alpha);
            }
        }
    }

    fn draw_surface(&mut self, surface: &RenderImage) {
        let origin = self.transform.apply(Point::default());
        let ox = origin.x.round() as i64;
        let oy = origin.y.round() as i64;
        let (width, height) = (self.image.width() as i64, self.image.height() as i64);
        let stride = surface.width as usize * 4;

        for sy in 0..surface.height as i64 {
            let dy = oy + sy;
            if dy < 0 || dy >= height {
                continue;
            }
            for sx in 0..surface.width as i64 {
                let dx = ox + sx;
                if dx < 0 || dx >= width {
                    continue;
                }
                let idx = sy as usize * stride + sx as usize * 4;
                let Some(src) = surface.pixels.get(idx..idx + 4) else {
                    return;
                };
                let alpha = src[3] as f32 / 255.0;
                blend_pixel(
                    &mut self.image.get_pixel_mut(dx as u32, dy as u32).0,
                    [src[0], src[1], src[2]],
                    alpha,
                );
            }
        }
    }
}

/// Wraps a rendered page as an `image` buffer.
pub fn to_rgba_image(surface: &RenderImage) -> Result<RgbaImage> {
    RgbaImage::from_raw(surface.width, surface.height, surface.pixels.clone()).ok_or_else(|| {
        anyhow!(
            "pixel buffer of {} bytes does not match {}x{}",
            surface.pixels.len(),
            surface.width,
            surface.height
        )
    })
}

fn channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn to_rgb8(color: Rgba) -> [u8; 3] {
    [channel(color.r), channel(color.g), channel(color.b)]
}

fn blend_pixel(pixel: &mut [u8; 4], color: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - alpha;
    for (dst, src) in pixel.iter_mut().zip(color) {
        *dst = ((*dst as f32 * inv) + (src as f32 * alpha))
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    let covered = pixel[3] as f32 / 255.0;
    pixel[3] = ((covered + alpha * (1.0 - covered)) * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RenderImage {
        RenderImage {
            width,
            height,
            pixels: rgba.repeat((width * height) as usize),
        }
    }

    #[test]
    fn clear_paints_every_pixel() {
        let mut canvas = RasterCanvas::new(3, 2);
        canvas.clear(Rgba::WHITE);
        assert!(canvas.image().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn fill_rect_follows_transform_and_clips() {
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.clear(Rgba::WHITE);
        canvas.scale(2.0, 2.0);
        canvas.translate(3.0, -1.0);
        canvas.fill_rect(Rect::new(0.0, 0.0, 4.0, 2.0), Rgba::rgb(1.0, 0.0, 0.0));

        // device rect (6, -2) .. (14, 2) clipped to (6, 0) .. (10, 2)
        assert_eq!(canvas.pixel(6, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 1), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(5, 0), Some([255, 255, 255, 255]));
        assert_eq!(canvas.pixel(6, 2), Some([255, 255, 255, 255]));
    }

    #[test]
    fn translucent_fill_blends_with_background() {
        let mut canvas = RasterCanvas::new(2, 2);
        canvas.clear(Rgba::WHITE);
        canvas.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Rgba::new(1.0, 1.0, 0.0, 0.5));
        assert_eq!(canvas.pixel(0, 0), Some([255, 255, 128, 255]));
        assert_eq!(canvas.pixel(1, 1), Some([255, 255, 255, 255]));
    }

    #[test]
    fn surface_is_blitted_at_device_origin() {
        let mut canvas = RasterCanvas::new(4, 4);
        canvas.clear(Rgba::WHITE);
        canvas.scale(2.0, 2.0);
        canvas.translate(1.0, 1.0);
        canvas.draw_surface(&solid(3, 3, [0, 0, 255, 255]));

        assert_eq!(canvas.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(canvas.pixel(2, 2), Some([0, 0, 255, 255]));
        assert_eq!(canvas.pixel(3, 3), Some([0, 0, 255, 255]));
    }

    #[test]
    fn transparent_surface_pixels_leave_background() {
        let mut canvas = RasterCanvas::new(2, 1);
        canvas.clear(Rgba::WHITE);
        canvas.draw_surface(&solid(2, 1, [0, 0, 0, 0]));
        assert_eq!(canvas.pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn png_output_round_trips_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut canvas = RasterCanvas::new(5, 3);
        canvas.clear(Rgba::rgb(0.0, 1.0, 0.0));
        canvas.save_png(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (5, 3));
        assert_eq!(decoded.get_pixel(4, 2).0, [0, 255, 0, 255]);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let surface = RenderImage {
            width: 2,
            height: 2,
            pixels: vec![0; 3],
        };
        assert!(to_rgba_image(&surface).is_err());
        assert!(to_rgba_image(&solid(2, 2, [1, 2, 3, 4])).is_ok());
    }
}
