//! Color and depth buffers owned by the renderer

use std::path::Path;
use macroquad::color::WHITE;
use macroquad::math::vec2;
use macroquad::texture::{draw_texture_ex, DrawTextureParams, FilterMode, Texture2D};
use super::types::Color;

/// Framebuffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>, // RGBA, 4 bytes per pixel
    pub depth: Vec<f32>, // View-space depth, +inf when empty
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            depth: vec![f32::INFINITY; width * height],
            width,
            height,
        }
    }

    /// Overwrite every pixel with `color` and reset depth to +inf
    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.depth.fill(f32::INFINITY);
    }

    #[cfg(test)]
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        let p = &self.pixels[i..i + 4];
        Some(Color { r: p[0], g: p[1], b: p[2], a: p[3] })
    }

    pub fn depth_at(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.depth[y * self.width + x])
    }

    /// Write a color at a linear pixel index
    #[inline]
    pub fn write_index(&mut self, idx: usize, color: Color) {
        self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
    }

    /// Store `z` if it is nearer than the current depth. Returns whether it passed.
    #[inline]
    pub fn depth_test_and_set(&mut self, idx: usize, z: f32) -> bool {
        if z < self.depth[idx] {
            self.depth[idx] = z;
            true
        } else {
            false
        }
    }

    /// Upload to a GPU texture and draw it into the given screen rectangle.
    /// Dimensions must fit in `u16`; the renderer rejects larger buffers.
    pub fn present(&self, x: f32, y: f32, w: f32, h: f32) {
        let texture = Texture2D::from_rgba8(self.width as u16, self.height as u16, &self.pixels);
        texture.set_filter(FilterMode::Nearest);

        draw_texture_ex(
            &texture,
            x,
            y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(w, h)),
                ..Default::default()
            },
        );
    }

    /// Write the color buffer as a PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width as u32,
            self.height as u32,
            image::ColorType::Rgba8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_overwrites_everything() {
        let mut fb = Framebuffer::new(4, 3);
        fb.write_index(5, Color::RED);
        fb.depth[5] = 2.0;
        fb.clear(Color::SKY);
        assert!(fb.pixels.chunks(4).all(|p| p == Color::SKY.to_bytes()));
        assert!(fb.depth.iter().all(|d| *d == f32::INFINITY));
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let mut fb = Framebuffer::new(2, 2);
        assert!(fb.depth_test_and_set(3, 10.0));
        assert!(!fb.depth_test_and_set(3, 12.0));
        assert!(!fb.depth_test_and_set(3, 10.0));
        assert!(fb.depth_test_and_set(3, 4.0));
        assert_eq!(fb.depth_at(1, 1), Some(4.0));
    }

    #[test]
    fn test_out_of_bounds_access() {
        let fb = Framebuffer::new(2, 2);
        assert_eq!(fb.get_pixel(5, 0), None);
        assert_eq!(fb.depth_at(0, 2), None);
    }
}
