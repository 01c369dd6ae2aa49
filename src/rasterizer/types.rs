//! Core types for the rasterizer

use serde::{Deserialize, Serialize};
use thiserror::Error;
use super::math::{Vec2, Vec3};

/// RGBA color (0-255 per channel)
///
/// Serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Error type for hex color parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("expected 6 hex digits, got {0:?}")]
    Length(String),
    #[error("invalid hex digits in {0:?}")]
    Digits(String),
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 220, b: 0, a: 255 };
    pub const SKY: Color = Color { r: 135, g: 206, b: 235, a: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a 6-digit hex color, with or without a leading `#`
    pub fn from_hex(s: &str) -> Result<Self, ColorError> {
        let digits = s.trim().trim_start_matches('#');
        if digits.len() != 6 {
            return Err(ColorError::Length(s.to_string()));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorError::Digits(s.to_string()));
        }
        let value = u32::from_str_radix(digits, 16)
            .map_err(|_| ColorError::Digits(s.to_string()))?;
        Ok(Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Apply shading (multiply by intensity 0.0-1.0), alpha forced opaque
    pub fn shade(self, intensity: f32) -> Self {
        let i = intensity.clamp(0.0, 1.0);
        Self {
            r: (self.r as f32 * i) as u8,
            g: (self.g as f32 * i) as u8,
            b: (self.b as f32 * i) as u8,
            a: 255,
        }
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Color::from_hex(&s)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_hex()
    }
}

/// Error type for texture construction and registration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("texture {name:?} is {width}x{height}; dimensions must be powers of two")]
    Dimensions { name: String, width: usize, height: usize },
    #[error("texture {name:?} has {got} pixels, expected {expected}")]
    BufferSize { name: String, got: usize, expected: usize },
    #[error("texture {0:?} is already registered")]
    Duplicate(String),
}

/// Stable index of a texture in the registry (creation order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

impl TextureId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Immutable RGBA texture with power-of-two dimensions
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Texture {
    /// Wrap a pixel buffer. Both dimensions must be powers of two so that
    /// sampling can wrap with a bitmask.
    pub fn from_pixels(name: &str, width: usize, height: usize, pixels: Vec<Color>) -> Result<Self, TextureError> {
        if !width.is_power_of_two() || !height.is_power_of_two() {
            return Err(TextureError::Dimensions { name: name.to_string(), width, height });
        }
        if pixels.len() != width * height {
            return Err(TextureError::BufferSize {
                name: name.to_string(),
                got: pixels.len(),
                expected: width * height,
            });
        }
        Ok(Self { name: name.to_string(), width, height, pixels })
    }

    /// Sample at UV coordinates with wraparound (nearest, no filtering)
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let tx = ((u * self.width as f32).floor() as i32 & (self.width as i32 - 1)) as usize;
        let ty = ((v * self.height as f32).floor() as i32 & (self.height as i32 - 1)) as usize;
        self.pixels[ty * self.width + tx]
    }
}

#[cfg(test)]
impl Texture {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        self.pixels[y * self.width + x]
    }
}

/// World-space triangle as produced by terrain, objects and characters
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub normal: Vec3,
    pub color: Color,
    pub uvs: Option<[Vec2; 3]>,
    pub texture: Option<TextureId>,
    pub is_water: bool,
}

impl Triangle {
    /// Flat-colored triangle with the normal derived from its winding
    pub fn new(vertices: [Vec3; 3], color: Color) -> Self {
        let normal = (vertices[1] - vertices[0])
            .cross(vertices[2] - vertices[0])
            .normalize();
        Self {
            vertices,
            normal,
            color,
            uvs: None,
            texture: None,
            is_water: false,
        }
    }

    pub fn with_texture(mut self, texture: TextureId, uvs: [Vec2; 3]) -> Self {
        self.texture = Some(texture);
        self.uvs = Some(uvs);
        self
    }

    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = normal;
        self
    }

    pub fn water(mut self, is_water: bool) -> Self {
        self.is_water = is_water;
        self
    }

    pub fn centroid(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) * (1.0 / 3.0)
    }
}

/// Screen-space point: pixel coordinates plus view-space depth
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Triangle ready for rasterization, rebuilt every frame
#[derive(Debug, Clone)]
pub struct ProjectedTriangle {
    pub points: [ScreenPoint; 3],
    pub color: Color,
    pub lighting: f32,
    /// Mean of the three point depths
    pub depth: f32,
    pub is_water: bool,
    pub uvs: Option<[Vec2; 3]>,
    pub texture: Option<TextureId>,
}

impl ProjectedTriangle {
    pub fn new(points: [ScreenPoint; 3], source: &Triangle, uvs: Option<[Vec2; 3]>, lighting: f32) -> Self {
        Self {
            points,
            color: source.color,
            lighting,
            depth: (points[0].z + points[1].z + points[2].z) / 3.0,
            is_water: source.is_water,
            uvs,
            texture: source.texture,
        }
    }
}
