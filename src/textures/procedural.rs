//! Procedural terrain textures
//!
//! Every material is a flat base color plus per-pixel noise, generated once
//! at startup into a 256x256 buffer.

use log::debug;
use macroquad::rand;
use crate::rasterizer::{Color, Texture, TextureError};

/// Edge length of every procedural texture
pub const TEXTURE_SIZE: usize = 256;

/// Offsets for the grass pseudo-noise
const GRASS_TABLE: [i16; 16] = [-14, 6, -3, 11, -9, 2, 14, -6, 8, -12, 0, 5, -2, 12, -8, 3];

/// How a material perturbs its base color
#[derive(Debug, Clone, Copy)]
pub enum Noise {
    /// Independent uniform offset in `[-amplitude, amplitude]` per channel
    Uniform(u8),
    /// Hashed lookup into a small offset table
    Lookup(&'static [i16]),
    /// Alternating `+contrast`/`-contrast` cells of `cell` pixels
    Checker { contrast: u8, cell: usize },
}

/// A named terrain material
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub name: &'static str,
    pub base: Color,
    pub noise: Noise,
}

pub const GRASS: &str = "grass";
pub const WATER: &str = "water";
pub const DEEP_WATER: &str = "deep_water";
pub const SAND: &str = "sand";
pub const DUNES: &str = "dunes";
pub const ROCK: &str = "rock";
pub const HIGHLAND_GRASS: &str = "highland_grass";
pub const TREELINE: &str = "treeline";
pub const SNOW: &str = "snow";
pub const CHECKER: &str = "checker";

/// All materials, in registration order
pub static MATERIALS: [Material; 10] = [
    Material { name: GRASS, base: Color::new(0x4a, 0x8c, 0x3a), noise: Noise::Lookup(&GRASS_TABLE) },
    Material { name: WATER, base: Color::new(0x3a, 0x7c, 0xc4), noise: Noise::Uniform(8) },
    Material { name: DEEP_WATER, base: Color::new(0x1f, 0x4a, 0x8a), noise: Noise::Uniform(6) },
    Material { name: SAND, base: Color::new(0xd8, 0xc8, 0x8c), noise: Noise::Uniform(12) },
    Material { name: DUNES, base: Color::new(0xc8, 0xa8, 0x6e), noise: Noise::Uniform(18) },
    Material { name: ROCK, base: Color::new(0x7a, 0x74, 0x6c), noise: Noise::Uniform(24) },
    Material { name: HIGHLAND_GRASS, base: Color::new(0x6a, 0x8a, 0x48), noise: Noise::Uniform(14) },
    Material { name: TREELINE, base: Color::new(0x2e, 0x5a, 0x2c), noise: Noise::Uniform(16) },
    Material { name: SNOW, base: Color::new(0xf0, 0xf4, 0xf8), noise: Noise::Uniform(7) },
    Material { name: CHECKER, base: Color::new(0x80, 0x80, 0x80), noise: Noise::Checker { contrast: 0x7f, cell: 32 } },
];

/// Look up a material by name
pub fn material(name: &str) -> Option<&'static Material> {
    MATERIALS.iter().find(|m| m.name == name)
}

fn offset_channel(base: u8, offset: i16) -> u8 {
    (base as i16 + offset).clamp(0, 255) as u8
}

fn lookup(table: &[i16], x: usize, y: usize, channel: usize) -> i16 {
    let h = (x.wrapping_mul(31) ^ y.wrapping_mul(17) ^ ((x * y) >> 3)) + channel * 5;
    table[h % table.len()]
}

/// Generate a single material texture
pub fn generate(material: &Material) -> Result<Texture, TextureError> {
    let base = [material.base.r, material.base.g, material.base.b];
    let mut pixels = Vec::with_capacity(TEXTURE_SIZE * TEXTURE_SIZE);

    for y in 0..TEXTURE_SIZE {
        for x in 0..TEXTURE_SIZE {
            let offsets: [i16; 3] = match material.noise {
                Noise::Uniform(a) => {
                    let a = a as i32;
                    std::array::from_fn(|_| rand::gen_range(-a, a + 1).clamp(-a, a) as i16)
                }
                Noise::Lookup(table) => std::array::from_fn(|c| lookup(table, x, y, c)),
                Noise::Checker { contrast, cell } => {
                    let even = ((x / cell) + (y / cell)) % 2 == 0;
                    let o = if even { contrast as i16 } else { -(contrast as i16) };
                    [o; 3]
                }
            };
            pixels.push(Color::new(
                offset_channel(base[0], offsets[0]),
                offset_channel(base[1], offsets[1]),
                offset_channel(base[2], offsets[2]),
            ));
        }
    }

    debug!("generated texture {}", material.name);
    Texture::from_pixels(material.name, TEXTURE_SIZE, TEXTURE_SIZE, pixels)
}

/// Generate every material with a seeded random source
pub fn generate_all(seed: u64) -> Result<Vec<Texture>, TextureError> {
    rand::srand(seed);
    MATERIALS.iter().map(generate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Largest absolute offset a noise can apply to a channel
    fn max_offset(noise: &Noise) -> i16 {
        match *noise {
            Noise::Uniform(a) => a as i16,
            Noise::Lookup(table) => table.iter().map(|v| v.abs()).max().unwrap_or(0),
            Noise::Checker { contrast, .. } => contrast as i16,
        }
    }

    #[test]
    fn test_textures_are_256_square_and_opaque() {
        for material in &MATERIALS {
            let tex = generate(material).unwrap();
            assert_eq!(tex.width(), TEXTURE_SIZE);
            assert_eq!(tex.height(), TEXTURE_SIZE);
            assert_eq!(tex.pixels().len(), TEXTURE_SIZE * TEXTURE_SIZE);
            assert!(tex.pixels().iter().all(|p| p.a == 255), "{}", material.name);
        }
    }

    #[test]
    fn test_pixels_stay_within_noise_bounds() {
        for material in &MATERIALS {
            let tex = generate(material).unwrap();
            let max = max_offset(&material.noise);
            let base = [material.base.r, material.base.g, material.base.b];
            for p in tex.pixels() {
                for (value, b) in [p.r, p.g, p.b].into_iter().zip(base) {
                    let lo = (b as i16 - max).max(0);
                    let hi = (b as i16 + max).min(255);
                    assert!(
                        (lo..=hi).contains(&(value as i16)),
                        "{}: {} outside [{}, {}]",
                        material.name,
                        value,
                        lo,
                        hi
                    );
                }
            }
        }
    }

    #[test]
    fn test_checker_tiles_exactly() {
        let tex = generate(&MATERIALS[9]).unwrap();
        assert_eq!(tex.get_pixel(0, 0), tex.get_pixel(64, 0));
        assert_ne!(tex.get_pixel(0, 0), tex.get_pixel(32, 0));
        assert_eq!(tex.get_pixel(0, 0), tex.get_pixel(32, 32));
    }

    #[test]
    fn test_grass_is_deterministic() {
        let a = generate(&MATERIALS[0]).unwrap();
        let b = generate(&MATERIALS[0]).unwrap();
        assert_eq!(a.pixels(), b.pixels());
    }

    #[test]
    fn test_all_materials_generated_in_order() {
        let all = generate_all(7).unwrap();
        let names: Vec<_> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names[0], GRASS);
        assert_eq!(names.len(), 10);
        assert_eq!(names[9], CHECKER);
    }
}
