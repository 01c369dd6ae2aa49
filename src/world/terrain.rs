//! Height-grid terrain
//!
//! A square grid of heights, two triangles per cell. Anything at or below
//! sea level is flattened onto the water plane (`y = 0`) and flagged as
//! water. Each triangle picks a material from its mean height.

use crate::rasterizer::{ray_triangle_intersect, Color, Triangle, TriangleSource, Vec2, Vec3};
use crate::textures::{procedural, TextureRegistry};

/// World units covered by one repeat of a terrain texture
const UV_SCALE: f32 = 8.0;

/// Height above which ground rays are cast
const RAY_HEIGHT: f32 = 1000.0;

/// Mean-height bands, checked in order; the first band whose ceiling is
/// above the height wins.
const BANDS: [(f32, &str); 8] = [
    (-4.0, procedural::DEEP_WATER),
    (0.0, procedural::WATER),
    (1.5, procedural::SAND),
    (3.0, procedural::DUNES),
    (12.0, procedural::GRASS),
    (20.0, procedural::HIGHLAND_GRASS),
    (28.0, procedural::TREELINE),
    (36.0, procedural::ROCK),
];

/// Material name for a triangle with the given mean (unflattened) height
pub fn material_for_height(height: f32) -> &'static str {
    BANDS
        .iter()
        .find(|(ceiling, _)| height <= *ceiling)
        .map(|(_, name)| *name)
        .unwrap_or(procedural::SNOW)
}

#[derive(Debug, Clone)]
pub struct Terrain {
    /// Vertices per side
    size: usize,
    cell: f32,
    heights: Vec<f32>,
    triangles: Vec<Triangle>,
}

impl Terrain {
    /// Build from a `size * size` height grid (row-major, rows along +Z).
    /// Returns `None` if the grid is too small or the wrong length.
    pub fn from_heights(size: usize, cell: f32, heights: Vec<f32>, textures: &TextureRegistry) -> Option<Self> {
        if size < 2 || heights.len() != size * size {
            return None;
        }
        let mut terrain = Self { size, cell, heights, triangles: Vec::new() };
        terrain.triangles = terrain.build(textures);
        Some(terrain)
    }

    /// Rolling hills around a central lake
    pub fn rolling(size: usize, cell: f32, textures: &TextureRegistry) -> Option<Self> {
        let half = (size as f32 - 1.0) * 0.5;
        let mut heights = Vec::with_capacity(size * size);
        for z in 0..size {
            for x in 0..size {
                let fx = x as f32 - half;
                let fz = z as f32 - half;
                let r = (fx * fx + fz * fz).sqrt() / half.max(1.0);
                let hills = (fx * 0.35).sin() * 3.0 + (fz * 0.27).cos() * 4.0 + (fx * fz * 0.01).sin() * 2.0;
                heights.push(r * r * 45.0 - 8.0 + hills);
            }
        }
        Self::from_heights(size, cell, heights, textures)
    }

    /// World-space extent along X and Z
    pub fn extent(&self) -> f32 {
        (self.size - 1) as f32 * self.cell
    }

    fn vertex(&self, x: usize, z: usize) -> (Vec3, f32) {
        let raw = self.heights[z * self.size + x];
        let pos = Vec3::new(x as f32 * self.cell, raw.max(0.0), z as f32 * self.cell);
        (pos, raw)
    }

    fn build(&self, textures: &TextureRegistry) -> Vec<Triangle> {
        let cells = self.size - 1;
        let mut out = Vec::with_capacity(cells * cells * 2);
        for z in 0..cells {
            for x in 0..cells {
                let a = self.vertex(x, z);
                let b = self.vertex(x + 1, z);
                let c = self.vertex(x, z + 1);
                let d = self.vertex(x + 1, z + 1);
                // Both windings give an upward normal
                out.push(self.make_triangle([a, c, b], textures));
                out.push(self.make_triangle([b, c, d], textures));
            }
        }
        out
    }

    fn make_triangle(&self, corners: [(Vec3, f32); 3], textures: &TextureRegistry) -> Triangle {
        let vertices = corners.map(|(p, _)| p);
        let mean = corners.iter().map(|(_, h)| h).sum::<f32>() / 3.0;
        let name = material_for_height(mean);
        let is_water = vertices.iter().all(|v| v.y == 0.0) && mean <= 0.0;

        let color = procedural::material(name).map(|m| m.base).unwrap_or(Color::WHITE);
        let tri = Triangle::new(vertices, color).water(is_water);
        match textures.id_of(name) {
            Some(id) => {
                let uvs = vertices.map(|v| Vec2::new(v.x / UV_SCALE, v.z / UV_SCALE));
                tri.with_texture(id, uvs)
            }
            None => tri,
        }
    }

    /// Ground triangle and height under a world-space XZ position
    pub fn ground_at(&self, x: f32, z: f32) -> Option<(&Triangle, f32)> {
        let cx = (x / self.cell).floor();
        let cz = (z / self.cell).floor();
        let cells = (self.size - 1) as f32;
        if cx < 0.0 || cz < 0.0 || cx >= cells || cz >= cells {
            return None;
        }
        let first = (cz as usize * (self.size - 1) + cx as usize) * 2;
        let origin = Vec3::new(x, RAY_HEIGHT, z);
        let down = Vec3::new(0.0, -1.0, 0.0);
        self.triangles[first..first + 2].iter().find_map(|tri| {
            let [v0, v1, v2] = tri.vertices;
            ray_triangle_intersect(origin, down, v0, v1, v2).map(|t| (tri, RAY_HEIGHT - t))
        })
    }
}

impl TriangleSource for Terrain {
    fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }
}
