//! Triangle rasterization
//!
//! Bounding box walked in 8x8 pixel blocks, edge functions sampled at pixel
//! centers with a top-left fill rule, barycentric depth, perspective-correct
//! UVs and flat or textured shading.

use super::framebuffer::Framebuffer;
use super::math::{edge_function, Vec2};
use super::types::{ProjectedTriangle, ScreenPoint, Texture};
use super::BLOCK_SIZE;

/// Whether a pass reads and writes the depth buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthTest {
    Off,
    On,
}

/// Per-frame shading inputs shared by every triangle of a pass
#[derive(Debug, Clone, Copy)]
pub struct ShadeParams {
    /// Simulation time in seconds, drives the water shimmer
    pub frame_time: f32,
    /// Depth distance over which the shimmer phase advances one radian
    pub water_period: f32,
}

/// Edge `a -> b` owns pixels lying exactly on it when it is a top or left
/// edge of a triangle with positive screen-space area.
#[inline]
fn is_top_left(a: ScreenPoint, b: ScreenPoint) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dy == 0.0 && dx > 0.0) || dy < 0.0
}

#[inline]
fn covers(w: f32, top_left: bool) -> bool {
    w > 0.0 || (w == 0.0 && top_left)
}

/// Water lighting multiplier at a given depth and time
#[inline]
pub fn water_shimmer(frame_time: f32, depth: f32, period: f32) -> f32 {
    (frame_time + depth / period).sin() * 0.1 + 0.9
}

/// Triangle rearranged to positive area, with everything the inner loop needs
struct Setup<'a> {
    p: [ScreenPoint; 3],
    top_left: [bool; 3],
    inv_area: f32,
    uvs: Option<[Vec2; 3]>,
    texture: Option<&'a Texture>,
}

impl<'a> Setup<'a> {
    fn new(tri: &ProjectedTriangle, texture: Option<&'a Texture>) -> Option<Self> {
        let mut p = tri.points;
        let mut uvs = tri.uvs;

        let mut area = edge_function(p[0].x, p[0].y, p[1].x, p[1].y, p[2].x, p[2].y);
        if !area.is_finite() || area.abs() < 1e-6 {
            return None;
        }
        if area < 0.0 {
            p.swap(1, 2);
            if let Some(uv) = uvs.as_mut() {
                uv.swap(1, 2);
            }
            area = -area;
        }

        Some(Self {
            p,
            top_left: [
                is_top_left(p[1], p[2]),
                is_top_left(p[2], p[0]),
                is_top_left(p[0], p[1]),
            ],
            inv_area: 1.0 / area,
            // Textured only when both halves are present
            uvs: uvs.filter(|_| texture.is_some()),
            texture: texture.filter(|_| uvs.is_some()),
        })
    }

    /// Edge values for a pixel center, ordered to match the opposite vertex
    #[inline]
    fn edges(&self, px: f32, py: f32) -> [f32; 3] {
        let p = &self.p;
        [
            edge_function(p[1].x, p[1].y, p[2].x, p[2].y, px, py),
            edge_function(p[2].x, p[2].y, p[0].x, p[0].y, px, py),
            edge_function(p[0].x, p[0].y, p[1].x, p[1].y, px, py),
        ]
    }

    /// True when no pixel center of the block can be inside the triangle
    fn block_outside(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> bool {
        let corners = [
            self.edges(x0, y0),
            self.edges(x1, y0),
            self.edges(x0, y1),
            self.edges(x1, y1),
        ];
        (0..3).any(|i| corners.iter().all(|e| e[i] < 0.0))
    }

    #[inline]
    fn depth_at(&self, b: [f32; 3], fallback: f32) -> f32 {
        let z = b[0] * self.p[0].z + b[1] * self.p[1].z + b[2] * self.p[2].z;
        if z.is_finite() {
            z
        } else {
            fallback
        }
    }

    /// Perspective-correct UV: interpolate 1/z and uv/z, then divide
    #[inline]
    fn uv_at(&self, uvs: &[Vec2; 3], b: [f32; 3]) -> Vec2 {
        let w = [
            b[0] / self.p[0].z,
            b[1] / self.p[1].z,
            b[2] / self.p[2].z,
        ];
        let inv_z = w[0] + w[1] + w[2];
        if inv_z == 0.0 || !inv_z.is_finite() {
            return uvs[0];
        }
        let u = (w[0] * uvs[0].x + w[1] * uvs[1].x + w[2] * uvs[2].x) / inv_z;
        let v = (w[0] * uvs[0].y + w[1] * uvs[1].y + w[2] * uvs[2].y) / inv_z;
        Vec2::new(u, v)
    }
}

/// Rasterize one projected triangle. Returns the number of pixels written.
///
/// Triangles with zero area or an empty on-screen bounding box are skipped.
pub fn rasterize_triangle(
    fb: &mut Framebuffer,
    tri: &ProjectedTriangle,
    texture: Option<&Texture>,
    depth_test: DepthTest,
    shade: ShadeParams,
) -> usize {
    let Some(setup) = Setup::new(tri, texture) else {
        return 0;
    };

    let p = &setup.p;
    let min_x = p[0].x.min(p[1].x).min(p[2].x).floor().max(0.0);
    let min_y = p[0].y.min(p[1].y).min(p[2].y).floor().max(0.0);
    let max_x = p[0].x.max(p[1].x).max(p[2].x).ceil().min(fb.width as f32);
    let max_y = p[0].y.max(p[1].y).max(p[2].y).ceil().min(fb.height as f32);
    if !(min_x < max_x && min_y < max_y) {
        return 0;
    }
    let (min_x, min_y, max_x, max_y) = (min_x as usize, min_y as usize, max_x as usize, max_y as usize);

    let flat = tri.color;
    let needs_depth = depth_test == DepthTest::On || tri.is_water;
    let mut written = 0;

    for by in (min_y..max_y).step_by(BLOCK_SIZE) {
        let by_end = (by + BLOCK_SIZE).min(max_y);
        for bx in (min_x..max_x).step_by(BLOCK_SIZE) {
            let bx_end = (bx + BLOCK_SIZE).min(max_x);

            if setup.block_outside(
                bx as f32 + 0.5,
                by as f32 + 0.5,
                bx_end as f32 - 0.5,
                by_end as f32 - 0.5,
            ) {
                continue;
            }

            for y in by..by_end {
                let py = y as f32 + 0.5;
                for x in bx..bx_end {
                    let px = x as f32 + 0.5;
                    let e = setup.edges(px, py);
                    if !(covers(e[0], setup.top_left[0])
                        && covers(e[1], setup.top_left[1])
                        && covers(e[2], setup.top_left[2]))
                    {
                        continue;
                    }

                    let b = [e[0] * setup.inv_area, e[1] * setup.inv_area, e[2] * setup.inv_area];
                    let idx = y * fb.width + x;
                    let mut lighting = tri.lighting;

                    if needs_depth {
                        let z = setup.depth_at(b, tri.depth);
                        if depth_test == DepthTest::On && !fb.depth_test_and_set(idx, z) {
                            continue;
                        }
                        if tri.is_water {
                            lighting *= water_shimmer(shade.frame_time, z, shade.water_period);
                        }
                    }

                    let color = match (setup.texture, &setup.uvs) {
                        (Some(tex), Some(uvs)) => {
                            let uv = setup.uv_at(uvs, b);
                            tex.sample(uv.x, uv.y).shade(lighting)
                        }
                        _ => flat.shade(lighting),
                    };
                    fb.write_index(idx, color);
                    written += 1;
                }
            }
        }
    }

    written
}

/// Sort back-to-front and rasterize a whole bucket
pub fn rasterize_pass<'t>(
    fb: &mut Framebuffer,
    tris: &mut [ProjectedTriangle],
    texture_for: impl Fn(&ProjectedTriangle) -> Option<&'t Texture>,
    depth_test: DepthTest,
    shade: ShadeParams,
) -> usize {
    tris.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    tris.iter()
        .map(|tri| rasterize_triangle(fb, tri, texture_for(tri), depth_test, shade))
        .sum()
}
