//! Software rasterizer
//!
//! Features:
//! - Perspective view/projection with view-space depth as the sort key
//! - Behind-camera, far-cutoff and back-face culling, near-plane clipping
//! - Painter's algorithm for far geometry, Z-buffer for near geometry
//! - Perspective-correct texture mapping
//! - 8x8 block traversal with a top-left fill rule

mod camera;
mod cull;
mod framebuffer;
mod math;
mod raster;
mod render;
mod types;

pub use camera::*;
pub use cull::*;
pub use math::*;
pub use render::*;
pub use types::*;

/// Pixel block edge length for rasterization
pub const BLOCK_SIZE: usize = 8;

/// Default framebuffer dimensions
pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 240;

/// Projection planes
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 10000.0;

/// Triangles entirely beyond this view depth are dropped
pub const FAR_CUTOFF: f32 = 10000.0;
/// Average depth separating the depth-tested and painter's passes
pub const TRANSITION_DISTANCE: f32 = 250.0;
/// Lower clamp for per-triangle lighting
pub const MIN_LIGHT: f32 = 0.3;
