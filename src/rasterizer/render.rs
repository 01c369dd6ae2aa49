//! Frame driver: clear, collect, far pass, near pass, present

use log::{debug, trace};
use thiserror::Error;

use super::camera::{Camera, Projection};
use super::cull::{CharacterSource, Collector, CullParams, CullStats, TriangleSource};
use super::framebuffer::Framebuffer;
use super::math::Vec3;
use super::raster::{rasterize_pass, DepthTest, ShadeParams};
use super::types::{Color, ProjectedTriangle};
use crate::config::RenderConfig;
use crate::textures::TextureRegistry;
use crate::world::{Weather, WeatherKind};

/// Length of the debug normal indicator, world units
const NORMAL_INDICATOR_LEN: f32 = 2.0;
/// Length of the debug facing indicator, world units
const FACING_INDICATOR_LEN: f32 = 3.0;
/// Largest framebuffer edge the presentation texture can hold
pub const MAX_DIMENSION: usize = u16::MAX as usize;

/// Error type for the renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: usize, height: usize },
    #[error("invalid config: {field} must be positive, got {value}")]
    InvalidConfig { field: &'static str, value: f32 },
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] image::ImageError),
}

/// Where the renderer is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    FarPass,
    NearPass,
    Presented,
}

/// Everything the renderer consumes for one frame
pub struct FrameInput<'a> {
    pub terrain: &'a dyn TriangleSource,
    pub physics_objects: &'a [&'a dyn TriangleSource],
    pub character: Option<&'a dyn CharacterSource>,
    /// Accepted for the effects layer; not used by rasterization
    pub weather: Option<&'a Weather>,
    pub show_debug_panel: bool,
    /// Simulation time in seconds
    pub frame_time: f32,
}

/// A 2D line segment in framebuffer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySegment {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub color: Color,
}

/// Vector overlay drawn on top of the presented buffer
#[derive(Debug, Clone, Default)]
pub struct DebugOverlay {
    pub segments: Vec<OverlaySegment>,
}

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub cull: CullStats,
    pub near: usize,
    pub far: usize,
    pub pixels_written: usize,
}

/// Result of a render call
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub stats: FrameStats,
    pub overlay: Option<DebugOverlay>,
}

/// Software renderer: owns the color and depth buffers
pub struct Renderer {
    config: RenderConfig,
    fb: Framebuffer,
    phase: FramePhase,
    weather: Option<(WeatherKind, f32)>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        let (width, height) = (config.width, config.height);
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(RenderError::InvalidViewport { width, height });
        }
        for (field, value) in [("near_plane", config.near_plane), ("water_period", config.water_period)] {
            // Also rejects NaN
            if !(value > 0.0) {
                return Err(RenderError::InvalidConfig { field, value });
            }
        }
        let fb = Framebuffer::new(config.width, config.height);
        Ok(Self {
            config,
            fb,
            phase: FramePhase::Idle,
            weather: None,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    #[cfg(test)]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Render one frame into the owned framebuffer
    pub fn render(
        &mut self,
        camera: &Camera,
        input: &FrameInput<'_>,
        textures: &TextureRegistry,
    ) -> Result<FrameReport, RenderError> {
        let cfg = &self.config;
        let projection = Projection::new(camera, cfg.width, cfg.height, cfg.near_plane, cfg.far_plane)?;

        self.note_weather(input.weather);
        self.fb.clear(self.config.sky_color);

        let mut collector = Collector::new(&projection, self.cull_params());
        collector.add_source(input.terrain);
        for object in input.physics_objects {
            collector.add_source(*object);
        }
        if let Some(character) = input.character {
            collector.add_character(character);
        }
        let (mut buckets, cull) = collector.finish();

        let shade = ShadeParams {
            frame_time: input.frame_time,
            water_period: self.config.water_period,
        };
        let texture_for = |tri: &ProjectedTriangle| tri.texture.and_then(|id| textures.get_by_id(id));

        self.phase = FramePhase::FarPass;
        let far_pixels = rasterize_pass(&mut self.fb, &mut buckets.far, texture_for, DepthTest::Off, shade);

        self.phase = FramePhase::NearPass;
        let near_pixels = rasterize_pass(&mut self.fb, &mut buckets.near, texture_for, DepthTest::On, shade);

        self.phase = FramePhase::Presented;

        let stats = FrameStats {
            cull,
            near: buckets.near.len(),
            far: buckets.far.len(),
            pixels_written: far_pixels + near_pixels,
        };
        trace!(
            "frame: {} submitted, {} near, {} far, {} px",
            stats.cull.submitted,
            stats.near,
            stats.far,
            stats.pixels_written
        );

        let overlay = input
            .show_debug_panel
            .then(|| build_overlay(&projection, input.character));

        Ok(FrameReport { stats, overlay })
    }

    /// Draw the last rendered frame into a screen rectangle.
    /// Does nothing until a frame has completed.
    pub fn present(&self, x: f32, y: f32, w: f32, h: f32) {
        if self.phase != FramePhase::Presented {
            return;
        }
        self.fb.present(x, y, w, h);
    }

    pub fn save_snapshot(&self, path: &std::path::Path) -> Result<(), RenderError> {
        self.fb.save_png(path)?;
        debug!("saved snapshot to {}", path.display());
        Ok(())
    }

    fn cull_params(&self) -> CullParams {
        CullParams {
            far_cutoff: self.config.far_cutoff,
            transition_distance: self.config.transition_distance,
            light_dir: self.config.light_dir.normalize(),
            min_light: self.config.min_light,
        }
    }

    fn note_weather(&mut self, weather: Option<&Weather>) {
        let current = weather.map(|w| (w.kind, w.intensity));
        if current != self.weather {
            match current {
                Some((kind, intensity)) => debug!("weather changed to {:?} at {:.2}", kind, intensity),
                None => debug!("weather cleared"),
            }
            self.weather = current;
        }
    }
}

/// Normal indicator for the character's current triangle and its facing line
fn build_overlay(projection: &Projection, character: Option<&dyn CharacterSource>) -> DebugOverlay {
    let mut overlay = DebugOverlay::default();
    let Some(character) = character else {
        return overlay;
    };

    let mut push = |from: Vec3, to: Vec3, color: Color| {
        if let (Some(a), Some(b)) = (projection.project(from, None), projection.project(to, None)) {
            overlay.segments.push(OverlaySegment {
                from: (a.x, a.y),
                to: (b.x, b.y),
                color,
            });
        }
    };

    if let Some(tri) = character.current_triangle() {
        let c = tri.centroid();
        push(c, c + tri.normal * NORMAL_INDICATOR_LEN, Color::YELLOW);
    }
    if let Some(facing) = character.facing() {
        let p = character.position();
        push(p, p + facing * FACING_INDICATOR_LEN, Color::RED);
    }

    overlay
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::math::{Mat4, Vec2};
    use crate::rasterizer::types::{Texture, Triangle};
    use approx::assert_abs_diff_eq;

    struct Tris(Vec<Triangle>);

    impl TriangleSource for Tris {
        fn triangles(&self) -> &[Triangle] {
            &self.0
        }
    }

    struct Walker {
        ground: Triangle,
    }

    impl CharacterSource for Walker {
        fn model_matrix(&self) -> Mat4 {
            Mat4::IDENTITY
        }
        fn local_triangles(&self) -> &[Triangle] {
            &[]
        }
        fn position(&self) -> Vec3 {
            Vec3::new(0.0, 0.0, -20.0)
        }
        fn facing(&self) -> Option<Vec3> {
            Some(Vec3::new(1.0, 0.0, 0.0))
        }
        fn current_triangle(&self) -> Option<&Triangle> {
            Some(&self.ground)
        }
    }

    fn config() -> RenderConfig {
        RenderConfig {
            width: 64,
            height: 64,
            ..RenderConfig::default()
        }
    }

    /// Big square at depth `d`, centered on the view axis, facing the camera
    fn wall(d: f32, color: Color) -> Vec<Triangle> {
        let s = d;
        let a = Vec3::new(-s, -s, -d);
        let b = Vec3::new(s, -s, -d);
        let c = Vec3::new(s, s, -d);
        let e = Vec3::new(-s, s, -d);
        vec![Triangle::new([a, b, c], color), Triangle::new([a, c, e], color)]
    }

    /// Lighting of a wall whose normal is +Z
    fn wall_lighting(cfg: &RenderConfig) -> f32 {
        Vec3::new(0.0, 0.0, 1.0)
            .dot(cfg.light_dir.normalize())
            .clamp(cfg.min_light, 1.0)
    }

    fn input<'a>(terrain: &'a Tris, objects: &'a [&'a dyn TriangleSource]) -> FrameInput<'a> {
        FrameInput {
            terrain,
            physics_objects: objects,
            character: None,
            weather: None,
            show_debug_panel: false,
            frame_time: 0.0,
        }
    }

    #[test]
    fn test_invalid_viewport_is_fatal() {
        let cfg = RenderConfig { width: 0, ..RenderConfig::default() };
        assert!(matches!(Renderer::new(cfg), Err(RenderError::InvalidViewport { .. })));
        let cfg = RenderConfig { height: MAX_DIMENSION + 1, ..RenderConfig::default() };
        assert!(matches!(Renderer::new(cfg), Err(RenderError::InvalidViewport { .. })));
    }

    #[test]
    fn test_non_positive_planes_and_periods_rejected() {
        let cfg = RenderConfig { near_plane: 0.0, ..RenderConfig::default() };
        assert!(matches!(
            Renderer::new(cfg),
            Err(RenderError::InvalidConfig { field: "near_plane", .. })
        ));
        let cfg = RenderConfig { water_period: -50.0, ..RenderConfig::default() };
        assert!(matches!(
            Renderer::new(cfg),
            Err(RenderError::InvalidConfig { field: "water_period", .. })
        ));
        let cfg = RenderConfig { water_period: f32::NAN, ..RenderConfig::default() };
        assert!(Renderer::new(cfg).is_err());
    }

    #[test]
    fn test_receding_textured_wall_is_perspective_correct() {
        // Red channel encodes u, so a row of pixels reads back the texel column
        let ramp: Vec<Color> = (0..=255u8).map(|r| Color::new(r, 0, 0)).collect();
        let mut textures = TextureRegistry::new();
        let id = textures.insert(Texture::from_pixels("ramp", 256, 1, ramp).unwrap()).unwrap();

        // Wall in the plane x = 3, facing -X, running from z = -2 to z = -80
        let a = Vec3::new(3.0, -10.0, -2.0);
        let b = Vec3::new(3.0, -10.0, -80.0);
        let c = Vec3::new(3.0, 10.0, -80.0);
        let d = Vec3::new(3.0, 10.0, -2.0);
        let (ua, ub) = (Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        let terrain = Tris(vec![
            Triangle::new([a, c, b], Color::WHITE).with_texture(id, [ua, ub, ub]),
            Triangle::new([a, d, c], Color::WHITE).with_texture(id, [ua, ua, ub]),
        ]);

        let cfg = RenderConfig {
            light_dir: Vec3::new(-1.0, 0.0, 0.0),
            ..config()
        };
        let mut r = Renderer::new(cfg).unwrap();
        let mut camera = Camera::new(Vec3::ZERO, 60f32.to_radians());
        camera.rotate(-0.05, -0.5);

        let report = r.render(&camera, &input(&terrain, &[]), &textures).unwrap();
        assert_eq!(report.stats.near, 2);

        let fb = r.framebuffer();
        let row = fb.height / 2;
        let texels: Vec<i32> = (0..fb.width)
            .filter_map(|x| {
                let i = (row * fb.width + x) * 4;
                (fb.pixels[i + 1] == 0).then_some(fb.pixels[i] as i32)
            })
            .collect();
        assert!(texels.len() > 20, "wall covers only {} pixels", texels.len());

        let steps: Vec<i32> = texels.windows(2).map(|w| w[0] - w[1]).collect();
        // Far end on the left moves through texels much faster than the near end
        assert!(steps.iter().all(|s| *s >= 0), "{:?}", texels);
        assert!(steps.iter().any(|s| *s != steps[0]));
        assert!(steps[0] > 4 * steps[steps.len() - 1].max(1), "{:?}", steps);
    }

    #[test]
    fn test_empty_scene_is_all_sky() {
        let mut r = Renderer::new(config()).unwrap();
        let camera = Camera::new(Vec3::ZERO, 60f32.to_radians());
        let terrain = Tris(Vec::new());
        let report = r.render(&camera, &input(&terrain, &[]), &TextureRegistry::new()).unwrap();
        assert_eq!(report.stats.pixels_written, 0);
        assert_eq!(r.phase(), FramePhase::Presented);
        let sky = r.config().sky_color.to_bytes();
        assert!(r.framebuffer().pixels.chunks(4).all(|p| p == sky));
    }

    #[test]
    fn test_near_triangles_resolved_by_depth() {
        let mut r = Renderer::new(config()).unwrap();
        let camera = Camera::new(Vec3::ZERO, 60f32.to_radians());
        let red = Color::new(200, 0, 0);
        let blue = Color::new(0, 0, 200);
        let terrain = Tris(wall(50.0, red));
        let object = Tris(wall(60.0, blue));
        let objects: [&dyn TriangleSource; 1] = [&object];

        let report = r.render(&camera, &input(&terrain, &objects), &TextureRegistry::new()).unwrap();
        assert_eq!(report.stats.near, 4);
        assert_eq!(report.stats.far, 0);

        let expected = red.shade(wall_lighting(r.config()));
        assert_eq!(r.framebuffer().get_pixel(32, 32), Some(expected));
        assert_abs_diff_eq!(r.framebuffer().depth_at(32, 32).unwrap(), 50.0, epsilon = 1e-2);
    }

    #[test]
    fn test_far_geometry_is_painted_under_near_geometry() {
        let mut r = Renderer::new(config()).unwrap();
        let camera = Camera::new(Vec3::ZERO, 60f32.to_radians());
        let near = Color::new(0, 200, 0);
        let far = Color::new(0, 0, 200);
        let terrain = Tris(wall(400.0, far));
        let object = Tris(wall(100.0, near));
        let objects: [&dyn TriangleSource; 1] = [&object];

        let report = r.render(&camera, &input(&terrain, &objects), &TextureRegistry::new()).unwrap();
        assert_eq!(report.stats.far, 2);
        assert_eq!(report.stats.near, 2);
        assert_eq!(r.framebuffer().get_pixel(32, 32), Some(near.shade(wall_lighting(r.config()))));
        // Far pass leaves no depth behind; near pass wrote its own depth
        assert_abs_diff_eq!(r.framebuffer().depth_at(32, 32).unwrap(), 100.0, epsilon = 1e-2);
    }

    #[test]
    fn test_debug_overlay_only_when_requested() {
        let mut r = Renderer::new(config()).unwrap();
        let camera = Camera::new(Vec3::new(0.0, 5.0, 0.0), 60f32.to_radians());
        let terrain = Tris(Vec::new());
        let walker = Walker {
            ground: Triangle::new(
                [
                    Vec3::new(-1.0, 0.0, -19.0),
                    Vec3::new(1.0, 0.0, -19.0),
                    Vec3::new(0.0, 0.0, -21.0),
                ],
                Color::WHITE,
            ),
        };
        let mut frame = input(&terrain, &[]);
        frame.character = Some(&walker);

        let report = r.render(&camera, &frame, &TextureRegistry::new()).unwrap();
        assert!(report.overlay.is_none());

        frame.show_debug_panel = true;
        let report = r.render(&camera, &frame, &TextureRegistry::new()).unwrap();
        let overlay = report.overlay.unwrap();
        assert_eq!(overlay.segments.len(), 2);
        // Facing +X goes to the right on screen
        let facing = overlay.segments[1];
        assert!(facing.to.0 > facing.from.0);
    }
}
