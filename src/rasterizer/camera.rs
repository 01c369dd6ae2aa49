//! Camera state and per-frame projection

use super::math::{Mat4, Vec3};
use super::types::ScreenPoint;
use super::RenderError;

/// Camera state, mutated by the application between frames
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,

    pub pitch: f32,
    pub yaw: f32,
}

impl Camera {
    pub fn new(position: Vec3, fov: f32) -> Self {
        let mut cam = Self {
            position,
            forward: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::UP,
            fov,
            pitch: 0.0,
            yaw: 0.0,
        };
        cam.update_basis();
        cam
    }

    /// Recompute forward from yaw/pitch. Yaw 0 looks down -Z.
    pub fn update_basis(&mut self) {
        self.forward = Vec3 {
            x: -self.pitch.cos() * self.yaw.sin(),
            y: self.pitch.sin(),
            z: -self.pitch.cos() * self.yaw.cos(),
        };
    }

    pub fn rotate(&mut self, d_pitch: f32, d_yaw: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
        self.update_basis();
    }

    /// Move relative to the current view direction
    pub fn move_local(&mut self, forward: f32, right: f32, up: f32) {
        let side = self.forward.cross(self.up).normalize();
        self.position = self.position + self.forward * forward + side * right + self.up * up;
    }
}

/// View and projection matrices for one frame plus the viewport mapping
#[derive(Debug, Clone)]
pub struct Projection {
    view_proj: Mat4,
    pub position: Vec3,
    pub forward: Vec3,
    pub width: f32,
    pub height: f32,
    near: f32,
}

impl Projection {
    pub fn new(camera: &Camera, width: usize, height: usize, near: f32, far: f32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        let forward = camera.forward.normalize();
        let view = Mat4::look_at(camera.position, camera.position + forward, camera.up);
        let proj = Mat4::perspective(camera.fov, width as f32 / height as f32, near, far);

        Ok(Self {
            view_proj: proj * view,
            position: camera.position,
            forward,
            width: width as f32,
            height: height as f32,
            near,
        })
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn view_depth(&self, point: Vec3) -> f32 {
        (point - self.position).dot(self.forward)
    }

    /// Project a world point to pixel coordinates.
    ///
    /// `z` of the result is the view-space depth, taken from `cached_depth`
    /// when the caller already has it. Points in front of the near plane
    /// (closer than `near`) have no valid projection.
    pub fn project(&self, point: Vec3, cached_depth: Option<f32>) -> Option<ScreenPoint> {
        let depth = cached_depth.unwrap_or_else(|| self.view_depth(point));
        if !(depth >= self.near - 1e-4) {
            return None;
        }

        let [cx, cy, _, cw] = self.view_proj.transform([point.x, point.y, point.z, 1.0]);
        let w = cw.max(0.1);
        let (nx, ny) = (cx / w, cy / w);

        Some(ScreenPoint {
            x: (nx + 1.0) * 0.5 * self.width,
            y: (1.0 - ny) * 0.5 * self.height,
            z: depth,
        })
    }
}
