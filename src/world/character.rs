//! A blocky walking character
//!
//! Built in model space (feet at the origin, facing +Z) and placed in the
//! world by its model matrix. The arms swing while walking.

use crate::rasterizer::{CharacterSource, Color, Mat4, Triangle, Vec3};
use super::objects::{box_triangles, transform_triangles};
use super::terrain::Terrain;

const TORSO_COLOR: &str = "#3a5ba0";
const HEAD_COLOR: &str = "#e0b08a";
const ARM_COLOR: &str = "#2e4a84";

/// Shoulder height in model space
const SHOULDER_Y: f32 = 1.55;
const ARM_OFFSET_X: f32 = 0.55;
/// Peak arm swing, radians
const SWING_AMPLITUDE: f32 = 0.6;
/// Swing cycles per world unit walked
const STRIDE_RATE: f32 = 1.2;

#[derive(Debug, Clone)]
pub struct Character {
    pub position: Vec3,
    /// Rotation about +Y; 0 faces +Z
    pub yaw: f32,
    walk_phase: f32,
    body: Vec<Triangle>,
    parts: Vec<Triangle>,
    ground: Option<Triangle>,
    colors: [Color; 3],
}

impl Character {
    pub fn new(position: Vec3) -> Self {
        let parse = |hex: &str| Color::from_hex(hex).unwrap_or(Color::WHITE);
        let colors = [parse(TORSO_COLOR), parse(HEAD_COLOR), parse(ARM_COLOR)];

        let mut body = box_triangles(Vec3::new(0.0, 1.1, 0.0), Vec3::new(0.4, 0.55, 0.25), colors[0]);
        body.extend(box_triangles(Vec3::new(0.0, 1.95, 0.0), Vec3::new(0.25, 0.25, 0.25), colors[1]));

        let mut character = Self {
            position,
            yaw: 0.0,
            walk_phase: 0.0,
            body,
            parts: Vec::new(),
            ground: None,
            colors,
        };
        character.rebuild();
        character
    }

    /// Current arm swing angle
    pub fn swing(&self) -> f32 {
        self.walk_phase.sin() * SWING_AMPLITUDE
    }

    /// Walk along the facing direction and turn
    pub fn walk(&mut self, distance: f32, turn: f32) {
        self.yaw += turn;
        if let Some(facing) = self.facing() {
            self.position = self.position + facing * distance;
        }
        self.walk_phase += distance * STRIDE_RATE * std::f32::consts::TAU;
        self.rebuild();
    }

    /// Snap to the terrain surface and remember the triangle underfoot
    pub fn update_ground(&mut self, terrain: &Terrain) {
        self.ground = terrain.ground_at(self.position.x, self.position.z).map(|(tri, height)| {
            self.position.y = height;
            tri.clone()
        });
    }

    fn rebuild(&mut self) {
        let swing = self.swing();
        let mut parts = self.body.clone();
        for (side, angle) in [(-1.0, swing), (1.0, -swing)] {
            let shoulder = Vec3::new(side * ARM_OFFSET_X, SHOULDER_Y, 0.0);
            let mut arm = box_triangles(
                shoulder - Vec3::new(0.0, 0.45, 0.0),
                Vec3::new(0.12, 0.45, 0.12),
                self.colors[2],
            );
            let pivot = Mat4::translation(shoulder) * Mat4::rotation_x(angle) * Mat4::translation(-shoulder);
            transform_triangles(&mut arm, &pivot);
            parts.extend(arm);
        }
        self.parts = parts;
    }
}

impl CharacterSource for Character {
    fn model_matrix(&self) -> Mat4 {
        Mat4::translation(self.position) * Mat4::rotation_y(self.yaw)
    }

    fn local_triangles(&self) -> &[Triangle] {
        &self.parts
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn facing(&self) -> Option<Vec3> {
        Some(Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos()))
    }

    fn current_triangle(&self) -> Option<&Triangle> {
        self.ground.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::TriangleSource;
    use crate::textures::TextureRegistry;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_facing_matches_model_matrix() {
        let mut c = Character::new(Vec3::ZERO);
        c.walk(0.0, 1.0);
        let from_matrix = c.model_matrix().transform_vector(Vec3::new(0.0, 0.0, 1.0));
        let facing = c.facing().unwrap();
        assert_abs_diff_eq!(from_matrix.x, facing.x, epsilon = 1e-5);
        assert_abs_diff_eq!(from_matrix.z, facing.z, epsilon = 1e-5);
    }

    #[test]
    fn test_walk_moves_along_facing() {
        let mut c = Character::new(Vec3::ZERO);
        c.walk(2.0, 0.0);
        assert_abs_diff_eq!(c.position.z, 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(c.position.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_arms_swing_while_walking() {
        let mut c = Character::new(Vec3::ZERO);
        assert_eq!(c.local_triangles().len(), 48);
        let before = c.local_triangles()[36].vertices;
        c.walk(0.2, 0.0);
        assert_ne!(c.swing(), 0.0);
        assert_ne!(c.local_triangles()[36].vertices, before);
    }

    #[test]
    fn test_ground_snaps_to_terrain() {
        let terrain = Terrain::from_heights(3, 4.0, vec![6.0; 9], &TextureRegistry::new()).unwrap();
        let mut c = Character::new(Vec3::new(3.0, 0.0, 5.0));
        c.update_ground(&terrain);
        assert_abs_diff_eq!(c.position.y, 6.0, epsilon = 1e-2);
        let tri = c.current_triangle().unwrap();
        assert!(terrain.triangles().iter().any(|t| t.vertices == tri.vertices));

        let mut lost = Character::new(Vec3::new(-5.0, 0.0, 0.0));
        lost.update_ground(&terrain);
        assert!(lost.current_triangle().is_none());
    }
}
