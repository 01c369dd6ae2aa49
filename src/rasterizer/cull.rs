//! Triangle collection, culling and near/far classification
//!
//! Every candidate triangle goes through the same checks:
//! behind camera, beyond far cutoff, back-facing, near-plane clip,
//! projection. Survivors are lit, given an average depth and routed
//! to the near (depth-tested) or far (painter's) bucket.

use super::camera::Projection;
use super::math::{Mat4, Vec2, Vec3};
use super::types::{ProjectedTriangle, ScreenPoint, Triangle};

/// Anything that can hand the renderer a list of world-space triangles
pub trait TriangleSource {
    fn triangles(&self) -> &[Triangle];
}

/// An articulated character: model-space triangles plus a model matrix
pub trait CharacterSource {
    fn model_matrix(&self) -> Mat4;
    /// Triangles in model space
    fn local_triangles(&self) -> &[Triangle];
    fn position(&self) -> Vec3;
    /// Unit facing direction in world space
    fn facing(&self) -> Option<Vec3> {
        None
    }
    /// World-space triangle the character is standing on
    fn current_triangle(&self) -> Option<&Triangle> {
        None
    }
}

/// Parameters the collector needs besides the projection
#[derive(Debug, Clone, Copy)]
pub struct CullParams {
    pub far_cutoff: f32,
    pub transition_distance: f32,
    pub light_dir: Vec3,
    pub min_light: f32,
}

/// Why a triangle was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BehindCamera,
    BeyondFar,
    BackFacing,
    ClippedAway,
    InvalidProjection,
}

/// Per-frame culling counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    pub submitted: usize,
    pub behind_camera: usize,
    pub beyond_far: usize,
    pub back_facing: usize,
    /// Triangles that crossed the near plane and were clipped
    pub near_clipped: usize,
    pub clipped_away: usize,
    pub invalid_projection: usize,
}

impl CullStats {
    /// Triangles dropped for any reason
    pub fn rejected(&self) -> usize {
        self.behind_camera + self.beyond_far + self.back_facing + self.clipped_away + self.invalid_projection
    }

    fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::BehindCamera => self.behind_camera += 1,
            Rejection::BeyondFar => self.beyond_far += 1,
            Rejection::BackFacing => self.back_facing += 1,
            Rejection::ClippedAway => self.clipped_away += 1,
            Rejection::InvalidProjection => self.invalid_projection += 1,
        }
    }
}

/// Near and far triangle lists for one frame
#[derive(Debug, Default)]
pub struct Buckets {
    pub near: Vec<ProjectedTriangle>,
    pub far: Vec<ProjectedTriangle>,
}

/// Vertex carried through near-plane clipping
#[derive(Debug, Clone, Copy)]
struct ClipVert {
    pos: Vec3,
    uv: Vec2,
    depth: f32,
}

impl ClipVert {
    fn lerp(self, other: ClipVert, t: f32) -> ClipVert {
        ClipVert {
            pos: self.pos.lerp(other.pos, t),
            uv: self.uv.lerp(other.uv, t),
            depth: self.depth + (other.depth - self.depth) * t,
        }
    }
}

/// Builds the near/far buckets from any number of triangle sources
pub struct Collector<'a> {
    projection: &'a Projection,
    params: CullParams,
    buckets: Buckets,
    stats: CullStats,
}

impl<'a> Collector<'a> {
    pub fn new(projection: &'a Projection, params: CullParams) -> Self {
        Self {
            projection,
            params,
            buckets: Buckets::default(),
            stats: CullStats::default(),
        }
    }

    pub fn add_source(&mut self, source: &dyn TriangleSource) {
        for tri in source.triangles() {
            self.add(tri);
        }
    }

    /// Transform the character's triangles to world space, then collect them
    pub fn add_character(&mut self, character: &dyn CharacterSource) {
        let model = character.model_matrix();
        for local in character.local_triangles() {
            let world = Triangle {
                vertices: local.vertices.map(|v| model.transform_point(v)),
                normal: model.transform_vector(local.normal).normalize(),
                ..local.clone()
            };
            self.add(&world);
        }
    }

    pub fn add(&mut self, tri: &Triangle) {
        self.stats.submitted += 1;
        if let Err(rejection) = self.try_add(tri) {
            self.stats.record(rejection);
        }
    }

    pub fn finish(self) -> (Buckets, CullStats) {
        (self.buckets, self.stats)
    }

    fn try_add(&mut self, tri: &Triangle) -> Result<(), Rejection> {
        let depths = tri.vertices.map(|v| self.projection.view_depth(v));

        if depths.iter().all(|&d| d <= 0.0) {
            return Err(Rejection::BehindCamera);
        }
        if depths.iter().all(|&d| d > self.params.far_cutoff) {
            return Err(Rejection::BeyondFar);
        }
        if tri.normal.dot(tri.vertices[0] - self.projection.position) >= 0.0 {
            return Err(Rejection::BackFacing);
        }

        let lighting = self.lighting(tri);
        let uvs = tri.uvs.unwrap_or_default();
        let verts: [ClipVert; 3] = std::array::from_fn(|i| ClipVert {
            pos: tri.vertices[i],
            uv: uvs[i],
            depth: depths[i],
        });

        let near = self.projection.near();
        if depths.iter().all(|&d| d >= near) {
            let projected = self.project(&verts, tri, lighting)?;
            self.push(projected);
            return Ok(());
        }

        self.stats.near_clipped += 1;
        let poly = clip_near(&verts, near);
        if poly.len() < 3 {
            return Err(Rejection::ClippedAway);
        }

        // Project the whole fan first so a bad vertex drops the triangle as a unit
        let mut pieces = Vec::with_capacity(poly.len() - 2);
        for i in 1..poly.len() - 1 {
            pieces.push(self.project(&[poly[0], poly[i], poly[i + 1]], tri, lighting)?);
        }
        for piece in pieces {
            self.push(piece);
        }
        Ok(())
    }

    fn lighting(&self, tri: &Triangle) -> f32 {
        if tri.vertices[0].y == 0.0 {
            return 1.0;
        }
        tri.normal
            .dot(self.params.light_dir)
            .clamp(self.params.min_light, 1.0)
    }

    fn project(&self, verts: &[ClipVert; 3], tri: &Triangle, lighting: f32) -> Result<ProjectedTriangle, Rejection> {
        let mut points = [ScreenPoint::default(); 3];
        for (point, v) in points.iter_mut().zip(verts) {
            *point = self
                .projection
                .project(v.pos, Some(v.depth))
                .ok_or(Rejection::InvalidProjection)?;
        }
        let uvs = tri.uvs.map(|_| verts.map(|v| v.uv));
        Ok(ProjectedTriangle::new(points, tri, uvs, lighting))
    }

    fn push(&mut self, tri: ProjectedTriangle) {
        if tri.depth <= self.params.transition_distance {
            self.buckets.near.push(tri);
        } else {
            self.buckets.far.push(tri);
        }
    }
}

/// Clip a triangle against the plane `depth = near`, keeping the front side.
/// Returns 0, 3 or 4 vertices in the original winding order.
fn clip_near(verts: &[ClipVert; 3], near: f32) -> Vec<ClipVert> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = verts[i];
        let b = verts[(i + 1) % 3];
        let a_in = a.depth >= near;
        let b_in = b.depth >= near;

        if a_in {
            out.push(a);
        }
        if a_in != b_in {
            let t = (near - a.depth) / (b.depth - a.depth);
            let mut v = a.lerp(b, t);
            v.depth = near;
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::camera::Camera;
    use crate::rasterizer::types::Color;
    use approx::assert_abs_diff_eq;

    fn params() -> CullParams {
        CullParams {
            far_cutoff: 10000.0,
            transition_distance: 250.0,
            light_dir: Vec3::new(0.0, 1.0, 0.0),
            min_light: 0.3,
        }
    }

    fn projection() -> Projection {
        // Camera at origin, looking down -Z
        let camera = Camera::new(Vec3::new(0.0, 1.0, 0.0), 60f32.to_radians());
        Projection::new(&camera, 320, 240, 0.1, 10000.0).unwrap()
    }

    /// Unit triangle facing the camera at view depth `d`
    fn facing_tri(d: f32) -> Triangle {
        Triangle::new(
            [
                Vec3::new(-0.5, 0.5, -d),
                Vec3::new(0.5, 0.5, -d),
                Vec3::new(0.0, 1.5, -d),
            ],
            Color::WHITE,
        )
    }

    fn collect(tris: &[Triangle]) -> (Buckets, CullStats) {
        let p = projection();
        let mut c = Collector::new(&p, params());
        for t in tris {
            c.add(t);
        }
        c.finish()
    }

    #[test]
    fn test_facing_triangle_normal_points_at_camera() {
        assert_abs_diff_eq!(facing_tri(10.0).normal.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_behind_camera_excluded() {
        let (b, stats) = collect(&[facing_tri(-5.0)]);
        assert!(b.near.is_empty() && b.far.is_empty());
        assert_eq!(stats.behind_camera, 1);
    }

    #[test]
    fn test_beyond_far_cutoff_excluded() {
        let (b, stats) = collect(&[facing_tri(10001.0)]);
        assert!(b.near.is_empty() && b.far.is_empty());
        assert_eq!(stats.beyond_far, 1);
    }

    #[test]
    fn test_back_face_rule() {
        let front = facing_tri(20.0);
        let back = front.clone().with_normal(-front.normal);

        let (b, _) = collect(&[front]);
        assert_eq!(b.near.len(), 1);

        let (b, stats) = collect(&[back]);
        assert!(b.near.is_empty() && b.far.is_empty());
        assert_eq!(stats.back_facing, 1);
        assert_eq!(stats.rejected(), 1);
    }

    #[test]
    fn test_transition_distance_routes_buckets() {
        let (b, _) = collect(&[facing_tri(100.0), facing_tri(400.0)]);
        assert_eq!(b.near.len(), 1);
        assert_eq!(b.far.len(), 1);
        assert_abs_diff_eq!(b.near[0].depth, 100.0, epsilon = 1e-3);
        assert_abs_diff_eq!(b.far[0].depth, 400.0, epsilon = 1e-3);
    }

    #[test]
    fn test_ground_level_lighting_is_full() {
        let mut ground = Triangle::new(
            [
                Vec3::new(-1.0, 0.0, -5.0),
                Vec3::new(-1.0, 0.0, -6.0),
                Vec3::new(1.0, 0.0, -5.0),
            ],
            Color::WHITE,
        );
        // Tilted normal would otherwise be dimmed; still faces the camera
        ground.normal = Vec3::new(0.0, 0.2, 1.0).normalize();
        let (b, _) = collect(&[ground]);
        assert_eq!(b.near[0].lighting, 1.0);
    }

    #[test]
    fn test_lighting_is_clamped() {
        // Normal is perpendicular to the light, so dot = 0 -> floor 0.3
        let (b, _) = collect(&[facing_tri(10.0)]);
        assert_abs_diff_eq!(b.near[0].lighting, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_triangle_crossing_camera_plane_is_clipped_not_dropped() {
        let tri = Triangle::new(
            [
                Vec3::new(-5.0, 0.5, 5.0),
                Vec3::new(5.0, 0.5, 5.0),
                Vec3::new(0.0, 0.5, -20.0),
            ],
            Color::WHITE,
        )
        .with_normal(Vec3::new(0.0, 1.0, 0.0));
        let (b, stats) = collect(&[tri]);
        assert_eq!(stats.near_clipped, 1);
        assert_eq!(b.near.len(), 1);
        for p in &b.near[0].points {
            assert!(p.z >= 0.1 - 1e-4);
        }
    }

    #[test]
    fn test_clip_near_two_vertices_behind_gives_triangle() {
        let v = |z: f32| ClipVert { pos: Vec3::new(0.0, 0.0, -z), uv: Vec2::new(z, 0.0), depth: z };
        let out = clip_near(&[v(-1.0), v(-1.0), v(3.0)], 1.0);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|c| c.depth >= 1.0));
        // UV interpolated along the clipped edge
        assert_abs_diff_eq!(out[0].uv.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_clip_near_one_vertex_behind_gives_quad() {
        let v = |z: f32| ClipVert { pos: Vec3::new(0.0, 0.0, -z), uv: Vec2::default(), depth: z };
        let out = clip_near(&[v(-1.0), v(3.0), v(3.0)], 1.0);
        assert_eq!(out.len(), 4);
    }

    struct Stick {
        tris: Vec<Triangle>,
    }

    impl CharacterSource for Stick {
        fn model_matrix(&self) -> Mat4 {
            Mat4::translation(Vec3::new(0.0, 0.0, -30.0))
        }
        fn local_triangles(&self) -> &[Triangle] {
            &self.tris
        }
        fn position(&self) -> Vec3 {
            Vec3::new(0.0, 0.0, -30.0)
        }
    }

    #[test]
    fn test_character_triangles_use_model_matrix() {
        let stick = Stick { tris: vec![facing_tri(0.0)] };
        let p = projection();
        let mut c = Collector::new(&p, params());
        c.add_character(&stick);
        let (b, _) = c.finish();
        assert_eq!(b.near.len(), 1);
        assert_abs_diff_eq!(b.near[0].depth, 30.0, epsilon = 1e-3);
    }
}
