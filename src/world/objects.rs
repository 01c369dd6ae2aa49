//! Static boxes standing in for physics objects

use crate::rasterizer::{Color, Mat4, Triangle, TriangleSource, Vec3};

/// Face normals with two in-plane axes ordered so that `u x v = n`
const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)),
    (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),
    (Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
    (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
];

fn scale(v: Vec3, half: Vec3) -> Vec3 {
    Vec3::new(v.x * half.x, v.y * half.y, v.z * half.z)
}

/// Twelve outward-facing triangles of an axis-aligned box
pub fn box_triangles(center: Vec3, half: Vec3, color: Color) -> Vec<Triangle> {
    let mut out = Vec::with_capacity(12);
    for (n, u, v) in FACES {
        let c = center + scale(n, half);
        let u = scale(u, half);
        let v = scale(v, half);
        let p = [c - u - v, c + u - v, c + u + v, c - u + v];
        out.push(Triangle::new([p[0], p[1], p[2]], color).with_normal(n));
        out.push(Triangle::new([p[0], p[2], p[3]], color).with_normal(n));
    }
    out
}

/// Apply a model matrix to a set of triangles, normals included
pub fn transform_triangles(tris: &mut [Triangle], m: &Mat4) {
    for tri in tris {
        tri.vertices = tri.vertices.map(|v| m.transform_point(v));
        tri.normal = m.transform_vector(tri.normal).normalize();
    }
}

/// An axis-aligned box standing in for a physics body
#[derive(Debug, Clone)]
pub struct PhysicsBox {
    triangles: Vec<Triangle>,
}

impl PhysicsBox {
    pub fn new(center: Vec3, half_extents: Vec3, color: Color) -> Self {
        Self {
            triangles: box_triangles(center, half_extents, color),
        }
    }
}

impl TriangleSource for PhysicsBox {
    fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }
}
