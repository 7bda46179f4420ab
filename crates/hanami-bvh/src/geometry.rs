//! Per-primitive tests used by the traversal kernels.

use glam::Vec3;
use hanami_types::constants::{DEGENERATE_AREA_THRESHOLD, TRI_INTERSECT_EPSILON};
use serde::{Deserialize, Serialize};

/// A query ray. `direction` need not be normalised; distances are in
/// units of its length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction,
            max_distance,
        }
    }
}

/// Nearest ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    /// Ray parameter of the hit.
    pub distance: f32,
    /// Unit normal facing the ray origin.
    pub normal: Vec3,
}

impl RayHit {
    /// Hit position along `ray`.
    pub fn point(&self, ray: &Ray) -> Vec3 {
        ray.origin + ray.direction * self.distance
    }
}

/// Nearest surface point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestPoint {
    pub point: Vec3,
    /// Unit outward normal of the triangle the point lies on.
    pub normal: Vec3,
    pub distance_sq: f32,
}

/// Slab test. Returns the entry distance if the ray passes through the box
/// in front of its origin.
///
/// Entry is clamped to zero. Touching a face counts as a hit, so flat
/// boxes around planar geometry are still entered.
#[inline]
pub fn ray_box(origin: Vec3, inv_dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let (nx, fx) = slab(origin.x, inv_dir.x, min.x, max.x);
    let (ny, fy) = slab(origin.y, inv_dir.y, min.y, max.y);
    let (nz, fz) = slab(origin.z, inv_dir.z, min.z, max.z);

    let entry = nx.max(ny).max(nz).max(0.0);
    let exit = fx.min(fy).min(fz);

    (entry <= exit).then_some(entry)
}

/// Near and far parameters of one slab. A ray parallel to the slab is
/// either inside it everywhere or nowhere.
#[inline]
fn slab(origin: f32, inv_dir: f32, lo: f32, hi: f32) -> (f32, f32) {
    if inv_dir.is_infinite() {
        return if origin >= lo && origin <= hi {
            (f32::NEG_INFINITY, f32::INFINITY)
        } else {
            (f32::INFINITY, f32::NEG_INFINITY)
        };
    }
    let t0 = (lo - origin) * inv_dir;
    let t1 = (hi - origin) * inv_dir;
    (t0.min(t1), t0.max(t1))
}

/// Squared distance from `p` to the box; zero inside.
#[inline]
pub fn distance_sq_to_box(p: Vec3, min: Vec3, max: Vec3) -> f32 {
    p.distance_squared(p.clamp(min, max))
}

/// Möller–Trumbore intersection.
///
/// Only front faces (counter-clockwise seen from the ray origin) are hit
/// unless `two_sided` is set. Returns the ray parameter and the
/// un-normalised triangle normal flipped to face the ray origin.
#[inline]
pub fn ray_triangle(
    origin: Vec3,
    dir: Vec3,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    two_sided: bool,
) -> Option<(f32, Vec3)> {
    let edge1 = b - a;
    let edge2 = c - a;
    let norm = edge1.cross(edge2);
    let det = -dir.dot(norm);
    if det == 0.0 || (!two_sided && det < 0.0) {
        return None;
    }

    let inv_det = 1.0 / det;
    let ao = origin - a;
    let dao = ao.cross(dir);
    let u = edge2.dot(dao) * inv_det;
    let v = -edge1.dot(dao) * inv_det;
    let t = ao.dot(norm) * inv_det;
    let w = 1.0 - u - v;

    let eps = TRI_INTERSECT_EPSILON;
    if u + eps >= 0.0 && v + eps >= 0.0 && t + eps >= 0.0 && w + eps >= 0.0 {
        Some((t, norm * det.signum()))
    } else {
        None
    }
}

/// Closest point on triangle `(v0, v1, v2)` to `p`.
///
/// Projects onto the plane, then clamps to the edge opposite the first
/// negative barycentric coordinate. Returns the point and the outward
/// (counter-clockwise) normal, unnormalised.
#[inline]
pub fn closest_point_on_triangle(p: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> (Vec3, Vec3) {
    let v10 = v1 - v0;
    let v21 = v2 - v1;
    let v02 = v0 - v2;
    let p0 = p - v0;
    let p1 = p - v1;
    let p2 = p - v2;
    let nor = v10.cross(v02);
    let q = nor.cross(p0);
    let d = 1.0 / nor.length_squared().max(DEGENERATE_AREA_THRESHOLD);

    let mut u = q.dot(v02) * d;
    let mut v = q.dot(v10) * d;
    let mut w = 1.0 - u - v;

    if u < 0.0 {
        w = edge_param(p2, v02);
        u = 0.0;
        v = 1.0 - w;
    } else if v < 0.0 {
        u = edge_param(p0, v10);
        v = 0.0;
        w = 1.0 - u;
    } else if w < 0.0 {
        v = edge_param(p1, v21);
        w = 0.0;
        u = 1.0 - v;
    }

    (u * v1 + v * v2 + w * v0, -nor)
}

#[inline]
fn edge_param(offset: Vec3, edge: Vec3) -> f32 {
    (offset.dot(edge) / edge.length_squared().max(DEGENERATE_AREA_THRESHOLD)).clamp(0.0, 1.0)
}
