//! Procedural collider generators for tests and headless scenes.
//!
//! All generators produce deterministic meshes with counter-clockwise
//! winding as seen from outside.

use glam::Vec3;

use crate::mesh::TriangleMesh;

/// Generates a flat rectangular quad grid in the XZ plane facing +Y.
///
/// The grid spans `[-width/2, width/2]` in X and `[-depth/2, depth/2]` in Z,
/// at height `y`.
///
/// # Example
/// ```
/// use hanami_mesh::generators::quad_grid;
/// let mesh = quad_grid(2, 2, 1.0, 1.0, 0.0);
/// assert_eq!(mesh.vertex_count(), 9);  // 3×3 vertices
/// assert_eq!(mesh.triangle_count(), 8); // 2×2 quads × 2 tris each
/// ```
pub fn quad_grid(cols: usize, rows: usize, width: f32, depth: f32, y: f32) -> TriangleMesh {
    let verts_x = cols + 1;
    let verts_z = rows + 1;
    let mut mesh = TriangleMesh::with_capacity(verts_x * verts_z, cols * rows * 2);

    let half_w = width / 2.0;
    let half_d = depth / 2.0;

    for j in 0..verts_z {
        for i in 0..verts_x {
            let u = i as f32 / cols as f32;
            let v = j as f32 / rows as f32;
            mesh.push_vertex(Vec3::new(-half_w + u * width, y, -half_d + v * depth));
        }
    }

    for j in 0..rows {
        for i in 0..cols {
            let near_left = (j * verts_x + i) as u32;
            let near_right = near_left + 1;
            let far_left = near_left + verts_x as u32;
            let far_right = far_left + 1;

            mesh.indices
                .extend_from_slice(&[near_left, far_left, near_right]);
            mesh.indices
                .extend_from_slice(&[near_right, far_left, far_right]);
        }
    }

    mesh
}

/// Generates a UV sphere centered at `center`.
///
/// # Arguments
/// - `radius`: Sphere radius.
/// - `stacks`: Number of horizontal slices (latitude divisions).
/// - `slices`: Number of vertical slices (longitude divisions).
pub fn uv_sphere(center: Vec3, radius: f32, stacks: usize, slices: usize) -> TriangleMesh {
    let mut mesh = TriangleMesh::with_capacity((stacks + 1) * (slices + 1), stacks * slices * 2);

    for i in 0..=stacks {
        let phi = std::f32::consts::PI * i as f32 / stacks as f32; // 0 to PI
        let (sin_phi, cos_phi) = phi.sin_cos();

        for j in 0..=slices {
            let theta = 2.0 * std::f32::consts::PI * j as f32 / slices as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let dir = Vec3::new(sin_phi * cos_theta, cos_phi, sin_phi * sin_theta);
            mesh.push_vertex(center + dir * radius);
        }
    }

    for i in 0..stacks {
        for j in 0..slices {
            let a = (i * (slices + 1) + j) as u32;
            let b = a + (slices + 1) as u32;

            // Skip degenerate triangles at poles
            if i != 0 {
                mesh.indices.extend_from_slice(&[a, a + 1, b]);
            }
            if i != stacks - 1 {
                mesh.indices.extend_from_slice(&[a + 1, b + 1, b]);
            }
        }
    }

    mesh
}

/// One large upward-facing triangle at height `y`, containing the origin's
/// vertical line. Serves as a ground plane for the contact path.
pub fn ground_triangle(half_extent: f32, y: f32) -> TriangleMesh {
    let s = half_extent;
    let mut mesh = TriangleMesh::with_capacity(3, 1);
    mesh.push_vertex(Vec3::new(-s, y, s));
    mesh.push_vertex(Vec3::new(s, y, s));
    mesh.push_vertex(Vec3::new(0.0, y, -s));
    mesh.indices.extend_from_slice(&[0, 1, 2]);
    mesh
}
