//! Collider triangle mesh with SoA (Structure of Arrays) layout.
//!
//! The SoA layout stores each coordinate channel contiguously:
//! - `pos_x: [x0, x1, x2, ...]`
//! - `pos_y: [y0, y1, y2, ...]`
//! - `pos_z: [z0, z1, z2, ...]`
//!
//! Triangles are counter-clockwise when seen from the side their normal
//! points to; the spatial index derives its outward normals from that.

use glam::{Affine3A, Vec3};
use hanami_types::{HanamiError, HanamiResult};
use serde::{Deserialize, Serialize};

/// A contiguous run of triangles that forms one hierarchy root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleGroup {
    /// First triangle of the run.
    pub start: u32,
    /// Number of triangles in the run.
    pub count: u32,
}

/// A static triangle mesh stored in Structure-of-Arrays layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    // --- Vertex data (SoA) ---
    /// X coordinates of all vertices.
    pub pos_x: Vec<f32>,
    /// Y coordinates of all vertices.
    pub pos_y: Vec<f32>,
    /// Z coordinates of all vertices.
    pub pos_z: Vec<f32>,

    // --- Triangle data ---
    /// Triangle indices; each triangle is [v0, v1, v2].
    /// Stored flat: `[t0v0, t0v1, t0v2, t1v0, t1v1, t1v2, ...]`
    pub indices: Vec<u32>,

    /// Triangle groups. Empty means one group spanning every triangle.
    #[serde(default)]
    pub groups: Vec<TriangleGroup>,
}

impl TriangleMesh {
    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos_x.len()
    }

    /// Returns the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns true if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the position of vertex `i`.
    #[inline]
    pub fn position_vec3(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    /// Returns the three vertex indices of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        let base = t * 3;
        [self.indices[base], self.indices[base + 1], self.indices[base + 2]]
    }

    /// Returns the three corner positions of triangle `t`.
    #[inline]
    pub fn triangle_positions(&self, t: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangle(t);
        [
            self.position_vec3(a as usize),
            self.position_vec3(b as usize),
            self.position_vec3(c as usize),
        ]
    }

    /// Triangle groups, with the implicit single group made explicit.
    pub fn effective_groups(&self) -> Vec<TriangleGroup> {
        if self.groups.is_empty() {
            vec![TriangleGroup {
                start: 0,
                count: self.triangle_count() as u32,
            }]
        } else {
            self.groups.clone()
        }
    }

    /// Axis-aligned bounds of all vertices, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        (0..self.vertex_count())
            .map(|i| self.position_vec3(i))
            .fold(None, |acc, p| match acc {
                None => Some((p, p)),
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
            })
    }

    /// Creates an empty mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_capacity: usize, triangle_capacity: usize) -> Self {
        Self {
            pos_x: Vec::with_capacity(vertex_capacity),
            pos_y: Vec::with_capacity(vertex_capacity),
            pos_z: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(triangle_capacity * 3),
            groups: Vec::new(),
        }
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, p: Vec3) -> u32 {
        self.pos_x.push(p.x);
        self.pos_y.push(p.y);
        self.pos_z.push(p.z);
        (self.pos_x.len() - 1) as u32
    }

    /// Validates mesh integrity.
    ///
    /// Checks:
    /// - All SoA arrays have the same length
    /// - Index count is divisible by 3 and indices are within bounds
    /// - No degenerate triangles (repeated vertex indices)
    /// - Groups lie inside the triangle range
    pub fn validate(&self) -> HanamiResult<()> {
        let n = self.pos_x.len();

        if self.pos_y.len() != n || self.pos_z.len() != n {
            return Err(HanamiError::InvalidMesh(
                "Position arrays have inconsistent lengths".into(),
            ));
        }

        if self.indices.len() % 3 != 0 {
            return Err(HanamiError::InvalidMesh(
                "Index count is not divisible by 3".into(),
            ));
        }

        for (i, &idx) in self.indices.iter().enumerate() {
            if idx as usize >= n {
                return Err(HanamiError::InvalidMesh(format!(
                    "Index {} at position {} is out of range (vertex count: {})",
                    idx, i, n
                )));
            }
        }

        let tri_count = self.triangle_count();
        for t in 0..tri_count {
            let [a, b, c] = self.triangle(t);
            if a == b || b == c || a == c {
                return Err(HanamiError::InvalidMesh(format!(
                    "Triangle {} has repeated vertex indices: [{}, {}, {}]",
                    t, a, b, c
                )));
            }
        }

        for (g, group) in self.groups.iter().enumerate() {
            let end = group.start as usize + group.count as usize;
            if group.count == 0 || end > tri_count {
                return Err(HanamiError::InvalidMesh(format!(
                    "Group {} covers triangles {}..{} (triangle count: {})",
                    g, group.start, end, tri_count
                )));
            }
        }

        Ok(())
    }

    /// Constructs a mesh from interleaved AoS position data
    /// `[x0, y0, z0, x1, y1, z1, ...]`, as produced by most asset loaders.
    pub fn from_interleaved(positions: &[f32], indices: &[u32]) -> HanamiResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(HanamiError::InvalidMesh(
                "Interleaved positions length not divisible by 3".into(),
            ));
        }

        let n = positions.len() / 3;
        let mut mesh = Self::with_capacity(n, indices.len() / 3);

        for p in positions.chunks_exact(3) {
            mesh.pos_x.push(p[0]);
            mesh.pos_y.push(p[1]);
            mesh.pos_z.push(p[2]);
        }
        mesh.indices = indices.to_vec();

        mesh.validate()?;
        Ok(mesh)
    }

    /// Applies an affine transform to every vertex in place.
    ///
    /// A mirroring transform flips each triangle's winding back so that
    /// normals keep pointing outward.
    pub fn transform(&mut self, transform: &Affine3A) {
        for i in 0..self.vertex_count() {
            let p = transform.transform_point3(self.position_vec3(i));
            self.pos_x[i] = p.x;
            self.pos_y[i] = p.y;
            self.pos_z[i] = p.z;
        }

        if transform.matrix3.determinant() < 0.0 {
            for tri in self.indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
    }

    /// Appends `other`, shifting its indices. The groups of both meshes are
    /// kept, so merging two meshes yields a multi-group mesh.
    pub fn append(&mut self, other: &TriangleMesh) {
        let vertex_offset = self.vertex_count() as u32;
        let tri_offset = self.triangle_count() as u32;

        let mut groups = self.effective_groups();
        groups.extend(other.effective_groups().into_iter().map(|g| TriangleGroup {
            start: g.start + tri_offset,
            count: g.count,
        }));
        groups.retain(|g| g.count > 0);

        self.pos_x.extend_from_slice(&other.pos_x);
        self.pos_y.extend_from_slice(&other.pos_y);
        self.pos_z.extend_from_slice(&other.pos_z);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
        self.groups = groups;
    }
}
