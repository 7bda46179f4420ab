//! The flattened spatial index and its query kernels.

use glam::Vec3;
use hanami_buffer::{ComputeBackend, Field, StructuredArray};
use hanami_mesh::TriangleMesh;
use hanami_types::HanamiResult;

use crate::builder::{build_hierarchy, BuildOptions, FlatKind};
use crate::geometry::{
    closest_point_on_triangle, distance_sq_to_box, ray_box, ray_triangle, ClosestPoint, Ray,
    RayHit,
};

const NODE_DECL: &[(&str, &str)] = &[
    ("boundsMin", "vec3"),
    ("boundsMax", "vec3"),
    ("isLeaf", "uint"),
    ("count", "uint"),
    ("offset", "uint"),
    ("rightIndex", "uint"),
    ("splitAxis", "uint"),
];

const TRIANGLE_DECL: &[(&str, &str)] = &[("a", "vec3"), ("b", "vec3"), ("c", "vec3")];

#[derive(Debug, Clone, Copy)]
struct NodeFields {
    bounds_min: Field<Vec3>,
    bounds_max: Field<Vec3>,
    is_leaf: Field<u32>,
    count: Field<u32>,
    offset: Field<u32>,
    right_index: Field<u32>,
    split_axis: Field<u32>,
}

#[derive(Debug, Clone, Copy)]
struct TriangleFields {
    a: Field<Vec3>,
    b: Field<Vec3>,
    c: Field<Vec3>,
}

/// Decoded view of one node record.
struct NodeView {
    min: Vec3,
    max: Vec3,
    leaf: bool,
    offset: usize,
    count: usize,
    right: usize,
    split_axis: usize,
}

/// Immutable bounding-volume hierarchy over a static triangle mesh.
///
/// Node 0 is the root; an internal node's left child is the next node.
/// Safe to query from any number of threads at once.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: StructuredArray,
    triangles: StructuredArray,
    node: NodeFields,
    tri: TriangleFields,
    max_depth: usize,
    backend: ComputeBackend,
    two_sided: bool,
}

impl SpatialIndex {
    /// Builds the index with default options.
    pub fn build(mesh: &TriangleMesh) -> HanamiResult<Self> {
        Self::build_with(mesh, &BuildOptions::default())
    }

    /// Builds the hierarchy and its flattened node and triangle buffers.
    pub fn build_with(mesh: &TriangleMesh, options: &BuildOptions) -> HanamiResult<Self> {
        let flat = build_hierarchy(mesh, options)?;

        let mut nodes = StructuredArray::from_declaration(NODE_DECL, flat.nodes.len(), "bvhBuffer")?;
        let node = NodeFields {
            bounds_min: nodes.field("boundsMin")?,
            bounds_max: nodes.field("boundsMax")?,
            is_leaf: nodes.field("isLeaf")?,
            count: nodes.field("count")?,
            offset: nodes.field("offset")?,
            right_index: nodes.field("rightIndex")?,
            split_axis: nodes.field("splitAxis")?,
        };

        for (i, n) in flat.nodes.iter().enumerate() {
            nodes.set(i, node.bounds_min, n.min);
            nodes.set(i, node.bounds_max, n.max);
            match n.kind {
                FlatKind::Leaf { offset, count } => {
                    nodes.set(i, node.is_leaf, 1);
                    nodes.set(i, node.offset, offset);
                    nodes.set(i, node.count, count);
                }
                FlatKind::Internal { right, split_axis } => {
                    nodes.set(i, node.is_leaf, 0);
                    nodes.set(i, node.right_index, right);
                    nodes.set(i, node.split_axis, split_axis);
                }
            }
        }

        let mut triangles = StructuredArray::from_declaration(
            TRIANGLE_DECL,
            flat.triangle_order.len(),
            "triangleBuffer",
        )?;
        let tri = TriangleFields {
            a: triangles.field("a")?,
            b: triangles.field("b")?,
            c: triangles.field("c")?,
        };
        for (slot, &source) in flat.triangle_order.iter().enumerate() {
            let [a, b, c] = mesh.triangle_positions(source);
            triangles.set(slot, tri.a, a);
            triangles.set(slot, tri.b, b);
            triangles.set(slot, tri.c, c);
        }

        tracing::info!(
            triangles = triangles.len(),
            nodes = nodes.len(),
            max_depth = flat.max_depth,
            "Built spatial index"
        );

        Ok(Self {
            nodes,
            triangles,
            node,
            tri,
            max_depth: flat.max_depth,
            backend: options.backend,
            two_sided: options.two_sided,
        })
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Traversal stack capacity; each internal node pushes both children.
    pub fn stack_capacity(&self) -> usize {
        2 * self.max_depth
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Flattened node records.
    pub fn node_buffer(&self) -> &StructuredArray {
        &self.nodes
    }

    /// Leaf-ordered triangle records.
    pub fn triangle_buffer(&self) -> &StructuredArray {
        &self.triangles
    }

    /// Bounds of the whole mesh.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        (
            self.nodes.get(0, self.node.bounds_min),
            self.nodes.get(0, self.node.bounds_max),
        )
    }

    #[inline]
    fn node_view(&self, index: usize) -> NodeView {
        let e = self.nodes.element(index);
        NodeView {
            min: e.get(self.node.bounds_min),
            max: e.get(self.node.bounds_max),
            leaf: e.get(self.node.is_leaf) == 1,
            offset: e.get(self.node.offset) as usize,
            count: e.get(self.node.count) as usize,
            right: e.get(self.node.right_index) as usize,
            split_axis: e.get(self.node.split_axis) as usize,
        }
    }

    #[inline]
    fn triangle(&self, index: usize) -> [Vec3; 3] {
        let e = self.triangles.element(index);
        [e.get(self.tri.a), e.get(self.tri.b), e.get(self.tri.c)]
    }

    /// Nearest hit along the ray no farther than `max_distance`.
    pub fn intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let inv_dir = Vec3::ONE / direction;
        let mut stack: Vec<u32> = Vec::with_capacity(self.stack_capacity());
        stack.push(0);

        let mut best = max_distance;
        let mut hit_normal: Option<Vec3> = None;

        while let Some(current) = stack.pop() {
            let current = current as usize;
            let node = self.node_view(current);
            match ray_box(origin, inv_dir, node.min, node.max) {
                Some(entry) if entry <= best => {}
                _ => continue,
            }

            if node.leaf {
                for t in node.offset..node.offset + node.count {
                    let [a, b, c] = self.triangle(t);
                    let hit = ray_triangle(origin, direction, a, b, c, self.two_sided);
                    if let Some((distance, normal)) = hit {
                        if distance <= best {
                            best = distance;
                            hit_normal = Some(normal);
                        }
                    }
                }
            } else {
                let left = (current + 1) as u32;
                let right = node.right as u32;
                let (near, far) = if direction[node.split_axis] >= 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };
                stack.push(far);
                stack.push(near);
            }
        }

        hit_normal.map(|normal| RayHit {
            distance: best,
            normal: normal.normalize_or_zero(),
        })
    }

    /// Nearest surface point within `sqrt(max_distance_sq)` of `point`.
    ///
    /// `None` when no triangle lies within the radius.
    pub fn find_closest_point(&self, point: Vec3, max_distance_sq: f32) -> Option<ClosestPoint> {
        let mut stack: Vec<u32> = Vec::with_capacity(self.stack_capacity());
        stack.push(0);

        let mut best = max_distance_sq;
        let mut found: Option<(Vec3, Vec3)> = None;

        while let Some(current) = stack.pop() {
            let current = current as usize;
            let node = self.node_view(current);
            if distance_sq_to_box(point, node.min, node.max) > best {
                continue;
            }

            if node.leaf {
                let mut leaf_best: Option<(f32, Vec3, Vec3)> = None;
                for t in node.offset..node.offset + node.count {
                    let [a, b, c] = self.triangle(t);
                    let (closest, normal) = closest_point_on_triangle(point, a, b, c);
                    let d = point.distance_squared(closest);
                    if leaf_best.map_or(true, |(best_d, _, _)| d < best_d) {
                        leaf_best = Some((d, closest, normal));
                    }
                }
                if let Some((d, closest, normal)) = leaf_best {
                    if d <= best {
                        best = d;
                        found = Some((closest, normal));
                    }
                }
            } else {
                let left = current + 1;
                let left_node = self.node_view(left);
                let right_node = self.node_view(node.right);
                let left_d = distance_sq_to_box(point, left_node.min, left_node.max);
                let right_d = distance_sq_to_box(point, right_node.min, right_node.max);
                let (first, second) = if left_d < right_d {
                    (left, node.right)
                } else {
                    (node.right, left)
                };
                stack.push(second as u32);
                stack.push(first as u32);
            }
        }

        found.map(|(closest, normal)| ClosestPoint {
            point: closest,
            normal: normal.normalize_or_zero(),
            distance_sq: best,
        })
    }

    /// Ray query kernel: one lane per ray.
    pub fn intersect_many(&self, rays: &[Ray]) -> Vec<Option<RayHit>> {
        self.backend
            .map(rays, |ray| self.intersect(ray.origin, ray.direction, ray.max_distance))
    }

    /// Closest-point query kernel: one lane per point.
    pub fn closest_points(&self, points: &[Vec3], max_distance_sq: f32) -> Vec<Option<ClosestPoint>> {
        self.backend
            .map(points, |&p| self.find_closest_point(p, max_distance_sq))
    }
}
