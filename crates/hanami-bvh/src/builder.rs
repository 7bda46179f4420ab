//! Host-side hierarchy construction.
//!
//! The `bvh` crate builds one SAH hierarchy per triangle group. The
//! hierarchy is then walked depth-first and re-emitted in the flat form
//! the query kernels expect: left child directly after its parent, right
//! child index stored on the parent, leaves pointing at a contiguous run
//! of leaf-ordered triangles.

use bvh::aabb::{Aabb, Bounded};
use bvh::bounding_hierarchy::BHShape;
use bvh::bvh::{Bvh, BvhNode};
use glam::Vec3;
use hanami_buffer::ComputeBackend;
use hanami_mesh::TriangleMesh;
use hanami_types::constants::DEFAULT_MAX_LEAF_TRIANGLES;
use hanami_types::{HanamiError, HanamiResult};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Spatial index build parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Subtrees holding at most this many triangles collapse into one leaf.
    pub max_leaf_triangles: usize,
    /// Backend used by the batch query kernels.
    pub backend: ComputeBackend,
    /// Let rays hit back faces too.
    pub two_sided: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_leaf_triangles: DEFAULT_MAX_LEAF_TRIANGLES,
            backend: ComputeBackend::default(),
            two_sided: false,
        }
    }
}

/// One flattened node, before it is written into the node buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlatNode {
    pub min: Vec3,
    pub max: Vec3,
    pub kind: FlatKind,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FlatKind {
    Leaf { offset: u32, count: u32 },
    Internal { right: u32, split_axis: u32 },
}

/// Depth-first node list plus the leaf order of the source triangles.
#[derive(Debug)]
pub(crate) struct FlatHierarchy {
    pub nodes: Vec<FlatNode>,
    /// Source triangle index for every slot of the triangle buffer.
    pub triangle_order: Vec<usize>,
    /// Number of nodes on the longest root-to-leaf path.
    pub max_depth: usize,
}

struct TriangleShape {
    aabb: Aabb<f32, 3>,
    triangle: usize,
    node_index: usize,
}

impl Bounded<f32, 3> for TriangleShape {
    fn aabb(&self) -> Aabb<f32, 3> {
        self.aabb
    }
}

impl BHShape<f32, 3> for TriangleShape {
    fn set_bh_node_index(&mut self, index: usize) {
        self.node_index = index;
    }

    fn bh_node_index(&self) -> usize {
        self.node_index
    }
}

fn point(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

/// Builds and flattens the hierarchy for `mesh`.
///
/// Fails on an invalid or empty mesh, and when the mesh yields more than
/// one root.
pub(crate) fn build_hierarchy(
    mesh: &TriangleMesh,
    options: &BuildOptions,
) -> HanamiResult<FlatHierarchy> {
    mesh.validate()?;
    if mesh.is_empty() {
        return Err(HanamiError::InvalidMesh(
            "cannot build a spatial index over an empty mesh".into(),
        ));
    }

    let mut roots: Vec<(Bvh<f32, 3>, Vec<TriangleShape>)> = mesh
        .effective_groups()
        .into_iter()
        .map(|group| {
            let mut shapes: Vec<TriangleShape> = (group.start..group.start + group.count)
                .map(|t| {
                    let t = t as usize;
                    let [a, b, c] = mesh.triangle_positions(t);
                    TriangleShape {
                        aabb: Aabb::with_bounds(point(a.min(b).min(c)), point(a.max(b).max(c))),
                        triangle: t,
                        node_index: 0,
                    }
                })
                .collect();
            let hierarchy = Bvh::build(&mut shapes);
            (hierarchy, shapes)
        })
        .collect();

    if roots.len() != 1 {
        return Err(HanamiError::MultiRootHierarchy { roots: roots.len() });
    }
    let Some((hierarchy, shapes)) = roots.pop() else {
        return Err(HanamiError::MultiRootHierarchy { roots: 0 });
    };

    let mut flattener = Flattener {
        mesh,
        source: &hierarchy.nodes,
        shapes: &shapes,
        max_leaf: options.max_leaf_triangles.max(1),
        out: FlatHierarchy {
            nodes: Vec::with_capacity(hierarchy.nodes.len()),
            triangle_order: Vec::with_capacity(shapes.len()),
            max_depth: 0,
        },
    };
    flattener.emit(0, 1);
    Ok(flattener.out)
}

struct Flattener<'a> {
    mesh: &'a TriangleMesh,
    source: &'a [BvhNode<f32, 3>],
    shapes: &'a [TriangleShape],
    max_leaf: usize,
    out: FlatHierarchy,
}

impl Flattener<'_> {
    /// Emits the subtree rooted at source node `node` and returns its bounds.
    fn emit(&mut self, node: usize, depth: usize) -> (Vec3, Vec3) {
        let flat_index = self.out.nodes.len();
        let children = match self.source[node] {
            BvhNode::Node {
                child_l_index,
                child_r_index,
                ..
            } if self.subtree_len(node) > self.max_leaf => Some((child_l_index, child_r_index)),
            _ => None,
        };

        let Some((left, right)) = children else {
            return self.emit_leaf(node, depth);
        };

        // Reserve the slot so the left child lands at flat_index + 1
        self.out.nodes.push(FlatNode {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
            kind: FlatKind::Internal {
                right: 0,
                split_axis: 0,
            },
        });

        let (lmin, lmax) = self.emit(left, depth + 1);
        let right_index = self.out.nodes.len() as u32;
        let (rmin, rmax) = self.emit(right, depth + 1);

        let separation = ((lmin + lmax) - (rmin + rmax)).abs();
        let split_axis = if separation.x >= separation.y && separation.x >= separation.z {
            0
        } else if separation.y >= separation.z {
            1
        } else {
            2
        };

        let (min, max) = (lmin.min(rmin), lmax.max(rmax));
        self.out.nodes[flat_index] = FlatNode {
            min,
            max,
            kind: FlatKind::Internal {
                right: right_index,
                split_axis,
            },
        };
        (min, max)
    }

    fn emit_leaf(&mut self, node: usize, depth: usize) -> (Vec3, Vec3) {
        let offset = self.out.triangle_order.len();
        let mut shapes = Vec::new();
        self.collect_shapes(node, &mut shapes);

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for shape in shapes {
            let triangle = self.shapes[shape].triangle;
            for p in self.mesh.triangle_positions(triangle) {
                min = min.min(p);
                max = max.max(p);
            }
            self.out.triangle_order.push(triangle);
        }

        let count = self.out.triangle_order.len() - offset;
        self.out.nodes.push(FlatNode {
            min,
            max,
            kind: FlatKind::Leaf {
                offset: offset as u32,
                count: count as u32,
            },
        });
        self.out.max_depth = self.out.max_depth.max(depth);
        (min, max)
    }

    fn collect_shapes(&self, node: usize, out: &mut Vec<usize>) {
        match self.source[node] {
            BvhNode::Leaf { shape_index, .. } => out.push(shape_index),
            BvhNode::Node {
                child_l_index,
                child_r_index,
                ..
            } => {
                self.collect_shapes(child_l_index, out);
                self.collect_shapes(child_r_index, out);
            }
        }
    }

    fn subtree_len(&self, node: usize) -> usize {
        match self.source[node] {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Node {
                child_l_index,
                child_r_index,
                ..
            } => self.subtree_len(child_l_index) + self.subtree_len(child_r_index),
        }
    }
}
