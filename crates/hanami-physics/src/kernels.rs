//! Solver kernels.
//!
//! Every kernel is launched through the solver's [`ComputeBackend`] with
//! one lane per output element. A lane writes only its own record; every
//! other buffer it touches was written by an earlier launch. Spring forces
//! are therefore staged in a scratch buffer and gathered per vertex.

use std::ops::Range;

use glam::{Affine3A, Vec3};
use hanami_buffer::{ComputeBackend, Field, StructuredArray};
use hanami_bvh::SpatialIndex;
use hanami_types::constants::SPRING_LENGTH_EPSILON;
use hanami_types::HanamiResult;

use crate::forces::ExternalForce;
use crate::influence::InfluencerTable;
use crate::topology::ObjectRecord;

pub(crate) const VERTEX_DECL: &[(&str, &str)] = &[
    ("position", "vec3"),
    ("isFixed", "uint"),
    ("initialPosition", "vec3"),
    ("springPtr", "uint"),
    ("force", "vec3"),
    ("springCount", "uint"),
    ("smoothedPosition", "vec3"),
];

pub(crate) const SPRING_DECL: &[(&str, &str)] = &[
    ("restLength", "float"),
    ("vertex0", "uint"),
    ("vertex1", "uint"),
    ("stiffness", "float"),
];

#[derive(Debug, Clone, Copy)]
pub(crate) struct VertexFields {
    pub position: Field<Vec3>,
    pub is_fixed: Field<u32>,
    pub initial_position: Field<Vec3>,
    pub spring_ptr: Field<u32>,
    pub force: Field<Vec3>,
    pub spring_count: Field<u32>,
    pub smoothed_position: Field<Vec3>,
}

impl VertexFields {
    pub fn resolve(array: &StructuredArray) -> HanamiResult<Self> {
        Ok(Self {
            position: array.field("position")?,
            is_fixed: array.field("isFixed")?,
            initial_position: array.field("initialPosition")?,
            spring_ptr: array.field("springPtr")?,
            force: array.field("force")?,
            spring_count: array.field("springCount")?,
            smoothed_position: array.field("smoothedPosition")?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SpringFields {
    pub rest_length: Field<f32>,
    pub vertex0: Field<u32>,
    pub vertex1: Field<u32>,
    pub stiffness: Field<f32>,
}

impl SpringFields {
    pub fn resolve(array: &StructuredArray) -> HanamiResult<Self> {
        Ok(Self {
            rest_length: array.field("restLength")?,
            vertex0: array.field("vertex0")?,
            vertex1: array.field("vertex1")?,
            stiffness: array.field("stiffness")?,
        })
    }
}

/// Per-sub-step constants of the vertex kernel.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VertexParams {
    pub damping: f32,
    pub friction: f32,
    pub ground_height: f32,
    pub search_margin: f32,
    pub time: f32,
}

/// Half of the spring's pull on its first endpoint.
///
/// The second endpoint receives the negation through its influencer sign.
#[inline]
pub(crate) fn spring_force(p0: Vec3, p1: Vec3, rest_length: f32, stiffness: f32) -> Vec3 {
    let delta = p1 - p0;
    let dist = delta.length().max(SPRING_LENGTH_EPSILON);
    delta * ((dist - rest_length) * stiffness * 0.5 / dist)
}

/// One lane per spring, writing `out[s]`.
pub(crate) fn launch_spring_kernel(
    backend: &ComputeBackend,
    springs: &StructuredArray,
    sf: SpringFields,
    vertices: &StructuredArray,
    vf: VertexFields,
    global_stiffness: f32,
    out: &mut [Vec3],
) {
    backend.launch(out, |s, slot| {
        let e = springs.element(s);
        let p0 = vertices.get(e.get(sf.vertex0) as usize, vf.position);
        let p1 = vertices.get(e.get(sf.vertex1) as usize, vf.position);
        let stiffness = e.get(sf.stiffness) * global_stiffness;
        *slot = spring_force(p0, p1, e.get(sf.rest_length), stiffness);
    });
}

/// One lane per vertex in `range`: force accumulation, floor clamp,
/// collision response and integration.
#[allow(clippy::too_many_arguments)]
pub(crate) fn launch_vertex_kernel(
    backend: &ComputeBackend,
    vertices: &mut StructuredArray,
    vf: VertexFields,
    range: Range<usize>,
    spring_forces: &[Vec3],
    influencers: &[i32],
    forces: &[Box<dyn ExternalForce>],
    collider: Option<&SpatialIndex>,
    params: VertexParams,
) {
    backend.launch_records(vertices, range, |_, mut e| {
        if e.get(vf.is_fixed) != 0 {
            return;
        }

        let position = e.get(vf.position);
        let mut force = e.get(vf.force) * params.damping;

        let ptr = e.get(vf.spring_ptr) as usize;
        let count = e.get(vf.spring_count) as usize;
        for &entry in &influencers[ptr..ptr + count] {
            let (spring, sign) = InfluencerTable::decode(entry);
            force += spring_forces[spring] * sign;
        }

        for f in forces {
            force += f.force(position, params.time);
        }

        let mut projected = position + force;
        if projected.y < params.ground_height {
            force.y -= projected.y - params.ground_height;
            projected.y = params.ground_height;
        }

        let mut stored = force;
        if let Some(index) = collider {
            let radius_sq = (force * params.search_margin).length_squared();
            if let Some(hit) = index.find_closest_point(projected, radius_sq) {
                if (hit.point - projected).dot(hit.normal) > 0.0 {
                    force = hit.point - position;
                    stored = force * (1.0 - params.friction);
                }
            }
        }

        e.set(vf.force, stored);
        e.set(vf.position, position + force);
    });
}

/// Blends every display position toward its true position.
pub(crate) fn launch_smoothing_kernel(
    backend: &ComputeBackend,
    vertices: &mut StructuredArray,
    vf: VertexFields,
    range: Range<usize>,
    blend: f32,
) {
    backend.launch_records(vertices, range, |_, mut e| {
        let smoothed = e.get(vf.smoothed_position);
        e.set(vf.smoothed_position, smoothed.lerp(e.get(vf.position), blend));
    });
}

/// Re-seeds the vertices in `range` from their rest pose.
pub(crate) fn launch_reset_kernel(
    backend: &ComputeBackend,
    vertices: &mut StructuredArray,
    vf: VertexFields,
    range: Range<usize>,
    transform: Affine3A,
) {
    backend.launch_records(vertices, range, |_, mut e| {
        let p = transform.transform_point3(e.get(vf.initial_position));
        e.set(vf.position, p);
        e.set(vf.smoothed_position, p);
        e.set(vf.force, Vec3::ZERO);
    });
}

/// One lane per object: the position of its first vertex. Objects without
/// vertices report their last placement.
pub(crate) fn launch_gather_kernel(
    backend: &ComputeBackend,
    vertices: &StructuredArray,
    vf: VertexFields,
    objects: &[ObjectRecord],
) -> Vec<Vec3> {
    backend.map(objects, |o| {
        if o.vertex_count == 0 {
            o.position
        } else {
            vertices.get(o.vertex_start as usize, vf.position)
        }
    })
}
