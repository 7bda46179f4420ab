//! Reusable object topologies.
//!
//! A [`BodyPlan`] is declared once and stamped into the solver any number
//! of times. Each stamp is a new object with its own vertex and spring
//! ranges; rest lengths are sampled per stamp at bake.

use glam::Vec3;
use hanami_types::{HanamiResult, ObjectId, VertexId};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::solver::VerletPhysics;

/// Default grid spacing of a petal.
pub const PETAL_SEGMENT_SIZE: f32 = 0.04;

/// Segments per side of a petal.
pub const PETAL_SEGMENTS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanVertex {
    pub position: Vec3,
    pub fixed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanSpring {
    /// Plan-local vertex indices.
    pub vertex0: u32,
    pub vertex1: u32,
    pub stiffness: f32,
    pub rest_length_factor: f32,
}

/// Object-space topology template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyPlan {
    vertices: Vec<PlanVertex>,
    springs: Vec<PlanSpring>,
}

impl BodyPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex and returns its plan-local index.
    pub fn add_vertex(&mut self, position: Vec3, fixed: bool) -> u32 {
        self.vertices.push(PlanVertex { position, fixed });
        self.vertices.len() as u32 - 1
    }

    pub fn add_spring(&mut self, vertex0: u32, vertex1: u32, stiffness: f32) -> u32 {
        self.springs.push(PlanSpring {
            vertex0,
            vertex1,
            stiffness,
            rest_length_factor: 1.0,
        });
        self.springs.len() as u32 - 1
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    pub fn vertices(&self) -> &[PlanVertex] {
        &self.vertices
    }

    pub fn springs(&self) -> &[PlanSpring] {
        &self.springs
    }

    /// Rewrites every vertex position with `f(index, position)`.
    pub fn displace_vertices(&mut self, mut f: impl FnMut(usize, Vec3) -> Vec3) {
        for (i, v) in self.vertices.iter_mut().enumerate() {
            v.position = f(i, v.position);
        }
    }

    /// Offsets every vertex inside the grid plane by up to `amount` along
    /// each of its two axes.
    pub fn jitter(&mut self, amount: f32, rng: &mut impl Rng) {
        if amount <= 0.0 {
            return;
        }
        self.displace_vertices(|_, p| {
            let dy = rng.gen_range(-amount..=amount);
            let dz = rng.gen_range(-amount..=amount);
            p + Vec3::new(0.0, dy, dz)
        });
    }

    /// Stamps the plan into `physics` as a new object.
    pub fn instantiate(&self, physics: &mut VerletPhysics) -> HanamiResult<ObjectId> {
        let object = physics.add_object()?;
        let mut ids = Vec::with_capacity(self.vertices.len());
        for v in &self.vertices {
            ids.push(physics.add_vertex(object, v.position, v.fixed)?);
        }
        for s in &self.springs {
            let v0 = self.stamped(&ids, s.vertex0, object)?;
            let v1 = self.stamped(&ids, s.vertex1, object)?;
            physics.add_spring(object, v0, v1, s.stiffness, s.rest_length_factor)?;
        }
        Ok(object)
    }

    fn stamped(&self, ids: &[VertexId], local: u32, object: ObjectId) -> HanamiResult<VertexId> {
        ids.get(local as usize)
            .copied()
            .ok_or(hanami_types::HanamiError::UnknownVertex {
                vertex: local,
                object: object.0,
            })
    }

    /// A `width_segments × height_segments` sheet in the YZ plane, centred
    /// on the origin.
    ///
    /// Vertex `(x, y)` has index `y * (width_segments + 1) + x`. Each vertex
    /// is tied to its left and upper neighbours, both upper diagonals, and
    /// the vertices two steps left and two steps up.
    pub fn cloth_grid(width_segments: u32, height_segments: u32, segment_size: f32) -> Self {
        let mut plan = Self::new();
        let cols = width_segments + 1;
        let index = |x: u32, y: u32| y * cols + x;
        let half_w = width_segments as f32 * 0.5;
        let half_h = height_segments as f32 * 0.5;

        for y in 0..=height_segments {
            for x in 0..=width_segments {
                let position = Vec3::new(
                    0.0,
                    (x as f32 - half_w) * segment_size,
                    (y as f32 - half_h) * segment_size,
                );
                let v = plan.add_vertex(position, false);

                if x > 0 {
                    plan.add_spring(v, index(x - 1, y), 1.0);
                }
                if y > 0 {
                    plan.add_spring(v, index(x, y - 1), 1.0);
                }
                if x > 0 && y > 0 {
                    plan.add_spring(v, index(x - 1, y - 1), 1.0);
                }
                if y > 0 && x < width_segments {
                    plan.add_spring(v, index(x + 1, y - 1), 1.0);
                }
                if x > 1 {
                    plan.add_spring(v, index(x - 2, y), 1.0);
                }
                if y > 1 {
                    plan.add_spring(v, index(x, y - 2), 1.0);
                }
            }
        }
        plan
    }

    /// The falling-petal sheet, jittered by a fifth of its spacing.
    pub fn petal(rng: &mut impl Rng) -> Self {
        let mut plan = Self::cloth_grid(PETAL_SEGMENTS, PETAL_SEGMENTS, PETAL_SEGMENT_SIZE);
        plan.jitter(PETAL_SEGMENT_SIZE * 0.2, rng);
        plan
    }
}
