//! Host-side topology records collected before bake.
//!
//! Objects own contiguous vertex and spring ranges. Only the most recently
//! added object is open for appends, so the ranges never interleave.

use glam::{Affine3A, Quat, Vec3};
use hanami_types::{HanamiError, HanamiResult, ObjectId, SpringId, VertexId};

/// A vertex waiting for bake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingVertex {
    /// Rest pose in object space. Resets transform this.
    pub initial: Vec3,
    /// Current world position. Rest lengths are sampled from this.
    pub position: Vec3,
    pub fixed: bool,
}

/// A spring waiting for bake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSpring {
    pub vertex0: u32,
    pub vertex1: u32,
    pub stiffness: f32,
    pub rest_length_factor: f32,
}

/// One object instance: a pair of buffer ranges and its last placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRecord {
    pub vertex_start: u32,
    pub vertex_count: u32,
    pub spring_start: u32,
    pub spring_count: u32,
    /// Translation of the last reset.
    pub position: Vec3,
    /// Rotation of the last reset.
    pub orientation: Quat,
}

impl ObjectRecord {
    #[inline]
    pub fn vertex_range(&self) -> std::ops::Range<usize> {
        let start = self.vertex_start as usize;
        start..start + self.vertex_count as usize
    }

    #[inline]
    pub fn spring_range(&self) -> std::ops::Range<usize> {
        let start = self.spring_start as usize;
        start..start + self.spring_count as usize
    }

    /// Rigid transform of the last reset.
    pub fn transform(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.orientation, self.position)
    }

    #[inline]
    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.vertex_range().contains(&vertex.index())
    }
}

/// Everything registered before bake.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub vertices: Vec<PendingVertex>,
    pub springs: Vec<PendingSpring>,
    pub objects: Vec<ObjectRecord>,
}

impl Topology {
    pub fn add_object(&mut self) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(ObjectRecord {
            vertex_start: self.vertices.len() as u32,
            vertex_count: 0,
            spring_start: self.springs.len() as u32,
            spring_count: 0,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        });
        id
    }

    pub fn object(&self, object: ObjectId) -> HanamiResult<&ObjectRecord> {
        self.objects
            .get(object.index())
            .ok_or(HanamiError::UnknownObject(object.0))
    }

    /// The object that accepts appends, if `object` is it.
    fn open_object(&mut self, object: ObjectId) -> HanamiResult<&mut ObjectRecord> {
        let newest = self.objects.len().checked_sub(1);
        if object.index() >= self.objects.len() {
            return Err(HanamiError::UnknownObject(object.0));
        }
        if Some(object.index()) != newest {
            return Err(HanamiError::ObjectClosed(object.0));
        }
        Ok(&mut self.objects[object.index()])
    }

    pub fn add_vertex(
        &mut self,
        object: ObjectId,
        position: Vec3,
        fixed: bool,
    ) -> HanamiResult<VertexId> {
        let id = VertexId(self.vertices.len() as u32);
        self.open_object(object)?.vertex_count += 1;
        self.vertices.push(PendingVertex {
            initial: position,
            position,
            fixed,
        });
        Ok(id)
    }

    pub fn add_spring(
        &mut self,
        object: ObjectId,
        v0: VertexId,
        v1: VertexId,
        stiffness: f32,
        rest_length_factor: f32,
    ) -> HanamiResult<SpringId> {
        let id = SpringId(self.springs.len() as u32);
        let record = self.open_object(object)?;
        for v in [v0, v1] {
            if !record.contains_vertex(v) {
                return Err(HanamiError::UnknownVertex {
                    vertex: v.0,
                    object: object.0,
                });
            }
        }
        record.spring_count += 1;
        self.springs.push(PendingSpring {
            vertex0: v0.0,
            vertex1: v1.0,
            stiffness,
            rest_length_factor,
        });
        Ok(id)
    }

    /// Moves the pending vertices of `object` to `transform × initial`.
    pub fn place_object(
        &mut self,
        object: ObjectId,
        position: Vec3,
        orientation: Quat,
    ) -> HanamiResult<()> {
        let record = self
            .objects
            .get_mut(object.index())
            .ok_or(HanamiError::UnknownObject(object.0))?;
        record.position = position;
        record.orientation = orientation;
        let transform = record.transform();
        for v in &mut self.vertices[record.vertex_range()] {
            v.position = transform.transform_point3(v.initial);
        }
        Ok(())
    }

    /// Rest length of every spring: current endpoint distance × factor.
    pub fn rest_lengths(&self) -> Vec<f32> {
        self.springs
            .iter()
            .map(|s| {
                let p0 = self.vertices[s.vertex0 as usize].position;
                let p1 = self.vertices[s.vertex1 as usize].position;
                p0.distance(p1) * s.rest_length_factor
            })
            .collect()
    }
}
