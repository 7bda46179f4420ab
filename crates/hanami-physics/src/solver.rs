//! The Verlet mass-spring solver.
//!
//! Lifecycle: topology is registered while building, frozen by [`bake`],
//! then advanced by [`update`] and re-seeded by [`reset_object`].
//!
//! Misuse (a topology call after bake, stepping before bake, an unknown
//! handle) never panics: it is logged, emitted as a telemetry event, and
//! returned as an error with the solver state untouched.
//!
//! [`bake`]: VerletPhysics::bake
//! [`update`]: VerletPhysics::update
//! [`reset_object`]: VerletPhysics::reset_object

use std::sync::mpsc;
use std::sync::Arc;

use glam::{Quat, Vec3};
use hanami_buffer::StructuredArray;
use hanami_bvh::SpatialIndex;
use hanami_telemetry::{EventKind, EventSender};
use hanami_types::{HanamiError, HanamiResult, ObjectId, SpringId, VertexId};
use serde::{Deserialize, Serialize};

use crate::config::{SolverSettings, StepConfig};
use crate::forces::ExternalForce;
use crate::influence::InfluencerTable;
use crate::kernels::{
    launch_gather_kernel, launch_reset_kernel, launch_smoothing_kernel, launch_spring_kernel,
    launch_vertex_kernel, SpringFields, VertexFields, VertexParams, SPRING_DECL, VERTEX_DECL,
};
use crate::readback::{ObjectPositions, VertexSnapshot};
use crate::topology::{ObjectRecord, Topology};

/// Counts reported by [`VerletPhysics::bake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakeReport {
    pub objects: usize,
    pub vertices: usize,
    pub springs: usize,
    /// Total length of the influencer table (twice the spring count).
    pub influencers: usize,
}

/// Outcome of one [`VerletPhysics::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Sub-steps consumed by this call.
    pub substeps: u32,
    /// Accumulated simulation time after the call (seconds).
    pub sim_time: f64,
    /// Frame counter after the call.
    pub frame: u64,
    /// True when this call scheduled an object-position read-back.
    pub readback_scheduled: bool,
}

/// Device-side state, allocated at bake.
struct BakedBuffers {
    vertices: StructuredArray,
    springs: StructuredArray,
    vf: VertexFields,
    sf: SpringFields,
    /// Per-spring scratch written by the spring kernel.
    spring_forces: Vec<Vec3>,
    influencers: InfluencerTable,
}

/// Data-parallel Verlet mass-spring solver.
pub struct VerletPhysics {
    settings: SolverSettings,
    topology: Topology,
    forces: Vec<Box<dyn ExternalForce>>,
    collider: Option<Arc<SpatialIndex>>,
    baked: Option<BakedBuffers>,

    frame: u64,
    sim_time: f64,
    time_since_last_step: f64,

    /// Host-side object positions, refreshed by read-backs and resets.
    positions: Vec<Vec3>,
    /// Frame of the last reset per object. Older read-backs skip it.
    reset_frames: Vec<u64>,
    readback_tx: mpsc::Sender<ObjectPositions>,
    readback_rx: mpsc::Receiver<ObjectPositions>,
    waiters: Vec<mpsc::Sender<ObjectPositions>>,

    events: Option<EventSender>,
}

impl VerletPhysics {
    pub fn new(settings: SolverSettings) -> Self {
        let (readback_tx, readback_rx) = mpsc::channel();
        Self {
            settings,
            topology: Topology::default(),
            forces: Vec::new(),
            collider: None,
            baked: None,
            frame: 0,
            sim_time: 0.0,
            time_since_last_step: 0.0,
            positions: Vec::new(),
            reset_frames: Vec::new(),
            readback_tx,
            readback_rx,
            waiters: Vec::new(),
            events: None,
        }
    }

    /// Attaches a telemetry producer.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    #[inline]
    pub fn is_baked(&self) -> bool {
        self.baked.is_some()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Accumulated simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn object_count(&self) -> usize {
        self.topology.objects.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.topology.vertices.len()
    }

    pub fn spring_count(&self) -> usize {
        self.topology.springs.len()
    }

    /// Buffer ranges and last placement of `object`.
    pub fn object(&self, object: ObjectId) -> HanamiResult<ObjectRecord> {
        self.topology.object(object).copied()
    }

    fn emit(&self, kind: EventKind) {
        if let Some(events) = &self.events {
            events.send(self.frame, kind);
        }
    }

    /// Reports a misuse on the diagnostic channels and hands the error back.
    fn misuse(&self, operation: &'static str, error: HanamiError) -> HanamiError {
        tracing::warn!(operation, %error, "Rejected solver call");
        self.emit(EventKind::Misuse {
            operation: operation.to_string(),
            reason: error.to_string(),
        });
        error
    }

    fn ensure_building(&self, operation: &'static str) -> HanamiResult<()> {
        if self.is_baked() {
            return Err(self.misuse(operation, HanamiError::AlreadyBaked { operation }));
        }
        Ok(())
    }

    // ─── Topology ───────────────────────────────────────────

    /// Opens a new object at the current end of the vertex and spring buffers.
    pub fn add_object(&mut self) -> HanamiResult<ObjectId> {
        self.ensure_building("add_object")?;
        Ok(self.topology.add_object())
    }

    pub fn add_vertex(
        &mut self,
        object: ObjectId,
        position: Vec3,
        fixed: bool,
    ) -> HanamiResult<VertexId> {
        self.ensure_building("add_vertex")?;
        self.topology
            .add_vertex(object, position, fixed)
            .map_err(|e| self.misuse("add_vertex", e))
    }

    /// Adds a spring between two vertices of `object`.
    ///
    /// The rest length is sampled at bake as the endpoint distance at that
    /// time times `rest_length_factor`.
    pub fn add_spring(
        &mut self,
        object: ObjectId,
        v0: VertexId,
        v1: VertexId,
        stiffness: f32,
        rest_length_factor: f32,
    ) -> HanamiResult<SpringId> {
        self.ensure_building("add_spring")?;
        self.topology
            .add_spring(object, v0, v1, stiffness, rest_length_factor)
            .map_err(|e| self.misuse("add_spring", e))
    }

    /// [`add_spring`](Self::add_spring) with unit stiffness and factor.
    pub fn add_spring_default(
        &mut self,
        object: ObjectId,
        v0: VertexId,
        v1: VertexId,
    ) -> HanamiResult<SpringId> {
        self.add_spring(object, v0, v1, 1.0, 1.0)
    }

    /// Registers the collision surface. Only the first collider is consulted.
    pub fn add_collider(&mut self, index: Arc<SpatialIndex>) {
        if self.collider.is_some() {
            tracing::warn!("A collider is already registered; ignoring the new one");
            return;
        }
        self.emit(EventKind::ColliderBuilt {
            triangles: index.triangle_count() as u32,
            nodes: index.node_count() as u32,
            max_depth: index.max_depth() as u32,
        });
        self.collider = Some(index);
    }

    pub fn collider(&self) -> Option<&SpatialIndex> {
        self.collider.as_deref()
    }

    /// Registers an external force. All registered forces are summed.
    pub fn add_force(&mut self, force: impl ExternalForce + 'static) {
        self.forces.push(Box::new(force));
    }

    pub fn force_count(&self) -> usize {
        self.forces.len()
    }

    // ─── Bake ───────────────────────────────────────────────

    /// Freezes topology and allocates the solver buffers.
    pub fn bake(&mut self) -> HanamiResult<BakeReport> {
        self.ensure_building("bake")?;

        let topo = &self.topology;
        let n_vertices = topo.vertices.len();
        let n_springs = topo.springs.len();

        let influencers = InfluencerTable::build(n_vertices, &topo.springs);

        let mut vertices = StructuredArray::from_declaration(VERTEX_DECL, n_vertices, "vertexBuffer")?;
        let vf = VertexFields::resolve(&vertices)?;
        for (i, v) in topo.vertices.iter().enumerate() {
            vertices.set(i, vf.position, v.position);
            vertices.set(i, vf.is_fixed, v.fixed as u32);
            vertices.set(i, vf.initial_position, v.initial);
            vertices.set(i, vf.spring_ptr, influencers.offset(i));
            vertices.set(i, vf.force, Vec3::ZERO);
            vertices.set(i, vf.spring_count, influencers.count(i));
            vertices.set(i, vf.smoothed_position, v.position);
        }

        let mut springs = StructuredArray::from_declaration(SPRING_DECL, n_springs, "springBuffer")?;
        let sf = SpringFields::resolve(&springs)?;
        for (i, (s, rest)) in topo.springs.iter().zip(topo.rest_lengths()).enumerate() {
            springs.set(i, sf.rest_length, rest);
            springs.set(i, sf.vertex0, s.vertex0);
            springs.set(i, sf.vertex1, s.vertex1);
            springs.set(i, sf.stiffness, s.stiffness);
        }

        let mut buffers = BakedBuffers {
            vertices,
            springs,
            vf,
            sf,
            spring_forces: vec![Vec3::ZERO; n_springs],
            influencers,
        };
        self.validate_kernels(&mut buffers);

        self.positions = launch_gather_kernel(
            &self.settings.backend,
            &buffers.vertices,
            vf,
            &self.topology.objects,
        );
        self.reset_frames = vec![0; self.topology.objects.len()];

        let report = BakeReport {
            objects: self.topology.objects.len(),
            vertices: n_vertices,
            springs: n_springs,
            influencers: buffers.influencers.entries().len(),
        };
        self.baked = Some(buffers);

        tracing::info!(
            objects = report.objects,
            vertices = report.vertices,
            springs = report.springs,
            backend = self.settings.backend.name(),
            "Baked Verlet solver"
        );
        self.emit(EventKind::Baked {
            objects: report.objects as u32,
            vertices: report.vertices as u32,
            springs: report.springs as u32,
        });
        Ok(report)
    }

    /// Zero-lane launch of every kernel, so field handles and captures are
    /// exercised before the first frame.
    fn validate_kernels(&self, buffers: &mut BakedBuffers) {
        let backend = &self.settings.backend;
        let config = StepConfig::default();
        launch_spring_kernel(
            backend,
            &buffers.springs,
            buffers.sf,
            &buffers.vertices,
            buffers.vf,
            config.stiffness,
            &mut [],
        );
        launch_vertex_kernel(
            backend,
            &mut buffers.vertices,
            buffers.vf,
            0..0,
            &buffers.spring_forces,
            buffers.influencers.entries(),
            &self.forces,
            self.collider.as_deref(),
            vertex_params(&config, 0.0),
        );
        launch_smoothing_kernel(backend, &mut buffers.vertices, buffers.vf, 0..0, config.smoothing);
        launch_reset_kernel(
            backend,
            &mut buffers.vertices,
            buffers.vf,
            0..0,
            glam::Affine3A::IDENTITY,
        );
        launch_gather_kernel(backend, &buffers.vertices, buffers.vf, &[]);
    }

    // ─── Steady state ───────────────────────────────────────

    /// Re-seeds `object` from its rest pose under a rigid transform and
    /// zeroes its carried force.
    ///
    /// Before bake this moves the pending vertices instead, which changes
    /// the rest lengths sampled at bake.
    pub fn reset_object(
        &mut self,
        object: ObjectId,
        position: Vec3,
        orientation: Quat,
    ) -> HanamiResult<()> {
        self.topology
            .place_object(object, position, orientation)
            .map_err(|e| self.misuse("reset_object", e))?;
        let record = self.topology.objects[object.index()];

        if let Some(buffers) = self.baked.as_mut() {
            launch_reset_kernel(
                &self.settings.backend,
                &mut buffers.vertices,
                buffers.vf,
                record.vertex_range(),
                record.transform(),
            );
            self.positions[object.index()] = position;
            self.reset_frames[object.index()] = self.frame;
        }

        tracing::trace!(object = object.0, ?position, "Reset object");
        self.emit(EventKind::ObjectReset { object: object.0 });
        Ok(())
    }

    /// Advances the simulation by one host frame.
    ///
    /// `interval` is the wall-clock time since the previous call and is
    /// clamped before it is accumulated. Non-finite intervals are clamped
    /// too, so one bad host timestamp cannot stall the solver. `elapsed` is the host's total
    /// running time; it is only logged.
    pub fn update(
        &mut self,
        interval: f64,
        elapsed: f64,
        config: &StepConfig,
    ) -> HanamiResult<StepReport> {
        if !config.run_simulation {
            return Ok(StepReport {
                substeps: 0,
                sim_time: self.sim_time,
                frame: self.frame,
                readback_scheduled: false,
            });
        }
        if !self.is_baked() {
            return Err(self.misuse("update", HanamiError::NotBaked { operation: "update" }));
        }

        self.frame += 1;
        let period = self.settings.readback_period;
        let readback_scheduled = period > 0 && self.frame % period == 0;
        if readback_scheduled {
            self.schedule_readback();
        }

        let step = self.settings.step_duration();
        // NaN falls to the lower bound; an empty range never panics
        let interval = interval
            .max(self.settings.min_interval)
            .min(self.settings.max_interval);
        if interval.is_finite() {
            self.time_since_last_step += interval;
        }

        let backend = self.settings.backend;
        let collider = self.collider.as_deref();
        let Some(buffers) = self.baked.as_mut() else {
            return Err(HanamiError::NotBaked { operation: "update" });
        };
        let n_vertices = buffers.vertices.len();

        let mut substeps = 0u32;
        while self.time_since_last_step >= step {
            self.time_since_last_step -= step;
            self.sim_time += step;
            substeps += 1;

            launch_spring_kernel(
                &backend,
                &buffers.springs,
                buffers.sf,
                &buffers.vertices,
                buffers.vf,
                config.stiffness,
                &mut buffers.spring_forces,
            );
            launch_vertex_kernel(
                &backend,
                &mut buffers.vertices,
                buffers.vf,
                0..n_vertices,
                &buffers.spring_forces,
                buffers.influencers.entries(),
                &self.forces,
                collider,
                vertex_params(config, self.sim_time as f32),
            );
        }

        launch_smoothing_kernel(
            &backend,
            &mut buffers.vertices,
            buffers.vf,
            0..n_vertices,
            config.smoothing,
        );

        tracing::trace!(
            frame = self.frame,
            substeps,
            sim_time = self.sim_time,
            elapsed,
            "Stepped"
        );
        self.emit(EventKind::Substeps {
            count: substeps,
            sim_time: self.sim_time,
        });

        Ok(StepReport {
            substeps,
            sim_time: self.sim_time,
            frame: self.frame,
            readback_scheduled,
        })
    }

    // ─── Read-back ──────────────────────────────────────────

    /// Gathers the representative positions now and publishes them from a
    /// background task. The caller never waits for the publish.
    fn schedule_readback(&mut self) {
        let Some(buffers) = self.baked.as_ref() else {
            return;
        };
        let staging = launch_gather_kernel(
            &self.settings.backend,
            &buffers.vertices,
            buffers.vf,
            &self.topology.objects,
        );
        let result = ObjectPositions {
            frame: self.frame,
            positions: staging,
        };

        tracing::debug!(frame = self.frame, objects = result.positions.len(), "Scheduled read-back");
        self.emit(EventKind::Readback {
            objects: result.positions.len() as u32,
        });

        let main = self.readback_tx.clone();
        let waiters = std::mem::take(&mut self.waiters);
        rayon::spawn(move || {
            let _ = main.send(result.clone());
            for waiter in waiters {
                // Dropped receivers just stop listening
                let _ = waiter.send(result.clone());
            }
        });
    }

    /// Returns a receiver that resolves with the next scheduled read-back.
    pub fn request_object_positions(&mut self) -> mpsc::Receiver<ObjectPositions> {
        let (tx, rx) = mpsc::channel();
        self.waiters.push(tx);
        rx
    }

    /// Host-side object positions, after folding in every completed
    /// read-back.
    ///
    /// Entries of objects reset after a read-back was gathered keep the
    /// reset position.
    pub fn object_positions(&mut self) -> &[Vec3] {
        while let Ok(readback) = self.readback_rx.try_recv() {
            for (i, &p) in readback.positions.iter().enumerate() {
                let stale = self.reset_frames.get(i).is_some_and(|&f| f >= readback.frame);
                if !stale {
                    if let Some(slot) = self.positions.get_mut(i) {
                        *slot = p;
                    }
                }
            }
        }
        &self.positions
    }

    /// Copies out the full vertex state.
    pub fn read_vertices(&self) -> HanamiResult<VertexSnapshot> {
        let Some(buffers) = self.baked.as_ref() else {
            return Err(self.misuse(
                "read_vertices",
                HanamiError::NotBaked {
                    operation: "read_vertices",
                },
            ));
        };
        let n = buffers.vertices.len();
        let (vertices, vf) = (&buffers.vertices, buffers.vf);
        Ok(VertexSnapshot {
            frame: self.frame,
            sim_time: self.sim_time,
            positions: (0..n).map(|i| vertices.get(i, vf.position)).collect(),
            smoothed: (0..n).map(|i| vertices.get(i, vf.smoothed_position)).collect(),
            forces: (0..n).map(|i| vertices.get(i, vf.force)).collect(),
            fixed: (0..n).map(|i| vertices.get(i, vf.is_fixed) != 0).collect(),
        })
    }

    /// Current endpoint positions of every spring, for wireframe display.
    pub fn read_springs(&self) -> HanamiResult<Vec<[Vec3; 2]>> {
        let Some(buffers) = self.baked.as_ref() else {
            return Err(self.misuse(
                "read_springs",
                HanamiError::NotBaked {
                    operation: "read_springs",
                },
            ));
        };
        let (vertices, vf, springs, sf) =
            (&buffers.vertices, buffers.vf, &buffers.springs, buffers.sf);
        Ok((0..springs.len())
            .map(|s| {
                let v0 = springs.get(s, sf.vertex0) as usize;
                let v1 = springs.get(s, sf.vertex1) as usize;
                [vertices.get(v0, vf.position), vertices.get(v1, vf.position)]
            })
            .collect())
    }

    /// Bake-time rest length of every spring.
    pub fn spring_rest_lengths(&self) -> Vec<f32> {
        match self.baked.as_ref() {
            Some(b) => (0..b.springs.len())
                .map(|s| b.springs.get(s, b.sf.rest_length))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Spring scratch forces of the most recent sub-step.
    pub fn spring_forces(&self) -> &[Vec3] {
        match self.baked.as_ref() {
            Some(b) => &b.spring_forces,
            None => &[],
        }
    }

    /// Signed spring references influencing `vertex`. Empty before bake.
    pub fn influencers(&self, vertex: VertexId) -> &[i32] {
        match self.baked.as_ref() {
            Some(b) if vertex.index() < b.vertices.len() => b.influencers.run(vertex.index()),
            _ => &[],
        }
    }
}

fn vertex_params(config: &StepConfig, time: f32) -> VertexParams {
    VertexParams {
        damping: config.damping,
        friction: config.friction,
        ground_height: config.ground_height,
        search_margin: config.search_margin,
        time,
    }
}
