//! Scene description for headless runs.
//!
//! A scene is a TOML file. Every section is optional; missing fields take
//! the defaults below.

use std::path::PathBuf;

use glam::{EulerRot, Quat, Vec3};
use hanami_bvh::{BuildOptions, SpatialIndex};
use hanami_mesh::generators::{ground_triangle, uv_sphere};
use hanami_mesh::TriangleMesh;
use hanami_physics::{BodyPlan, RespawnSweep, SolverSettings, StepConfig, Wind};
use hanami_types::{HanamiError, HanamiResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Seed for petal jitter and spawn placement.
    pub seed: u64,
    /// Number of petal instances.
    pub instances: u32,
    pub frames: u64,
    /// Wall-clock interval fed to every `update` (seconds).
    pub frame_interval: f64,
    /// Downward acceleration per sub-step.
    pub gravity: f32,
    pub wind: Option<Wind>,
    pub petal: PetalConfig,
    pub spawn: SpawnRegion,
    pub collider: ColliderConfig,
    pub respawn: RespawnSweep,
    pub solver: SolverSettings,
    pub step: StepConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            instances: 200,
            frames: 600,
            frame_interval: 1.0 / 60.0,
            gravity: 5.0e-6,
            wind: Some(Wind {
                strength: 8.0e-6,
                ..Default::default()
            }),
            petal: PetalConfig::default(),
            spawn: SpawnRegion::default(),
            collider: ColliderConfig::default(),
            respawn: RespawnSweep::default(),
            solver: SolverSettings::default(),
            step: StepConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn validate(&self) -> HanamiResult<()> {
        self.solver.validate()?;
        self.step.validate()?;
        if self.frame_interval <= 0.0 {
            return Err(HanamiError::InvalidConfig(format!(
                "frame_interval {} must be positive",
                self.frame_interval
            )));
        }
        if self.petal.width_segments == 0 || self.petal.height_segments == 0 {
            return Err(HanamiError::InvalidConfig(
                "petal needs at least one segment per side".into(),
            ));
        }
        if self.petal.segment_size <= 0.0 {
            return Err(HanamiError::InvalidConfig(
                "petal segment_size must be positive".into(),
            ));
        }
        self.spawn.validate()
    }

    /// The petal topology with this scene's jitter applied.
    pub fn petal_plan(&self, rng: &mut impl Rng) -> BodyPlan {
        let p = &self.petal;
        let mut plan = BodyPlan::cloth_grid(p.width_segments, p.height_segments, p.segment_size);
        plan.jitter(p.segment_size * p.jitter, rng);
        plan
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetalConfig {
    pub width_segments: u32,
    pub height_segments: u32,
    pub segment_size: f32,
    /// Jitter amplitude as a fraction of `segment_size`.
    pub jitter: f32,
}

impl Default for PetalConfig {
    fn default() -> Self {
        Self {
            width_segments: hanami_physics::body_plan::PETAL_SEGMENTS,
            height_segments: hanami_physics::body_plan::PETAL_SEGMENTS,
            segment_size: hanami_physics::body_plan::PETAL_SEGMENT_SIZE,
            jitter: 0.2,
        }
    }
}

/// Where petals appear. Initial spawns spread over `x`; respawns all enter
/// at `respawn_x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnRegion {
    pub x: [f32; 2],
    pub y: [f32; 2],
    pub z: [f32; 2],
    pub respawn_x: f32,
}

impl Default for SpawnRegion {
    fn default() -> Self {
        Self {
            x: [-28.0, -8.0],
            y: [1.0, 9.0],
            z: [-2.5, 2.5],
            respawn_x: -8.0,
        }
    }
}

impl SpawnRegion {
    fn validate(&self) -> HanamiResult<()> {
        for (axis, [lo, hi]) in [("x", self.x), ("y", self.y), ("z", self.z)] {
            if lo > hi {
                return Err(HanamiError::InvalidConfig(format!(
                    "spawn {axis} range [{lo}, {hi}] is reversed"
                )));
            }
        }
        Ok(())
    }

    /// A placement anywhere in the region.
    pub fn initial(&self, rng: &mut impl Rng) -> (Vec3, Quat) {
        let x = sample(rng, self.x);
        (Vec3::new(x, sample(rng, self.y), sample(rng, self.z)), random_orientation(rng))
    }

    /// A placement on the entry plane.
    pub fn respawn(&self, rng: &mut impl Rng) -> (Vec3, Quat) {
        let p = Vec3::new(self.respawn_x, sample(rng, self.y), sample(rng, self.z));
        (p, random_orientation(rng))
    }
}

fn sample(rng: &mut impl Rng, [lo, hi]: [f32; 2]) -> f32 {
    lo + rng.gen::<f32>() * (hi - lo)
}

fn random_orientation(rng: &mut impl Rng) -> Quat {
    let tau = std::f32::consts::TAU;
    Quat::from_euler(
        EulerRot::XYZ,
        rng.gen::<f32>() * tau,
        rng.gen::<f32>() * tau,
        rng.gen::<f32>() * tau,
    )
}

/// The static obstacle petals collide with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColliderConfig {
    None,
    Ground { y: f32, half_extent: f32 },
    Sphere {
        center: [f32; 3],
        radius: f32,
        stacks: usize,
        slices: usize,
    },
    /// A `TriangleMesh` stored as JSON.
    Mesh { path: PathBuf },
}

impl Default for ColliderConfig {
    fn default() -> Self {
        ColliderConfig::Sphere {
            center: [0.0, 2.0, 0.0],
            radius: 1.5,
            stacks: 16,
            slices: 24,
        }
    }
}

impl ColliderConfig {
    pub fn mesh(&self) -> Result<Option<TriangleMesh>, Box<dyn std::error::Error>> {
        Ok(match self {
            ColliderConfig::None => None,
            ColliderConfig::Ground { y, half_extent } => Some(ground_triangle(*half_extent, *y)),
            ColliderConfig::Sphere {
                center,
                radius,
                stacks,
                slices,
            } => Some(uv_sphere(Vec3::from_array(*center), *radius, *stacks, *slices)),
            ColliderConfig::Mesh { path } => {
                let content = std::fs::read_to_string(path)?;
                Some(serde_json::from_str(&content)?)
            }
        })
    }

    pub fn build(
        &self,
        options: &BuildOptions,
    ) -> Result<Option<SpatialIndex>, Box<dyn std::error::Error>> {
        match self.mesh()? {
            Some(mesh) => Ok(Some(SpatialIndex::build_with(&mesh, options)?)),
            None => Ok(None),
        }
    }
}
