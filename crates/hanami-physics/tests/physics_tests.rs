//! Integration tests for hanami-physics.

use std::sync::Arc;
use std::time::Duration;

use glam::{Quat, Vec3};
use hanami_bvh::SpatialIndex;
use hanami_mesh::generators::{ground_triangle, uv_sphere};
use hanami_physics::{
    BodyPlan, ExternalForce, Gravity, RespawnSweep, SolverSettings, StepConfig, VerletPhysics,
    VertexSnapshot, Wind,
};
use hanami_telemetry::{EventBus, EventKind, VecSink};
use hanami_types::{HanamiError, ObjectId, VertexId};
use rand::rngs::StdRng;
use rand::SeedableRng;

const FRAME: f64 = 1.0 / 60.0;
const ONE_STEP: f64 = 1.0 / 360.0;

fn petal_field(settings: SolverSettings, count: usize, seed: u64) -> VerletPhysics {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut physics = VerletPhysics::new(settings);
    for i in 0..count {
        let plan = BodyPlan::petal(&mut rng);
        let id = plan.instantiate(&mut physics).unwrap();
        let position = Vec3::new(-1.0 + i as f32 * 0.5, 2.0 + i as f32 * 0.3, 0.0);
        let orientation = Quat::from_euler(glam::EulerRot::XYZ, 0.3 * i as f32, 0.7, 0.1);
        physics.reset_object(id, position, orientation).unwrap();
    }
    physics
}

/// Fixed anchor at the origin, free vertex above it.
fn pendulum(settings: SolverSettings, free_at: Vec3, factor: f32) -> (VerletPhysics, VertexId) {
    let mut physics = VerletPhysics::new(settings);
    let obj = physics.add_object().unwrap();
    let a = physics.add_vertex(obj, Vec3::ZERO, true).unwrap();
    let b = physics.add_vertex(obj, free_at, false).unwrap();
    physics.add_spring(obj, a, b, 1.0, factor).unwrap();
    (physics, b)
}

fn frictionless() -> StepConfig {
    StepConfig {
        friction: 0.0,
        ..Default::default()
    }
}

// ─── Influencers ──────────────────────────────────────────────

#[test]
fn every_spring_appears_in_exactly_two_runs_with_opposite_signs() {
    let mut physics = petal_field(SolverSettings::sequential(), 2, 1);
    physics.bake().unwrap();

    let springs = physics.spring_count();
    let mut plus = vec![0usize; springs];
    let mut minus = vec![0usize; springs];
    for v in 0..physics.vertex_count() {
        for &entry in physics.influencers(VertexId(v as u32)) {
            let s = entry.unsigned_abs() as usize - 1;
            if entry > 0 {
                plus[s] += 1;
            } else {
                minus[s] += 1;
            }
        }
    }
    assert!(plus.iter().all(|&c| c == 1));
    assert!(minus.iter().all(|&c| c == 1));
}

#[test]
fn influencers_follow_spring_endpoints() {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let obj = physics.add_object().unwrap();
    let v: Vec<VertexId> = (0..3)
        .map(|i| physics.add_vertex(obj, Vec3::new(i as f32, 1.0, 0.0), false).unwrap())
        .collect();
    physics.add_spring_default(obj, v[0], v[1]).unwrap();
    physics.add_spring_default(obj, v[2], v[1]).unwrap();
    let report = physics.bake().unwrap();

    assert_eq!(report.influencers, 4);
    assert_eq!(physics.influencers(v[0]), &[1]);
    assert_eq!(physics.influencers(v[1]), &[-1, -2]);
    assert_eq!(physics.influencers(v[2]), &[2]);
}

#[test]
fn fixed_vertices_keep_their_influencers() {
    let (mut physics, b) = pendulum(SolverSettings::sequential(), Vec3::Y, 1.0);
    physics.bake().unwrap();
    assert_eq!(physics.influencers(VertexId(0)), &[1]);
    assert_eq!(physics.influencers(b), &[-1]);
}

// ─── Spring forces ────────────────────────────────────────────

#[test]
fn stretched_spring_moves_endpoints_equally_and_oppositely() {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let obj = physics.add_object().unwrap();
    let a = physics.add_vertex(obj, Vec3::new(0.0, 5.0, 0.0), false).unwrap();
    let b = physics.add_vertex(obj, Vec3::new(0.0, 7.0, 0.0), false).unwrap();
    physics.add_spring(obj, a, b, 1.0, 0.5).unwrap();
    physics.bake().unwrap();

    let before = physics.read_vertices().unwrap();
    physics.update(ONE_STEP, 0.0, &frictionless()).unwrap();
    let after = physics.read_vertices().unwrap();

    let da = after.positions[0] - before.positions[0];
    let db = after.positions[1] - before.positions[1];
    assert!(da.y > 0.0, "Stretched spring should pull A up");
    assert!(db.y < 0.0, "Stretched spring should pull B down");
    assert!((da + db).length() < 1e-6);
    assert_eq!(physics.spring_forces().len(), 1);
}

#[test]
fn zero_length_spring_stays_finite() {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let obj = physics.add_object().unwrap();
    let a = physics.add_vertex(obj, Vec3::ONE, false).unwrap();
    let b = physics.add_vertex(obj, Vec3::ONE, false).unwrap();
    physics.add_spring(obj, a, b, 1.0, 2.0).unwrap();
    physics.bake().unwrap();

    physics.update(FRAME, 0.0, &StepConfig::default()).unwrap();
    let snapshot = physics.read_vertices().unwrap();
    assert!(snapshot.positions.iter().all(|p| p.is_finite()));
}

// ─── Fixed vertices & determinism ─────────────────────────────

#[test]
fn fixed_vertices_never_move() {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let obj = physics.add_object().unwrap();
    let mut ids = Vec::new();
    for i in 0..6 {
        let fixed = i % 3 == 0;
        ids.push(physics.add_vertex(obj, Vec3::new(i as f32 * 0.1, 1.0, 0.0), fixed).unwrap());
    }
    for w in ids.windows(2) {
        physics.add_spring_default(obj, w[0], w[1]).unwrap();
    }
    physics.add_force(Gravity::down(1e-4));
    physics.bake().unwrap();

    let before = physics.read_vertices().unwrap();
    for _ in 0..120 {
        physics.update(FRAME, 0.0, &StepConfig::default()).unwrap();
    }
    let after = physics.read_vertices().unwrap();

    for i in [0, 3] {
        assert!(after.fixed[i]);
        assert_eq!(after.positions[i], before.positions[i]);
    }
    assert!(after.positions[1].y < before.positions[1].y);
}

fn run_scene(settings: SolverSettings, frames: usize) -> VertexSnapshot {
    let mut physics = petal_field(settings, 4, 7);
    let sphere = uv_sphere(Vec3::new(0.0, 0.5, 0.0), 0.6, 8, 12);
    physics.add_collider(Arc::new(SpatialIndex::build(&sphere).unwrap()));
    physics.add_force(Gravity::down(2e-5));
    physics.add_force(Wind::default());
    physics.bake().unwrap();

    let config = StepConfig::default();
    for i in 0..frames {
        let interval = if i % 3 == 0 { FRAME } else { FRAME * 0.5 };
        physics.update(interval, i as f64 * FRAME, &config).unwrap();
    }
    physics.read_vertices().unwrap()
}

#[test]
fn identical_runs_are_bit_identical() {
    let a = run_scene(SolverSettings::sequential(), 90);
    let b = run_scene(SolverSettings::sequential(), 90);
    assert_eq!(a, b);
}

#[test]
fn parallel_backend_matches_sequential() {
    let a = run_scene(SolverSettings::sequential(), 90);
    let b = run_scene(SolverSettings::default(), 90);
    assert_eq!(a.positions, b.positions);
    assert_eq!(a.smoothed, b.smoothed);
}

// ─── Bake & reset ─────────────────────────────────────────────

#[test]
fn rest_lengths_match_endpoint_distances_after_bake() {
    let mut physics = petal_field(SolverSettings::sequential(), 3, 11);
    physics.bake().unwrap();

    let rest = physics.spring_rest_lengths();
    let springs = physics.read_springs().unwrap();
    assert_eq!(rest.len(), springs.len());
    for (r, [p0, p1]) in rest.iter().zip(springs) {
        assert!((p0.distance(p1) - r).abs() < 1e-5);
    }
}

#[test]
fn rest_length_factor_scales_sampled_length() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::new(0.0, 2.0, 0.0), 0.5);
    physics.bake().unwrap();
    assert_eq!(physics.spring_rest_lengths(), vec![1.0]);
}

#[test]
fn reset_is_idempotent() {
    let mut physics = petal_field(SolverSettings::sequential(), 2, 3);
    physics.add_force(Gravity::down(1e-4));
    physics.bake().unwrap();
    for _ in 0..30 {
        physics.update(FRAME, 0.0, &StepConfig::default()).unwrap();
    }

    let q = Quat::from_rotation_y(1.2);
    let p = Vec3::new(-8.0, 4.0, 1.0);
    physics.reset_object(ObjectId(1), p, q).unwrap();
    let first = physics.read_vertices().unwrap();
    physics.reset_object(ObjectId(1), p, q).unwrap();
    let second = physics.read_vertices().unwrap();
    assert_eq!(first.positions, second.positions);
}

#[test]
fn reset_reseeds_only_its_object() {
    let mut rng = StdRng::seed_from_u64(5);
    let plan = BodyPlan::petal(&mut rng);
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let a = plan.instantiate(&mut physics).unwrap();
    let b = plan.instantiate(&mut physics).unwrap();
    physics.reset_object(b, Vec3::new(0.0, 3.0, 0.0), Quat::IDENTITY).unwrap();
    physics.add_force(Gravity::down(1e-4));
    physics.bake().unwrap();
    for _ in 0..10 {
        physics.update(FRAME, 0.0, &StepConfig::default()).unwrap();
    }

    let before = physics.read_vertices().unwrap();
    let q = Quat::from_rotation_z(0.5);
    let p = Vec3::new(1.0, 6.0, -1.0);
    physics.reset_object(a, p, q).unwrap();
    let after = physics.read_vertices().unwrap();

    let ra = physics.object(a).unwrap().vertex_range();
    let rb = physics.object(b).unwrap().vertex_range();
    for (local, i) in ra.enumerate() {
        let expected = q * plan.vertices()[local].position + p;
        assert!((after.positions[i] - expected).length() < 1e-5);
        assert_eq!(after.positions[i], after.smoothed[i]);
        assert_eq!(after.forces[i], Vec3::ZERO);
    }
    for i in rb {
        assert_eq!(after.positions[i], before.positions[i]);
    }
}

#[test]
fn reset_before_bake_moves_pending_vertices() {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let obj = physics.add_object().unwrap();
    physics.add_vertex(obj, Vec3::new(1.0, 0.0, 0.0), false).unwrap();
    physics
        .reset_object(obj, Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
        .unwrap();
    physics.bake().unwrap();

    let p = physics.read_vertices().unwrap().positions[0];
    assert!((p - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5);
}

// ─── Stepping ─────────────────────────────────────────────────

#[test]
fn one_step_interval_takes_one_substep() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::Y, 1.0);
    physics.bake().unwrap();
    let report = physics.update(ONE_STEP, 0.0, &StepConfig::default()).unwrap();
    assert_eq!(report.substeps, 1);
    assert_eq!(report.frame, 1);
    assert!((report.sim_time - ONE_STEP).abs() < 1e-12);
}

#[test]
fn long_intervals_are_clamped() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::Y, 1.0);
    physics.bake().unwrap();
    let stalled = physics.update(5.0, 0.0, &StepConfig::default()).unwrap();
    assert!(stalled.substeps <= 6);
    assert!(stalled.substeps >= 5);
}

#[test]
fn non_finite_intervals_do_not_stall_stepping() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::Y, 1.0);
    physics.bake().unwrap();
    let config = StepConfig::default();

    assert_eq!(physics.update(f64::NAN, 0.0, &config).unwrap().substeps, 0);
    let huge = physics.update(f64::INFINITY, 0.0, &config).unwrap().substeps;
    assert!((5..=6).contains(&huge), "substeps = {huge}");
    assert!(physics.update(f64::NEG_INFINITY, 0.0, &config).unwrap().substeps <= 1);

    let after = physics.update(FRAME, 0.0, &config).unwrap();
    assert!(after.substeps >= 5);
    assert!(after.sim_time.is_finite());
}

#[test]
fn inverted_interval_bounds_do_not_panic() {
    let settings = SolverSettings {
        min_interval: 0.1,
        max_interval: 0.01,
        ..SolverSettings::sequential()
    };
    assert!(settings.validate().is_err());

    let (mut physics, _) = pendulum(settings, Vec3::Y, 1.0);
    physics.bake().unwrap();
    // Falls back to the upper bound: 0.01 s is 3.6 sub-steps
    let report = physics.update(FRAME, 0.0, &StepConfig::default()).unwrap();
    assert_eq!(report.substeps, 3);
}

#[test]
fn tiny_intervals_accumulate() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::Y, 1.0);
    physics.bake().unwrap();
    let config = StepConfig::default();
    for _ in 0..27 {
        assert_eq!(physics.update(0.0, 0.0, &config).unwrap().substeps, 0);
    }
    assert_eq!(physics.update(0.0, 0.0, &config).unwrap().substeps, 1);
}

#[test]
fn one_simulated_second_is_about_360_substeps() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::Y, 1.0);
    physics.bake().unwrap();
    let total: u32 = (0..60)
        .map(|_| physics.update(FRAME, 0.0, &StepConfig::default()).unwrap().substeps)
        .sum();
    assert!((359..=360).contains(&total), "total = {total}");
}

#[test]
fn paused_update_changes_nothing() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::new(0.0, 2.0, 0.0), 0.5);
    physics.bake().unwrap();
    let before = physics.read_vertices().unwrap();
    let report = physics.update(FRAME, 0.0, &StepConfig::paused()).unwrap();
    assert_eq!(report.substeps, 0);
    assert_eq!(physics.frame(), 0);
    assert_eq!(physics.read_vertices().unwrap(), before);
}

#[test]
fn smoothing_trails_the_true_position() {
    let (mut physics, b) = pendulum(SolverSettings::sequential(), Vec3::new(0.0, 2.0, 0.0), 0.5);
    physics.bake().unwrap();
    physics.update(FRAME, 0.0, &frictionless()).unwrap();
    let s = physics.read_vertices().unwrap();
    let i = b.index();
    // One blend at 0.25 from the bake position
    let expected = Vec3::new(0.0, 2.0, 0.0).lerp(s.positions[i], 0.25);
    assert!((s.smoothed[i] - expected).length() < 1e-6);
}

#[test]
fn external_forces_see_simulation_time() {
    let (mut physics, b) = pendulum(SolverSettings::sequential(), Vec3::new(0.0, 1.0, 0.0), 1.0);
    // Pushes along +x only once simulated time has passed two sub-steps
    physics.add_force(|_: Vec3, t: f32| {
        if t > 2.5 / 360.0 {
            Vec3::new(1e-3, 0.0, 0.0)
        } else {
            Vec3::ZERO
        }
    });
    physics.bake().unwrap();
    for _ in 0..2 {
        physics.update(ONE_STEP, 0.0, &frictionless()).unwrap();
    }
    assert_eq!(physics.read_vertices().unwrap().positions[b.index()].x, 0.0);
    physics.update(ONE_STEP, 0.0, &frictionless()).unwrap();
    assert!(physics.read_vertices().unwrap().positions[b.index()].x > 0.0);
}

#[test]
fn gravity_and_wind_are_pure() {
    let g = Gravity::down(0.5);
    assert_eq!(g.force(Vec3::ONE, 0.0), g.force(Vec3::ZERO, 100.0));
    let w = Wind::default();
    assert_eq!(w.force(Vec3::ONE, 2.0), w.force(Vec3::ONE, 2.0));
    assert!(w.force(Vec3::ZERO, 0.0).x > 0.0);
}

// ─── Scenarios ────────────────────────────────────────────────

#[test]
fn spring_at_rest_stays_put_then_relaxes_when_stretched() {
    let (mut physics, b) = pendulum(SolverSettings::sequential(), Vec3::new(0.0, 1.0, 0.0), 1.0);
    physics.bake().unwrap();
    physics.update(ONE_STEP, 0.0, &frictionless()).unwrap();
    assert_eq!(physics.read_vertices().unwrap().positions[b.index()], Vec3::Y);

    // Rest length 1, B held at twice that
    let (mut physics, b) = pendulum(SolverSettings::sequential(), Vec3::new(0.0, 2.0, 0.0), 0.5);
    physics.bake().unwrap();
    let mut last = 2.0f32;
    let expected = [1.875f32, 1.641_25, 1.328_5];
    for want in expected {
        physics.update(ONE_STEP, 0.0, &frictionless()).unwrap();
        let y = physics.read_vertices().unwrap().positions[b.index()].y;
        assert!(y < last, "y must decrease: {y} >= {last}");
        assert!(y > 1.0);
        assert!((y - want).abs() < 1e-3, "y = {y}, expected {want}");
        last = y;
    }
}

fn drop_onto_plane(plane_y: f32) -> VertexSnapshot {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let obj = physics.add_object().unwrap();
    physics.add_vertex(obj, Vec3::new(0.0, 5.0, 0.0), false).unwrap();
    physics.add_collider(Arc::new(SpatialIndex::build(&ground_triangle(10.0, plane_y)).unwrap()));
    physics.add_force(Gravity::down(1e-3));
    physics.bake().unwrap();

    let config = StepConfig::sticky();
    for _ in 0..240 {
        physics.update(FRAME, 0.0, &config).unwrap();
    }
    physics.read_vertices().unwrap()
}

#[test]
fn vertex_settles_on_ground_plane() {
    let s = drop_onto_plane(0.0);
    assert!(s.positions[0].y.abs() < 1e-4, "y = {}", s.positions[0].y);
    assert_eq!(s.forces[0].x, 0.0);
    assert_eq!(s.forces[0].z, 0.0);
}

#[test]
fn vertex_settles_on_raised_collider_with_full_friction() {
    let s = drop_onto_plane(1.0);
    let p = s.positions[0];
    assert!((p.y - 1.0).abs() < 1e-4, "y = {}", p.y);
    assert!(p.x.abs() < 1e-4 && p.z.abs() < 1e-4);
    assert_eq!(s.forces[0].length(), 0.0);
}

#[test]
fn frictionless_contact_keeps_carried_force() {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let obj = physics.add_object().unwrap();
    physics.add_vertex(obj, Vec3::new(0.0, 1.05, 0.0), false).unwrap();
    physics.add_collider(Arc::new(SpatialIndex::build(&ground_triangle(10.0, 1.0)).unwrap()));
    physics.add_force(Gravity::down(0.1));
    physics.bake().unwrap();

    physics.update(ONE_STEP, 0.0, &StepConfig::frictionless()).unwrap();
    let s = physics.read_vertices().unwrap();
    assert!((s.positions[0].y - 1.0).abs() < 1e-5);
    assert!((s.forces[0].y + 0.05).abs() < 1e-5);
}

#[test]
fn only_first_collider_is_used() {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let first = SpatialIndex::build(&ground_triangle(10.0, 1.0)).unwrap();
    let second = SpatialIndex::build(&uv_sphere(Vec3::ZERO, 1.0, 6, 8)).unwrap();
    physics.add_collider(Arc::new(first));
    physics.add_collider(Arc::new(second));
    assert_eq!(physics.collider().unwrap().triangle_count(), 1);
}

// ─── Misuse ───────────────────────────────────────────────────

#[test]
fn topology_calls_after_bake_are_rejected() {
    let mut bus = EventBus::new();
    let sink = VecSink::new();
    let events = sink.events();
    bus.add_sink(Box::new(sink));

    let mut physics = VerletPhysics::new(SolverSettings::sequential()).with_events(bus.sender());
    let obj = physics.add_object().unwrap();
    let a = physics.add_vertex(obj, Vec3::ZERO, false).unwrap();
    let b = physics.add_vertex(obj, Vec3::Y, false).unwrap();
    physics.add_spring_default(obj, a, b).unwrap();
    physics.bake().unwrap();

    assert!(matches!(
        physics.add_vertex(obj, Vec3::ONE, false),
        Err(HanamiError::AlreadyBaked { .. })
    ));
    assert!(physics.add_spring_default(obj, a, b).unwrap_err().is_misuse());
    assert!(physics.add_object().is_err());
    assert!(physics.bake().is_err());
    assert_eq!(physics.vertex_count(), 2);
    assert_eq!(physics.spring_count(), 1);

    bus.flush();
    let collected = events.snapshot();
    assert!(matches!(collected[0].kind, EventKind::Baked { vertices: 2, springs: 1, .. }));
    assert_eq!(collected.iter().filter(|e| e.is_misuse()).count(), 4);
}

#[test]
fn update_before_bake_is_rejected() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::Y, 1.0);
    let err = physics.update(FRAME, 0.0, &StepConfig::default()).unwrap_err();
    assert!(matches!(err, HanamiError::NotBaked { .. }));
    assert_eq!(physics.frame(), 0);
    assert!(physics.read_vertices().is_err());
    assert!(physics.read_springs().is_err());
}

#[test]
fn bad_handles_are_rejected() {
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let first = physics.add_object().unwrap();
    let a = physics.add_vertex(first, Vec3::ZERO, false).unwrap();
    let second = physics.add_object().unwrap();
    let b = physics.add_vertex(second, Vec3::Y, false).unwrap();

    assert!(matches!(
        physics.add_vertex(first, Vec3::ONE, false),
        Err(HanamiError::ObjectClosed(0))
    ));
    assert!(matches!(
        physics.add_spring_default(second, a, b),
        Err(HanamiError::UnknownVertex { vertex: 0, object: 1 })
    ));
    assert!(matches!(
        physics.add_vertex(ObjectId(9), Vec3::ONE, false),
        Err(HanamiError::UnknownObject(9))
    ));
    assert!(physics
        .reset_object(ObjectId(9), Vec3::ZERO, Quat::IDENTITY)
        .is_err());
    assert_eq!(physics.vertex_count(), 2);
    assert_eq!(physics.spring_count(), 0);
}

// ─── Read-back ────────────────────────────────────────────────

fn readback_settings() -> SolverSettings {
    SolverSettings {
        readback_period: 5,
        ..SolverSettings::sequential()
    }
}

#[test]
fn periodic_readback_publishes_object_positions() {
    let mut physics = petal_field(readback_settings(), 3, 2);
    physics.add_force(Gravity::down(1e-4));
    physics.bake().unwrap();
    assert_eq!(physics.object_positions().len(), 3);

    let pending = physics.request_object_positions();
    let mut scheduled = Vec::new();
    for _ in 0..5 {
        scheduled.push(physics.update(FRAME, 0.0, &StepConfig::default()).unwrap().readback_scheduled);
    }
    assert_eq!(scheduled, vec![false, false, false, false, true]);

    let readback = pending.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(readback.frame, 5);
    assert_eq!(readback.positions.len(), 3);
    assert_eq!(physics.object_positions(), readback.positions.as_slice());

    let first_vertex = physics.object(ObjectId(1)).unwrap().vertex_start as usize;
    // Gathered before the frame's sub-steps, so it lags the live state
    let live = physics.read_vertices().unwrap().positions[first_vertex];
    assert!(readback.positions[1].y > live.y);
}

#[test]
fn reset_wins_over_an_older_readback() {
    let mut physics = petal_field(readback_settings(), 1, 2);
    physics.bake().unwrap();
    let pending = physics.request_object_positions();
    for _ in 0..5 {
        physics.update(FRAME, 0.0, &StepConfig::default()).unwrap();
    }
    let target = Vec3::new(3.0, 3.0, 3.0);
    physics.reset_object(ObjectId(0), target, Quat::IDENTITY).unwrap();
    pending.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(physics.object_positions()[0], target);
}

#[test]
fn spring_wireframe_matches_vertex_positions() {
    let (mut physics, b) = pendulum(SolverSettings::sequential(), Vec3::new(0.0, 2.0, 0.0), 0.5);
    physics.bake().unwrap();
    physics.update(FRAME, 0.0, &StepConfig::default()).unwrap();
    let s = physics.read_vertices().unwrap();
    let lines = physics.read_springs().unwrap();
    assert_eq!(lines, vec![[s.positions[0], s.positions[b.index()]]]);
}

#[test]
fn snapshot_bincode_roundtrip() {
    let mut physics = petal_field(SolverSettings::sequential(), 1, 9);
    physics.bake().unwrap();
    physics.update(FRAME, 0.0, &StepConfig::default()).unwrap();
    let snapshot = physics.read_vertices().unwrap();

    let bytes = snapshot.to_bytes().unwrap();
    let recovered = VertexSnapshot::from_bytes(&bytes).unwrap();
    assert_eq!(recovered, snapshot);
    assert!(VertexSnapshot::from_bytes(&bytes[..3]).is_err());
}

// ─── Configuration ────────────────────────────────────────────

#[test]
fn default_configs_validate() {
    assert!(StepConfig::default().validate().is_ok());
    assert!(StepConfig::sticky().validate().is_ok());
    assert!(SolverSettings::default().validate().is_ok());
}

#[test]
fn out_of_range_tunables_are_rejected() {
    let stiff = StepConfig {
        stiffness: 0.6,
        ..Default::default()
    };
    assert!(stiff.validate().is_err());
    let slippery = StepConfig {
        friction: 1.5,
        ..Default::default()
    };
    assert!(slippery.validate().is_err());
    let never = SolverSettings {
        readback_period: 0,
        ..Default::default()
    };
    assert!(never.validate().is_err());
}

#[test]
fn config_toml_roundtrip() {
    let config = StepConfig {
        stiffness: 0.3,
        ground_height: -1.0,
        ..Default::default()
    };
    let text = toml::to_string(&config).unwrap();
    let recovered: StepConfig = toml::from_str(&text).unwrap();
    assert_eq!(recovered, config);

    let partial: SolverSettings = toml::from_str("backend = \"sequential\"\n").unwrap();
    assert_eq!(partial, SolverSettings::sequential());
}

#[test]
fn reports_serialize_to_json() {
    let (mut physics, _) = pendulum(SolverSettings::sequential(), Vec3::Y, 1.0);
    let bake = physics.bake().unwrap();
    let json = serde_json::to_string(&bake).unwrap();
    assert!(json.contains("\"springs\":1"));
}

// ─── Body plans ───────────────────────────────────────────────

#[test]
fn cloth_grid_spring_pattern() {
    let plan = BodyPlan::cloth_grid(4, 4, 0.04);
    assert_eq!(plan.vertex_count(), 25);
    // left + up + two diagonals + two-apart in each direction
    assert_eq!(plan.spring_count(), 20 + 20 + 16 + 16 + 15 + 15);
    assert!(plan.vertices().iter().all(|v| v.position.x == 0.0));

    let first = plan.springs()[0];
    assert_eq!((first.vertex0, first.vertex1), (1, 0));
    let p = plan.vertices();
    let d = p[1].position.distance(p[0].position);
    assert!((d - 0.04).abs() < 1e-6);
}

#[test]
fn instances_get_contiguous_ranges() {
    let plan = BodyPlan::cloth_grid(2, 3, 0.1);
    let mut physics = VerletPhysics::new(SolverSettings::sequential());
    let a = plan.instantiate(&mut physics).unwrap();
    let b = plan.instantiate(&mut physics).unwrap();

    let ra = physics.object(a).unwrap();
    let rb = physics.object(b).unwrap();
    assert_eq!(ra.vertex_range(), 0..12);
    assert_eq!(rb.vertex_range(), 12..24);
    assert_eq!(ra.spring_range(), 0..plan.spring_count());
    assert_eq!(rb.spring_range(), plan.spring_count()..2 * plan.spring_count());
    assert_eq!(physics.spring_count(), 2 * plan.spring_count());
}

#[test]
fn jitter_stays_in_plane_and_bounds() {
    let base = BodyPlan::cloth_grid(4, 4, 0.04);
    let mut rng = StdRng::seed_from_u64(42);
    let mut jittered = base.clone();
    jittered.jitter(0.008, &mut rng);
    for (a, b) in base.vertices().iter().zip(jittered.vertices()) {
        let d = b.position - a.position;
        assert_eq!(d.x, 0.0);
        assert!(d.y.abs() <= 0.008 + 1e-7 && d.z.abs() <= 0.008 + 1e-7);
    }
    assert_ne!(base, jittered);
}

#[test]
fn displace_vertices_sees_indices() {
    let mut plan = BodyPlan::cloth_grid(1, 1, 1.0);
    plan.displace_vertices(|i, p| p + Vec3::X * i as f32);
    let xs: Vec<f32> = plan.vertices().iter().map(|v| v.position.x).collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
}

// ─── Respawn sweep ────────────────────────────────────────────

#[test]
fn sweep_walks_objects_round_robin() {
    let sweep = RespawnSweep {
        checks_per_frame: 2,
        bound: 10.0,
    };
    let positions: Vec<Vec3> = [11.0, 0.0, 12.0, 13.0, 20.0]
        .iter()
        .map(|&x| Vec3::new(x, 0.0, 0.0))
        .collect();

    assert_eq!(sweep.due(0, &positions), vec![ObjectId(0)]);
    assert_eq!(sweep.due(1, &positions), vec![ObjectId(2), ObjectId(3)]);
    assert_eq!(sweep.due(2, &positions), vec![ObjectId(4), ObjectId(0)]);
}

#[test]
fn sweep_handles_small_and_empty_sets() {
    let sweep = RespawnSweep::default();
    assert!(sweep.due(3, &[]).is_empty());
    let positions = vec![Vec3::new(15.0, 0.0, 0.0), Vec3::ZERO];
    assert_eq!(sweep.due(0, &positions), vec![ObjectId(0)]);
}
