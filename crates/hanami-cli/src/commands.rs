//! CLI command implementations.

use std::sync::Arc;

use glam::Vec3;
use hanami_bvh::{BuildOptions, SpatialIndex};
use hanami_mesh::TriangleMesh;
use hanami_physics::{Gravity, VerletPhysics, VertexSnapshot};
use hanami_telemetry::{EventBus, TracingSink};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::scene::SceneConfig;

/// Run a petal scene headless.
pub fn simulate(
    config_path: Option<&str>,
    frames: Option<u64>,
    output_path: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = match config_path {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    if let Some(frames) = frames {
        scene.frames = frames;
    }
    scene.validate()?;

    println!("Hanami Simulation");
    println!("─────────────────");
    println!("Config:    {}", config_path.unwrap_or("<defaults>"));
    println!("Petals:    {}", scene.instances);
    println!("Frames:    {}", scene.frames);
    println!("Backend:   {}", scene.solver.backend.name());
    println!();

    let mut bus = EventBus::new();
    bus.add_sink(Box::new(TracingSink::new(tracing::Level::DEBUG)));

    let mut physics = VerletPhysics::new(scene.solver.clone()).with_events(bus.sender());
    let options = BuildOptions {
        backend: scene.solver.backend,
        ..Default::default()
    };
    if let Some(index) = scene.collider.build(&options)? {
        physics.add_collider(Arc::new(index));
    }
    if scene.gravity != 0.0 {
        physics.add_force(Gravity::down(scene.gravity));
    }
    if let Some(wind) = scene.wind {
        physics.add_force(wind);
    }

    let mut rng = StdRng::seed_from_u64(scene.seed);
    for _ in 0..scene.instances {
        let plan = scene.petal_plan(&mut rng);
        let id = plan.instantiate(&mut physics)?;
        let (position, orientation) = scene.spawn.initial(&mut rng);
        physics.reset_object(id, position, orientation)?;
    }
    let baked = physics.bake()?;
    println!(
        "Baked:     {} objects, {} vertices, {} springs",
        baked.objects, baked.vertices, baked.springs
    );

    let start = std::time::Instant::now();
    let mut respawned = 0usize;
    let mut substeps = 0u64;
    for frame in 0..scene.frames {
        let elapsed = frame as f64 * scene.frame_interval;
        let report = physics.update(scene.frame_interval, elapsed, &scene.step)?;
        substeps += u64::from(report.substeps);

        let due = scene.respawn.due(frame, physics.object_positions());
        for id in due {
            let (position, orientation) = scene.spawn.respawn(&mut rng);
            physics.reset_object(id, position, orientation)?;
            respawned += 1;
        }
        bus.flush();
    }
    let wall = start.elapsed().as_secs_f64();

    let snapshot = physics.read_vertices()?;
    println!("Sub-steps: {substeps}");
    println!("Sim time:  {:.3}s", snapshot.sim_time);
    println!("Respawns:  {respawned}");
    println!("Wall time: {wall:.3}s");
    if let Some((min, max)) = snapshot.bounds() {
        println!("Bounds:    {min:.3} .. {max:.3}");
    }

    if let Some(path) = output_path {
        std::fs::write(path, snapshot.to_bytes()?)?;
        println!("Snapshot written to: {path}");
    }

    bus.finish();
    Ok(())
}

/// Cast one ray against the scene collider.
pub fn raycast(
    config_path: Option<&str>,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    let scene = match config_path {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    let Some(index) = scene.collider.build(&BuildOptions::default())? else {
        return Err("Scene has no collider".into());
    };

    println!(
        "Collider:  {} triangles, {} nodes, depth {}",
        index.triangle_count(),
        index.node_count(),
        index.max_depth(),
    );
    match index.intersect(origin, direction, max_distance) {
        Some(hit) => {
            let point = origin + direction * hit.distance;
            println!("Hit at distance {:.4}", hit.distance);
            println!("  point:  {point:.4}");
            println!("  normal: {:.4}", hit.normal);
        }
        None => println!("No hit within {max_distance}"),
    }
    Ok(())
}

/// Inspect a vertex snapshot.
pub fn inspect(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Hanami Snapshot Inspector");
    println!("────────────────────────");
    println!();

    let data = std::fs::read(path)?;
    let snapshot = VertexSnapshot::from_bytes(&data)?;

    println!("Frame:        {}", snapshot.frame);
    println!("Sim time:     {:.4}s", snapshot.sim_time);
    println!("Vertices:     {}", snapshot.vertex_count());
    println!("Fixed:        {}", snapshot.fixed.iter().filter(|&&f| f).count());

    if let Some((min, max)) = snapshot.bounds() {
        println!("Y range:      [{:.4}, {:.4}]", min.y, max.y);
        println!("X range:      [{:.4}, {:.4}]", min.x, max.x);
    }
    let peak = snapshot
        .forces
        .iter()
        .map(|f| f.length())
        .fold(0.0f32, f32::max);
    println!("Peak force:   {peak:.6e}");

    Ok(())
}

/// Validate a scene config or a collider mesh.
pub fn validate(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Hanami Validator");
    println!("────────────────");
    println!();

    if path.ends_with(".toml") {
        println!("Validating scene: {path}");
        let scene = SceneConfig::load(path)?;
        scene.validate()?;
        if let Some(mesh) = scene.collider.mesh()? {
            mesh.validate()?;
        }
        println!("✅ Scene is valid.");
    } else if path.ends_with(".json") {
        println!("Validating mesh: {path}");
        let content = std::fs::read_to_string(path)?;
        let mesh: TriangleMesh = serde_json::from_str(&content)?;
        let index = SpatialIndex::build(&mesh)?;
        println!("  Vertices:  {}", mesh.vertex_count());
        println!("  Triangles: {}", mesh.triangle_count());
        println!("  Nodes:     {}", index.node_count());
        println!("  Depth:     {}", index.max_depth());
        println!("✅ Mesh is valid.");
    } else {
        return Err(format!("Unsupported file type: {path} (expected .toml or .json)").into());
    }

    Ok(())
}
