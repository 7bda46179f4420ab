//! Hanami CLI: headless simulation, collider queries, and snapshot tools.

use clap::{Parser, Subcommand};
use glam::Vec3;
use tracing_subscriber::EnvFilter;

mod commands;
mod scene;

#[derive(Parser)]
#[command(name = "hanami")]
#[command(version, about = "Hanami: data-parallel petal simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a petal scene headless.
    Simulate {
        /// Path to scene config (TOML). Defaults are used when omitted.
        #[arg(short, long)]
        config: Option<String>,

        /// Override the number of frames.
        #[arg(short, long)]
        frames: Option<u64>,

        /// Write the final vertex snapshot here (bincode).
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Cast a ray against the scene collider.
    Raycast {
        /// Scene config providing the collider.
        #[arg(short, long)]
        config: Option<String>,

        /// Ray origin as x,y,z.
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        origin: Vec3,

        /// Ray direction as x,y,z.
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        direction: Vec3,

        #[arg(long, default_value_t = 1000.0)]
        max_distance: f32,
    },

    /// Validate a scene config (.toml) or collider mesh (.json).
    Validate {
        path: String,
    },

    /// Inspect a vertex snapshot file.
    Inspect {
        /// Path to snapshot file.
        path: String,
    },
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z, got '{s}'")),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            config,
            frames,
            output,
        } => commands::simulate(config.as_deref(), frames, output.as_deref()),
        Commands::Raycast {
            config,
            origin,
            direction,
            max_distance,
        } => commands::raycast(config.as_deref(), origin, direction, max_distance),
        Commands::Validate { path } => commands::validate(&path),
        Commands::Inspect { path } => commands::inspect(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
