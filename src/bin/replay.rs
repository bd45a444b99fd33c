use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::info;
use serde::{Deserialize, Serialize};

use pdr_tracker_rs::{
    CorrectionMode, EngineState, MapCalibration, MapMatcher, OccupancyMap, PdrEngine, Position,
    Track, TrackerConfig, WindowSource,
};

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay recorded IMU logs through the PDR pipeline", long_about = None)]
struct Args {
    /// Accelerometer log (semicolon CSV, .gz accepted)
    #[arg(long)]
    accel: PathBuf,

    /// Gyroscope log (semicolon CSV, .gz accepted)
    #[arg(long)]
    gyro: PathBuf,

    /// Floorplan bitmap; omit to run pure dead reckoning
    #[arg(long)]
    map: Option<PathBuf>,

    /// JSON file with tracker config and map calibration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Window period in seconds
    #[arg(long, default_value = "0.5")]
    maxwait: f64,

    /// Map correction mode (corridor, nearest)
    #[arg(long, default_value = "corridor")]
    mode: String,

    /// Output directory
    #[arg(long, default_value = "pdr_sessions")]
    output_dir: String,
}

/// On-disk configuration: pipeline tunables plus map calibration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ReplayConfig {
    tracker: TrackerConfig,
    calibration: MapCalibration,
}

#[derive(Serialize)]
struct TrackOutput {
    positions: Vec<Position>,
    stats: Stats,
}

#[derive(Serialize, Default)]
struct Stats {
    windows: usize,
    skipped_windows: usize,
    steps: usize,
    collisions: usize,
    final_heading_bias_deg: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config: ReplayConfig = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ReplayConfig::default(),
    };

    let matcher = match &args.map {
        Some(path) => {
            let map = OccupancyMap::load(path, config.calibration)
                .with_context(|| format!("loading map {}", path.display()))?;
            info!("map loaded: {}x{} px", map.width(), map.height());
            let mode = match args.mode.as_str() {
                "corridor" => CorrectionMode::CorridorFeedback,
                "nearest" => CorrectionMode::NearestWalkable,
                other => anyhow::bail!("unknown correction mode '{}'", other),
            };
            Some(
                MapMatcher::new(Arc::new(map), config.tracker.correction_increment)
                    .with_mode(mode),
            )
        }
        None => None,
    };

    let engine = PdrEngine::new(config.tracker.clone(), matcher)?;
    let mut source = WindowSource::from_files(&args.accel, &args.gyro, args.maxwait)?;

    info!(
        "replaying {} + {} (stream ends at {:.1}s)",
        args.accel.display(),
        args.gyro.display(),
        source.max_timestamp()
    );

    let mut state = EngineState::seed(engine.config());
    let mut track = Track::new(engine.config().initial_position);
    let mut stats = Stats::default();

    while let Some(window) = source.next_window() {
        let (next, report) =
            engine.process_window(state, window.accel_cumulative, window.gyro_cumulative, &mut track);
        state = next;
        stats.windows += 1;
        if report.skipped {
            stats.skipped_windows += 1;
        }
        stats.steps += report.steps_emitted;
        stats.collisions += report.collisions;
    }
    stats.final_heading_bias_deg = state.heading_bias.to_degrees();

    println!("\n=== Replay Stats ===");
    println!("Windows processed: {} ({} skipped)", stats.windows, stats.skipped_windows);
    println!("Steps: {}", stats.steps);
    println!("Collisions: {}", stats.collisions);
    println!("Final heading bias: {:.2} deg", stats.final_heading_bias_deg);
    println!(
        "Final position: ({:.2}, {:.2}, {:.2})",
        state.current_position.x, state.current_position.y, state.current_position.z
    );

    std::fs::create_dir_all(&args.output_dir)?;
    let output = TrackOutput {
        positions: track.positions().to_vec(),
        stats,
    };
    let filename = format!(
        "{}/track_{}.json",
        args.output_dir,
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    let json = serde_json::to_string_pretty(&output)?;
    std::fs::write(&filename, json)?;
    println!("Track ({} positions) saved to {}", track.len(), filename);

    Ok(())
}
