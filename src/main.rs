//! Gestura headless runner.
//!
//! Plays a scripted gesture session against a preset and logs what the
//! simulation does. Useful for tuning presets without a camera or a window.
//!
//! # Usage
//!
//! ```bash
//! # Default preset, 600 frames
//! cargo run --features cli
//!
//! # With the installed binary
//! gestura
//!
//! # Big bang with fewer particles and debug logs
//! gestura --preset big_bang --particles 2000 --log-level debug
//!
//! # Run a saved config
//! gestura --config scene.json --frames 1200
//! ```

use anyhow::Context;
use clap::Parser;
use gestura::gesture::poses;
use gestura::prelude::*;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Gestura headless runner
#[derive(Parser, Debug)]
#[command(name = "gestura")]
#[command(author, version, about = "Scripted gesture session against a particle preset", long_about = None)]
struct Cli {
    /// Preset name: shape_morph, floating_shapes, big_bang, galaxy_drift
    #[arg(short, long, default_value = "shape_morph")]
    preset: String,

    /// Load a JSON config instead of a preset
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Write the resolved config to this path and exit
    #[arg(long)]
    dump_config: Option<std::path::PathBuf>,

    /// Override the template
    #[arg(short, long)]
    template: Option<String>,

    /// Override the particle count
    #[arg(long)]
    particles: Option<u32>,

    /// Frames to simulate
    #[arg(short, long, default_value = "600")]
    frames: u32,

    /// Random seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Log every N frames
    #[arg(long, default_value = "60")]
    report_every: u32,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Gestura v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => cli.preset.parse::<Preset>()?.config(),
    };
    if let Some(name) = &cli.template {
        config.template = name.parse()?;
    }
    if let Some(count) = cli.particles {
        config.particle_count = count;
    }

    if let Some(path) = &cli.dump_config {
        config.validate()?;
        config
            .save(path)
            .with_context(|| format!("writing config {}", path.display()))?;
        info!(path = %path.display(), "config written");
        return Ok(());
    }

    let channel = DetectorChannel::new();
    let mut sim = Simulation::new(config, cli.seed)?.with_detector(channel.clone());

    run_session(&mut sim, &channel, cli.frames, cli.report_every.max(1));
    Ok(())
}

/// One scripted pass through every gesture.
fn run_session(sim: &mut Simulation, channel: &DetectorChannel, frames: u32, report_every: u32) {
    const DT: f32 = 1.0 / 60.0;
    let templates = ShapeTemplate::ALL;

    for frame in 0..frames {
        let progress = frame as f32 / frames.max(1) as f32;

        // Detectors are slower than the frame loop.
        if frame % 3 == 0 {
            channel.publish(scripted_frame(progress, frame));
        }

        // Morph through a few templates along the way.
        if frame > 0 && frame % (frames / 4).max(1) == 0 {
            let next = templates[(frame / (frames / 4).max(1)) as usize % templates.len()];
            sim.set_template(next);
        }

        let stats = sim.step(DT);
        let dirty = sim.take_dirty();

        if frame % report_every == 0 || frame + 1 == frames {
            let influence = sim.influence();
            info!(
                frame,
                gesture = %influence.gesture,
                mode = ?influence.mode,
                phase = ?sim.phase(),
                palette = %sim.palette(),
                speed = influence.speed_multiplier,
                expansion = influence.expansion_level,
                max_speed = stats.max_speed,
                mean_speed = stats.mean_speed,
                respawned = stats.respawned,
                shockwaves = sim.effects().len(),
                upload = dirty.any(),
                "frame"
            );
        }
    }

    info!(
        elapsed = ?sim.elapsed(),
        rotation = sim.rotation(),
        mean_target_distance = sim.particles().mean_target_distance(),
        "session finished"
    );
}

fn scripted_frame(progress: f32, frame: u32) -> DetectorFrame {
    // Sweep the hand slowly across the image.
    let sway = (frame as f32 * 0.02).sin() * 0.2;
    let hand = match progress {
        p if p < 0.10 => return DetectorFrame::Absent,
        p if p < 0.25 => poses::open_hand(),
        p if p < 0.40 => poses::fist(),
        p if p < 0.50 => poses::open_hand(),
        p if p < 0.60 => poses::peace(),
        p if p < 0.70 => poses::thumbs_up(),
        p if p < 0.80 => poses::pinch(),
        p if p < 0.90 => {
            return DetectorFrame::Pointer {
                position: Vec2::new(0.5 + sway, 0.5),
                pressed: frame % 45 == 0,
            }
        }
        _ => return DetectorFrame::Absent,
    };
    DetectorFrame::Hand(shifted(hand, sway))
}

fn shifted(hand: HandLandmarks, dx: f32) -> HandLandmarks {
    let points = *hand.points();
    HandLandmarks::new(points.map(|p| Landmark { x: p.x + dx, ..p }))
}
