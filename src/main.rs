//! Headless driver for the particle engine.
//!
//! Loads a trajectory document (or generates a sample system), runs the
//! frame loop for a bounded time, and logs playback, readback and chain
//! statistics. Set `RUST_LOG=debug` for per-frame detail.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use atomstream::engine::ComputeMode;
use atomstream::gpu::probe;
use atomstream::options::Options;
use atomstream::trajectory::synth::SampleKind;
use atomstream::{AtomstreamError, ParticleEngine};
use clap::{Parser, ValueEnum};
use web_time::Instant;

/// Sleep between frame-loop iterations.
const TICK: Duration = Duration::from_millis(8);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Sample {
    Water,
    Helix,
    Nanocluster,
}

impl From<Sample> for SampleKind {
    fn from(sample: Sample) -> Self {
        match sample {
            Sample::Water => Self::Water,
            Sample::Helix => Self::Helix,
            Sample::Nanocluster => Self::Nanocluster,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "atomstream", version, about = "Stream a particle trajectory through the compute pipeline")]
struct Args {
    /// Trajectory JSON document.
    #[arg(required_unless_present = "synth")]
    path: Option<PathBuf>,
    /// Generate a sample system instead of reading a file.
    #[arg(long, value_enum, conflicts_with = "path")]
    synth: Option<Sample>,
    /// Frames to generate with `--synth`.
    #[arg(long, default_value_t = 20)]
    frames: usize,
    /// RNG seed for `--synth`.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// TOML options preset.
    #[arg(long)]
    options: Option<PathBuf>,
    /// How long to run the frame loop.
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,
    /// Override the playback rate.
    #[arg(long)]
    fps: Option<f32>,
    /// Skip the GPU and run the host path.
    #[arg(long)]
    host: bool,
    /// Chain to select once loaded.
    #[arg(long)]
    select: Option<String>,
}

fn run(args: Args) -> Result<(), AtomstreamError> {
    let mut options = match &args.options {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    if args.host {
        options.compute.prefer_gpu = false;
    }
    if let Some(fps) = args.fps {
        options.playback.fps = fps;
    }

    if options.compute.prefer_gpu && !pollster::block_on(probe(&options.compute)) {
        log::info!("no compute-capable adapter found");
    }
    let mut engine = pollster::block_on(ParticleEngine::new(options));
    match engine.mode() {
        ComputeMode::Gpu { adapter } => log::info!("running on GPU: {adapter}"),
        ComputeMode::Host { cause, .. } => log::info!("running on host path (cause: {cause:?})"),
    }

    let now = Instant::now();
    match (args.synth, &args.path) {
        (Some(sample), _) => {
            let doc = SampleKind::from(sample).generate(args.frames, args.seed);
            engine.load_document(doc, now)?;
        }
        (None, Some(path)) => engine.load_path(path, now)?,
        (None, None) => return Ok(()),
    }

    if let Some(chain) = &args.select {
        engine.select(chain);
        match engine.selected_info() {
            Some(info) => log::info!(
                "selected chain {}: {} atoms, {} residues {:?}",
                info.chain_id,
                info.atom_count,
                info.unique_residue_count,
                info.range_or_zero()
            ),
            None => log::warn!("chain '{chain}' is not present in the trajectory"),
        }
    }

    let run_for = Duration::try_from_secs_f64(args.seconds).unwrap_or(Duration::ZERO);
    let end = Instant::now() + run_for;
    loop {
        let now = Instant::now();
        if now >= end {
            break;
        }
        let report = engine.update(now);
        if let Some(index) = report.advanced_to {
            log::debug!("frame {index}");
        }
        if let Some(kind) = report.fallback {
            log::warn!("compute fell back to host path after {kind:?}");
        }
        std::thread::sleep(TICK);
    }

    for info in engine.groups().iter() {
        log::info!(
            "chain {}: {} atoms, {} residues, range {:?}, top {:?}",
            info.chain_id,
            info.atom_count,
            info.unique_residue_count,
            info.range_or_zero(),
            info.top_residues
        );
    }
    let stats = engine.stats();
    log::info!(
        "submitted {} / completed {} / skipped {} / discarded {} / fallbacks {} on {}",
        stats.submitted,
        stats.completed,
        stats.skipped,
        stats.discarded,
        stats.fallbacks,
        engine.backend_name()
    );

    engine.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
