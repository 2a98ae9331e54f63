use crate::camera::CameraSource;
use crate::config::{load_config, load_config_from, Config};
use crate::detector::{resolve_model_path, FaceDetector};
use crate::report::Reporter;
use crate::runner::{run, Summary};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "facewatch",
    version,
    about = "Realtime face detection from a camera"
)]
pub struct Cli {
    /// Path to the ONNX face detection model
    #[arg(short, long)]
    pub model: Option<PathBuf>,
    /// Camera device index
    #[arg(long, default_value_t = 0)]
    pub camera: u32,
    /// Path to a JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn run_cli() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match execute(cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Startup sequence: config, model, camera, interrupt handler, then the
/// detection loop. Model or camera failure aborts with a non-zero exit.
pub fn execute(cli: Cli) -> Result<Summary> {
    let cfg = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    banner(&cfg);

    println!("loading detection model...");
    let model_path = resolve_model_path(cli.model)?;
    let mut detector = FaceDetector::load(&model_path)?;
    println!("model loaded from {}", model_path.display());

    println!("initializing camera {}...", cli.camera);
    let mut source = CameraSource::open(cli.camera, cfg.width, cfg.height)?;
    println!("camera started, press Ctrl+C to stop");
    println!("{}", "-".repeat(50));

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("failed to install interrupt handler")?;

    let reporter = Reporter::new(cfg.min_confidence);
    run(&cfg, &mut source, &mut detector, &reporter, &shutdown)
}

fn banner(cfg: &Config) {
    println!("facewatch - realtime face detection");
    println!("{}", "=".repeat(50));
    println!("resolution: {}x{}", cfg.width, cfg.height);
    println!("confidence threshold: {}", cfg.min_confidence);
    println!(
        "detecting every {} frame(s), stats every {} frame(s)",
        cfg.detect_interval, cfg.stats_interval
    );
}
