//! `preprocess` binary — entry point for the dataset-construction pipeline.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin preprocess -- pipeline.json
//! RUST_LOG=debug cargo run --bin preprocess -- pipeline.json
//! ```
//!
//! The single argument is a JSON configuration file; without it the default
//! [`PipelineConfig`] is used (which runs nothing, since no corpus roots are
//! configured). Richer argument handling belongs to the surrounding tooling,
//! not this driver.

use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pose_prep::config::PipelineConfig;
use pose_prep::pipeline::{run_fitness_pass, run_pose_pass};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("pose-prep dataset pipeline v{}", pose_prep::VERSION);

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            match PipelineConfig::from_json(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    error!("Failed to load configuration: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            info!("No configuration file provided — using defaults");
            PipelineConfig::default()
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {e}");
        std::process::exit(1);
    }
    info!("  feature type : {:?} ({} dims)", config.feature_type, config.feature_type.dim());
    info!("  normalization: {:?}", config.normalize_method);
    info!("  split        : test {} / val {}", config.test_size, config.val_size);
    info!("  seed         : {}", config.seed);
    info!("  output dir   : {}", config.output_dir.display());

    let mut ran_any = false;

    if config.has_fitness_corpus() {
        ran_any = true;
        match run_fitness_pass(&config) {
            Ok(report) => {
                info!(
                    "Fitness pass: {} files, {} samples → train/val/test {:?}{}",
                    report.files,
                    report.samples,
                    report.partition_sizes,
                    if report.stratified { "" } else { " (unstratified)" },
                );
                info!("  skips: {}", report.skips);
                info!("  bundle: {}", report.bundle.display());
            }
            Err(e) => {
                error!("Fitness pass failed: {e}");
                std::process::exit(1);
            }
        }
    }

    if config.has_pose_corpus() {
        ran_any = true;
        match run_pose_pass(&config) {
            Ok(report) => {
                info!(
                    "Pose pass: {} files, {} pairs → train/val {:?}",
                    report.files, report.pairs, report.partition_sizes,
                );
                info!("  skips: {}", report.skips);
                info!("  bundle: {}", report.bundle.display());
            }
            Err(e) => {
                error!("Pose pass failed: {e}");
                std::process::exit(1);
            }
        }
    }

    if !ran_any {
        error!("No corpus roots configured — nothing to do");
        std::process::exit(1);
    }
}
