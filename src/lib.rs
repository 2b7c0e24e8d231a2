//! # pose-prep: model-ready dataset construction for body-pose corpora
//!
//! This crate turns heterogeneous per-frame body-pose annotation corpora
//! into numeric, model-ready datasets. It ingests a paired 2D/3D
//! pose-estimation JSON corpus and a fitness-exercise annotation corpus,
//! normalizes coordinates, derives joint-angle features and labels, and
//! writes compressed NPZ bundles plus metadata documents with reproducible
//! train/validation/test splits.
//!
//! ## Architecture
//!
//! ```text
//! PipelineConfig ──► pipeline::run_fitness_pass ──► export (NPZ + metadata)
//!       │                    │
//!       │         parse ──► labels ──► features ──► dataset (split)
//!       │                               │
//!       │                           normalize
//!       │
//!       └──► pipeline::run_pose_pass
//!                    │
//!          parse ──► matcher ──► normalize ──► dataset::split_two_way
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pose_prep::config::PipelineConfig;
//! use pose_prep::pipeline::run_fitness_pass;
//!
//! let mut config = PipelineConfig::default();
//! config.fitness_dirs = vec!["/data/fitness".into()];
//! config.output_dir = "processed_data".into();
//! config.validate().expect("config is valid");
//!
//! let report = run_fitness_pass(&config).expect("pass succeeds");
//! println!("train/val/test rows: {:?}", report.partition_sizes);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod features;
pub mod labels;
pub mod matcher;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod skeleton;

// Convenient re-exports at the crate root.
pub use config::PipelineConfig;
pub use dataset::{DatasetSplit, Provenance, Sample, SampleSet};
pub use error::{ConfigError, ExportError, PipelineError, PipelineResult, SkipReason, SkipTally};
pub use features::{FeatureExtractor, FeatureType};
pub use labels::{ExerciseNameMap, LabelMap};
pub use normalize::NormalizeMethod;
pub use pipeline::{run_fitness_pass, run_pose_pass, FitnessReport, PoseReport};
pub use skeleton::{Joint, NUM_ANGLES, NUM_JOINTS};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
