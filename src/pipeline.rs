//! Corpus passes: orchestration from annotation files to output bundles.
//!
//! Two independent passes, each single-threaded and single-shot:
//!
//! - [`run_fitness_pass`]: fitness corpus → feature/label arrays with a
//!   stratified three-way split.
//! - [`run_pose_pass`]: paired 2D/3D pose-estimation corpora → normalized
//!   coordinate/rotation arrays with a two-way split.
//!
//! Per-record problems are tallied and logged, never fatal; a pass only
//! fails when a corpus is empty, produces zero usable samples, or an output
//! artifact cannot be written. File enumeration is sorted so results do not
//! depend on directory iteration order.

use ndarray::{Array1, Array2};
use serde::Serialize;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::dataset::{
    split_two_way, DatasetSplit, Provenance, Sample, SampleSet,
};
use crate::error::{
    ConfigError, PipelineError, PipelineResult, SkipReason, SkipTally,
};
use crate::export;
use crate::features::FeatureExtractor;
use crate::labels::{ExerciseNameMap, LabelMap};
use crate::matcher::{CrossCorpusMatcher, MatchOutcome};
use crate::normalize::{degrees_to_radians, normalize_centroid, normalize_image_frame};
use crate::parse;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of a fitness-corpus pass.
#[derive(Debug, Serialize)]
pub struct FitnessReport {
    /// Annotation files discovered.
    pub files: usize,
    /// Samples that survived all filters.
    pub samples: usize,
    /// Rows per partition, in train/val/test order.
    pub partition_sizes: [usize; 3],
    /// Whether the split preserved per-class proportions.
    pub stratified: bool,
    /// Skip counters accumulated during the pass.
    pub skips: SkipTally,
    /// Path of the written NPZ bundle.
    pub bundle: PathBuf,
    /// Path of the written metadata document.
    pub metadata: PathBuf,
}

/// Outcome of a pose-estimation-corpus pass.
#[derive(Debug, Serialize)]
pub struct PoseReport {
    /// 2D annotation files discovered.
    pub files: usize,
    /// Matched 2D/3D pairs that became rows.
    pub pairs: usize,
    /// Rows per partition, in train/val order.
    pub partition_sizes: [usize; 2],
    /// Skip counters accumulated during the pass.
    pub skips: SkipTally,
    /// Path of the written NPZ bundle.
    pub bundle: PathBuf,
    /// Path of the written metadata document.
    pub metadata: PathBuf,
}

// ---------------------------------------------------------------------------
// File discovery
// ---------------------------------------------------------------------------

/// Recursively collect `.json` files under `root`, sorted by path.
fn discover_json(root: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_json(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_json(dir: &Path, files: &mut Vec<PathBuf>) -> PipelineResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_json(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    Ok(())
}

/// Whether a fitness annotation file name marks the 3D variant of a clip,
/// which this pass does not consume.
fn is_3d_variant(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains("-3d"))
}

// ---------------------------------------------------------------------------
// Fitness pass
// ---------------------------------------------------------------------------

/// Run the fitness pass: discover, parse, filter, extract, split, export.
pub fn run_fitness_pass(config: &PipelineConfig) -> PipelineResult<FitnessReport> {
    config.validate()?;
    if !config.has_fitness_corpus() {
        return Err(ConfigError::invalid_value(
            "fitness_dirs",
            "the fitness pass requires at least one corpus root",
        )
        .into());
    }

    let mut files = Vec::new();
    for root in &config.fitness_dirs {
        files.extend(discover_json(root)?);
    }
    files.retain(|p| !is_3d_variant(p));
    files.sort();
    if files.is_empty() {
        return Err(PipelineError::EmptyCorpus { root: config.fitness_dirs[0].clone() });
    }
    info!(files = files.len(), "fitness pass: discovered annotation files");

    let names = ExerciseNameMap::new();
    let label_map = LabelMap::new(&config.target_exercises);
    let extractor = FeatureExtractor::new(config.feature_type, config.normalize_method);

    let mut set = SampleSet::new(extractor.dim());
    let mut skips = SkipTally::default();

    for path in &files {
        let clip = match parse::parse_fitness_clip(path, &names) {
            Ok(clip) => clip,
            Err(rejection) => {
                warn!(path = %path.display(), %rejection, "skipping clip");
                skips.record(rejection.reason);
                continue;
            }
        };
        skips.unknown_joint_keys += clip.unknown_joint_keys;

        let Some(exercise_id) = label_map.id_of(&clip.exercise) else {
            debug!(exercise = %clip.exercise, file = %clip.file_name, "not a target class");
            skips.record(SkipReason::UnknownExercise);
            continue;
        };

        let frames = if config.use_all_frames { &clip.frames[..] } else { &clip.frames[..1] };
        for (frame_idx, frame) in frames.iter().enumerate() {
            let selected: Vec<&(String, parse::KeypointSet)> = if config.use_all_views {
                frame.views.iter().collect()
            } else {
                let preferred = frame
                    .views
                    .iter()
                    .find(|(name, _)| *name == config.preferred_view)
                    .or_else(|| frame.views.first());
                preferred.into_iter().collect()
            };

            for (view_name, keypoints) in selected {
                if keypoints.visible_count() < config.min_visible_joints {
                    skips.record(SkipReason::InsufficientVisibility);
                    continue;
                }
                let features = extractor.extract(&keypoints.coords, &keypoints.visibility);
                set.push(Sample {
                    features,
                    exercise_id,
                    posture_correct: clip.is_correct,
                    provenance: Provenance {
                        file: clip.file_name.clone(),
                        exercise: clip.exercise.clone(),
                        exercise_kr: clip.exercise_kr.clone(),
                        exercise_id,
                        frame: frame_idx,
                        view: view_name.clone(),
                        conditions: clip.conditions.clone(),
                        is_correct: clip.is_correct,
                    },
                });
            }
        }
    }

    if set.is_empty() {
        return Err(PipelineError::NoUsableSamples { skipped: skips.total_skipped() });
    }
    info!(samples = set.len(), classes = set.class_counts().len(), "fitness pass: assembled");

    let split = DatasetSplit::from_samples(&set, config.seed, config.test_size, config.val_size);
    let bundle = export::write_fitness_bundle(&config.output_dir, &split)?;
    let metadata_doc = export::fitness_metadata(
        &split,
        &config.target_exercises,
        config.feature_type,
        config.normalize_method,
        config.seed,
        &skips,
    );
    let metadata = export::write_fitness_metadata(&config.output_dir, &metadata_doc)?;

    Ok(FitnessReport {
        files: files.len(),
        samples: set.len(),
        partition_sizes: [split.train.len(), split.val.len(), split.test.len()],
        stratified: split.stratified,
        skips,
        bundle,
        metadata,
    })
}

// ---------------------------------------------------------------------------
// Pose-estimation pass
// ---------------------------------------------------------------------------

/// Run the pose-estimation pass: enumerate 2D files, pair each with its 3D
/// counterpart, normalize, split two ways, export.
pub fn run_pose_pass(config: &PipelineConfig) -> PipelineResult<PoseReport> {
    config.validate()?;
    let (Some(root_2d), Some(root_3d)) = (&config.pose_2d_dir, &config.pose_3d_dir) else {
        return Err(ConfigError::invalid_value(
            "pose_2d_dir",
            "the pose-estimation pass requires both corpus roots",
        )
        .into());
    };

    let files = discover_json(root_2d)?;
    if files.is_empty() {
        return Err(PipelineError::EmptyCorpus { root: root_2d.clone() });
    }
    info!(files = files.len(), "pose pass: discovered 2D annotation files");

    let mut matcher = CrossCorpusMatcher::new(root_3d);
    let mut skips = SkipTally::default();
    let mut x_rows: Vec<Array1<f32>> = Vec::new();
    let mut y_rows: Vec<Array1<f32>> = Vec::new();
    let mut r_rows: Vec<Array1<f32>> = Vec::new();

    for path in &files {
        let record = match parse::parse_pose2d(path) {
            Ok(record) => record,
            Err(rejection) => {
                warn!(path = %path.display(), %rejection, "skipping 2D record");
                skips.record(rejection.reason);
                continue;
            }
        };

        let counterpart = match matcher.resolve(&record.key) {
            MatchOutcome::Matched(p) => p,
            MatchOutcome::Ambiguous { chosen, .. } => {
                skips.ambiguous_matches += 1;
                chosen
            }
            MatchOutcome::NotFound => {
                skips.record(SkipReason::UnmatchedRecord);
                continue;
            }
        };

        let record_3d = match parse::parse_pose3d(&counterpart) {
            Ok(record) => record,
            Err(rejection) => {
                warn!(path = %counterpart.display(), %rejection, "skipping 3D record");
                skips.record(rejection.reason);
                continue;
            }
        };

        let x = normalize_image_frame(&record.coords, config.img_width, config.img_height);
        let y = normalize_centroid(&record_3d.coords, config.pose_3d_scale);
        let r = degrees_to_radians(&record_3d.rotations);
        x_rows.push(row(&x));
        y_rows.push(row(&y));
        r_rows.push(row(&r));
    }

    if x_rows.is_empty() {
        return Err(PipelineError::NoUsableSamples { skipped: skips.total_skipped() });
    }
    let pairs = x_rows.len();
    info!(pairs, "pose pass: matched and normalized");

    let (train, val) = split_two_way(pairs, config.seed, config.pose_val_size);
    let arrays = export::PoseArrays {
        x_train: stack(&x_rows, &train),
        y_train: stack(&y_rows, &train),
        r_train: stack(&r_rows, &train),
        x_val: stack(&x_rows, &val),
        y_val: stack(&y_rows, &val),
        r_val: stack(&r_rows, &val),
    };

    let bundle = export::write_pose_bundle(
        &config.output_dir,
        &arrays,
        config.img_width,
        config.img_height,
        config.pose_3d_scale,
    )?;
    let metadata_doc = export::pose_metadata(
        &arrays,
        config.seed,
        config.img_width,
        config.img_height,
        config.pose_3d_scale,
        &skips,
    );
    let metadata = export::write_pose_metadata(&config.output_dir, &metadata_doc)?;

    Ok(PoseReport {
        files: files.len(),
        pairs,
        partition_sizes: [train.len(), val.len()],
        skips,
        bundle,
        metadata,
    })
}

/// Row-major flatten of one `(24, D)` record into a `(24 * D,)` row.
fn row(coords: &Array2<f32>) -> Array1<f32> {
    Array1::from_iter(coords.iter().copied())
}

/// Gather rows by index into a dense matrix.
fn stack(rows: &[Array1<f32>], indices: &[usize]) -> Array2<f32> {
    let dim = rows.first().map_or(0, Array1::len);
    let mut out = Array2::zeros((indices.len(), dim));
    for (r, &i) in indices.iter().enumerate() {
        out.row_mut(r).assign(&rows[i]);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
