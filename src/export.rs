//! Output artifacts: compressed NPZ bundles and metadata JSON documents.
//!
//! Each corpus pass produces one `.npz` bundle holding the numeric arrays
//! and one `.json` document describing how they were produced: feature
//! layout, class mapping, split sizes, skip tally, and per-row provenance.
//! The metadata is written pretty-printed so a run's outputs are inspectable
//! without loading the arrays.

use ndarray::{arr0, arr1, Array2};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::dataset::{DatasetSplit, Provenance};
use crate::error::{ExportError, SkipTally};
use crate::features::FeatureType;
use crate::normalize::NormalizeMethod;
use crate::skeleton::{JOINT_NAMES, SMPL_JOINT_NAMES};

/// File name of the fitness-corpus array bundle.
pub const FITNESS_BUNDLE: &str = "fitness_dataset.npz";
/// File name of the fitness-corpus metadata document.
pub const FITNESS_METADATA: &str = "fitness_metadata.json";
/// File name of the pose-estimation array bundle.
pub const POSE_BUNDLE: &str = "pose_dataset.npz";
/// File name of the pose-estimation metadata document.
pub const POSE_METADATA: &str = "pose_metadata.json";

// ---------------------------------------------------------------------------
// Fitness corpus
// ---------------------------------------------------------------------------

/// Metadata accompanying the fitness bundle.
#[derive(Debug, Serialize)]
pub struct FitnessMetadata<'a> {
    /// Feature-vector layout used for every row.
    pub feature_type: FeatureType,
    /// Feature dimensionality.
    pub feature_dim: usize,
    /// Adaptive-normalization mode.
    pub normalize_method: NormalizeMethod,
    /// Shuffle seed.
    pub seed: u64,
    /// Whether the split preserved per-class proportions.
    pub stratified: bool,
    /// Class names in id order.
    pub classes: &'a [String],
    /// Sample count per class name, over the whole corpus.
    pub class_counts: BTreeMap<String, usize>,
    /// Rows per partition, in train/val/test order.
    pub partition_sizes: [usize; 3],
    /// Skip counters accumulated during the pass.
    pub skips: &'a SkipTally,
    /// Canonical joint vocabulary, in array-row order.
    pub joint_names: [&'static str; 24],
    /// Per-row sample origins for each partition.
    pub provenance: SplitProvenance<'a>,
}

/// Per-partition provenance lists, row-aligned with the bundle arrays.
#[derive(Debug, Serialize)]
pub struct SplitProvenance<'a> {
    /// Training rows.
    pub train: &'a [Provenance],
    /// Validation rows.
    pub val: &'a [Provenance],
    /// Test rows.
    pub test: &'a [Provenance],
}

/// Write the fitness arrays as a compressed NPZ bundle.
///
/// Array names: `X_{train,val,test}`, `y_exercise_{train,val,test}`,
/// `y_posture_{train,val,test}`.
pub fn write_fitness_bundle(dir: &Path, split: &DatasetSplit) -> Result<PathBuf, ExportError> {
    let path = prepare(dir, FITNESS_BUNDLE)?;
    let file = File::create(&path).map_err(|e| ExportError::write(&path, e))?;
    let mut npz = ndarray_npy::NpzWriter::new_compressed(file);

    for (suffix, part) in
        [("train", &split.train), ("val", &split.val), ("test", &split.test)]
    {
        npz.add_array(format!("X_{suffix}"), &part.x)
            .map_err(|e| ExportError::npz(&path, e.to_string()))?;
        npz.add_array(format!("y_exercise_{suffix}"), &part.y_exercise)
            .map_err(|e| ExportError::npz(&path, e.to_string()))?;
        npz.add_array(format!("y_posture_{suffix}"), &part.y_posture)
            .map_err(|e| ExportError::npz(&path, e.to_string()))?;
    }
    npz.finish().map_err(|e| ExportError::npz(&path, e.to_string()))?;

    info!(
        path = %path.display(),
        train = split.train.len(),
        val = split.val.len(),
        test = split.test.len(),
        "wrote fitness bundle"
    );
    Ok(path)
}

/// Write the fitness metadata document next to the bundle.
pub fn write_fitness_metadata(
    dir: &Path,
    metadata: &FitnessMetadata<'_>,
) -> Result<PathBuf, ExportError> {
    write_json(dir, FITNESS_METADATA, metadata)
}

/// Build a [`FitnessMetadata`] from a finished split and its run context.
pub fn fitness_metadata<'a>(
    split: &'a DatasetSplit,
    classes: &'a [String],
    feature_type: FeatureType,
    normalize_method: NormalizeMethod,
    seed: u64,
    skips: &'a SkipTally,
) -> FitnessMetadata<'a> {
    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
    for part in [&split.train, &split.val, &split.test] {
        for &id in part.y_exercise.iter() {
            if let Some(name) = classes.get(id as usize) {
                *class_counts.entry(name.clone()).or_insert(0) += 1;
            }
        }
    }
    FitnessMetadata {
        feature_type,
        feature_dim: feature_type.dim(),
        normalize_method,
        seed,
        stratified: split.stratified,
        classes,
        class_counts,
        partition_sizes: [split.train.len(), split.val.len(), split.test.len()],
        skips,
        joint_names: JOINT_NAMES,
        provenance: SplitProvenance {
            train: &split.train.provenance,
            val: &split.val.provenance,
            test: &split.test.provenance,
        },
    }
}

// ---------------------------------------------------------------------------
// Pose-estimation corpus
// ---------------------------------------------------------------------------

/// Arrays of the pose-estimation corpus after its two-way split.
///
/// `x` rows are normalized 2D coordinates (48 dims), `y` rows normalized 3D
/// coordinates (72 dims), `r` rows rotations in radians (72 dims).
#[derive(Debug)]
pub struct PoseArrays {
    /// Training inputs, shape `(n_train, 48)`.
    pub x_train: Array2<f32>,
    /// Training 3D targets, shape `(n_train, 72)`.
    pub y_train: Array2<f32>,
    /// Training rotation targets, shape `(n_train, 72)`.
    pub r_train: Array2<f32>,
    /// Validation inputs.
    pub x_val: Array2<f32>,
    /// Validation 3D targets.
    pub y_val: Array2<f32>,
    /// Validation rotation targets.
    pub r_val: Array2<f32>,
}

/// Metadata accompanying the pose-estimation bundle.
#[derive(Debug, Serialize)]
pub struct PoseMetadata<'a> {
    /// Shuffle seed.
    pub seed: u64,
    /// Rows per partition, in train/val order.
    pub partition_sizes: [usize; 2],
    /// Frame width used for 2D normalization.
    pub img_width: f32,
    /// Frame height used for 2D normalization.
    pub img_height: f32,
    /// Divisor applied to centred 3D coordinates.
    pub pose_3d_scale: f32,
    /// Ordered joint vocabulary of the 3D corpus.
    pub joint_names: [&'static str; 24],
    /// Skip counters accumulated during the pass.
    pub skips: &'a SkipTally,
}

/// Write the pose-estimation arrays plus normalization constants as a
/// compressed NPZ bundle.
///
/// Array names: `X_{train,val}`, `Y_{train,val}`, `R_{train,val}`,
/// `img_size` (width, height), `scale_3d`.
pub fn write_pose_bundle(
    dir: &Path,
    arrays: &PoseArrays,
    img_width: f32,
    img_height: f32,
    pose_3d_scale: f32,
) -> Result<PathBuf, ExportError> {
    let path = prepare(dir, POSE_BUNDLE)?;
    let file = File::create(&path).map_err(|e| ExportError::write(&path, e))?;
    let mut npz = ndarray_npy::NpzWriter::new_compressed(file);

    let named: [(&str, &Array2<f32>); 6] = [
        ("X_train", &arrays.x_train),
        ("Y_train", &arrays.y_train),
        ("R_train", &arrays.r_train),
        ("X_val", &arrays.x_val),
        ("Y_val", &arrays.y_val),
        ("R_val", &arrays.r_val),
    ];
    for (name, array) in named {
        npz.add_array(name, array).map_err(|e| ExportError::npz(&path, e.to_string()))?;
    }
    npz.add_array("img_size", &arr1(&[img_width, img_height]))
        .map_err(|e| ExportError::npz(&path, e.to_string()))?;
    npz.add_array("scale_3d", &arr0(pose_3d_scale))
        .map_err(|e| ExportError::npz(&path, e.to_string()))?;
    npz.finish().map_err(|e| ExportError::npz(&path, e.to_string()))?;

    info!(
        path = %path.display(),
        train = arrays.x_train.nrows(),
        val = arrays.x_val.nrows(),
        "wrote pose bundle"
    );
    Ok(path)
}

/// Write the pose-estimation metadata document next to the bundle.
pub fn write_pose_metadata(
    dir: &Path,
    metadata: &PoseMetadata<'_>,
) -> Result<PathBuf, ExportError> {
    write_json(dir, POSE_METADATA, metadata)
}

/// The standard pose metadata for a bundle written by [`write_pose_bundle`].
pub fn pose_metadata<'a>(
    arrays: &PoseArrays,
    seed: u64,
    img_width: f32,
    img_height: f32,
    pose_3d_scale: f32,
    skips: &'a SkipTally,
) -> PoseMetadata<'a> {
    PoseMetadata {
        seed,
        partition_sizes: [arrays.x_train.nrows(), arrays.x_val.nrows()],
        img_width,
        img_height,
        pose_3d_scale,
        joint_names: SMPL_JOINT_NAMES,
        skips,
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn prepare(dir: &Path, name: &str) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::write(dir, e))?;
    Ok(dir.join(name))
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, ExportError> {
    let path = prepare(dir, name)?;
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, json).map_err(|e| ExportError::write(&path, e))?;
    info!(path = %path.display(), "wrote metadata");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetSplit, Sample, SampleSet};
    use crate::labels::Condition;
    use ndarray::{arr1 as a1, Array1};
    use ndarray_npy::NpzReader;
    use tempfile::TempDir;

    fn tiny_split() -> DatasetSplit {
        let mut set = SampleSet::new(3);
        for i in 0..30usize {
            set.push(Sample {
                features: a1(&[i as f32, 0.0, 1.0]),
                exercise_id: i % 2,
                posture_correct: i % 3 == 0,
                provenance: Provenance {
                    file: format!("clip_{i}.json"),
                    exercise: if i % 2 == 0 { "Squat" } else { "Plank" }.to_owned(),
                    exercise_kr: "스쿼트".to_owned(),
                    exercise_id: i % 2,
                    frame: i,
                    view: "view1".to_owned(),
                    conditions: vec![Condition {
                        condition: Some("무릎 정렬".to_owned()),
                        value: i % 3 == 0,
                    }],
                    is_correct: i % 3 == 0,
                },
            });
        }
        DatasetSplit::from_samples(&set, 42, 0.1, 0.1)
    }

    #[test]
    fn fitness_bundle_round_trips_through_npz() {
        let dir = TempDir::new().unwrap();
        let split = tiny_split();
        let path = write_fitness_bundle(dir.path(), &split).unwrap();

        let mut npz = NpzReader::new(File::open(&path).unwrap()).unwrap();
        let x: Array2<f32> = npz.by_name("X_train").unwrap();
        assert_eq!(x.dim(), (split.train.len(), 3));
        let y: Array1<u64> = npz.by_name("y_exercise_test").unwrap();
        assert_eq!(y.len(), split.test.len());
        let p: Array1<u8> = npz.by_name("y_posture_val").unwrap();
        assert_eq!(p.len(), split.val.len());
    }

    #[test]
    fn fitness_metadata_counts_classes_and_rows() {
        let split = tiny_split();
        let classes = vec!["Squat".to_owned(), "Plank".to_owned()];
        let skips = SkipTally::default();
        let meta = fitness_metadata(
            &split,
            &classes,
            FeatureType::Coordinates,
            NormalizeMethod::Bbox,
            42,
            &skips,
        );
        assert_eq!(meta.partition_sizes.iter().sum::<usize>(), 30);
        assert_eq!(meta.class_counts.get("Squat"), Some(&15));
        assert_eq!(meta.class_counts.get("Plank"), Some(&15));
        assert_eq!(meta.feature_dim, 48);

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["seed"], 42);
        assert_eq!(json["provenance"]["train"].as_array().unwrap().len(), split.train.len());
        assert_eq!(json["joint_names"][0], "Nose");

        // Each provenance row keeps its full condition list, not just the
        // derived boolean.
        let row = &json["provenance"]["train"][0];
        assert_eq!(row["conditions"][0]["condition"], "무릎 정렬");
        assert!(row["conditions"][0]["value"].is_boolean());
        assert!(row["exercise_id"].is_u64());
    }

    #[test]
    fn metadata_document_lands_on_disk() {
        let dir = TempDir::new().unwrap();
        let split = tiny_split();
        let classes = vec!["Squat".to_owned(), "Plank".to_owned()];
        let skips = SkipTally::default();
        let meta = fitness_metadata(
            &split,
            &classes,
            FeatureType::Hybrid,
            NormalizeMethod::HipCenter,
            42,
            &skips,
        );
        let path = write_fitness_metadata(dir.path(), &meta).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["feature_type"], "hybrid");
        assert_eq!(value["normalize_method"], "hip_center");
    }

    #[test]
    fn pose_bundle_carries_constants_and_both_partitions() {
        let dir = TempDir::new().unwrap();
        let arrays = PoseArrays {
            x_train: Array2::zeros((8, 48)),
            y_train: Array2::zeros((8, 72)),
            r_train: Array2::zeros((8, 72)),
            x_val: Array2::zeros((2, 48)),
            y_val: Array2::zeros((2, 72)),
            r_val: Array2::zeros((2, 72)),
        };
        let path = write_pose_bundle(dir.path(), &arrays, 1920.0, 1080.0, 1000.0).unwrap();

        let mut npz = NpzReader::new(File::open(&path).unwrap()).unwrap();
        let y: Array2<f32> = npz.by_name("Y_train").unwrap();
        assert_eq!(y.dim(), (8, 72));
        let img: Array1<f32> = npz.by_name("img_size").unwrap();
        assert_eq!(img.to_vec(), vec![1920.0, 1080.0]);

        let skips = SkipTally::default();
        let meta = pose_metadata(&arrays, 42, 1920.0, 1080.0, 1000.0, &skips);
        assert_eq!(meta.partition_sizes, [8, 2]);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["joint_names"][0], "Pelvis");
    }
}
