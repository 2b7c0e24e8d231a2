//! Sample accumulation and deterministic train/val/test splitting.
//!
//! Randomness comes from a seeded xorshift64 generator driving a
//! Fisher-Yates shuffle, so a given `(samples, seed)` pair always produces
//! the same split with no dependence on iteration order of any hash map.
//!
//! Splitting is stratified per class when every class is large enough to
//! land on both sides of each carve; otherwise it falls back to a plain
//! shuffled split and records that in the result. Corpora with fewer than
//! [`MIN_STRATIFY_TOTAL`] samples skip stratification outright.

use ndarray::{Array1, Array2};
use serde::Serialize;
use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::labels::Condition;

/// Below this many samples a plain shuffled split is used unconditionally.
pub const MIN_STRATIFY_TOTAL: usize = 20;

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// Where a sample came from, carried verbatim into the run metadata.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Provenance {
    /// Source annotation file name.
    pub file: String,
    /// Canonical exercise name.
    pub exercise: String,
    /// Raw free-text exercise name as annotated.
    pub exercise_kr: String,
    /// Dense exercise-class id, duplicated here so the metadata document is
    /// self-contained.
    pub exercise_id: usize,
    /// Frame index within the clip.
    pub frame: usize,
    /// View that contributed the keypoints.
    pub view: String,
    /// Posture-condition annotations of the source clip.
    pub conditions: Vec<Condition>,
    /// Posture-correctness label derived from `conditions`.
    pub is_correct: bool,
}

/// One finished training sample: features plus both label heads.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Feature vector of the run's fixed dimensionality.
    pub features: Array1<f32>,
    /// Dense exercise-class id.
    pub exercise_id: usize,
    /// Posture-correctness label.
    pub posture_correct: bool,
    /// Origin of the sample.
    pub provenance: Provenance,
}

/// Accumulates samples of one fixed feature dimensionality.
#[derive(Debug)]
pub struct SampleSet {
    samples: Vec<Sample>,
    dim: usize,
}

impl SampleSet {
    /// Create an empty set for vectors of `dim` features.
    pub fn new(dim: usize) -> Self {
        SampleSet { samples: Vec::new(), dim }
    }

    /// Append a sample. Debug-asserts the dimensionality invariant; every
    /// producer goes through one `FeatureExtractor` so it holds by
    /// construction.
    pub fn push(&mut self, sample: Sample) {
        debug_assert_eq!(sample.features.len(), self.dim);
        self.samples.push(sample);
    }

    /// Number of accumulated samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples were accumulated.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Feature dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Accumulated samples, in insertion order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Per-class sample counts, keyed by exercise id.
    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.samples {
            *counts.entry(s.exercise_id).or_insert(0) += 1;
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Shuffle
// ---------------------------------------------------------------------------

/// Fisher-Yates shuffle driven by xorshift64.
///
/// A zero seed is remapped to a fixed odd constant; xorshift has an
/// all-zero fixed point.
pub fn xorshift_shuffle<T>(items: &mut [T], seed: u64) {
    let mut state = if seed == 0 { 0x853c49e6748fea9b } else { seed };
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    for i in (1..items.len()).rev() {
        let j = (next() % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

/// Derive a per-class seed so each class shuffles independently but
/// reproducibly.
fn class_seed(seed: u64, class: usize) -> u64 {
    seed.wrapping_add((class as u64 + 1).wrapping_mul(0x9e3779b97f4a7c15))
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Index sets of a three-way split. Disjoint; their union covers the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Training-set sample indices.
    pub train: Vec<usize>,
    /// Validation-set sample indices.
    pub val: Vec<usize>,
    /// Test-set sample indices.
    pub test: Vec<usize>,
    /// Whether both carves preserved per-class proportions.
    pub stratified: bool,
}

/// Carve `fraction` of `indices` off, stratified by class.
///
/// Returns `None` when any class cannot land on both sides of the carve,
/// which means stratification is impossible for this corpus.
fn stratified_carve(
    indices: &[usize],
    labels: &[usize],
    fraction: f64,
    seed: u64,
) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &i in indices {
        by_class.entry(labels[i]).or_default().push(i);
    }

    let mut taken = Vec::new();
    let mut kept = Vec::new();
    for (&class, members) in &by_class {
        let count = members.len();
        if count < 2 {
            return None;
        }
        let n_take = ((count as f64 * fraction).round() as usize).max(1);
        if n_take >= count {
            return None;
        }
        let mut shuffled = members.clone();
        xorshift_shuffle(&mut shuffled, class_seed(seed, class));
        taken.extend_from_slice(&shuffled[..n_take]);
        kept.extend_from_slice(&shuffled[n_take..]);
    }
    taken.sort_unstable();
    kept.sort_unstable();
    Some((taken, kept))
}

/// Carve `fraction` of `indices` off a plain shuffle. At least one element
/// is always taken.
fn plain_carve(indices: &[usize], fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut shuffled = indices.to_vec();
    xorshift_shuffle(&mut shuffled, seed);
    let n_take = ((indices.len() as f64 * fraction) as usize).max(1).min(shuffled.len());
    let kept = shuffled.split_off(n_take);
    (shuffled, kept)
}

/// Three-way split over `labels.len()` samples.
///
/// Test is carved first with `test_size`, then validation is carved from
/// the remainder with `val_size / (1 - test_size)` so both fractions are
/// relative to the full corpus.
pub fn split_indices(labels: &[usize], seed: u64, test_size: f64, val_size: f64) -> SplitIndices {
    let n = labels.len();
    let all: Vec<usize> = (0..n).collect();
    let val_fraction = val_size / (1.0 - test_size);

    if n >= MIN_STRATIFY_TOTAL {
        let carved = stratified_carve(&all, labels, test_size, seed).and_then(|(test, rest)| {
            stratified_carve(&rest, labels, val_fraction, seed.rotate_left(17))
                .map(|(val, train)| (test, val, train))
        });
        if let Some((test, val, train)) = carved {
            info!(
                train = train.len(),
                val = val.len(),
                test = test.len(),
                "stratified split"
            );
            return SplitIndices { train, val, test, stratified: true };
        }
        warn!(total = n, "class too small to stratify, falling back to plain shuffle");
    }

    // Plain path: one shuffle, partition sizes taken from the full corpus.
    let mut shuffled = all;
    xorshift_shuffle(&mut shuffled, seed);
    let n_test = ((n as f64 * test_size) as usize).max(1).min(n);
    let n_val = ((n as f64 * val_size) as usize).max(1).min(n - n_test);
    let test = shuffled[..n_test].to_vec();
    let val = shuffled[n_test..n_test + n_val].to_vec();
    let train = shuffled[n_test + n_val..].to_vec();
    SplitIndices { train, val, test, stratified: false }
}

/// Two-way split for corpora without class labels: `val_size` of the
/// samples go to validation, the rest to training.
pub fn split_two_way(n: usize, seed: u64, val_size: f64) -> (Vec<usize>, Vec<usize>) {
    let all: Vec<usize> = (0..n).collect();
    let (val, train) = plain_carve(&all, val_size, seed);
    (train, val)
}

// ---------------------------------------------------------------------------
// Partition assembly
// ---------------------------------------------------------------------------

/// One materialized partition: arrays row-aligned with `provenance`.
#[derive(Debug)]
pub struct Partition {
    /// Feature matrix, shape `(n, dim)`.
    pub x: Array2<f32>,
    /// Exercise-class ids, shape `(n,)`.
    pub y_exercise: Array1<u64>,
    /// Posture-correctness labels (0/1), shape `(n,)`.
    pub y_posture: Array1<u8>,
    /// Per-row sample origins.
    pub provenance: Vec<Provenance>,
}

impl Partition {
    fn gather(samples: &[Sample], indices: &[usize], dim: usize) -> Self {
        let mut x = Array2::zeros((indices.len(), dim));
        let mut y_exercise = Array1::zeros(indices.len());
        let mut y_posture = Array1::zeros(indices.len());
        let mut provenance = Vec::with_capacity(indices.len());
        for (row, &i) in indices.iter().enumerate() {
            let sample = &samples[i];
            x.row_mut(row).assign(&sample.features);
            y_exercise[row] = sample.exercise_id as u64;
            y_posture[row] = u8::from(sample.posture_correct);
            provenance.push(sample.provenance.clone());
        }
        Partition { x, y_exercise, y_posture, provenance }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.provenance.len()
    }

    /// Whether the partition is empty.
    pub fn is_empty(&self) -> bool {
        self.provenance.is_empty()
    }
}

/// The three materialized partitions of one run.
#[derive(Debug)]
pub struct DatasetSplit {
    /// Training partition.
    pub train: Partition,
    /// Validation partition.
    pub val: Partition,
    /// Test partition.
    pub test: Partition,
    /// Whether the split preserved per-class proportions.
    pub stratified: bool,
}

impl DatasetSplit {
    /// Split an accumulated sample set into materialized partitions.
    pub fn from_samples(set: &SampleSet, seed: u64, test_size: f64, val_size: f64) -> Self {
        let labels: Vec<usize> = set.samples().iter().map(|s| s.exercise_id).collect();
        let indices = split_indices(&labels, seed, test_size, val_size);
        DatasetSplit {
            train: Partition::gather(set.samples(), &indices.train, set.dim()),
            val: Partition::gather(set.samples(), &indices.val, set.dim()),
            test: Partition::gather(set.samples(), &indices.test, set.dim()),
            stratified: indices.stratified,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
