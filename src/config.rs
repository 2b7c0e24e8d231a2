//! Pipeline configuration.
//!
//! [`PipelineConfig`] is the single source of truth for all corpus paths,
//! normalization constants, feature policies, and split fractions used
//! throughout the pipeline. It is serializable via [`serde`] so a run can be
//! driven from a JSON file and its exact configuration stored alongside the
//! outputs.
//!
//! # Example
//!
//! ```rust
//! use pose_prep::config::PipelineConfig;
//!
//! let cfg = PipelineConfig::default();
//! cfg.validate().expect("default config is valid");
//!
//! assert_eq!(cfg.seed, 42);
//! assert_eq!(cfg.min_visible_joints, 12);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::features::FeatureType;
use crate::labels::DEFAULT_TARGET_EXERCISES;
use crate::normalize::NormalizeMethod;
use crate::skeleton::NUM_JOINTS;

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Complete configuration for one preprocessing run.
///
/// All fields have documented defaults matching the corpora's recording
/// setup. Use [`PipelineConfig::default()`] as a starting point, then
/// override individual fields as needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // -----------------------------------------------------------------------
    // Corpus roots
    // -----------------------------------------------------------------------
    /// Root of the 2D pose-estimation annotation corpus. `None` skips the
    /// pose-estimation pass.
    pub pose_2d_dir: Option<PathBuf>,

    /// Root of the 3D pose-estimation annotation corpus. `None` skips the
    /// pose-estimation pass.
    pub pose_3d_dir: Option<PathBuf>,

    /// Roots of the fitness annotation corpus. Empty skips the fitness pass.
    pub fitness_dirs: Vec<PathBuf>,

    /// Directory where NPZ bundles and metadata documents are written.
    pub output_dir: PathBuf,

    // -----------------------------------------------------------------------
    // Normalization
    // -----------------------------------------------------------------------
    /// Recording frame width in pixels for fixed-frame 2D normalization.
    /// Default: **1920.0**.
    pub img_width: f32,

    /// Recording frame height in pixels. Default: **1080.0**.
    pub img_height: f32,

    /// Divisor applied to centred 3D coordinates (millimetres → metres).
    /// Default: **1000.0**.
    pub pose_3d_scale: f32,

    /// Per-sample adaptive normalization mode for the fitness corpus.
    /// Default: **bbox**.
    pub normalize_method: NormalizeMethod,

    // -----------------------------------------------------------------------
    // Features / sample selection
    // -----------------------------------------------------------------------
    /// Feature-vector layout. Default: **hybrid** (58 dims).
    pub feature_type: FeatureType,

    /// Minimum visible joints for a fitness frame/view to become a sample.
    /// Default: **12**.
    pub min_visible_joints: usize,

    /// Use every frame of a clip, or only the first. Default: **true**.
    pub use_all_frames: bool,

    /// Use every active view of a frame, or only the preferred one.
    /// Default: **false**.
    pub use_all_views: bool,

    /// View used when `use_all_views` is `false`; when it is inactive in a
    /// frame, the first active view is used instead. Default: **"view1"**.
    pub preferred_view: String,

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------
    /// Ordered canonical exercise classes; ids are assigned in this order.
    pub target_exercises: Vec<String>,

    // -----------------------------------------------------------------------
    // Splitting / reproducibility
    // -----------------------------------------------------------------------
    /// Fraction of the fitness corpus carved off for testing. Default: **0.1**.
    pub test_size: f64,

    /// Fraction of the fitness corpus carved off for validation.
    /// Default: **0.1**.
    pub val_size: f64,

    /// Fraction of the pose-estimation corpus held out for validation in its
    /// two-way split. Default: **0.2**.
    pub pose_val_size: f64,

    /// Seed for every shuffle in the pipeline. Default: **42**.
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            // Corpus roots
            pose_2d_dir: None,
            pose_3d_dir: None,
            fitness_dirs: Vec::new(),
            output_dir: PathBuf::from("processed_data"),
            // Normalization
            img_width: 1920.0,
            img_height: 1080.0,
            pose_3d_scale: 1000.0,
            normalize_method: NormalizeMethod::Bbox,
            // Features
            feature_type: FeatureType::Hybrid,
            min_visible_joints: 12,
            use_all_frames: true,
            use_all_views: false,
            preferred_view: "view1".to_owned(),
            // Labels
            target_exercises: DEFAULT_TARGET_EXERCISES.iter().map(|s| s.to_string()).collect(),
            // Splitting
            test_size: 0.1,
            val_size: 0.1,
            pose_val_size: 0.2,
            seed: 42,
        }
    }
}

impl PipelineConfig {
    /// Load a [`PipelineConfig`] from a JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be opened,
    /// [`ConfigError::Parse`] if the JSON is malformed, and
    /// [`ConfigError::InvalidValue`] if a field fails validation.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: PipelineConfig = serde_json::from_str(&contents).map_err(|source| {
            ConfigError::Parse { path: path.to_path_buf(), source }
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize this configuration to pretty-printed JSON and write it to
    /// `path`, creating parent directories if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the directory cannot be created
    /// or the file cannot be written.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Whether the configuration names both roots of the pose-estimation
    /// corpus.
    pub fn has_pose_corpus(&self) -> bool {
        self.pose_2d_dir.is_some() && self.pose_3d_dir.is_some()
    }

    /// Whether the configuration names any fitness corpus root.
    pub fn has_fitness_corpus(&self) -> bool {
        !self.fitness_dirs.is_empty()
    }

    /// Validate all fields and return an error describing the first problem
    /// found, or `Ok(())` if the configuration is coherent.
    ///
    /// # Validated invariants
    ///
    /// - Image dimensions and the 3D scale must be strictly positive.
    /// - `min_visible_joints` must lie in `[1, 24]`.
    /// - `preferred_view` must be non-empty.
    /// - `target_exercises` must be non-empty with no duplicates.
    /// - `test_size`, `val_size`, and `pose_val_size` must lie in `(0, 1)`,
    ///   and `test_size + val_size` must stay below 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Normalization constants
        if self.img_width <= 0.0 {
            return Err(ConfigError::invalid_value("img_width", "must be > 0.0"));
        }
        if self.img_height <= 0.0 {
            return Err(ConfigError::invalid_value("img_height", "must be > 0.0"));
        }
        if self.pose_3d_scale <= 0.0 {
            return Err(ConfigError::invalid_value("pose_3d_scale", "must be > 0.0"));
        }

        // Sample selection
        if self.min_visible_joints == 0 || self.min_visible_joints > NUM_JOINTS {
            return Err(ConfigError::invalid_value(
                "min_visible_joints",
                format!("must be in [1, {NUM_JOINTS}]"),
            ));
        }
        if self.preferred_view.is_empty() {
            return Err(ConfigError::invalid_value("preferred_view", "must be non-empty"));
        }

        // Labels
        if self.target_exercises.is_empty() {
            return Err(ConfigError::invalid_value(
                "target_exercises",
                "must name at least one class",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &self.target_exercises {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::invalid_value(
                    "target_exercises",
                    format!("duplicate class `{name}`"),
                ));
            }
        }

        // Split fractions
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigError::invalid_value("test_size", "must be in (0, 1)"));
        }
        if !(self.val_size > 0.0 && self.val_size < 1.0) {
            return Err(ConfigError::invalid_value("val_size", "must be in (0, 1)"));
        }
        if self.test_size + self.val_size >= 1.0 {
            return Err(ConfigError::invalid_value(
                "val_size",
                "test_size + val_size must be < 1.0",
            ));
        }
        if !(self.pose_val_size > 0.0 && self.pose_val_size < 1.0) {
            return Err(ConfigError::invalid_value("pose_val_size", "must be in (0, 1)"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
