//! Error types for the pose-prep dataset pipeline.
//!
//! This module is the single source of truth for all error types in the
//! crate. Every module that produces an error imports its error type from
//! here rather than defining it inline, keeping the error hierarchy
//! centralised and consistent.
//!
//! ## Hierarchy
//!
//! ```text
//! PipelineError (top-level, fatal for the affected corpus)
//! ├── ConfigError       (config validation / file loading)
//! ├── RecordRejection   (per-record skip; tallied, never fatal)
//! └── ExportError       (output bundle / metadata writing)
//! ```
//!
//! A [`RecordRejection`] is not an abort condition: the pipeline catches it,
//! increments the matching counter in [`SkipTally`], logs a `warn!`, and
//! moves on to the next file. Only [`PipelineError`] variants terminate a
//! corpus pass.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Convenient `Result` alias used by orchestration-level functions.
pub type PipelineResult<T> = Result<T, PipelineError>;

// ---------------------------------------------------------------------------
// PipelineError — top-level aggregator
// ---------------------------------------------------------------------------

/// Top-level error type for the dataset-construction pipeline.
///
/// Orchestration-level functions (the corpus passes in [`crate::pipeline`])
/// return `PipelineResult<T>`. Lower-level modules return their own error
/// types which coerce into `PipelineError` via [`From`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A configuration validation or loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing an output artifact failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Zero annotation files were discovered in a configured corpus root.
    #[error("Empty corpus: no annotation files found under `{root}`")]
    EmptyCorpus {
        /// The configured root that yielded no files.
        root: PathBuf,
    },

    /// A full pass over the corpus produced zero usable samples.
    #[error("No usable samples after a full pass ({skipped} records skipped)")]
    NoUsableSamples {
        /// Total number of records skipped during the pass.
        skipped: usize,
    },

    /// A low-level I/O error while enumerating corpus files.
    #[error("I/O error reading `{path}`: {source}")]
    Io {
        /// Path being read when the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Construct a [`PipelineError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io { path: path.into(), source }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating a [`PipelineConfig`].
///
/// [`PipelineConfig`]: crate::config::PipelineConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read from disk.
    #[error("Cannot read config file `{path}`: {source}")]
    FileRead {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("Cannot parse config file `{path}`: {source}")]
    Parse {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// ExportError
// ---------------------------------------------------------------------------

/// Errors produced while writing output bundles or the metadata document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The output file or directory could not be written.
    #[error("Cannot write `{path}`: {source}")]
    Write {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An array could not be serialised into the NPZ bundle.
    #[error("NPZ write error for `{path}`: {message}")]
    Npz {
        /// Path of the bundle.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// The metadata document could not be serialised.
    #[error("Metadata serialisation error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl ExportError {
    /// Construct an [`ExportError::Write`].
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Write { path: path.into(), source }
    }

    /// Construct an [`ExportError::Npz`].
    pub fn npz<S: Into<String>>(path: impl Into<PathBuf>, msg: S) -> Self {
        ExportError::Npz { path: path.into(), message: msg.into() }
    }
}

// ---------------------------------------------------------------------------
// SkipReason / RecordRejection
// ---------------------------------------------------------------------------

/// Reason a record was skipped rather than contributing a sample.
///
/// Each variant maps to exactly one counter in [`SkipTally`]. Skips are
/// per-record and never abort a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Missing/invalid required field, wrong joint count, or unparseable file.
    MalformedRecord,
    /// Free-text exercise label has no canonical mapping.
    UnmappedLabel,
    /// The exercise maps to a canonical name outside the configured targets.
    UnknownExercise,
    /// No 3D counterpart found for a 2D record's key.
    UnmatchedRecord,
    /// Fewer visible joints than the configured minimum.
    InsufficientVisibility,
}

/// A per-record skip: the reason plus a short human-readable detail.
///
/// This is an error type so parsers can use `?` internally, but callers are
/// expected to tally it and continue, not to propagate it upward.
#[derive(Debug, Error)]
#[error("{reason:?}: {detail}")]
pub struct RecordRejection {
    /// Why the record was rejected.
    pub reason: SkipReason,
    /// Context for diagnostics (file name, field, counts).
    pub detail: String,
}

impl RecordRejection {
    /// Construct a rejection with the given reason and detail.
    pub fn new<S: Into<String>>(reason: SkipReason, detail: S) -> Self {
        RecordRejection { reason, detail: detail.into() }
    }

    /// Shorthand for a [`SkipReason::MalformedRecord`] rejection.
    pub fn malformed<S: Into<String>>(detail: S) -> Self {
        Self::new(SkipReason::MalformedRecord, detail)
    }

    /// Shorthand for a [`SkipReason::UnmappedLabel`] rejection.
    pub fn unmapped_label<S: Into<String>>(detail: S) -> Self {
        Self::new(SkipReason::UnmappedLabel, detail)
    }
}

// ---------------------------------------------------------------------------
// SkipTally
// ---------------------------------------------------------------------------

/// Counters for every per-record skip reason plus matcher diagnostics.
///
/// The tally is part of the pipeline report so a caller can always see why
/// records were dropped. Nothing is ever dropped without a count.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SkipTally {
    /// Records rejected for structural problems (joint count, missing fields).
    pub malformed: usize,
    /// Records whose free-text label had no canonical mapping.
    pub unmapped_label: usize,
    /// Records mapping to an exercise outside the configured target list.
    pub unknown_exercise: usize,
    /// 2D records with no resolvable 3D counterpart.
    pub unmatched: usize,
    /// Frame/view samples below the minimum-visible-joint threshold.
    pub low_visibility: usize,
    /// Fitness `pts` keys that matched no canonical joint name.
    pub unknown_joint_keys: usize,
    /// Keys for which more than one 3D candidate file existed.
    pub ambiguous_matches: usize,
}

impl SkipTally {
    /// Increment the counter matching `reason`.
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MalformedRecord => self.malformed += 1,
            SkipReason::UnmappedLabel => self.unmapped_label += 1,
            SkipReason::UnknownExercise => self.unknown_exercise += 1,
            SkipReason::UnmatchedRecord => self.unmatched += 1,
            SkipReason::InsufficientVisibility => self.low_visibility += 1,
        }
    }

    /// Total number of skipped records (diagnostic counters excluded).
    pub fn total_skipped(&self) -> usize {
        self.malformed
            + self.unmapped_label
            + self.unknown_exercise
            + self.unmatched
            + self.low_visibility
    }

    /// Merge another tally into this one.
    pub fn merge(&mut self, other: &SkipTally) {
        self.malformed += other.malformed;
        self.unmapped_label += other.unmapped_label;
        self.unknown_exercise += other.unknown_exercise;
        self.unmatched += other.unmatched;
        self.low_visibility += other.low_visibility;
        self.unknown_joint_keys += other.unknown_joint_keys;
        self.ambiguous_matches += other.ambiguous_matches;
    }
}

impl std::fmt::Display for SkipTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "malformed={} unmapped_label={} unknown_exercise={} unmatched={} \
             low_visibility={} unknown_joint_keys={} ambiguous_matches={}",
            self.malformed,
            self.unmapped_label,
            self.unknown_exercise,
            self.unmatched,
            self.low_visibility,
            self.unknown_joint_keys,
            self.ambiguous_matches,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_records_each_reason_once() {
        let mut tally = SkipTally::default();
        tally.record(SkipReason::MalformedRecord);
        tally.record(SkipReason::UnmappedLabel);
        tally.record(SkipReason::UnmatchedRecord);
        tally.record(SkipReason::InsufficientVisibility);
        tally.record(SkipReason::UnknownExercise);
        assert_eq!(tally.malformed, 1);
        assert_eq!(tally.unmapped_label, 1);
        assert_eq!(tally.unmatched, 1);
        assert_eq!(tally.low_visibility, 1);
        assert_eq!(tally.unknown_exercise, 1);
        assert_eq!(tally.total_skipped(), 5);
    }

    #[test]
    fn diagnostic_counters_excluded_from_total() {
        let mut tally = SkipTally::default();
        tally.unknown_joint_keys = 7;
        tally.ambiguous_matches = 2;
        assert_eq!(tally.total_skipped(), 0);
    }

    #[test]
    fn merge_sums_all_fields() {
        let mut a = SkipTally { malformed: 1, unmatched: 2, ..Default::default() };
        let b = SkipTally { malformed: 3, ambiguous_matches: 1, ..Default::default() };
        a.merge(&b);
        assert_eq!(a.malformed, 4);
        assert_eq!(a.unmatched, 2);
        assert_eq!(a.ambiguous_matches, 1);
    }

    #[test]
    fn rejection_display_includes_detail() {
        let r = RecordRejection::malformed("expected 24 joints, got 23");
        let s = r.to_string();
        assert!(s.contains("24 joints"), "got: {s}");
    }
}
