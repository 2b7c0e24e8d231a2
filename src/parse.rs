//! Record parsers for the three annotation schemas.
//!
//! Each parser turns one JSON file (or one view sub-object) into a typed
//! record, or a [`RecordRejection`] that the pipeline tallies and moves past.
//! Parsing is a pure transform of one file's bytes; no parser touches any
//! state outside its arguments.
//!
//! ## Schemas
//!
//! - 2D pose file: `{info: {action_category_id, actor_id, camera_no},
//!   annotations: {frame_no, "2d_pos": [[x, y]; 24]}}`
//! - 3D pose file: `annotations."3d_pos"` as `[[x],[y],[z],[1.0]]` or
//!   `[x, y, z, 1.0]` per joint, plus `"3d_rot"` degree triples in either
//!   form.
//! - Fitness file: `{type_info: {exercise, pose, key, conditions},
//!   frames: [{view1..view5: {active, pts: {name: {x, y}}}}]}`
//!
//! Identity fields appear as JSON numbers in some corpus batches and strings
//! in others; both are accepted. When `info` fields are absent the identity
//! is recovered from the file-name stem (`{action}_{actor}_{camera}_{frame}`
//! for 2D, `3D_{action}_{actor}_{frame}` for 3D).

use ndarray::{Array1, Array2};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::RecordRejection;
use crate::labels::{is_correct, Condition, ExerciseNameMap};
use crate::skeleton::{Joint, NUM_JOINTS};

/// View slots a fitness frame may carry, in preference order.
pub const VIEW_NAMES: [&str; 5] = ["view1", "view2", "view3", "view4", "view5"];

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Composite identity of one annotated frame.
///
/// `(action, actor, frame)` is the cross-corpus match key; `camera` is
/// carried for provenance but excluded from matching (the 3D corpus is
/// camera-independent).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Action / category identifier.
    pub action: String,
    /// Actor identifier.
    pub actor: String,
    /// Camera number, when the corpus provides one.
    pub camera: Option<String>,
    /// Frame number within the recording.
    pub frame: u64,
}

impl RecordKey {
    /// The `(action, actor, frame)` tuple used for cross-corpus matching.
    pub fn match_key(&self) -> (&str, &str, u64) {
        (&self.action, &self.actor, self.frame)
    }
}

/// One parsed 2D pose-estimation annotation: raw pixel coordinates.
#[derive(Debug, Clone)]
pub struct Pose2dRecord {
    /// Composite identity.
    pub key: RecordKey,
    /// Raw pixel coordinates, shape `(24, 2)`.
    pub coords: Array2<f32>,
}

/// One parsed 3D pose-estimation annotation: raw millimetre coordinates plus
/// per-joint rotations in degrees.
#[derive(Debug, Clone)]
pub struct Pose3dRecord {
    /// Composite identity.
    pub key: RecordKey,
    /// Raw coordinates, shape `(24, 3)`.
    pub coords: Array2<f32>,
    /// Per-joint `(roll, pitch, yaw)` in degrees, shape `(24, 3)`.
    pub rotations: Array2<f32>,
}

/// Keypoints of one fitness view: coordinates plus a visibility mask.
///
/// Joints absent from the `pts` object, or present with a null coordinate,
/// hold `(0, 0)` and `visible = false`.
#[derive(Debug, Clone)]
pub struct KeypointSet {
    /// Coordinates, shape `(24, 2)`.
    pub coords: Array2<f32>,
    /// Per-joint visibility mask.
    pub visibility: Array1<bool>,
}

impl KeypointSet {
    /// Number of visible joints.
    pub fn visible_count(&self) -> usize {
        self.visibility.iter().filter(|&&v| v).count()
    }
}

/// One fitness frame: the active views that carried keypoints, in
/// `view1..view5` order.
#[derive(Debug, Clone)]
pub struct FitnessFrame {
    /// `(view name, keypoints)` for each active view.
    pub views: Vec<(String, KeypointSet)>,
}

impl FitnessFrame {
    /// Keypoints for a named view, if it was active in this frame.
    pub fn view(&self, name: &str) -> Option<&KeypointSet> {
        self.views.iter().find(|(n, _)| n == name).map(|(_, kp)| kp)
    }
}

/// One parsed fitness annotation file.
#[derive(Debug, Clone)]
pub struct FitnessClip {
    /// Source file name (provenance).
    pub file_name: String,
    /// Canonical English exercise name.
    pub exercise: String,
    /// Raw free-text exercise name as annotated.
    pub exercise_kr: String,
    /// Pose label from `type_info.pose`.
    pub pose: String,
    /// Posture-condition annotations.
    pub conditions: Vec<Condition>,
    /// `true` iff conditions are non-empty and all hold.
    pub is_correct: bool,
    /// Frames with at least one active view.
    pub frames: Vec<FitnessFrame>,
    /// Diagnostic: `pts` keys that matched no canonical joint.
    pub unknown_joint_keys: usize,
}

// ---------------------------------------------------------------------------
// Raw serde shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawPoseFile {
    #[serde(default)]
    info: Option<RawInfo>,
    annotations: RawAnnotations,
}

#[derive(Deserialize, Default)]
struct RawInfo {
    #[serde(default)]
    action_category_id: Option<Value>,
    #[serde(default)]
    actor_id: Option<Value>,
    #[serde(default)]
    camera_no: Option<Value>,
}

#[derive(Deserialize)]
struct RawAnnotations {
    #[serde(default)]
    frame_no: Option<Value>,
    #[serde(rename = "2d_pos", default)]
    pos_2d: Option<Vec<Value>>,
    #[serde(rename = "3d_pos", default)]
    pos_3d: Option<Vec<Value>>,
    #[serde(rename = "3d_rot", default)]
    rot_3d: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawFitnessFile {
    #[serde(default)]
    type_info: Option<RawTypeInfo>,
    #[serde(default)]
    frames: Vec<BTreeMap<String, Value>>,
}

#[derive(Deserialize, Default)]
struct RawTypeInfo {
    #[serde(default)]
    exercise: Option<String>,
    #[serde(default)]
    pose: Option<String>,
    #[serde(default)]
    conditions: Vec<Condition>,
}

#[derive(Deserialize)]
struct RawView {
    #[serde(default)]
    active: Option<String>,
    #[serde(default)]
    pts: Option<BTreeMap<String, Option<RawPoint>>>,
}

#[derive(Deserialize)]
struct RawPoint {
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Canonicalise a JSON id field (number or string) to a string.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a JSON frame number (number or numeric string).
fn frame_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract `n` scalars from a joint entry that is either a flat number list
/// (`[x, y, z, 1.0]`) or a nested one (`[[x], [y], [z], [1.0]]`).
fn joint_scalars<const N: usize>(joint: &Value) -> Option<[f32; N]> {
    let items = joint.as_array()?;
    if items.len() < N {
        return None;
    }
    let mut out = [0.0f32; N];
    for (slot, item) in out.iter_mut().zip(items.iter()) {
        let scalar = match item {
            Value::Array(inner) => inner.first()?.as_f64()?,
            other => other.as_f64()?,
        };
        *slot = scalar as f32;
    }
    Some(out)
}

/// Collect a `(24, N)` coordinate array from a per-joint value list,
/// rejecting any joint count other than 24.
fn joint_matrix<const N: usize>(
    joints: &[Value],
    what: &str,
    file: &str,
) -> Result<Array2<f32>, RecordRejection> {
    if joints.len() != NUM_JOINTS {
        return Err(RecordRejection::malformed(format!(
            "{file}: {what} has {} joints, expected {NUM_JOINTS}",
            joints.len()
        )));
    }
    let mut out = Array2::zeros((NUM_JOINTS, N));
    for (i, joint) in joints.iter().enumerate() {
        let scalars: [f32; N] = joint_scalars(joint).ok_or_else(|| {
            RecordRejection::malformed(format!("{file}: {what} joint {i} is not numeric"))
        })?;
        for (axis, &v) in scalars.iter().enumerate() {
            out[[i, axis]] = v;
        }
    }
    Ok(out)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RecordRejection> {
    let file_name = display_name(path);
    let bytes = std::fs::read(path)
        .map_err(|e| RecordRejection::malformed(format!("{file_name}: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RecordRejection::malformed(format!("{file_name}: invalid JSON: {e}")))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Recover `(action, actor, frame)` from a file-name stem.
///
/// 2D stems look like `{action}_{actor}_{camera}_{frame}`; 3D stems like
/// `3D_{action}_{actor}_{frame}`.
fn key_from_stem(stem: &str) -> Option<(String, String, u64)> {
    let parts: Vec<&str> = stem.split('_').collect();
    match parts.as_slice() {
        // The literal arm must come first: a 3D stem also has four parts.
        ["3D", action, actor, frame] => {
            Some((action.to_string(), actor.to_string(), frame.parse().ok()?))
        }
        [action, actor, _camera, frame] => {
            Some((action.to_string(), actor.to_string(), frame.parse().ok()?))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// 2D / 3D pose parsers
// ---------------------------------------------------------------------------

/// Parse one 2D pose-estimation annotation file into a raw-pixel record.
pub fn parse_pose2d(path: &Path) -> Result<Pose2dRecord, RecordRejection> {
    let file_name = display_name(path);
    let raw: RawPoseFile = read_json(path)?;

    let pos = raw.annotations.pos_2d.as_deref().ok_or_else(|| {
        RecordRejection::malformed(format!("{file_name}: missing `2d_pos`"))
    })?;
    let coords = joint_matrix::<2>(pos, "2d_pos", &file_name)?;

    let key = pose_key(&raw, path, &file_name)?;
    Ok(Pose2dRecord { key, coords })
}

/// Parse one 3D pose-estimation annotation file: coordinates plus rotations.
pub fn parse_pose3d(path: &Path) -> Result<Pose3dRecord, RecordRejection> {
    let file_name = display_name(path);
    let raw: RawPoseFile = read_json(path)?;

    let pos = raw.annotations.pos_3d.as_deref().ok_or_else(|| {
        RecordRejection::malformed(format!("{file_name}: missing `3d_pos`"))
    })?;
    let coords = joint_matrix::<3>(pos, "3d_pos", &file_name)?;

    // The rotation targets are part of the record; a file without them
    // cannot contribute a training row.
    let rot = raw.annotations.rot_3d.as_deref().ok_or_else(|| {
        RecordRejection::malformed(format!("{file_name}: missing `3d_rot`"))
    })?;
    let rotations = joint_matrix::<3>(rot, "3d_rot", &file_name)?;

    let key = pose_key(&raw, path, &file_name)?;
    Ok(Pose3dRecord { key, coords, rotations })
}

/// Resolve the composite identity from `info` fields, falling back to the
/// file-name stem.
fn pose_key(
    raw: &RawPoseFile,
    path: &Path,
    file_name: &str,
) -> Result<RecordKey, RecordRejection> {
    let info = raw.info.as_ref();
    let action = info.and_then(|i| i.action_category_id.as_ref()).and_then(id_string);
    let actor = info.and_then(|i| i.actor_id.as_ref()).and_then(id_string);
    let camera = info.and_then(|i| i.camera_no.as_ref()).and_then(id_string);
    let frame = raw.annotations.frame_no.as_ref().and_then(frame_number);

    if let (Some(action), Some(actor), Some(frame)) = (action.clone(), actor.clone(), frame) {
        return Ok(RecordKey { action, actor, camera, frame });
    }

    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    match key_from_stem(&stem) {
        Some((stem_action, stem_actor, stem_frame)) => Ok(RecordKey {
            action: action.unwrap_or(stem_action),
            actor: actor.unwrap_or(stem_actor),
            camera,
            frame: frame.unwrap_or(stem_frame),
        }),
        None => Err(RecordRejection::malformed(format!(
            "{file_name}: identity fields absent and file name is not parseable"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Fitness parser
// ---------------------------------------------------------------------------

/// Parse one view's `pts` object by named joint lookup.
///
/// Returns the keypoints plus the number of keys that matched no canonical
/// joint name.
fn parse_view_keypoints(pts: &BTreeMap<String, Option<RawPoint>>) -> (KeypointSet, usize) {
    let mut coords = Array2::zeros((NUM_JOINTS, 2));
    let mut visibility = Array1::from_elem(NUM_JOINTS, false);
    let mut unknown = 0usize;

    for (name, point) in pts {
        let Some(joint) = Joint::from_name(name) else {
            unknown += 1;
            continue;
        };
        if let Some(RawPoint { x: Some(x), y: Some(y) }) = point {
            let i = joint.index();
            coords[[i, 0]] = *x as f32;
            coords[[i, 1]] = *y as f32;
            visibility[i] = true;
        }
    }

    (KeypointSet { coords, visibility }, unknown)
}

/// Parse one fitness annotation file.
///
/// The free-text exercise name is resolved through `names`; an unmappable
/// name rejects the whole clip. Frames without any active view are dropped;
/// a clip with zero usable frames is rejected as malformed.
pub fn parse_fitness_clip(
    path: &Path,
    names: &ExerciseNameMap,
) -> Result<FitnessClip, RecordRejection> {
    let file_name = display_name(path);
    let raw: RawFitnessFile = read_json(path)?;

    let type_info = raw.type_info.unwrap_or_default();
    let exercise_kr = type_info.exercise.unwrap_or_default();
    let exercise = names.canonical(&exercise_kr).ok_or_else(|| {
        RecordRejection::unmapped_label(format!("{file_name}: `{exercise_kr}`"))
    })?;

    let mut frames = Vec::new();
    let mut unknown_joint_keys = 0usize;
    for frame in &raw.frames {
        let mut views = Vec::new();
        for view_name in VIEW_NAMES {
            let Some(value) = frame.get(view_name) else { continue };
            let Ok(view) = serde_json::from_value::<RawView>(value.clone()) else { continue };
            if view.active.as_deref() != Some("Yes") {
                continue;
            }
            let Some(pts) = view.pts else { continue };
            let (keypoints, unknown) = parse_view_keypoints(&pts);
            unknown_joint_keys += unknown;
            views.push((view_name.to_string(), keypoints));
        }
        if !views.is_empty() {
            frames.push(FitnessFrame { views });
        }
    }

    if frames.is_empty() {
        return Err(RecordRejection::malformed(format!(
            "{file_name}: no frame has an active view"
        )));
    }

    let correct = is_correct(&type_info.conditions);
    Ok(FitnessClip {
        file_name,
        exercise: exercise.to_owned(),
        exercise_kr,
        pose: type_info.pose.unwrap_or_default(),
        conditions: type_info.conditions,
        is_correct: correct,
        frames,
        unknown_joint_keys,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
