//! Geometric normalization of keypoint coordinates.
//!
//! Two independent families, selected per corpus:
//!
//! - **Fixed-frame** (pose-estimation corpus): 2D pixels divide by the
//!   configured image size, 3D millimetres centre on the per-sample joint
//!   centroid and divide by a fixed scale, rotations convert from degrees to
//!   radians. No clamping — out-of-frame points stay out of `[0, 1]`.
//! - **Per-sample adaptive** (fitness corpus): operates only over *visible*
//!   joints; bounding-box or hip-centred variants, see [`NormalizeMethod`].
//!
//! All functions return new arrays; raw records are never mutated in place.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::skeleton::Joint;

/// Inter-hip distances below this are treated as degenerate (scale = 1).
const HIP_SCALE_EPSILON: f32 = 1e-6;

// ---------------------------------------------------------------------------
// Fixed-frame normalization (pose-estimation corpus)
// ---------------------------------------------------------------------------

/// Map raw pixel coordinates into (approximately) `[0, 1]` by dividing each
/// axis by the image dimensions. Not clamped.
pub fn normalize_image_frame(coords: &Array2<f32>, width: f32, height: f32) -> Array2<f32> {
    let mut out = coords.clone();
    for mut row in out.rows_mut() {
        row[0] /= width;
        row[1] /= height;
    }
    out
}

/// Centre 3D coordinates on their per-sample centroid and divide by `scale`.
///
/// The centroid is the mean over all 24 joints; the normalized cloud is
/// therefore zero-mean by construction.
pub fn normalize_centroid(coords: &Array2<f32>, scale: f32) -> Array2<f32> {
    let centroid = coords
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(coords.ncols()));
    let mut out = coords.clone();
    for mut row in out.rows_mut() {
        for (v, c) in row.iter_mut().zip(centroid.iter()) {
            *v = (*v - c) / scale;
        }
    }
    out
}

/// Convert per-joint rotation triples from degrees to radians.
pub fn degrees_to_radians(rotations: &Array2<f32>) -> Array2<f32> {
    rotations.mapv(|deg| deg.to_radians())
}

// ---------------------------------------------------------------------------
// Per-sample adaptive normalization (fitness corpus)
// ---------------------------------------------------------------------------

/// Adaptive normalization variant for the fitness corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMethod {
    /// Translate by the visible-joint bounding-box minimum and divide by the
    /// per-axis extent; zero extent is treated as 1.
    Bbox,
    /// Centre on the hip midpoint and divide by the inter-hip distance;
    /// identity when either hip is invisible.
    HipCenter,
}

/// Normalize `(24, 2)` coordinates using only visible joints.
///
/// Invisible joints keep their pre-normalization placeholder coordinates in
/// both modes. With no visible joints at all the input is returned
/// unchanged.
pub fn normalize_adaptive(
    coords: &Array2<f32>,
    visibility: &Array1<bool>,
    method: NormalizeMethod,
) -> Array2<f32> {
    let mut out = coords.clone();
    if !visibility.iter().any(|&v| v) {
        return out;
    }

    match method {
        NormalizeMethod::Bbox => {
            let mut min = [f32::INFINITY; 2];
            let mut max = [f32::NEG_INFINITY; 2];
            for (row, &vis) in coords.rows().into_iter().zip(visibility.iter()) {
                if vis {
                    for axis in 0..2 {
                        min[axis] = min[axis].min(row[axis]);
                        max[axis] = max[axis].max(row[axis]);
                    }
                }
            }
            let extent = [
                if max[0] - min[0] > 0.0 { max[0] - min[0] } else { 1.0 },
                if max[1] - min[1] > 0.0 { max[1] - min[1] } else { 1.0 },
            ];
            for (mut row, &vis) in out.rows_mut().into_iter().zip(visibility.iter()) {
                if vis {
                    for axis in 0..2 {
                        row[axis] = (row[axis] - min[axis]) / extent[axis];
                    }
                }
            }
        }
        NormalizeMethod::HipCenter => {
            let (lh, rh) = (Joint::LeftHip.index(), Joint::RightHip.index());
            if !(visibility[lh] && visibility[rh]) {
                // No reliable anchor: skip normalization entirely.
                return out;
            }
            let center = [
                (coords[[lh, 0]] + coords[[rh, 0]]) / 2.0,
                (coords[[lh, 1]] + coords[[rh, 1]]) / 2.0,
            ];
            let dx = coords[[rh, 0]] - coords[[lh, 0]];
            let dy = coords[[rh, 1]] - coords[[lh, 1]];
            let mut scale = (dx * dx + dy * dy).sqrt();
            if scale < HIP_SCALE_EPSILON {
                scale = 1.0;
            }
            for (mut row, &vis) in out.rows_mut().into_iter().zip(visibility.iter()) {
                if vis {
                    for axis in 0..2 {
                        row[axis] = (row[axis] - center[axis]) / scale;
                    }
                }
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
