//! Derived-feature extraction: joint angles and feature-vector assembly.
//!
//! Angles are computed at the middle joint of each of the 10 fixed triplets
//! in [`crate::skeleton::ANGLE_TRIPLETS`] using the standard vector-angle
//! formula. A triplet with any invisible joint emits exactly `0.0`.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::normalize::{normalize_adaptive, NormalizeMethod};
use crate::skeleton::{ANGLE_TRIPLETS, NUM_ANGLES, NUM_JOINTS};

/// Guards the angle denominator against division by zero.
const ANGLE_EPSILON: f32 = 1e-8;

// ---------------------------------------------------------------------------
// FeatureType
// ---------------------------------------------------------------------------

/// Feature-vector layout, fixed for an entire pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Flattened normalized coordinates only: `24 × 2 = 48` dims.
    Coordinates,
    /// Joint angles only: `10` dims.
    Angles,
    /// Coordinates followed by angles: `58` dims.
    Hybrid,
}

impl FeatureType {
    /// Dimensionality of the feature vector this type produces.
    pub fn dim(self) -> usize {
        match self {
            FeatureType::Coordinates => NUM_JOINTS * 2,
            FeatureType::Angles => NUM_ANGLES,
            FeatureType::Hybrid => NUM_JOINTS * 2 + NUM_ANGLES,
        }
    }
}

// ---------------------------------------------------------------------------
// Angle extraction
// ---------------------------------------------------------------------------

/// Angle at `vertex` formed by the rays to `a` and `b`, in radians.
fn angle_at(coords: &Array2<f32>, a: usize, vertex: usize, b: usize) -> f32 {
    let v1 = [coords[[a, 0]] - coords[[vertex, 0]], coords[[a, 1]] - coords[[vertex, 1]]];
    let v2 = [coords[[b, 0]] - coords[[vertex, 0]], coords[[b, 1]] - coords[[vertex, 1]]];
    let dot = v1[0] * v2[0] + v1[1] * v2[1];
    let n1 = (v1[0] * v1[0] + v1[1] * v1[1]).sqrt();
    let n2 = (v2[0] * v2[0] + v2[1] * v2[1]).sqrt();
    let cos = (dot / (n1 * n2 + ANGLE_EPSILON)).clamp(-1.0, 1.0);
    cos.acos()
}

/// Compute the 10 angle features over `(24, 2)` coordinates.
///
/// Triplets with any invisible joint yield exactly `0.0`.
pub fn joint_angles(coords: &Array2<f32>, visibility: &Array1<bool>) -> Array1<f32> {
    let mut angles = Array1::zeros(NUM_ANGLES);
    for (i, &(a, vertex, b)) in ANGLE_TRIPLETS.iter().enumerate() {
        let (ia, iv, ib) = (a.index(), vertex.index(), b.index());
        if visibility[ia] && visibility[iv] && visibility[ib] {
            angles[i] = angle_at(coords, ia, iv, ib);
        }
    }
    angles
}

// ---------------------------------------------------------------------------
// FeatureExtractor
// ---------------------------------------------------------------------------

/// Assembles final feature vectors from raw keypoints.
///
/// Both the feature type and the adaptive-normalization method are fixed at
/// construction so every sample in a run shares one layout.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    feature_type: FeatureType,
    method: NormalizeMethod,
}

impl FeatureExtractor {
    /// Create an extractor with the run's feature-type and normalization
    /// policy.
    pub fn new(feature_type: FeatureType, method: NormalizeMethod) -> Self {
        FeatureExtractor { feature_type, method }
    }

    /// Feature dimensionality this extractor produces.
    pub fn dim(&self) -> usize {
        self.feature_type.dim()
    }

    /// Extract the feature vector for one sample.
    ///
    /// Coordinates are adaptive-normalized first; angles are computed on the
    /// normalized coordinates (angles are invariant under the translation
    /// and uniform scaling of hip-centred mode, but bbox mode scales axes
    /// independently, so the ordering matters and is fixed here).
    pub fn extract(&self, coords: &Array2<f32>, visibility: &Array1<bool>) -> Array1<f32> {
        let normalized = normalize_adaptive(coords, visibility, self.method);
        match self.feature_type {
            FeatureType::Coordinates => flatten(&normalized),
            FeatureType::Angles => joint_angles(&normalized, visibility),
            FeatureType::Hybrid => {
                let coords_flat = flatten(&normalized);
                let angles = joint_angles(&normalized, visibility);
                let mut out = Array1::zeros(coords_flat.len() + angles.len());
                out.slice_mut(ndarray::s![..coords_flat.len()]).assign(&coords_flat);
                out.slice_mut(ndarray::s![coords_flat.len()..]).assign(&angles);
                out
            }
        }
    }
}

/// Row-major flatten of a `(24, 2)` array into `(48,)`.
fn flatten(coords: &Array2<f32>) -> Array1<f32> {
    Array1::from_iter(coords.iter().copied())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Joint;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    fn all_visible() -> Array1<bool> {
        arr1(&[true; NUM_JOINTS])
    }

    /// Place a right-angle elbow: shoulder above, wrist to the side.
    fn right_angle_pose() -> Array2<f32> {
        let mut coords = Array2::zeros((NUM_JOINTS, 2));
        coords[[Joint::LeftShoulder.index(), 0]] = 0.0;
        coords[[Joint::LeftShoulder.index(), 1]] = 0.0;
        coords[[Joint::LeftElbow.index(), 0]] = 0.0;
        coords[[Joint::LeftElbow.index(), 1]] = 1.0;
        coords[[Joint::LeftWrist.index(), 0]] = 1.0;
        coords[[Joint::LeftWrist.index(), 1]] = 1.0;
        coords
    }

    #[test]
    fn feature_dims_match_layout() {
        assert_eq!(FeatureType::Coordinates.dim(), 48);
        assert_eq!(FeatureType::Angles.dim(), 10);
        assert_eq!(FeatureType::Hybrid.dim(), 58);
    }

    #[test]
    fn right_angle_measures_half_pi() {
        let coords = right_angle_pose();
        let angles = joint_angles(&coords, &all_visible());
        // Triplet 2 is (LeftShoulder, LeftElbow, LeftWrist).
        assert_abs_diff_eq!(angles[2], std::f32::consts::FRAC_PI_2, epsilon = 1e-4);
    }

    #[test]
    fn collinear_points_measure_zero_or_pi() {
        let mut coords = Array2::zeros((NUM_JOINTS, 2));
        // Hip, knee, ankle on a vertical line, knee between the other two.
        coords[[Joint::LeftHip.index(), 1]] = 0.0;
        coords[[Joint::LeftKnee.index(), 1]] = 1.0;
        coords[[Joint::LeftAnkle.index(), 1]] = 2.0;
        let angles = joint_angles(&coords, &all_visible());
        assert_abs_diff_eq!(angles[0], std::f32::consts::PI, epsilon = 1e-3);

        // Hip and ankle on the same side of the knee: angle 0.
        coords[[Joint::LeftAnkle.index(), 1]] = -1.0;
        let angles = joint_angles(&coords, &all_visible());
        assert_abs_diff_eq!(angles[0], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn invisible_joint_in_triplet_yields_exact_zero() {
        let coords = right_angle_pose();
        let mut vis = [true; NUM_JOINTS];
        vis[Joint::LeftElbow.index()] = false;
        let angles = joint_angles(&coords, &arr1(&vis));
        assert_eq!(angles[2], 0.0);
    }

    #[test]
    fn degenerate_vertex_does_not_produce_nan() {
        // All three joints at the same point: zero-length vectors.
        let coords = Array2::zeros((NUM_JOINTS, 2));
        let angles = joint_angles(&coords, &all_visible());
        for &a in angles.iter() {
            assert!(a.is_finite());
        }
    }

    #[test]
    fn hybrid_concatenates_coordinates_then_angles() {
        let extractor = FeatureExtractor::new(FeatureType::Hybrid, NormalizeMethod::Bbox);
        let coords = right_angle_pose();
        let vis = all_visible();
        let hybrid = extractor.extract(&coords, &vis);
        assert_eq!(hybrid.len(), 58);

        let coords_only =
            FeatureExtractor::new(FeatureType::Coordinates, NormalizeMethod::Bbox).extract(&coords, &vis);
        let angles_only =
            FeatureExtractor::new(FeatureType::Angles, NormalizeMethod::Bbox).extract(&coords, &vis);
        for i in 0..48 {
            assert_abs_diff_eq!(hybrid[i], coords_only[i], epsilon = 0.0);
        }
        for i in 0..10 {
            assert_abs_diff_eq!(hybrid[48 + i], angles_only[i], epsilon = 0.0);
        }
    }

    #[test]
    fn extractor_reports_its_dimension() {
        for (ty, dim) in [
            (FeatureType::Coordinates, 48),
            (FeatureType::Angles, 10),
            (FeatureType::Hybrid, 58),
        ] {
            assert_eq!(FeatureExtractor::new(ty, NormalizeMethod::Bbox).dim(), dim);
        }
    }
}
