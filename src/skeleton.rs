//! Joint vocabularies for the two annotation corpora.
//!
//! Both corpora annotate a fixed 24-joint skeleton, but with different joint
//! sets and naming conventions:
//!
//! - The fitness corpus keys joints by English display names
//!   (`"Left Shoulder"`, `"Neck"`, …) inside each view's `pts` object.
//!   [`Joint`] is the canonical enumeration; the index ↔ name bijection is
//!   fixed and input keys are resolved through [`Joint::from_name`] rather
//!   than used as free strings.
//! - The pose-estimation corpus lists joints positionally in SMPL order;
//!   [`SMPL_JOINT_NAMES`] is that ordered vocabulary.
//!
//! The 10 angle-feature triplets over the fitness skeleton live here too,
//! next to the joint identities they reference.

/// Number of joints per skeleton in both corpora.
pub const NUM_JOINTS: usize = 24;

// ---------------------------------------------------------------------------
// Joint (fitness corpus)
// ---------------------------------------------------------------------------

/// Canonical fitness-corpus joint. Discriminants are the array row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum Joint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
    Neck = 17,
    LeftPalm = 18,
    RightPalm = 19,
    Back = 20,
    Waist = 21,
    LeftFoot = 22,
    RightFoot = 23,
}

/// Display names of the fitness joints, in index order. These are the exact
/// key strings used by the annotation files' `pts` objects.
pub const JOINT_NAMES: [&str; NUM_JOINTS] = [
    "Nose",
    "Left Eye",
    "Right Eye",
    "Left Ear",
    "Right Ear",
    "Left Shoulder",
    "Right Shoulder",
    "Left Elbow",
    "Right Elbow",
    "Left Wrist",
    "Right Wrist",
    "Left Hip",
    "Right Hip",
    "Left Knee",
    "Right Knee",
    "Left Ankle",
    "Right Ankle",
    "Neck",
    "Left Palm",
    "Right Palm",
    "Back",
    "Waist",
    "Left Foot",
    "Right Foot",
];

const ALL_JOINTS: [Joint; NUM_JOINTS] = [
    Joint::Nose,
    Joint::LeftEye,
    Joint::RightEye,
    Joint::LeftEar,
    Joint::RightEar,
    Joint::LeftShoulder,
    Joint::RightShoulder,
    Joint::LeftElbow,
    Joint::RightElbow,
    Joint::LeftWrist,
    Joint::RightWrist,
    Joint::LeftHip,
    Joint::RightHip,
    Joint::LeftKnee,
    Joint::RightKnee,
    Joint::LeftAnkle,
    Joint::RightAnkle,
    Joint::Neck,
    Joint::LeftPalm,
    Joint::RightPalm,
    Joint::Back,
    Joint::Waist,
    Joint::LeftFoot,
    Joint::RightFoot,
];

impl Joint {
    /// Row index of this joint in a `(24, D)` coordinate array.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name, as used by annotation-file `pts` keys.
    pub fn name(self) -> &'static str {
        JOINT_NAMES[self.index()]
    }

    /// Resolve an input key string to a canonical joint.
    ///
    /// Returns `None` for unknown keys; callers count those explicitly
    /// rather than dropping them silently.
    pub fn from_name(name: &str) -> Option<Joint> {
        JOINT_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| ALL_JOINTS[i])
    }

    /// All joints in index order.
    pub fn all() -> &'static [Joint; NUM_JOINTS] {
        &ALL_JOINTS
    }
}

// ---------------------------------------------------------------------------
// SMPL vocabulary (pose-estimation corpus)
// ---------------------------------------------------------------------------

/// Ordered joint vocabulary of the 3D pose-estimation corpus (SMPL order).
/// Positional: row `i` of a 2D/3D coordinate array is `SMPL_JOINT_NAMES[i]`.
pub const SMPL_JOINT_NAMES: [&str; NUM_JOINTS] = [
    "Pelvis",
    "L_Hip",
    "R_Hip",
    "Spine1",
    "L_Knee",
    "R_Knee",
    "Spine2",
    "L_Ankle",
    "R_Ankle",
    "Spine3",
    "L_Foot",
    "R_Foot",
    "Neck",
    "L_Collar",
    "R_Collar",
    "Head",
    "L_Shoulder",
    "R_Shoulder",
    "L_Elbow",
    "R_Elbow",
    "L_Wrist",
    "R_Wrist",
    "L_Hand",
    "R_Hand",
];

// ---------------------------------------------------------------------------
// Angle triplets
// ---------------------------------------------------------------------------

/// The 10 joint triplets whose middle-joint angles form the angle features.
///
/// Order is fixed: it defines the angle-feature dimension layout and must
/// stay stable across runs.
pub const ANGLE_TRIPLETS: [(Joint, Joint, Joint); 10] = [
    (Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle),
    (Joint::RightHip, Joint::RightKnee, Joint::RightAnkle),
    (Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist),
    (Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist),
    (Joint::LeftElbow, Joint::LeftShoulder, Joint::LeftHip),
    (Joint::RightElbow, Joint::RightShoulder, Joint::RightHip),
    (Joint::LeftShoulder, Joint::LeftHip, Joint::LeftKnee),
    (Joint::RightShoulder, Joint::RightHip, Joint::RightKnee),
    (Joint::LeftShoulder, Joint::Neck, Joint::RightShoulder),
    (Joint::LeftHip, Joint::Waist, Joint::RightHip),
];

/// Number of angle features produced per sample.
pub const NUM_ANGLES: usize = ANGLE_TRIPLETS.len();

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
