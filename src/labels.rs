//! Exercise-label resolution: free text → canonical name → dense class id.
//!
//! The fitness corpus labels exercises with free-text Korean names that vary
//! in spelling and spacing (`"푸시업"` / `"푸쉬업"`, trailing whitespace, …).
//! [`ExerciseNameMap`] folds those variants onto a fixed canonical English
//! vocabulary; [`LabelMap`] then assigns dense integer ids from the
//! configured target-class ordering. Both are built once per run and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Synonym table
// ---------------------------------------------------------------------------

/// Static synonym table: raw Korean exercise name → canonical English name.
///
/// Order matters: the substring-containment fallback in
/// [`ExerciseNameMap::canonical`] scans this table front to back, so more
/// specific variants must precede the generic ones they contain.
pub const EXERCISE_SYNONYMS: &[(&str, &str)] = &[
    // Squat family; the jump-squat compounds are classified by their lunge part.
    ("점프 스쿼트 사이드 다이나믹 런지", "Side Lunge"),
    ("점프 스쿼트 다이나믹 런지", "Lunge"),
    ("바벨 스쿼트", "Squat"),
    ("바벨 스쿼트 ", "Squat"),
    ("고블렛 스쿼트", "Squat"),
    ("스쿼트", "Squat"),
    // Lunge family
    ("크로스 런지", "Cross Lunge"),
    ("사이드 런지", "Side Lunge"),
    ("워킹 런지", "Walking Lunge"),
    ("런지", "Lunge"),
    ("런치", "Lunge"),
    // Push-up family
    ("니푸시업", "Knee Push Up"),
    ("니푸쉬업", "Knee Push Up"),
    ("푸시업", "Push Up"),
    ("푸쉬업", "Push Up"),
    // Plank
    ("플랭크&트위스트", "Plank"),
    ("플랭크", "Plank"),
    // Crunch family
    ("바이시클 크런치", "Bicycle Crunch"),
    ("바이시클크런치", "Bicycle Crunch"),
    ("스탠딩 사이드 크런치", "Standing Side Crunch"),
    ("크런치", "Crunch"),
    // Leg raises
    ("라잉 레그레이즈", "Lying Leg Raise"),
    ("라잉레그레이즈", "Lying Leg Raise"),
    ("행잉 레그레이즈", "Hanging Leg Raise"),
    // Deadlifts
    ("바벨 컨벤셔널 데드리프트", "Barbell Deadlift"),
    ("바벨 데드리프트", "Barbell Deadlift"),
    ("덤벨 데드리프트", "Dumbbell Deadlift"),
    ("스티프 레그 데드리프트", "Stiff Leg Deadlift"),
    // Rows
    ("바벨 로우", "Barbell Row"),
    ("바벨 로우 ", "Barbell Row"),
    ("바벨로우", "Barbell Row"),
    ("덤벨 벤트오버 로우", "Dumbbell Bent Over Row"),
    ("덤벨 로우", "Dumbbell Bent Over Row"),
    ("업라이트로우", "Upright Row"),
    ("업라이트 로우", "Upright Row"),
    // Raises and presses
    ("프런트 레이즈", "Front Raise"),
    ("사이드 레터럴 레이즈", "Side Lateral Raise"),
    ("사이드레터럴 레이즈", "Side Lateral Raise"),
    ("오버헤드 프레스", "Overhead Press"),
    ("오버헤드프레스", "Overhead Press"),
    ("숄더 프레스", "Shoulder Press"),
    // Hip thrust
    ("힙스러스트", "Hip Thrust"),
    ("힙쓰러스트", "Hip Thrust"),
    // Good morning
    ("굿모닝", "Good Morning"),
    ("굿 모닝", "Good Morning"),
    // Burpee
    ("버피 테스트", "Burpee Test"),
    ("버피테스트", "Burpee Test"),
    // Others
    ("스탠딩 니업", "Standing Knee Up"),
    ("Y - Exercise", "Y Exercise"),
];

/// Default target-class ordering: the canonical exercises the classifier is
/// trained on. Ids are assigned in this order.
pub const DEFAULT_TARGET_EXERCISES: &[&str] = &[
    "Squat",
    "Lunge",
    "Cross Lunge",
    "Side Lunge",
    "Push Up",
    "Knee Push Up",
    "Plank",
    "Crunch",
    "Bicycle Crunch",
    "Standing Side Crunch",
    "Lying Leg Raise",
    "Barbell Deadlift",
    "Barbell Row",
    "Dumbbell Bent Over Row",
    "Upright Row",
    "Front Raise",
    "Side Lateral Raise",
    "Overhead Press",
    "Hip Thrust",
    "Good Morning",
    "Burpee Test",
];

// ---------------------------------------------------------------------------
// ExerciseNameMap
// ---------------------------------------------------------------------------

/// Immutable resolver from free-text exercise names to canonical names.
///
/// Resolution order:
/// 1. exact lookup in the synonym table;
/// 2. substring containment against the table, in table order, accepting a
///    hit when the table key contains the input or the input contains the
///    table key.
///
/// Unresolvable names yield `None`; the caller rejects the record upstream.
#[derive(Debug)]
pub struct ExerciseNameMap {
    exact: HashMap<&'static str, &'static str>,
}

impl ExerciseNameMap {
    /// Build the resolver from the static synonym table.
    pub fn new() -> Self {
        ExerciseNameMap { exact: EXERCISE_SYNONYMS.iter().copied().collect() }
    }

    /// Resolve a raw exercise name to its canonical English name.
    pub fn canonical(&self, raw: &str) -> Option<&'static str> {
        if raw.trim().is_empty() {
            return None;
        }
        if let Some(&name) = self.exact.get(raw) {
            return Some(name);
        }
        // Containment fallback, in table order.
        for &(variant, canonical) in EXERCISE_SYNONYMS {
            if variant.contains(raw) || raw.contains(variant) {
                return Some(canonical);
            }
        }
        None
    }
}

impl Default for ExerciseNameMap {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// LabelMap
// ---------------------------------------------------------------------------

/// Immutable bijection between canonical class names and dense ids `[0, K)`.
///
/// Built once from a fixed ordered class list; ids are stable across runs as
/// long as the configured list does not change.
#[derive(Debug, Clone)]
pub struct LabelMap {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl LabelMap {
    /// Build a label map from an ordered class list.
    ///
    /// Duplicate names keep their first id; in practice the config validator
    /// rejects duplicates before this is reached.
    pub fn new<S: AsRef<str>>(classes: &[S]) -> Self {
        let names: Vec<String> = classes.iter().map(|s| s.as_ref().to_owned()).collect();
        let mut ids = HashMap::with_capacity(names.len());
        for (id, name) in names.iter().enumerate() {
            ids.entry(name.clone()).or_insert(id);
        }
        LabelMap { names, ids }
    }

    /// Dense id of a canonical class name, if it is a configured target.
    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    /// Class name for a dense id.
    pub fn name_of(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the map holds zero classes.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

// ---------------------------------------------------------------------------
// Conditions / correctness
// ---------------------------------------------------------------------------

/// One posture-condition annotation from a fitness clip's `type_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Condition {
    /// Condition description, when the corpus provides one.
    #[serde(default)]
    pub condition: Option<String>,
    /// Whether the condition was satisfied in this clip.
    #[serde(default)]
    pub value: bool,
}

/// Derive the posture-correctness label for a sample.
///
/// `true` iff the condition list is non-empty and every condition holds.
/// An empty list means "no evidence of correctness" and yields `false`.
pub fn is_correct(conditions: &[Condition]) -> bool {
    !conditions.is_empty() && conditions.iter().all(|c| c.value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
