//! End-to-end tests for [`pose_prep::pipeline`].
//!
//! Each test writes a small annotation corpus into a [`tempfile::TempDir`],
//! runs a full pass, and inspects the NPZ bundle, the metadata document, and
//! the returned report. Corpora are hand-built so every count is exact.

use ndarray::{Array1, Array2};
use ndarray_npy::NpzReader;
use serde_json::{json, Value};
use std::fs::File;
use std::path::Path;
use tempfile::TempDir;

use pose_prep::config::PipelineConfig;
use pose_prep::pipeline::{run_fitness_pass, run_pose_pass};
use pose_prep::skeleton::JOINT_NAMES;
use pose_prep::{FeatureType, PipelineError};

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

/// A full `pts` object with every joint visible at distinct coordinates.
fn full_pts(offset: f64) -> Value {
    let mut map = serde_json::Map::new();
    for (i, name) in JOINT_NAMES.iter().enumerate() {
        map.insert(
            name.to_string(),
            json!({"x": offset + i as f64 * 10.0, "y": offset + i as f64 * 5.0}),
        );
    }
    Value::Object(map)
}

/// Write one fitness clip with `n_frames` frames, all on `view1`.
fn write_clip(dir: &Path, name: &str, exercise: &str, correct: bool, n_frames: usize) {
    let frames: Vec<Value> = (0..n_frames)
        .map(|f| json!({"view1": {"active": "Yes", "pts": full_pts(f as f64)}}))
        .collect();
    let value = json!({
        "type_info": {
            "exercise": exercise,
            "pose": "스탠다드",
            "conditions": [{"condition": "자세 유지", "value": correct}]
        },
        "frames": frames
    });
    std::fs::write(dir.join(name), value.to_string()).unwrap();
}

/// Write a matched 2D/3D pose-estimation pair under the corpus layout.
fn write_pose_pair(root_2d: &Path, root_3d: &Path, action: &str, actor: &str, frame: u64) {
    let pos_2d: Vec<Value> = (0..24).map(|i| json!([i as f64 * 80.0, i as f64 * 45.0])).collect();
    let file_2d = json!({
        "info": {"action_category_id": action, "actor_id": actor, "camera_no": 1},
        "annotations": {"frame_no": frame, "2d_pos": pos_2d}
    });
    std::fs::write(
        root_2d.join(format!("{action}_{actor}_1_{frame}.json")),
        file_2d.to_string(),
    )
    .unwrap();

    let pos_3d: Vec<Value> =
        (0..24).map(|i| json!([[i as f64 * 100.0], [0.0], [50.0], [1.0]])).collect();
    let rot_3d: Vec<Value> = (0..24).map(|_| json!([[180.0], [90.0], [0.0]])).collect();
    let file_3d = json!({
        "info": {"action_category_id": action, "actor_id": actor},
        "annotations": {"frame_no": frame, "3d_pos": pos_3d, "3d_rot": rot_3d}
    });
    let subdir = root_3d.join(format!("{action}_{actor}"));
    std::fs::create_dir_all(&subdir).unwrap();
    std::fs::write(
        subdir.join(format!("3D_{action}_{actor}_{frame}.json")),
        file_3d.to_string(),
    )
    .unwrap();
}

/// A corpus of squat and plank clips large enough to stratify: 15 clips per
/// class, 2 frames each, so 30 samples per class.
fn balanced_fitness_corpus(dir: &Path) {
    for i in 0..15 {
        write_clip(dir, &format!("squat_{i:02}.json"), "스쿼트", i % 2 == 0, 2);
        write_clip(dir, &format!("plank_{i:02}.json"), "플랭크", true, 2);
    }
}

fn fitness_config(corpus: &TempDir, out: &Path) -> PipelineConfig {
    PipelineConfig {
        fitness_dirs: vec![corpus.path().to_path_buf()],
        output_dir: out.to_path_buf(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Fitness pass
// ---------------------------------------------------------------------------

#[test]
fn fitness_pass_produces_a_complete_bundle() {
    let corpus = TempDir::new().unwrap();
    balanced_fitness_corpus(corpus.path());
    let out = TempDir::new().unwrap();

    let report = run_fitness_pass(&fitness_config(&corpus, out.path())).unwrap();
    assert_eq!(report.files, 30);
    assert_eq!(report.samples, 60);
    assert!(report.stratified);
    assert_eq!(report.partition_sizes.iter().sum::<usize>(), 60);
    assert_eq!(report.skips.total_skipped(), 0);

    let mut npz = NpzReader::new(File::open(&report.bundle).unwrap()).unwrap();
    let x_train: Array2<f32> = npz.by_name("X_train").unwrap();
    assert_eq!(x_train.dim(), (report.partition_sizes[0], 58));
    let y_test: Array1<u64> = npz.by_name("y_exercise_test").unwrap();
    assert_eq!(y_test.len(), report.partition_sizes[2]);

    let meta: Value =
        serde_json::from_str(&std::fs::read_to_string(&report.metadata).unwrap()).unwrap();
    assert_eq!(meta["feature_dim"], 58);
    assert_eq!(meta["stratified"], true);
    assert_eq!(meta["class_counts"]["Squat"], 30);
    assert_eq!(meta["class_counts"]["Plank"], 30);
    assert_eq!(
        meta["provenance"]["train"].as_array().unwrap().len(),
        report.partition_sizes[0]
    );

    // Provenance rows carry the clip's condition annotations verbatim, with
    // the derived correctness agreeing with them.
    for row in meta["provenance"]["train"].as_array().unwrap() {
        let conditions = row["conditions"].as_array().unwrap();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0]["condition"], "자세 유지");
        assert_eq!(row["is_correct"], conditions[0]["value"]);
        let id = row["exercise_id"].as_u64().unwrap();
        let class = meta["classes"][id as usize].as_str().unwrap();
        assert_eq!(row["exercise"], class);
    }
}

#[test]
fn fitness_pass_tallies_every_skip_reason() {
    let corpus = TempDir::new().unwrap();
    balanced_fitness_corpus(corpus.path());
    // Unmapped label.
    write_clip(corpus.path(), "swim.json", "수영", true, 1);
    // Target-list miss: maps to a canonical name outside the configured set.
    write_clip(corpus.path(), "burpee.json", "버피 테스트", true, 1);
    // Malformed JSON.
    std::fs::write(corpus.path().join("broken.json"), "{oops").unwrap();
    // 3D variant, filtered by name before parsing.
    std::fs::write(corpus.path().join("squat-3d.json"), "{not even json").unwrap();
    // Low visibility: a single visible joint.
    let sparse = json!({
        "type_info": {"exercise": "스쿼트", "conditions": [{"value": true}]},
        "frames": [{"view1": {"active": "Yes", "pts": {"Nose": {"x": 1, "y": 1}}}}]
    });
    std::fs::write(corpus.path().join("sparse.json"), sparse.to_string()).unwrap();

    let out = TempDir::new().unwrap();
    let mut config = fitness_config(&corpus, out.path());
    config.target_exercises = vec!["Squat".into(), "Plank".into()];

    let report = run_fitness_pass(&config).unwrap();
    assert_eq!(report.samples, 60);
    assert_eq!(report.skips.unmapped_label, 1);
    assert_eq!(report.skips.unknown_exercise, 1);
    assert_eq!(report.skips.malformed, 1);
    assert_eq!(report.skips.low_visibility, 1);
    assert_eq!(report.skips.total_skipped(), 4);
}

#[test]
fn fitness_split_membership_is_reproducible() {
    let corpus = TempDir::new().unwrap();
    balanced_fitness_corpus(corpus.path());

    let read_y = |out: &Path| -> (Vec<u64>, Vec<u64>) {
        let config = fitness_config(&corpus, out);
        let report = run_fitness_pass(&config).unwrap();
        let mut npz = NpzReader::new(File::open(&report.bundle).unwrap()).unwrap();
        let train: Array1<u64> = npz.by_name("y_exercise_train").unwrap();
        let test: Array1<u64> = npz.by_name("y_exercise_test").unwrap();
        (train.to_vec(), test.to_vec())
    };

    let out_a = TempDir::new().unwrap();
    let out_b = TempDir::new().unwrap();
    assert_eq!(read_y(out_a.path()), read_y(out_b.path()));
}

#[test]
fn first_frame_only_mode_keeps_one_sample_per_clip() {
    let corpus = TempDir::new().unwrap();
    balanced_fitness_corpus(corpus.path());
    let out = TempDir::new().unwrap();
    let mut config = fitness_config(&corpus, out.path());
    config.use_all_frames = false;
    config.feature_type = FeatureType::Angles;

    let report = run_fitness_pass(&config).unwrap();
    assert_eq!(report.samples, 30);

    let mut npz = NpzReader::new(File::open(&report.bundle).unwrap()).unwrap();
    let x: Array2<f32> = npz.by_name("X_train").unwrap();
    assert_eq!(x.ncols(), 10);
}

#[test]
fn corpus_of_only_bad_files_is_fatal() {
    let corpus = TempDir::new().unwrap();
    write_clip(corpus.path(), "swim.json", "수영", true, 1);
    let out = TempDir::new().unwrap();

    let err = run_fitness_pass(&fitness_config(&corpus, out.path())).unwrap_err();
    match err {
        PipelineError::NoUsableSamples { skipped } => assert_eq!(skipped, 1),
        other => panic!("expected NoUsableSamples, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Pose-estimation pass
// ---------------------------------------------------------------------------

#[test]
fn pose_pass_normalizes_and_splits_two_ways() {
    let root_2d = TempDir::new().unwrap();
    let root_3d = TempDir::new().unwrap();
    for frame in 0..10 {
        write_pose_pair(root_2d.path(), root_3d.path(), "70", "M180D", frame);
    }
    // A 2D record with no 3D counterpart.
    let orphan: Vec<Value> = (0..24).map(|i| json!([i as f64, 0.0])).collect();
    std::fs::write(
        root_2d.path().join("71_X_1_0.json"),
        json!({
            "info": {"action_category_id": 71, "actor_id": "X", "camera_no": 1},
            "annotations": {"frame_no": 0, "2d_pos": orphan}
        })
        .to_string(),
    )
    .unwrap();

    let out = TempDir::new().unwrap();
    let config = PipelineConfig {
        pose_2d_dir: Some(root_2d.path().to_path_buf()),
        pose_3d_dir: Some(root_3d.path().to_path_buf()),
        output_dir: out.path().to_path_buf(),
        ..Default::default()
    };
    let report = run_pose_pass(&config).unwrap();
    assert_eq!(report.files, 11);
    assert_eq!(report.pairs, 10);
    assert_eq!(report.skips.unmatched, 1);
    // Default pose_val_size 0.2: 8 train / 2 val.
    assert_eq!(report.partition_sizes, [8, 2]);

    let mut npz = NpzReader::new(File::open(&report.bundle).unwrap()).unwrap();
    let x: Array2<f32> = npz.by_name("X_train").unwrap();
    assert_eq!(x.dim(), (8, 48));
    // Joint 12's x pixel is 12 * 80 = 960 on a 1920-wide frame.
    assert!((x[[0, 24]] - 0.5).abs() < 1e-6);

    let y: Array2<f32> = npz.by_name("Y_train").unwrap();
    assert_eq!(y.dim(), (8, 72));
    // Centroid-centred: joint coordinates sum to zero per axis.
    let x_sum: f32 = (0..24).map(|j| y[[0, j * 3]]).sum();
    assert!(x_sum.abs() < 1e-3);

    let r: Array2<f32> = npz.by_name("R_train").unwrap();
    // 180 degrees → π radians.
    assert!((r[[0, 0]] - std::f32::consts::PI).abs() < 1e-5);

    let img: Array1<f32> = npz.by_name("img_size").unwrap();
    assert_eq!(img.to_vec(), vec![1920.0, 1080.0]);

    let meta: Value =
        serde_json::from_str(&std::fs::read_to_string(&report.metadata).unwrap()).unwrap();
    assert_eq!(meta["joint_names"][0], "Pelvis");
    assert_eq!(meta["skips"]["unmatched"], 1);
}

#[test]
fn pose_pass_with_empty_2d_root_is_fatal() {
    let root_2d = TempDir::new().unwrap();
    let root_3d = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let config = PipelineConfig {
        pose_2d_dir: Some(root_2d.path().to_path_buf()),
        pose_3d_dir: Some(root_3d.path().to_path_buf()),
        output_dir: out.path().to_path_buf(),
        ..Default::default()
    };
    assert!(matches!(run_pose_pass(&config), Err(PipelineError::EmptyCorpus { .. })));
}
