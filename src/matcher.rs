//! Cross-corpus matching: pairing each 2D record with its 3D counterpart.
//!
//! The 3D corpus lays files out as
//! `{root}/{action}_{actor}/3D_{action}_{actor}_{frame}.json`, so a match is
//! normally a single path probe. Batches that deviate from that layout are
//! covered by a one-time recursive scan that indexes every `3D_*.json` under
//! the root by its `(action, actor, frame)` stem. The camera number plays no
//! part in matching; the 3D annotations are camera-independent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::parse::RecordKey;

/// Outcome of resolving one 2D record against the 3D corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Exactly one 3D file matched.
    Matched(PathBuf),
    /// Several 3D files share the key; the lexicographically first path is
    /// chosen so the outcome is stable across runs.
    Ambiguous {
        /// The path selected deterministically.
        chosen: PathBuf,
        /// Total number of candidates that shared the key.
        candidates: usize,
    },
    /// No 3D file matched.
    NotFound,
}

impl MatchOutcome {
    /// The matched path, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            MatchOutcome::Matched(p) => Some(p),
            MatchOutcome::Ambiguous { chosen, .. } => Some(chosen),
            MatchOutcome::NotFound => None,
        }
    }
}

/// Resolves `(action, actor, frame)` keys to 3D annotation files.
pub struct CrossCorpusMatcher {
    root: PathBuf,
    // Built on the first direct-path miss; maps the stem key to every path
    // carrying it, sorted.
    fallback: Option<BTreeMap<(String, String, u64), Vec<PathBuf>>>,
}

impl CrossCorpusMatcher {
    /// Create a matcher over a 3D corpus root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CrossCorpusMatcher { root: root.into(), fallback: None }
    }

    /// The conventional path for a key under the corpus layout.
    fn direct_path(&self, key: &RecordKey) -> PathBuf {
        let (action, actor, frame) = key.match_key();
        self.root
            .join(format!("{action}_{actor}"))
            .join(format!("3D_{action}_{actor}_{frame}.json"))
    }

    /// Resolve one key to its 3D file.
    pub fn resolve(&mut self, key: &RecordKey) -> MatchOutcome {
        let direct = self.direct_path(key);
        if direct.is_file() {
            return MatchOutcome::Matched(direct);
        }

        let index = self.fallback_index();
        let (action, actor, frame) = key.match_key();
        let lookup = (action.to_owned(), actor.to_owned(), frame);
        match index.get(&lookup).map(Vec::as_slice) {
            None | Some([]) => MatchOutcome::NotFound,
            Some([only]) => MatchOutcome::Matched(only.clone()),
            Some(candidates) => {
                warn!(
                    action,
                    actor,
                    frame,
                    candidates = candidates.len(),
                    "key matched by more than one annotation file"
                );
                MatchOutcome::Ambiguous {
                    chosen: candidates[0].clone(),
                    candidates: candidates.len(),
                }
            }
        }
    }

    fn fallback_index(&mut self) -> &BTreeMap<(String, String, u64), Vec<PathBuf>> {
        if self.fallback.is_none() {
            let mut index = BTreeMap::new();
            scan_dir(&self.root, &mut index);
            for paths in index.values_mut() {
                paths.sort();
            }
            debug!(root = %self.root.display(), keys = index.len(), "built fallback index");
            self.fallback = Some(index);
        }
        self.fallback.as_ref().unwrap()
    }
}

/// Parse `3D_{action}_{actor}_{frame}` out of a file stem.
fn stem_key(stem: &str) -> Option<(String, String, u64)> {
    let parts: Vec<&str> = stem.split('_').collect();
    match parts.as_slice() {
        ["3D", action, actor, frame] => {
            Some((action.to_string(), actor.to_string(), frame.parse().ok()?))
        }
        _ => None,
    }
}

fn scan_dir(dir: &Path, index: &mut BTreeMap<(String, String, u64), Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, index);
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        if let Some(key) = stem_key(stem) {
            index.entry(key).or_insert_with(Vec::new).push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(action: &str, actor: &str, frame: u64) -> RecordKey {
        RecordKey {
            action: action.to_owned(),
            actor: actor.to_owned(),
            camera: Some("1".to_owned()),
            frame,
        }
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"{}").unwrap();
    }

    #[test]
    fn direct_layout_resolves_without_scanning() {
        let dir = TempDir::new().unwrap();
        let expected = dir.path().join("70_M180D").join("3D_70_M180D_12.json");
        touch(&expected);

        let mut matcher = CrossCorpusMatcher::new(dir.path());
        assert_eq!(matcher.resolve(&key("70", "M180D", 12)), MatchOutcome::Matched(expected));
    }

    #[test]
    fn camera_differences_do_not_affect_the_match() {
        let dir = TempDir::new().unwrap();
        let expected = dir.path().join("70_A").join("3D_70_A_0.json");
        touch(&expected);

        let mut matcher = CrossCorpusMatcher::new(dir.path());
        for camera in ["1", "2", "5"] {
            let k = RecordKey {
                action: "70".into(),
                actor: "A".into(),
                camera: Some(camera.into()),
                frame: 0,
            };
            assert_eq!(matcher.resolve(&k).path(), Some(expected.as_path()));
        }
    }

    #[test]
    fn nonstandard_layout_found_via_fallback_scan() {
        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("batch_2").join("misc").join("3D_70_B_3.json");
        touch(&stray);

        let mut matcher = CrossCorpusMatcher::new(dir.path());
        assert_eq!(matcher.resolve(&key("70", "B", 3)), MatchOutcome::Matched(stray));
    }

    #[test]
    fn duplicate_keys_resolve_to_first_sorted_path() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("alpha").join("3D_70_C_1.json");
        let b = dir.path().join("beta").join("3D_70_C_1.json");
        touch(&b);
        touch(&a);

        let mut matcher = CrossCorpusMatcher::new(dir.path());
        match matcher.resolve(&key("70", "C", 1)) {
            MatchOutcome::Ambiguous { chosen, candidates } => {
                assert_eq!(chosen, a);
                assert_eq!(candidates, 2);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn missing_counterpart_is_not_found() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("70_D").join("3D_70_D_0.json"));

        let mut matcher = CrossCorpusMatcher::new(dir.path());
        assert_eq!(matcher.resolve(&key("70", "D", 1)), MatchOutcome::NotFound);
        assert_eq!(matcher.resolve(&key("71", "D", 0)), MatchOutcome::NotFound);
    }

    #[test]
    fn non_annotation_files_are_ignored_by_the_scan() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("notes.json"));
        touch(&dir.path().join("3D_readme.txt"));

        let mut matcher = CrossCorpusMatcher::new(dir.path());
        assert_eq!(matcher.resolve(&key("70", "E", 0)), MatchOutcome::NotFound);
    }
}
