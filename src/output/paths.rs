use std::path::{Path, PathBuf};

/// Picks a fresh run directory.
///
/// Returns `path` unchanged when it does not exist yet, or when it exists and
/// `exist_ok` is set. Otherwise looks at the siblings named `<stem><digits>`
/// and returns `<path><max + 1>`, starting at `2` when there are none.
pub fn increment_path(path: &Path, exist_ok: bool) -> PathBuf {
    if !path.exists() || exist_ok {
        return path.to_path_buf();
    }

    let stem = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let max_suffix = std::fs::read_dir(&parent)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().to_str().and_then(|n| numeric_suffix(n, stem)))
                .max()
        })
        .unwrap_or(None);

    let n = max_suffix.map_or(2, |m| m + 1);
    let mut name = path.as_os_str().to_os_string();
    name.push(n.to_string());
    PathBuf::from(name)
}

/// `Some(n)` when `name` is `stem` followed by digits only.
fn numeric_suffix(name: &str, stem: &str) -> Option<u64> {
    let digits = name.strip_prefix(stem)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fresh_name_is_used_as_is() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("exp");
        assert_eq!(increment_path(&p, false), p);
    }

    #[test]
    fn next_after_highest_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        for d in ["exp", "exp2", "exp3", "experiment", "exp_old"] {
            std::fs::create_dir(tmp.path().join(d)).unwrap();
        }
        assert_eq!(increment_path(&tmp.path().join("exp"), false), tmp.path().join("exp4"));
    }

    #[test]
    fn existing_without_siblings_gets_two() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("run")).unwrap();
        assert_eq!(increment_path(&tmp.path().join("run"), false), tmp.path().join("run2"));
        assert_eq!(increment_path(&tmp.path().join("run"), true), tmp.path().join("run"));
    }

    proptest! {
        #[test]
        fn result_never_collides(suffixes in prop::collection::btree_set(2u64..50, 0..6)) {
            let tmp = tempfile::tempdir().unwrap();
            std::fs::create_dir(tmp.path().join("exp")).unwrap();
            for s in &suffixes {
                std::fs::create_dir(tmp.path().join(format!("exp{s}"))).unwrap();
            }
            let next = increment_path(&tmp.path().join("exp"), false);
            prop_assert!(!next.exists());
            let expected = suffixes.iter().max().map_or(2, |m| m + 1);
            prop_assert_eq!(next, tmp.path().join(format!("exp{expected}")));
        }
    }
}
