//! Versioned run directories (`train1`, `train2`, `predict1`, ...).
//!
//! Numbering is derived from what is on disk: the next run is the highest
//! existing `<prefix><N>` plus one. Gaps are never filled. Two processes
//! allocating under the same base directory at the same time can pick the
//! same number; callers are expected to be the only writer.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Create and return `base_dir/<prefix><max N + 1>`.
///
/// `base_dir` is created (with parents) if missing. Only immediate
/// subdirectories whose name starts with `prefix` followed by at least one
/// digit are considered; trailing characters after the digits are ignored.
pub fn next_version_dir(base_dir: impl AsRef<Path>, prefix: &str) -> Result<PathBuf> {
    let base_dir = base_dir.as_ref();
    fs::create_dir_all(base_dir)?;

    let mut max_version = 0u64;
    for entry in fs::read_dir(base_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(version) = entry.file_name().to_str().and_then(|n| parse_version(n, prefix)) {
            max_version = max_version.max(version);
        }
    }

    let next_dir = base_dir.join(format!("{}{}", prefix, max_version + 1));
    fs::create_dir_all(&next_dir)?;

    debug!(dir = %next_dir.display(), "Allocated run directory");
    Ok(next_dir)
}

/// Leading digit run after `prefix`, if any.
fn parse_version(name: &str, prefix: &str) -> Option<u64> {
    let rest = name.strip_prefix(prefix)?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..digits_end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_run() {
        let dir = TempDir::new().unwrap();

        let next = next_version_dir(dir.path(), "run").unwrap();

        assert_eq!(next, dir.path().join("run1"));
        assert!(next.is_dir());
    }

    #[test]
    fn test_gap_is_not_filled() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("run1")).unwrap();
        fs::create_dir(dir.path().join("run3")).unwrap();

        let next = next_version_dir(dir.path(), "run").unwrap();

        assert_eq!(next, dir.path().join("run4"));
        assert!(next.is_dir());
    }

    #[test]
    fn test_other_prefixes_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("predict1")).unwrap();
        fs::create_dir(dir.path().join("train5")).unwrap();

        let next = next_version_dir(dir.path(), "run").unwrap();

        assert_eq!(next, dir.path().join("run1"));
    }

    #[test]
    fn test_missing_base_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("non_existent_runs_dir");

        let next = next_version_dir(&base, "run").unwrap();

        assert!(base.is_dir());
        assert_eq!(next, base.join("run1"));
        assert!(next.is_dir());
    }

    #[test]
    fn test_files_and_suffixes() {
        let dir = TempDir::new().unwrap();
        // Plain files never count, even with a matching name.
        fs::write(dir.path().join("run9"), b"").unwrap();
        fs::create_dir(dir.path().join("run2_old")).unwrap();
        fs::create_dir(dir.path().join("runner")).unwrap();

        let next = next_version_dir(dir.path(), "run").unwrap();

        assert_eq!(next, dir.path().join("run3"));
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("train12", "train"), Some(12));
        assert_eq!(parse_version("train7-copy", "train"), Some(7));
        assert_eq!(parse_version("train", "train"), None);
        assert_eq!(parse_version("predict3", "train"), None);
    }
}
