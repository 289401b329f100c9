//! Retention of old artifacts
//!
//! Artifacts are recognised by name alone: anything in the destination
//! directory whose name starts with [`ARTIFACT_PREFIX`]. Names sort in
//! creation order, so "keep the N most recent" is "delete all but the last N
//! names". Other entries are never counted and never deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::naming::ARTIFACT_PREFIX;
use crate::error::{BackupError, BackupResult};
use crate::logging::RunLog;

/// An artifact found in the destination directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    /// Artifact filename
    pub filename: String,
    /// Full path to the artifact
    pub path: PathBuf,
    /// Size in bytes, if the entry could be stat'ed
    pub size_bytes: Option<u64>,
}

/// List the artifacts in `directory`, oldest first.
///
/// A missing directory holds no artifacts. An unreadable one is
/// [`BackupError::Io`].
pub fn list_artifacts(directory: &Path) -> BackupResult<Vec<ArtifactInfo>> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(BackupError::Io(format!(
                "Failed to read backup directory {}: {}",
                directory.display(),
                e
            )))
        }
    };

    let mut artifacts = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| BackupError::Io(format!("Failed to read directory entry: {}", e)))?;

        let filename = entry.file_name().to_string_lossy().into_owned();
        if !filename.starts_with(ARTIFACT_PREFIX) {
            continue;
        }

        artifacts.push(ArtifactInfo {
            size_bytes: entry.metadata().ok().map(|m| m.len()),
            path: entry.path(),
            filename,
        });
    }

    artifacts.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(artifacts)
}

/// Keeps the `keep_count` most recent artifacts of a directory
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    directory: PathBuf,
    keep_count: Option<u32>,
}

impl RetentionPolicy {
    /// `keep_count = None` keeps everything
    pub fn new(directory: impl Into<PathBuf>, keep_count: Option<u32>) -> Self {
        Self {
            directory: directory.into(),
            keep_count,
        }
    }

    pub fn keep_count(&self) -> Option<u32> {
        self.keep_count
    }

    /// Artifacts `apply` would delete, oldest first
    pub fn plan(&self) -> BackupResult<Vec<ArtifactInfo>> {
        let Some(keep_count) = self.keep_count else {
            return Ok(Vec::new());
        };

        let artifacts = list_artifacts(&self.directory)?;
        let excess = artifacts.len().saturating_sub(keep_count as usize);
        Ok(artifacts.into_iter().take(excess).collect())
    }

    /// Delete all but the most recent `keep_count` artifacts.
    ///
    /// Returns the deleted paths, oldest first. Failing to list the directory
    /// or to delete an artifact aborts with [`BackupError::Retention`];
    /// artifacts deleted before it stay deleted.
    pub fn apply(&self, log: &dyn RunLog) -> BackupResult<Vec<PathBuf>> {
        if self.keep_count.is_none() {
            return Ok(Vec::new());
        }

        log.info("Started cleanup...");
        let planned = self.plan().map_err(|e| {
            let message = match e {
                BackupError::Io(message) => message,
                other => other.to_string(),
            };
            log.error(&message);
            BackupError::Retention(message)
        })?;

        let mut deleted = Vec::new();
        for artifact in planned {
            log.info(&format!("Cleaning up {}", artifact.filename));
            fs::remove_file(&artifact.path).map_err(|e| {
                let message = format!("Failed to delete old backup {}: {}", artifact.filename, e);
                log.error(&message);
                BackupError::Retention(message)
            })?;
            deleted.push(artifact.path);
        }
        log.info("Finished cleanup...");

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RecordingLog;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    const SCENARIO: [&str; 4] = [
        "localbkup_20201012T040506",
        "localbkup_20201012T040507",
        "localbkup_20201012T040508",
        "not-a-backup",
    ];

    fn seed(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        dir
    }

    fn remaining(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keep_two() {
        let dir = seed(&SCENARIO);
        let log = RecordingLog::new();

        let deleted = RetentionPolicy::new(dir.path(), Some(2)).apply(&log).unwrap();

        assert_eq!(deleted, vec![dir.path().join("localbkup_20201012T040506")]);
        assert_eq!(
            remaining(dir.path()),
            set(&[
                "localbkup_20201012T040507",
                "localbkup_20201012T040508",
                "not-a-backup"
            ])
        );
        assert!(log.contains("Cleaning up localbkup_20201012T040506"));
    }

    #[test]
    fn test_keep_three_removes_nothing() {
        let dir = seed(&SCENARIO);
        let log = RecordingLog::new();

        let deleted = RetentionPolicy::new(dir.path(), Some(3)).apply(&log).unwrap();

        assert!(deleted.is_empty());
        assert_eq!(remaining(dir.path()), set(&SCENARIO));
    }

    #[test]
    fn test_keep_one() {
        let dir = seed(&SCENARIO);
        let log = RecordingLog::new();

        RetentionPolicy::new(dir.path(), Some(1)).apply(&log).unwrap();

        assert_eq!(
            remaining(dir.path()),
            set(&["localbkup_20201012T040508", "not-a-backup"])
        );
    }

    #[test]
    fn test_keep_zero_removes_all_artifacts() {
        let dir = seed(&SCENARIO);
        let log = RecordingLog::new();

        RetentionPolicy::new(dir.path(), Some(0)).apply(&log).unwrap();

        assert_eq!(remaining(dir.path()), set(&["not-a-backup"]));
    }

    #[test]
    fn test_no_keep_count_is_noop() {
        let dir = seed(&SCENARIO);
        let log = RecordingLog::new();

        let deleted = RetentionPolicy::new(dir.path(), None).apply(&log).unwrap();

        assert!(deleted.is_empty());
        assert!(log.lines().is_empty());
        assert_eq!(remaining(dir.path()), set(&SCENARIO));
    }

    #[test]
    fn test_suffix_chain_does_not_change_order() {
        let dir = seed(&[
            "localbkup_20201012T040506.tar.gz.gpg",
            "localbkup_20201012T040507.tar.gz.enc",
        ]);
        let log = RecordingLog::new();

        RetentionPolicy::new(dir.path(), Some(1)).apply(&log).unwrap();

        assert_eq!(
            remaining(dir.path()),
            set(&["localbkup_20201012T040507.tar.gz.enc"])
        );
    }

    #[test]
    fn test_missing_directory_has_no_artifacts() {
        let dir = TempDir::new().unwrap();
        let policy = RetentionPolicy::new(dir.path().join("missing"), Some(1));
        assert!(policy.plan().unwrap().is_empty());
    }

    #[test]
    fn test_undeletable_artifact_is_an_error() {
        // A directory carrying the prefix cannot be removed with remove_file.
        let dir = seed(&["localbkup_20201012T040508"]);
        fs::create_dir(dir.path().join("localbkup_20201012T040506")).unwrap();
        let log = RecordingLog::new();

        let err = RetentionPolicy::new(dir.path(), Some(1))
            .apply(&log)
            .unwrap_err();

        assert!(err.is_retention());
        assert!(dir.path().join("localbkup_20201012T040508").exists());
    }

    #[test]
    fn test_unreadable_directory_is_io_for_listing_and_retention_for_apply() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("localbkup.json");
        fs::write(&not_a_dir, b"{}").unwrap();
        let log = RecordingLog::new();

        let listing = list_artifacts(&not_a_dir).unwrap_err();
        assert!(matches!(listing, BackupError::Io(_)));
        assert!(!listing.to_string().starts_with("Retention"));

        let err = RetentionPolicy::new(&not_a_dir, Some(1))
            .apply(&log)
            .unwrap_err();
        assert!(err.is_retention());
        assert!(err.to_string().contains("Failed to read backup directory"));
    }

    #[test]
    fn test_list_artifacts_sorted_oldest_first() {
        let dir = seed(&[
            "localbkup_20201012T040508",
            "zzz",
            "localbkup_20201012T040506",
        ]);

        let names: Vec<String> = list_artifacts(dir.path())
            .unwrap()
            .into_iter()
            .map(|a| a.filename)
            .collect();

        assert_eq!(
            names,
            vec!["localbkup_20201012T040506", "localbkup_20201012T040508"]
        );
    }

    fn artifact_names() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set(0u32..86_400, 0..12).prop_map(|secs| {
            secs.into_iter()
                .map(|s| {
                    format!(
                        "localbkup_20240101T{:02}{:02}{:02}.tar.gz.gpg",
                        s / 3600,
                        (s / 60) % 60,
                        s % 60
                    )
                })
                .collect()
        })
    }

    fn other_names() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set("[a-k][a-z0-9_.]{0,12}", 0..5)
    }

    proptest! {
        #[test]
        fn keeps_exactly_the_newest(
            artifacts in artifact_names(),
            others in other_names(),
            keep in 0u32..15,
        ) {
            let dir = TempDir::new().unwrap();
            for name in artifacts.iter().chain(others.iter()) {
                fs::write(dir.path().join(name), b"x").unwrap();
            }
            let log = RecordingLog::new();
            let policy = RetentionPolicy::new(dir.path(), Some(keep));

            policy.apply(&log).unwrap();

            let keep_n = (keep as usize).min(artifacts.len());
            let mut expected: BTreeSet<String> =
                artifacts.iter().rev().take(keep_n).cloned().collect();
            expected.extend(others.iter().cloned());
            prop_assert_eq!(remaining(dir.path()), expected);

            // Second pass with no new artifacts deletes nothing
            prop_assert!(policy.apply(&log).unwrap().is_empty());
        }

        #[test]
        fn unbounded_retention_keeps_all(artifacts in artifact_names()) {
            let dir = TempDir::new().unwrap();
            for name in &artifacts {
                fs::write(dir.path().join(name), b"x").unwrap();
            }
            let log = RecordingLog::new();

            RetentionPolicy::new(dir.path(), None).apply(&log).unwrap();

            prop_assert_eq!(remaining(dir.path()), artifacts);
        }
    }
}
