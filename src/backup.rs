//! Rotating local snapshots of user data, taken before a restore overwrites it.

use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;

/// Prefix for snapshots taken before a cloud backup is applied locally.
pub const RESTORE_PRE: &str = "restore-pre";

/// Manages snapshot file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Saves `data` as a pretty-printed JSON snapshot file.
    ///
    /// The filename format is `{prefix}.YYYY-MM-DD-NNN.json` where NNN is a sequence number.
    /// Automatically rotates old snapshots, keeping only `backup_copies` files.
    ///
    /// Returns the path to the created snapshot file.
    pub async fn save_json<T: Serialize>(&self, prefix: &str, data: &T) -> Result<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let filename = format!("{prefix}.{date}-{seq:03}.json");
        let path = self.backups_dir.join(&filename);

        let json = serde_json::to_string_pretty(data).context("Failed to serialize snapshot")?;
        utils::write(&path, json).await?;

        self.rotate(prefix).await?;

        Ok(path)
    }

    /// Scans the backups directory for existing files with the given prefix and date,
    /// and returns the next sequence number.
    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Result<u32> {
        let mut max_seq: u32 = 0;
        for name in self.file_names().await? {
            if let Some(seq) = parse_sequence_number(&name, prefix, date) {
                max_seq = max_seq.max(seq);
            }
        }
        Ok(max_seq + 1)
    }

    /// Rotates old snapshot files, keeping only `backup_copies` files with the given prefix. The
    /// newest file is always kept.
    async fn rotate(&self, prefix: &str) -> Result<()> {
        let mut files: Vec<String> = self
            .file_names()
            .await?
            .into_iter()
            .filter(|name| is_backup_file(name, prefix))
            .collect();

        // Sort by filename (which sorts by date and sequence number due to format)
        files.sort();

        let keep = self.backup_copies.max(1) as usize;
        let to_delete = files.len().saturating_sub(keep);
        for name in files.into_iter().take(to_delete) {
            utils::remove(self.backups_dir.join(name)).await?;
        }

        Ok(())
    }

    async fn file_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a snapshot filename.
/// Returns None if the filename doesn't match the expected pattern.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    // Pattern: {prefix}.{date}-{NNN}.json
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// Checks if a filename is a snapshot file with the given prefix.
fn is_backup_file(filename: &str, prefix: &str) -> bool {
    filename.starts_with(&format!("{prefix}.")) && filename.ends_with(".json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("restore-pre.2025-12-14-001.json", "restore-pre", "2025-12-14"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("restore-pre.2025-12-14-042.json", "restore-pre", "2025-12-14"),
            Some(42)
        );
        // Wrong prefix
        assert_eq!(
            parse_sequence_number("other.2025-12-14-001.json", "restore-pre", "2025-12-14"),
            None
        );
        // Wrong date
        assert_eq!(
            parse_sequence_number("restore-pre.2025-12-13-001.json", "restore-pre", "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("restore-pre.2025-12-14-001.json", "restore-pre"));
        assert!(!is_backup_file("restore-pre.2025-12-14-001.tmp", "restore-pre"));
        assert!(!is_backup_file("other.2025-12-14-001.json", "restore-pre"));
    }

    #[tokio::test]
    async fn test_save_json_rotates() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();
        let mut last = PathBuf::new();
        for i in 0..7 {
            last = backup.save_json(RESTORE_PRE, &vec![i]).await.unwrap();
        }
        let names = backup.file_names().await.unwrap();
        assert_eq!(names.len(), 5);
        assert!(last.to_string_lossy().ends_with("-007.json"));
    }

    #[tokio::test]
    async fn test_zero_copies_keeps_newest() {
        let env = TestEnv::new().await;
        let backup = Backup {
            backups_dir: env.config().backups().to_path_buf(),
            backup_copies: 0,
        };
        backup.save_json(RESTORE_PRE, &vec![1]).await.unwrap();
        let last = backup.save_json(RESTORE_PRE, &vec![2]).await.unwrap();
        assert!(last.exists());
        assert_eq!(backup.file_names().await.unwrap().len(), 1);
    }
}
