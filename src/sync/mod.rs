//! Transfers user data to and from the remote drive as a single backup document.
//!
//! The local collections stay the source of truth. `upload` replaces the remote document with a
//! snapshot of them, `download` overwrites them with the remote document. Neither merges, and
//! neither retries.

mod auto;
mod document;

pub use auto::{AutoSync, ChangeNotifier, LogHooks, SkipReason, SyncHooks, Uploader};
pub use document::{BackupData, BackupDocument, Stamp, FORMAT_VERSION};

use crate::api::Drive;
use crate::backup::{Backup, RESTORE_PRE};
use crate::error::RemoteUnavailable;
use crate::model::Collection;
use crate::repo::{Repository, SYNC_STATE};
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// The directory in the drive that holds the backup.
pub const BACKUP_DIR: &str = "Backups";

/// The name of the backup file, both in the drive and in the staging directory.
pub const BACKUP_FILE: &str = "subtrack-backup.json";

/// The staging name of a downloaded backup.
const DOWNLOAD_FILE: &str = "subtrack-backup.download.json";

/// The result of a successful upload.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UploadOutcome {
    /// The path of the document in the drive.
    pub path: String,
    pub digest: String,
    pub created_at: DateTime<Utc>,
}

/// The result of a successful download.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DownloadOutcome {
    /// There is no backup in the drive yet. Nothing was changed.
    NoBackup,
    /// The listed collections were overwritten with the backup's contents.
    Restored {
        applied: Vec<Collection>,
        snapshot: Option<PathBuf>,
    },
}

/// How local data relates to the backup in the drive.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// The drive is not ready.
    Unavailable,
    /// The drive holds no backup.
    NoBackup,
    /// Local data matches the backup.
    InSync,
    /// Local data changed since the last transfer; the backup did not.
    LocalChanged,
    /// The backup changed since the last transfer, e.g. from another device; local data did not.
    RemoteChanged,
    /// Both changed, or there is no record of a previous transfer.
    Diverged,
}

serde_plain::derive_display_from_serialize!(SyncStatus);

/// Remembers the digest both sides had after the last successful transfer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncRecord {
    last_digest: String,
    synced_at: DateTime<Utc>,
}

/// Uploads and downloads the backup document.
#[derive(Clone)]
pub struct BackupSync {
    repo: Repository,
    drive: Arc<dyn Drive>,
    staging: PathBuf,
    snapshots: Option<Backup>,
}

impl BackupSync {
    /// `staging` is a local directory used for the files on their way to and from the drive.
    pub fn new(repo: Repository, drive: Arc<dyn Drive>, staging: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            drive,
            staging: staging.into(),
            snapshots: None,
        }
    }

    /// Takes a local snapshot through `backup` before every restore.
    pub fn with_snapshots(mut self, backup: Backup) -> Self {
        self.snapshots = Some(backup);
        self
    }

    /// A `BackupSync` staging in the cache directory and snapshotting into the backups
    /// directory of `config`.
    pub fn from_config(config: &Config, repo: Repository, drive: Arc<dyn Drive>) -> Self {
        Self::new(repo, drive, config.cache()).with_snapshots(config.backup())
    }

    fn remote_path() -> String {
        format!("{BACKUP_DIR}/{BACKUP_FILE}")
    }

    /// Probes the drive. Call before any transfer; unavailability is a normal outcome.
    pub async fn is_available(&self) -> bool {
        self.drive.is_available().await
    }

    /// Writes every user-data collection into one document and transfers it to the drive.
    ///
    /// # Errors
    /// - `RemoteUnavailable` if the drive is not ready.
    /// - Any staging, transfer or bookkeeping failure.
    pub async fn upload(&self) -> Result<UploadOutcome> {
        if !self.is_available().await {
            return Err(RemoteUnavailable).context("Unable to upload the backup");
        }

        let document = BackupDocument::new(BackupData::gather(&self.repo))?;
        let digest = document.digest()?;
        let json = serde_json::to_string_pretty(&document)
            .context("Unable to serialize the backup document")?;

        utils::make_dir(&self.staging).await?;
        let staged = self.staging.join(BACKUP_FILE);
        utils::write(&staged, json).await?;

        let path = Self::remote_path();
        self.drive
            .upload(&staged, &path)
            .await
            .context("Unable to transfer the backup to the drive")?;
        self.record(&digest)?;

        info!("Uploaded backup to {path}");
        Ok(UploadOutcome {
            path,
            digest,
            created_at: document.stamp.map(|s| s.created_at).unwrap_or_else(Utc::now),
        })
    }

    /// Fetches the document from the drive and overwrites each collection it contains.
    /// Collections missing from the document are not touched.
    ///
    /// A failure part of the way through applying leaves the earlier collections replaced and the
    /// later ones as they were. The snapshot taken beforehand is the way back.
    ///
    /// # Errors
    /// - `RemoteUnavailable` if the drive is not ready.
    /// - Any transfer, parse, digest or write failure.
    pub async fn download(&self) -> Result<DownloadOutcome> {
        let Some(document) = self.fetch().await? else {
            info!("There is no backup in the drive yet");
            return Ok(DownloadOutcome::NoBackup);
        };

        let snapshot = match &self.snapshots {
            Some(backup) => {
                let path = backup
                    .save_json(RESTORE_PRE, &BackupData::gather(&self.repo))
                    .await
                    .context("Unable to snapshot local data before restoring")?;
                debug!("Saved local snapshot to {}", path.display());
                Some(path)
            }
            None => None,
        };

        let applied = document
            .data
            .apply(&self.repo)
            .context("Unable to apply the backup")?;
        self.record(&document.digest()?)?;

        info!("Restored {} collection(s) from the backup", applied.len());
        Ok(DownloadOutcome::Restored { applied, snapshot })
    }

    /// Compares local data, the backup in the drive and the record of the last transfer.
    pub async fn status(&self) -> Result<SyncStatus> {
        if !self.is_available().await {
            return Ok(SyncStatus::Unavailable);
        }
        let Some(document) = self.fetch().await? else {
            return Ok(SyncStatus::NoBackup);
        };
        let remote = document.digest()?;
        let gathered = BackupData::gather(&self.repo);
        let full = gathered.digest()?;
        // A partial document is compared with the same collections of the local data.
        let local = LocalDigests {
            view: gathered.restricted_to(&document.data).digest()?,
            full,
        };
        let last = self
            .repo
            .read::<SyncRecord>(SYNC_STATE)
            .map(|r| r.last_digest);
        Ok(classify(&local, &remote, last.as_deref()))
    }

    /// Downloads and parses the remote document, or returns `None` if there is none.
    async fn fetch(&self) -> Result<Option<BackupDocument>> {
        if !self.is_available().await {
            return Err(RemoteUnavailable).context("Unable to download the backup");
        }
        let path = Self::remote_path();
        if !self.drive.exists(&path).await? {
            return Ok(None);
        }

        utils::make_dir(&self.staging).await?;
        let staged = self.staging.join(DOWNLOAD_FILE);
        self.drive
            .download(&path, &staged)
            .await
            .context("Unable to transfer the backup from the drive")?;
        let json = utils::read(&staged).await?;
        BackupDocument::parse(&json).map(Some)
    }

    fn record(&self, digest: &str) -> Result<()> {
        let record = SyncRecord {
            last_digest: digest.to_string(),
            synced_at: Utc::now(),
        };
        self.repo.write(SYNC_STATE, &record)
    }
}

#[async_trait::async_trait]
impl Uploader for BackupSync {
    async fn is_available(&self) -> bool {
        BackupSync::is_available(self).await
    }

    async fn upload(&self) -> Result<UploadOutcome> {
        BackupSync::upload(self).await
    }
}

/// Digests of the local data: `view` covers the collections present in the remote document and
/// `full` covers all of them.
struct LocalDigests {
    view: String,
    full: String,
}

fn classify(local: &LocalDigests, remote: &str, last: Option<&str>) -> SyncStatus {
    if local.view == remote {
        return SyncStatus::InSync;
    }
    match last {
        Some(last) if last == local.full || last == local.view => SyncStatus::RemoteChanged,
        Some(last) if last == remote => SyncStatus::LocalChanged,
        _ => SyncStatus::Diverged,
    }
}
