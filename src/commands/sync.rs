use crate::api::{self, Mode};
use crate::commands::Out;
use crate::sync::{BackupSync, DownloadOutcome, SyncStatus, UploadOutcome};
use crate::{Config, Result};

/// Replaces the backup in the drive with the local data.
pub async fn sync_up(config: Config, mode: Mode) -> Result<Out<UploadOutcome>> {
    let sync = backup_sync(&config, mode).await?;
    let outcome = sync.upload().await?;
    Ok(Out::new(
        format!("Uploaded the backup to {}", outcome.path),
        outcome,
    ))
}

/// Replaces the local data with the backup in the drive. A snapshot of the local data is saved
/// in the backups directory first.
pub async fn sync_down(config: Config, mode: Mode) -> Result<Out<DownloadOutcome>> {
    let sync = backup_sync(&config, mode).await?;
    let outcome = sync.download().await?;
    let message = match &outcome {
        DownloadOutcome::NoBackup => "There is no backup to restore yet".to_string(),
        DownloadOutcome::Restored { applied, snapshot } => {
            let names: Vec<String> = applied.iter().map(|c| c.to_string()).collect();
            match snapshot {
                Some(path) => format!(
                    "Restored {} from the backup. The previous local data was saved to '{}'",
                    names.join(", "),
                    path.display()
                ),
                None => format!("Restored {} from the backup", names.join(", ")),
            }
        }
    };
    Ok(Out::new(message, outcome))
}

/// Reports how the local data relates to the backup in the drive.
pub async fn sync_status(config: Config, mode: Mode) -> Result<Out<SyncStatus>> {
    let sync = backup_sync(&config, mode).await?;
    let status = sync.status().await?;
    let message = match status {
        SyncStatus::Unavailable => "Remote storage is not available",
        SyncStatus::NoBackup => "There is no backup yet, run 'subtrack sync up'",
        SyncStatus::InSync => "Local data and the backup are in sync",
        SyncStatus::LocalChanged => "Local data has changed since the last sync",
        SyncStatus::RemoteChanged => "The backup has changed since the last sync",
        SyncStatus::Diverged => "Local data and the backup have both changed",
    };
    Ok(Out::new(message, status))
}

async fn backup_sync(config: &Config, mode: Mode) -> Result<BackupSync> {
    let repo = config.repository()?;
    let drive = api::drive(config, mode).await?;
    Ok(BackupSync::from_config(config, repo, drive))
}
