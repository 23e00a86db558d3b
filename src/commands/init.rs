use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;
use tracing::warn;

/// Creates the home directory, its subdirectories and an initial `config.json` file.
///
/// # Arguments
/// - `subtrack_home` - The directory that will be the root of the home directory, e.g.
///   `$HOME/subtrack`
/// - `remote_dir` - The cloud-mirrored directory backups go to. `$SUBTRACK_HOME/remote` when
///   `None`.
///
/// # Errors
/// - Returns an error if any file operations fail or if a config file already exists.
pub async fn init(subtrack_home: &Path, remote_dir: Option<&Path>) -> Result<Out<()>> {
    let config = Config::create(subtrack_home, remote_dir)
        .await
        .context("Unable to create the data directory and configs")?;
    if !config.remote_dir().is_dir() {
        warn!(
            "The remote directory '{}' does not exist yet. Backups will be skipped until it does.",
            config.remote_dir().display()
        );
    }
    Ok(format!(
        "Successfully created the subtrack directory at '{}'",
        config.root().display()
    )
    .into())
}
