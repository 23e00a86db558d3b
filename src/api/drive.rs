//! Implements the `Drive` trait for a directory that the operating system mirrors to the cloud.

use crate::api::Drive;
use crate::{utils, Result};
use anyhow::{bail, ensure};
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// A `Drive` rooted at a local directory. The drive is unavailable while the directory does not
/// exist, which is how a disabled cloud container presents itself.
#[derive(Debug, Clone)]
pub struct DirDrive {
    root: PathBuf,
}

impl DirDrive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        ensure!(!path.is_empty(), "A drive path must not be empty");
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => bail!("The drive path '{path}' must be relative and stay inside the drive"),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl Drive for DirDrive {
    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::metadata(&target)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }

    async fn upload(&self, local: &Path, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        trace!("upload {} -> {}", local.display(), target.display());
        if let Some(parent) = target.parent() {
            utils::make_dir(parent).await?;
        }
        // Copy beside the target first so the drive never holds a half-written backup.
        let partial = target.with_extension("partial");
        utils::copy(local, &partial).await?;
        utils::rename(&partial, &target).await
    }

    async fn download(&self, path: &str, local: &Path) -> Result<()> {
        let source = self.resolve(path)?;
        trace!("download {} -> {}", source.display(), local.display());
        utils::copy(&source, local).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dir_drive_transfer() {
        let dir = TempDir::new().unwrap();
        let drive = DirDrive::new(dir.path().join("cloud"));
        assert!(!drive.is_available().await);

        utils::make_dir(drive.root()).await.unwrap();
        assert!(drive.is_available().await);
        assert!(!drive.exists("Backups/b.json").await.unwrap());

        let local = dir.path().join("local.json");
        utils::write(&local, "{}").await.unwrap();
        drive.upload(&local, "Backups/b.json").await.unwrap();
        assert!(drive.exists("Backups/b.json").await.unwrap());

        let fetched = dir.path().join("fetched.json");
        drive.download("Backups/b.json", &fetched).await.unwrap();
        assert_eq!(utils::read(&fetched).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_dir_drive_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let drive = DirDrive::new(dir.path());
        assert!(drive.exists("../outside.json").await.is_err());
        assert!(drive.exists("/etc/passwd").await.is_err());
    }
}
