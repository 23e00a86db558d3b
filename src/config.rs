//! Configuration file handling for subtrack.
//!
//! The configuration file is stored at `$SUBTRACK_HOME/config.json` and contains settings for
//! the app including where the remote drive lives, how many local snapshots to keep, and how
//! auto-sync behaves.

use crate::backup::Backup;
use crate::kv::FileKv;
use crate::repo::Repository;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const APP_NAME: &str = "subtrack";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const SYNC_DELAY_MS: u64 = 2000;
const RATES_URL: &str = "https://api.frankfurter.app/latest";
const STORE: &str = "store";
const CACHE: &str = ".cache";
const BACKUPS: &str = ".backups";
const REMOTE: &str = "remote";
const CONFIG_JSON: &str = "config.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$SUBTRACK_HOME` and from there it loads `$SUBTRACK_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    store: PathBuf,
    cache: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    remote_dir: PathBuf,
}

impl Config {
    /// Creates the home directory, its subdirectories and an initial `config.json` file.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the home directory, e.g. `$HOME/subtrack`
    /// - `remote_dir` - The cloud-mirrored directory backups are transferred to. When `None`,
    ///   `$SUBTRACK_HOME/remote` is used.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>, remote_dir: Option<&Path>) -> Result<Self> {
        // Create the directory if it does not exist
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the subtrack home directory")?;

        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);
        if config_path.is_file() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            )
        }

        for sub in [STORE, CACHE, BACKUPS] {
            utils::make_dir(root.join(sub)).await?;
        }

        let config_file = ConfigFile {
            remote_dir: remote_dir.map(Path::to_path_buf),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self::assemble(root, config_path, config_file))
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load the config file
    /// - validate that the store, cache and backups directories exist
    /// - return the loaded configuration object
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The subtrack home directory is missing, run 'subtrack init'")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self::assemble(root, config_path, config_file);
        for dir in [&config.store, &config.cache, &config.backups] {
            if !dir.is_dir() {
                bail!("The directory '{}' is missing", dir.display())
            }
        }
        Ok(config)
    }

    fn assemble(root: PathBuf, config_path: PathBuf, config_file: ConfigFile) -> Self {
        let remote_dir = match &config_file.remote_dir {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => root.join(REMOTE),
        };
        Self {
            store: root.join(STORE),
            cache: root.join(CACHE),
            backups: root.join(BACKUPS),
            root,
            config_path,
            config_file,
            remote_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The key-value store directory.
    pub fn store(&self) -> &Path {
        &self.store
    }

    /// The staging directory for backup transfers.
    pub fn cache(&self) -> &Path {
        &self.cache
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn remote_dir(&self) -> &Path {
        &self.remote_dir
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    pub fn auto_sync(&self) -> bool {
        self.config_file.auto_sync
    }

    /// The quiescence delay of auto-sync.
    pub fn sync_delay(&self) -> Duration {
        Duration::from_millis(self.config_file.sync_delay_ms)
    }

    pub fn rates_url(&self) -> &str {
        &self.config_file.rates_url
    }

    /// Opens the key-value store and returns a `Repository` over it.
    pub fn repository(&self) -> Result<Repository> {
        let kv = FileKv::open(&self.store)?;
        Ok(Repository::new(Arc::new(kv)))
    }

    /// Creates a new `Backup` instance for managing local snapshot files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "subtrack",
///   "config_version": 1,
///   "backup_copies": 5,
///   "remote_dir": "/Users/me/Library/Mobile Documents/iCloud~subtrack/Documents",
///   "auto_sync": true,
///   "sync_delay_ms": 2000,
///   "rates_url": "https://api.frankfurter.app/latest"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "subtrack"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of local snapshots to keep
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,

    /// The cloud-mirrored directory (optional, relative to the home directory or absolute)
    /// Defaults to $SUBTRACK_HOME/remote if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_dir: Option<PathBuf>,

    /// Whether local changes are uploaded automatically
    #[serde(default = "default_auto_sync")]
    auto_sync: bool,

    /// How long to wait after the last change before uploading
    #[serde(default = "default_sync_delay_ms")]
    sync_delay_ms: u64,

    /// Where currency rates are fetched from
    #[serde(default = "default_rates_url")]
    rates_url: String,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

fn default_auto_sync() -> bool {
    true
}

fn default_sync_delay_ms() -> u64 {
    SYNC_DELAY_MS
}

fn default_rates_url() -> String {
    RATES_URL.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            remote_dir: None,
            auto_sync: default_auto_sync(),
            sync_delay_ms: SYNC_DELAY_MS,
            rates_url: default_rates_url(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .context("Failed to load config file")?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "Config version {} is unsupported. Is a newer version of subtrack available?",
            config.config_version
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create_and_load() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("subtrack_home");

        let config = Config::create(&home_dir, None).await.unwrap();
        assert!(config.store().is_dir());
        assert!(config.cache().is_dir());
        assert!(config.backups().is_dir());
        assert_eq!(config.remote_dir(), config.root().join("remote"));
        assert!(config.auto_sync());
        assert_eq!(config.sync_delay(), Duration::from_millis(2000));

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.root(), config.root());
        assert_eq!(loaded.backup_copies(), 5);
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), None).await.unwrap();
        assert!(Config::create(dir.path(), None).await.is_err());
    }

    #[tokio::test]
    async fn test_config_remote_dir() {
        let dir = TempDir::new().unwrap();
        let remote = dir.path().join("icloud");
        let config = Config::create(dir.path().join("home"), Some(remote.as_path()))
            .await
            .unwrap();
        assert_eq!(config.remote_dir(), remote);

        let relative = Config::create(dir.path().join("other"), Some(Path::new("cloud")))
            .await
            .unwrap();
        assert_eq!(relative.remote_dir(), relative.root().join("cloud"));
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        utils::write(
            &config_path,
            r#"{"app_name": "subtrack", "config_version": 1}"#,
        )
        .await
        .unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        utils::write(
            &config_path,
            r#"{"app_name": "wrong_app", "config_version": 1}"#,
        )
        .await
        .unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let t = TempDir::new().unwrap();
        let path = t.path().join("file.json");
        let original = ConfigFile {
            remote_dir: Some(PathBuf::from("/tmp/cloud")),
            auto_sync: false,
            sync_delay_ms: 250,
            ..ConfigFile::default()
        };
        original.save(&path).await.unwrap();
        assert_eq!(ConfigFile::load(&path).await.unwrap(), original);
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("remote_dir"));
    }
}
