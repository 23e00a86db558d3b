//! Interfaces to the services outside the app: the remote-backed drive that holds backups and the
//! currency rate service.
//!
//! Each service sits behind a trait so that the rest of the app can run against an offline
//! implementation. See `Mode`.

mod drive;
mod rates;
#[cfg(test)]
mod test_drive;

use crate::model::RateResponse;
use crate::{utils, Config, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub use drive::DirDrive;
pub use rates::{BundledRates, HttpRateSource};
#[cfg(test)]
pub(crate) use test_drive::TestDrive;

/// When this environment variable is set and non-empty the app runs in `Mode::Test`.
pub const TEST_MODE_ENV: &str = "SUBTRACK_IN_TEST_MODE";

/// The directory, inside the home directory, that stands in for the remote drive in test mode.
const TEST_REMOTE: &str = ".test-remote";

/// A file store whose contents are mirrored to the cloud, e.g. an iCloud Drive container. Paths
/// are relative to the root of the drive.
#[async_trait::async_trait]
pub trait Drive: Send + Sync {
    /// Whether the drive is ready for use. A drive that is switched off for the account or device
    /// is not an error, it is simply unavailable.
    async fn is_available(&self) -> bool;

    /// Whether a file exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Transfers the local file at `local` to `path`, replacing any existing file.
    async fn upload(&self, local: &Path, path: &str) -> Result<()>;

    /// Transfers the file at `path` to the local file `local`.
    async fn download(&self, path: &str, local: &Path) -> Result<()>;
}

/// A service that reports exchange rates relative to a base currency.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self, base: &str) -> Result<RateResponse>;
}

/// Selects live services or offline stand-ins.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    /// The configured remote directory and the configured rate service.
    #[default]
    Live,
    /// A directory inside the home directory and the bundled rates. Nothing leaves the machine.
    Test,
}

impl Mode {
    /// Returns `Mode::Test` if `SUBTRACK_IN_TEST_MODE` is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Live,
        }
    }
}

/// Creates the drive backups are transferred to.
pub async fn drive(config: &Config, mode: Mode) -> Result<Arc<dyn Drive>> {
    let root = match mode {
        Mode::Live => config.remote_dir().to_path_buf(),
        Mode::Test => {
            let root = config.root().join(TEST_REMOTE);
            utils::make_dir(&root).await?;
            root
        }
    };
    debug!("Using drive at {}", root.display());
    Ok(Arc::new(DirDrive::new(root)))
}

/// Creates the source currency rates are refreshed from.
pub fn rate_source(config: &Config, mode: Mode) -> Result<Box<dyn RateSource>> {
    match mode {
        Mode::Live => Ok(Box::new(HttpRateSource::new(config.rates_url())?)),
        Mode::Test => Ok(Box::new(BundledRates)),
    }
}
