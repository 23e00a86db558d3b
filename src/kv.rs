//! The durable, synchronous, string-keyed store underneath all persisted documents.

use crate::{fs, Result};
use anyhow::{bail, ensure};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::trace;

/// A process-wide key-value store with string keys and string values. Structured data is encoded
/// by the caller. Writes that fail return an error rather than leaving a partial value behind.
pub trait KvStore: Debug + Send + Sync {
    /// Returns the value stored under `key`, or `None` if nothing has been written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a key that does not exist succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Stores each key as its own file in a directory.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Opens the store at `dir`, creating the directory if necessary.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        fs::read_optional(self.path(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        trace!("kv set {key} ({} bytes)", value.len());
        fs::write_replace(self.path(key)?, value.as_bytes())
    }

    fn remove(&self, key: &str) -> Result<()> {
        fs::remove_file(self.path(key)?)
    }
}

fn validate_key(key: &str) -> Result<()> {
    ensure!(!key.is_empty(), "Storage key must not be empty");
    if let Some(bad) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        bail!("Invalid character '{bad}' in storage key '{key}'")
    }
    Ok(())
}

/// An in-memory `KvStore`. Nothing survives the process; used in tests.
#[derive(Debug, Default)]
pub struct MemoryKv {
    data: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `fail` is true every subsequent `set` and `remove` returns an error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("Unable to write '{key}': storage is read-only")
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding this lock cannot leave the map half-updated.
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable(key)?;
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_kv_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let kv = FileKv::open(dir.path().join("store")).unwrap();
        assert!(kv.get("settings").unwrap().is_none());
        kv.set("settings", r#"{"premium":true}"#).unwrap();

        let reopened = FileKv::open(dir.path().join("store")).unwrap();
        assert_eq!(
            reopened.get("settings").unwrap().as_deref(),
            Some(r#"{"premium":true}"#)
        );

        reopened.remove("settings").unwrap();
        assert!(kv.get("settings").unwrap().is_none());
        reopened.remove("settings").unwrap();
    }

    #[test]
    fn test_file_kv_rejects_bad_keys() {
        let dir = TempDir::new().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();
        assert!(kv.set("../escape", "x").is_err());
        assert!(kv.set("", "x").is_err());
        assert!(kv.get("a/b").is_err());
        kv.set("paymentMethods", "[]").unwrap();
    }

    #[test]
    fn test_memory_kv_write_failure_is_observable() {
        let kv = MemoryKv::new();
        kv.set("lists", "[]").unwrap();
        kv.fail_writes(true);
        assert!(kv.set("lists", "[1]").is_err());
        assert!(kv.remove("lists").is_err());
        assert_eq!(kv.get("lists").unwrap().as_deref(), Some("[]"));
    }
}
