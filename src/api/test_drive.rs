//! Implements the `Drive` trait in memory for tests.

use crate::api::Drive;
use crate::Result;
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An in-memory `Drive` whose availability can be switched and whose uploads are counted. Clones
/// share the same files.
#[derive(Debug, Clone)]
pub(crate) struct TestDrive {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    available: Arc<AtomicBool>,
    uploads: Arc<AtomicUsize>,
}

impl Default for TestDrive {
    fn default() -> Self {
        Self {
            files: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
            uploads: Arc::default(),
        }
    }
}

impl TestDrive {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub(crate) fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub(crate) fn put(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.into());
    }

    pub(crate) fn get(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

#[async_trait::async_trait]
impl Drive for TestDrive {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        if !self.is_available().await {
            bail!("Test drive is offline");
        }
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn upload(&self, local: &Path, path: &str) -> Result<()> {
        if !self.is_available().await {
            bail!("Test drive is offline");
        }
        let contents = tokio::fs::read(local)
            .await
            .with_context(|| format!("Unable to read {}", local.display()))?;
        self.put(path, contents);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn download(&self, path: &str, local: &Path) -> Result<()> {
        let contents = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .with_context(|| format!("No file at '{path}' in the test drive"))?;
        tokio::fs::write(local, contents)
            .await
            .with_context(|| format!("Unable to write {}", local.display()))
    }
}
