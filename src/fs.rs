//! Blocking filesystem helpers used by the key-value store.

use anyhow::{Context, Result};
use std::io::{ErrorKind, Write};
use std::path::Path;

pub(crate) fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).context(format!("Unable to create directory {}", path.display()))
}

/// Reads a file, returning `None` if it does not exist.
pub(crate) fn read_optional(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context(format!("Unable to read file {}", path.display())),
    }
}

/// Writes `data` to a sibling temporary file, syncs it, then renames it over `path`. A reader
/// sees either the old contents or the new contents, never a truncated file.
pub(crate) fn write_replace(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let tmp = path.with_extension("tmp");
    let mut f = std::fs::File::create(&tmp)
        .context(format!("Unable to create file {}", tmp.display()))?;
    f.write_all(data)
        .context(format!("Unable to write data to {}", tmp.display()))?;
    f.sync_all()
        .context(format!("Unable to sync {}", tmp.display()))?;
    std::fs::rename(&tmp, path).context(format!(
        "Unable to move {} to {}",
        tmp.display(),
        path.display()
    ))
}

/// Removes a file. A file that does not exist is not an error.
pub(crate) fn remove_file(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context(format!("Unable to remove file {}", path.display())),
    }
}

#[test]
fn write_replace_test() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let path = tempdir.path().join("x.json");
    write_replace(&path, b"first").unwrap();
    write_replace(&path, b"second").unwrap();
    assert_eq!(read_optional(&path).unwrap().unwrap(), "second");
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn read_missing_test() {
    let tempdir = tempfile::TempDir::new().unwrap();
    assert!(read_optional(tempdir.path().join("nope")).unwrap().is_none());
    remove_file(tempdir.path().join("nope")).unwrap();
}
