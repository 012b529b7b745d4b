//! Credential store backed by one file per label.
//!
//! Used by the CLI where no OS keychain is wired in. Files are written
//! owner-only and replaced atomically, so a crash mid-write leaves either the
//! old value or the new one.

use companion_core::error::store::StoreError;
use companion_core::store::CredentialStore;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

const LABEL_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._-]*$";
const TEMP_SUFFIX: &str = ".tmp";

fn label_regex() -> &'static Regex {
    static LABEL_REGEX: OnceLock<Regex> = OnceLock::new();
    LABEL_REGEX.get_or_init(|| Regex::new(LABEL_PATTERN).expect("valid regex pattern"))
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for `label`, rejecting anything that could escape the directory.
    fn path_for(&self, label: &str) -> Option<PathBuf> {
        if label.ends_with(TEMP_SUFFIX) || !label_regex().is_match(label) {
            return None;
        }
        Some(self.dir.join(label))
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Write and flush `bytes` to a fresh owner-only file at `path`.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = open_private(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl CredentialStore for FileCredentialStore {
    fn store(&self, label: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self
            .path_for(label)
            .ok_or_else(|| StoreError::write(label, "invalid label"))?;

        fs::create_dir_all(&self.dir).map_err(|e| StoreError::write(label, e.to_string()))?;

        let temp_path = self.dir.join(format!("{label}{TEMP_SUFFIX}"));
        write_private(&temp_path, bytes).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::write(label, e.to_string())
        })?;

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::write(label, e.to_string())
        })?;

        debug!("Stored credential '{label}' ({} bytes)", bytes.len());
        Ok(())
    }

    fn load(&self, label: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self
            .path_for(label)
            .ok_or_else(|| StoreError::read(label, "invalid label"))?;

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::read(label, e.to_string())),
        }
    }

    fn delete(&self, label: &str) -> Result<(), StoreError> {
        let path = self
            .path_for(label)
            .ok_or_else(|| StoreError::delete(label, "invalid label"))?;

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted credential '{label}'");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::delete(label, e.to_string())),
        }
    }
}
