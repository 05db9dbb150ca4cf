//! Upload file storage
//!
//! Uploaded CSV files are copied under `<project>/<upload_to>/`. Stored paths
//! are always relative to the project root and use `/` separators.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Default upload location, relative to the project root
pub const DEFAULT_UPLOAD_TO: &str = "uploads";

/// Whether an upload location stays inside the project root
///
/// Only plain directory names are accepted: no `..`, no drive or root prefix.
pub fn is_contained(upload_to: &str) -> bool {
    let trimmed = upload_to.trim_matches('/');
    !trimmed.is_empty()
        && Path::new(trimmed)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Project-local store for uploaded files
#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
    upload_to: String,
}

impl UploadStorage {
    /// An empty location, or one escaping the project root, falls back to
    /// [`DEFAULT_UPLOAD_TO`]
    pub fn new(root: impl Into<PathBuf>, upload_to: impl Into<String>) -> Self {
        let upload_to = upload_to.into().trim_matches('/').to_string();
        let upload_to = if is_contained(&upload_to) {
            upload_to
        } else {
            if !upload_to.is_empty() {
                log::warn!(
                    "upload location '{}' leaves the project, using '{}'",
                    upload_to,
                    DEFAULT_UPLOAD_TO
                );
            }
            DEFAULT_UPLOAD_TO.to_string()
        };
        Self {
            root: root.into(),
            upload_to,
        }
    }

    pub fn upload_to(&self) -> &str {
        &self.upload_to
    }

    /// Absolute directory holding uploads
    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.upload_to)
    }

    /// Absolute path of a stored file
    pub fn path(&self, stored: &str) -> PathBuf {
        self.root.join(stored)
    }

    /// Store `bytes` under `file_name`, returning the stored relative path
    ///
    /// An existing file is never overwritten: `name.csv` becomes `name_1.csv`,
    /// `name_2.csv` and so on.
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<String> {
        let dir = self.dir();
        fs::create_dir_all(&dir)?;

        let base = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name);
        let (stem, ext) = match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
            _ => (base, String::new()),
        };

        let mut candidate = base.to_string();
        let mut n = 0;
        while dir.join(&candidate).exists() {
            n += 1;
            candidate = format!("{}_{}{}", stem, n, ext);
        }

        fs::write(dir.join(&candidate), bytes)?;
        let stored = format!("{}/{}", self.upload_to, candidate);
        log::debug!("stored upload as {}", stored);
        Ok(stored)
    }

    pub fn read(&self, stored: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(stored))
    }

    /// Remove a stored file; a file that is already gone is not an error
    pub fn delete(&self, stored: &str) -> io::Result<()> {
        match fs::remove_file(self.path(stored)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("stored file {} was already removed", stored);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
