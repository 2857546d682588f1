use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::error::SyncError;

/// Flat directory holding the archives downloaded during one run.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn archive_path(&self, file_name: &str) -> Utf8PathBuf {
        self.root.join(file_name)
    }

    pub fn extracted_dir(&self) -> Utf8PathBuf {
        self.root.join("extracted_data")
    }

    pub fn ensure(&self) -> Result<(), SyncError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    /// `.zip` files directly under the root, sorted by name.
    pub fn list_archives(&self) -> Result<Vec<Utf8PathBuf>, SyncError> {
        if !self.root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut archives = Vec::new();
        let entries =
            fs::read_dir(self.root.as_std_path()).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            let is_zip = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("zip"))
                .unwrap_or(false);
            if path.as_std_path().is_file() && is_zip {
                archives.push(path);
            }
        }
        archives.sort();
        Ok(archives)
    }

    /// Deletes everything under the root, keeping the root itself. Returns the number of removed entries.
    pub fn purge(&self) -> Result<usize, SyncError> {
        if !self.root.as_std_path().exists() {
            return Ok(0);
        }
        let mut removed = 0;
        let entries =
            fs::read_dir(self.root.as_std_path()).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(err) => warn!(path = %path.display(), error = %err, "failed to delete"),
            }
        }
        Ok(removed)
    }
}
