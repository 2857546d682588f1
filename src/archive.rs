use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::SyncError;

fn open_archive(zip_path: &Path) -> Result<ZipArchive<fs::File>, SyncError> {
    let file = fs::File::open(zip_path).map_err(|err| unreadable(zip_path, err.to_string()))?;
    ZipArchive::new(file).map_err(|err| unreadable(zip_path, err.to_string()))
}

fn unreadable(path: &Path, message: String) -> SyncError {
    SyncError::UnreadableArchive {
        path: path.to_path_buf(),
        message,
    }
}

/// Member file names, read from the central directory only.
pub fn list_contents(zip_path: &Path) -> Result<Vec<String>, SyncError> {
    let archive = open_archive(zip_path)?;
    Ok(archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_string)
        .collect())
}

/// Extracts every member into `target_dir`, returning the written file paths.
pub fn extract_archive(zip_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut archive = open_archive(zip_path)?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| unreadable(zip_path, err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(unreadable(
                    zip_path,
                    "zip entry path traversal detected".to_string(),
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        let mut outfile =
            fs::File::create(&entry_path).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| unreadable(zip_path, err.to_string()))?;
        written.push(entry_path);
    }
    Ok(written)
}
