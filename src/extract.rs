use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::archive;
use crate::domain::IndexName;
use crate::error::SyncError;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedArchive {
    pub archive: Utf8PathBuf,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedArchive {
    pub archive: Utf8PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberFile {
    pub index: IndexName,
    pub file: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractReport {
    pub extracted: Vec<ExtractedArchive>,
    pub failed: Vec<FailedArchive>,
    pub members: Vec<MemberFile>,
}

/// Unzips every downloaded archive and pairs each index with its member spreadsheet.
///
/// A corrupt archive is logged and skipped; the remaining archives are still extracted.
pub fn extract_all(workspace: &Workspace, indices: &[IndexName]) -> Result<ExtractReport, SyncError> {
    let target = workspace.extracted_dir();
    fs::create_dir_all(target.as_std_path()).map_err(|err| SyncError::Filesystem(err.to_string()))?;

    let mut extracted = Vec::new();
    let mut failed = Vec::new();
    for archive_path in workspace.list_archives()? {
        match archive::extract_archive(archive_path.as_std_path(), target.as_std_path()) {
            Ok(files) => {
                info!(archive = %archive_path, files = files.len(), "extracted archive");
                extracted.push(ExtractedArchive {
                    archive: archive_path,
                    files: files.len(),
                });
            }
            Err(err) => {
                warn!(archive = %archive_path, error = %err, "failed to extract archive");
                failed.push(FailedArchive {
                    archive: archive_path,
                    message: err.to_string(),
                });
            }
        }
    }

    let members = locate_member_files(indices, &target)?;
    Ok(ExtractReport {
        extracted,
        failed,
        members,
    })
}

/// First `.xlsx` file (in path order) whose upper-cased name contains the index name.
pub fn locate_member_files(
    indices: &[IndexName],
    dir: &Utf8Path,
) -> Result<Vec<MemberFile>, SyncError> {
    let mut spreadsheets = Vec::new();
    if dir.as_std_path().exists() {
        for path in walk_files(dir.as_std_path())? {
            let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
                continue;
            };
            let is_xlsx = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
                .unwrap_or(false);
            if is_xlsx {
                spreadsheets.push(path);
            }
        }
    }
    spreadsheets.sort();

    Ok(indices
        .iter()
        .map(|index| {
            let file = spreadsheets
                .iter()
                .find(|path| {
                    path.file_name()
                        .map(|name| index.matches_file(&name.to_uppercase()))
                        .unwrap_or(false)
                })
                .cloned();
            if file.is_none() {
                info!(index = %index, "no member file found");
            }
            MemberFile {
                index: index.clone(),
                file,
            }
        })
        .collect())
}

fn walk_files(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries = fs::read_dir(&path).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                items.push(path);
            }
        }
    }
    Ok(items)
}
