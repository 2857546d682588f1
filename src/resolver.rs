use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

use crate::archive;
use crate::catalog::CatalogClient;
use crate::domain::{CoverageResult, IndexName, RemainingSet};
use crate::error::SyncError;
use crate::fetcher::Fetcher;
use crate::rate_limit::Throttle;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    CatalogUnavailable,
    NoCatalogEntry,
    MissingAttachment,
    DownloadFailed,
    FetchTimeout,
    UnreadableArchive,
}

impl DropReason {
    fn from_download_error(err: &SyncError) -> Self {
        match err {
            SyncError::FetchTimeout(_) => DropReason::FetchTimeout,
            SyncError::UnreadableArchive { .. } => DropReason::UnreadableArchive,
            _ => DropReason::DownloadFailed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadRecord {
    pub index: IndexName,
    pub attachment_name: String,
    pub path: Utf8PathBuf,
    pub covered: Vec<IndexName>,
    /// True when no member name matched any remaining index.
    pub self_covered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedIndex {
    pub index: IndexName,
    pub reason: DropReason,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub year: i32,
    pub iterations: usize,
    pub downloads: Vec<DownloadRecord>,
    pub dropped: Vec<DroppedIndex>,
}

impl ResolveReport {
    pub fn covered(&self) -> Vec<&IndexName> {
        self.downloads
            .iter()
            .flat_map(|download| download.covered.iter())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }
}

pub struct CoverageResolver<C, F, T> {
    catalog: C,
    fetcher: F,
    throttle: T,
    workspace: Workspace,
}

impl<C: CatalogClient, F: Fetcher, T: Throttle> CoverageResolver<C, F, T> {
    pub fn new(catalog: C, fetcher: F, throttle: T, workspace: Workspace) -> Self {
        Self {
            catalog,
            fetcher,
            throttle,
            workspace,
        }
    }

    /// Downloads archives until every requested index is covered or dropped.
    ///
    /// Archive contents are only known after download, so each iteration
    /// fetches the latest archive for the first uncovered index and credits
    /// every remaining index whose name shows up in a member file name. The
    /// triggering index is always removed, so a run performs at most
    /// `requested.len()` iterations.
    ///
    /// Failures never escape: an index that cannot be resolved is recorded in
    /// [`ResolveReport::dropped`] and the loop moves on.
    pub fn resolve(&self, requested: &[IndexName], year: i32) -> ResolveReport {
        let mut remaining = RemainingSet::new(requested);
        let mut report = ResolveReport {
            year,
            iterations: 0,
            downloads: Vec::new(),
            dropped: Vec::new(),
        };

        if remaining.is_empty() {
            info!("no indices requested");
            return report;
        }
        info!(count = remaining.len(), year, "resolving index archives");

        while let Some(current) = remaining.first().cloned() {
            report.iterations += 1;
            info!(index = %current, encoded = %current.catalog_encoding(), "querying catalog");

            let entry = match self.catalog.latest(&current, year) {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    info!(index = %current, year, "no catalog entry, skipping");
                    drop_index(
                        &mut remaining,
                        &mut report,
                        &current,
                        DropReason::NoCatalogEntry,
                        None,
                    );
                    continue;
                }
                Err(err) => {
                    warn!(index = %current, error = %err, "catalog query failed, skipping");
                    drop_index(
                        &mut remaining,
                        &mut report,
                        &current,
                        DropReason::CatalogUnavailable,
                        Some(err.to_string()),
                    );
                    continue;
                }
            };

            let file_name = match entry.file_name() {
                Some(name) if !entry.attachment_url.trim().is_empty() => name.to_string(),
                _ => {
                    warn!(index = %current, attachment = %entry.attachment_name, "catalog entry has no usable attachment");
                    drop_index(
                        &mut remaining,
                        &mut report,
                        &current,
                        DropReason::MissingAttachment,
                        None,
                    );
                    continue;
                }
            };

            let path = self.workspace.archive_path(&file_name);
            let url = self.catalog.download_url(&entry);
            info!(index = %current, %url, "downloading archive");

            let members = self
                .fetcher
                .fetch_bytes_to_file(&url, path.as_std_path())
                .and_then(|()| {
                    archive::list_contents(path.as_std_path()).inspect_err(|_| {
                        // Keep the extract step from tripping over it later.
                        if let Err(err) = std::fs::remove_file(path.as_std_path()) {
                            warn!(path = %path, error = %err, "failed to remove unreadable archive");
                        }
                    })
                });

            match members {
                Ok(members) => {
                    let mut coverage = CoverageResult::from_members(&remaining, members.as_slice());
                    let self_covered = coverage.is_empty();
                    if self_covered {
                        warn!(index = %current, archive = %file_name, "no member matched any remaining index, crediting trigger only");
                    }
                    // The trigger is always retired, matched or not.
                    coverage.insert(current.clone());
                    remaining.remove_all(&coverage);
                    let covered = coverage.into_vec();
                    info!(
                        archive = %file_name,
                        covered = %join_names(&covered),
                        remaining = remaining.len(),
                        "archive saved to {path}"
                    );
                    report.downloads.push(DownloadRecord {
                        index: current,
                        attachment_name: entry.attachment_name,
                        path,
                        covered,
                        self_covered,
                    });
                }
                Err(err) => {
                    warn!(index = %current, error = %err, "download failed, skipping");
                    drop_index(
                        &mut remaining,
                        &mut report,
                        &current,
                        DropReason::from_download_error(&err),
                        Some(err.to_string()),
                    );
                }
            }

            if !remaining.is_empty() {
                self.throttle.pause();
            }
        }

        if report.is_complete() {
            info!(downloads = report.downloads.len(), "all indices covered");
        } else {
            let dropped: Vec<IndexName> = report.dropped.iter().map(|d| d.index.clone()).collect();
            warn!(
                downloads = report.downloads.len(),
                uncovered = %join_names(&dropped),
                "finished with uncovered indices"
            );
        }
        report
    }
}

fn drop_index(
    remaining: &mut RemainingSet,
    report: &mut ResolveReport,
    index: &IndexName,
    reason: DropReason,
    message: Option<String>,
) {
    remaining.drop_index(index);
    report.dropped.push(DroppedIndex {
        index: index.clone(),
        reason,
        message,
    });
}

fn join_names(names: &[IndexName]) -> String {
    names
        .iter()
        .map(IndexName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
