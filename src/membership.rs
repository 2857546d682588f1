use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::IndexName;
use crate::error::SyncError;

/// Company symbols listed by each index, as produced by the spreadsheet step.
pub type CompanyLists = BTreeMap<IndexName, Vec<String>>;

pub fn load_company_lists(path: &Utf8Path) -> Result<CompanyLists, SyncError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| SyncError::Filesystem(format!("read {path}: {err}")))?;
    serde_json::from_str(&content).map_err(|err| SyncError::ConfigParse(format!("{path}: {err}")))
}

/// Symbol to indices mapping. Both levels are sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipTable(BTreeMap<String, Vec<IndexName>>);

impl MembershipTable {
    pub fn reconcile(lists: &CompanyLists) -> Self {
        let mut table: BTreeMap<String, Vec<IndexName>> = BTreeMap::new();
        for (index, symbols) in lists {
            for symbol in symbols {
                let symbol = symbol.trim();
                if symbol.is_empty() {
                    continue;
                }
                let indices = table.entry(symbol.to_string()).or_default();
                if !indices.contains(index) {
                    indices.push(index.clone());
                }
            }
        }
        for indices in table.values_mut() {
            indices.sort();
        }
        Self(table)
    }

    pub fn get(&self, symbol: &str) -> Option<&[IndexName]> {
        self.0.get(symbol).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<IndexName>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Persistence keyed by company symbol. Writing the same row twice must be harmless.
pub trait MembershipStore {
    /// Returns the number of rows written for `symbol`.
    fn update(&mut self, symbol: &str, indices: &[IndexName]) -> Result<usize, SyncError>;

    fn flush(&mut self) -> Result<(), SyncError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PushSummary {
    pub symbols: usize,
    pub rows_updated: usize,
    pub unmatched: Vec<String>,
}

pub fn push<S: MembershipStore>(
    table: &MembershipTable,
    store: &mut S,
) -> Result<PushSummary, SyncError> {
    let mut summary = PushSummary::default();
    if table.is_empty() {
        warn!("no company symbols to push, leaving the store untouched");
        return Ok(summary);
    }
    for (symbol, indices) in table.iter() {
        let rows = store.update(symbol, indices)?;
        debug!(symbol = %symbol, rows, "updated");
        summary.symbols += 1;
        summary.rows_updated += rows;
        if rows == 0 {
            summary.unmatched.push(symbol.clone());
        }
    }
    store.flush()?;
    info!(
        symbols = summary.symbols,
        rows = summary.rows_updated,
        unmatched = summary.unmatched.len(),
        "pushed index membership"
    );
    Ok(summary)
}

/// JSON object keyed by symbol, rewritten atomically on flush.
#[derive(Debug)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
    rows: BTreeMap<String, Vec<IndexName>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, SyncError> {
        let path = path.into();
        let rows = if path.as_std_path().exists() {
            let content = fs::read_to_string(path.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
            serde_json::from_str(&content)
                .map_err(|err| SyncError::Filesystem(format!("{path}: {err}")))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, rows })
    }

    pub fn rows(&self) -> &BTreeMap<String, Vec<IndexName>> {
        &self.rows
    }
}

impl MembershipStore for JsonFileStore {
    fn update(&mut self, symbol: &str, indices: &[IndexName]) -> Result<usize, SyncError> {
        self.rows.insert(symbol.to_string(), indices.to_vec());
        Ok(1)
    }

    fn flush(&mut self) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent.as_std_path())
                    .map_err(|err| SyncError::Filesystem(err.to_string()))?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(&self.rows)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), self.path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
