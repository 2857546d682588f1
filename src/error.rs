use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("invalid index name: {0:?}")]
    InvalidIndexName(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("catalog unavailable for {index}: {message}")]
    CatalogUnavailable { index: String, message: String },

    #[error("catalog lists no archive for {index} in {year}")]
    NoCatalogEntry { index: String, year: i32 },

    #[error("catalog entry for {0} has no usable attachment name")]
    MissingAttachment(String),

    #[error("request failed: {0}")]
    DownloadFailed(String),

    #[error("request timed out: {0}")]
    FetchTimeout(String),

    #[error("server returned status {status}: {message}")]
    FetchStatus { status: u16, message: String },

    #[error("unreadable archive {path}: {message}")]
    UnreadableArchive { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
