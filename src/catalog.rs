use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{CatalogEntry, IndexName};
use crate::error::SyncError;
use crate::fetcher::Fetcher;

const UPLOADER_PATH: &str = "/secondary/get/StockData/GetStockUploader";

pub trait CatalogClient {
    /// Most recent upload for `index` in `year`, or `None` when the catalog lists nothing.
    fn latest(&self, index: &IndexName, year: i32) -> Result<Option<CatalogEntry>, SyncError>;

    /// Absolute download URL for an entry returned by [`CatalogClient::latest`].
    fn download_url(&self, entry: &CatalogEntry) -> String;
}

impl<T: CatalogClient + ?Sized> CatalogClient for &T {
    fn latest(&self, index: &IndexName, year: i32) -> Result<Option<CatalogEntry>, SyncError> {
        (**self).latest(index, year)
    }

    fn download_url(&self, entry: &CatalogEntry) -> String {
        (**self).download_url(entry)
    }
}

#[derive(Debug, Deserialize)]
struct UploaderResponse {
    #[serde(rename = "Results", default)]
    results: Option<Vec<UploaderResult>>,
}

#[derive(Debug, Deserialize)]
struct UploaderResult {
    #[serde(rename = "AttachmentName", default)]
    attachment_name: Option<String>,
    #[serde(rename = "AttachmentUrl", default)]
    attachment_url: Option<String>,
}

pub struct IdxCatalog<F: Fetcher> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetcher> IdxCatalog<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn query_url(&self, index: &IndexName, year: i32) -> Result<Url, SyncError> {
        let encoded = index.catalog_encoding();
        let year = year.to_string();
        Url::parse_with_params(
            &format!("{}{}", self.base_url, UPLOADER_PATH),
            &[
                ("typeIndex", encoded.as_str()),
                ("year", year.as_str()),
                ("table", "stockIndex"),
                ("locale", "id"),
            ],
        )
        .map_err(|err| SyncError::InvalidConfig(format!("base_url: {err}")))
    }
}

impl<F: Fetcher> CatalogClient for IdxCatalog<F> {
    fn latest(&self, index: &IndexName, year: i32) -> Result<Option<CatalogEntry>, SyncError> {
        let url = self.query_url(index, year)?;
        debug!(%url, "querying catalog");
        let body = self
            .fetcher
            .fetch_text(url.as_str())
            .map_err(|err| SyncError::CatalogUnavailable {
                index: index.to_string(),
                message: err.to_string(),
            })?;
        parse_latest(&body).map_err(|message| SyncError::CatalogUnavailable {
            index: index.to_string(),
            message,
        })
    }

    fn download_url(&self, entry: &CatalogEntry) -> String {
        let path = entry.attachment_url.trim();
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Results are ordered newest first; only the head is of interest.
fn parse_latest(body: &str) -> Result<Option<CatalogEntry>, String> {
    let response: UploaderResponse =
        serde_json::from_str(body).map_err(|err| format!("malformed catalog body: {err}"))?;
    let Some(first) = response.results.and_then(|results| results.into_iter().next()) else {
        return Ok(None);
    };
    Ok(Some(CatalogEntry {
        attachment_name: first.attachment_name.unwrap_or_default(),
        attachment_url: first.attachment_url.unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_result() {
        let body = r#"{"ResultCount":2,"Results":[
            {"AttachmentName":"Indeks Februari.zip","AttachmentUrl":"/Media/a.zip"},
            {"AttachmentName":"Indeks Januari.zip","AttachmentUrl":"/Media/b.zip"}
        ]}"#;
        let entry = parse_latest(body).unwrap().unwrap();
        assert_eq!(entry.attachment_name, "Indeks Februari.zip");
        assert_eq!(entry.attachment_url, "/Media/a.zip");
    }

    #[test]
    fn empty_or_null_results_are_absent() {
        assert_eq!(parse_latest(r#"{"Results":[]}"#).unwrap(), None);
        assert_eq!(parse_latest(r#"{"Results":null}"#).unwrap(), None);
        assert_eq!(parse_latest(r#"{}"#).unwrap(), None);
    }

    #[test]
    fn html_body_is_an_error() {
        assert!(parse_latest("<html>blocked</html>").is_err());
    }
}
