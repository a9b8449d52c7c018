//! Fetching workbook bytes for a batch row.

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::FetchError;
use crate::models::SourceReference;

#[async_trait]
pub trait WorkbookFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceReference) -> Result<Vec<u8>, FetchError>;
}

/// Reads path sources from disk.
#[derive(Debug, Default, Clone)]
pub struct LocalFileFetcher;

#[async_trait]
impl WorkbookFetcher for LocalFileFetcher {
    async fn fetch(&self, source: &SourceReference) -> Result<Vec<u8>, FetchError> {
        let SourceReference::Path(path) = source else {
            return Err(FetchError::Io(format!("not a local path: {source}")));
        };
        tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => FetchError::AccessDenied(path.display().to_string()),
            _ => FetchError::Io(format!("Could not read {}: {}", path.display(), e)),
        })
    }
}

fn sheets_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://docs\.google\.com/spreadsheets/d/([A-Za-z0-9_-]+)").expect("sheets url regex")
    })
}

/// Share links to hosted spreadsheets point at an editor page; rewrite
/// them to the xlsx export endpoint. Other URLs are returned unchanged.
pub fn download_url(url: &str) -> String {
    match sheets_id_regex().captures(url.trim()) {
        Some(caps) => format!("https://docs.google.com/spreadsheets/d/{}/export?format=xlsx", &caps[1]),
        None => url.trim().to_string(),
    }
}

/// Downloads URL sources, optionally with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    access_token: Option<String>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, access_token: Option<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Io(e.to_string()))?;
        Ok(Self { client, access_token })
    }
}

#[async_trait]
impl WorkbookFetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceReference) -> Result<Vec<u8>, FetchError> {
        let SourceReference::Url(url) = source else {
            return Err(FetchError::Io(format!("not a URL: {source}")));
        };
        let target = download_url(url);
        let mut request = self.client.get(&target);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.clone())
            } else {
                FetchError::Io(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound(url.clone())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(FetchError::AccessDenied(url.clone())),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => return Err(FetchError::Timeout(url.clone())),
            other => return Err(FetchError::Io(format!("{url}: HTTP {other}"))),
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.clone())
            } else {
                FetchError::Io(format!("{url}: {e}"))
            }
        })?;
        tracing::debug!(url = %target, bytes = bytes.len(), "Workbook downloaded");
        Ok(bytes.to_vec())
    }
}

/// Routes each source kind to its fetcher.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    local: LocalFileFetcher,
    http: HttpFetcher,
}

impl DefaultFetcher {
    pub fn new(timeout: Duration, access_token: Option<String>) -> Result<Self, FetchError> {
        Ok(Self {
            local: LocalFileFetcher,
            http: HttpFetcher::new(timeout, access_token)?,
        })
    }
}

#[async_trait]
impl WorkbookFetcher for DefaultFetcher {
    async fn fetch(&self, source: &SourceReference) -> Result<Vec<u8>, FetchError> {
        match source {
            SourceReference::Path(_) => self.local.fetch(source).await,
            SourceReference::Url(_) => self.http.fetch(source).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn rewrites_sheet_share_links() {
        assert_eq!(
            download_url("https://docs.google.com/spreadsheets/d/1AbC_d-9/edit#gid=0"),
            "https://docs.google.com/spreadsheets/d/1AbC_d-9/export?format=xlsx"
        );
        assert_eq!(download_url(" https://example.com/a.xlsx "), "https://example.com/a.xlsx");
    }

    #[test]
    fn fetcher_is_object_safe() {
        let fetcher: Arc<dyn WorkbookFetcher> = Arc::new(LocalFileFetcher);
        drop(fetcher);
    }

    #[tokio::test]
    async fn local_fetcher_reads_and_maps_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.xlsx");
        std::fs::write(&path, b"bytes").unwrap();
        let fetcher = LocalFileFetcher;
        assert_eq!(fetcher.fetch(&SourceReference::Path(path)).await.unwrap(), b"bytes");

        let missing = SourceReference::Path(dir.path().join("missing.xlsx"));
        assert!(matches!(fetcher.fetch(&missing).await, Err(FetchError::NotFound(_))));
        assert!(matches!(
            fetcher.fetch(&SourceReference::Url("https://example.com/a.xlsx".into())).await,
            Err(FetchError::Io(_))
        ));
    }
}
