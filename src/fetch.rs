//! Fetching raw bytes for catalog resources and PDFs.
//!
//! Everything the server reads on behalf of a page goes through
//! [`AssetFetcher`], so the catalog and viewer can be exercised against
//! in-memory fixtures.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::url_validator::{parse_file_ref, resolve_remote, FileRef};
use crate::validate_path_within;

/// Bytes of a fetched resource plus the content type, when one was reported.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, file: &str) -> Result<FetchedAsset, FetchError>;
}

/// Reads local paths from the site root and, when allowed, remote files over HTTP.
pub struct SiteFetcher {
    site_root: PathBuf,
    allow_remote: bool,
    timeout: Duration,
    max_bytes: u64,
}

/// HTTP client for one remote fetch. Redirects are not followed, so every
/// connection goes to a host that passed validation; `pinned` fixes the
/// address the host resolved to at validation time.
pub fn http_client(timeout: Duration, pinned: Option<(&str, SocketAddr)>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none());
    if let Some((host, addr)) = pinned {
        builder = builder.resolve(host, addr);
    }
    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

impl SiteFetcher {
    pub fn new(site_root: PathBuf, allow_remote: bool, timeout: Duration, max_bytes: u64) -> Self {
        Self {
            site_root,
            allow_remote,
            timeout,
            max_bytes,
        }
    }

    fn check_size(&self, size: u64) -> Result<(), FetchError> {
        if size > self.max_bytes {
            return Err(FetchError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    async fn fetch_local(&self, relative: PathBuf) -> Result<FetchedAsset, FetchError> {
        let target = self.site_root.join(&relative);
        let path = validate_path_within(&self.site_root, &target)?;
        let metadata = tokio::fs::metadata(&path).await?;
        self.check_size(metadata.len())?;
        let bytes = tokio::fs::read(&path).await?;
        self.check_size(bytes.len() as u64)?;
        debug!(path = %path.display(), size = bytes.len(), "read local asset");
        Ok(FetchedAsset {
            bytes,
            content_type: guess_content_type(&relative.to_string_lossy()),
        })
    }

    async fn fetch_remote(&self, url: url::Url) -> Result<FetchedAsset, FetchError> {
        if !self.allow_remote {
            return Err(FetchError::RemoteDisabled);
        }

        let addr = resolve_remote(&url).await?;
        let client = match url.host() {
            Some(url::Host::Domain(domain)) => http_client(self.timeout, Some((domain, addr))),
            _ => http_client(self.timeout, None),
        };

        let mut response = client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        if let Some(length) = response.content_length() {
            self.check_size(length)?;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| guess_content_type(url.path()));

        // Content-Length can be absent or wrong; count while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            self.check_size((bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }
        debug!(%url, size = bytes.len(), "fetched remote asset");
        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}

#[async_trait]
impl AssetFetcher for SiteFetcher {
    async fn fetch(&self, file: &str) -> Result<FetchedAsset, FetchError> {
        match parse_file_ref(file)? {
            FileRef::Local(relative) => self.fetch_local(relative).await,
            FileRef::Remote(url) => self.fetch_remote(url).await,
        }
    }
}

/// Content type from the file extension, for the handful of types a catalog serves.
pub fn guess_content_type(path: &str) -> Option<String> {
    let ext = path.rsplit('.').next()?.to_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        _ => return None,
    };
    Some(mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fetcher(root: &std::path::Path) -> SiteFetcher {
        SiteFetcher::new(root.to_path_buf(), false, Duration::from_secs(5), 1024)
    }

    #[tokio::test]
    async fn test_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("papers")).unwrap();
        fs::write(dir.path().join("papers/a.pdf"), b"%PDF-1.4").unwrap();

        let asset = fetcher(dir.path()).fetch("papers/a.pdf").await.unwrap();
        assert_eq!(asset.bytes, b"%PDF-1.4");
        assert_eq!(asset.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetcher(dir.path()).fetch("nope.pdf").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remote_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetcher(dir.path()).fetch("https://example.org/a.pdf").await;
        assert!(matches!(result, Err(FetchError::RemoteDisabled)));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetcher(dir.path()).fetch("../etc/passwd").await;
        assert!(matches!(result, Err(FetchError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn test_local_file_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.pdf"), vec![b'x'; 2048]).unwrap();

        let result = fetcher(dir.path()).fetch("big.pdf").await;
        assert!(matches!(
            result,
            Err(FetchError::TooLarge { size: 2048, limit: 1024 })
        ));
    }

    #[tokio::test]
    async fn test_remote_internal_host_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = SiteFetcher::new(dir.path().to_path_buf(), true, Duration::from_secs(5), 1024);
        let result = fetcher.fetch("http://127.0.0.1:9/a.pdf").await;
        assert!(matches!(result, Err(FetchError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn test_client_does_not_follow_redirects() {
        use axum::{response::Redirect, routing::get, Router};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/moved", get(|| async { Redirect::temporary("http://127.0.0.1:9/secret") }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = http_client(Duration::from_secs(5), None);
        let response = client
            .get(format!("http://{}/moved", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 307);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("a/B.PDF").as_deref(), Some("application/pdf"));
        assert_eq!(guess_content_type("papers.json").as_deref(), Some("application/json"));
        assert_eq!(guess_content_type("archive.zip"), None);
    }
}
