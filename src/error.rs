//! Error types for catalog loading and asset fetching.
//!
//! Neither kind ever reaches an HTTP response as a failure status: the
//! catalog page turns a `CatalogError` into an inline message, and the viewer
//! turns a `FetchError` into its degraded direct-link mode.

use thiserror::Error;

use crate::url_validator::FileRefError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    InvalidReference(#[from] FileRefError),
    #[error("remote files are not fetched by this server")]
    RemoteDisabled,
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("file is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlobError {
    #[error("blob store is full ({needed} bytes needed, {available} available)")]
    Full { needed: usize, available: usize },
    #[error("blob store lock is poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not fetch {source_name}: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: FetchError,
    },
    #[error("could not parse {source_name}: {error}")]
    Parse {
        source_name: String,
        #[source]
        error: serde_json::Error,
    },
}
