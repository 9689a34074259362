//! Papershelf library - re-exports for testing and external use.
//!
//! This module provides public access to all the application's modules,
//! the shared [`AppState`] and the router, so integration tests can drive
//! the server without binding a socket.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod blob;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod models;
pub mod templates;
pub mod url_validator;
pub mod viewer;

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_SITE_ROOT: &str = "site";
pub const DEFAULT_CATALOG: &str = "papers.json";

/// How often expired viewer pages are swept.
pub const PAGE_SWEEP_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub config: Config,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub blobs: BlobStore,
    pub pages: PageRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let fetcher = SiteFetcher::new(
            config.site_root.clone(),
            config.allow_remote,
            config.fetch_timeout(),
            config.max_asset_bytes,
        );
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            blobs: BlobStore::with_capacity(config.max_blob_bytes),
            pages: PageRegistry::with_capacity(config.max_pages),
            config,
            fetcher,
        }
    }

    /// Fresh catalog for one page load; nothing is cached between loads.
    pub async fn load_catalog(&self) -> CatalogLoad {
        load_catalog(
            self.fetcher.as_ref(),
            &self.config.catalog,
            self.config.subjects.as_deref(),
        )
        .await
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn app(state: Arc<AppState>) -> Router {
    let site = ServeDir::new(&state.config.site_root);

    Router::new()
        // Catalog routes
        .route("/", get(handlers::index))
        .route("/index.html", get(handlers::index))
        .route("/api/papers", get(handlers::api_papers))
        // Viewer routes
        .route("/viewer", get(handlers::viewer))
        .route("/viewer.html", get(handlers::viewer))
        .route("/download", get(handlers::download))
        .route("/blob/{token}", get(handlers::blob))
        .route("/api/page/{id}/release", post(handlers::release_page))
        .route("/api/health", get(handlers::health))
        // JSON resources and PDFs
        .fallback_service(site)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically release viewer pages whose unload beacon never arrived.
pub fn spawn_page_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ttl = state.config.page_ttl();
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(PAGE_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            state.pages.purge_older_than(ttl);
        }
    })
}

/// Validate that a path stays within the given base directory.
/// Returns the canonical path of the existing target.
pub fn validate_path_within(base: &Path, target: &Path) -> io::Result<PathBuf> {
    let canonical_base = fs::canonicalize(base)?;
    let canonical = fs::canonicalize(target)?;
    if canonical.starts_with(&canonical_base) {
        Ok(canonical)
    } else {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "path escapes the site root",
        ))
    }
}

// Re-export commonly used types
pub use blob::{Blob, BlobStore, ObjectUrl, PageRegistry, PageScope};
pub use catalog::{
    apply_filters, capitalize, derive_options, load_catalog, load_papers, load_subjects, matches,
    CatalogLoad,
};
pub use config::Config;
pub use error::{BlobError, CatalogError, FetchError};
pub use fetch::{AssetFetcher, FetchedAsset, SiteFetcher};
pub use models::{
    FilterOptions, FilterState, PaperListResponse, PaperRecord, SubjectEntry, SubjectOption, ALL,
};
pub use templates::{render_catalog_page, render_papers, render_viewer_page};
pub use url_validator::{direct_target, parse_file_ref, FileRef, FileRefError};
pub use viewer::{file_name_from_url, file_param, open_viewer, ViewerParams, ViewerState, ViewerTargets};
