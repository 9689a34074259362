//! HTTP route handlers for the catalog and viewer pages.
//!
//! Load failures never surface as error statuses here: the catalog renders
//! an inline message and the viewer falls back to the direct file link.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use crate::catalog::apply_filters;
use crate::models::{FilterState, PaperListResponse};
use crate::templates::{render_catalog_page, render_load_error, render_papers, render_viewer_page};
use crate::url_validator::{direct_target, parse_file_ref, FileRef, FileRefError};
use crate::viewer::{file_name_from_url, file_param, open_viewer, ViewerParams};
use crate::AppState;

// ============================================================================
// Catalog Handlers
// ============================================================================

pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<FilterState>,
) -> Html<String> {
    let filter = filter.normalized();
    let catalog = state.load_catalog().await;

    let list_html = match catalog.error {
        Some(ref message) => render_load_error(message),
        None => render_papers(&apply_filters(&catalog.papers, &filter)),
    };

    Html(render_catalog_page(&catalog.options, &filter, &list_html))
}

/// Re-filtered list container for the catalog page's change events.
pub async fn api_papers(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<FilterState>,
) -> Json<PaperListResponse> {
    let filter = filter.normalized();
    let catalog = state.load_catalog().await;

    let response = match catalog.error {
        Some(message) => PaperListResponse {
            count: 0,
            html: render_load_error(&message),
            error: Some(message),
        },
        None => {
            let filtered = apply_filters(&catalog.papers, &filter);
            PaperListResponse {
                count: filtered.len(),
                html: render_papers(&filtered),
                error: None,
            }
        }
    };

    Json(response)
}

// ============================================================================
// Viewer Handlers
// ============================================================================

pub async fn viewer(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewerParams>,
) -> Html<String> {
    let view = open_viewer(state.fetcher.as_ref(), &state.blobs, &state.pages, &params).await;
    Html(render_viewer_page(&view))
}

/// Serve the bytes behind a live object URL.
pub async fn blob(State(state): State<Arc<AppState>>, Path(token): Path<String>) -> Response {
    let Some(blob) = state.blobs.get(&token) else {
        return (StatusCode::NOT_FOUND, "Blob not found").into_response();
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&blob.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/pdf")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition("inline", &blob.filename),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    (StatusCode::OK, headers, blob.bytes).into_response()
}

/// Page teardown beacon: drop the page scope and whatever blob it owns.
pub async fn release_page(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    if state.pages.release(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Download with a controlled filename, falling back to the direct file.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewerParams>,
) -> Response {
    let Some(raw) = file_param(&params) else {
        return (StatusCode::BAD_REQUEST, "No file specified.").into_response();
    };
    if direct_target(raw).is_none() {
        warn!(file = %raw.escape_debug(), "refusing unsupported file reference");
        return (StatusCode::BAD_REQUEST, "Unsupported file reference.").into_response();
    }
    let file = raw.trim();
    let filename = file_name_from_url(file);

    match state.fetcher.fetch(file).await {
        Ok(asset) => {
            info!(%file, size = asset.bytes.len(), "serving download");
            let content_type = asset
                .content_type
                .and_then(|ct| HeaderValue::from_str(&ct).ok())
                .unwrap_or_else(|| HeaderValue::from_static("application/pdf"));
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, content_type);
            headers.insert(
                header::CONTENT_DISPOSITION,
                content_disposition("attachment", &filename),
            );
            (StatusCode::OK, headers, asset.bytes).into_response()
        }
        Err(e) => {
            let location = fallback_location(file, state.config.allow_remote)
                .and_then(|l| HeaderValue::from_str(&l).ok());
            match location {
                Some(location) => {
                    warn!(%file, error = %e, "download fetch failed, redirecting to direct file");
                    (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
                }
                None => {
                    warn!(%file, error = %e, "download fetch failed, no redirect allowed");
                    (StatusCode::BAD_REQUEST, "File could not be fetched.").into_response()
                }
            }
        }
    }
}

/// Where a failed download may send the browser: a path on this site, or an
/// http(s) URL when remote files are allowed.
fn fallback_location(file: &str, allow_remote: bool) -> Option<String> {
    direct_target(file)?;
    match parse_file_ref(file) {
        Ok(FileRef::Local(_)) | Err(FileRefError::PathTraversal(_)) => Some(location_safe(file)),
        Ok(FileRef::Remote(url)) if allow_remote => Some(url.to_string()),
        _ => None,
    }
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "papershelf",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Header Helpers
// ============================================================================

/// ASCII-only fallback name for `filename=`.
fn sanitize_filename(filename: &str) -> String {
    let safe: String = filename
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .take(200)
        .collect();

    if safe.trim_matches(|c| c == '_' || c == '.' || c == ' ').is_empty() {
        "document.pdf".to_string()
    } else {
        safe
    }
}

/// `Content-Disposition` with an ASCII fallback and the exact UTF-8 name.
fn content_disposition(kind: &str, filename: &str) -> HeaderValue {
    let value = format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind,
        sanitize_filename(filename),
        urlencoding::encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Percent-encode anything that can't appear in a header value.
fn location_safe(file: &str) -> String {
    file.chars()
        .map(|c| {
            if c.is_ascii_graphic() {
                c.to_string()
            } else {
                urlencoding::encode(&c.to_string()).into_owned()
            }
        })
        .collect()
}
