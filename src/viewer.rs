//! Viewer page state: fetch the PDF as bytes, or degrade to the direct link.

use serde::Deserialize;
use tracing::{info, warn};

use crate::blob::{BlobStore, PageRegistry};
use crate::error::BlobError;
use crate::fetch::{AssetFetcher, FetchedAsset};
use crate::url_validator::direct_target;

/// Fallback filename when a `file` value has no usable last segment.
pub const DEFAULT_FILENAME: &str = "document.pdf";

/// Query parameters of the viewer page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewerParams {
    pub file: Option<String>,
    pub title: Option<String>,
}

/// Where each viewer control points once the page is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerTargets {
    pub frame_src: String,
    pub download_href: String,
    pub download_name: String,
    pub open_href: String,
}

/// Terminal states of a viewer page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    /// No usable `file` parameter; nothing was fetched.
    ErrorShown { message: String },
    /// Bytes fetched and exposed through a page-scoped blob.
    Displayed {
        page_id: String,
        title: String,
        targets: ViewerTargets,
    },
    /// No blob for this page; every control points at the original file.
    DisplayedDegraded {
        title: String,
        targets: ViewerTargets,
        warning: String,
    },
}

/// The `file` parameter as given, treating a blank value as absent.
///
/// The value is not trimmed: direct links carry exactly what the catalog
/// linked to. Fetching trims it.
pub fn file_param(params: &ViewerParams) -> Option<&str> {
    params.file.as_deref().filter(|f| !f.trim().is_empty())
}

/// Last path segment of a file reference, decoded, without query or fragment.
pub fn file_name_from_url(file: &str) -> String {
    let path = file.trim().split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string());
    if decoded.trim().is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        decoded
    }
}

/// Heading for the viewer: the given title, else the file name.
pub fn viewer_title(params: &ViewerParams) -> String {
    if let Some(title) = params.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    match file_param(params) {
        Some(file) => file_name_from_url(file),
        None => "Viewing PDF".to_string(),
    }
}

/// Store fetched bytes as a blob owned by a new page scope.
///
/// Oldest pages are released until the blob fits; a blob larger than the
/// whole store is refused outright. Returns the page id and blob href.
fn hold_blob(
    blobs: &BlobStore,
    pages: &PageRegistry,
    asset: FetchedAsset,
    filename: &str,
) -> Result<(String, String), BlobError> {
    let size = asset.bytes.len();
    if size > blobs.capacity() {
        return Err(BlobError::Full {
            needed: size,
            available: blobs.capacity(),
        });
    }
    while !blobs.fits(size) && pages.release_oldest() {}

    let content_type = asset
        .content_type
        .unwrap_or_else(|| "application/pdf".to_string());
    let object_url = blobs.create(asset.bytes, &content_type, filename)?;
    let href = object_url.href();
    let page_id = pages.open(object_url)?;
    Ok((page_id, href))
}

fn degraded(title: String, direct: &str, filename: String, warning: String) -> ViewerState {
    ViewerState::DisplayedDegraded {
        title,
        targets: ViewerTargets {
            frame_src: direct.to_string(),
            download_href: direct.to_string(),
            download_name: filename,
            open_href: direct.to_string(),
        },
        warning,
    }
}

/// Drive a viewer page load to its terminal state.
///
/// On success the blob's guard is handed to a new page scope, so it is
/// revoked when that page is released. A `file` that is neither a site path
/// nor an http(s) URL is never fetched or echoed into the page.
pub async fn open_viewer(
    fetcher: &dyn AssetFetcher,
    blobs: &BlobStore,
    pages: &PageRegistry,
    params: &ViewerParams,
) -> ViewerState {
    let Some(raw) = file_param(params) else {
        return ViewerState::ErrorShown {
            message: "No file specified.".to_string(),
        };
    };
    let Some(direct) = direct_target(raw) else {
        warn!(file = %raw.escape_debug(), "refusing unsupported file reference");
        return ViewerState::ErrorShown {
            message: "Unsupported file reference.".to_string(),
        };
    };
    let file = raw.trim();
    let title = viewer_title(params);
    let filename = file_name_from_url(file);

    let asset = match fetcher.fetch(file).await {
        Ok(asset) => asset,
        Err(e) => {
            warn!(%file, error = %e, "could not fetch PDF, falling back to direct link");
            return degraded(title, direct, filename, e.to_string());
        }
    };

    match hold_blob(blobs, pages, asset, &filename) {
        Ok((page_id, href)) => {
            info!(%file, page = %page_id, "serving viewer from blob");
            ViewerState::Displayed {
                page_id,
                title,
                targets: ViewerTargets {
                    frame_src: href.clone(),
                    download_href: href,
                    download_name: filename,
                    open_href: direct.to_string(),
                },
            }
        }
        Err(e) => {
            warn!(%file, error = %e, "could not hold PDF blob, falling back to direct link");
            degraded(title, direct, filename, e.to_string())
        }
    }
}
