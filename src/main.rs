//! Papershelf - a catalog browser for exam papers.
//!
//! This is the main entry point for the web server.
//! The application is organized into the following modules:
//!
//! - `models`: Paper records, filter state and filter options
//! - `catalog`: Catalog loading, option derivation and filtering
//! - `viewer`: Viewer page states and the blob/direct-link decision
//! - `blob`: Page-scoped blob references
//! - `fetch`: Reading local and remote assets
//! - `templates`: HTML/CSS/JS templates and rendering
//! - `handlers`: HTTP route handlers

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use papershelf::{app, spawn_page_sweeper, AppState, Config};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "papershelf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let bind = config.bind;

    if !config.site_root.is_dir() {
        error!(site_root = %config.site_root.display(), "site root is not a directory");
        std::process::exit(1);
    }

    info!(site_root = %config.site_root.display(), catalog = %config.catalog, "serving catalog");
    if config.allow_remote {
        info!("Remote fetching: ENABLED");
    } else {
        info!("Remote fetching: DISABLED (set PAPERSHELF_ALLOW_REMOTE to enable)");
    }

    let state = Arc::new(AppState::new(config));
    spawn_page_sweeper(state.clone());

    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%bind, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!("Papershelf running at http://{}", bind);

    if let Err(e) = axum::serve(listener, app(state)).await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
}
