//! Server configuration from command-line flags and environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::{DEFAULT_BIND, DEFAULT_CATALOG, DEFAULT_SITE_ROOT};

pub const DEFAULT_MAX_ASSET_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_MAX_BLOB_BYTES: usize = 256 * 1024 * 1024;
pub const DEFAULT_MAX_PAGES: usize = 1000;

#[derive(Debug, Clone, Parser)]
#[command(name = "papershelf", version, about = "Browse and view a catalog of exam papers")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "PAPERSHELF_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Directory holding the JSON resources and the PDFs
    #[arg(long, env = "PAPERSHELF_SITE_ROOT", default_value = DEFAULT_SITE_ROOT)]
    pub site_root: PathBuf,

    /// Paper list, relative to the site root or an http(s) URL
    #[arg(long, env = "PAPERSHELF_CATALOG", default_value = DEFAULT_CATALOG)]
    pub catalog: String,

    /// Optional subject list (`[{id, name}]`); subjects are derived from papers otherwise
    #[arg(long, env = "PAPERSHELF_SUBJECTS")]
    pub subjects: Option<String>,

    /// Allow the server to fetch remote http(s) files
    #[arg(long, env = "PAPERSHELF_ALLOW_REMOTE")]
    pub allow_remote: bool,

    /// Timeout for remote fetches, in seconds
    #[arg(long, env = "PAPERSHELF_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Release viewer pages (and their blobs) after this many seconds
    #[arg(long, env = "PAPERSHELF_PAGE_TTL_SECS", default_value_t = 3600)]
    pub page_ttl_secs: u64,

    /// Largest file the server reads into memory, in bytes
    #[arg(long, env = "PAPERSHELF_MAX_ASSET_BYTES", default_value_t = DEFAULT_MAX_ASSET_BYTES)]
    pub max_asset_bytes: u64,

    /// Total bytes held across all viewer blobs
    #[arg(long, env = "PAPERSHELF_MAX_BLOB_BYTES", default_value_t = DEFAULT_MAX_BLOB_BYTES)]
    pub max_blob_bytes: usize,

    /// Viewer pages kept open at once; the oldest is released past this
    #[arg(long, env = "PAPERSHELF_MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn page_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.page_ttl_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["papershelf"]);
        assert_eq!(config.catalog, "papers.json");
        assert_eq!(config.site_root, PathBuf::from("site"));
        assert!(config.subjects.is_none());
        assert_eq!(config.page_ttl(), chrono::Duration::hours(1));
        assert_eq!(config.max_asset_bytes, DEFAULT_MAX_ASSET_BYTES);
        assert_eq!(config.max_blob_bytes, DEFAULT_MAX_BLOB_BYTES);
        assert_eq!(config.max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn test_flags() {
        let config = Config::parse_from([
            "papershelf",
            "--bind",
            "0.0.0.0:8080",
            "--subjects",
            "subjects.json",
            "--allow-remote",
            "--page-ttl-secs",
            "60",
            "--max-asset-bytes",
            "1024",
            "--max-pages",
            "5",
        ]);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.subjects.as_deref(), Some("subjects.json"));
        assert!(config.allow_remote);
        assert_eq!(config.page_ttl_secs, 60);
        assert_eq!(config.max_asset_bytes, 1024);
        assert_eq!(config.max_pages, 5);
    }
}
