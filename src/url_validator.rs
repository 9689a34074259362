//! Classification of `file` references before the server fetches them.
//!
//! A paper's `file` is either a path under the site root or an absolute
//! HTTP(S) URL. Since the value arrives in a query string, it is checked
//! before any bytes are read:
//! - local paths may not climb out of the site root
//! - only `http` and `https` URLs are accepted
//! - literal internal addresses (loopback, private ranges, link-local) and
//!   `localhost` are refused, and remote hosts must resolve to public
//!   addresses only (DNS rebinding protection)
//!
//! [`direct_target`] decides separately whether a raw value may be handed
//! back to the browser as a link when the server could not fetch it.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::{Host, Url};

/// A validated `file` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    /// Path relative to the site root, already free of `..` and root components.
    Local(PathBuf),
    Remote(Url),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FileRefError {
    #[error("no file given")]
    Empty,
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("path leaves the site root: {0}")]
    PathTraversal(String),
    #[error("internal addresses are not fetched: {0}")]
    InternalAddress(String),
    #[error("DNS resolution failed: {0}")]
    DnsResolutionFailed(String),
}

/// Check if an IPv4 address is internal/private
fn is_internal_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        // Shared address space (100.64.0.0/10)
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xC0) == 64)
}

/// Check if an IPv6 address is internal/private
fn is_internal_ipv6(ip: &Ipv6Addr) -> bool {
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.to_ipv4_mapped().map(|v4| is_internal_ipv4(&v4)).unwrap_or(false)
        // Unique local addresses (fc00::/7)
        || (ip.segments()[0] & 0xFE00) == 0xFC00
        // Link-local (fe80::/10)
        || (ip.segments()[0] & 0xFFC0) == 0xFE80
}

fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => is_internal_ipv6(v6),
    }
}

/// Classify a raw `file` value.
pub fn parse_file_ref(raw: &str) -> Result<FileRef, FileRefError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FileRefError::Empty);
    }

    match Url::parse(raw) {
        Ok(url) => validate_remote(url).map(FileRef::Remote),
        Err(url::ParseError::RelativeUrlWithoutBase) => local_path(raw).map(FileRef::Local),
        Err(e) => Err(FileRefError::InvalidUrl(e.to_string())),
    }
}

/// The raw `file` value if it is safe to emit as a frame source, link or
/// redirect target: a same-origin relative path or an `http(s)` URL.
///
/// Values a browser could read as another scheme (`javascript:`, `data:`),
/// as a protocol-relative URL (`//host`), or that carry control characters
/// browsers silently strip, are refused.
pub fn direct_target(raw: &str) -> Option<&str> {
    if raw.chars().any(char::is_control) {
        return None;
    }
    let trimmed = raw.trim();
    let mut lead = trimmed.chars().take(2);
    let is_slash = |c: Option<char>| matches!(c, Some('/') | Some('\\'));
    if is_slash(lead.next()) && is_slash(lead.next()) {
        return None;
    }
    if trimmed.starts_with('\\') {
        return None;
    }

    match parse_file_ref(trimmed) {
        Ok(_)
        | Err(FileRefError::PathTraversal(_))
        | Err(FileRefError::InternalAddress(_))
        | Err(FileRefError::DnsResolutionFailed(_)) => Some(raw),
        Err(FileRefError::Empty)
        | Err(FileRefError::InvalidUrl(_))
        | Err(FileRefError::UnsupportedScheme(_)) => None,
    }
}

/// Resolve a remote URL's host and return an address to connect to.
/// Fails if any resolved address is internal.
pub async fn resolve_remote(url: &Url) -> Result<SocketAddr, FileRefError> {
    let host = url
        .host_str()
        .ok_or_else(|| FileRefError::InvalidUrl("no host in URL".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = url.port_or_known_default().unwrap_or(80);

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| FileRefError::DnsResolutionFailed(e.to_string()))?;
    check_resolved(addrs)
}

/// All addresses must be public; the first one is used for the connection.
pub fn check_resolved<I>(addrs: I) -> Result<SocketAddr, FileRefError>
where
    I: IntoIterator<Item = SocketAddr>,
{
    let mut first = None;
    for addr in addrs {
        if is_internal_ip(&addr.ip()) {
            return Err(FileRefError::InternalAddress(addr.ip().to_string()));
        }
        first.get_or_insert(addr);
    }
    first.ok_or_else(|| FileRefError::DnsResolutionFailed("no addresses".to_string()))
}

fn validate_remote(url: Url) -> Result<Url, FileRefError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FileRefError::UnsupportedScheme(url.scheme().to_string()));
    }

    let internal = match url.host() {
        Some(Host::Ipv4(v4)) => is_internal_ip(&IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_internal_ip(&IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        None => return Err(FileRefError::InvalidUrl("no host in URL".to_string())),
    };

    if internal {
        let host = url.host_str().unwrap_or_default().to_string();
        return Err(FileRefError::InternalAddress(host));
    }

    Ok(url)
}

fn local_path(raw: &str) -> Result<PathBuf, FileRefError> {
    // Catalog paths are URL paths; drop any query or fragment before
    // treating them as files on disk.
    let path_part = raw.split(['?', '#']).next().unwrap_or_default();
    let decoded = urlencoding::decode(path_part)
        .map_err(|e| FileRefError::InvalidUrl(e.to_string()))?;

    let mut clean = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(FileRefError::PathTraversal(raw.to_string()))
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(FileRefError::Empty);
    }
    Ok(clean)
}
