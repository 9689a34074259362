//! Page-scoped blob references.
//!
//! The viewer downloads a PDF's bytes once and hands the browser a local,
//! same-origin reference (`/blob/<token>`) instead of the original URL. A
//! reference lives exactly as long as the viewer page that created it:
//!
//! - [`BlobStore::create`] stores the bytes and returns an [`ObjectUrl`] guard
//! - the guard is owned by a [`PageScope`] registered in the [`PageRegistry`]
//! - releasing the page (unload beacon or expiry) drops the scope, and the
//!   guard's `Drop` revokes the blob
//!
//! Revocation therefore happens once, whichever way the page ends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::BlobError;

/// Length of blob tokens and page ids.
const TOKEN_LEN: usize = 32;

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

// ============================================================================
// Blob Store
// ============================================================================

/// Bytes held for one object URL.
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: String,
    pub filename: String,
}

#[derive(Default)]
struct BlobTable {
    blobs: HashMap<String, Blob>,
    total_bytes: usize,
}

/// Blobs by token, bounded by the total number of bytes held.
#[derive(Clone)]
pub struct BlobStore {
    table: Arc<Mutex<BlobTable>>,
    capacity: usize,
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::with_capacity(usize::MAX)
    }
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: Arc::new(Mutex::new(BlobTable::default())),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_bytes(&self) -> usize {
        self.table.lock().map(|t| t.total_bytes).unwrap_or(0)
    }

    /// Whether `size` more bytes fit right now.
    pub fn fits(&self, size: usize) -> bool {
        self.total_bytes().saturating_add(size) <= self.capacity
    }

    /// Store bytes and return the guard that owns them.
    pub fn create(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> Result<ObjectUrl, BlobError> {
        let size = bytes.len();
        let token = random_token();
        {
            let mut table = self.table.lock().map_err(|_| {
                warn!(filename, "blob store lock poisoned, not storing blob");
                BlobError::Poisoned
            })?;
            let available = self.capacity.saturating_sub(table.total_bytes);
            if size > available {
                return Err(BlobError::Full {
                    needed: size,
                    available,
                });
            }
            table.total_bytes += size;
            table.blobs.insert(
                token.clone(),
                Blob {
                    bytes: Bytes::from(bytes),
                    content_type: content_type.to_string(),
                    filename: filename.to_string(),
                },
            );
        }
        debug!(%token, size, filename, "created blob");
        Ok(ObjectUrl {
            token,
            store: self.clone(),
        })
    }

    pub fn get(&self, token: &str) -> Option<Blob> {
        self.table.lock().ok()?.blobs.get(token).cloned()
    }

    /// Remove a blob. Returns whether it was still present.
    fn revoke(&self, token: &str) -> bool {
        let removed = self
            .table
            .lock()
            .map(|mut table| match table.blobs.remove(token) {
                Some(blob) => {
                    table.total_bytes -= blob.bytes.len();
                    true
                }
                None => false,
            })
            .unwrap_or(false);
        if removed {
            debug!(%token, "revoked blob");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A live local reference to a stored blob. Dropping it revokes the blob.
pub struct ObjectUrl {
    token: String,
    store: BlobStore,
}

impl ObjectUrl {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Same-origin path the page uses as frame source and download target.
    pub fn href(&self) -> String {
        format!("/blob/{}", self.token)
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.store.revoke(&self.token);
    }
}

impl std::fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectUrl").field("token", &self.token).finish()
    }
}

// ============================================================================
// Page Scopes
// ============================================================================

/// Resources owned by one rendered viewer page.
#[derive(Debug)]
pub struct PageScope {
    pub opened: DateTime<Utc>,
    pub object_url: ObjectUrl,
}

/// Open viewer pages, bounded by count; the oldest page is released to make room.
#[derive(Clone)]
pub struct PageRegistry {
    pages: Arc<Mutex<HashMap<String, PageScope>>>,
    capacity: usize,
}

impl Default for PageRegistry {
    fn default() -> Self {
        Self::with_capacity(usize::MAX)
    }
}

fn take_oldest(pages: &mut HashMap<String, PageScope>) -> Option<PageScope> {
    let oldest = pages
        .iter()
        .min_by_key(|(_, scope)| scope.opened)
        .map(|(id, _)| id.clone())?;
    pages.remove(&oldest)
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pages: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Register a page owning `object_url` and return its id.
    ///
    /// On error the guard is dropped here, so the blob never outlives a
    /// page that failed to register.
    pub fn open(&self, object_url: ObjectUrl) -> Result<String, BlobError> {
        let id = random_token();
        let scope = PageScope {
            opened: Utc::now(),
            object_url,
        };
        let mut evicted = Vec::new();
        match self.pages.lock() {
            Ok(mut pages) => {
                while pages.len() >= self.capacity {
                    match take_oldest(&mut pages) {
                        Some(old) => evicted.push(old),
                        None => break,
                    }
                }
                pages.insert(id.clone(), scope);
            }
            Err(_) => {
                warn!("page registry lock poisoned, releasing blob");
                drop(scope);
                return Err(BlobError::Poisoned);
            }
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "released oldest viewer pages to make room");
        }
        drop(evicted);
        Ok(id)
    }

    /// Tear down a page. Returns whether the page was still open.
    pub fn release(&self, id: &str) -> bool {
        // Take the scope out first so the guard is dropped without the
        // registry lock held.
        let scope = self.pages.lock().ok().and_then(|mut pages| pages.remove(id));
        match scope {
            Some(scope) => {
                debug!(page = %id, "released page");
                drop(scope);
                true
            }
            None => false,
        }
    }

    /// Release the page opened first. Returns whether there was one.
    pub fn release_oldest(&self) -> bool {
        let scope = self.pages.lock().ok().and_then(|mut pages| take_oldest(&mut pages));
        scope.is_some()
    }

    /// Release every page opened longer than `ttl` ago. Returns how many were released.
    pub fn purge_older_than(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let expired: Vec<PageScope> = match self.pages.lock() {
            Ok(mut pages) => {
                let ids: Vec<String> = pages
                    .iter()
                    .filter(|(_, scope)| scope.opened <= cutoff)
                    .map(|(id, _)| id.clone())
                    .collect();
                ids.iter().filter_map(|id| pages.remove(id)).collect()
            }
            Err(_) => Vec::new(),
        };
        let count = expired.len();
        drop(expired);
        if count > 0 {
            info!(count, "released expired viewer pages");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pages.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(store: &BlobStore, size: usize) -> ObjectUrl {
        store
            .create(vec![b'x'; size], "application/pdf", "a.pdf")
            .unwrap()
    }

    #[test]
    fn test_drop_revokes_blob() {
        let store = BlobStore::new();
        let url = pdf(&store, 4);
        let token = url.token().to_string();
        assert!(store.get(&token).is_some());
        assert_eq!(url.href(), format!("/blob/{}", token));
        assert_eq!(store.total_bytes(), 4);

        drop(url);
        assert!(store.get(&token).is_none());
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
    }

    #[test]
    fn test_tokens_are_distinct() {
        let store = BlobStore::new();
        let a = pdf(&store, 0);
        let b = pdf(&store, 0);
        assert_ne!(a.token(), b.token());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_refuses_past_capacity() {
        let store = BlobStore::with_capacity(10);
        let first = pdf(&store, 6);
        assert!(store.fits(4));
        assert!(!store.fits(5));

        let err = store
            .create(vec![0; 5], "application/pdf", "b.pdf")
            .unwrap_err();
        assert_eq!(err, BlobError::Full { needed: 5, available: 4 });
        assert_eq!(store.len(), 1);

        drop(first);
        assert!(store.create(vec![0; 10], "application/pdf", "b.pdf").is_ok());
    }

    #[test]
    fn test_poisoned_store_refuses_blob() {
        let store = BlobStore::new();
        let table = store.table.clone();
        let _ = std::thread::spawn(move || {
            let _guard = table.lock().unwrap();
            panic!("poison the blob table");
        })
        .join();

        let err = store
            .create(b"x".to_vec(), "application/pdf", "a.pdf")
            .unwrap_err();
        assert_eq!(err, BlobError::Poisoned);
    }

    #[test]
    fn test_release_page_revokes_once() {
        let store = BlobStore::new();
        let pages = PageRegistry::new();
        let url = pdf(&store, 5);
        let token = url.token().to_string();
        let id = pages.open(url).unwrap();

        assert!(store.get(&token).is_some());
        assert!(pages.release(&id));
        assert!(store.get(&token).is_none());
        assert!(!pages.release(&id));
        assert!(pages.is_empty());
    }

    #[test]
    fn test_page_capacity_releases_oldest() {
        let store = BlobStore::new();
        let pages = PageRegistry::with_capacity(2);
        let first = pdf(&store, 1);
        let first_token = first.token().to_string();
        let first_id = pages.open(first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        pages.open(pdf(&store, 1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        pages.open(pdf(&store, 1)).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.get(&first_token).is_none());
        assert!(!pages.release(&first_id));
    }

    #[test]
    fn test_release_oldest() {
        let store = BlobStore::new();
        let pages = PageRegistry::new();
        assert!(!pages.release_oldest());
        pages.open(pdf(&store, 3)).unwrap();
        assert!(pages.release_oldest());
        assert!(pages.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_poisoned_registry_releases_blob() {
        let store = BlobStore::new();
        let pages = PageRegistry::new();
        let inner = pages.pages.clone();
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock().unwrap();
            panic!("poison the page registry");
        })
        .join();

        let url = pdf(&store, 3);
        assert_eq!(pages.open(url), Err(BlobError::Poisoned));
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_expired_pages() {
        let store = BlobStore::new();
        let pages = PageRegistry::new();
        pages.open(pdf(&store, 1)).unwrap();

        assert_eq!(pages.purge_older_than(Duration::hours(1)), 0);
        assert_eq!(pages.len(), 1);

        assert_eq!(pages.purge_older_than(Duration::zero()), 1);
        assert!(pages.is_empty());
        assert!(store.is_empty());
    }
}
