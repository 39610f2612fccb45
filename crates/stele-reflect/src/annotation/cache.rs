//! Annotation cache
//!
//! Process-wide memoization of annotation lookups keyed by
//! (declaration target, annotation name). Each key holds either a resolved
//! [`Annotation`] or an explicit absence marker, so a lookup that already
//! failed once never triggers a re-parse.
//!
//! The cache can be wired to a byte store ([`CacheStore`]) so state survives
//! process restarts: it hydrates lazily on first access and flushes the full
//! map on [`AnnotationCache::flush`], [`AnnotationCache::stop`] being the
//! explicit reset for test isolation. A store that does not exist yet (or
//! cannot be decoded) hydrates as empty — the same miss-on-error behavior an
//! unreadable cache file gets elsewhere in a cache.

use std::fs;
use std::io;
use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Annotation;

/// Failure while flushing cache state through the configured store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be written
    #[error("cache store I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The cache state could not be encoded
    #[error("cache state could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Byte source/sink pair used to persist cache state.
pub trait CacheStore: Send {
    /// Previously persisted bytes, or `None` when nothing was written yet.
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the persisted state.
    fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

/// File-backed [`CacheStore`]. A missing file reads as `None`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store persisting to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path this store reads from and writes to.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        fs::write(&self.path, bytes)
    }
}

/// One cached lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheEntry {
    /// The annotation exists and was resolved to this value
    Present(Annotation),
    /// The annotation was looked up before and does not exist
    Absent,
}

/// Cache lookup statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a resolved entry
    pub hits: usize,
    /// Lookups answered from an absence marker
    pub negative_hits: usize,
    /// Lookups with no entry at all
    pub misses: usize,
}

type EntryMap = FxHashMap<String, FxHashMap<String, CacheEntry>>;

/// Memoized store of annotation lookups keyed by (target, annotation name).
pub struct AnnotationCache {
    entries: EntryMap,
    store: Option<Box<dyn CacheStore>>,
    hydrated: bool,
    dirty: bool,
    stats: CacheStats,
}

impl Default for AnnotationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationCache {
    /// Create an empty cache with no persistence.
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            store: None,
            hydrated: false,
            dirty: false,
            stats: CacheStats::default(),
        }
    }

    /// Persist cache state in the given file.
    ///
    /// Shorthand for [`persist_with`](Self::persist_with) and a [`FileStore`].
    pub fn persist_in_file(&mut self, path: impl Into<PathBuf>) {
        self.persist_with(FileStore::new(path));
    }

    /// Configure the byte store used to hydrate and flush cache state.
    ///
    /// Hydration happens lazily on the next access; a store with nothing
    /// persisted yet yields an empty cache.
    pub fn persist_with(&mut self, store: impl CacheStore + 'static) {
        self.store = Some(Box::new(store));
        self.hydrated = false;
    }

    fn ensure_hydrated(&mut self) {
        if self.hydrated {
            return;
        }
        self.hydrated = true;

        let Some(store) = &self.store else { return };
        let Some(bytes) = store.read().ok().flatten() else {
            return;
        };
        if let Ok(persisted) = serde_json::from_slice::<EntryMap>(&bytes) {
            // persisted state seeds the map; in-memory entries added before
            // hydration win on key collisions
            for (target, annotations) in persisted {
                let slot = self.entries.entry(target).or_default();
                for (name, entry) in annotations {
                    slot.entry(name).or_insert(entry);
                }
            }
        }
    }

    /// Whether a resolved (non-absent) entry exists for the key.
    pub fn has(&mut self, target: &str, name: &str) -> bool {
        self.ensure_hydrated();
        match self.entry(target, name) {
            Some(CacheEntry::Present(_)) => {
                self.stats.hits += 1;
                true
            }
            Some(CacheEntry::Absent) => {
                self.stats.negative_hits += 1;
                false
            }
            None => {
                self.stats.misses += 1;
                false
            }
        }
    }

    /// Whether an explicit absence marker exists for the key.
    pub fn has_not(&mut self, target: &str, name: &str) -> bool {
        self.ensure_hydrated();
        matches!(self.entry(target, name), Some(CacheEntry::Absent))
    }

    /// The cached annotation, or `None` when the key holds no resolved entry.
    pub fn get(&mut self, target: &str, name: &str) -> Option<&Annotation> {
        self.ensure_hydrated();
        match self.entries.get(target)?.get(name)? {
            CacheEntry::Present(annotation) => Some(annotation),
            CacheEntry::Absent => None,
        }
    }

    /// Store a resolved annotation, or an absence marker when `annotation`
    /// is `None`.
    pub fn put(&mut self, target: &str, name: &str, annotation: Option<Annotation>) {
        self.ensure_hydrated();
        let entry = match annotation {
            Some(a) => CacheEntry::Present(a),
            None => CacheEntry::Absent,
        };
        self.entries
            .entry(target.to_string())
            .or_default()
            .insert(name.to_string(), entry);
        self.dirty = true;
    }

    /// Write the full cache state through the configured store.
    ///
    /// A no-op without a store.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(&self.entries)?;
        store.write(&bytes)?;
        self.dirty = false;
        Ok(())
    }

    /// Clear all in-memory state and detach the store.
    ///
    /// The cache is process-wide state; tests call this for isolation.
    pub fn stop(&mut self) {
        self.entries.clear();
        self.store = None;
        self.hydrated = true;
        self.dirty = false;
        self.stats = CacheStats::default();
    }

    /// Lookup statistics for this cache.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached entries, absence markers included.
    pub fn len(&self) -> usize {
        self.entries.values().map(|m| m.len()).sum()
    }

    /// Whether no entry is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, target: &str, name: &str) -> Option<&CacheEntry> {
        self.entries.get(target)?.get(name)
    }
}

impl Drop for AnnotationCache {
    fn drop(&mut self) {
        if self.dirty && self.store.is_some() {
            let _ = self.flush();
        }
    }
}
