//! Time-bounded memoization of filesystem probes.
//!
//! Every probe the pipeline issues goes through this wrapper. Entries
//! expire after a configurable wall-clock TTL; until then repeated probes
//! of the same path return identical results without touching the
//! underlying filesystem, and failures are cached exactly like successes.
//! Concurrent identical probes collapse into a single underlying call.
//!
//! The TTL is intentionally loose: the resolver never observes filesystem
//! changes on its own. Callers that need strict invalidation call
//! [`CachedFileSystem::purge`] or [`CachedFileSystem::purge_all`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::debug;

use crate::fs::{FileStat, FileSystem, FsError};

/// Default probe expiry, matching the cache horizon build tools expect
/// between watcher events.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(4);

/// One memoized probe. The `OnceLock` is what collapses concurrent
/// probes: every caller holds the same cell and only the first populates
/// it, the rest block until it is filled.
struct CacheCell<T> {
    created: Instant,
    slot: OnceLock<Result<T, FsError>>,
}

struct CacheMap<T> {
    entries: RwLock<FxHashMap<PathBuf, Arc<CacheCell<T>>>>,
}

impl<T: Clone> CacheMap<T> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    fn cell(&self, path: &Path, ttl: Duration) -> Arc<CacheCell<T>> {
        if let Some(cell) = self
            .entries
            .read()
            .expect("cache lock poisoned")
            .get(path)
        {
            if cell.created.elapsed() < ttl {
                return Arc::clone(cell);
            }
        }
        let mut entries = self.entries.write().expect("cache lock poisoned");
        // Re-check: another thread may have replaced the entry while we
        // waited for the write lock.
        if let Some(cell) = entries.get(path) {
            if cell.created.elapsed() < ttl {
                return Arc::clone(cell);
            }
        }
        let cell = Arc::new(CacheCell {
            created: Instant::now(),
            slot: OnceLock::new(),
        });
        entries.insert(path.to_path_buf(), Arc::clone(&cell));
        cell
    }

    fn get_or_probe(
        &self,
        path: &Path,
        ttl: Duration,
        probe: impl FnOnce() -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        let cell = self.cell(path, ttl);
        cell.slot.get_or_init(probe).clone()
    }

    fn purge_all(&self) {
        self.entries.write().expect("cache lock poisoned").clear();
    }

    /// Drop entries for `path` and every ancestor of it.
    fn purge(&self, path: &Path) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .retain(|key, _| !path.starts_with(key));
    }

    fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }
}

/// Caching wrapper around a [`FileSystem`].
///
/// Shared by every resolve call of a resolver; safe for concurrent use.
pub struct CachedFileSystem {
    inner: Arc<dyn FileSystem>,
    ttl: Duration,
    stats: CacheMap<FileStat>,
    links: CacheMap<PathBuf>,
    dirs: CacheMap<Arc<Vec<String>>>,
    descriptors: CacheMap<Arc<Value>>,
}

impl std::fmt::Debug for CachedFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFileSystem")
            .field("ttl", &self.ttl)
            .field("stats", &self.stats.len())
            .field("links", &self.links.len())
            .field("dirs", &self.dirs.len())
            .field("descriptors", &self.descriptors.len())
            .finish_non_exhaustive()
    }
}

impl CachedFileSystem {
    #[must_use]
    pub fn new(inner: Arc<dyn FileSystem>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            stats: CacheMap::new(),
            links: CacheMap::new(),
            dirs: CacheMap::new(),
            descriptors: CacheMap::new(),
        }
    }

    /// Memoized stat.
    pub fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let inner = &self.inner;
        self.stats
            .get_or_probe(path, self.ttl, || inner.metadata(path))
    }

    /// Memoized readlink.
    pub fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        let inner = &self.inner;
        self.links
            .get_or_probe(path, self.ttl, || inner.read_link(path))
    }

    /// Memoized readdir.
    pub fn read_dir(&self, path: &Path) -> Result<Arc<Vec<String>>, FsError> {
        let inner = &self.inner;
        self.dirs
            .get_or_probe(path, self.ttl, || inner.read_dir(path).map(Arc::new))
    }

    /// Memoized descriptor read: file bytes parsed as JSON. Parse
    /// failures are negative-cached like any other probe error.
    pub fn read_json(&self, path: &Path) -> Result<Arc<Value>, FsError> {
        let inner = &self.inner;
        self.descriptors.get_or_probe(path, self.ttl, || {
            let bytes = inner.read_file(path)?;
            serde_json::from_slice(&bytes)
                .map(Arc::new)
                .map_err(|e| FsError::Json(e.to_string().into()))
        })
    }

    /// Uncached raw read; the resolver only uses the JSON entry point,
    /// this exists for embedders holding a `CachedFileSystem`.
    pub fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.inner.read_file(path)
    }

    /// Invalidate the given paths and their ancestors. An ancestor's
    /// cached stat, listing or descriptor may embed the changed entry, so
    /// it goes too.
    pub fn purge<P: AsRef<Path>>(&self, paths: impl IntoIterator<Item = P>) {
        for path in paths {
            let path = path.as_ref();
            debug!(path = %path.display(), "purging filesystem cache entries");
            self.stats.purge(path);
            self.links.purge(path);
            self.dirs.purge(path);
            self.descriptors.purge(path);
        }
    }

    /// Invalidate everything.
    pub fn purge_all(&self) {
        debug!("purging all filesystem cache entries");
        self.stats.purge_all();
        self.links.purge_all();
        self.dirs.purge_all();
        self.descriptors.purge_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Wrapper that counts how often each probe reaches the real
    /// filesystem.
    #[derive(Debug, Default)]
    struct CountingFs {
        inner: crate::fs::StdFileSystem,
        stats: AtomicUsize,
        reads: AtomicUsize,
    }

    impl FileSystem for CountingFs {
        fn metadata(&self, path: &Path) -> Result<FileStat, FsError> {
            self.stats.fetch_add(1, Ordering::SeqCst);
            self.inner.metadata(path)
        }
        fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
            self.inner.read_dir(path)
        }
        fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
            self.inner.read_link(path)
        }
        fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read_file(path)
        }
    }

    #[test]
    fn repeated_stats_hit_cache() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "x").unwrap();

        let counting = Arc::new(CountingFs::default());
        let cached = CachedFileSystem::new(counting.clone(), Duration::from_secs(60));

        assert!(cached.stat(&file).unwrap().is_file);
        assert!(cached.stat(&file).unwrap().is_file);
        assert!(cached.stat(&file).unwrap().is_file);
        assert_eq!(counting.stats.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_negative_cached() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        let counting = Arc::new(CountingFs::default());
        let cached = CachedFileSystem::new(counting.clone(), Duration::from_secs(60));

        assert_eq!(cached.stat(&missing).unwrap_err(), FsError::NotFound);
        assert_eq!(cached.stat(&missing).unwrap_err(), FsError::NotFound);
        assert_eq!(counting.stats.load(Ordering::SeqCst), 1);

        // A negative entry survives the file appearing, until purge/TTL.
        fs::write(&missing, "x").unwrap();
        assert_eq!(cached.stat(&missing).unwrap_err(), FsError::NotFound);
    }

    #[test]
    fn ttl_expiry_reprobes() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "x").unwrap();

        let counting = Arc::new(CountingFs::default());
        let cached = CachedFileSystem::new(counting.clone(), Duration::from_millis(20));

        assert!(cached.stat(&file).unwrap().is_file);
        std::thread::sleep(Duration::from_millis(40));
        assert!(cached.stat(&file).unwrap().is_file);
        assert_eq!(counting.stats.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn purge_invalidates_path_and_ancestors() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let file = sub.join("a.js");
        fs::write(&file, "x").unwrap();
        let sibling = dir.path().join("b.js");
        fs::write(&sibling, "x").unwrap();

        let counting = Arc::new(CountingFs::default());
        let cached = CachedFileSystem::new(counting.clone(), Duration::from_secs(60));

        cached.stat(&file).unwrap();
        cached.stat(&sub).unwrap();
        cached.stat(&sibling).unwrap();
        assert_eq!(counting.stats.load(Ordering::SeqCst), 3);

        cached.purge([&file]);

        // file and its ancestor re-probe, the sibling stays cached
        cached.stat(&file).unwrap();
        cached.stat(&sub).unwrap();
        cached.stat(&sibling).unwrap();
        assert_eq!(counting.stats.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn read_json_parses_and_caches() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("package.json");
        fs::write(&pkg, r#"{"name":"x","main":"a.js"}"#).unwrap();

        let counting = Arc::new(CountingFs::default());
        let cached = CachedFileSystem::new(counting.clone(), Duration::from_secs(60));

        let v1 = cached.read_json(&pkg).unwrap();
        let v2 = cached.read_json(&pkg).unwrap();
        assert_eq!(v1["main"], "a.js");
        assert!(Arc::ptr_eq(&v1, &v2));
        assert_eq!(counting.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_json_is_cached_error() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("package.json");
        fs::write(&pkg, "{ nope").unwrap();

        let counting = Arc::new(CountingFs::default());
        let cached = CachedFileSystem::new(counting.clone(), Duration::from_secs(60));

        assert!(matches!(
            cached.read_json(&pkg).unwrap_err(),
            FsError::Json(_)
        ));
        assert!(matches!(
            cached.read_json(&pkg).unwrap_err(),
            FsError::Json(_)
        ));
        assert_eq!(counting.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn purge_all_then_identical_result() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "x").unwrap();

        let cached = CachedFileSystem::new(Arc::new(CountingFs::default()), DEFAULT_CACHE_TTL);
        let before = cached.stat(&file).unwrap();
        cached.purge_all();
        let after = cached.stat(&file).unwrap();
        assert_eq!(before, after);
    }
}
