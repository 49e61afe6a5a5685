use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::config::BrowserConfig;
use crate::entry::FileEntry;
use crate::fs::{DirSignature, FileSystem};
use crate::scanner::{DirectoryScanner, ScanError, ScanOutcome};

/// A directory's entries as served by the cache.
///
/// Cloning shares the entry slice; a rescan publishes a new slice instead of
/// mutating this one.
#[derive(Clone, Debug)]
pub struct DirectoryListing {
    /// Directory that was scanned (canonical when possible).
    pub dir: PathBuf,
    /// Sorted entries, parent link first.
    pub entries: Arc<[FileEntry]>,
    /// Set when the listing is degraded to the parent placeholder.
    pub error: Option<Arc<ScanError>>,
}

impl DirectoryListing {
    /// Wraps a scan outcome.
    pub fn from_outcome(dir: PathBuf, outcome: ScanOutcome) -> Self {
        Self {
            dir,
            entries: outcome.entries.into(),
            error: outcome.error.map(Arc::new),
        }
    }

    /// Whether the scan that produced this listing failed.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from a valid entry.
    pub hits: u64,
    /// Requests that found no entry or a stale one.
    pub misses: u64,
    /// Listings stored after a scan.
    pub scans: u64,
}

#[derive(Debug)]
struct CachedDirectory {
    /// `None` when the signature could not be read.
    signature: Option<DirSignature>,
    listing: DirectoryListing,
}

/// Per-directory scan results, valid while the directory signature holds.
///
/// Entries are kept in recency order; with a bound set, the least recently
/// used directory is evicted first.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    dirs: IndexMap<PathBuf, CachedDirectory>,
    max_directories: Option<usize>,
    stats: CacheStats,
}

impl DirectoryCache {
    /// Creates an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache honoring the config's directory bound.
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new().with_max_directories(config.max_cached_directories)
    }

    /// Bounds the number of cached directories (at least one).
    pub fn with_max_directories(mut self, bound: Option<usize>) -> Self {
        self.max_directories = bound.map(|b| b.max(1));
        self.evict_overflow();
        self
    }

    /// Returns the cached listing of `dir` if its signature is unchanged,
    /// otherwise scans, stores and returns the fresh listing.
    ///
    /// Never fails: unreadable directories produce a degraded listing which
    /// is cached like any other.
    pub fn get_or_scan(&mut self, dir: &Path, scanner: &DirectoryScanner) -> DirectoryListing {
        let fs = scanner.file_system();
        let (scan_dir, key) = resolve_dir(fs, dir);
        let signature = fs.signature(&scan_dir).ok();

        if let Some(listing) = self.lookup_valid(&key, signature) {
            return listing;
        }

        let outcome = scanner.scan_or_degraded(&scan_dir);
        self.store(key, signature, DirectoryListing::from_outcome(scan_dir, outcome))
    }

    /// Returns the cached listing for an already normalized key when
    /// `signature` still matches, counting a hit or a miss.
    pub fn lookup_valid(
        &mut self,
        key: &Path,
        signature: Option<DirSignature>,
    ) -> Option<DirectoryListing> {
        let Some(index) = self.dirs.get_index_of(key) else {
            self.stats.misses += 1;
            trace_cache_miss(key, "absent");
            return None;
        };
        if self.dirs[index].signature != signature {
            self.stats.misses += 1;
            trace_cache_miss(key, "stale");
            return None;
        }
        self.stats.hits += 1;
        let last = self.dirs.len() - 1;
        self.dirs.move_index(index, last);
        trace_cache_hit(key);
        Some(self.dirs[last].listing.clone())
    }

    /// Stores a freshly scanned listing under a normalized key, replacing any
    /// previous one.
    pub fn store(
        &mut self,
        key: PathBuf,
        signature: Option<DirSignature>,
        listing: DirectoryListing,
    ) -> DirectoryListing {
        self.stats.scans += 1;
        self.dirs.shift_remove(&key);
        self.dirs.insert(
            key,
            CachedDirectory {
                signature,
                listing: listing.clone(),
            },
        );
        self.evict_overflow();
        listing
    }

    /// Forces the next request for `dir` to rescan. Returns whether an entry
    /// was dropped.
    pub fn invalidate(&mut self, dir: &Path, scanner: &DirectoryScanner) -> bool {
        let key = normalize_dir_key(scanner.file_system(), dir);
        self.invalidate_key(&key)
    }

    /// [`invalidate`](Self::invalidate) for an already normalized key.
    pub fn invalidate_key(&mut self, key: &Path) -> bool {
        self.dirs.shift_remove(key).is_some()
    }

    /// Drops every cached directory.
    pub fn invalidate_all(&mut self) {
        self.dirs.clear();
    }

    /// Whether `dir` has a cached listing (valid or not).
    pub fn contains(&self, dir: &Path, scanner: &DirectoryScanner) -> bool {
        self.dirs
            .contains_key(&normalize_dir_key(scanner.file_system(), dir))
    }

    /// Number of cached directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Counters since creation.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn evict_overflow(&mut self) {
        let Some(bound) = self.max_directories else {
            return;
        };
        while self.dirs.len() > bound {
            if let Some((key, _)) = self.dirs.shift_remove_index(0) {
                trace_cache_evicted(&key);
            }
        }
    }
}

/// Cache key of `dir`: canonical when the file system can resolve it,
/// otherwise lexically cleaned, and case-folded on case-insensitive
/// platforms.
pub fn normalize_dir_key(fs: &dyn FileSystem, dir: &Path) -> PathBuf {
    resolve_dir(fs, dir).1
}

/// Returns `(path to scan, cache key)` for `dir`.
pub(crate) fn resolve_dir(fs: &dyn FileSystem, dir: &Path) -> (PathBuf, PathBuf) {
    let scan_dir = fs.canonicalize(dir).unwrap_or_else(|_| {
        // Missing relative paths still need a parent for the degraded view.
        let absolute = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        lexical_normalize(&absolute)
    });
    let key = fold_case(&scan_dir);
    (scan_dir, key)
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            _ => out.push(component),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
fn fold_case(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_ascii_lowercase())
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn fold_case(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(feature = "tracing")]
fn trace_cache_hit(key: &Path) {
    trace!(event = "cache.hit", dir = %key.display(), "cache hit");
}

#[cfg(not(feature = "tracing"))]
fn trace_cache_hit(_key: &Path) {}

#[cfg(feature = "tracing")]
fn trace_cache_miss(key: &Path, reason: &'static str) {
    trace!(event = "cache.miss", dir = %key.display(), reason, "cache miss");
}

#[cfg(not(feature = "tracing"))]
fn trace_cache_miss(_key: &Path, _reason: &'static str) {}

#[cfg(feature = "tracing")]
fn trace_cache_evicted(key: &Path) {
    trace!(event = "cache.evicted", dir = %key.display(), "directory evicted");
}

#[cfg(not(feature = "tracing"))]
fn trace_cache_evicted(_key: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FormatDescriptor, FormatTable};
    use crate::entry::{ExtendedMetadata, FormatFamily};
    use crate::fs::test_fs::TestFs;
    use crate::probe::{ProbeError, ProbeTable};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scanner_with(fs: Arc<TestFs>, probe_calls: Arc<AtomicUsize>) -> DirectoryScanner {
        let formats = FormatTable::new().with(
            FormatDescriptor::new("its", FormatFamily::Sample)
                .extensions(["its"])
                .signature(0, *b"IMPS"),
        );
        let mut probers = ProbeTable::new();
        probers.register("its", move |_: &Path| -> Result<ExtendedMetadata, ProbeError> {
            probe_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExtendedMetadata::default())
        });
        DirectoryScanner::from_shared(fs, formats, probers)
    }

    fn setup() -> (Arc<TestFs>, Arc<AtomicUsize>, DirectoryScanner) {
        let fs = Arc::new(TestFs::default());
        fs.add_file("/lib", "a.its", b"IMPS");
        fs.add_file("/lib", "b.its", b"IMPS");
        let calls = Arc::new(AtomicUsize::new(0));
        let scanner = scanner_with(fs.clone(), calls.clone());
        (fs, calls, scanner)
    }

    #[test]
    fn unchanged_directory_is_served_from_cache() {
        let (fs, calls, scanner) = setup();
        let mut cache = DirectoryCache::new();

        let first = cache.get_or_scan(Path::new("/lib"), &scanner);
        let second = cache.get_or_scan(Path::new("/lib"), &scanner);

        assert!(Arc::ptr_eq(&first.entries, &second.entries));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(fs.read_dir_count(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                scans: 1
            }
        );
    }

    #[test]
    fn child_count_change_triggers_rescan() {
        let (fs, calls, scanner) = setup();
        let mut cache = DirectoryCache::new();
        cache.get_or_scan(Path::new("/lib"), &scanner);

        fs.add_file("/lib", "c.its", b"IMPS");
        let listing = cache.get_or_scan(Path::new("/lib"), &scanner);

        assert_eq!(listing.entries.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn mtime_change_triggers_rescan() {
        let (fs, _calls, scanner) = setup();
        let mut cache = DirectoryCache::new();
        cache.get_or_scan(Path::new("/lib"), &scanner);
        fs.touch("/lib", 100);
        cache.get_or_scan(Path::new("/lib"), &scanner);
        assert_eq!(fs.read_dir_count(), 2);
    }

    #[test]
    fn invalidate_forces_rescan() {
        let (fs, _calls, scanner) = setup();
        let mut cache = DirectoryCache::new();
        cache.get_or_scan(Path::new("/lib"), &scanner);
        assert!(cache.invalidate(Path::new("/lib/"), &scanner));
        assert!(!cache.contains(Path::new("/lib"), &scanner));
        cache.get_or_scan(Path::new("/lib"), &scanner);
        assert_eq!(fs.read_dir_count(), 2);
    }

    #[test]
    fn degraded_listing_recovers_once_signature_is_readable() {
        let (fs, _calls, scanner) = setup();
        fs.set_error("/lib", std::io::ErrorKind::PermissionDenied);
        let mut cache = DirectoryCache::new();

        let listing = cache.get_or_scan(Path::new("/lib"), &scanner);
        assert!(listing.is_degraded());
        assert_eq!(listing.entries.len(), 1);
        assert!(listing.entries[0].is_parent_link());

        fs.clear_error("/lib");
        let again = cache.get_or_scan(Path::new("/lib"), &scanner);
        // Signature went from unreadable to readable, so this rescans.
        assert!(!again.is_degraded());
        assert_eq!(again.entries.len(), 3);
    }

    #[test]
    fn unreadable_signature_is_a_stable_key() {
        let (fs, _calls, scanner) = setup();
        fs.set_error("/lib", std::io::ErrorKind::PermissionDenied);
        let mut cache = DirectoryCache::new();
        cache.get_or_scan(Path::new("/lib"), &scanner);
        cache.get_or_scan(Path::new("/lib"), &scanner);
        assert_eq!(fs.read_dir_count(), 1);
    }

    #[test]
    fn lru_bound_evicts_least_recent() {
        let (fs, _calls, scanner) = setup();
        fs.add_dir("/a");
        fs.add_dir("/b");
        let mut cache = DirectoryCache::new().with_max_directories(Some(2));

        cache.get_or_scan(Path::new("/lib"), &scanner);
        cache.get_or_scan(Path::new("/a"), &scanner);
        cache.get_or_scan(Path::new("/lib"), &scanner);
        cache.get_or_scan(Path::new("/b"), &scanner);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(Path::new("/lib"), &scanner));
        assert!(!cache.contains(Path::new("/a"), &scanner));
        assert!(cache.contains(Path::new("/b"), &scanner));
    }

    #[test]
    fn invalidate_all_empties_cache() {
        let (_fs, _calls, scanner) = setup();
        let mut cache = DirectoryCache::new();
        cache.get_or_scan(Path::new("/lib"), &scanner);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn lexical_cleanup_folds_dots() {
        assert_eq!(
            lexical_normalize(Path::new("/music/./drums/../kits/")),
            PathBuf::from("/music/kits")
        );
        assert_eq!(lexical_normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(lexical_normalize(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(lexical_normalize(Path::new("./")), PathBuf::from("."));
    }
}
