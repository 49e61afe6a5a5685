use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

use crate::classify::FormatTable;
use crate::config::DEFAULT_PROBE_SIZE_LIMIT;
use crate::entry::{EntryType, FileEntry};
use crate::fs::{FileSystem, FsEntry, StdFileSystem};
use crate::probe::{ProbeError, ProbeTable};

/// Directory-level scan failure.
///
/// Scan errors are non-fatal for the browser: the listing degrades to the
/// parent-directory placeholder.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The directory does not exist.
    #[error("directory not found: {}", path.display())]
    NotFound {
        /// Directory that was requested.
        path: PathBuf,
    },
    /// The directory cannot be read.
    #[error("permission denied: {}", path.display())]
    PermissionDenied {
        /// Directory that was requested.
        path: PathBuf,
    },
    /// Any other I/O failure.
    #[error("io error reading {}: {source}", path.display())]
    Io {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The scan was cancelled before completion.
    #[error("scan cancelled: {}", path.display())]
    Cancelled {
        /// Directory that was requested.
        path: PathBuf,
    },
}

impl ScanError {
    /// Maps an I/O error raised while listing `path`.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source: err },
        }
    }

    /// Directory the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path }
            | Self::PermissionDenied { path }
            | Self::Io { path, .. }
            | Self::Cancelled { path } => path,
        }
    }
}

/// Cooperative cancellation signal for a running scan.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unraised flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of [`DirectoryScanner::scan_or_degraded`].
#[derive(Debug)]
pub struct ScanOutcome {
    /// Entries to show; the parent placeholder alone when the scan failed.
    pub entries: Vec<FileEntry>,
    /// The failure, if the listing is degraded.
    pub error: Option<ScanError>,
}

/// Lists one directory, classifies its children and probes eligible files.
///
/// Cloning is cheap; clones share the file system, format table and probers.
#[derive(Clone)]
pub struct DirectoryScanner {
    fs: Arc<dyn FileSystem>,
    formats: Arc<FormatTable>,
    probers: ProbeTable,
    probe_size_limit: Option<u64>,
}

impl std::fmt::Debug for DirectoryScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryScanner")
            .field("formats", &self.formats.formats().len())
            .field("probers", &self.probers)
            .field("probe_size_limit", &self.probe_size_limit)
            .finish_non_exhaustive()
    }
}

impl DirectoryScanner {
    /// Creates a scanner over a custom file system.
    pub fn new<F>(fs: F, formats: FormatTable, probers: ProbeTable) -> Self
    where
        F: FileSystem + 'static,
    {
        Self::from_shared(Arc::new(fs), formats, probers)
    }

    /// Creates a scanner over an already shared file system.
    pub fn from_shared(fs: Arc<dyn FileSystem>, formats: FormatTable, probers: ProbeTable) -> Self {
        Self {
            fs,
            formats: Arc::new(formats),
            probers,
            probe_size_limit: Some(DEFAULT_PROBE_SIZE_LIMIT),
        }
    }

    /// Creates a scanner over the real file system.
    pub fn with_std_fs(formats: FormatTable, probers: ProbeTable) -> Self {
        Self::new(StdFileSystem, formats, probers)
    }

    /// Sets the probe ceiling; larger files are listed without metadata.
    pub fn probe_size_limit(mut self, limit: Option<u64>) -> Self {
        self.probe_size_limit = limit;
        self
    }

    /// The file system this scanner reads from.
    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// The format table used for classification.
    pub fn formats(&self) -> &FormatTable {
        &self.formats
    }

    /// Scans `dir`, returning the sorted entry list.
    pub fn scan(&self, dir: &Path) -> Result<Vec<FileEntry>, ScanError> {
        self.scan_inner(dir, None)
    }

    /// Like [`scan`](Self::scan), checking `cancel` between entries.
    ///
    /// A cancelled scan returns [`ScanError::Cancelled`] and no entries.
    pub fn scan_cancellable(
        &self,
        dir: &Path,
        cancel: &CancelFlag,
    ) -> Result<Vec<FileEntry>, ScanError> {
        self.scan_inner(dir, Some(cancel))
    }

    /// Scans `dir`, degrading to the parent placeholder on failure.
    pub fn scan_or_degraded(&self, dir: &Path) -> ScanOutcome {
        match self.scan(dir) {
            Ok(entries) => ScanOutcome {
                entries,
                error: None,
            },
            Err(err) => {
                warn_scan_failed(&err);
                ScanOutcome {
                    entries: degraded_listing(dir),
                    error: Some(err),
                }
            }
        }
    }

    fn scan_inner(
        &self,
        dir: &Path,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<FileEntry>, ScanError> {
        let started_at = std::time::Instant::now();
        trace_scan_started(dir);

        let raw = self
            .fs
            .read_dir(dir)
            .map_err(|err| ScanError::from_io(dir, err))?;

        let sniff_len = self.formats.sniff_len();
        let mut out = Vec::with_capacity(raw.len() + 1);
        if let Some(parent) = parent_of(dir) {
            out.push(FileEntry::parent_link(parent));
        }

        let mut probed = 0usize;
        for fs_entry in raw {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                trace_scan_cancelled(dir);
                return Err(ScanError::Cancelled {
                    path: dir.to_path_buf(),
                });
            }
            let Some(fs_entry) = sanitize_scanned_entry(fs_entry, dir) else {
                continue;
            };
            let entry = self.build_entry(fs_entry, sniff_len);
            if entry.extended_data_present() {
                probed += 1;
            }
            out.push(entry);
        }

        sort_entries(&mut out);
        trace_scan_completed(
            dir,
            out.len(),
            probed,
            started_at.elapsed().as_millis(),
        );
        Ok(out)
    }

    fn build_entry(&self, fs_entry: FsEntry, sniff_len: usize) -> FileEntry {
        let header = if fs_entry.is_dir || sniff_len == 0 {
            Vec::new()
        } else {
            self.fs
                .read_header(&fs_entry.path, sniff_len)
                .unwrap_or_default()
        };
        let class = self
            .formats
            .classify(&fs_entry.name, fs_entry.is_dir, &header);
        let size = fs_entry.size.unwrap_or(0);
        let entry = FileEntry::new(
            fs_entry.path,
            fs_entry.name,
            class.entry_type,
            class.format,
            size,
            fs_entry.modified,
        );

        let EntryType::Extended(family) = entry.entry_type() else {
            return entry;
        };
        if let Some(limit) = self.probe_size_limit {
            if size > limit {
                debug_probe_skipped(entry.path(), size, limit);
                return entry;
            }
        }
        let Some(prober) = self.probers.prober_for(entry.format(), family) else {
            return entry;
        };
        match prober.probe(entry.path()) {
            Ok(metadata) => entry.with_metadata(metadata),
            Err(err) => {
                debug_probe_failed(entry.path(), &err);
                entry
            }
        }
    }
}

/// The listing shown when `dir` cannot be read: the parent link alone, or
/// nothing at a filesystem root.
pub fn degraded_listing(dir: &Path) -> Vec<FileEntry> {
    parent_of(dir)
        .map(FileEntry::parent_link)
        .into_iter()
        .collect()
}

/// Sorts entries the way every picker shows them: the parent link first,
/// then case-insensitive by name with directories and files interleaved.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by_cached_key(|e| {
        (
            !e.is_parent_link(),
            e.base_name().to_lowercase(),
            e.base_name().to_string(),
        )
    });
}

fn parent_of(dir: &Path) -> Option<&Path> {
    dir.parent().filter(|p| !p.as_os_str().is_empty())
}

fn sanitize_scanned_entry(mut entry: FsEntry, dir: &Path) -> Option<FsEntry> {
    if entry.name.trim().is_empty() || entry.name == "." || entry.name == ".." {
        return None;
    }
    if entry.path.as_os_str().is_empty() {
        entry.path = dir.join(&entry.name);
    }
    if entry.is_dir {
        entry.size = None;
    }
    Some(entry)
}

#[cfg(feature = "tracing")]
fn trace_scan_started(dir: &Path) {
    trace!(event = "scan.started", dir = %dir.display(), "scan started");
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_started(_dir: &Path) {}

#[cfg(feature = "tracing")]
fn trace_scan_completed(dir: &Path, total_entries: usize, probed: usize, duration_ms: u128) {
    trace!(
        event = "scan.completed",
        dir = %dir.display(),
        total_entries,
        probed,
        duration_ms,
        "scan completed"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_completed(_dir: &Path, _total_entries: usize, _probed: usize, _duration_ms: u128) {}

#[cfg(feature = "tracing")]
fn trace_scan_cancelled(dir: &Path) {
    trace!(event = "scan.cancelled", dir = %dir.display(), "scan cancelled");
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_cancelled(_dir: &Path) {}

#[cfg(feature = "tracing")]
fn warn_scan_failed(err: &ScanError) {
    warn!(event = "scan.failed", dir = %err.path().display(), error = %err, "scan failed");
}

#[cfg(not(feature = "tracing"))]
fn warn_scan_failed(_err: &ScanError) {}

#[cfg(feature = "tracing")]
fn debug_probe_skipped(path: &Path, size: u64, limit: u64) {
    debug!(
        event = "probe.skipped",
        path = %path.display(),
        size,
        limit,
        "file above probe size limit"
    );
}

#[cfg(not(feature = "tracing"))]
fn debug_probe_skipped(_path: &Path, _size: u64, _limit: u64) {}

#[cfg(feature = "tracing")]
fn debug_probe_failed(path: &Path, err: &ProbeError) {
    debug!(event = "probe.failed", path = %path.display(), error = %err, "probe failed");
}

#[cfg(not(feature = "tracing"))]
fn debug_probe_failed(_path: &Path, _err: &ProbeError) {}
