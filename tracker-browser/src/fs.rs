use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Directory entry returned by [`FileSystem::read_dir`].
#[derive(Clone, Debug)]
pub struct FsEntry {
    /// Base name (no parent path)
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Whether this entry is a directory (symlinks are followed).
    pub is_dir: bool,
    /// File size in bytes (files only; `None` for directories or when unavailable).
    pub size: Option<u64>,
    /// Last modified timestamp (when available).
    pub modified: Option<SystemTime>,
}

/// Modification signature of a directory, used for cache validity.
///
/// Two signatures compare equal when both the last write time and the number
/// of immediate children match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirSignature {
    /// Last write time of the directory itself.
    pub modified: Option<SystemTime>,
    /// Number of immediate children at the time of the query.
    pub child_count: usize,
}

/// File system abstraction used by the scanner and the cache.
///
/// Implementations must be shareable across threads so background scans can
/// use the same instance as the UI thread.
pub trait FileSystem: Send + Sync {
    /// List entries of a directory (not recursive).
    fn read_dir(&self, dir: &Path) -> std::io::Result<Vec<FsEntry>>;
    /// Canonicalize a path (best-effort absolute normalization).
    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf>;
    /// Read the modification signature of a directory.
    fn signature(&self, dir: &Path) -> std::io::Result<DirSignature>;
    /// Read at most `max_len` bytes from the start of a file.
    fn read_header(&self, path: &Path, max_len: usize) -> std::io::Result<Vec<u8>>;
}

/// Default filesystem implementation using `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read_dir(&self, dir: &Path) -> std::io::Result<Vec<FsEntry>> {
        let mut out = Vec::new();
        let rd = std::fs::read_dir(dir)?;
        for e in rd {
            let e = match e {
                Ok(v) => v,
                Err(_) => continue,
            };
            let name = e.file_name().to_string_lossy().to_string();
            let path = e.path();
            // Follow symlinks so a link to a directory browses like one.
            let meta = std::fs::metadata(&path).or_else(|_| e.metadata()).ok();
            let is_dir = meta.as_ref().is_some_and(|m| m.is_dir());
            let modified = meta.as_ref().and_then(|m| m.modified().ok());
            let size = if is_dir {
                None
            } else {
                meta.as_ref().filter(|m| m.is_file()).map(|m| m.len())
            };
            out.push(FsEntry {
                name,
                path,
                is_dir,
                size,
                modified,
            });
        }
        Ok(out)
    }

    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn signature(&self, dir: &Path) -> std::io::Result<DirSignature> {
        let md = std::fs::metadata(dir)?;
        if !md.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                "not a directory",
            ));
        }
        let child_count = std::fs::read_dir(dir)?.count();
        Ok(DirSignature {
            modified: md.modified().ok(),
            child_count,
        })
    }

    fn read_header(&self, path: &Path, max_len: usize) -> std::io::Result<Vec<u8>> {
        let file = std::fs::File::open(path)?;
        let mut buf = Vec::with_capacity(max_len);
        file.take(max_len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}
