use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::entry::{ExtendedMetadata, FormatFamily};

/// Errors returned by metadata probers.
///
/// Probe errors are never fatal: the scanner logs them and lists the entry
/// without metadata.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// I/O error while reading the header.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The header is truncated or inconsistent.
    #[error("malformed header: {0}")]
    Malformed(String),
    /// The prober does not handle this variant of the format.
    #[error("unsupported format variant")]
    Unsupported,
}

/// Parses format-specific header metadata of one file.
pub trait MetadataProber: Send + Sync {
    /// Probe the file at `path`.
    fn probe(&self, path: &Path) -> Result<ExtendedMetadata, ProbeError>;
}

impl<F> MetadataProber for F
where
    F: Fn(&Path) -> Result<ExtendedMetadata, ProbeError> + Send + Sync,
{
    fn probe(&self, path: &Path) -> Result<ExtendedMetadata, ProbeError> {
        self(path)
    }
}

type SharedProber = Arc<dyn MetadataProber>;

/// Capability table mapping format ids (or whole families) to probers.
///
/// Lookups prefer an exact format id and fall back to the family prober.
#[derive(Clone, Default)]
pub struct ProbeTable {
    by_format: HashMap<String, SharedProber>,
    by_family: HashMap<FormatFamily, SharedProber>,
}

impl std::fmt::Debug for ProbeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut formats: Vec<&str> = self.by_format.keys().map(String::as_str).collect();
        formats.sort_unstable();
        f.debug_struct("ProbeTable")
            .field("formats", &formats)
            .field("families", &self.by_family.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProbeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prober for one format id, replacing any previous one.
    pub fn register<P>(&mut self, format: impl Into<String>, prober: P)
    where
        P: MetadataProber + 'static,
    {
        self.by_format.insert(format.into(), Arc::new(prober));
    }

    /// Registers a fallback prober for every format of a family.
    pub fn register_family<P>(&mut self, family: FormatFamily, prober: P)
    where
        P: MetadataProber + 'static,
    {
        self.by_family.insert(family, Arc::new(prober));
    }

    /// Resolves the prober for a format.
    pub fn prober_for(
        &self,
        format: Option<&str>,
        family: FormatFamily,
    ) -> Option<&dyn MetadataProber> {
        format
            .and_then(|id| self.by_format.get(id))
            .or_else(|| self.by_family.get(&family))
            .map(|p| p.as_ref())
    }

    /// Whether no prober is registered.
    pub fn is_empty(&self) -> bool {
        self.by_format.is_empty() && self.by_family.is_empty()
    }
}
