use std::path::Path;

use crate::entry::{EntryType, FormatFamily};

/// A magic byte sequence expected at a fixed offset of a file header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// Byte offset from the start of the file.
    pub offset: usize,
    /// Expected bytes.
    pub magic: Vec<u8>,
}

impl Signature {
    /// Creates a signature.
    pub fn new(offset: usize, magic: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            magic: magic.into(),
        }
    }

    /// Number of header bytes needed to check this signature.
    pub fn end(&self) -> usize {
        self.offset + self.magic.len()
    }

    fn matches(&self, header: &[u8]) -> bool {
        header
            .get(self.offset..self.end())
            .is_some_and(|bytes| bytes == self.magic.as_slice())
    }
}

/// Description of one recognized file format.
///
/// A format matches a file when all of its signatures match the header. A
/// format without signatures matches on extension alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Stable identifier (also the key into the probe table).
    pub id: String,
    /// Family the format belongs to.
    pub family: FormatFamily,
    /// Lower-case extensions without dot.
    pub extensions: Vec<String>,
    /// Header signatures; all must match.
    pub signatures: Vec<Signature>,
}

impl FormatDescriptor {
    /// Creates a descriptor with no signatures.
    pub fn new(id: impl Into<String>, family: FormatFamily) -> Self {
        Self {
            id: id.into(),
            family,
            extensions: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Adds extensions (case-insensitive, leading dots are stripped).
    pub fn extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions.extend(
            exts.into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase()),
        );
        self
    }

    /// Adds a header signature.
    pub fn signature(mut self, offset: usize, magic: impl Into<Vec<u8>>) -> Self {
        self.signatures.push(Signature::new(offset, magic));
        self
    }

    fn has_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }

    fn matches_header(&self, header: &[u8]) -> bool {
        self.signatures.iter().all(|s| s.matches(header))
    }
}

/// Result of classifying one entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Type tag.
    pub entry_type: EntryType,
    /// Matched (or extension-implied) format id.
    pub format: Option<String>,
}

impl Classification {
    fn untyped(entry_type: EntryType) -> Self {
        Self {
            entry_type,
            format: None,
        }
    }
}

/// Ordered table of known formats, supplied by format collaborators.
///
/// Formats are tried in insertion order; the first match wins.
#[derive(Clone, Debug, Default)]
pub struct FormatTable {
    formats: Vec<FormatDescriptor>,
}

impl FormatTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a format.
    pub fn push(&mut self, format: FormatDescriptor) {
        self.formats.push(format);
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, format: FormatDescriptor) -> Self {
        self.push(format);
        self
    }

    /// Registered formats in match order.
    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    /// Looks up a format by id.
    pub fn get(&self, id: &str) -> Option<&FormatDescriptor> {
        self.formats.iter().find(|f| f.id == id)
    }

    /// Number of header bytes a scanner must read to evaluate every signature.
    pub fn sniff_len(&self) -> usize {
        self.formats
            .iter()
            .flat_map(|f| f.signatures.iter().map(Signature::end))
            .max()
            .unwrap_or(0)
    }

    /// Whether any format claims the extension of `name`.
    pub fn knows_extension(&self, name: &str) -> bool {
        let ext = extension_lower(name);
        !ext.is_empty() && self.formats.iter().any(|f| f.has_extension(&ext))
    }

    /// Classifies an entry from its name, kind and sniffed header bytes.
    ///
    /// Never fails: the worst case is [`EntryType::Unknown`].
    pub fn classify(&self, name: &str, is_dir: bool, header: &[u8]) -> Classification {
        if is_dir {
            return Classification::untyped(EntryType::Directory);
        }
        let ext = extension_lower(name);

        // Signatures decide first; content wins over a misleading extension.
        let by_signature = self
            .formats
            .iter()
            .find(|f| !f.signatures.is_empty() && f.matches_header(header));
        if let Some(f) = by_signature {
            return Classification {
                entry_type: EntryType::Extended(f.family),
                format: Some(f.id.clone()),
            };
        }

        if ext.is_empty() {
            return Classification::untyped(EntryType::Unknown);
        }

        let mut unchecked: Option<&FormatDescriptor> = None;
        for f in self.formats.iter().filter(|f| f.has_extension(&ext)) {
            if f.signatures.is_empty() {
                return Classification {
                    entry_type: EntryType::Extended(f.family),
                    format: Some(f.id.clone()),
                };
            }
            unchecked.get_or_insert(f);
        }
        match unchecked {
            Some(f) => Classification {
                entry_type: EntryType::Unchecked,
                format: Some(f.id.clone()),
            },
            None => Classification::untyped(EntryType::Unknown),
        }
    }
}

fn extension_lower(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}
