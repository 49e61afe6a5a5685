use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bitflags::bitflags;

/// Name shown for the synthetic parent-directory entry.
pub const PARENT_LINK_NAME: &str = "..";

/// Family of a recognized file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatFamily {
    /// Single sample (waveform) files.
    Sample,
    /// Song/module files.
    Module,
    /// Containers that can be browsed for instruments or samples.
    Library,
}

/// Classification tag of one directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// A directory (including the parent link).
    Directory,
    /// Extension belongs to a known format but no signature matched.
    Unchecked,
    /// Not recognized at all.
    Unknown,
    /// Recognized format whose header metadata can be probed.
    Extended(FormatFamily),
}

impl EntryType {
    /// Returns the format family when this is an extended type.
    pub fn family(self) -> Option<FormatFamily> {
        match self {
            Self::Extended(family) => Some(family),
            _ => None,
        }
    }

    /// Whether this tag belongs to an extended family.
    pub fn is_extended(self) -> bool {
        matches!(self, Self::Extended(_))
    }
}

bitflags! {
    /// Sample header flags reported by probers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SampleFlags: u16 {
        /// 16-bit sample data (8-bit otherwise).
        const SIXTEEN_BIT = 1 << 0;
        /// Interleaved stereo sample data.
        const STEREO = 1 << 1;
        /// Loop enabled.
        const LOOP = 1 << 2;
        /// Sustain loop enabled.
        const SUSTAIN_LOOP = 1 << 3;
        /// Loop plays forward and backward.
        const PINGPONG_LOOP = 1 << 4;
        /// Sustain loop plays forward and backward.
        const PINGPONG_SUSTAIN = 1 << 5;
    }
}

/// Vibrato waveform of a sample's auto-vibrato.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VibratoWaveform {
    /// Sine wave.
    #[default]
    Sine,
    /// Ramp down.
    RampDown,
    /// Square wave.
    Square,
    /// Random.
    Random,
}

/// Header fields of a sample-like entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleInfo {
    /// Length in sample frames.
    pub length: u32,
    /// Loop start frame.
    pub loop_start: u32,
    /// Loop end frame.
    pub loop_end: u32,
    /// Sustain loop start frame.
    pub sustain_start: u32,
    /// Sustain loop end frame.
    pub sustain_end: u32,
    /// Default volume (0..=64).
    pub default_volume: u8,
    /// Global volume (0..=64).
    pub global_volume: u8,
    /// Auto-vibrato speed.
    pub vibrato_speed: u8,
    /// Auto-vibrato depth.
    pub vibrato_depth: u8,
    /// Auto-vibrato rate (sweep).
    pub vibrato_rate: u8,
    /// Auto-vibrato waveform.
    pub vibrato_waveform: VibratoWaveform,
    /// Playback speed of middle C, in Hz.
    pub c5_speed: u32,
    /// Loop/format flags.
    pub flags: SampleFlags,
}

impl Default for SampleInfo {
    fn default() -> Self {
        Self {
            length: 0,
            loop_start: 0,
            loop_end: 0,
            sustain_start: 0,
            sustain_end: 0,
            default_volume: 64,
            global_volume: 64,
            vibrato_speed: 0,
            vibrato_depth: 0,
            vibrato_rate: 0,
            vibrato_waveform: VibratoWaveform::Sine,
            c5_speed: 8363,
            flags: SampleFlags::empty(),
        }
    }
}

/// Metadata parsed from a file header by a prober.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendedMetadata {
    /// Song title or sample name.
    pub title: Option<String>,
    /// Human-readable format description (e.g. "Impulse Tracker Sample").
    pub description: Option<String>,
    /// Sample header fields, for sample-like entries.
    pub sample: Option<SampleInfo>,
}

/// One probed directory entry.
///
/// Entries are built by the scanner and never change afterwards; a rescan
/// builds new ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    path: PathBuf,
    base_name: String,
    entry_type: EntryType,
    format: Option<String>,
    size: u64,
    modified: Option<SystemTime>,
    extended: Option<ExtendedMetadata>,
    parent_link: bool,
}

impl FileEntry {
    /// Builds an entry without metadata. Directories always report size 0.
    pub fn new(
        path: PathBuf,
        base_name: String,
        entry_type: EntryType,
        format: Option<String>,
        size: u64,
        modified: Option<SystemTime>,
    ) -> Self {
        let size = if entry_type == EntryType::Directory {
            0
        } else {
            size
        };
        Self {
            path,
            base_name,
            entry_type,
            format,
            size,
            modified,
            extended: None,
            parent_link: false,
        }
    }

    /// Builds the synthetic `..` entry pointing at `parent`.
    pub fn parent_link(parent: &Path) -> Self {
        Self {
            path: parent.to_path_buf(),
            base_name: PARENT_LINK_NAME.to_string(),
            entry_type: EntryType::Directory,
            format: None,
            size: 0,
            modified: None,
            extended: None,
            parent_link: true,
        }
    }

    /// Attaches probed metadata. Ignored unless the entry is an extended type.
    pub fn with_metadata(mut self, metadata: ExtendedMetadata) -> Self {
        if self.entry_type.is_extended() {
            self.extended = Some(metadata);
        }
        self
    }

    /// Absolute path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name (no parent path).
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Classification tag.
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Identifier of the recognized (or extension-implied) format.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Whether this entry is a directory (including the parent link).
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Whether this is the synthetic `..` entry.
    pub fn is_parent_link(&self) -> bool {
        self.parent_link
    }

    /// Size in bytes; 0 for directories.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last write time.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Whether probing succeeded for this entry.
    pub fn extended_data_present(&self) -> bool {
        self.extended.is_some()
    }

    /// Probed metadata, when present.
    pub fn metadata(&self) -> Option<&ExtendedMetadata> {
        self.extended.as_ref()
    }

    /// Sample fields for display: the probed ones, or defaults when absent.
    pub fn sample_or_default(&self) -> SampleInfo {
        self.extended
            .as_ref()
            .and_then(|m| m.sample.clone())
            .unwrap_or_default()
    }

    /// Whether the name starts with a dot (hidden on Unix-like systems).
    pub fn is_hidden(&self) -> bool {
        !self.parent_link && self.base_name.starts_with('.')
    }
}
