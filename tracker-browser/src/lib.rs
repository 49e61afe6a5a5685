#![deny(missing_docs)]
//! Directory browsing engine for tracker file pickers.
//!
//! Every "pick a file" screen of the tracker (module load/save, sample load,
//! instrument library) shares this engine:
//! - scan a directory and classify entries against a collaborator-supplied
//!   [`FormatTable`]
//! - probe header metadata of recognized files through a [`ProbeTable`]
//! - cache listings per directory while its modification signature holds
//! - expose a scrollable, type-ahead searchable [`FileList`]
//!
//! [`BrowserSession`] ties these together for synchronous hosts;
//! [`ScanService`] moves scanning onto worker threads.

mod cache;
mod classify;
mod config;
mod entry;
mod events;
mod file_list;
mod fs;
mod glob;
mod probe;
mod scanner;
mod service;
mod session;

pub use cache::{CacheStats, DirectoryCache, DirectoryListing, normalize_dir_key};
pub use classify::{Classification, FormatDescriptor, FormatTable, Signature};
pub use config::{BrowserConfig, DEFAULT_PROBE_SIZE_LIMIT};
pub use entry::{
    EntryType, ExtendedMetadata, FileEntry, FormatFamily, PARENT_LINK_NAME, SampleFlags,
    SampleInfo, VibratoWaveform,
};
pub use events::{BrowserEvent, BrowserOutcome};
pub use file_list::{FileList, SearchState};
pub use fs::{DirSignature, FileSystem, FsEntry, StdFileSystem};
pub use glob::GlobFilter;
pub use probe::{MetadataProber, ProbeError, ProbeTable};
pub use scanner::{
    CancelFlag, DirectoryScanner, ScanError, ScanOutcome, degraded_listing, sort_entries,
};
pub use service::{ScanService, ScanTicket};
pub use session::{BrowserPage, BrowserSession};
