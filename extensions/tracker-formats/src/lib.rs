#![deny(missing_docs)]
//! Format table and header probers for `tracker-browser`.
//!
//! Recognized formats:
//! - samples: RIFF WAVE, Impulse Tracker samples (`.its`), AIFF (classified
//!   only, no prober)
//! - modules: Impulse Tracker, Scream Tracker 3, FastTracker 2 XM,
//!   ProTracker-family MOD
//! - libraries: SoundFont 2 banks
//!
//! ```no_run
//! use tracker_browser::{BrowserConfig, BrowserSession};
//!
//! let mut session = BrowserSession::with_std_fs(
//!     tracker_formats::format_table(),
//!     tracker_formats::probe_table(),
//!     BrowserConfig::default(),
//! );
//! let mut page = session.new_page("/music");
//! session.activate(&mut page);
//! ```

mod bytes;
mod its;
mod modules;
mod riff;
mod sf2;
mod wav;

use tracker_browser::{FormatDescriptor, FormatFamily, FormatTable, ProbeTable};

pub use its::probe_its;
pub use modules::{probe_it, probe_mod, probe_s3m, probe_xm};
pub use sf2::probe_sf2;
pub use wav::probe_wav;

/// Format ids used in the table and the probe table.
pub mod ids {
    /// RIFF WAVE sample.
    pub const WAV: &str = "wav";
    /// AIFF sample.
    pub const AIFF: &str = "aiff";
    /// Impulse Tracker sample.
    pub const ITS: &str = "its";
    /// Impulse Tracker module.
    pub const IT: &str = "it";
    /// FastTracker 2 Extended Module.
    pub const XM: &str = "xm";
    /// Scream Tracker 3 module.
    pub const S3M: &str = "s3m";
    /// ProTracker-family module.
    pub const MOD: &str = "mod";
    /// SoundFont 2 bank.
    pub const SF2: &str = "sf2";
}

/// Every format this crate recognizes, in match order.
pub fn format_table() -> FormatTable {
    let mut table = FormatTable::new()
        .with(
            FormatDescriptor::new(ids::WAV, FormatFamily::Sample)
                .extensions(["wav", "wave"])
                .signature(0, *b"RIFF")
                .signature(8, *b"WAVE"),
        )
        .with(
            FormatDescriptor::new(ids::SF2, FormatFamily::Library)
                .extensions(["sf2"])
                .signature(0, *b"RIFF")
                .signature(8, *b"sfbk"),
        )
        .with(
            FormatDescriptor::new(ids::AIFF, FormatFamily::Sample)
                .extensions(["aif", "aiff"])
                .signature(0, *b"FORM")
                .signature(8, *b"AIFF"),
        )
        .with(
            FormatDescriptor::new(ids::ITS, FormatFamily::Sample)
                .extensions(["its"])
                .signature(0, *b"IMPS"),
        )
        .with(
            FormatDescriptor::new(ids::IT, FormatFamily::Module)
                .extensions(["it"])
                .signature(0, *b"IMPM"),
        )
        .with(
            FormatDescriptor::new(ids::XM, FormatFamily::Module)
                .extensions(["xm"])
                .signature(0, *modules::XM_MAGIC),
        )
        .with(
            FormatDescriptor::new(ids::S3M, FormatFamily::Module)
                .extensions(["s3m"])
                .signature(modules::S3M_TAG_OFFSET, *b"SCRM"),
        );
    for tag in modules::mod_tags() {
        table.push(
            FormatDescriptor::new(ids::MOD, FormatFamily::Module)
                .extensions(["mod"])
                .signature(modules::MOD_TAG_OFFSET, tag),
        );
    }
    table
}

/// Probers for every format in [`format_table`] that has one.
pub fn probe_table() -> ProbeTable {
    let mut probers = ProbeTable::new();
    probers.register(ids::WAV, probe_wav);
    probers.register(ids::ITS, probe_its);
    probers.register(ids::IT, probe_it);
    probers.register(ids::XM, probe_xm);
    probers.register(ids::S3M, probe_s3m);
    probers.register(ids::MOD, probe_mod);
    probers.register(ids::SF2, probe_sf2);
    probers
}
