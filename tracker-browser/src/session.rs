use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::cache::{DirectoryCache, DirectoryListing};
use crate::classify::FormatTable;
use crate::config::BrowserConfig;
use crate::entry::FileEntry;
use crate::events::{BrowserEvent, BrowserOutcome};
use crate::file_list::FileList;
use crate::glob::GlobFilter;
use crate::probe::ProbeTable;
use crate::scanner::{DirectoryScanner, ScanError};

/// State of one file-picking screen.
///
/// Each screen (module load, sample load, instrument library, ...) owns its
/// page; a [`BrowserSession`] mutates it through `&mut`.
#[derive(Clone, Debug)]
pub struct BrowserPage {
    cwd: PathBuf,
    filter: GlobFilter,
    list: FileList,
    show_hidden: bool,
    last_error: Option<Arc<ScanError>>,
}

impl BrowserPage {
    /// Creates a page rooted at `cwd`. Nothing is scanned until the page is
    /// activated.
    pub fn new(cwd: impl Into<PathBuf>, config: &BrowserConfig) -> Self {
        Self {
            cwd: cwd.into(),
            filter: GlobFilter::parse(&config.default_patterns),
            list: FileList::new(config.page_size)
                .with_type_ahead_timeout(config.type_ahead_timeout_duration()),
            show_hidden: config.show_hidden,
            last_error: None,
        }
    }

    /// Directory shown by this page.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Active pattern set.
    pub fn filter(&self) -> &GlobFilter {
        &self.filter
    }

    /// The filtered, navigable view.
    pub fn list(&self) -> &FileList {
        &self.list
    }

    /// Mutable access for hosts that drive the list directly.
    pub fn list_mut(&mut self) -> &mut FileList {
        &mut self.list
    }

    /// Whether dotfiles are shown.
    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    /// Error of the last scan when the listing is degraded.
    pub fn last_error(&self) -> Option<&ScanError> {
        self.last_error.as_deref()
    }
}

/// Owns the scanner and the directory cache shared by every page.
#[derive(Debug)]
pub struct BrowserSession {
    scanner: DirectoryScanner,
    cache: DirectoryCache,
    config: BrowserConfig,
}

impl BrowserSession {
    /// Creates a session. The scanner's probe ceiling is taken from `config`.
    pub fn new(scanner: DirectoryScanner, config: BrowserConfig) -> Self {
        Self {
            scanner: scanner.probe_size_limit(config.probe_size_limit),
            cache: DirectoryCache::from_config(&config),
            config,
        }
    }

    /// Creates a session over the real file system.
    pub fn with_std_fs(formats: FormatTable, probers: ProbeTable, config: BrowserConfig) -> Self {
        Self::new(DirectoryScanner::with_std_fs(formats, probers), config)
    }

    /// Session configuration.
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// The scanner.
    pub fn scanner(&self) -> &DirectoryScanner {
        &self.scanner
    }

    /// The directory cache.
    pub fn cache(&self) -> &DirectoryCache {
        &self.cache
    }

    /// Mutable access to the directory cache.
    pub fn cache_mut(&mut self) -> &mut DirectoryCache {
        &mut self.cache
    }

    /// Creates a page configured from this session.
    pub fn new_page(&self, cwd: impl Into<PathBuf>) -> BrowserPage {
        BrowserPage::new(cwd, &self.config)
    }

    /// Refreshes the page from the cache (scanning only when stale).
    ///
    /// Call whenever a page becomes visible; the selection is kept by path.
    pub fn activate(&mut self, page: &mut BrowserPage) {
        let listing = self.cache.get_or_scan(&page.cwd, &self.scanner);
        apply_listing(page, listing);
    }

    /// Shows `dir` on the page.
    pub fn navigate_to(&mut self, page: &mut BrowserPage, dir: impl Into<PathBuf>) {
        page.cwd = dir.into();
        trace_navigate(&page.cwd);
        self.activate(page);
    }

    /// Shows the parent directory and selects the directory just left.
    /// Returns `false` at a filesystem root.
    pub fn navigate_up(&mut self, page: &mut BrowserPage) -> bool {
        let Some(parent) = page.cwd.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return false;
        };
        let left = page.cwd.clone();
        let parent = parent.to_path_buf();
        self.navigate_to(page, parent);
        page.list.select_path(&left);
        true
    }

    /// Enters the selected directory, or reports the selected file.
    pub fn activate_selected(&mut self, page: &mut BrowserPage) -> BrowserOutcome {
        let Some(entry) = page.list.selected_entry().cloned() else {
            return BrowserOutcome::None;
        };
        if entry.is_parent_link() {
            if self.navigate_up(page) {
                return BrowserOutcome::DirectoryChanged(page.cwd.clone());
            }
            return BrowserOutcome::None;
        }
        if entry.is_dir() {
            self.navigate_to(page, entry.path());
            return BrowserOutcome::DirectoryChanged(page.cwd.clone());
        }
        trace_file_chosen(entry.path());
        BrowserOutcome::FileChosen(entry)
    }

    /// Replaces the page's pattern set and rebuilds its list.
    pub fn set_patterns(&mut self, page: &mut BrowserPage, patterns: &str) {
        page.filter = GlobFilter::parse(patterns);
        self.activate(page);
    }

    /// Shows or hides dotfiles on the page.
    pub fn set_show_hidden(&mut self, page: &mut BrowserPage, show: bool) {
        page.show_hidden = show;
        self.activate(page);
    }

    /// Discards the cached listing of the page's directory and rescans.
    pub fn rescan(&mut self, page: &mut BrowserPage) {
        self.cache.invalidate(&page.cwd, &self.scanner);
        self.activate(page);
    }

    /// Tells the session a file was written so its directory is rescanned on
    /// the next visit. Returns whether a cached listing was dropped.
    pub fn notify_written(&mut self, path: &Path) -> bool {
        match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => self.cache.invalidate(dir, &self.scanner),
            None => false,
        }
    }

    /// Applies one input event to the page.
    pub fn handle_event(&mut self, page: &mut BrowserPage, event: BrowserEvent) -> BrowserOutcome {
        match event {
            BrowserEvent::NavigateUp => {
                if self.navigate_up(page) {
                    return BrowserOutcome::DirectoryChanged(page.cwd.clone());
                }
            }
            BrowserEvent::NavigateTo(dir) => {
                self.navigate_to(page, dir);
                return BrowserOutcome::DirectoryChanged(page.cwd.clone());
            }
            BrowserEvent::MoveSelection(delta) => page.list.move_selection(delta),
            BrowserEvent::PageUp => page.list.page_up(),
            BrowserEvent::PageDown => page.list.page_down(),
            BrowserEvent::Home => page.list.home(),
            BrowserEvent::End => page.list.end(),
            BrowserEvent::TypeAhead(ch) => {
                page.list.type_ahead_feed(ch);
            }
            BrowserEvent::ResetTypeAhead => page.list.type_ahead_reset(),
            BrowserEvent::ActivateSelected => return self.activate_selected(page),
            BrowserEvent::SetPatterns(patterns) => self.set_patterns(page, &patterns),
            BrowserEvent::SetShowHidden(show) => self.set_show_hidden(page, show),
            BrowserEvent::SetPageSize(rows) => page.list.set_page_size(rows),
            BrowserEvent::Rescan => self.rescan(page),
        }
        BrowserOutcome::None
    }
}

fn apply_listing(page: &mut BrowserPage, listing: DirectoryListing) {
    page.cwd = listing.dir;
    page.last_error = listing.error;
    let entries = filtered_view(&listing.entries, &page.filter, page.show_hidden);
    page.list.set_entries(entries);
}

/// Applies the hidden-file rule and the pattern set, sharing the slice when
/// nothing is dropped.
fn filtered_view(
    entries: &Arc<[FileEntry]>,
    filter: &GlobFilter,
    show_hidden: bool,
) -> Arc<[FileEntry]> {
    let keep = |e: &FileEntry| (show_hidden || !e.is_hidden()) && filter.matches_entry(e);
    if entries.iter().all(keep) {
        return entries.clone();
    }
    entries.iter().filter(|e| keep(e)).cloned().collect()
}

#[cfg(feature = "tracing")]
fn trace_navigate(dir: &Path) {
    debug!(event = "session.navigate", dir = %dir.display(), "navigate");
}

#[cfg(not(feature = "tracing"))]
fn trace_navigate(_dir: &Path) {}

#[cfg(feature = "tracing")]
fn trace_file_chosen(path: &Path) {
    debug!(event = "session.file_chosen", path = %path.display(), "file chosen");
}

#[cfg(not(feature = "tracing"))]
fn trace_file_chosen(_path: &Path) {}
