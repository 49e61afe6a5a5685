use std::time::Duration;

/// Default probe ceiling: files above 64 MiB are listed without metadata.
pub const DEFAULT_PROBE_SIZE_LIMIT: u64 = 64 * 1024 * 1024;

/// Tunables shared by the scanner, the cache and the file list.
///
/// With the `serde` feature this can be persisted by the host application.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BrowserConfig {
    /// Number of visible rows in the file list viewport.
    pub page_size: usize,
    /// Files larger than this are never probed. `None` disables the ceiling.
    pub probe_size_limit: Option<u64>,
    /// Show dotfiles in the list.
    pub show_hidden: bool,
    /// Type-ahead buffer is cleared when no key arrives within this many
    /// milliseconds. `None` keeps the buffer until an explicit reset.
    pub type_ahead_timeout_ms: Option<u64>,
    /// Least-recently-used bound on cached directories. `None` = unbounded.
    pub max_cached_directories: Option<usize>,
    /// Initial wildcard pattern set (e.g. `"*.it; *.xm"`); empty = everything.
    pub default_patterns: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            probe_size_limit: Some(DEFAULT_PROBE_SIZE_LIMIT),
            show_hidden: false,
            type_ahead_timeout_ms: Some(1000),
            max_cached_directories: None,
            default_patterns: String::new(),
        }
    }
}

impl BrowserConfig {
    /// Sets the viewport height (at least one row).
    pub fn page_size(mut self, rows: usize) -> Self {
        self.page_size = rows.max(1);
        self
    }

    /// Sets the probe ceiling in bytes.
    pub fn probe_size_limit(mut self, limit: Option<u64>) -> Self {
        self.probe_size_limit = limit;
        self
    }

    /// Shows or hides dotfiles.
    pub fn show_hidden(mut self, yes: bool) -> Self {
        self.show_hidden = yes;
        self
    }

    /// Sets the type-ahead timeout.
    pub fn type_ahead_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.type_ahead_timeout_ms = timeout.map(|d| d.as_millis() as u64);
        self
    }

    /// Bounds the number of cached directories.
    pub fn max_cached_directories(mut self, bound: Option<usize>) -> Self {
        self.max_cached_directories = bound.map(|b| b.max(1));
        self
    }

    /// Sets the initial pattern set.
    pub fn default_patterns(mut self, patterns: impl Into<String>) -> Self {
        self.default_patterns = patterns.into();
        self
    }

    pub(crate) fn type_ahead_timeout_duration(&self) -> Option<Duration> {
        self.type_ahead_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_degenerate_values() {
        let cfg = BrowserConfig::default()
            .page_size(0)
            .max_cached_directories(Some(0));
        assert_eq!(cfg.page_size, 1);
        assert_eq!(cfg.max_cached_directories, Some(1));
    }

    #[test]
    fn timeout_round_trips_through_millis() {
        let cfg = BrowserConfig::default().type_ahead_timeout(Some(Duration::from_millis(750)));
        assert_eq!(
            cfg.type_ahead_timeout_duration(),
            Some(Duration::from_millis(750))
        );
        let cfg = cfg.type_ahead_timeout(None);
        assert_eq!(cfg.type_ahead_timeout_duration(), None);
    }
}
