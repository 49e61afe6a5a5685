use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::entry::FileEntry;

/// Accumulated type-ahead prefix.
#[derive(Clone, Debug, Default)]
pub struct SearchState {
    buffer: String,
    last_key: Option<Instant>,
}

impl SearchState {
    /// Current lowercase prefix.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Clears the prefix.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_key = None;
    }

    fn push(&mut self, ch: char, now: Instant, timeout: Option<Duration>) {
        let expired = match (self.last_key, timeout) {
            (Some(last), Some(timeout)) => now.saturating_duration_since(last) > timeout,
            _ => false,
        };
        if expired {
            self.buffer.clear();
        }
        self.buffer.extend(ch.to_lowercase());
        self.last_key = Some(now);
    }
}

/// Scrollable, searchable selection over an ordered entry list.
///
/// Whenever the list is non-empty, `top <= selected < top + page_size` and
/// `top <= max(0, len - page_size)`. An empty list has no selection.
#[derive(Clone, Debug)]
pub struct FileList {
    entries: Arc<[FileEntry]>,
    selected: Option<usize>,
    top: usize,
    page_size: usize,
    search: SearchState,
    type_ahead_timeout: Option<Duration>,
}

impl Default for FileList {
    fn default() -> Self {
        Self::new(30)
    }
}

impl FileList {
    /// Creates an empty list with the given viewport height (at least one).
    pub fn new(page_size: usize) -> Self {
        Self {
            entries: Arc::from(Vec::new()),
            selected: None,
            top: 0,
            page_size: clamp_page_size(page_size),
            search: SearchState::default(),
            type_ahead_timeout: Some(Duration::from_secs(1)),
        }
    }

    /// Sets how long the type-ahead buffer survives between keystrokes.
    pub fn with_type_ahead_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.type_ahead_timeout = timeout;
        self
    }

    /// Replaces the contents.
    ///
    /// The previously selected path is reselected when it is still present;
    /// otherwise the first entry is selected and the view scrolls to the top.
    pub fn set_entries(&mut self, entries: impl Into<Arc<[FileEntry]>>) {
        let previous = self.selected_entry().map(|e| e.path().to_path_buf());
        self.entries = entries.into();
        self.search.reset();

        let reselected = previous.and_then(|p| self.position_of(&p));
        match reselected {
            Some(index) => {
                self.selected = Some(index);
                self.clamp_top();
            }
            None => {
                self.selected = if self.entries.is_empty() { None } else { Some(0) };
                self.top = 0;
            }
        }
    }

    /// All entries in display order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Shared handle to the entries.
    pub fn shared_entries(&self) -> Arc<[FileEntry]> {
        self.entries.clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the selected entry.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// The selected entry.
    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }

    /// Index of the first visible row.
    pub fn top(&self) -> usize {
        self.top
    }

    /// Viewport height in rows.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changes the viewport height and re-derives the scroll offset.
    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = clamp_page_size(rows);
        self.clamp_top();
    }

    /// Entries currently inside the viewport.
    pub fn visible_entries(&self) -> &[FileEntry] {
        let end = self.top.saturating_add(self.page_size).min(self.entries.len());
        &self.entries[self.top.min(end)..end]
    }

    /// Current type-ahead prefix.
    pub fn type_ahead_buffer(&self) -> &str {
        self.search.buffer()
    }

    /// Moves the selection by `delta` rows, clamped to the list.
    pub fn move_selection(&mut self, delta: isize) {
        self.search.reset();
        let Some(current) = self.selected else {
            return;
        };
        let last = self.entries.len() - 1;
        let target = current.saturating_add_signed(delta).min(last);
        self.selected = Some(target);
        self.clamp_top();
    }

    /// Moves up by one page.
    pub fn page_up(&mut self) {
        self.move_selection(-(self.page_size as isize));
    }

    /// Moves down by one page.
    pub fn page_down(&mut self) {
        self.move_selection(self.page_size as isize);
    }

    /// Selects the first entry.
    pub fn home(&mut self) {
        self.move_selection(isize::MIN);
    }

    /// Selects the last entry.
    pub fn end(&mut self) {
        self.move_selection(isize::MAX);
    }

    /// Selects the entry at `index`. Out-of-range indices are ignored.
    pub fn select_index(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.search.reset();
        self.selected = Some(index);
        self.clamp_top();
        true
    }

    /// Selects the entry whose path is `path`.
    pub fn select_path(&mut self, path: &Path) -> bool {
        match self.position_of(path) {
            Some(index) => self.select_index(index),
            None => false,
        }
    }

    /// Appends `ch` to the type-ahead buffer and jumps to the first entry,
    /// from the current selection onwards and wrapping, whose name starts
    /// with the buffer. Returns whether a match was found.
    pub fn type_ahead_feed(&mut self, ch: char) -> bool {
        self.type_ahead_feed_at(ch, Instant::now())
    }

    /// [`type_ahead_feed`](Self::type_ahead_feed) with an explicit clock.
    pub fn type_ahead_feed_at(&mut self, ch: char, now: Instant) -> bool {
        let Some(start) = self.selected else {
            return false;
        };
        self.search.push(ch, now, self.type_ahead_timeout);
        let len = self.entries.len();
        let prefix = self.search.buffer();
        let found = (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&i| self.entries[i].base_name().to_lowercase().starts_with(prefix));
        match found {
            Some(index) => {
                self.selected = Some(index);
                self.clamp_top();
                true
            }
            None => false,
        }
    }

    /// Clears the type-ahead buffer.
    pub fn type_ahead_reset(&mut self) {
        self.search.reset();
    }

    fn position_of(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path() == path)
    }

    fn clamp_top(&mut self) {
        let Some(selected) = self.selected else {
            self.top = 0;
            return;
        };
        if selected < self.top {
            self.top = selected;
        } else if selected >= self.top.saturating_add(self.page_size) {
            self.top = selected + 1 - self.page_size;
        }
        let max_top = self.entries.len().saturating_sub(self.page_size);
        self.top = self.top.min(max_top);
    }
}

/// Page sizes stay usable as signed selection deltas.
fn clamp_page_size(rows: usize) -> usize {
    rows.clamp(1, isize::MAX as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryType;
    use std::path::PathBuf;

    fn entries(names: &[&str]) -> Vec<FileEntry> {
        names
            .iter()
            .map(|n| {
                FileEntry::new(
                    PathBuf::from("/d").join(n),
                    n.to_string(),
                    EntryType::Unknown,
                    None,
                    1,
                    None,
                )
            })
            .collect()
    }

    fn numbered(count: usize) -> Vec<FileEntry> {
        let names: Vec<String> = (0..count).map(|i| format!("f{i:03}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        entries(&refs)
    }

    fn assert_viewport(list: &FileList) {
        match list.selected() {
            None => assert!(list.is_empty()),
            Some(sel) => {
                assert!(list.top() <= sel, "top {} > sel {}", list.top(), sel);
                assert!(sel < list.top().saturating_add(list.page_size()));
                assert!(list.top() <= list.len().saturating_sub(list.page_size()));
            }
        }
    }

    #[test]
    fn empty_list_operations_are_noops() {
        let mut list = FileList::new(5);
        list.move_selection(3);
        list.page_down();
        list.end();
        assert!(!list.type_ahead_feed('a'));
        assert_eq!(list.type_ahead_buffer(), "");
        assert_eq!(list.selected(), None);
        assert!(list.visible_entries().is_empty());
    }

    #[test]
    fn huge_page_size_keeps_viewport_and_paging() {
        let mut list = FileList::new(4);
        list.set_entries(numbered(20));
        list.select_index(15);
        assert!(list.top() > 0);
        list.set_page_size(usize::MAX);
        assert_eq!(list.top(), 0);
        assert_eq!(list.visible_entries().len(), 20);
        assert_viewport(&list);

        let mut list = FileList::new(usize::MAX);
        list.set_entries(numbered(20));
        list.select_index(10);
        list.page_up();
        assert_eq!(list.selected(), Some(0));
        list.page_down();
        assert_eq!(list.selected(), Some(19));
        assert_viewport(&list);
    }

    #[test]
    fn set_entries_selects_first_and_reselects_by_path() {
        let mut list = FileList::new(3);
        list.set_entries(numbered(10));
        assert_eq!(list.selected(), Some(0));

        list.select_index(7);
        let mut shifted = numbered(10);
        shifted.insert(0, entries(&["aaa"]).remove(0));
        list.set_entries(shifted);
        assert_eq!(list.selected_entry().unwrap().base_name(), "f007");
        assert_viewport(&list);

        list.set_entries(entries(&["x", "y"]));
        assert_eq!(list.selected(), Some(0));
        assert_eq!(list.top(), 0);
    }

    #[test]
    fn paging_and_clamping() {
        let mut list = FileList::new(4);
        list.set_entries(numbered(10));
        list.page_down();
        assert_eq!(list.selected(), Some(4));
        assert_eq!(list.top(), 1);
        list.end();
        assert_eq!(list.selected(), Some(9));
        assert_eq!(list.top(), 6);
        list.page_up();
        assert_eq!(list.selected(), Some(5));
        assert_eq!(list.top(), 5);
        list.home();
        assert_eq!((list.selected(), list.top()), (Some(0), 0));
        list.move_selection(-3);
        assert_eq!(list.selected(), Some(0));
    }

    #[test]
    fn shrinking_page_size_keeps_selection_visible() {
        let mut list = FileList::new(10);
        list.set_entries(numbered(20));
        list.select_index(9);
        list.set_page_size(3);
        assert_viewport(&list);
        assert_eq!(list.visible_entries().len(), 3);
    }

    #[test]
    fn viewport_invariant_holds_over_operation_sequences() {
        // Small deterministic LCG so the sequence is reproducible.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        for count in [0usize, 1, 3, 7, 30, 101] {
            let mut list = FileList::new(1 + next() % 12);
            list.set_entries(numbered(count));
            assert_viewport(&list);
            for _ in 0..500 {
                match next() % 8 {
                    0 => list.move_selection((next() % 21) as isize - 10),
                    1 => list.page_up(),
                    2 => list.page_down(),
                    3 => list.home(),
                    4 => list.end(),
                    5 => list.set_page_size(1 + next() % 15),
                    6 => {
                        list.type_ahead_feed('f');
                    }
                    _ => list.set_entries(numbered(next() % (count + 1))),
                }
                assert_viewport(&list);
            }
        }
    }

    #[test]
    fn type_ahead_extends_prefix() {
        let mut list = FileList::new(10);
        list.set_entries(entries(&["Alpha", "Bravo", "Charlie", "Candy"]));
        let now = Instant::now();

        assert!(list.type_ahead_feed_at('c', now));
        assert_eq!(list.selected_entry().unwrap().base_name(), "Charlie");
        assert!(list.type_ahead_feed_at('a', now));
        assert_eq!(list.selected_entry().unwrap().base_name(), "Candy");
        assert_eq!(list.type_ahead_buffer(), "ca");

        list.type_ahead_reset();
        assert!(list.type_ahead_feed_at('b', now));
        assert_eq!(list.selected_entry().unwrap().base_name(), "Bravo");
    }

    #[test]
    fn type_ahead_miss_keeps_buffer_and_selection() {
        let mut list = FileList::new(10);
        list.set_entries(entries(&["Alpha", "Bravo"]));
        let now = Instant::now();
        list.type_ahead_feed_at('b', now);
        assert!(!list.type_ahead_feed_at('z', now));
        assert_eq!(list.type_ahead_buffer(), "bz");
        assert_eq!(list.selected_entry().unwrap().base_name(), "Bravo");
    }

    #[test]
    fn type_ahead_wraps_around() {
        let mut list = FileList::new(10);
        list.set_entries(entries(&["Alpha", "Bravo", "Charlie"]));
        list.end();
        assert!(list.type_ahead_feed_at('a', Instant::now()));
        assert_eq!(list.selected(), Some(0));
    }

    #[test]
    fn type_ahead_times_out() {
        let mut list = FileList::new(10)
            .with_type_ahead_timeout(Some(Duration::from_millis(500)));
        list.set_entries(entries(&["Alpha", "Bravo", "Charlie", "Candy"]));
        let t0 = Instant::now();
        list.type_ahead_feed_at('c', t0);
        list.type_ahead_feed_at('b', t0 + Duration::from_secs(2));
        assert_eq!(list.type_ahead_buffer(), "b");
        assert_eq!(list.selected_entry().unwrap().base_name(), "Bravo");
    }

    #[test]
    fn navigation_resets_type_ahead() {
        let mut list = FileList::new(10);
        list.set_entries(entries(&["Alpha", "Bravo"]));
        list.type_ahead_feed_at('b', Instant::now());
        list.home();
        assert_eq!(list.type_ahead_buffer(), "");
    }

    #[test]
    fn select_path_finds_entry() {
        let mut list = FileList::new(2);
        list.set_entries(numbered(6));
        assert!(list.select_path(Path::new("/d/f004")));
        assert_eq!(list.selected(), Some(4));
        assert_eq!(list.top(), 3);
        assert!(!list.select_path(Path::new("/d/missing")));
    }
}
