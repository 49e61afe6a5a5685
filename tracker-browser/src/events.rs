use std::path::PathBuf;

use crate::entry::FileEntry;

/// Input events for driving a browser page without UI coupling.
///
/// The host maps keys to these; [`BrowserSession::handle_event`] applies them.
///
/// [`BrowserSession::handle_event`]: crate::BrowserSession::handle_event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowserEvent {
    /// Go to the parent directory.
    NavigateUp,
    /// Go to a directory.
    NavigateTo(PathBuf),
    /// Move the selection by a signed row delta.
    MoveSelection(isize),
    /// Move up one page.
    PageUp,
    /// Move down one page.
    PageDown,
    /// Select the first entry.
    Home,
    /// Select the last entry.
    End,
    /// Feed one character to type-ahead search.
    TypeAhead(char),
    /// Clear the type-ahead buffer.
    ResetTypeAhead,
    /// Enter the selected directory or choose the selected file.
    ActivateSelected,
    /// Replace the wildcard pattern set.
    SetPatterns(String),
    /// Show or hide dotfiles.
    SetShowHidden(bool),
    /// Change the viewport height.
    SetPageSize(usize),
    /// Drop the cached listing of the current directory and rescan.
    Rescan,
}

/// Side effect reported after applying a [`BrowserEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowserOutcome {
    /// Nothing for the host to do.
    None,
    /// The page now shows another directory.
    DirectoryChanged(PathBuf),
    /// A file was chosen; the host decides what loading it means.
    FileChosen(FileEntry),
}
