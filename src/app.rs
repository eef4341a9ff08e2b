//! Presentation state.
//!
//! [`App`] holds the latest [`FeedState`] snapshot plus the bits of state that
//! only the terminal cares about: list selection, input mode and the status
//! line.  It never fetches anything itself.

use ratatui::widgets::ListState;

use crate::sync::{FeedState, Notice};

/// Selecting an item this close to the end of the list asks for the next page.
pub const LOAD_MORE_THRESHOLD: usize = 3;

/// Where key presses go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Keys move through the list.
    Browse,
    /// Keys edit the search box.
    Search,
}

pub struct App {
    /// Latest snapshot published by the sync controller.
    pub feed: FeedState,
    /// List selection state for scrolling.
    pub list_state: ListState,
    pub mode: Mode,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last notice shown to the user.
    pub status: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            feed: FeedState::default(),
            list_state: ListState::default(),
            mode: Mode::Browse,
            quit: false,
            status: "Starting…".into(),
        }
    }

    /// Take a new snapshot from the controller.
    ///
    /// The local search text wins while the user is typing, so keys pressed
    /// between two ticks are not lost.
    pub fn apply_state(&mut self, feed: FeedState) {
        let typing = self.mode == Mode::Search;
        let search_text = std::mem::take(&mut self.feed.search_text);
        self.feed = feed;
        if typing {
            self.feed.search_text = search_text;
        }

        let len = self.feed.articles.len();
        match self.list_state.selected() {
            Some(_) if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    /// Show a notice in the status bar.
    pub fn notify(&mut self, notice: &Notice) {
        self.status = if notice.detail.is_empty() {
            format!("{}: {}", notice.title(), notice.message())
        } else {
            format!("{}: {} ({})", notice.title(), notice.message(), notice.detail)
        };
    }

    /// Whether the selection is close enough to the end to fetch more.
    pub fn near_end(&self) -> bool {
        let len = self.feed.articles.len();
        match self.list_state.selected() {
            Some(i) if len > 0 => i + LOAD_MORE_THRESHOLD >= len - 1,
            _ => false,
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        let len = self.feed.articles.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.feed.articles.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.feed.articles.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.feed.articles.is_empty() {
            self.list_state.select(Some(self.feed.articles.len() - 1));
        }
    }
}
