//! State and notice types produced by the sync controller.
//!
//! These are plain data: the UI reads them, only
//! [`FeedSyncController`](super::FeedSyncController) writes them.

use std::time::Duration;

use crate::error::FeedError;
use crate::source::Article;

/// Tunables for one controller instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Articles requested per page.  A page that comes back with fewer is
    /// taken to be the last one.
    pub page_size: u32,

    /// Quiet period after a search-text change before the search is sent.
    pub debounce: Duration,

    /// The single key the last fetched list is cached under.
    pub cache_key: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            debounce: Duration::from_millis(800),
            cache_key: "cachedArticles".into(),
        }
    }
}

/// Everything the UI needs to render the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedState {
    /// Articles in display order.
    pub articles: Vec<Article>,

    /// 1-based page of the most recent request.
    pub page: u32,

    /// Query of the most recent refresh; empty means top headlines.
    pub query: String,

    /// What is in the search box right now, which may not be sent yet.
    pub search_text: String,

    /// Whether another page is worth requesting.
    pub has_more: bool,

    /// The first load after start is in flight.
    pub is_initial_load: bool,

    /// A refresh or search is in flight.
    pub is_refreshing: bool,

    /// A next-page request is in flight.
    pub is_paginating: bool,

    /// Any request is in flight.
    pub is_fetching: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            articles: Vec::new(),
            page: 1,
            query: String::new(),
            search_text: String::new(),
            has_more: false,
            is_initial_load: false,
            is_refreshing: false,
            is_paginating: false,
            is_fetching: false,
        }
    }
}

impl FeedState {
    pub(super) fn clear_loading_flags(&mut self) {
        self.is_initial_load = false;
        self.is_refreshing = false;
        self.is_paginating = false;
        self.is_fetching = false;
    }
}

/// Why a load was started; selects which loading indicator the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchCause {
    Initial,
    Refresh,
    Paginate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Offline,
    NetworkFailure,
    MalformedResponse,
}

/// A one-shot, user-facing message about a failed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    /// The underlying error, for logs and the status bar.
    pub detail: String,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self.kind {
            NoticeKind::Offline => "No Internet",
            NoticeKind::NetworkFailure | NoticeKind::MalformedResponse => "Error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self.kind {
            NoticeKind::Offline => "Please connect to the internet.",
            NoticeKind::NetworkFailure | NoticeKind::MalformedResponse => "Something went wrong.",
        }
    }
}

impl From<&FeedError> for Notice {
    fn from(err: &FeedError) -> Self {
        let kind = match err {
            FeedError::Offline => NoticeKind::Offline,
            FeedError::NetworkFailure(_) => NoticeKind::NetworkFailure,
            FeedError::MalformedResponse(_) => NoticeKind::MalformedResponse,
        };
        Self {
            kind,
            detail: err.to_string(),
        }
    }
}
