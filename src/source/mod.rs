//! Headlines source abstraction layer.
//!
//! This module defines the [`HeadlinesSource`] trait and the common
//! [`Article`] type.  Concrete sources live in sub-modules (currently only
//! [`newsapi`]).
//!
//! ## For contributors — adding a new source
//!
//! 1. Create a new file in this directory (e.g. `guardian.rs`).
//! 2. Define a struct holding its configuration and implement
//!    [`HeadlinesSource`] for it.
//! 3. Add `mod guardian;` below and re-export your struct.
//! 4. Construct it in `main.rs` instead of [`NewsApiSource`].
//!
//! The sync controller, cache and UI are all source-agnostic.

mod article;
mod newsapi;

pub use article::Article;
pub use newsapi::NewsApiSource;

use async_trait::async_trait;

use crate::error::FeedError;

/// A remote, paginated, query-filterable article feed.
///
/// The sync controller calls [`fetch_page()`](HeadlinesSource::fetch_page)
/// from a spawned task, so implementations must be [`Send`] + [`Sync`].
#[async_trait]
pub trait HeadlinesSource: Send + Sync {
    /// Human-readable label for logs and the status bar.
    fn name(&self) -> &str;

    /// Fetch one page of articles.
    ///
    /// `page` is 1-based.  An empty `query` means "default top headlines",
    /// not a literal empty search.  Implementations validate the payload and
    /// return [`FeedError::MalformedResponse`] for anything that does not fit
    /// [`Article`].
    async fn fetch_page(&self, query: &str, page: u32, page_size: u32)
        -> Result<Vec<Article>, FeedError>;
}
