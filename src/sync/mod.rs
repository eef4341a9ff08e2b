//! Feed synchronization policy.
//!
//! [`FeedSyncController`] is the single owner of [`FeedState`].  UI events call
//! into it; it decides whether to serve the cache or hit the network, and
//! publishes the resulting state on a [`watch`] channel.
//!
//! ```text
//!   initialize ─┐
//!   refresh ────┼─► guard ──► spawned load ──► probe ─┬─ up ───► source ──► cache.set
//!   load_more ──┘  (one in                            └─ down ─► cache.get
//!                   flight)                                        │
//!   on_search_text_changed ─► debounce timer ─► refresh      state + notice
//! ```
//!
//! ## Rules
//!
//! * At most one load is in flight.  A `refresh` or `load_more` issued while
//!   one is outstanding is dropped, not queued.
//! * `page` resets to 1 on every refresh and advances only through
//!   `load_more`.  A load that fails puts `page` and `query` back the way they
//!   were, so they keep describing the list on screen.
//! * An accepted refresh cancels the pending search timer.
//! * `has_more` is `true` iff the last page came back full.
//! * On failure the article list is left untouched and a [`Notice`] is sent.
//! * The cache holds the most recently fetched page only, not the accumulated
//!   list.
//! * After [`shutdown`](FeedSyncController::shutdown) results still in flight
//!   are discarded and every operation is a no-op.

mod state;

pub use state::{FeedState, FetchCause, Notice, NoticeKind, SyncSettings};

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::error::FeedError;
use crate::net::NetworkProbe;
use crate::source::{Article, HeadlinesSource};

/// One load, as decided at the moment the operation was accepted.
#[derive(Debug, Clone)]
struct LoadRequest {
    cause: FetchCause,
    page: u32,
    query: String,
    replace: bool,
    /// `page` and `query` before this load was accepted.
    previous: (u32, String),
}

/// Where a load's articles came from.
enum Loaded {
    Network(Vec<Article>),
    Cache(Vec<Article>),
}

/// Handle to the feed sync core.  Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct FeedSyncController {
    inner: Arc<Inner>,
}

struct Inner {
    settings: SyncSettings,
    source: Arc<dyn HeadlinesSource>,
    probe: Arc<dyn NetworkProbe>,
    cache: Arc<dyn LocalCache>,
    state: watch::Sender<FeedState>,
    notices: mpsc::UnboundedSender<Notice>,
    debounce: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl FeedSyncController {
    /// Create a controller and the receiving end of its notice channel.
    pub fn new(
        settings: SyncSettings,
        source: Arc<dyn HeadlinesSource>,
        probe: Arc<dyn NetworkProbe>,
        cache: Arc<dyn LocalCache>,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (state, _) = watch::channel(FeedState::default());
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let inner = Inner {
            settings,
            source,
            probe,
            cache,
            state,
            notices,
            debounce: Mutex::new(None),
            cancel: CancellationToken::new(),
        };
        (Self { inner: Arc::new(inner) }, notice_rx)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> FeedState {
        self.inner.state.borrow().clone()
    }

    /// Watch the state for changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.inner.state.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // -- operations ----------------------------------------------------------

    /// First load after mount: top headlines, page 1.
    pub fn initialize(&self) -> Option<JoinHandle<()>> {
        self.start(FetchCause::Initial, |state| {
            let previous = (state.page, std::mem::take(&mut state.query));
            state.is_initial_load = true;
            state.page = 1;
            Some(LoadRequest {
                cause: FetchCause::Initial,
                page: 1,
                query: String::new(),
                replace: true,
                previous,
            })
        })
    }

    /// Reload page 1 for `query`, replacing the list.
    ///
    /// Used for pull-to-refresh and search submission.  Once accepted it
    /// supersedes whatever search is still waiting out the debounce.
    pub fn refresh(&self, query: impl Into<String>) -> Option<JoinHandle<()>> {
        let handle = self.start_refresh(query.into())?;
        self.cancel_pending_search();
        Some(handle)
    }

    fn start_refresh(&self, query: String) -> Option<JoinHandle<()>> {
        self.start(FetchCause::Refresh, move |state| {
            let previous = (state.page, std::mem::replace(&mut state.query, query.clone()));
            state.is_refreshing = true;
            state.page = 1;
            Some(LoadRequest {
                cause: FetchCause::Refresh,
                page: 1,
                query,
                replace: true,
                previous,
            })
        })
    }

    /// Append the next page for the current query.
    ///
    /// Does nothing when the last page was short.
    pub fn load_more(&self) -> Option<JoinHandle<()>> {
        self.start(FetchCause::Paginate, |state| {
            if !state.has_more {
                return None;
            }
            let previous = (state.page, state.query.clone());
            state.is_paginating = true;
            state.page += 1;
            Some(LoadRequest {
                cause: FetchCause::Paginate,
                page: state.page,
                query: state.query.clone(),
                replace: false,
                previous,
            })
        })
    }

    /// Record new search-box text and (re)start the debounce timer.
    ///
    /// When the timer runs out without another change, behaves as
    /// [`refresh`](Self::refresh) with `text`.
    pub fn on_search_text_changed(&self, text: impl Into<String>) {
        if self.is_shut_down() {
            return;
        }
        let text = text.into();
        self.inner.state.send_modify(|state| state.search_text = text.clone());

        let controller = self.clone();
        let cancel = self.inner.cancel.clone();
        let delay = self.inner.settings.debounce;
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    debug!(query = %text, "search debounce elapsed");
                    controller.start_refresh(text);
                }
            }
        });

        let mut slot = self.inner.debounce.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }
    }

    /// Tear down: cancel the debounce timer and discard in-flight results.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.cancel_pending_search();
        debug!("feed sync controller shut down");
    }

    fn cancel_pending_search(&self) {
        let mut slot = self.inner.debounce.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = slot.take() {
            timer.abort();
        }
    }

    /// Apply `plan` under the in-flight guard and spawn the load it asks for.
    ///
    /// The check of `is_fetching` and the state changes made by `plan` happen
    /// in one critical section, so two callers can never both start a load.
    fn start(
        &self,
        cause: FetchCause,
        plan: impl FnOnce(&mut FeedState) -> Option<LoadRequest>,
    ) -> Option<JoinHandle<()>> {
        if self.is_shut_down() {
            debug!(?cause, "ignoring request after shutdown");
            return None;
        }

        let mut request = None;
        self.inner.state.send_if_modified(|state| {
            if state.is_fetching {
                return false;
            }
            request = plan(state);
            if request.is_some() {
                state.is_fetching = true;
                true
            } else {
                false
            }
        });

        let Some(request) = request else {
            debug!(?cause, "request dropped: fetch in flight or nothing more to load");
            return None;
        };

        // Created here rather than inside the task so that a task aborted
        // before its first poll still clears the flags.
        let in_flight = InFlight {
            inner: Arc::clone(&self.inner),
            armed: true,
        };
        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move { inner.load(request, in_flight).await }))
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Clears the loading flags if a load ends without applying its result,
/// i.e. it was aborted, panicked or outlived a shutdown.
struct InFlight {
    inner: Arc<Inner>,
    armed: bool,
}

impl InFlight {
    /// The result has been applied and the flags cleared with it.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.inner.state.send_if_modified(|state| {
            let was_fetching = state.is_fetching;
            state.clear_loading_flags();
            was_fetching
        });
    }
}

impl Inner {
    async fn load(&self, request: LoadRequest, in_flight: InFlight) {
        let outcome = self.fetch(&request).await;

        if self.cancel.is_cancelled() {
            debug!(cause = ?request.cause, "discarding load result after shutdown");
            return;
        }

        // Written before the flags clear so that a later load cannot finish
        // first and then be overwritten by this one.
        if let Ok(Loaded::Network(articles)) = &outcome {
            self.write_cache(articles).await;
        }

        let page_size = self.settings.page_size as usize;
        let mut failure = None;
        self.state.send_modify(|state| {
            match outcome {
                Ok(Loaded::Network(articles)) => {
                    state.has_more = articles.len() >= page_size;
                    info!(
                        cause = ?request.cause,
                        page = request.page,
                        count = articles.len(),
                        has_more = state.has_more,
                        "feed updated"
                    );
                    if request.replace {
                        state.articles = articles;
                    } else {
                        state.articles.extend(articles);
                    }
                }
                Ok(Loaded::Cache(articles)) => {
                    info!(count = articles.len(), "offline; showing cached articles");
                    state.articles = articles;
                    state.has_more = false;
                    if request.cause == FetchCause::Paginate {
                        state.page = request.previous.0;
                    }
                }
                Err(err) => {
                    warn!(cause = ?request.cause, page = request.page, error = %err, "feed load failed");
                    let (page, query) = request.previous;
                    state.page = page;
                    state.query = query;
                    failure = Some(err);
                }
            }
            state.clear_loading_flags();
        });
        in_flight.disarm();

        if let Some(err) = failure {
            // The receiver is gone only once the UI has exited.
            let _ = self.notices.send(Notice::from(&err));
        }
    }

    async fn fetch(&self, request: &LoadRequest) -> Result<Loaded, FeedError> {
        if !self.probe.is_connected().await {
            return match self.read_cache().await {
                Some(articles) => Ok(Loaded::Cache(articles)),
                None => Err(FeedError::Offline),
            };
        }

        let articles = self
            .source
            .fetch_page(&request.query, request.page, self.settings.page_size)
            .await?;
        Ok(Loaded::Network(articles))
    }

    /// The cached list, or `None` if there is none or it cannot be used.
    async fn read_cache(&self) -> Option<Vec<Article>> {
        let bytes = match self.cache.get(&self.settings.cache_key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("offline with no cache entry");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(articles) => Some(articles),
            Err(err) => {
                warn!(error = %err, "ignoring undecodable cache entry");
                None
            }
        }
    }

    async fn write_cache(&self, articles: &[Article]) {
        let bytes = match serde_json::to_vec(articles) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "could not encode articles for the cache");
                return;
            }
        };
        if let Err(err) = self.cache.set(&self.settings.cache_key, &bytes).await {
            warn!(error = %err, "cache write failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::cache::MemoryCache;
    use crate::error::CacheError;

    const PAGE_SIZE: u32 = 10;

    // -- fakes ---------------------------------------------------------------

    /// Replies from a script, records every call, and can be held open.
    #[derive(Default)]
    struct ScriptedSource {
        replies: Mutex<VecDeque<Result<Vec<Article>, FeedError>>>,
        calls: Mutex<Vec<(String, u32, u32)>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedSource {
        fn replying(replies: Vec<Result<Vec<Article>, FeedError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn calls(&self) -> Vec<(String, u32, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HeadlinesSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch_page(
            &self,
            query: &str,
            page: u32,
            page_size: u32,
        ) -> Result<Vec<Article>, FeedError> {
            self.calls.lock().unwrap().push((query.to_string(), page, page_size));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    struct FlagProbe(AtomicBool);

    impl FlagProbe {
        fn online() -> Self {
            Self(AtomicBool::new(true))
        }

        fn offline() -> Self {
            Self(AtomicBool::new(false))
        }

        fn set(&self, connected: bool) {
            self.0.store(connected, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl NetworkProbe for FlagProbe {
        async fn is_connected(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Accepts writes and forgets them.
    struct ForgetfulCache;

    #[async_trait]
    impl LocalCache for ForgetfulCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &[u8]) -> Result<(), CacheError> {
            Ok(())
        }
    }

    /// Rejects every write.
    struct ReadOnlyCache;

    #[async_trait]
    impl LocalCache for ReadOnlyCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(None)
        }

        async fn set(&self, key: &str, _value: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Io {
                path: key.into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    // -- helpers -------------------------------------------------------------

    fn articles(prefix: &str, count: usize) -> Vec<Article> {
        (0..count)
            .map(|i| Article::new(format!("{prefix} {i}"), "test", None))
            .collect()
    }

    fn settings() -> SyncSettings {
        SyncSettings {
            page_size: PAGE_SIZE,
            ..SyncSettings::default()
        }
    }

    struct Harness {
        controller: FeedSyncController,
        notices: mpsc::UnboundedReceiver<Notice>,
        source: Arc<ScriptedSource>,
        probe: Arc<FlagProbe>,
        cache: Arc<dyn LocalCache>,
    }

    impl Harness {
        fn new(source: ScriptedSource) -> Self {
            Self::with(source, FlagProbe::online(), Arc::new(MemoryCache::new()))
        }

        fn with(source: ScriptedSource, probe: FlagProbe, cache: Arc<dyn LocalCache>) -> Self {
            let source = Arc::new(source);
            let probe = Arc::new(probe);
            let (controller, notices) =
                FeedSyncController::new(settings(), source.clone(), probe.clone(), cache.clone());
            Self {
                controller,
                notices,
                source,
                probe,
                cache,
            }
        }

        async fn cached(&self) -> Option<Vec<Article>> {
            let bytes = self.cache.get(&settings().cache_key).await.unwrap()?;
            Some(serde_json::from_slice(&bytes).unwrap())
        }
    }

    async fn seed(cache: &dyn LocalCache, list: &[Article]) {
        cache
            .set(&settings().cache_key, &serde_json::to_vec(list).unwrap())
            .await
            .unwrap();
    }

    // -- initialize ----------------------------------------------------------

    #[tokio::test]
    async fn initialize_loads_top_headlines_page_one() {
        let mut h = Harness::new(ScriptedSource::replying(vec![Ok(articles("a", 10))]));

        h.controller.initialize().unwrap().await.unwrap();

        let state = h.controller.snapshot();
        assert_eq!(state.articles, articles("a", 10));
        assert_eq!(state.page, 1);
        assert!(state.has_more);
        assert!(!state.is_initial_load && !state.is_fetching);
        assert_eq!(h.source.calls(), vec![(String::new(), 1, PAGE_SIZE)]);
        assert!(h.notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn initialize_marks_initial_load_until_done() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(ScriptedSource::default().gated(gate.clone()));

        let handle = h.controller.initialize().unwrap();
        let state = h.controller.snapshot();
        assert!(state.is_initial_load);
        assert!(state.is_fetching);
        assert!(!state.is_refreshing);

        gate.notify_one();
        handle.await.unwrap();
        assert!(!h.controller.snapshot().is_initial_load);
    }

    // -- refresh -------------------------------------------------------------

    #[tokio::test]
    async fn refresh_resets_page_before_completion() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(
            ScriptedSource::replying(vec![Ok(articles("a", 10)), Ok(articles("b", 10)), Ok(articles("c", 3))])
                .gated(gate.clone()),
        );

        gate.notify_one();
        h.controller.initialize().unwrap().await.unwrap();
        gate.notify_one();
        h.controller.load_more().unwrap().await.unwrap();
        assert_eq!(h.controller.snapshot().page, 2);

        let handle = h.controller.refresh("rust").unwrap();
        let state = h.controller.snapshot();
        assert_eq!(state.page, 1);
        assert_eq!(state.query, "rust");
        assert!(state.is_refreshing);

        gate.notify_one();
        handle.await.unwrap();
        let state = h.controller.snapshot();
        assert_eq!(state.page, 1);
        assert_eq!(state.articles, articles("c", 3));
        assert!(!state.is_refreshing);
        assert_eq!(h.source.calls()[2], ("rust".to_string(), 1, PAGE_SIZE));
    }

    #[tokio::test]
    async fn refresh_replaces_articles() {
        let h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("old", 10)),
            Ok(articles("new", 5)),
        ]));

        h.controller.initialize().unwrap().await.unwrap();
        h.controller.refresh("").unwrap().await.unwrap();

        assert_eq!(h.controller.snapshot().articles, articles("new", 5));
    }

    #[tokio::test]
    async fn refresh_while_fetching_is_dropped() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(ScriptedSource::replying(vec![Ok(articles("a", 10))]).gated(gate.clone()));

        let handle = h.controller.initialize().unwrap();
        assert!(h.controller.refresh("later").is_none());
        assert_eq!(h.controller.snapshot().query, "");

        gate.notify_one();
        handle.await.unwrap();
        assert_eq!(h.source.calls().len(), 1);
    }

    // -- has_more ------------------------------------------------------------

    #[tokio::test]
    async fn full_page_means_more_short_page_means_done() {
        let h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("full", 10)),
            Ok(articles("short", 9)),
        ]));

        h.controller.refresh("q").unwrap().await.unwrap();
        assert!(h.controller.snapshot().has_more);

        h.controller.refresh("q").unwrap().await.unwrap();
        assert!(!h.controller.snapshot().has_more);
    }

    // -- load_more -----------------------------------------------------------

    #[tokio::test]
    async fn load_more_appends_in_order() {
        let h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("p1", 10)),
            Ok(articles("p2", 10)),
        ]));

        h.controller.refresh("q").unwrap().await.unwrap();
        h.controller.load_more().unwrap().await.unwrap();

        let state = h.controller.snapshot();
        let mut expected = articles("p1", 10);
        expected.extend(articles("p2", 10));
        assert_eq!(state.articles, expected);
        assert_eq!(state.page, 2);
        assert_eq!(h.source.calls()[1], ("q".to_string(), 2, PAGE_SIZE));
    }

    #[tokio::test]
    async fn load_more_does_not_deduplicate() {
        let h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("same", 10)),
            Ok(articles("same", 10)),
        ]));

        h.controller.refresh("").unwrap().await.unwrap();
        h.controller.load_more().unwrap().await.unwrap();

        assert_eq!(h.controller.snapshot().articles.len(), 20);
    }

    #[tokio::test]
    async fn load_more_is_noop_without_more() {
        let h = Harness::new(ScriptedSource::replying(vec![Ok(articles("a", 3))]));
        h.controller.initialize().unwrap().await.unwrap();
        let before = h.controller.snapshot();

        assert!(h.controller.load_more().is_none());

        assert_eq!(h.controller.snapshot(), before);
        assert_eq!(h.source.calls().len(), 1);
    }

    #[tokio::test]
    async fn load_more_is_noop_while_fetching() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(
            ScriptedSource::replying(vec![Ok(articles("a", 10)), Ok(articles("b", 10))]).gated(gate.clone()),
        );

        gate.notify_one();
        h.controller.initialize().unwrap().await.unwrap();

        let handle = h.controller.load_more().unwrap();
        let during = h.controller.snapshot();
        assert!(during.is_paginating);
        assert!(h.controller.load_more().is_none());
        assert_eq!(h.controller.snapshot(), during);

        gate.notify_one();
        handle.await.unwrap();
        assert_eq!(h.source.calls().len(), 2);
        assert_eq!(h.controller.snapshot().page, 2);
    }

    #[tokio::test]
    async fn failed_load_more_rolls_page_back() {
        let mut h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("a", 10)),
            Err(FeedError::NetworkFailure("reset".into())),
            Ok(articles("b", 2)),
        ]));

        h.controller.refresh("q").unwrap().await.unwrap();
        h.controller.load_more().unwrap().await.unwrap();
        let state = h.controller.snapshot();
        assert_eq!(state.page, 1);
        assert_eq!(state.articles.len(), 10);
        assert!(!state.is_paginating);
        assert_eq!(h.notices.try_recv().unwrap().kind, NoticeKind::NetworkFailure);

        h.controller.load_more().unwrap().await.unwrap();
        assert_eq!(h.source.calls()[2].1, 2, "same page requested again");
        assert_eq!(h.controller.snapshot().articles.len(), 12);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_paging_the_list_on_screen() {
        let mut h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("q p1", 10)),
            Ok(articles("q p2", 10)),
            Ok(articles("q p3", 10)),
            Err(FeedError::NetworkFailure("HTTP 502".into())),
            Ok(articles("q p4", 10)),
        ]));

        h.controller.refresh("q").unwrap().await.unwrap();
        h.controller.load_more().unwrap().await.unwrap();
        h.controller.load_more().unwrap().await.unwrap();

        let handle = h.controller.refresh("x").unwrap();
        assert_eq!(h.controller.snapshot().page, 1);
        handle.await.unwrap();

        let state = h.controller.snapshot();
        assert_eq!(state.page, 3);
        assert_eq!(state.query, "q");
        assert_eq!(state.articles.len(), 30);
        assert_eq!(h.notices.try_recv().unwrap().kind, NoticeKind::NetworkFailure);

        h.controller.load_more().unwrap().await.unwrap();
        assert_eq!(h.source.calls()[4], ("q".to_string(), 4, PAGE_SIZE));
        assert_eq!(h.controller.snapshot().articles.last().unwrap().title, "q p4 9");
    }

    #[tokio::test]
    async fn offline_refresh_without_cache_restores_page_and_query() {
        let h = Harness::with(
            ScriptedSource::replying(vec![Ok(articles("a", 10)), Ok(articles("b", 10))]),
            FlagProbe::online(),
            Arc::new(ForgetfulCache),
        );
        h.controller.refresh("cars").unwrap().await.unwrap();
        h.controller.load_more().unwrap().await.unwrap();

        h.probe.set(false);
        h.controller.refresh("boats").unwrap().await.unwrap();

        let state = h.controller.snapshot();
        assert_eq!(state.page, 2);
        assert_eq!(state.query, "cars");
        assert_eq!(state.articles.len(), 20);
    }

    #[tokio::test]
    async fn tesla_scenario() {
        let h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("tesla", 10)),
            Ok(articles("tesla p2", 4)),
        ]));

        h.controller.refresh("tesla").unwrap().await.unwrap();
        let state = h.controller.snapshot();
        assert!(state.has_more);
        assert_eq!(h.cached().await.unwrap(), articles("tesla", 10));

        h.controller.load_more().unwrap().await.unwrap();
        let state = h.controller.snapshot();
        assert_eq!(state.articles.len(), 14);
        assert!(!state.has_more);
        // Only the most recent page is cached.
        assert_eq!(h.cached().await.unwrap(), articles("tesla p2", 4));
    }

    // -- offline -------------------------------------------------------------

    #[tokio::test]
    async fn offline_serves_cache_without_network() {
        let cache: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());
        seed(cache.as_ref(), &articles("cached", 2)).await;
        let mut h = Harness::with(ScriptedSource::default(), FlagProbe::offline(), cache);

        h.controller.initialize().unwrap().await.unwrap();

        let state = h.controller.snapshot();
        assert_eq!(state.articles, articles("cached", 2));
        assert!(!state.has_more);
        assert!(!state.is_fetching);
        assert!(h.source.calls().is_empty());
        assert!(h.notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_without_cache_keeps_articles_and_reports() {
        let mut h = Harness::with(
            ScriptedSource::replying(vec![Ok(articles("live", 10))]),
            FlagProbe::online(),
            Arc::new(ForgetfulCache),
        );
        h.controller.initialize().unwrap().await.unwrap();

        h.probe.set(false);
        h.controller.refresh("").unwrap().await.unwrap();

        let state = h.controller.snapshot();
        assert_eq!(state.articles, articles("live", 10));
        assert!(!state.is_refreshing);
        assert_eq!(h.source.calls().len(), 1);
        assert_eq!(h.notices.try_recv().unwrap().kind, NoticeKind::Offline);
    }

    #[tokio::test]
    async fn offline_load_more_restores_cache_and_stops_paging() {
        let h = Harness::new(ScriptedSource::replying(vec![Ok(articles("a", 10))]));
        h.controller.refresh("").unwrap().await.unwrap();

        h.probe.set(false);
        h.controller.load_more().unwrap().await.unwrap();

        let state = h.controller.snapshot();
        assert_eq!(state.articles, articles("a", 10));
        assert_eq!(state.page, 1);
        assert!(!state.has_more);
        assert!(h.controller.load_more().is_none());
    }

    #[tokio::test]
    async fn undecodable_cache_counts_as_empty() {
        let cache: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());
        cache.set(&settings().cache_key, b"{not json").await.unwrap();
        let mut h = Harness::with(ScriptedSource::default(), FlagProbe::offline(), cache);

        h.controller.initialize().unwrap().await.unwrap();

        assert!(h.controller.snapshot().articles.is_empty());
        assert_eq!(h.notices.try_recv().unwrap().kind, NoticeKind::Offline);
    }

    // -- failures ------------------------------------------------------------

    #[tokio::test]
    async fn failure_keeps_articles_and_controller_stays_usable() {
        let mut h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("a", 10)),
            Err(FeedError::MalformedResponse("missing `articles` array".into())),
            Ok(articles("b", 1)),
        ]));

        h.controller.initialize().unwrap().await.unwrap();
        h.controller.refresh("x").unwrap().await.unwrap();

        let state = h.controller.snapshot();
        assert_eq!(state.articles, articles("a", 10));
        assert!(!state.is_refreshing && !state.is_fetching);
        let notice = h.notices.try_recv().unwrap();
        assert_eq!(notice.kind, NoticeKind::MalformedResponse);
        assert_eq!(notice.title(), "Error");

        h.controller.refresh("x").unwrap().await.unwrap();
        assert_eq!(h.controller.snapshot().articles, articles("b", 1));
    }

    #[tokio::test]
    async fn failure_does_not_touch_cache() {
        let h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("good", 10)),
            Err(FeedError::NetworkFailure("HTTP 500".into())),
        ]));

        h.controller.initialize().unwrap().await.unwrap();
        h.controller.refresh("").unwrap().await.unwrap();

        assert_eq!(h.cached().await.unwrap(), articles("good", 10));
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_fail_the_load() {
        let mut h = Harness::with(
            ScriptedSource::replying(vec![Ok(articles("a", 4))]),
            FlagProbe::online(),
            Arc::new(ReadOnlyCache),
        );

        h.controller.initialize().unwrap().await.unwrap();

        assert_eq!(h.controller.snapshot().articles, articles("a", 4));
        assert!(h.notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn aborted_load_clears_flags() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(ScriptedSource::default().gated(gate));

        let handle = h.controller.refresh("q").unwrap();
        // Let the task reach the gate before aborting it.
        tokio::task::yield_now().await;
        handle.abort();
        let _ = handle.await;

        let state = h.controller.snapshot();
        assert!(!state.is_fetching && !state.is_refreshing);
        assert!(h.controller.refresh("again").is_some());
    }

    // -- search debounce -----------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_sends_one_search_with_last_text() {
        let h = Harness::new(ScriptedSource::replying(vec![Ok(articles("tesla", 3))]));
        let mut rx = h.controller.subscribe();

        h.controller.on_search_text_changed("t");
        tokio::time::sleep(Duration::from_millis(300)).await;
        h.controller.on_search_text_changed("tes");
        tokio::time::sleep(Duration::from_millis(300)).await;
        h.controller.on_search_text_changed("tesla");
        assert_eq!(h.controller.snapshot().search_text, "tesla");
        assert!(h.source.calls().is_empty());

        rx.wait_for(|s| s.query == "tesla" && !s.is_fetching).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(h.source.calls(), vec![("tesla".to_string(), 1, PAGE_SIZE)]);
        assert_eq!(h.controller.snapshot().articles, articles("tesla", 3));
    }

    #[tokio::test(start_paused = true)]
    async fn each_change_restarts_the_quiet_period() {
        let h = Harness::new(ScriptedSource::default());

        h.controller.on_search_text_changed("a");
        tokio::time::sleep(Duration::from_millis(700)).await;
        h.controller.on_search_text_changed("ab");
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(h.source.calls().is_empty(), "1.4s elapsed but never 800ms of quiet");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(h.source.calls().len(), 1);
        assert_eq!(h.source.calls()[0].0, "ab");
    }

    #[tokio::test(start_paused = true)]
    async fn search_text_updates_without_fetching() {
        let h = Harness::new(ScriptedSource::default());

        h.controller.on_search_text_changed("draft");

        let state = h.controller.snapshot();
        assert_eq!(state.search_text, "draft");
        assert_eq!(state.query, "");
        assert!(!state.is_fetching);
        assert!(h.source.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submitted_search_cancels_the_pending_timer() {
        let h = Harness::new(ScriptedSource::replying(vec![
            Ok(articles("tesla", 10)),
            Ok(articles("tesla p2", 10)),
        ]));

        h.controller.on_search_text_changed("tesla");
        h.controller.refresh("tesla").unwrap().await.unwrap();
        h.controller.load_more().unwrap().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let state = h.controller.snapshot();
        assert_eq!(state.page, 2);
        assert_eq!(state.articles.len(), 20);
        assert_eq!(h.source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_refresh_leaves_the_pending_search_alone() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(
            ScriptedSource::replying(vec![Ok(articles("a", 10)), Ok(articles("rust", 3))]).gated(gate.clone()),
        );

        let first = h.controller.initialize().unwrap();
        h.controller.on_search_text_changed("rust");
        assert!(h.controller.refresh("rust").is_none());
        gate.notify_one();
        first.await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        gate.notify_one();
        let mut rx = h.controller.subscribe();
        rx.wait_for(|s| s.query == "rust" && !s.is_fetching).await.unwrap();
        assert_eq!(h.controller.snapshot().articles, articles("rust", 3));
    }

    // -- shutdown ------------------------------------------------------------

    #[tokio::test]
    async fn shutdown_discards_in_flight_result() {
        let gate = Arc::new(Notify::new());
        let mut h = Harness::new(
            ScriptedSource::replying(vec![Err(FeedError::NetworkFailure("late".into()))]).gated(gate.clone()),
        );

        let handle = h.controller.initialize().unwrap();
        h.controller.shutdown();
        gate.notify_one();
        handle.await.unwrap();

        assert!(h.controller.snapshot().articles.is_empty());
        assert!(h.notices.try_recv().is_err());
        assert!(h.controller.initialize().is_none());
        assert!(h.controller.refresh("q").is_none());
    }

    #[tokio::test]
    async fn shutdown_skips_cache_write_for_late_result() {
        let gate = Arc::new(Notify::new());
        let h = Harness::new(ScriptedSource::replying(vec![Ok(articles("late", 10))]).gated(gate.clone()));

        let handle = h.controller.initialize().unwrap();
        h.controller.shutdown();
        gate.notify_one();
        handle.await.unwrap();

        assert!(h.cached().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_search() {
        let h = Harness::new(ScriptedSource::default());

        h.controller.on_search_text_changed("never sent");
        h.controller.shutdown();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(h.source.calls().is_empty());
        assert!(h.controller.is_shut_down());
    }
}
