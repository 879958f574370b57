//! Cursor pager: merges successive pages of one feed into a single ordered
//! sequence.
//!
//! # Design
//! - One operation in flight per feed. `fetch_next_page` is a no-op while
//!   anything is loading or once the latest cursor is `None`.
//! - Pages are appended in fetch order and never reordered or deduplicated.
//! - Every operation captures the pager epoch when it starts. `refetch` and
//!   `reset` advance the epoch; completions from an older epoch are dropped.
//! - Errors are retained next to the pages until a refetch succeeds.
//! - The mutex is only held for synchronous bookkeeping, never across a fetch.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lumen_config::FeedTuning;
use lumen_events::{EventBus, FeedEvent};
use lumen_models::{FeedKind, FeedPage};
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::source::PageSource;

/// Ceiling for the exponential retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Pager caching and retry knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerOptions {
    /// Age after which loaded pages are stale.
    pub stale_time: Duration,
    /// Extra attempts per failed source call.
    pub retry: u32,
    /// Base delay before the first retry.
    pub retry_delay: Duration,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self::from_tuning(&FeedTuning::default())
    }
}

impl PagerOptions {
    /// Derive options from the feed tuning section.
    #[must_use]
    pub const fn from_tuning(tuning: &FeedTuning) -> Self {
        Self {
            stale_time: tuning.stale_time(),
            retry: tuning.retry,
            retry_delay: tuning.retry_delay(),
        }
    }
}

/// Exponential backoff (`base`, doubling per attempt) capped at [`MAX_RETRY_DELAY`].
#[must_use]
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    base.saturating_mul(2u32.saturating_pow(attempt.min(5)))
        .min(MAX_RETRY_DELAY)
}

/// Why an operation did not touch the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another operation is in flight for this feed.
    InFlight,
    /// The latest page reported no further cursor.
    NoNextPage,
    /// Loaded pages are still within the freshness window.
    Fresh,
    /// The feed has never been observed.
    NotObserved,
}

/// Result of a pager operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was appended.
    Appended {
        /// Zero-based index of the new page.
        page_index: usize,
        /// Items on the new page.
        items: usize,
    },
    /// The page list was replaced by a refetch.
    Refetched {
        /// Pages after the refetch.
        pages: usize,
    },
    /// Nothing was requested.
    Skipped(SkipReason),
    /// The completion belonged to a superseded epoch and was dropped.
    Discarded {
        /// Epoch captured when the operation started.
        epoch: u64,
    },
    /// The source failed after retries; existing pages were kept.
    Failed(FeedError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Initial,
    NextPage,
    Refetch,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    operation: Operation,
    epoch: u64,
}

/// Point-in-time view of a pager, cheap to clone.
#[derive(Debug, Clone)]
pub struct PagerSnapshot<T> {
    /// Feed identity.
    pub feed: FeedKind,
    /// Loaded pages in fetch order.
    pub pages: Arc<Vec<FeedPage<T>>>,
    /// A fetch is running and nothing is loaded yet.
    pub is_loading: bool,
    /// A next-page fetch is running.
    pub is_fetching_next_page: bool,
    /// A refetch is running.
    pub is_refetching: bool,
    /// Last failure, kept until a refetch succeeds.
    pub error: Option<FeedError>,
}

impl<T> PagerSnapshot<T> {
    /// Whether the last operation left an error behind.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// True while the most recent page carries a cursor.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.pages.last().is_some_and(FeedPage::has_next)
    }

    /// Whether any fetch is running.
    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.is_loading || self.is_fetching_next_page || self.is_refetching
    }

    /// Cursor that the next page will be requested with.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.pages.last().and_then(|page| page.cursor.as_deref())
    }

    /// All items flattened in page order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    /// Total number of items across pages.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }
}

struct PagerState<T> {
    pages: Arc<Vec<FeedPage<T>>>,
    epoch: u64,
    in_flight: Option<InFlight>,
    error: Option<FeedError>,
    observed: bool,
    updated_at: Option<Instant>,
}

impl<T> PagerState<T> {
    fn new() -> Self {
        Self {
            pages: Arc::new(Vec::new()),
            epoch: 0,
            in_flight: None,
            error: None,
            observed: false,
            updated_at: None,
        }
    }

    fn begin(&mut self, operation: Operation) -> u64 {
        if operation == Operation::Refetch {
            self.epoch += 1;
        }
        self.in_flight = Some(InFlight {
            operation,
            epoch: self.epoch,
        });
        self.epoch
    }

    fn running(&self, operation: Operation) -> bool {
        self.in_flight
            .is_some_and(|flight| flight.operation == operation)
    }

    fn is_stale(&self, stale_time: Duration) -> bool {
        self.updated_at
            .is_none_or(|loaded| loaded.elapsed() >= stale_time)
    }

    fn refresh_gate(&self, stale_time: Duration) -> Option<SkipReason> {
        if !self.observed {
            Some(SkipReason::NotObserved)
        } else if self.in_flight.is_some() {
            Some(SkipReason::InFlight)
        } else if !self.is_stale(stale_time) {
            Some(SkipReason::Fresh)
        } else {
            None
        }
    }
}

/// Paginated cache for one feed identity.
pub struct CursorPager<T> {
    feed: FeedKind,
    source: Arc<dyn PageSource<T>>,
    options: PagerOptions,
    state: Arc<Mutex<PagerState<T>>>,
    events: Option<EventBus>,
}

impl<T> Clone for CursorPager<T> {
    fn clone(&self) -> Self {
        Self {
            feed: self.feed,
            source: Arc::clone(&self.source),
            options: self.options,
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        }
    }
}

impl<T> fmt::Debug for CursorPager<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CursorPager")
            .field("feed", &self.feed)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T> CursorPager<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a pager for `feed` backed by `source`.
    #[must_use]
    pub fn new(feed: FeedKind, source: Arc<dyn PageSource<T>>, options: PagerOptions) -> Self {
        Self {
            feed,
            source,
            options,
            state: Arc::new(Mutex::new(PagerState::new())),
            events: None,
        }
    }

    /// Publish pager events on `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Feed identity served by this pager.
    #[must_use]
    pub const fn feed(&self) -> FeedKind {
        self.feed
    }

    /// Current pages and flags.
    #[must_use]
    pub fn snapshot(&self) -> PagerSnapshot<T> {
        let state = self.lock();
        let fetching = state.in_flight.is_some();
        PagerSnapshot {
            feed: self.feed,
            pages: Arc::clone(&state.pages),
            is_loading: fetching && state.pages.is_empty(),
            is_fetching_next_page: state.running(Operation::NextPage),
            is_refetching: state.running(Operation::Refetch),
            error: state.error.clone(),
        }
    }

    /// Whether the feed has been observed at least once.
    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.lock().observed
    }

    /// Whether loaded data is older than the freshness window.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.lock().is_stale(self.options.stale_time)
    }

    /// Observe the feed. The first observation loads the first page; later
    /// observations refetch in the background only when stale.
    pub async fn observe(&self) -> FetchOutcome {
        let first = {
            let mut state = self.lock();
            if state.observed {
                None
            } else {
                state.observed = true;
                Some(state.begin(Operation::Initial))
            }
        };
        if let Some(epoch) = first {
            debug!(feed = %self.feed, "loading first page");
            let result = self.fetch_with_retry(None).await;
            return self.settle_append(epoch, result);
        }
        self.refresh_if_stale().await
    }

    /// Request the page after the latest cursor.
    pub async fn fetch_next_page(&self) -> FetchOutcome {
        let started = {
            let mut state = self.lock();
            if state.in_flight.is_some() {
                Err(SkipReason::InFlight)
            } else if let Some(cursor) = state.pages.last().and_then(|page| page.cursor.clone()) {
                Ok((state.begin(Operation::NextPage), cursor))
            } else {
                Err(SkipReason::NoNextPage)
            }
        };
        let (epoch, cursor) = match started {
            Ok(started) => started,
            Err(reason) => {
                debug!(feed = %self.feed, ?reason, "next page skipped");
                return FetchOutcome::Skipped(reason);
            }
        };
        debug!(feed = %self.feed, cursor = %cursor, "fetching next page");
        let result = self.fetch_with_retry(Some(cursor)).await;
        self.settle_append(epoch, result)
    }

    /// Re-request as many pages as are loaded (at least one) from the start
    /// and replace the page list atomically. Supersedes any running operation.
    pub async fn refetch(&self) -> FetchOutcome {
        let (epoch, wanted) = {
            let mut state = self.lock();
            state.observed = true;
            (state.begin(Operation::Refetch), state.pages.len().max(1))
        };
        debug!(feed = %self.feed, epoch, pages = wanted, "refetching feed");

        let mut fresh = Vec::with_capacity(wanted);
        let mut cursor = None;
        let mut failure = None;
        while fresh.len() < wanted {
            if self.current_epoch() != epoch {
                return self.discard(epoch);
            }
            match self.fetch_with_retry(cursor.clone()).await {
                Ok(page) => {
                    cursor.clone_from(&page.cursor);
                    fresh.push(page);
                    if cursor.is_none() {
                        break;
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let mut state = self.lock();
        if state.epoch != epoch {
            drop(state);
            return self.discard(epoch);
        }
        state.in_flight = None;
        if let Some(err) = failure {
            state.error = Some(err.clone());
            drop(state);
            return self.fail(err);
        }
        let pages = fresh.len();
        state.pages = Arc::new(fresh);
        state.error = None;
        state.updated_at = Some(Instant::now());
        drop(state);

        info!(feed = %self.feed, pages, "feed refetched");
        self.emit(FeedEvent::FeedRefetched {
            feed: self.feed,
            pages,
        });
        FetchOutcome::Refetched { pages }
    }

    /// Foreground focus regained: refetch in the background when stale.
    pub async fn on_focus(&self) -> FetchOutcome {
        self.refresh_if_stale().await
    }

    /// Mark loaded data stale without dropping it.
    pub fn invalidate(&self) {
        self.lock().updated_at = None;
    }

    /// Drop all pages and errors and supersede any running operation.
    pub fn reset(&self) {
        let mut state = self.lock();
        let epoch = state.epoch + 1;
        *state = PagerState::new();
        state.epoch = epoch;
        drop(state);
        debug!(feed = %self.feed, epoch, "pager reset");
    }

    async fn refresh_if_stale(&self) -> FetchOutcome {
        let gate = self.lock().refresh_gate(self.options.stale_time);
        match gate {
            Some(reason) => FetchOutcome::Skipped(reason),
            None => self.refetch().await,
        }
    }

    async fn fetch_with_retry(&self, cursor: Option<String>) -> Result<FeedPage<T>, FeedError> {
        let mut attempt = 0;
        loop {
            match self.source.fetch_page(cursor.clone()).await {
                Ok(page) => return Ok(page),
                Err(err) if attempt < self.options.retry => {
                    let delay = retry_delay(self.options.retry_delay, attempt);
                    warn!(
                        feed = %self.feed,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "page fetch failed; retrying"
                    );
                    attempt += 1;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    return Err(FeedError::FetchFailed {
                        feed: self.feed,
                        message: format!("{err:#}"),
                    });
                }
            }
        }
    }

    fn settle_append(&self, epoch: u64, result: Result<FeedPage<T>, FeedError>) -> FetchOutcome {
        let mut state = self.lock();
        if state.epoch != epoch {
            drop(state);
            return self.discard(epoch);
        }
        state.in_flight = None;
        let page = match result {
            Ok(page) => page,
            Err(err) => {
                state.error = Some(err.clone());
                drop(state);
                return self.fail(err);
            }
        };

        let items = page.items.len();
        let has_next_page = page.has_next();
        let pages = Arc::make_mut(&mut state.pages);
        pages.push(page);
        let page_index = pages.len() - 1;
        state.updated_at = Some(Instant::now());
        drop(state);

        info!(feed = %self.feed, page_index, items, has_next_page, "page appended");
        self.emit(FeedEvent::PageAppended {
            feed: self.feed,
            page_index,
            items,
            has_next_page,
        });
        FetchOutcome::Appended { page_index, items }
    }

    fn fail(&self, err: FeedError) -> FetchOutcome {
        warn!(feed = %self.feed, error = %err, "page fetch failed");
        self.emit(FeedEvent::PageFetchFailed {
            feed: self.feed,
            message: err.to_string(),
        });
        FetchOutcome::Failed(err)
    }

    fn discard(&self, epoch: u64) -> FetchOutcome {
        debug!(feed = %self.feed, epoch, "discarding superseded completion");
        self.emit(FeedEvent::StaleResultDiscarded {
            feed: self.feed,
            epoch,
        });
        FetchOutcome::Discarded { epoch }
    }

    fn current_epoch(&self) -> u64 {
        self.lock().epoch
    }

    fn emit(&self, event: FeedEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, PagerState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use anyhow::anyhow;
    use async_trait::async_trait;

    type Scripted = anyhow::Result<FeedPage<&'static str>>;

    #[derive(Default)]
    struct QueueSource {
        responses: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<Option<String>>>,
    }

    impl QueueSource {
        fn with(responses: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<Option<String>> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl PageSource<&'static str> for QueueSource {
        async fn fetch_page(&self, cursor: Option<String>) -> Scripted {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(cursor);
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }
    }

    fn page(cursor: Option<&str>, items: &[&'static str]) -> Scripted {
        Ok(FeedPage::new(cursor.map(str::to_string), items.to_vec()))
    }

    fn options(retry: u32) -> PagerOptions {
        PagerOptions {
            stale_time: Duration::from_secs(60),
            retry,
            retry_delay: Duration::ZERO,
        }
    }

    fn pager(source: &Arc<QueueSource>, retry: u32) -> CursorPager<&'static str> {
        CursorPager::new(FeedKind::ForYou, source.clone(), options(retry))
    }

    #[tokio::test]
    async fn cursors_chain_and_exhaustion_stops_paging() {
        let source = QueueSource::with(vec![
            page(Some("c1"), &["A", "B"]),
            page(None, &["C"]),
        ]);
        let pager = pager(&source, 0);

        assert_eq!(pager.fetch_next_page().await, FetchOutcome::Skipped(SkipReason::NoNextPage));
        assert_eq!(
            pager.observe().await,
            FetchOutcome::Appended {
                page_index: 0,
                items: 2
            }
        );
        assert!(pager.snapshot().has_next_page());
        pager.fetch_next_page().await;

        let snapshot = pager.snapshot();
        assert_eq!(snapshot.items().copied().collect::<Vec<_>>(), ["A", "B", "C"]);
        assert!(!snapshot.has_next_page());
        assert_eq!(source.requests(), vec![None, Some("c1".to_string())]);
        assert_eq!(
            pager.fetch_next_page().await,
            FetchOutcome::Skipped(SkipReason::NoNextPage)
        );
    }

    #[tokio::test]
    async fn second_observation_of_fresh_feed_is_skipped() {
        let source = QueueSource::with(vec![page(Some("c1"), &["A"])]);
        let pager = pager(&source, 0);
        pager.observe().await;
        assert_eq!(pager.observe().await, FetchOutcome::Skipped(SkipReason::Fresh));
        assert_eq!(pager.on_focus().await, FetchOutcome::Skipped(SkipReason::Fresh));
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn focus_before_observation_does_nothing() {
        let source = QueueSource::with(Vec::new());
        let pager = pager(&source, 0);
        assert_eq!(
            pager.on_focus().await,
            FetchOutcome::Skipped(SkipReason::NotObserved)
        );
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn retry_recovers_transient_failure() {
        let source = QueueSource::with(vec![Err(anyhow!("flaky")), page(None, &["A"])]);
        let pager = pager(&source, 1);
        assert!(matches!(pager.observe().await, FetchOutcome::Appended { .. }));
        assert!(!pager.snapshot().is_error());
        assert_eq!(source.requests(), vec![None, None]);
    }

    #[tokio::test]
    async fn failure_keeps_pages_until_refetch_succeeds() {
        let source = QueueSource::with(vec![
            page(Some("c1"), &["A"]),
            Err(anyhow!("boom")),
            page(Some("c1"), &["A2"]),
        ]);
        let pager = pager(&source, 0);
        pager.observe().await;

        let outcome = pager.fetch_next_page().await;
        assert!(matches!(outcome, FetchOutcome::Failed(FeedError::FetchFailed { .. })));
        let snapshot = pager.snapshot();
        assert!(snapshot.is_error());
        assert_eq!(snapshot.item_count(), 1);

        assert_eq!(pager.refetch().await, FetchOutcome::Refetched { pages: 1 });
        let snapshot = pager.snapshot();
        assert!(!snapshot.is_error());
        assert_eq!(snapshot.items().copied().collect::<Vec<_>>(), ["A2"]);
    }

    #[tokio::test]
    async fn refetch_reloads_every_loaded_page() {
        let source = QueueSource::with(vec![
            page(Some("c1"), &["A"]),
            page(Some("c2"), &["B"]),
            page(Some("n1"), &["A'"]),
            page(Some("n2"), &["B'"]),
        ]);
        let pager = pager(&source, 0);
        pager.observe().await;
        pager.fetch_next_page().await;

        assert_eq!(pager.refetch().await, FetchOutcome::Refetched { pages: 2 });
        assert_eq!(
            source.requests(),
            vec![
                None,
                Some("c1".to_string()),
                None,
                Some("n1".to_string())
            ]
        );
        assert_eq!(pager.snapshot().next_cursor(), Some("n2"));
    }

    #[tokio::test]
    async fn invalidate_marks_data_stale() {
        let source = QueueSource::with(vec![page(None, &["A"]), page(None, &["B"])]);
        let pager = pager(&source, 0);
        pager.observe().await;
        assert!(!pager.is_stale());

        pager.invalidate();
        assert!(pager.is_stale());
        assert_eq!(pager.on_focus().await, FetchOutcome::Refetched { pages: 1 });
    }

    #[tokio::test]
    async fn reset_clears_pages() {
        let source = QueueSource::with(vec![page(None, &["A"])]);
        let pager = pager(&source, 0);
        pager.observe().await;
        pager.reset();
        let snapshot = pager.snapshot();
        assert!(snapshot.pages.is_empty());
        assert!(!pager.is_observed());
    }

    #[test]
    fn retry_delay_doubles_and_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(retry_delay(base, 0), Duration::from_secs(1));
        assert_eq!(retry_delay(base, 3), Duration::from_secs(8));
        assert_eq!(retry_delay(base, 10), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(Duration::ZERO, 4), Duration::ZERO);
    }
}
