//! Feed engine wiring.
//!
//! # Design
//! - One pager per feed identity, one store, one coordinator, one tracker and
//!   one event bus, all cheap clonable handles.
//! - Reconciliation refetches only pagers that have been observed; an
//!   unobserved feed has nothing on screen to correct.
//! - Refetches scheduled by the reconciler run in the background.

use std::sync::Arc;

use lumen_config::{LumenConfig, PlaybackConfig, TrackingConfig};
use lumen_events::EventBus;
use lumen_models::{ContentItem, FeedKind, NewsSlide};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::mutation::{MutationCoordinator, ReconcileScope, Reconciler};
use crate::pager::{CursorPager, FetchOutcome, PagerOptions, PagerSnapshot};
use crate::source::{
    BookmarkPages, FeedClient, ForYouPages, InteractionClient, NewsPages, PageSource,
};
use crate::store::InteractionStore;
use crate::view_tracker::ViewTracker;

/// Whether the feed data is live or a static built-in set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Paged from the feed API.
    Live,
    /// Built-in data; infinite scroll is disabled.
    Static,
}

impl FeedMode {
    /// Mode implied by configuration.
    #[must_use]
    pub const fn from_config(config: &LumenConfig) -> Self {
        if config.infinite_scroll() {
            Self::Live
        } else {
            Self::Static
        }
    }

    /// Whether scroll may request more pages.
    #[must_use]
    pub const fn infinite_scroll(self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Type-erased pager summary for renderers and the CLI.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStatus {
    /// Feed identity.
    pub feed: FeedKind,
    /// Loaded pages.
    pub pages: usize,
    /// Items across all pages.
    pub items: usize,
    /// Latest page carries a cursor.
    pub has_next_page: bool,
    /// Initial load running.
    pub is_loading: bool,
    /// Next-page fetch running.
    pub is_fetching_next_page: bool,
    /// Refetch running.
    pub is_refetching: bool,
    /// Retained error message.
    pub error: Option<String>,
}

impl FeedStatus {
    /// Whether any fetch is running.
    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.is_loading || self.is_fetching_next_page || self.is_refetching
    }
}

impl<T> From<&PagerSnapshot<T>> for FeedStatus {
    fn from(snapshot: &PagerSnapshot<T>) -> Self {
        Self {
            feed: snapshot.feed,
            pages: snapshot.pages.len(),
            items: snapshot.item_count(),
            has_next_page: snapshot.has_next_page(),
            is_loading: snapshot.is_loading,
            is_fetching_next_page: snapshot.is_fetching_next_page,
            is_refetching: snapshot.is_refetching,
            error: snapshot.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Explicit collaborators for [`FeedEngine::from_parts`].
pub struct EngineParts {
    /// For You page source.
    pub for_you: Arc<dyn PageSource<ContentItem>>,
    /// News page source.
    pub news: Arc<dyn PageSource<NewsSlide>>,
    /// Saved-items page source.
    pub bookmarks: Arc<dyn PageSource<ContentItem>>,
    /// Interaction side-effects.
    pub interactions: Arc<dyn InteractionClient>,
    /// Pager caching and retry knobs.
    pub pager: PagerOptions,
    /// View tracking behaviour.
    pub tracking: TrackingConfig,
    /// Playback defaults.
    pub playback: PlaybackConfig,
    /// Live or static data.
    pub mode: FeedMode,
}

/// Refetches observed pagers in the requested scope.
#[derive(Debug, Clone)]
pub struct FeedReconciler {
    for_you: CursorPager<ContentItem>,
    news: CursorPager<NewsSlide>,
    bookmarks: CursorPager<ContentItem>,
}

impl FeedReconciler {
    /// Spawn a refetch of `feed` if it has been observed.
    pub fn spawn_refetch(&self, feed: FeedKind) -> Option<JoinHandle<FetchOutcome>> {
        match feed {
            FeedKind::ForYou => spawn_refetch(&self.for_you),
            FeedKind::News => spawn_refetch(&self.news),
            FeedKind::Bookmarks => spawn_refetch(&self.bookmarks),
        }
    }
}

fn spawn_refetch<T>(pager: &CursorPager<T>) -> Option<JoinHandle<FetchOutcome>>
where
    T: Clone + Send + Sync + 'static,
{
    if !pager.is_observed() {
        debug!(feed = %pager.feed(), "reconcile skipped for unobserved feed");
        return None;
    }
    let pager = pager.clone();
    Some(tokio::spawn(async move { pager.refetch().await }))
}

impl Reconciler for FeedReconciler {
    fn schedule(&self, scope: ReconcileScope) {
        for feed in scope.feeds() {
            drop(self.spawn_refetch(*feed));
        }
    }
}

/// Owns every engine component for one client session.
#[derive(Debug, Clone)]
pub struct FeedEngine {
    store: InteractionStore,
    for_you: CursorPager<ContentItem>,
    news: CursorPager<NewsSlide>,
    bookmarks: CursorPager<ContentItem>,
    reconciler: FeedReconciler,
    coordinator: MutationCoordinator,
    tracker: ViewTracker,
    events: EventBus,
    playback: PlaybackConfig,
    mode: FeedMode,
}

impl FeedEngine {
    /// Build an engine from configuration and API clients.
    #[must_use]
    pub fn new(
        config: &LumenConfig,
        feeds: Arc<dyn FeedClient>,
        interactions: Arc<dyn InteractionClient>,
    ) -> Self {
        let tuning = &config.feeds;
        Self::from_parts(EngineParts {
            for_you: Arc::new(ForYouPages::new(
                Arc::clone(&feeds),
                tuning.for_you_page_size,
            )),
            news: Arc::new(NewsPages::new(Arc::clone(&feeds), tuning.news_page_size)),
            bookmarks: Arc::new(BookmarkPages::new(feeds, tuning.bookmarks_page_size)),
            interactions,
            pager: PagerOptions::from_tuning(tuning),
            tracking: config.tracking,
            playback: config.playback,
            mode: FeedMode::from_config(config),
        })
    }

    /// Build an engine from explicit collaborators.
    #[must_use]
    pub fn from_parts(parts: EngineParts) -> Self {
        let events = EventBus::new();
        let store = InteractionStore::new();
        store.set_playback_speed(parts.playback.default_speed);

        let for_you = CursorPager::new(FeedKind::ForYou, parts.for_you, parts.pager)
            .with_events(events.clone());
        let news =
            CursorPager::new(FeedKind::News, parts.news, parts.pager).with_events(events.clone());
        let bookmarks = CursorPager::new(FeedKind::Bookmarks, parts.bookmarks, parts.pager)
            .with_events(events.clone());

        let reconciler = FeedReconciler {
            for_you: for_you.clone(),
            news: news.clone(),
            bookmarks: bookmarks.clone(),
        };
        let coordinator = MutationCoordinator::new(
            store.clone(),
            Arc::clone(&parts.interactions),
            Arc::new(reconciler.clone()),
        )
        .with_events(events.clone());
        let tracker =
            ViewTracker::new(parts.interactions, parts.tracking).with_events(events.clone());

        Self {
            store,
            for_you,
            news,
            bookmarks,
            reconciler,
            coordinator,
            tracker,
            events,
            playback: parts.playback,
            mode: parts.mode,
        }
    }

    /// Shared interaction store.
    #[must_use]
    pub const fn store(&self) -> &InteractionStore {
        &self.store
    }

    /// For You pager.
    #[must_use]
    pub const fn for_you(&self) -> &CursorPager<ContentItem> {
        &self.for_you
    }

    /// News pager.
    #[must_use]
    pub const fn news(&self) -> &CursorPager<NewsSlide> {
        &self.news
    }

    /// Saved-items pager.
    #[must_use]
    pub const fn bookmarks(&self) -> &CursorPager<ContentItem> {
        &self.bookmarks
    }

    /// Reconciler shared with the coordinator.
    #[must_use]
    pub const fn reconciler(&self) -> &FeedReconciler {
        &self.reconciler
    }

    /// Optimistic mutation coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    /// View tracker.
    #[must_use]
    pub const fn tracker(&self) -> &ViewTracker {
        &self.tracker
    }

    /// Engine event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Playback defaults.
    #[must_use]
    pub const fn playback_config(&self) -> PlaybackConfig {
        self.playback
    }

    /// Live or static data.
    #[must_use]
    pub const fn mode(&self) -> FeedMode {
        self.mode
    }

    /// Summary of one feed.
    #[must_use]
    pub fn status(&self, feed: FeedKind) -> FeedStatus {
        match feed {
            FeedKind::ForYou => FeedStatus::from(&self.for_you.snapshot()),
            FeedKind::News => FeedStatus::from(&self.news.snapshot()),
            FeedKind::Bookmarks => FeedStatus::from(&self.bookmarks.snapshot()),
        }
    }

    /// Observe `feed` (first load or stale refresh).
    pub async fn observe(&self, feed: FeedKind) -> FetchOutcome {
        match feed {
            FeedKind::ForYou => self.for_you.observe().await,
            FeedKind::News => self.news.observe().await,
            FeedKind::Bookmarks => self.bookmarks.observe().await,
        }
    }

    /// Request the next page of `feed`.
    pub async fn fetch_next_page(&self, feed: FeedKind) -> FetchOutcome {
        match feed {
            FeedKind::ForYou => self.for_you.fetch_next_page().await,
            FeedKind::News => self.news.fetch_next_page().await,
            FeedKind::Bookmarks => self.bookmarks.fetch_next_page().await,
        }
    }

    /// Refetch `feed` from the first page.
    pub async fn refetch(&self, feed: FeedKind) -> FetchOutcome {
        match feed {
            FeedKind::ForYou => self.for_you.refetch().await,
            FeedKind::News => self.news.refetch().await,
            FeedKind::Bookmarks => self.bookmarks.refetch().await,
        }
    }

    /// Foreground focus regained for `feed`.
    pub async fn on_focus(&self, feed: FeedKind) -> FetchOutcome {
        match feed {
            FeedKind::ForYou => self.for_you.on_focus().await,
            FeedKind::News => self.news.on_focus().await,
            FeedKind::Bookmarks => self.bookmarks.on_focus().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_follows_mock_flag() {
        let mut config = LumenConfig::default();
        assert_eq!(FeedMode::from_config(&config), FeedMode::Live);
        config.api.use_mock_data = true;
        let mode = FeedMode::from_config(&config);
        assert_eq!(mode, FeedMode::Static);
        assert!(!mode.infinite_scroll());
    }
}
