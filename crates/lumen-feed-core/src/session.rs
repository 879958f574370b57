//! Visible-feed session: applies scroll decisions and user actions to the
//! engine for whichever feed is currently on screen.

use std::sync::Arc;

use lumen_events::FeedEvent;
use lumen_models::FeedKind;
use tokio::task::JoinHandle;
use tracing::info;

use crate::engine::FeedEngine;
use crate::mutation::MutationOutcome;
use crate::pager::FetchOutcome;
use crate::playback::{PlaybackDriver, Player};
use crate::scroll::{LoadGate, ScrollDecision, ScrollGeometry, ScrollResolver};
use crate::view_tracker::TrackedItem;

/// Result of feeding one scroll observation to the session.
#[derive(Debug)]
pub struct ScrollResponse {
    /// What the resolver decided.
    pub decision: ScrollDecision,
    /// Background next-page fetch, when one was requested.
    pub load: Option<JoinHandle<FetchOutcome>>,
}

/// Tracks the visible feed identity and routes events to the engine.
#[derive(Debug, Clone)]
pub struct FeedSession {
    engine: FeedEngine,
    resolver: ScrollResolver,
    current: Option<FeedKind>,
}

impl FeedSession {
    /// Start a session with no visible feed.
    #[must_use]
    pub fn new(engine: FeedEngine) -> Self {
        let resolver = ScrollResolver::new(engine.mode().infinite_scroll());
        Self {
            engine,
            resolver,
            current: None,
        }
    }

    /// Underlying engine.
    #[must_use]
    pub const fn engine(&self) -> &FeedEngine {
        &self.engine
    }

    /// Visible feed, if any.
    #[must_use]
    pub const fn current(&self) -> Option<FeedKind> {
        self.current
    }

    /// Show `feed`: the view starts at the top with progress reset, then the
    /// feed is observed.
    pub async fn switch_to(&mut self, feed: FeedKind) -> FetchOutcome {
        let from = self.current.replace(feed);
        self.engine.store().reset_view();
        info!(?from, to = %feed, "feed switched");
        self.engine
            .events()
            .publish(FeedEvent::FeedSwitched { from, to: feed });
        self.engine.observe(feed).await
    }

    /// Remount the visible feed: same reset as a switch, cached pages kept.
    pub async fn remount(&mut self) -> Option<FetchOutcome> {
        let feed = self.current?;
        Some(self.switch_to(feed).await)
    }

    /// Apply one scroll observation for the visible feed.
    pub fn on_scroll(&self, geometry: &ScrollGeometry) -> ScrollResponse {
        let Some(feed) = self.current else {
            return ScrollResponse {
                decision: ScrollDecision::default(),
                load: None,
            };
        };
        let store = self.engine.store();
        let status = self.engine.status(feed);
        let gate = LoadGate {
            has_next_page: status.has_next_page,
            is_fetching: status.is_fetching(),
        };
        let decision = self.resolver.resolve(geometry, store.active_index(), gate);

        if let Some(index) = decision.index_change {
            store.set_active_index(index);
            store.reset_progress();
            self.engine
                .events()
                .publish(FeedEvent::ActiveIndexChanged { feed, index });
        }

        let load = decision.load_more.then(|| {
            self.engine
                .events()
                .publish(FeedEvent::LoadMoreRequested { feed });
            let engine = self.engine.clone();
            tokio::spawn(async move { engine.fetch_next_page(feed).await })
        });
        ScrollResponse { decision, load }
    }

    /// The client regained focus; refresh the visible feed when stale.
    pub async fn on_focus(&self) -> Option<FetchOutcome> {
        let feed = self.current?;
        Some(self.engine.on_focus(feed).await)
    }

    /// Toggle like for `content_id` using the flag currently shown.
    pub async fn like(&self, content_id: &str) -> MutationOutcome {
        let current = self.engine.store().is_liked(content_id);
        self.engine.coordinator().like(content_id, current).await
    }

    /// Toggle bookmark for `content_id` using the flag currently shown.
    pub async fn bookmark(&self, content_id: &str) -> MutationOutcome {
        let current = self.engine.store().is_bookmarked(content_id);
        self.engine
            .coordinator()
            .bookmark(content_id, current)
            .await
    }

    /// Register a mounted item for view tracking.
    #[must_use]
    pub fn track(&self, content_id: &str) -> TrackedItem {
        self.engine.tracker().track(content_id)
    }

    /// Bind a player for `content_id`.
    #[must_use]
    pub fn playback(&self, content_id: &str, player: Arc<dyn Player>) -> PlaybackDriver {
        PlaybackDriver::new(
            content_id,
            player,
            self.engine.coordinator().clone(),
            self.engine.playback_config(),
        )
    }
}
