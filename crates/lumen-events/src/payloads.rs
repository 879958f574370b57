//! Event payload types emitted by the feed engine.

use chrono::{DateTime, Utc};
use lumen_models::{FeedKind, InteractionKind};
use serde::{Deserialize, Serialize};

/// Identifier assigned to each event emitted by the engine.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// How an optimistic mutation ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationResolution {
    /// Remote call succeeded; the optimistic state stands.
    Committed,
    /// Remote call failed and the optimistic toggle was reverted.
    RolledBack,
    /// Remote call failed but a newer mutation owns the flag, so no rollback ran.
    Superseded,
}

/// Typed engine events.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// The visible feed identity changed (or was remounted).
    FeedSwitched {
        /// Previously visible feed, if any.
        from: Option<FeedKind>,
        /// Newly visible feed.
        to: FeedKind,
    },
    /// A page was appended to a feed.
    PageAppended {
        /// Owning feed.
        feed: FeedKind,
        /// Zero-based index of the new page.
        page_index: usize,
        /// Number of items on the page.
        items: usize,
        /// Whether the feed reports another page.
        has_next_page: bool,
    },
    /// A page fetch failed after retries.
    PageFetchFailed {
        /// Owning feed.
        feed: FeedKind,
        /// Error rendered for display.
        message: String,
    },
    /// A full refetch replaced the feed's pages.
    FeedRefetched {
        /// Owning feed.
        feed: FeedKind,
        /// Number of pages after the refetch.
        pages: usize,
    },
    /// A completion arrived for a superseded request and was dropped.
    StaleResultDiscarded {
        /// Owning feed.
        feed: FeedKind,
        /// Epoch captured when the request was issued.
        epoch: u64,
    },
    /// The active item moved.
    ActiveIndexChanged {
        /// Visible feed.
        feed: FeedKind,
        /// New active index.
        index: usize,
    },
    /// The scroll resolver asked for the next page.
    LoadMoreRequested {
        /// Visible feed.
        feed: FeedKind,
    },
    /// An optimistic like/bookmark settled.
    MutationSettled {
        /// Target content.
        content_id: String,
        /// Interaction kind.
        kind: InteractionKind,
        /// Per-key sequence number of the invocation.
        sequence: u64,
        /// How the mutation ended.
        resolution: MutationResolution,
    },
    /// A view crossed the visibility threshold and was dispatched.
    ViewTracked {
        /// Viewed content.
        content_id: String,
        /// Observed intersection ratio.
        ratio: f64,
    },
}

impl FeedEvent {
    /// Machine-friendly discriminator for log consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FeedSwitched { .. } => "feed_switched",
            Self::PageAppended { .. } => "page_appended",
            Self::PageFetchFailed { .. } => "page_fetch_failed",
            Self::FeedRefetched { .. } => "feed_refetched",
            Self::StaleResultDiscarded { .. } => "stale_result_discarded",
            Self::ActiveIndexChanged { .. } => "active_index_changed",
            Self::LoadMoreRequested { .. } => "load_more_requested",
            Self::MutationSettled { .. } => "mutation_settled",
            Self::ViewTracked { .. } => "view_tracked",
        }
    }
}

/// Metadata wrapper around events.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event.
    pub event: FeedEvent,
}
