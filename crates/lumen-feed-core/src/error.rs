//! Error types for feed engine operations.

use lumen_models::{FeedKind, InteractionKind};
use thiserror::Error;

/// Feed load failure retained in pager snapshots until a refetch succeeds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The page source rejected every attempt.
    #[error("failed to load {feed} feed: {message}")]
    FetchFailed {
        /// Feed whose page could not be loaded.
        feed: FeedKind,
        /// Rendered source error.
        message: String,
    },
}

impl FeedError {
    /// Feed the error belongs to.
    #[must_use]
    pub const fn feed(&self) -> FeedKind {
        match self {
            Self::FetchFailed { feed, .. } => *feed,
        }
    }
}

/// Remote interaction failure. Recovered locally by rollback and never
/// surfaced as a blocking error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    /// Record/remove call was rejected.
    #[error("{kind} interaction for {content_id} failed: {message}")]
    RemoteFailed {
        /// Target content.
        content_id: String,
        /// Interaction kind that was sent.
        kind: InteractionKind,
        /// Rendered remote error.
        message: String,
    },
}
