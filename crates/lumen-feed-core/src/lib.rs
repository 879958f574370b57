#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs)]

//! Feed interaction and synchronization engine.
//!
//! Turns scroll geometry into an active item, paginates cursor-based feeds,
//! applies optimistic like/bookmark state with rollback and reconciliation,
//! and deduplicates view events against the viewport.
//!
//! Layout: `store.rs` (interaction state), `pager.rs` (cursor pagination),
//! `mutation.rs` (optimistic coordinator), `scroll.rs` (active-item resolver),
//! `view_tracker.rs` (viewport views), `playback.rs` (player driver),
//! `engine.rs`/`session.rs` (wiring), `source.rs` (collaborator traits),
//! `mock.rs` (simulated backend), `error.rs`.

pub mod engine;
pub mod error;
pub mod mock;
pub mod mutation;
pub mod pager;
pub mod playback;
pub mod scroll;
pub mod session;
pub mod source;
pub mod store;
pub mod view_tracker;

pub use engine::{EngineParts, FeedEngine, FeedMode, FeedReconciler, FeedStatus};
pub use error::{FeedError, MutationError};
pub use mock::SimulatedBackend;
pub use mutation::{MutationCoordinator, MutationOutcome, ReconcileScope, Reconciler, ToggleKind};
pub use pager::{CursorPager, FetchOutcome, PagerOptions, PagerSnapshot, SkipReason};
pub use playback::{PlaybackDriver, Player};
pub use scroll::{LoadGate, ScrollDecision, ScrollGeometry, ScrollResolver, active_index};
pub use session::{FeedSession, ScrollResponse};
pub use source::{
    BookmarkPages, FeedClient, ForYouPages, InteractionClient, NewsPages, PageSource,
};
pub use store::{InteractionState, InteractionStore};
pub use view_tracker::{IntersectionEntry, TrackedItem, ViewTracker};
