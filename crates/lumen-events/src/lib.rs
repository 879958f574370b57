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

//! Engine event bus for the Lumen feed client.
//!
//! The bus carries typed [`FeedEvent`]s with sequential identifiers and keeps
//! a bounded replay ring so late subscribers (the CLI event log, integration tests)
//! can catch up. Internally it uses `tokio::broadcast`; publishers never block
//! and the oldest events are dropped when the ring is full.
//!
//! Layout: `payloads.rs` (event types), `routing.rs` (bus + stream).

pub mod payloads;
pub mod routing;

pub use payloads::{
    DEFAULT_REPLAY_CAPACITY, EventEnvelope, EventId, FeedEvent, MutationResolution,
};
pub use routing::{EventBus, EventStream};
