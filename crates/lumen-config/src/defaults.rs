//! Baseline configuration values.
//!
//! # Design
//! - Centralize defaults so the loader, docs, and tests agree.
//! - Values mirror what the production web client shipped with.

/// Default feed API base URL.
pub const API_BASE_URL: &str = "http://localhost:8080/api/v1";
/// Items requested per For You page.
pub const FOR_YOU_PAGE_SIZE: u32 = 20;
/// Slides requested per News page.
pub const NEWS_PAGE_SIZE: u32 = 10;
/// Items requested per bookmarks page.
pub const BOOKMARKS_PAGE_SIZE: u32 = 20;
/// Seconds before loaded pages are considered stale.
pub const STALE_TIME_SECS: u64 = 60;
/// Extra attempts made for a failed page request.
pub const FETCH_RETRY: u32 = 1;
/// Base delay before the first retry; doubles per attempt up to 30 seconds.
pub const FETCH_RETRY_DELAY_MS: u64 = 1_000;
/// Visible fraction required before a view is recorded.
pub const VIEW_THRESHOLD: f64 = 0.5;
/// Fire at most one view per mounted item by default.
pub const TRACK_ONCE: bool = true;
/// Seconds skipped backwards by the rewind control.
pub const REWIND_SECS: f64 = 15.0;
/// Initial playback rate.
pub const PLAYBACK_SPEED: f64 = 1.0;
