#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs)]
#![allow(clippy::multiple_crate_versions)]
//! Shared feed DTOs for the Lumen client.
//!
//! These types mirror the JSON served by the feed API so the engine, the
//! simulated backend, and the CLI all speak the same contract. Items are
//! read-only from the client's perspective: nothing in this crate mutates
//! engagement counters.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content categories served by the feed API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// Long-form written article.
    Article,
    /// Video clip.
    Video,
    /// Short social post.
    Tweet,
    /// User comment surfaced as content.
    Comment,
    /// Podcast episode or audio segment.
    Podcast,
}

impl ContentType {
    /// Whether the item carries playable media (video or audio).
    #[must_use]
    pub const fn is_playable(self) -> bool {
        matches!(self, Self::Video | Self::Podcast)
    }
}

/// Processing status attached to CMS-managed content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStatus {
    /// Awaiting ingestion.
    Pending,
    /// Ingestion in progress.
    Processing,
    /// Published and servable.
    Ready,
    /// Ingestion failed.
    Failed,
    /// Removed from rotation.
    Archived,
}

/// Single feed entry as returned by the API.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    /// Stable content identifier.
    pub id: String,
    /// Content category.
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Display title.
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Full body text for written content.
    pub body_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Short summary.
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Playable media location.
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Poster / thumbnail image.
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Canonical link to the original source.
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Media duration in seconds.
    pub duration_sec: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Author display name.
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Publisher display name.
    pub source_name: Option<String>,
    /// Server-side like counter.
    pub like_count: u64,
    /// Server-side comment counter.
    pub comment_count: u64,
    /// Server-side share counter.
    pub share_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Server-side view counter.
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Transcript reference for audio/video content.
    pub transcript_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Topic tags assigned by the CMS.
    pub topic_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Feed the item was ingested from.
    pub source_feed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Free-form CMS metadata.
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Processing status.
    pub status: Option<ContentStatus>,
    /// Publication timestamp.
    pub published_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Whether the requesting user liked the item (server view).
    pub is_liked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Whether the requesting user bookmarked the item (server view).
    pub is_bookmarked: Option<bool>,
}

/// News feed slide: one featured item plus related coverage.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsSlide {
    /// Slide identifier.
    pub slide_id: String,
    /// Headline item.
    pub featured: ContentItem,
    /// Related items shown alongside the headline, in server order.
    #[serde(default)]
    pub related: Vec<ContentItem>,
}

/// One fetch result from a cursor-paginated feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedPage<T> {
    /// Cursor for the following page; `None` when the feed is exhausted.
    pub cursor: Option<String>,
    /// Items in server order.
    pub items: Vec<T>,
}

impl<T> FeedPage<T> {
    /// Build a page from a cursor and items.
    #[must_use]
    pub const fn new(cursor: Option<String>, items: Vec<T>) -> Self {
        Self { cursor, items }
    }

    /// Whether another page can be requested after this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.cursor.is_some()
    }
}

/// Wire shape of the For You (and bookmarks) endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForYouResponse {
    /// Next cursor or null.
    pub cursor: Option<String>,
    /// Items for this page.
    #[serde(default)]
    pub items: Vec<ContentItem>,
}

impl From<ForYouResponse> for FeedPage<ContentItem> {
    fn from(value: ForYouResponse) -> Self {
        Self::new(value.cursor, value.items)
    }
}

/// Wire shape of the News endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsResponse {
    /// Next cursor or null.
    pub cursor: Option<String>,
    /// Slides for this page.
    #[serde(default)]
    pub slides: Vec<NewsSlide>,
}

impl From<NewsResponse> for FeedPage<NewsSlide> {
    fn from(value: NewsResponse) -> Self {
        Self::new(value.cursor, value.slides)
    }
}

/// Kinds of user interaction recorded against content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Reversible like.
    Like,
    /// Reversible bookmark.
    Bookmark,
    /// Share action.
    Share,
    /// Item became visible.
    View,
    /// Playback reached the end.
    Complete,
}

impl InteractionKind {
    /// Wire label used in query strings and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Bookmark => "bookmark",
            Self::Share => "share",
            Self::View => "view",
            Self::Complete => "complete",
        }
    }

    /// Whether the interaction can be removed again by the user.
    #[must_use]
    pub const fn is_reversible(self) -> bool {
        matches!(self, Self::Like | Self::Bookmark)
    }
}

impl Display for InteractionKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Server record of a user interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interaction {
    /// Interaction identifier.
    pub id: String,
    /// Content the interaction targets.
    pub content_item_id: String,
    /// Interaction kind.
    pub interaction_type: InteractionKind,
    /// Server timestamp.
    pub created_at: DateTime<Utc>,
}

/// Body of a record-interaction request.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRequest {
    /// Content the interaction targets.
    pub content_item_id: String,
    /// Interaction kind.
    pub interaction_type: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional structured metadata (view ratio, timestamps, ...).
    pub metadata: Option<Value>,
}

impl InteractionRequest {
    /// Persisted form of this request as the server would acknowledge it.
    #[must_use]
    pub fn accept(self, id: String, created_at: DateTime<Utc>) -> Interaction {
        Interaction {
            id,
            content_item_id: self.content_item_id,
            interaction_type: self.interaction_type,
            created_at,
        }
    }
}

/// Feed identities the client can display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedKind {
    /// Personalised vertical video/audio feed.
    #[serde(rename = "foryou")]
    ForYou,
    /// News slides feed.
    #[serde(rename = "news")]
    News,
    /// Saved items list.
    #[serde(rename = "bookmarks")]
    Bookmarks,
}

impl FeedKind {
    /// Stable cache key for the feed.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::ForYou => "foryou",
            Self::News => "news",
            Self::Bookmarks => "bookmarks",
        }
    }

    /// Feeds whose counters are refreshed after a like settles.
    #[must_use]
    pub const fn engagement_feeds() -> [Self; 2] {
        [Self::ForYou, Self::News]
    }
}

impl Display for FeedKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.key())
    }
}

/// Error returned when parsing an unknown feed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFeed(pub String);

impl Display for UnknownFeed {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown feed '{}'", self.0)
    }
}

impl std::error::Error for UnknownFeed {}

impl FromStr for FeedKind {
    type Err = UnknownFeed;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "foryou" | "for-you" | "for_you" => Ok(Self::ForYou),
            "news" => Ok(Self::News),
            "bookmarks" => Ok(Self::Bookmarks),
            other => Err(UnknownFeed(other.to_string())),
        }
    }
}
