//! Content fixtures.

use chrono::{TimeZone, Utc};
use lumen_models::{ContentItem, ContentType, FeedPage, NewsSlide};

/// Minimal playable item with the given id.
#[must_use]
pub fn content_item(id: &str) -> ContentItem {
    let timestamp = Utc
        .with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_default();
    ContentItem {
        id: id.to_string(),
        kind: ContentType::Video,
        title: Some(format!("Item {id}")),
        body_text: None,
        excerpt: None,
        media_url: Some(format!("https://media.test/{id}.mp4")),
        thumbnail_url: None,
        original_url: None,
        duration_sec: Some(60),
        author: None,
        source_name: None,
        like_count: 0,
        comment_count: 0,
        share_count: 0,
        view_count: None,
        transcript_id: None,
        topic_tags: None,
        source_feed_url: None,
        metadata: None,
        status: None,
        published_at: timestamp,
        created_at: timestamp,
        updated_at: None,
        is_liked: None,
        is_bookmarked: None,
    }
}

/// Page of [`content_item`]s with the given cursor.
#[must_use]
pub fn item_page(cursor: Option<&str>, ids: &[&str]) -> FeedPage<ContentItem> {
    FeedPage::new(
        cursor.map(str::to_string),
        ids.iter().map(|id| content_item(id)).collect(),
    )
}

/// News slide featuring `featured` with `related` items.
#[must_use]
pub fn news_slide(slide_id: &str, featured: &str, related: &[&str]) -> NewsSlide {
    NewsSlide {
        slide_id: slide_id.to_string(),
        featured: content_item(featured),
        related: related.iter().map(|id| content_item(id)).collect(),
    }
}

/// Item ids in order.
#[must_use]
pub fn ids<'a>(items: impl IntoIterator<Item = &'a ContentItem>) -> Vec<String> {
    items.into_iter().map(|item| item.id.clone()).collect()
}
