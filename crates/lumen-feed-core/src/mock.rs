//! Simulated in-memory backend.
//!
//! Serves a fixed catalogue with artificial latency: For You and News always
//! hand out a next cursor (the same catalogue every page), bookmarks are
//! empty. Failures can be injected per capability.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lumen_models::{
    ContentItem, ContentStatus, ContentType, FeedPage, ForYouResponse, Interaction,
    InteractionKind, InteractionRequest, NewsResponse, NewsSlide,
};
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use crate::source::{FeedClient, InteractionClient};

/// Latency applied to page and item requests.
pub const PAGE_LATENCY: Duration = Duration::from_millis(800);
/// Latency applied to interaction requests.
pub const INTERACTION_LATENCY: Duration = Duration::from_millis(300);
/// Cursor returned for every infinite feed page.
pub const NEXT_CURSOR: &str = "next-cursor-token";

#[derive(Debug)]
struct Inner {
    page_latency: Duration,
    interaction_latency: Duration,
    fail_pages: AtomicBool,
    fail_interactions: AtomicBool,
    page_requests: AtomicUsize,
    items: Vec<ContentItem>,
    slides: Vec<NewsSlide>,
    interactions: Mutex<Vec<Interaction>>,
}

/// In-memory [`FeedClient`] + [`InteractionClient`].
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    inner: Arc<Inner>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    /// Backend with the default latencies.
    #[must_use]
    pub fn new() -> Self {
        Self::with_latency(PAGE_LATENCY, INTERACTION_LATENCY)
    }

    /// Backend with custom latencies (zero for tests).
    #[must_use]
    pub fn with_latency(page_latency: Duration, interaction_latency: Duration) -> Self {
        let (items, slides) = catalogue();
        Self {
            inner: Arc::new(Inner {
                page_latency,
                interaction_latency,
                fail_pages: AtomicBool::new(false),
                fail_interactions: AtomicBool::new(false),
                page_requests: AtomicUsize::new(0),
                items,
                slides,
                interactions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Make page requests fail until cleared.
    pub fn fail_pages(&self, fail: bool) {
        self.inner.fail_pages.store(fail, Ordering::SeqCst);
    }

    /// Make interaction requests fail until cleared.
    pub fn fail_interactions(&self, fail: bool) {
        self.inner.fail_interactions.store(fail, Ordering::SeqCst);
    }

    /// Page requests served so far, including failed ones.
    #[must_use]
    pub fn page_requests(&self) -> usize {
        self.inner.page_requests.load(Ordering::SeqCst)
    }

    /// Interactions currently recorded.
    #[must_use]
    pub fn interactions(&self) -> Vec<Interaction> {
        self.lock().clone()
    }

    /// For You catalogue served on every page.
    #[must_use]
    pub fn items(&self) -> &[ContentItem] {
        &self.inner.items
    }

    async fn page_delay(&self) -> anyhow::Result<()> {
        self.inner.page_requests.fetch_add(1, Ordering::SeqCst);
        sleep(self.inner.page_latency).await;
        if self.inner.fail_pages.load(Ordering::SeqCst) {
            bail!("simulated feed outage");
        }
        Ok(())
    }

    async fn interaction_delay(&self) -> anyhow::Result<()> {
        sleep(self.inner.interaction_latency).await;
        if self.inner.fail_interactions.load(Ordering::SeqCst) {
            bail!("simulated interaction outage");
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Interaction>> {
        self.inner
            .interactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn take<T: Clone>(source: &[T], limit: u32) -> Vec<T> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    source.iter().take(limit).cloned().collect()
}

#[async_trait]
impl FeedClient for SimulatedBackend {
    async fn fetch_for_you(
        &self,
        cursor: Option<String>,
        limit: u32,
    ) -> anyhow::Result<FeedPage<ContentItem>> {
        self.page_delay().await?;
        debug!(?cursor, limit, "serving simulated for you page");
        let response = ForYouResponse {
            cursor: Some(NEXT_CURSOR.to_string()),
            items: take(&self.inner.items, limit),
        };
        Ok(response.into())
    }

    async fn fetch_news(
        &self,
        cursor: Option<String>,
        limit: u32,
    ) -> anyhow::Result<FeedPage<NewsSlide>> {
        self.page_delay().await?;
        debug!(?cursor, limit, "serving simulated news page");
        let response = NewsResponse {
            cursor: Some(NEXT_CURSOR.to_string()),
            slides: take(&self.inner.slides, limit),
        };
        Ok(response.into())
    }

    async fn fetch_bookmarks(
        &self,
        _cursor: Option<String>,
        _limit: u32,
    ) -> anyhow::Result<FeedPage<ContentItem>> {
        self.page_delay().await?;
        let response = ForYouResponse {
            cursor: None,
            items: Vec::new(),
        };
        Ok(response.into())
    }

    async fn fetch_content_item(&self, id: &str) -> anyhow::Result<ContentItem> {
        self.page_delay().await?;
        self.inner
            .items
            .iter()
            .chain(
                self.inner
                    .slides
                    .iter()
                    .flat_map(|slide| std::iter::once(&slide.featured).chain(&slide.related)),
            )
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("content item {id} not found"))
    }
}

#[async_trait]
impl InteractionClient for SimulatedBackend {
    async fn record_interaction(
        &self,
        content_id: &str,
        kind: InteractionKind,
        metadata: Option<Value>,
    ) -> anyhow::Result<Interaction> {
        self.interaction_delay().await?;
        let request = InteractionRequest {
            content_item_id: content_id.to_string(),
            interaction_type: kind,
            metadata,
        };
        debug!(content_id, %kind, has_metadata = request.metadata.is_some(), "recorded simulated interaction");
        let interaction = request.accept(Uuid::new_v4().to_string(), Utc::now());
        self.lock().push(interaction.clone());
        Ok(interaction)
    }

    async fn remove_interaction(
        &self,
        content_id: &str,
        kind: InteractionKind,
    ) -> anyhow::Result<()> {
        self.interaction_delay().await?;
        self.lock().retain(|interaction| {
            interaction.content_item_id != content_id || interaction.interaction_type != kind
        });
        Ok(())
    }
}

fn published(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

fn item(id: &str, kind: ContentType, title: &str, day: u32) -> ContentItem {
    let media = kind.is_playable().then(|| format!("https://cdn.lumen.example/{id}.mp4"));
    ContentItem {
        id: id.to_string(),
        kind,
        title: Some(title.to_string()),
        body_text: None,
        excerpt: Some(format!("{title}.")),
        media_url: media,
        thumbnail_url: Some(format!("https://cdn.lumen.example/{id}.jpg")),
        original_url: None,
        duration_sec: kind.is_playable().then_some(180),
        author: Some("Lumen Studio".to_string()),
        source_name: Some("Lumen".to_string()),
        like_count: u64::from(day) * 100,
        comment_count: u64::from(day) * 7,
        share_count: u64::from(day) * 3,
        view_count: Some(u64::from(day) * 1_000),
        transcript_id: None,
        topic_tags: Some(vec!["technology".to_string()]),
        source_feed_url: None,
        metadata: None,
        status: Some(ContentStatus::Ready),
        published_at: published(day),
        created_at: published(day),
        updated_at: None,
        is_liked: Some(false),
        is_bookmarked: Some(false),
    }
}

fn catalogue() -> (Vec<ContentItem>, Vec<NewsSlide>) {
    let items = vec![
        item(
            "1",
            ContentType::Video,
            "The Future of AI in Creative Industries",
            1,
        ),
        item("2", ContentType::Podcast, "Building Calm Software", 2),
        item("3", ContentType::Article, "Why Cursors Beat Offsets", 3),
        item("4", ContentType::Video, "Designing for One Thumb", 4),
        item("5", ContentType::Tweet, "Ship the smallest useful thing", 5),
    ];
    let slides = vec![
        NewsSlide {
            slide_id: "slide-1".to_string(),
            featured: item("n1", ContentType::Article, "Chipmakers Race to 2nm", 6),
            related: vec![
                item("n2", ContentType::Comment, "Analysts weigh in", 6),
                item("n3", ContentType::Video, "Inside the fab", 7),
            ],
        },
        NewsSlide {
            slide_id: "slide-2".to_string(),
            featured: item("n4", ContentType::Article, "Open Standards for Feeds", 8),
            related: Vec::new(),
        },
    ];
    (items, slides)
}
