//! Collaborator seams consumed by the engine.
//!
//! # Design
//! - Transport lives behind these traits; the engine never speaks HTTP.
//! - Optional capabilities default to an error so minimal clients stay small.
//! - Adapters turn one [`FeedClient`] into the per-feed [`PageSource`]s the
//!   pagers consume.

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use lumen_models::{ContentItem, FeedPage, Interaction, InteractionKind, NewsSlide};
use serde_json::Value;

/// Paged fetch capability for a single feed identity.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch the page starting at `cursor` (`None` for the first page).
    async fn fetch_page(&self, cursor: Option<String>) -> anyhow::Result<FeedPage<T>>;
}

/// Feed API client.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch one page of the For You feed.
    async fn fetch_for_you(
        &self,
        cursor: Option<String>,
        limit: u32,
    ) -> anyhow::Result<FeedPage<ContentItem>>;

    /// Fetch one page of the News feed.
    async fn fetch_news(
        &self,
        cursor: Option<String>,
        limit: u32,
    ) -> anyhow::Result<FeedPage<NewsSlide>>;

    /// Fetch one page of saved items; default implementation reports lack of support.
    async fn fetch_bookmarks(
        &self,
        cursor: Option<String>,
        limit: u32,
    ) -> anyhow::Result<FeedPage<ContentItem>> {
        let _ = (cursor, limit);
        bail!("bookmarks not supported by this client");
    }

    /// Fetch a single item by id; default implementation reports lack of support.
    async fn fetch_content_item(&self, id: &str) -> anyhow::Result<ContentItem> {
        let _ = id;
        bail!("item lookup not supported by this client");
    }
}

/// Reversible interaction side-effects.
#[async_trait]
pub trait InteractionClient: Send + Sync {
    /// Record an interaction against `content_id`.
    async fn record_interaction(
        &self,
        content_id: &str,
        kind: InteractionKind,
        metadata: Option<Value>,
    ) -> anyhow::Result<Interaction>;

    /// Remove a previously recorded interaction.
    async fn remove_interaction(&self, content_id: &str, kind: InteractionKind)
    -> anyhow::Result<()>;
}

/// For You pages served by a [`FeedClient`].
#[derive(Clone)]
pub struct ForYouPages {
    client: Arc<dyn FeedClient>,
    limit: u32,
}

impl ForYouPages {
    /// Wrap `client`, requesting `limit` items per page.
    #[must_use]
    pub fn new(client: Arc<dyn FeedClient>, limit: u32) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl PageSource<ContentItem> for ForYouPages {
    async fn fetch_page(&self, cursor: Option<String>) -> anyhow::Result<FeedPage<ContentItem>> {
        self.client.fetch_for_you(cursor, self.limit).await
    }
}

/// News pages served by a [`FeedClient`].
#[derive(Clone)]
pub struct NewsPages {
    client: Arc<dyn FeedClient>,
    limit: u32,
}

impl NewsPages {
    /// Wrap `client`, requesting `limit` slides per page.
    #[must_use]
    pub fn new(client: Arc<dyn FeedClient>, limit: u32) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl PageSource<NewsSlide> for NewsPages {
    async fn fetch_page(&self, cursor: Option<String>) -> anyhow::Result<FeedPage<NewsSlide>> {
        self.client.fetch_news(cursor, self.limit).await
    }
}

/// Saved-item pages served by a [`FeedClient`].
#[derive(Clone)]
pub struct BookmarkPages {
    client: Arc<dyn FeedClient>,
    limit: u32,
}

impl BookmarkPages {
    /// Wrap `client`, requesting `limit` items per page.
    #[must_use]
    pub fn new(client: Arc<dyn FeedClient>, limit: u32) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl PageSource<ContentItem> for BookmarkPages {
    async fn fetch_page(&self, cursor: Option<String>) -> anyhow::Result<FeedPage<ContentItem>> {
        self.client.fetch_bookmarks(cursor, self.limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubClient {
        requests: Mutex<Vec<(Option<String>, u32)>>,
    }

    #[async_trait]
    impl FeedClient for StubClient {
        async fn fetch_for_you(
            &self,
            cursor: Option<String>,
            limit: u32,
        ) -> anyhow::Result<FeedPage<ContentItem>> {
            self.requests
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push((cursor, limit));
            Ok(FeedPage::new(None, Vec::new()))
        }

        async fn fetch_news(
            &self,
            _cursor: Option<String>,
            _limit: u32,
        ) -> anyhow::Result<FeedPage<NewsSlide>> {
            Ok(FeedPage::new(Some("n2".into()), Vec::new()))
        }
    }

    #[tokio::test]
    async fn adapters_forward_cursor_and_limit() -> anyhow::Result<()> {
        let client = Arc::new(StubClient::default());
        let pages = ForYouPages::new(client.clone(), 20);
        pages.fetch_page(Some("c1".into())).await?;

        let news = NewsPages::new(client.clone(), 10).fetch_page(None).await?;
        assert_eq!(news.cursor.as_deref(), Some("n2"));

        let requests = client
            .requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(requests, vec![(Some("c1".to_string()), 20)]);
        Ok(())
    }

    #[tokio::test]
    async fn optional_capabilities_default_to_errors() {
        let client = Arc::new(StubClient::default());
        let err = BookmarkPages::new(client.clone(), 20)
            .fetch_page(None)
            .await
            .err()
            .map(|err| err.to_string());
        assert_eq!(
            err.as_deref(),
            Some("bookmarks not supported by this client")
        );
        assert!(client.fetch_content_item("1").await.is_err());
    }
}
