//! Viewport view tracking.
//!
//! # Design
//! - `track` registers one mounted item instance and returns a guard; the
//!   registration ends when the guard drops, so observers cannot leak.
//! - A view fires once the item intersects the viewport at or above the
//!   configured ratio. Track-once instances fire at most one view.
//! - Delivery is spawned and best-effort: failures are logged at debug level
//!   and never retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{SecondsFormat, Utc};
use lumen_config::TrackingConfig;
use lumen_events::{EventBus, FeedEvent};
use lumen_models::InteractionKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::source::InteractionClient;

/// One visibility observation for an item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionEntry {
    /// Whether any part of the item is inside the viewport.
    pub is_intersecting: bool,
    /// Visible fraction of the item's bounding box.
    pub ratio: f64,
}

impl IntersectionEntry {
    /// An intersecting entry with the given ratio.
    #[must_use]
    pub const fn visible(ratio: f64) -> Self {
        Self {
            is_intersecting: true,
            ratio,
        }
    }

    /// A non-intersecting entry.
    #[must_use]
    pub const fn hidden() -> Self {
        Self {
            is_intersecting: false,
            ratio: 0.0,
        }
    }
}

/// Registry of mounted items and dispatcher of view events.
#[derive(Clone)]
pub struct ViewTracker {
    client: Arc<dyn InteractionClient>,
    config: TrackingConfig,
    registrations: Arc<AtomicUsize>,
    events: Option<EventBus>,
}

impl std::fmt::Debug for ViewTracker {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ViewTracker")
            .field("config", &self.config)
            .field("registrations", &self.active_registrations())
            .finish_non_exhaustive()
    }
}

impl ViewTracker {
    /// Create a tracker delivering views through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn InteractionClient>, config: TrackingConfig) -> Self {
        Self {
            client,
            config,
            registrations: Arc::new(AtomicUsize::new(0)),
            events: None,
        }
    }

    /// Publish view events on `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Register a mounted item instance.
    #[must_use]
    pub fn track(&self, content_id: impl Into<String>) -> TrackedItem {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        TrackedItem {
            content_id: content_id.into(),
            tracker: self.clone(),
            fired: false,
        }
    }

    /// Number of live registrations.
    #[must_use]
    pub fn active_registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Visibility threshold in `(0, 1]`.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.config.view_threshold
    }

    fn dispatch(&self, content_id: &str, ratio: f64) -> JoinHandle<()> {
        if let Some(events) = &self.events {
            events.publish(FeedEvent::ViewTracked {
                content_id: content_id.to_string(),
                ratio,
            });
        }
        let metadata = json!({
            "viewedAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "intersectionRatio": ratio,
        });
        let client = Arc::clone(&self.client);
        let content_id = content_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = client
                .record_interaction(&content_id, InteractionKind::View, Some(metadata))
                .await
            {
                debug!(content_id = %content_id, error = %err, "view event dropped");
            }
        })
    }
}

/// Registration for one mounted item instance; deregisters on drop.
#[derive(Debug)]
pub struct TrackedItem {
    content_id: String,
    tracker: ViewTracker,
    fired: bool,
}

impl TrackedItem {
    /// Tracked content id.
    #[must_use]
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Whether a view has fired for this instance.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }

    /// Feed one observation. Returns the delivery task when a view fired.
    pub fn observe(&mut self, entry: IntersectionEntry) -> Option<JoinHandle<()>> {
        if !entry.is_intersecting || entry.ratio < self.tracker.threshold() {
            return None;
        }
        if self.fired && self.tracker.config.track_once {
            return None;
        }
        self.fired = true;
        debug!(content_id = %self.content_id, ratio = entry.ratio, "view threshold crossed");
        Some(self.tracker.dispatch(&self.content_id, entry.ratio))
    }

    /// Consume an intersection stream until it ends, returning the delivery
    /// tasks of every view that fired.
    pub async fn watch<S>(&mut self, entries: S) -> Vec<JoinHandle<()>>
    where
        S: Stream<Item = IntersectionEntry> + Unpin,
    {
        let mut entries = entries;
        let mut dispatched = Vec::new();
        while let Some(entry) = entries.next().await {
            dispatched.extend(self.observe(entry));
        }
        dispatched
    }
}

impl Drop for TrackedItem {
    fn drop(&mut self) {
        self.tracker.registrations.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;
    use lumen_models::Interaction;
    use serde_json::Value;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, InteractionKind, Option<Value>)>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<(String, InteractionKind, Option<Value>)> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl InteractionClient for Recorder {
        async fn record_interaction(
            &self,
            content_id: &str,
            kind: InteractionKind,
            metadata: Option<Value>,
        ) -> anyhow::Result<Interaction> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((content_id.to_string(), kind, metadata));
            Ok(Interaction {
                id: "v-1".into(),
                content_item_id: content_id.to_string(),
                interaction_type: kind,
                created_at: Utc::now(),
            })
        }

        async fn remove_interaction(
            &self,
            _content_id: &str,
            _kind: InteractionKind,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn tracker(track_once: bool) -> (ViewTracker, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let tracker = ViewTracker::new(
            recorder.clone(),
            TrackingConfig {
                view_threshold: 0.5,
                track_once,
            },
        );
        (tracker, recorder)
    }

    #[tokio::test]
    async fn track_once_fires_a_single_view() -> anyhow::Result<()> {
        let (tracker, recorder) = tracker(true);
        let mut item = tracker.track("42");

        let first = item.observe(IntersectionEntry::visible(0.6));
        assert!(item.observe(IntersectionEntry::visible(0.6)).is_none());
        if let Some(handle) = first {
            handle.await?;
        }

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        let (id, kind, metadata) = &calls[0];
        assert_eq!(id, "42");
        assert_eq!(*kind, InteractionKind::View);
        let metadata = metadata.clone().unwrap_or_default();
        assert_eq!(metadata["intersectionRatio"].as_f64(), Some(0.6));
        assert!(metadata["viewedAt"].as_str().is_some_and(|at| at.ends_with('Z')));
        Ok(())
    }

    #[tokio::test]
    async fn below_threshold_and_hidden_entries_do_not_fire() {
        let (tracker, recorder) = tracker(true);
        let mut item = tracker.track("1");
        assert!(item.observe(IntersectionEntry::visible(0.49)).is_none());
        assert!(
            item.observe(IntersectionEntry {
                is_intersecting: false,
                ratio: 0.9
            })
            .is_none()
        );
        assert!(!item.has_fired());
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn repeat_mode_fires_on_each_entry() -> anyhow::Result<()> {
        let (tracker, recorder) = tracker(false);
        let mut item = tracker.track("1");
        let entries = tokio_stream::iter(vec![
            IntersectionEntry::visible(0.7),
            IntersectionEntry::hidden(),
            IntersectionEntry::visible(1.0),
        ]);
        for handle in item.watch(entries).await {
            handle.await?;
        }
        assert_eq!(recorder.calls().len(), 2);
        Ok(())
    }

    #[test]
    fn dropping_the_guard_deregisters() {
        let (tracker, _) = tracker(true);
        let first = tracker.track("a");
        let second = tracker.track("b");
        assert_eq!(tracker.active_registrations(), 2);
        drop(first);
        assert_eq!(tracker.active_registrations(), 1);
        assert_eq!(second.content_id(), "b");
        drop(second);
        assert_eq!(tracker.active_registrations(), 0);
    }
}
