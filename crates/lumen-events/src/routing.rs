//! Event bus routing helpers.

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, EventEnvelope, EventId, FeedEvent};
use chrono::Utc;
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::Stream;
use tokio_stream::wrappers::BroadcastStream;

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<AtomicU64>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EventBus")
            .field("replay_capacity", &self.replay_capacity)
            .field("last_event_id", &self.last_event_id())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Construct a bus with a custom replay capacity (clamped to at least one).
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event, assigning it a sequential identifier.
    ///
    /// Having no live subscribers is not an error; the event still lands in
    /// the replay ring. The ring and the channel are written under one lock,
    /// so a concurrent [`subscribe`](Self::subscribe) sees each event exactly
    /// once.
    pub fn publish(&self, event: FeedEvent) -> EventId {
        let mut replay = self.lock_replay();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        if replay.len() == self.replay_capacity {
            let _ = replay.pop_front();
        }
        replay.push_back(envelope.clone());
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let replay = self.lock_replay();
        let receiver = self.sender.subscribe();
        let backlog = since_id
            .map(|since| {
                replay
                    .iter()
                    .filter(|env| env.id > since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(replay);
        EventStream {
            backlog,
            live: BroadcastStream::new(receiver),
        }
    }

    /// Last event id observed in the replay buffer.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Collect buffered events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        let replay = self.lock_replay();
        replay.iter().filter(|env| env.id > id).cloned().collect()
    }

    /// Every event still held in the replay ring, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EventEnvelope> {
        self.lock_replay().iter().cloned().collect()
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream of envelopes: the replay backlog first, then the live channel.
///
/// Events skipped because the subscriber lagged behind the channel capacity
/// are dropped; the stream ends once every bus handle is gone.
#[derive(Debug)]
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    live: BroadcastStream<EventEnvelope>,
}

impl Stream for EventStream {
    type Item = EventEnvelope;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(event) = this.backlog.pop_front() {
            return Poll::Ready(Some(event));
        }
        loop {
            match Pin::new(&mut this.live).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(_lagged))) => {}
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
