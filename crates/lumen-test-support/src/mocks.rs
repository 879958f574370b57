//! Scripted collaborators.
//!
//! Each fake records every call. Responses can be queued ahead of time or
//! gated: a gated call blocks on a `oneshot` until the test releases it,
//! which makes in-flight states observable without timing assumptions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use lumen_feed_core::{InteractionClient, PageSource, Player, ReconcileScope, Reconciler};
use lumen_models::{FeedPage, Interaction, InteractionKind};
use serde_json::Value;
use tokio::sync::{Notify, oneshot};

/// Upper bound for waiting on a call that a test expects to happen.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn wait_until(notify: &Notify, mut reached: impl FnMut() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            let notified = notify.notified();
            if reached() {
                return;
            }
            notified.await;
        }
    })
    .await
    .context("timed out waiting for scripted calls")
}

type PageResult<T> = Result<FeedPage<T>, String>;

enum PageStep<T> {
    Ready(PageResult<T>),
    Gated(oneshot::Receiver<PageResult<T>>),
}

/// Releases one gated page request.
#[derive(Debug)]
pub struct PageGate<T> {
    sender: oneshot::Sender<PageResult<T>>,
}

impl<T> PageGate<T> {
    /// Complete the request with `page`.
    pub fn release(self, page: FeedPage<T>) {
        let _ = self.sender.send(Ok(page));
    }

    /// Fail the request with `message`.
    pub fn fail(self, message: &str) {
        let _ = self.sender.send(Err(message.to_string()));
    }
}

/// Page source answering from a queue of scripted steps.
pub struct ScriptedPageSource<T> {
    steps: Mutex<VecDeque<PageStep<T>>>,
    requests: Mutex<Vec<Option<String>>>,
    notify: Notify,
}

impl<T> ScriptedPageSource<T> {
    /// Empty script.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            notify: Notify::new(),
        })
    }

    /// Queue an immediate page.
    pub fn push_page(&self, page: FeedPage<T>) {
        lock(&self.steps).push_back(PageStep::Ready(Ok(page)));
    }

    /// Queue an immediate failure.
    pub fn push_error(&self, message: &str) {
        lock(&self.steps).push_back(PageStep::Ready(Err(message.to_string())));
    }

    /// Queue a request that blocks until the returned gate is used.
    #[must_use]
    pub fn push_gated(&self) -> PageGate<T> {
        let (sender, receiver) = oneshot::channel();
        lock(&self.steps).push_back(PageStep::Gated(receiver));
        PageGate { sender }
    }

    /// Cursors requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Option<String>> {
        lock(&self.requests).clone()
    }

    /// Number of requests issued.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Wait until at least `count` requests have been issued.
    ///
    /// # Errors
    ///
    /// Returns an error after [`WAIT_LIMIT`].
    pub async fn wait_for_requests(&self, count: usize) -> anyhow::Result<()> {
        wait_until(&self.notify, || self.request_count() >= count).await
    }
}

#[async_trait]
impl<T> PageSource<T> for ScriptedPageSource<T>
where
    T: Send + Sync + 'static,
{
    async fn fetch_page(&self, cursor: Option<String>) -> anyhow::Result<FeedPage<T>> {
        let step = {
            lock(&self.requests).push(cursor);
            lock(&self.steps).pop_front()
        };
        self.notify.notify_waiters();
        let result = match step {
            Some(PageStep::Ready(result)) => result,
            Some(PageStep::Gated(receiver)) => receiver
                .await
                .map_err(|_| anyhow!("page gate dropped"))?,
            None => bail!("page script exhausted"),
        };
        result.map_err(|message| anyhow!(message))
    }
}

/// Which remote call an interaction used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallAction {
    /// `record_interaction`.
    Record,
    /// `remove_interaction`.
    Remove,
}

/// One recorded interaction call.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionCall {
    /// Target content.
    pub content_id: String,
    /// Interaction kind.
    pub kind: InteractionKind,
    /// Remote call used.
    pub action: CallAction,
    /// Metadata sent with a record call.
    pub metadata: Option<Value>,
}

/// Releases one gated interaction call.
#[derive(Debug)]
pub struct CallGate {
    sender: oneshot::Sender<Result<(), String>>,
}

impl CallGate {
    /// Let the call succeed.
    pub fn succeed(self) {
        let _ = self.sender.send(Ok(()));
    }

    /// Fail the call with `message`.
    pub fn fail(self, message: &str) {
        let _ = self.sender.send(Err(message.to_string()));
    }
}

/// Interaction client that records calls and answers from gates or a
/// global failure switch.
#[derive(Default)]
pub struct RecordingInteractionClient {
    calls: Mutex<Vec<InteractionCall>>,
    gates: Mutex<VecDeque<oneshot::Receiver<Result<(), String>>>>,
    fail_all: AtomicBool,
    notify: Notify,
}

impl RecordingInteractionClient {
    /// Client that accepts every call.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Client that rejects every ungated call.
    #[must_use]
    pub fn failing() -> Arc<Self> {
        let client = Self::new();
        client.fail_all(true);
        client
    }

    /// Toggle rejection of ungated calls.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make the next call block until the returned gate is used.
    #[must_use]
    pub fn push_gate(&self) -> CallGate {
        let (sender, receiver) = oneshot::channel();
        lock(&self.gates).push_back(receiver);
        CallGate { sender }
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<InteractionCall> {
        lock(&self.calls).clone()
    }

    /// Calls of `kind` received so far.
    #[must_use]
    pub fn calls_of(&self, kind: InteractionKind) -> Vec<InteractionCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.kind == kind)
            .collect()
    }

    /// Wait until at least `count` calls have been received.
    ///
    /// # Errors
    ///
    /// Returns an error after [`WAIT_LIMIT`].
    pub async fn wait_for_calls(&self, count: usize) -> anyhow::Result<()> {
        wait_until(&self.notify, || lock(&self.calls).len() >= count).await
    }

    async fn answer(&self, call: InteractionCall) -> anyhow::Result<()> {
        let gate = {
            lock(&self.calls).push(call);
            lock(&self.gates).pop_front()
        };
        self.notify.notify_waiters();
        if let Some(gate) = gate {
            return gate
                .await
                .map_err(|_| anyhow!("call gate dropped"))?
                .map_err(|message| anyhow!(message));
        }
        if self.fail_all.load(Ordering::SeqCst) {
            bail!("scripted interaction failure");
        }
        Ok(())
    }
}

#[async_trait]
impl InteractionClient for RecordingInteractionClient {
    async fn record_interaction(
        &self,
        content_id: &str,
        kind: InteractionKind,
        metadata: Option<Value>,
    ) -> anyhow::Result<Interaction> {
        self.answer(InteractionCall {
            content_id: content_id.to_string(),
            kind,
            action: CallAction::Record,
            metadata,
        })
        .await?;
        Ok(Interaction {
            id: format!("{kind}-{content_id}"),
            content_item_id: content_id.to_string(),
            interaction_type: kind,
            created_at: Utc::now(),
        })
    }

    async fn remove_interaction(
        &self,
        content_id: &str,
        kind: InteractionKind,
    ) -> anyhow::Result<()> {
        self.answer(InteractionCall {
            content_id: content_id.to_string(),
            kind,
            action: CallAction::Remove,
            metadata: None,
        })
        .await
    }
}

/// Reconciler that only records scheduled scopes.
#[derive(Debug, Default)]
pub struct RecordingReconciler {
    scheduled: Mutex<Vec<ReconcileScope>>,
}

impl RecordingReconciler {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Scopes scheduled so far.
    #[must_use]
    pub fn scheduled(&self) -> Vec<ReconcileScope> {
        lock(&self.scheduled).clone()
    }
}

impl Reconciler for RecordingReconciler {
    fn schedule(&self, scope: ReconcileScope) {
        lock(&self.scheduled).push(scope);
    }
}

/// Player that logs calls and can refuse to play.
#[derive(Debug, Default)]
pub struct FakePlayer {
    refuse_play: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakePlayer {
    /// Player that accepts every call.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Refuse (or allow) subsequent `play` calls, like a blocked autoplay.
    pub fn refuse_play(&self, refuse: bool) {
        self.refuse_play.store(refuse, Ordering::SeqCst);
    }

    /// Calls received so far, rendered as `play`, `pause`, `seek <delta>`, `rate <x>`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn log(&self, call: String) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl Player for FakePlayer {
    async fn play(&self) -> anyhow::Result<()> {
        self.log("play".to_string());
        if self.refuse_play.load(Ordering::SeqCst) {
            bail!("autoplay blocked");
        }
        Ok(())
    }

    async fn pause(&self) -> anyhow::Result<()> {
        self.log("pause".to_string());
        Ok(())
    }

    async fn seek(&self, delta_secs: f64) -> anyhow::Result<()> {
        self.log(format!("seek {delta_secs}"));
        Ok(())
    }

    async fn set_rate(&self, rate: f64) -> anyhow::Result<()> {
        self.log(format!("rate {rate}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gated_pages_wait_for_release() -> anyhow::Result<()> {
        let source = ScriptedPageSource::<u8>::new();
        let gate = source.push_gated();
        let task = tokio::spawn({
            let source = Arc::clone(&source);
            async move { source.fetch_page(None).await }
        });
        source.wait_for_requests(1).await?;
        gate.release(FeedPage::new(None, vec![7]));
        let page = task.await??;
        assert_eq!(page.items, vec![7]);
        assert!(source.fetch_page(None).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn recording_client_honours_gates_and_failure_switch() -> anyhow::Result<()> {
        let client = RecordingInteractionClient::new();
        let gate = client.push_gate();
        gate.fail("boom");
        assert!(
            client
                .remove_interaction("1", InteractionKind::Like)
                .await
                .is_err()
        );
        client
            .record_interaction("1", InteractionKind::Like, None)
            .await?;
        client.fail_all(true);
        assert!(
            client
                .record_interaction("2", InteractionKind::Bookmark, None)
                .await
                .is_err()
        );
        assert_eq!(client.calls().len(), 3);
        assert_eq!(client.calls()[0].action, CallAction::Remove);
        Ok(())
    }
}
