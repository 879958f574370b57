//! Optimistic like/bookmark mutations with rollback and reconciliation.
//!
//! # Design
//! - Each invocation gets a sequence number from one monotonic counter and is
//!   tracked as pending under its `(content id, kind)` key. The store toggle
//!   happens under the same lock, so sequence order matches toggle order.
//! - The optimistic toggle happens before the remote call is issued.
//! - Per key the coordinator remembers the flag the server last confirmed
//!   (the newest successful sequence wins) and the optimistic flag of every
//!   pending call.
//! - Only the newest pending call writes the store when it settles. It shows
//!   the next newer-than-confirmed pending flag, or else the confirmed flag, so
//!   an older failure never clobbers a newer optimistic state and a run of
//!   failures lands back on the server's value.
//! - Every settlement schedules exactly one reconciliation, success or not.
//! - Different ids never contend beyond the short bookkeeping lock.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lumen_events::{EventBus, FeedEvent, MutationResolution};
use lumen_models::{FeedKind, InteractionKind};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::MutationError;
use crate::source::InteractionClient;
use crate::store::InteractionStore;

/// Reversible interactions backed by a local shadow set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleKind {
    /// Like / unlike.
    Like,
    /// Bookmark / unbookmark.
    Bookmark,
}

impl ToggleKind {
    /// Interaction sent to the remote client.
    #[must_use]
    pub const fn interaction(self) -> InteractionKind {
        match self {
            Self::Like => InteractionKind::Like,
            Self::Bookmark => InteractionKind::Bookmark,
        }
    }

    /// Feeds whose data must be reconciled once a mutation settles.
    #[must_use]
    pub const fn scope(self) -> ReconcileScope {
        match self {
            Self::Like => ReconcileScope::Feeds,
            Self::Bookmark => ReconcileScope::Bookmarks,
        }
    }
}

impl fmt::Display for ToggleKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.interaction(), formatter)
    }
}

/// Set of cached feeds refreshed after a mutation settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileScope {
    /// For You and News, which carry engagement counters.
    Feeds,
    /// The saved-items list.
    Bookmarks,
}

impl ReconcileScope {
    /// Feed identities covered by the scope.
    #[must_use]
    pub const fn feeds(self) -> &'static [FeedKind] {
        match self {
            Self::Feeds => &[FeedKind::ForYou, FeedKind::News],
            Self::Bookmarks => &[FeedKind::Bookmarks],
        }
    }
}

/// Schedules authoritative refetches after a mutation settles.
///
/// Implementations must not block; the refetch itself runs in the background.
pub trait Reconciler: Send + Sync {
    /// Schedule a refetch of every feed in `scope`.
    fn schedule(&self, scope: ReconcileScope);
}

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Target content.
    pub content_id: String,
    /// Toggled interaction.
    pub kind: ToggleKind,
    /// Sequence issued to the invocation.
    pub sequence: u64,
    /// Final state of the invocation.
    pub resolution: MutationResolution,
    /// Local flag after settlement.
    pub flag: bool,
    /// Remote failure, when the call was rejected.
    pub failure: Option<MutationError>,
}

#[derive(Debug)]
struct KeyState {
    confirmed: bool,
    confirmed_sequence: u64,
    pending: BTreeMap<u64, bool>,
}

impl KeyState {
    const fn new(confirmed: bool) -> Self {
        Self {
            confirmed,
            confirmed_sequence: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Flag to show once the newest pending call has settled.
    fn display(&self) -> bool {
        match self.pending.last_key_value() {
            Some((&sequence, &flag)) if sequence > self.confirmed_sequence => flag,
            _ => self.confirmed,
        }
    }
}

#[derive(Debug, Default)]
struct Sequencer {
    next: u64,
    keys: HashMap<(String, ToggleKind), KeyState>,
}

/// Runs optimistic interactions against the store and the remote client.
#[derive(Clone)]
pub struct MutationCoordinator {
    store: InteractionStore,
    client: Arc<dyn InteractionClient>,
    reconciler: Arc<dyn Reconciler>,
    sequencer: Arc<Mutex<Sequencer>>,
    events: Option<EventBus>,
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MutationCoordinator")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl MutationCoordinator {
    /// Create a coordinator writing to `store`.
    #[must_use]
    pub fn new(
        store: InteractionStore,
        client: Arc<dyn InteractionClient>,
        reconciler: Arc<dyn Reconciler>,
    ) -> Self {
        Self {
            store,
            client,
            reconciler,
            sequencer: Arc::new(Mutex::new(Sequencer::default())),
            events: None,
        }
    }

    /// Publish settlement events on `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Store written by this coordinator.
    #[must_use]
    pub const fn store(&self) -> &InteractionStore {
        &self.store
    }

    /// Like or unlike `content_id`; `is_liked` is the flag the caller saw.
    pub async fn like(&self, content_id: &str, is_liked: bool) -> MutationOutcome {
        self.toggle(content_id, ToggleKind::Like, is_liked).await
    }

    /// Bookmark or unbookmark `content_id`; `is_bookmarked` is the flag the caller saw.
    pub async fn bookmark(&self, content_id: &str, is_bookmarked: bool) -> MutationOutcome {
        self.toggle(content_id, ToggleKind::Bookmark, is_bookmarked)
            .await
    }

    /// Apply the optimistic toggle, issue one remote call chosen from
    /// `current`, then commit, roll back, or yield to a newer invocation.
    pub async fn toggle(&self, content_id: &str, kind: ToggleKind, current: bool) -> MutationOutcome {
        let (sequence, optimistic) = self.begin(content_id, kind);
        debug!(content_id, %kind, sequence, optimistic, "optimistic toggle applied");

        let interaction = kind.interaction();
        let result = if current {
            self.client
                .remove_interaction(content_id, interaction)
                .await
        } else {
            self.client
                .record_interaction(content_id, interaction, None)
                .await
                .map(|_| ())
        };

        let failure = result.err().map(|err| MutationError::RemoteFailed {
            content_id: content_id.to_string(),
            kind: interaction,
            message: format!("{err:#}"),
        });
        let resolution = self.settle(content_id, kind, sequence, !current, failure.is_some());
        if let Some(err) = &failure {
            warn!(content_id, %kind, sequence, ?resolution, error = %err, "interaction failed");
        } else {
            info!(content_id, %kind, sequence, "interaction committed");
        }

        self.reconciler.schedule(kind.scope());
        self.emit(FeedEvent::MutationSettled {
            content_id: content_id.to_string(),
            kind: interaction,
            sequence,
            resolution,
        });

        MutationOutcome {
            content_id: content_id.to_string(),
            kind,
            sequence,
            resolution,
            flag: self.flag(content_id, kind),
            failure,
        }
    }

    /// Record a non-reversible interaction (view, complete, share) in the
    /// background. Failures are logged and dropped.
    pub fn track_interaction(
        &self,
        content_id: &str,
        kind: InteractionKind,
        metadata: Option<Value>,
    ) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let content_id = content_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = client
                .record_interaction(&content_id, kind, metadata)
                .await
            {
                debug!(content_id = %content_id, %kind, error = %err, "tracking event dropped");
            }
        })
    }

    fn begin(&self, content_id: &str, kind: ToggleKind) -> (u64, bool) {
        let mut sequencer = self.lock();
        sequencer.next += 1;
        let sequence = sequencer.next;
        let before = self.flag(content_id, kind);
        let optimistic = self.flip(content_id, kind);
        sequencer
            .keys
            .entry((content_id.to_string(), kind))
            .or_insert_with(|| KeyState::new(before))
            .pending
            .insert(sequence, optimistic);
        (sequence, optimistic)
    }

    fn settle(
        &self,
        content_id: &str,
        kind: ToggleKind,
        sequence: u64,
        target: bool,
        failed: bool,
    ) -> MutationResolution {
        let mut sequencer = self.lock();
        let key = (content_id.to_string(), kind);
        let Some(state) = sequencer.keys.get_mut(&key) else {
            return if failed {
                MutationResolution::Superseded
            } else {
                MutationResolution::Committed
            };
        };
        state.pending.remove(&sequence);
        if !failed && sequence > state.confirmed_sequence {
            state.confirmed = target;
            state.confirmed_sequence = sequence;
        }
        let newest = state
            .pending
            .last_key_value()
            .is_none_or(|(&pending, _)| pending < sequence);
        if newest {
            self.assign(content_id, kind, state.display());
        }
        if state.pending.is_empty() {
            sequencer.keys.remove(&key);
        }
        match (failed, newest) {
            (false, _) => MutationResolution::Committed,
            (true, true) => MutationResolution::RolledBack,
            (true, false) => MutationResolution::Superseded,
        }
    }

    fn flip(&self, content_id: &str, kind: ToggleKind) -> bool {
        match kind {
            ToggleKind::Like => self.store.toggle_like(content_id),
            ToggleKind::Bookmark => self.store.toggle_bookmark(content_id),
        }
    }

    fn assign(&self, content_id: &str, kind: ToggleKind, flag: bool) {
        match kind {
            ToggleKind::Like => self.store.set_liked(content_id, flag),
            ToggleKind::Bookmark => self.store.set_bookmarked(content_id, flag),
        }
    }

    fn flag(&self, content_id: &str, kind: ToggleKind) -> bool {
        match kind {
            ToggleKind::Like => self.store.is_liked(content_id),
            ToggleKind::Bookmark => self.store.is_bookmarked(content_id),
        }
    }

    fn emit(&self, event: FeedEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sequencer> {
        self.sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
