//! Interaction store: the client-side shadow of liked/bookmarked state plus
//! active-item playback flags.
//!
//! # Design
//! - Explicitly owned handle, cloned into every component that needs it.
//! - Backed by a `watch` channel so renderers can subscribe to changes while
//!   writers stay synchronous.
//! - Every operation is infallible and applied in call order.
//! - Field ownership: liked/bookmarked sets are written by the mutation
//!   coordinator, `active_index` by the feed session, playback fields by the
//!   playback driver.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

/// Upper bound for playback progress.
pub const MAX_PROGRESS: f64 = 100.0;

/// Snapshot of the interaction state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionState {
    /// Content ids the user has liked locally.
    pub liked_ids: BTreeSet<String>,
    /// Content ids the user has bookmarked locally.
    pub bookmarked_ids: BTreeSet<String>,
    /// Index of the item currently in view.
    pub active_index: usize,
    /// Whether the active item is playing.
    pub is_playing: bool,
    /// Playback progress of the active item, in `[0, 100]`.
    pub progress: f64,
    /// Playback rate applied to the active item.
    pub playback_speed: f64,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            liked_ids: BTreeSet::new(),
            bookmarked_ids: BTreeSet::new(),
            active_index: 0,
            is_playing: false,
            progress: 0.0,
            playback_speed: 1.0,
        }
    }
}

/// Shared handle to the interaction state.
#[derive(Debug, Clone)]
pub struct InteractionStore {
    state: Arc<watch::Sender<InteractionState>>,
}

impl Default for InteractionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(InteractionState::default())
    }

    /// Create a store seeded with `state`.
    #[must_use]
    pub fn with_state(state: InteractionState) -> Self {
        let (sender, _) = watch::channel(state);
        Self {
            state: Arc::new(sender),
        }
    }

    /// Flip `id` in the liked set, returning the new membership.
    pub fn toggle_like(&self, id: &str) -> bool {
        let mut liked = false;
        self.state.send_modify(|state| {
            liked = flip(&mut state.liked_ids, id);
        });
        liked
    }

    /// Flip `id` in the bookmarked set, returning the new membership.
    pub fn toggle_bookmark(&self, id: &str) -> bool {
        let mut bookmarked = false;
        self.state.send_modify(|state| {
            bookmarked = flip(&mut state.bookmarked_ids, id);
        });
        bookmarked
    }

    /// Force `id`'s liked membership to `liked`.
    pub fn set_liked(&self, id: &str, liked: bool) {
        self.state
            .send_if_modified(|state| assign(&mut state.liked_ids, id, liked));
    }

    /// Force `id`'s bookmarked membership to `bookmarked`.
    pub fn set_bookmarked(&self, id: &str, bookmarked: bool) {
        self.state
            .send_if_modified(|state| assign(&mut state.bookmarked_ids, id, bookmarked));
    }

    /// Move the active item.
    pub fn set_active_index(&self, index: usize) {
        self.state.send_if_modified(|state| {
            if state.active_index == index {
                return false;
            }
            state.active_index = index;
            true
        });
    }

    /// Reset progress to zero.
    pub fn reset_progress(&self) {
        self.set_progress(0.0);
    }

    /// Set the playing flag.
    pub fn set_playing(&self, playing: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.is_playing != playing;
            state.is_playing = playing;
            changed
        });
    }

    /// Flip the playing flag, returning the new value.
    pub fn toggle_play(&self) -> bool {
        let mut playing = false;
        self.state.send_modify(|state| {
            state.is_playing = !state.is_playing;
            playing = state.is_playing;
        });
        playing
    }

    /// Set playback progress, clamped into `[0, 100]`. Non-finite values are ignored.
    pub fn set_progress(&self, progress: f64) {
        if !progress.is_finite() {
            return;
        }
        let progress = progress.clamp(0.0, MAX_PROGRESS);
        self.state.send_if_modified(|state| {
            #[allow(clippy::float_cmp)]
            let changed = state.progress != progress;
            state.progress = progress;
            changed
        });
    }

    /// Set the playback rate. Returns `false` and leaves the rate untouched
    /// when `speed` is not a positive finite number.
    pub fn set_playback_speed(&self, speed: f64) -> bool {
        if !speed.is_finite() || speed <= 0.0 {
            return false;
        }
        self.state.send_modify(|state| state.playback_speed = speed);
        true
    }

    /// Return active index and progress to `(0, 0)` for a new feed identity.
    pub fn reset_view(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.active_index != 0 || state.progress > 0.0;
            state.active_index = 0;
            state.progress = 0.0;
            changed
        });
    }

    /// Clone the current state.
    #[must_use]
    pub fn snapshot(&self) -> InteractionState {
        self.state.borrow().clone()
    }

    /// Whether `id` is in the liked set.
    #[must_use]
    pub fn is_liked(&self, id: &str) -> bool {
        self.state.borrow().liked_ids.contains(id)
    }

    /// Whether `id` is in the bookmarked set.
    #[must_use]
    pub fn is_bookmarked(&self, id: &str) -> bool {
        self.state.borrow().bookmarked_ids.contains(id)
    }

    /// Current active index.
    #[must_use]
    pub fn active_index(&self) -> usize {
        self.state.borrow().active_index
    }

    /// Current playback progress.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.state.borrow().progress
    }

    /// Current playing flag.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.borrow().is_playing
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<InteractionState> {
        self.state.subscribe()
    }
}

fn flip(set: &mut BTreeSet<String>, id: &str) -> bool {
    if set.remove(id) {
        false
    } else {
        set.insert(id.to_string());
        true
    }
}

fn assign(set: &mut BTreeSet<String>, id: &str, member: bool) -> bool {
    if member {
        set.insert(id.to_string())
    } else {
        set.remove(id)
    }
}
