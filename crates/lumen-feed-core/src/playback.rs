//! Playback driver for the active item.
//!
//! The player itself is an opaque capability; this module only translates
//! activation changes and time updates into store writes and completion
//! tracking.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lumen_config::PlaybackConfig;
use lumen_models::InteractionKind;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::mutation::MutationCoordinator;
use crate::store::{InteractionStore, MAX_PROGRESS};

/// Media player bound to one item.
#[async_trait]
pub trait Player: Send + Sync {
    /// Start playback; may be refused (autoplay blocked).
    async fn play(&self) -> anyhow::Result<()>;

    /// Pause playback.
    async fn pause(&self) -> anyhow::Result<()>;

    /// Move the play head by `delta_secs`, clamped at the start.
    async fn seek(&self, delta_secs: f64) -> anyhow::Result<()>;

    /// Change the playback rate.
    async fn set_rate(&self, rate: f64) -> anyhow::Result<()>;
}

/// Connects one item's player to the shared store.
pub struct PlaybackDriver {
    content_id: String,
    player: Arc<dyn Player>,
    store: InteractionStore,
    coordinator: MutationCoordinator,
    config: PlaybackConfig,
    active: bool,
    completed: bool,
}

impl fmt::Debug for PlaybackDriver {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PlaybackDriver")
            .field("content_id", &self.content_id)
            .field("active", &self.active)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl PlaybackDriver {
    /// Bind `player` for `content_id`. Completion events go through `coordinator`.
    #[must_use]
    pub fn new(
        content_id: impl Into<String>,
        player: Arc<dyn Player>,
        coordinator: MutationCoordinator,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            player,
            store: coordinator.store().clone(),
            coordinator,
            config,
            active: false,
            completed: false,
        }
    }

    /// Whether this item is the active one.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The item became (in)active. Active items autoplay; a refused play
    /// leaves `is_playing` false.
    pub async fn on_active_changed(&mut self, active: bool) {
        self.active = active;
        if active {
            self.completed = false;
            match self.player.play().await {
                Ok(()) => self.store.set_playing(true),
                Err(err) => {
                    debug!(content_id = %self.content_id, error = %err, "autoplay blocked");
                    self.store.set_playing(false);
                }
            }
        } else {
            if let Err(err) = self.player.pause().await {
                warn!(content_id = %self.content_id, error = %err, "pause failed");
            }
            self.store.set_playing(false);
        }
    }

    /// Player time update. Active items write `current / duration * 100` to
    /// the store and track one completion per activation.
    pub fn on_time_update(&mut self, current: f64, duration: f64) -> Option<JoinHandle<()>> {
        if !self.active || !duration.is_finite() || duration <= 0.0 || !current.is_finite() {
            return None;
        }
        let progress = current / duration * MAX_PROGRESS;
        self.store.set_progress(progress);
        if progress < MAX_PROGRESS || self.completed {
            return None;
        }
        self.completed = true;
        debug!(content_id = %self.content_id, "playback completed");
        Some(self.coordinator.track_interaction(
            &self.content_id,
            InteractionKind::Complete,
            Some(json!({ "durationSec": duration })),
        ))
    }

    /// Flip the playing flag and drive the player to match.
    pub async fn toggle_play(&self) -> anyhow::Result<()> {
        if self.store.toggle_play() {
            if let Err(err) = self.player.play().await {
                self.store.set_playing(false);
                return Err(err);
            }
            Ok(())
        } else {
            self.player.pause().await
        }
    }

    /// Skip backwards by the configured rewind interval.
    pub async fn rewind(&self) -> anyhow::Result<()> {
        self.player.seek(-self.config.rewind_secs).await
    }

    /// Push the store's playback speed to the player.
    pub async fn apply_speed(&self) -> anyhow::Result<()> {
        self.player
            .set_rate(self.store.snapshot().playback_speed)
            .await
    }

    /// Store a new playback speed and apply it. Invalid rates are ignored.
    pub async fn set_speed(&self, speed: f64) -> anyhow::Result<()> {
        if self.store.set_playback_speed(speed) {
            self.apply_speed().await?;
        }
        Ok(())
    }
}
