//! Per-chat playback state machine
//!
//! Owns the authoritative "now playing" map. Each chat is either absent
//! (idle) or holds one [`PlaybackState`], moving between playing and
//! paused. Skip pops the chat's queue and chains straight into the next
//! item without any external message; stop never auto-advances.
//!
//! Invariants:
//! - at most one state per chat, and its absence means no active session
//! - a failed play leaves no state behind
//! - position advances only while playing and freezes while paused
//! - volume stays within `[0, MAX_VOLUME]`

use quaver_common::bridge::{Action, ActionMessage};
use quaver_common::config::PlayerSettings;
use quaver_common::queue::PersistentQueue;
use quaver_common::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::PlaybackEngine;
use crate::resolver::{ResolvedSource, SourceResolver};

/// Volume for a freshly started session
pub const DEFAULT_VOLUME: u16 = 100;
/// Upper volume bound
pub const MAX_VOLUME: u16 = 200;
/// Step applied by one volume_up/volume_down
pub const VOLUME_STEP: u16 = 10;

/// Authoritative playback state for one chat
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub chat_id: i64,
    pub title: String,
    /// Original unresolved locator, kept so rewind can re-resolve it
    pub source_locator: String,
    pub is_playing: bool,
    /// Elapsed seconds; advanced by the chat's ticker
    pub position: u64,
    pub volume: u16,
    /// Length in seconds, when resolution knew it
    pub duration: Option<u64>,
    /// Distinguishes ticker generations across session replacement
    #[serde(skip)]
    session: Uuid,
}

/// Timing budgets for the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub tick_interval: Duration,
    pub resolve_timeout: Duration,
    pub join_timeout: Duration,
    pub reconcile_interval: Duration,
}

impl From<&PlayerSettings> for CoordinatorConfig {
    fn from(settings: &PlayerSettings) -> Self {
        Self {
            tick_interval: settings.tick_interval(),
            resolve_timeout: settings.resolve_timeout(),
            join_timeout: settings.join_timeout(),
            reconcile_interval: settings.reconcile_interval(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&PlayerSettings::default())
    }
}

/// Execution-side playback coordinator
///
/// Clone shares the underlying state; background tasks (tickers, the
/// reconcile loop) hold clones.
#[derive(Clone)]
pub struct PlaybackCoordinator {
    queue: PersistentQueue,
    engine: Arc<dyn PlaybackEngine>,
    resolver: Arc<dyn SourceResolver>,
    states: Arc<RwLock<HashMap<i64, PlaybackState>>>,
    config: CoordinatorConfig,
}

impl PlaybackCoordinator {
    pub fn new(
        queue: PersistentQueue,
        engine: Arc<dyn PlaybackEngine>,
        resolver: Arc<dyn SourceResolver>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            queue,
            engine,
            resolver,
            states: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Dispatch one inbound action message
    ///
    /// Errors are reported to the caller; they never poison the state map.
    /// Any non-play action for a chat with no active session is a no-op.
    pub async fn handle(&self, message: &ActionMessage) -> Result<()> {
        let chat_id = message.chat_id;
        match message.action {
            Action::Play => {
                let locator = message.payload_str("locator").ok_or_else(|| {
                    Error::Validation("play message without source locator".to_string())
                })?;
                self.play(chat_id, locator).await
            }
            Action::Pause => self.pause(chat_id).await,
            Action::Resume => self.resume(chat_id).await,
            Action::Toggle => self.toggle(chat_id).await,
            Action::Skip => self.skip(chat_id).await,
            Action::Stop => self.stop(chat_id).await,
            Action::Rewind => self.rewind(chat_id).await,
            Action::VolumeUp => self.adjust_volume(chat_id, VOLUME_STEP as i32).await,
            Action::VolumeDown => self.adjust_volume(chat_id, -(VOLUME_STEP as i32)).await,
        }
    }

    /// Resolve the locator, start the engine, and enter Playing
    ///
    /// A chat that already has a session gets it replaced outright. On any
    /// failure the chat ends up idle with no partial state.
    pub async fn play(&self, chat_id: i64, locator: &str) -> Result<()> {
        if self.remove_state(chat_id).await.is_some() {
            if let Err(e) = self.engine.leave(chat_id).await {
                warn!("Engine leave before replacement failed for chat {}: {}", chat_id, e);
            }
        }

        let resolved = self.resolve_with_timeout(locator).await?;
        self.join_with_timeout(chat_id, &resolved.playable_url).await?;

        let state = PlaybackState {
            chat_id,
            title: resolved.title,
            source_locator: locator.to_string(),
            is_playing: true,
            position: 0,
            volume: DEFAULT_VOLUME,
            duration: resolved.duration,
            session: Uuid::new_v4(),
        };
        let session = state.session;
        info!("Chat {} now playing '{}'", chat_id, state.title);

        self.states.write().await.insert(chat_id, state);
        self.spawn_ticker(chat_id, session);
        Ok(())
    }

    /// Pause a playing session; pausing an already-paused session resumes
    /// it (the historical inversion, deliberately not a no-op)
    pub async fn pause(&self, chat_id: i64) -> Result<()> {
        let Some(was_playing) = self.is_playing(chat_id).await else {
            return Ok(());
        };

        if was_playing {
            self.run_engine(chat_id, self.engine.pause(chat_id)).await?;
            self.set_playing(chat_id, false).await;
            info!("Chat {} paused", chat_id);
        } else {
            self.run_engine(chat_id, self.engine.resume(chat_id)).await?;
            self.set_playing(chat_id, true).await;
            info!("Chat {} resumed", chat_id);
        }
        Ok(())
    }

    /// Set the session playing; idempotent when already playing
    pub async fn resume(&self, chat_id: i64) -> Result<()> {
        if self.is_playing(chat_id).await.is_none() {
            return Ok(());
        }

        self.run_engine(chat_id, self.engine.resume(chat_id)).await?;
        self.set_playing(chat_id, true).await;
        info!("Chat {} resumed", chat_id);
        Ok(())
    }

    /// Strict flip between playing and paused
    pub async fn toggle(&self, chat_id: i64) -> Result<()> {
        let Some(was_playing) = self.is_playing(chat_id).await else {
            return Ok(());
        };

        if was_playing {
            self.run_engine(chat_id, self.engine.pause(chat_id)).await?;
            self.set_playing(chat_id, false).await;
            info!("Chat {} paused", chat_id);
        } else {
            self.run_engine(chat_id, self.engine.resume(chat_id)).await?;
            self.set_playing(chat_id, true).await;
            info!("Chat {} resumed", chat_id);
        }
        Ok(())
    }

    /// Drop the current session and chain into the next queued item, if
    /// any; no external play message is involved
    pub async fn skip(&self, chat_id: i64) -> Result<()> {
        if self.remove_state(chat_id).await.is_none() {
            return Ok(());
        }
        if let Err(e) = self.engine.leave(chat_id).await {
            warn!("Engine leave on skip failed for chat {}: {}", chat_id, e);
        }

        match self.queue.pop_next(chat_id).await? {
            Some(item) => {
                info!("Chat {} advancing to '{}'", chat_id, item.title);
                self.play(chat_id, &item.source_locator).await
            }
            None => {
                info!("Chat {} queue empty after skip, now idle", chat_id);
                Ok(())
            }
        }
    }

    /// Drop the current session without auto-advancing
    pub async fn stop(&self, chat_id: i64) -> Result<()> {
        if self.remove_state(chat_id).await.is_none() {
            return Ok(());
        }
        if let Err(e) = self.engine.leave(chat_id).await {
            warn!("Engine leave on stop failed for chat {}: {}", chat_id, e);
        }
        info!("Chat {} stopped", chat_id);
        Ok(())
    }

    /// Restart the current source from position zero
    pub async fn rewind(&self, chat_id: i64) -> Result<()> {
        let Some(locator) = self
            .states
            .read()
            .await
            .get(&chat_id)
            .map(|state| state.source_locator.clone())
        else {
            return Ok(());
        };

        info!("Chat {} rewinding", chat_id);
        self.play(chat_id, &locator).await
    }

    /// Shift volume by `delta`, clamped to `[0, MAX_VOLUME]`, and apply it
    /// to the engine; works for playing and paused sessions alike
    pub async fn adjust_volume(&self, chat_id: i64, delta: i32) -> Result<()> {
        let new_volume = {
            let mut states = self.states.write().await;
            let Some(state) = states.get_mut(&chat_id) else {
                return Ok(());
            };
            let clamped = (state.volume as i32 + delta).clamp(0, MAX_VOLUME as i32) as u16;
            state.volume = clamped;
            clamped
        };

        self.run_engine(chat_id, self.engine.set_volume(chat_id, new_volume))
            .await?;
        debug!("Chat {} volume now {}", chat_id, new_volume);
        Ok(())
    }

    /// One pass over queue storage: every chat holding pending items but
    /// no active session gets its head item started
    ///
    /// This is the recovery path for bridge messages that never arrived
    /// and for queue rows left over from a crash.
    pub async fn reconcile(&self) -> Result<()> {
        for chat_id in self.queue.pending_chats().await? {
            if self.states.read().await.contains_key(&chat_id) {
                continue;
            }
            let Some(item) = self.queue.pop_next(chat_id).await? else {
                continue;
            };
            info!("Reconcile starting '{}' for idle chat {}", item.title, chat_id);
            if let Err(e) = self.play(chat_id, &item.source_locator).await {
                error!("Reconcile failed to start playback for chat {}: {}", chat_id, e);
            }
        }
        Ok(())
    }

    /// Periodic reconcile task; the first pass runs immediately, which
    /// doubles as crash recovery at startup
    pub fn spawn_reconcile_loop(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.config.reconcile_interval);
            loop {
                interval.tick().await;
                if let Err(e) = coordinator.reconcile().await {
                    warn!("Reconcile pass failed: {}", e);
                }
            }
        })
    }

    /// Snapshot of every active session, ordered by chat id
    pub async fn snapshot(&self) -> Vec<PlaybackState> {
        let states = self.states.read().await;
        let mut all: Vec<PlaybackState> = states.values().cloned().collect();
        all.sort_by_key(|state| state.chat_id);
        all
    }

    /// Snapshot of one chat's session, if active
    pub async fn state_for(&self, chat_id: i64) -> Option<PlaybackState> {
        self.states.read().await.get(&chat_id).cloned()
    }

    async fn resolve_with_timeout(&self, locator: &str) -> Result<ResolvedSource> {
        match timeout(self.config.resolve_timeout, self.resolver.resolve(locator)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "source resolution exceeded {:?}",
                self.config.resolve_timeout
            ))),
        }
    }

    async fn join_with_timeout(&self, chat_id: i64, playable_url: &str) -> Result<()> {
        match timeout(
            self.config.join_timeout,
            self.engine.join_and_play(chat_id, playable_url),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "engine join exceeded {:?}",
                self.config.join_timeout
            ))),
        }
    }

    /// Run an engine command against an active session; a failure discards
    /// the session so no half-dead state lingers
    async fn run_engine<F>(&self, chat_id: i64, command: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match command.await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Engine command failed for chat {}: {}", chat_id, e);
                self.remove_state(chat_id).await;
                if let Err(leave_err) = self.engine.leave(chat_id).await {
                    warn!(
                        "Engine leave during cleanup failed for chat {}: {}",
                        chat_id, leave_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn remove_state(&self, chat_id: i64) -> Option<PlaybackState> {
        self.states.write().await.remove(&chat_id)
    }

    async fn is_playing(&self, chat_id: i64) -> Option<bool> {
        self.states
            .read()
            .await
            .get(&chat_id)
            .map(|state| state.is_playing)
    }

    async fn set_playing(&self, chat_id: i64, playing: bool) {
        if let Some(state) = self.states.write().await.get_mut(&chat_id) {
            state.is_playing = playing;
        }
    }

    /// Advance `position` once per tick while the session plays
    ///
    /// Removal of the state entry (or its replacement by a new session) is
    /// the cancellation signal; the task holds no other handle.
    fn spawn_ticker(&self, chat_id: i64, session: Uuid) {
        let states = Arc::clone(&self.states);
        let tick = self.config.tick_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            // The first tick fires immediately; consume it so position
            // stays at zero for a full interval
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut states = states.write().await;
                match states.get_mut(&chat_id) {
                    Some(state) if state.session == session => {
                        if state.is_playing {
                            state.position += 1;
                        }
                    }
                    _ => break,
                }
            }
            debug!("Progress ticker for chat {} stopped", chat_id);
        });
    }
}
