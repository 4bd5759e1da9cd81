//! Command intake
//!
//! Validates inbound playback commands, persists play requests to the
//! shared queue, and relays control actions to the execution process over
//! the action bridge.
//!
//! The controller keeps a local "now playing" cache to decide whether a
//! play request should kick playback immediately or just wait in the
//! queue. The cache is advisory only; the execution process owns the
//! authoritative per-chat state, and its periodic reconcile pass against
//! queue storage recovers from any stale belief here.

use chrono::{DateTime, Utc};
use quaver_common::bridge::{Action, ActionBridge, ActionMessage};
use quaver_common::queue::{PersistentQueue, QueueItem, TrackRequest};
use quaver_common::{Error, Result};
use serde_json::Map;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Advisory record of a chat this process believes is playing
#[derive(Debug, Clone)]
pub struct ActiveMark {
    pub title: String,
    pub since: DateTime<Utc>,
}

/// Result of a play command
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// The chat was believed idle; a play message went out for this title
    Started { title: String },
    /// The chat was believed active; the item waits in the queue
    Queued { title: String, position: i64 },
}

/// Request-side command handler
///
/// Owns no playback logic. Every mutation is either a queue write or a
/// published action message.
#[derive(Clone)]
pub struct IntakeController {
    queue: PersistentQueue,
    bridge: Arc<dyn ActionBridge>,
    now_playing: Arc<RwLock<HashMap<i64, ActiveMark>>>,
}

impl IntakeController {
    pub fn new(queue: PersistentQueue, bridge: Arc<dyn ActionBridge>) -> Self {
        Self {
            queue,
            bridge,
            now_playing: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Handle a play request: enqueue, and kick playback if the chat is
    /// believed idle
    ///
    /// The kick pops the queue head rather than the item just written, so
    /// requests left over from an earlier session keep their turn.
    pub async fn play(&self, chat_id: i64, user_id: i64, query: &str) -> Result<PlayOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation(
                "play requires a song name or URL".to_string(),
            ));
        }

        let item = self
            .queue
            .enqueue(TrackRequest {
                chat_id,
                requester_id: user_id,
                title: query.to_string(),
                source_locator: query.to_string(),
                metadata: Map::new(),
            })
            .await?;

        if self.believed_active(chat_id).await {
            info!(
                "Chat {} believed active, queued '{}' at position {}",
                chat_id, item.title, item.position
            );
            return Ok(PlayOutcome::Queued {
                title: item.title,
                position: item.position,
            });
        }

        let Some(head) = self.queue.pop_next(chat_id).await? else {
            // Another consumer drained the queue between enqueue and pop
            debug!("Chat {} queue drained before kick, nothing to start", chat_id);
            return Ok(PlayOutcome::Queued {
                title: item.title,
                position: item.position,
            });
        };

        let message = ActionMessage::play(chat_id, user_id, &head.source_locator, &head.title);
        if let Err(e) = self.bridge.publish(&message).await {
            // The head item already left the queue; the caller sees the
            // failure and can retry with a fresh request
            warn!(
                "Chat {} kick failed, '{}' was not delivered: {}",
                chat_id, head.title, e
            );
            return Err(e);
        }

        self.mark_active(chat_id, &head.title).await;
        info!("Chat {} kicked playback with '{}'", chat_id, head.title);
        Ok(PlayOutcome::Started { title: head.title })
    }

    /// Relay a control action to the execution process
    ///
    /// `play` needs a query and `stop` clears the queue, so both are
    /// rejected here in favor of their dedicated entry points.
    pub async fn control(&self, chat_id: i64, user_id: i64, action: Action) -> Result<()> {
        match action {
            Action::Play => Err(Error::Validation(
                "play requires a song name or URL".to_string(),
            )),
            Action::Stop => Err(Error::Validation(
                "stop must go through the stop command".to_string(),
            )),
            action => {
                let message = ActionMessage::new(action, chat_id, user_id);
                self.bridge.publish(&message).await?;
                debug!("Chat {} relayed {} for user {}", chat_id, message.action, user_id);
                Ok(())
            }
        }
    }

    /// Stop playback and drop everything queued for the chat
    ///
    /// The queue is cleared before the stop message goes out so the
    /// execution side's reconcile pass cannot restart the chat from
    /// leftover items. Returns the number of dropped queue items.
    pub async fn stop(&self, chat_id: i64, user_id: i64) -> Result<u64> {
        let removed = self.queue.clear(chat_id).await?;
        self.now_playing.write().await.remove(&chat_id);

        let message = ActionMessage::new(Action::Stop, chat_id, user_id);
        self.bridge.publish(&message).await?;

        info!("Chat {} stopped, {} queued items dropped", chat_id, removed);
        Ok(removed)
    }

    /// List the chat's pending queue in playback order
    pub async fn list(&self, chat_id: i64) -> Result<Vec<QueueItem>> {
        self.queue.list(chat_id).await
    }

    /// Clear the chat's queue without stopping the current track
    pub async fn clear(&self, chat_id: i64) -> Result<u64> {
        let removed = self.queue.clear(chat_id).await?;
        info!("Chat {} queue cleared, {} items removed", chat_id, removed);
        Ok(removed)
    }

    /// Title this process believes the chat is playing, if any
    pub async fn now_playing(&self, chat_id: i64) -> Option<ActiveMark> {
        self.now_playing.read().await.get(&chat_id).cloned()
    }

    async fn believed_active(&self, chat_id: i64) -> bool {
        self.now_playing.read().await.contains_key(&chat_id)
    }

    async fn mark_active(&self, chat_id: i64, title: &str) {
        self.now_playing.write().await.insert(
            chat_id,
            ActiveMark {
                title: title.to_string(),
                since: Utc::now(),
            },
        );
    }
}
