//! In-process bridge transport
//!
//! Backed by a `tokio::sync::broadcast` channel. Used by tests and by
//! single-process deployments where both halves run in one runtime. Keeps
//! the same at-most-once semantics as the network transport: subscribers
//! only see messages published after they subscribed, and a slow consumer
//! loses the oldest buffered messages rather than blocking publishers.

use super::{ActionBridge, ActionMessage, ActionStream};
use crate::Result;
use async_trait::async_trait;
use futures::{future, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Broadcast-channel bridge for in-process pub/sub
#[derive(Clone)]
pub struct LocalBridge {
    tx: broadcast::Sender<ActionMessage>,
}

impl LocalBridge {
    /// Create a bridge buffering up to `capacity` undelivered messages per
    /// subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocalBridge {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl ActionBridge for LocalBridge {
    async fn publish(&self, message: &ActionMessage) -> Result<()> {
        // No receivers is not an error for fire-and-forget publish
        match self.tx.send(message.clone()) {
            Ok(count) => debug!("Delivered {} to {} local subscribers", message.action, count),
            Err(_) => debug!("No local subscribers for {}", message.action),
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<ActionStream> {
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx).filter_map(|result| {
            future::ready(match result {
                Ok(message) => Some(message),
                Err(e) => {
                    // Lagged subscriber: skip the lost range, keep the stream
                    warn!("Local bridge subscriber lagged: {:?}", e);
                    None
                }
            })
        });
        Ok(Box::pin(stream))
    }
}
