//! Bridge listen loop
//!
//! Long-lived background task consuming action messages for the life of
//! the process. One failing message never terminates the loop, and a
//! dropped transport connection leads to a fresh subscription after a
//! short delay. Anything published during the gap is lost; the reconcile
//! pass over queue storage heals it later.

use futures::StreamExt;
use quaver_common::bridge::ActionBridge;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::coordinator::PlaybackCoordinator;

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(2);

/// Spawn the subscribe loop feeding the coordinator
pub fn spawn_listener(
    coordinator: PlaybackCoordinator,
    bridge: Arc<dyn ActionBridge>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let mut stream = match bridge.subscribe().await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(
                        "Bridge subscribe failed: {} (retrying in {:?})",
                        e, RESUBSCRIBE_DELAY
                    );
                    tokio::time::sleep(RESUBSCRIBE_DELAY).await;
                    continue;
                }
            };
            info!("Listening for action messages");

            while let Some(message) = stream.next().await {
                debug!(
                    "Received {} for chat {} from user {}",
                    message.action, message.chat_id, message.user_id
                );
                if let Err(e) = coordinator.handle(&message).await {
                    error!(
                        "Action {} failed for chat {}: {}",
                        message.action, message.chat_id, e
                    );
                }
            }

            warn!(
                "Bridge stream ended, resubscribing in {:?}",
                RESUBSCRIBE_DELAY
            );
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        }
    })
}
