//! Redis pub/sub bridge transport
//!
//! One shared channel carries every chat's control traffic; subscribers
//! filter locally. Publishing goes through a managed connection that
//! re-establishes itself after a broken link. Subscriptions are plain
//! pub/sub connections: when one drops, its stream ends and the consumer
//! subscribes again, accepting the loss of anything published in between.

use super::{ActionBridge, ActionMessage, ActionStream};
use crate::Result;
use async_trait::async_trait;
use futures::{future, StreamExt};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

/// Redis-backed bridge on a single shared channel
#[derive(Clone)]
pub struct RedisBridge {
    client: redis::Client,
    publisher: ConnectionManager,
    channel: String,
}

impl RedisBridge {
    /// Connect to Redis and prepare the publishing connection
    pub async fn connect(url: &str, channel: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        info!("Connected to Redis bridge at {} (channel '{}')", url, channel);

        Ok(Self {
            client,
            publisher,
            channel: channel.to_string(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    fn decode(msg: &redis::Msg) -> Option<ActionMessage> {
        let raw: String = match msg.get_payload() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Dropping non-text bridge payload: {}", e);
                return None;
            }
        };

        match ActionMessage::from_json(&raw) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Dropping malformed bridge message: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ActionBridge for RedisBridge {
    async fn publish(&self, message: &ActionMessage) -> Result<()> {
        let body = message.to_json()?;
        let mut conn = self.publisher.clone();
        let subscribers: i64 = conn.publish(&self.channel, body).await?;
        debug!(
            "Published {} for chat {} to {} subscribers",
            message.action, message.chat_id, subscribers
        );
        Ok(())
    }

    async fn subscribe(&self) -> Result<ActionStream> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;
        info!("Subscribed to bridge channel '{}'", self.channel);

        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| future::ready(Self::decode(&msg)));
        Ok(Box::pin(stream))
    }
}
