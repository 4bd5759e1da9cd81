//! Action bridge: best-effort pub/sub between the two processes
//!
//! Delivery is at-most-once per subscription lifetime: no acknowledgment,
//! no replay on reconnect, no cross-publisher ordering guarantee. Both
//! sides must tolerate a lost message; the player heals via its reconcile
//! pass over queue storage.

mod local;
mod message;
mod redis;

pub use local::LocalBridge;
pub use message::{Action, ActionMessage};
pub use redis::RedisBridge;

use crate::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Lazy, infinite sequence of inbound messages
///
/// The stream ends only when the underlying transport connection drops;
/// the consumer is expected to subscribe again.
pub type ActionStream = Pin<Box<dyn Stream<Item = ActionMessage> + Send>>;

/// Publish/subscribe capability independent of the concrete transport
///
/// Malformed inbound payloads are dropped (with a warning) inside the
/// transport, so subscribers only ever see well-formed messages.
#[async_trait]
pub trait ActionBridge: Send + Sync {
    /// Fire-and-forget broadcast on the shared channel
    async fn publish(&self, message: &ActionMessage) -> Result<()>;

    /// Open a fresh subscription for the lifetime of the connection
    async fn subscribe(&self) -> Result<ActionStream>;
}
