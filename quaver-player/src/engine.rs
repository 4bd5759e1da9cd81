//! Playback engine seam
//!
//! The audio-streaming engine is an external collaborator; the coordinator
//! only ever talks to it through this trait. The shipped [`NullEngine`]
//! accepts every command, which is enough to exercise the full
//! coordination path without an audio stack attached.

use async_trait::async_trait;
use quaver_common::Result;
use tracing::debug;

/// Commands the coordinator issues to the streaming engine
///
/// Implementations may block or hang; callers run them under a bounded
/// timeout.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Join the chat's session and start streaming the playable source
    async fn join_and_play(&self, chat_id: i64, playable_url: &str) -> Result<()>;

    async fn pause(&self, chat_id: i64) -> Result<()>;

    async fn resume(&self, chat_id: i64) -> Result<()>;

    /// Stop streaming and leave the chat's session
    async fn leave(&self, chat_id: i64) -> Result<()>;

    async fn set_volume(&self, chat_id: i64, volume: u16) -> Result<()>;
}

/// Engine stand-in that accepts every command
pub struct NullEngine;

#[async_trait]
impl PlaybackEngine for NullEngine {
    async fn join_and_play(&self, chat_id: i64, playable_url: &str) -> Result<()> {
        debug!("Engine join chat {} with {}", chat_id, playable_url);
        Ok(())
    }

    async fn pause(&self, chat_id: i64) -> Result<()> {
        debug!("Engine pause chat {}", chat_id);
        Ok(())
    }

    async fn resume(&self, chat_id: i64) -> Result<()> {
        debug!("Engine resume chat {}", chat_id);
        Ok(())
    }

    async fn leave(&self, chat_id: i64) -> Result<()> {
        debug!("Engine leave chat {}", chat_id);
        Ok(())
    }

    async fn set_volume(&self, chat_id: i64, volume: u16) -> Result<()> {
        debug!("Engine set volume {} for chat {}", volume, chat_id);
        Ok(())
    }
}
