//! Persistent per-chat request queue
//!
//! Durable FIFO of pending playback requests, one ordered sequence per
//! chat, shared by the intake and player processes through the database.
//! Every operation is a single self-contained SQL statement, so concurrent
//! callers (same process or not) never observe a half-applied enqueue or
//! pop and no item can be delivered twice.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::debug;

/// A queued playback request as stored
///
/// Identity is `(chat_id, position)`. Rows are never mutated in place;
/// they exist from enqueue until popped or cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub chat_id: i64,
    pub position: i64,
    pub requester_id: i64,
    pub title: String,
    pub source_locator: String,
    pub metadata: Map<String, Value>,
    pub requested_at: DateTime<Utc>,
}

/// Input for [`PersistentQueue::enqueue`]; position and timestamp are
/// assigned on insert
#[derive(Debug, Clone)]
pub struct TrackRequest {
    pub chat_id: i64,
    pub requester_id: i64,
    pub title: String,
    pub source_locator: String,
    pub metadata: Map<String, Value>,
}

/// Database-backed queue handle
#[derive(Clone)]
pub struct PersistentQueue {
    db: SqlitePool,
}

type QueueRow = (i64, i64, i64, String, String, String, DateTime<Utc>);

impl PersistentQueue {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append a request to the chat's queue
    ///
    /// Assigns the next position (max existing + 1, or 0 for an empty
    /// queue) and inserts in one atomic statement. Returns the stored item
    /// with its assigned position.
    pub async fn enqueue(&self, request: TrackRequest) -> Result<QueueItem> {
        let metadata_json = serde_json::to_string(&request.metadata)?;
        let requested_at = Utc::now();

        let position: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO queue (chat_id, position, requester_id, title, source_locator, metadata, requested_at)
            SELECT ?1, COALESCE(MAX(position) + 1, 0), ?2, ?3, ?4, ?5, ?6
            FROM queue
            WHERE chat_id = ?1
            RETURNING position
            "#,
        )
        .bind(request.chat_id)
        .bind(request.requester_id)
        .bind(&request.title)
        .bind(&request.source_locator)
        .bind(&metadata_json)
        .bind(requested_at)
        .fetch_one(&self.db)
        .await?;

        debug!(
            "Enqueued '{}' for chat {} at position {}",
            request.title, request.chat_id, position
        );

        Ok(QueueItem {
            chat_id: request.chat_id,
            position,
            requester_id: request.requester_id,
            title: request.title,
            source_locator: request.source_locator,
            metadata: request.metadata,
            requested_at,
        })
    }

    /// Remove and return the lowest-position item for the chat
    ///
    /// Delete and read happen in one statement; an empty queue yields
    /// `Ok(None)`, never an error.
    pub async fn pop_next(&self, chat_id: i64) -> Result<Option<QueueItem>> {
        let row: Option<QueueRow> = sqlx::query_as(
            r#"
            DELETE FROM queue
            WHERE chat_id = ?1
              AND position = (SELECT MIN(position) FROM queue WHERE chat_id = ?1)
            RETURNING chat_id, position, requester_id, title, source_locator, metadata, requested_at
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let item = row_to_item(row)?;
                debug!(
                    "Popped '{}' (position {}) for chat {}",
                    item.title, item.position, chat_id
                );
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Read-only ordered snapshot of the chat's queue
    pub async fn list(&self, chat_id: i64) -> Result<Vec<QueueItem>> {
        let rows: Vec<QueueRow> = sqlx::query_as(
            r#"
            SELECT chat_id, position, requester_id, title, source_locator, metadata, requested_at
            FROM queue
            WHERE chat_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }

    /// Delete all rows for the chat; returns the number removed
    pub async fn clear(&self, chat_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM queue WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&self.db)
            .await?;

        let removed = result.rows_affected();
        debug!("Cleared {} queued items for chat {}", removed, chat_id);
        Ok(removed)
    }

    /// Number of queued items for the chat
    pub async fn len(&self, chat_id: i64) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count as usize)
    }

    /// Chats that currently have at least one queued item
    ///
    /// Used by the player's reconcile pass to find work that arrived while
    /// no bridge message made it through.
    pub async fn pending_chats(&self) -> Result<Vec<i64>> {
        let chats: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT chat_id FROM queue ORDER BY chat_id")
                .fetch_all(&self.db)
                .await?;

        Ok(chats)
    }
}

fn row_to_item(row: QueueRow) -> Result<QueueItem> {
    let (chat_id, position, requester_id, title, source_locator, metadata, requested_at) = row;
    let metadata: Map<String, Value> = serde_json::from_str(&metadata)?;

    Ok(QueueItem {
        chat_id,
        position,
        requester_id,
        title,
        source_locator,
        metadata,
        requested_at,
    })
}
