//! Integration tests for the persistent queue
//!
//! Covers FIFO ordering, exactly-once pop, explicit empty results,
//! per-chat isolation, and enqueue/pop races against a file-backed
//! database.

use quaver_common::db::{create_queue_table, init_database};
use quaver_common::queue::{PersistentQueue, TrackRequest};
use serde_json::{json, Map};
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

/// In-memory test queue; a single connection so every statement sees the
/// same database
async fn create_test_queue() -> PersistentQueue {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    create_queue_table(&pool).await.unwrap();
    PersistentQueue::new(pool)
}

fn request(chat_id: i64, title: &str) -> TrackRequest {
    TrackRequest {
        chat_id,
        requester_id: 1000,
        title: title.to_string(),
        source_locator: format!("https://example.com/{}", title),
        metadata: Map::new(),
    }
}

#[tokio::test]
async fn enqueue_assigns_sequential_positions_from_zero() {
    let queue = create_test_queue().await;

    let first = queue.enqueue(request(1, "Song A")).await.unwrap();
    let second = queue.enqueue(request(1, "Song B")).await.unwrap();
    let third = queue.enqueue(request(1, "Song C")).await.unwrap();

    assert_eq!(first.position, 0);
    assert_eq!(second.position, 1);
    assert_eq!(third.position, 2);
}

#[tokio::test]
async fn list_returns_items_in_enqueue_order() {
    let queue = create_test_queue().await;

    queue.enqueue(request(1, "Song A")).await.unwrap();
    queue.enqueue(request(1, "Song B")).await.unwrap();

    let titles: Vec<String> = queue
        .list(1)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect();
    assert_eq!(titles, vec!["Song A", "Song B"]);

    let head = queue.pop_next(1).await.unwrap().unwrap();
    assert_eq!(head.title, "Song A");

    let titles: Vec<String> = queue
        .list(1)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect();
    assert_eq!(titles, vec!["Song B"]);
}

#[tokio::test]
async fn pop_next_on_empty_queue_returns_none() {
    let queue = create_test_queue().await;
    assert!(queue.pop_next(1).await.unwrap().is_none());

    // Still None after draining a non-empty queue
    queue.enqueue(request(1, "Song A")).await.unwrap();
    assert!(queue.pop_next(1).await.unwrap().is_some());
    assert!(queue.pop_next(1).await.unwrap().is_none());
}

#[tokio::test]
async fn positions_keep_growing_after_pops() {
    let queue = create_test_queue().await;

    queue.enqueue(request(1, "Song A")).await.unwrap();
    queue.enqueue(request(1, "Song B")).await.unwrap();
    queue.pop_next(1).await.unwrap();

    // "Song B" holds position 1, so the next insert lands at 2
    let third = queue.enqueue(request(1, "Song C")).await.unwrap();
    assert_eq!(third.position, 2);

    let head = queue.pop_next(1).await.unwrap().unwrap();
    assert_eq!(head.title, "Song B");
}

#[tokio::test]
async fn positions_restart_after_queue_drains() {
    let queue = create_test_queue().await;

    // A consumer that keeps up drains the queue between enqueues, so
    // every insert lands back at position zero
    let mut popped = Vec::new();
    for title in ["Song A", "Song B", "Song C", "Song D"] {
        queue.enqueue(request(1, title)).await.unwrap();
        let item = queue.pop_next(1).await.unwrap().unwrap();
        popped.push((item.position, item.title));
    }

    let positions: Vec<i64> = popped.iter().map(|(position, _)| *position).collect();
    assert_eq!(positions, vec![0, 0, 0, 0]);

    // Reused numbering never duplicates or drops a delivery
    let titles: Vec<&str> = popped.iter().map(|(_, title)| title.as_str()).collect();
    assert_eq!(titles, vec!["Song A", "Song B", "Song C", "Song D"]);
}

#[tokio::test]
async fn clear_removes_all_rows_and_reports_count() {
    let queue = create_test_queue().await;

    queue.enqueue(request(1, "Song A")).await.unwrap();
    queue.enqueue(request(1, "Song B")).await.unwrap();
    queue.enqueue(request(2, "Other Chat Song")).await.unwrap();

    assert_eq!(queue.clear(1).await.unwrap(), 2);
    assert_eq!(queue.len(1).await.unwrap(), 0);
    assert!(queue.pop_next(1).await.unwrap().is_none());

    // Clearing chat 1 leaves chat 2 alone
    assert_eq!(queue.len(2).await.unwrap(), 1);
    assert_eq!(queue.clear(1).await.unwrap(), 0);
}

#[tokio::test]
async fn chats_have_independent_sequences() {
    let queue = create_test_queue().await;

    queue.enqueue(request(1, "Chat1 First")).await.unwrap();
    let other = queue.enqueue(request(2, "Chat2 First")).await.unwrap();
    queue.enqueue(request(1, "Chat1 Second")).await.unwrap();

    // Each chat starts its own sequence at zero
    assert_eq!(other.position, 0);

    let head = queue.pop_next(2).await.unwrap().unwrap();
    assert_eq!(head.title, "Chat2 First");
    assert_eq!(queue.len(1).await.unwrap(), 2);
}

#[tokio::test]
async fn pending_chats_lists_chats_with_rows() {
    let queue = create_test_queue().await;
    assert!(queue.pending_chats().await.unwrap().is_empty());

    queue.enqueue(request(5, "a")).await.unwrap();
    queue.enqueue(request(3, "b")).await.unwrap();
    queue.enqueue(request(5, "c")).await.unwrap();

    assert_eq!(queue.pending_chats().await.unwrap(), vec![3, 5]);

    queue.clear(5).await.unwrap();
    assert_eq!(queue.pending_chats().await.unwrap(), vec![3]);
}

#[tokio::test]
async fn metadata_and_requester_round_trip() {
    let queue = create_test_queue().await;

    let mut metadata = Map::new();
    metadata.insert("duration".to_string(), json!(215));
    metadata.insert("uploader".to_string(), json!("someone"));

    let mut req = request(1, "Song A");
    req.requester_id = 42;
    req.metadata = metadata.clone();
    queue.enqueue(req).await.unwrap();

    let item = queue.pop_next(1).await.unwrap().unwrap();
    assert_eq!(item.requester_id, 42);
    assert_eq!(item.metadata, metadata);
    assert_eq!(item.source_locator, "https://example.com/Song A");
}

/// Enqueue/pop races on one chat must never duplicate or drop an item.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_and_consumers_never_duplicate_or_lose() {
    const PRODUCERS: i64 = 3;
    const PER_PRODUCER: i64 = 20;
    const TOTAL: usize = (PRODUCERS * PER_PRODUCER) as usize;
    const CHAT: i64 = 7;

    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("quaver.db")).await.unwrap();
    let queue = PersistentQueue::new(pool);

    let collected: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = Vec::new();

    for p in 0..PRODUCERS {
        let queue = queue.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                queue
                    .enqueue(request(CHAT, &format!("track-{}-{}", p, i)))
                    .await
                    .unwrap();
            }
        }));
    }

    for _ in 0..3 {
        let queue = queue.clone();
        let collected = collected.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                if collected.lock().unwrap().len() >= TOTAL {
                    break;
                }
                match queue.pop_next(CHAT).await.unwrap() {
                    Some(item) => {
                        collected.lock().unwrap().push(item.title);
                    }
                    None => tokio::time::sleep(Duration::from_millis(2)).await,
                }
            }
        }));
    }

    for task in tasks {
        timeout(Duration::from_secs(30), task)
            .await
            .expect("stress test stalled: an item was lost")
            .unwrap();
    }

    let collected = collected.lock().unwrap();
    assert_eq!(collected.len(), TOTAL);

    // Exactly-once delivery, checked by title; positions are not checked
    // because numbering restarts whenever the consumers drain the chat
    let titles: HashSet<&str> = collected.iter().map(|title| title.as_str()).collect();
    assert_eq!(titles.len(), TOTAL);

    assert_eq!(queue.len(CHAT).await.unwrap(), 0);
}
