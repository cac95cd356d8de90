//! Integration tests for the biseo-store crate.
//!
//! These exercise the session store under concurrent access and with the
//! background sweeper running on a real tokio runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use biseo_store::{Clock, ManualClock, SessionStore, StoreError, SystemClock, new_session_id};
use chrono::{DateTime, Utc};

fn manual_clock() -> Arc<ManualClock> {
    let start = DateTime::parse_from_rfc3339("2026-03-02T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    Arc::new(ManualClock::new(start))
}

// ═══════════════════════════════════════════════════════════════════════
//  Exactly-once consumption
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_take_has_single_winner() {
    let store: Arc<SessionStore<String>> = Arc::new(SessionStore::new(Arc::new(SystemClock)));
    let id = new_session_id("u1");
    store.put(&id, "u1", "payload".to_string(), Duration::from_secs(60));

    let winners = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let winners = Arc::clone(&winners);
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            if store.take(&id, "u1").is_ok() {
                winners.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert!(store.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_are_serialised() {
    let store: Arc<SessionStore<Vec<u32>>> = Arc::new(SessionStore::new(Arc::new(SystemClock)));
    store.put("s", "u1", Vec::new(), Duration::from_secs(60));

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.update("s", "u1", |items| items.push(i)).unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut items = store.get("s", "u1").unwrap();
    items.sort_unstable();
    assert_eq!(items, (0..32).collect::<Vec<_>>());
}

// ═══════════════════════════════════════════════════════════════════════
//  Expiry
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn session_expires_after_ttl_on_manual_clock() {
    let clock = manual_clock();
    let store: SessionStore<u8> = SessionStore::new(clock.clone() as Arc<dyn Clock>);
    store.put("s", "u1", 1, Duration::from_secs(10 * 60));

    clock.advance(Duration::from_secs(9 * 60));
    assert_eq!(store.get("s", "u1").unwrap(), 1);

    clock.advance(Duration::from_secs(2 * 60));
    assert!(matches!(
        store.take("s", "u1"),
        Err(StoreError::SessionNotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn background_sweeper_drops_expired_entries() {
    let clock = manual_clock();
    let store: Arc<SessionStore<u8>> =
        Arc::new(SessionStore::new(clock.clone() as Arc<dyn Clock>));
    store.put("a", "u1", 1, Duration::from_secs(30));
    store.put("b", "u1", 2, Duration::from_secs(3600));

    let sweeper = store.spawn_sweeper(Duration::from_secs(60));
    clock.advance(Duration::from_secs(120));
    tokio::time::sleep(Duration::from_secs(61)).await;
    tokio::task::yield_now().await;

    assert_eq!(store.len(), 1);
    sweeper.abort();
}
