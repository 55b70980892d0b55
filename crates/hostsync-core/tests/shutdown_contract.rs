//! Contract test: shutdown cleanup and write-failure retention
//!
//! - graceful shutdown clears the managed block exactly once
//! - a failed store write is not dropped: the table retains the desired
//!   state and the next triggering write converges

mod common;

use common::*;
use hostsync_core::model::EventKind;
use hostsync_core::{EngineEvent, SyncEngine};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn graceful_shutdown_clears_managed_block() {
    let runtime = ScriptedRuntime::new();
    runtime.add_container(container("c-web", "web", "172.18.0.2", &[]));

    let store = RecordingStore::new();
    let (engine, _events) = SyncEngine::new(
        Arc::new(runtime.clone()),
        Box::new(store.clone()),
        test_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(engine.run_with_shutdown(shutdown_rx));
    runtime.wait_for_subscriptions(1).await;

    assert!(store.has_block().await);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert!(!store.has_block().await, "markers must be removed on shutdown");
    assert_eq!(store.clear_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_write_converges_on_next_event() {
    let runtime = ScriptedRuntime::new();
    let store = RecordingStore::new();
    let (engine, mut events) = SyncEngine::new(
        Arc::new(runtime.clone()),
        Box::new(store.clone()),
        test_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(engine.run_with_shutdown(shutdown_rx));
    runtime.wait_for_subscriptions(1).await;

    // First update hits a failing store.
    store.set_fail_writes(true);
    runtime.add_container(container("c-web", "web", "172.18.0.2", &[]));
    runtime.push_event(EventKind::Started, "c-web");
    settle().await;
    assert!(store.entries().await.is_empty());

    // The store recovers; the next event's write carries the missed
    // container too.
    store.set_fail_writes(false);
    runtime.add_container(container("c-db", "db", "172.18.0.3", &[]));
    runtime.push_event(EventKind::Started, "c-db");
    settle().await;

    assert_eq!(
        store.entries().await,
        entry_set(&[("172.18.0.2", "web"), ("172.18.0.3", "db")])
    );

    // The failure was surfaced, not swallowed.
    let mut saw_write_failed = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, EngineEvent::WriteFailed { .. }) {
            saw_write_failed = true;
        }
    }
    assert!(saw_write_failed);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn identical_state_triggers_no_extra_writes() {
    let runtime = ScriptedRuntime::new();
    runtime.add_container(container("c-web", "web", "172.18.0.2", &[]));

    let store = RecordingStore::new();
    let (engine, _events) = SyncEngine::new(
        Arc::new(runtime.clone()),
        Box::new(store.clone()),
        test_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(engine.run_with_shutdown(shutdown_rx));
    runtime.wait_for_subscriptions(1).await;

    let after_startup = store.write_count();

    // A change event that resolves to the same entry set writes nothing.
    runtime.push_event(EventKind::NetworkChanged, "c-web");
    settle().await;

    assert_eq!(store.write_count(), after_startup);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
