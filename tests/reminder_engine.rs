//! Exercises `ReminderEngine::create` against an in-memory store, in
//! particular the past-due synchronous-fire branch (§8 scenario 3):
//! `remind_at <= now` must publish and mark `sent` inline, with no
//! external job scheduled.

mod support;

use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use support::InMemoryStore;
use taskflow_core::domain::ReminderStatus;
use taskflow_core::eventbus::SidecarBus;
use taskflow_core::reminders::ReminderEngine;

/// A sidecar stand-in that accepts exactly one HTTP connection and answers
/// every request with `200 OK`, so `SidecarBus::publish` observes success
/// without a real Dapr sidecar running.
async fn spawn_ok_sidecar() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn create_with_past_due_remind_at_fires_synchronously() {
    let base_url = spawn_ok_sidecar().await;
    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(SidecarBus::new(base_url, "pubsub"));
    let engine = ReminderEngine::new(store, bus);

    let owner = Uuid::new_v4();
    let remind_at = Utc::now().naive_utc() - chrono::Duration::seconds(1);

    let reminder = engine.create(owner, 1, "buy milk", remind_at).await.unwrap();

    assert_eq!(reminder.status, ReminderStatus::Sent);
    assert!(reminder.sent_at.is_some(), "a synchronously-fired reminder must record sent_at");
    assert!(reminder.dapr_job_name.is_none(), "the past-due path never schedules an external job");
}

#[tokio::test]
async fn create_with_unreachable_sidecar_marks_failed_not_pending() {
    // Port 0 never accepts a connection, so the publish attempt fails
    // immediately and the past-due path must record `failed`, not leave
    // the row `pending` forever.
    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(SidecarBus::new("http://127.0.0.1:0", "pubsub"));
    let engine = ReminderEngine::new(store, bus);

    let owner = Uuid::new_v4();
    let remind_at = Utc::now().naive_utc() - chrono::Duration::seconds(1);

    let reminder = engine.create(owner, 1, "buy milk", remind_at).await.unwrap();

    assert_eq!(reminder.status, ReminderStatus::Failed);
    assert!(reminder.sent_at.is_none());
    assert!(reminder.dapr_job_name.is_none());
}
