
use std::sync::Arc;

use chrono::Duration;
use common::{preview, test_clock, tuscan_answers, FailingStorage};
use honeymoon_core::Clock;
use honeymoon_storage::{
    session_ttl, KeyValueStorage, MemoryStorage, SessionStore, SqliteStorage, Storage,
    SESSION_KEY,
};
use serde_json::Value;
use tempfile::TempDir;

#[tokio::test]
async fn saved_session_uses_browser_layout() {
    let clock = test_clock();
    let storage = MemoryStorage::new();
    let sessions = SessionStore::with_clock(storage.clone(), Arc::new(clock.clone()));

    sessions
        .save(&[preview("abc", "Tuscan Retreat")], Some(&tuscan_answers()))
        .await;

    let raw = storage.get_item(SESSION_KEY).await.unwrap().unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["recommendedTours"][0]["id"], "abc");
    assert_eq!(
        value["timestamp"].as_i64(),
        Some(clock.now().timestamp_millis())
    );
    assert_eq!(value["questionnaireAnswers"]["duration"], 7);
}

#[tokio::test]
async fn expired_session_is_removed_on_load() {
    let clock = test_clock();
    let storage = MemoryStorage::new();
    let sessions = SessionStore::with_clock(storage.clone(), Arc::new(clock.clone()));
    sessions.save(&[preview("abc", "Tuscan Retreat")], None).await;

    clock.advance(session_ttl() + Duration::minutes(1));

    assert!(sessions.load().await.is_none());
    assert!(sessions.load().await.is_none());
    assert_eq!(storage.get_item(SESSION_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn corrupted_session_is_removed_on_load() {
    let storage = MemoryStorage::new();
    storage
        .set_item(SESSION_KEY, "{\"recommendedTours\": not json")
        .await
        .unwrap();
    let sessions = SessionStore::with_clock(storage.clone(), Arc::new(test_clock()));

    assert!(sessions.load().await.is_none());
    assert_eq!(storage.get_item(SESSION_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn failing_backend_is_treated_as_no_session() {
    let sessions = SessionStore::with_clock(FailingStorage, Arc::new(test_clock()));

    sessions.save(&[preview("abc", "Tuscan Retreat")], None).await;
    assert!(sessions.load().await.is_none());
    assert!(!sessions.has_valid().await);
    sessions.clear().await;
}

#[tokio::test]
async fn sqlite_backend_round_trips_session() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("planner.db").display());
    let clock = test_clock();

    {
        let storage = Storage::sqlite(&url).await.unwrap();
        assert_eq!(storage.backend_name(), "sqlite");
        let sessions = SessionStore::with_clock(storage, Arc::new(clock.clone()));
        sessions.save(&[preview("abc", "Tuscan Retreat")], None).await;
    }

    clock.advance(Duration::hours(2));
    let storage = SqliteStorage::connect(&url).await.unwrap();
    let sessions = SessionStore::with_clock(storage, Arc::new(clock));

    let session = sessions.load().await.expect("session persisted");
    assert_eq!(session.recommended_tours[0].id, "abc");

    sessions.clear().await;
    assert!(sessions.load().await.is_none());
}
