//! History Persistence Round-Trip Tests
//!
//! Archived sessions written through one store instance must reload
//! byte-compatibly through another, including the camelCase field names the
//! original web client persisted under the same storage key.

use caramel::history::{CHAT_HISTORY_STORAGE_KEY, HistoricalSession, HistoryStore};
use caramel::message::{ChatMessage, MessageSender};
use caramel::storage::{FileStore, KeyValueStore, MemoryStore};
use std::sync::Arc;

fn sample_session(user_text: &str, reply_text: &str) -> HistoricalSession {
    let messages = vec![
        ChatMessage::new(MessageSender::Bot, "Hello! How can I assist?", "en-US"),
        ChatMessage::new(MessageSender::User, user_text, "en-US"),
        ChatMessage::new(MessageSender::Bot, reply_text, "en-US"),
    ];
    HistoricalSession::from_messages(messages, format!("{user_text}..."))
}

#[test]
fn sessions_survive_reload_through_file_store() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut history = HistoryStore::load(store);
        history
            .archive(sample_session("leave balance?", "12 days."))
            .unwrap();
        history
            .archive(sample_session("remote policy?", "See the handbook."))
            .unwrap();
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let history = HistoryStore::load(store);
    assert_eq!(history.sessions().len(), 2);
    assert_eq!(history.sessions()[0].title, "leave balance?...");
    assert_eq!(history.sessions()[0].message_count, 3);
    assert_eq!(history.sessions()[1].messages[2].text, "See the handbook.");
}

#[test]
fn reloaded_timestamps_and_senders_match() {
    let store = Arc::new(MemoryStore::new());
    let session = sample_session("benefits?", "Covered from day one.");
    let original = session.clone();

    let mut history = HistoryStore::load(Arc::clone(&store) as Arc<dyn KeyValueStore>);
    history.archive(session).unwrap();

    let reloaded = HistoryStore::load(store);
    let got = &reloaded.sessions()[0];
    assert_eq!(got.id, original.id);
    assert_eq!(got.start_time, original.start_time);
    for (a, b) in got.messages.iter().zip(&original.messages) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.sender, b.sender);
        assert_eq!(a.text, b.text);
    }
}

#[test]
fn persisted_json_uses_web_client_field_names() {
    let store = Arc::new(MemoryStore::new());
    let mut history = HistoryStore::load(Arc::clone(&store) as Arc<dyn KeyValueStore>);
    history
        .archive(sample_session("leave?", "12 days."))
        .unwrap();

    let raw = store.get(CHAT_HISTORY_STORAGE_KEY).unwrap();
    assert!(raw.contains("\"startTime\""));
    assert!(raw.contains("\"messageCount\""));
    assert!(raw.contains("\"sender\":\"bot\""));
    assert!(!raw.contains("start_time"));
}

#[test]
fn web_client_shaped_history_deserializes() {
    // A session archived by the original browser client.
    let raw = r#"{"sessions":[{
        "id":"session-1718000000000",
        "startTime":"2024-06-10T08:00:00.000Z",
        "title":"What is my current leave balance?...",
        "messageCount":2,
        "messages":[
            {"id":"m1","text":"Hello!","sender":"bot","timestamp":"2024-06-10T08:00:00.000Z","lang":"en-US"},
            {"id":"m2","text":"What is my current leave balance?","sender":"user","timestamp":"2024-06-10T08:00:05.000Z","lang":"en-US"}
        ]}]}"#;

    let store = Arc::new(MemoryStore::new());
    store.set(CHAT_HISTORY_STORAGE_KEY, raw).unwrap();

    let history = HistoryStore::load(store);
    assert_eq!(history.sessions().len(), 1);
    let session = &history.sessions()[0];
    assert_eq!(session.id, "session-1718000000000");
    assert_eq!(session.message_count, 2);
    assert_eq!(session.messages[1].sender, MessageSender::User);
}
