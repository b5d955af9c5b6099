//! Archived chat sessions: append-only collection with view/delete support.

use crate::error::{AssistantError, Result};
use crate::message::ChatMessage;
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Storage key carried over from the original web client.
pub const CHAT_HISTORY_STORAGE_KEY: &str = "hrAppChatHistory";

/// Immutable snapshot of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub title: String,
    pub message_count: usize,
    pub messages: Vec<ChatMessage>,
}

impl HistoricalSession {
    /// Snapshot the given messages under a fresh session id.
    ///
    /// `start_time` is the first message's timestamp (or now when empty).
    #[must_use]
    pub fn from_messages(messages: Vec<ChatMessage>, title: impl Into<String>) -> Self {
        Self {
            id: format!("session-{}", Uuid::new_v4()),
            start_time: messages.first().map_or_else(Utc::now, |m| m.timestamp),
            title: title.into(),
            message_count: messages.len(),
            messages,
        }
    }
}

/// Persisted collection shape.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    pub sessions: Vec<HistoricalSession>,
}

#[derive(Serialize)]
struct ChatHistoryRef<'a> {
    sessions: &'a [HistoricalSession],
}

/// Ordered collection of archived sessions, insertion order = archive order.
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    sessions: Vec<HistoricalSession>,
    /// Session currently selected for viewing, if any.
    selected: Option<String>,
}

impl HistoryStore {
    /// Load archived history from the store.
    ///
    /// Corrupt stored content is removed and the collection starts empty.
    /// Never fails.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let sessions = match store.get(CHAT_HISTORY_STORAGE_KEY) {
            Some(raw) => match serde_json::from_str::<ChatHistory>(&raw) {
                Ok(history) => history.sessions,
                Err(e) => {
                    warn!("discarding corrupt stored chat history: {e}");
                    store.remove(CHAT_HISTORY_STORAGE_KEY);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Self {
            store,
            sessions,
            selected: None,
        }
    }

    /// Sessions in archive order (oldest first).
    #[must_use]
    pub fn sessions(&self) -> &[HistoricalSession] {
        &self.sessions
    }

    /// Sessions for list display, newest-archived-first. Presentation-only
    /// reversal; storage order is untouched.
    pub fn recent(&self) -> impl Iterator<Item = &HistoricalSession> {
        self.sessions.iter().rev()
    }

    /// Append a finished session and persist.
    ///
    /// # Errors
    ///
    /// Returns a storage error when persisting fails; the session is kept
    /// in memory regardless.
    pub fn archive(&mut self, session: HistoricalSession) -> Result<()> {
        self.sessions.push(session);
        self.persist()
    }

    /// Delete the session with `id` and persist. If the deleted session was
    /// selected for viewing, the selection is cleared.
    ///
    /// # Errors
    ///
    /// Returns a storage error when persisting fails.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.sessions.retain(|s| s.id != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.persist()
    }

    /// Delete every archived session, persist, and clear the selection.
    ///
    /// # Errors
    ///
    /// Returns a storage error when persisting fails.
    pub fn delete_all(&mut self) -> Result<()> {
        self.sessions.clear();
        self.selected = None;
        self.persist()
    }

    /// Select a session for viewing. Returns the session when it exists;
    /// an unknown id leaves the selection unchanged.
    pub fn view(&mut self, id: &str) -> Option<&HistoricalSession> {
        let session = self.sessions.iter().find(|s| s.id == id)?;
        self.selected = Some(id.to_owned());
        Some(session)
    }

    /// The session currently selected for viewing.
    #[must_use]
    pub fn selected(&self) -> Option<&HistoricalSession> {
        let id = self.selected.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Clear the viewing selection (back to the list).
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&ChatHistoryRef {
            sessions: &self.sessions,
        })
        .map_err(|e| AssistantError::Storage(e.to_string()))?;
        self.store.set(CHAT_HISTORY_STORAGE_KEY, &json)
    }
}
