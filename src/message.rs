//! Chat message types shared by the session controller, history store, and
//! persistence layer.
//!
//! Persisted field names stay camelCase so existing stored history from the
//! web client deserializes unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    User,
    Bot,
    System,
    Error,
}

/// A grounding source behind a citation (web page or retrieved passage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A grounding reference attached to a bot response.
///
/// At most one of the two variants is populated; citations with neither are
/// dropped during stream mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<CitationSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_passage: Option<CitationSource>,
}

impl Citation {
    /// Whether either variant is populated.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.web.is_some() || self.retrieved_passage.is_some()
    }
}

/// One message in a conversation.
///
/// Identity is the `id`; ordering is insertion order within a session. A
/// message is mutated in place only while it is the in-flight bot
/// placeholder; after finalization it is treated as immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: MessageSender,
    /// Stored as RFC 3339 text, reconstituted on load.
    pub timestamp: DateTime<Utc>,
    /// BCP-47 display-language tag for this message's text (used for TTS).
    pub lang: String,
    /// Name of an attached file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Transient client-side image preview reference; never persisted and
    /// revoked once the send completes.
    #[serde(skip)]
    pub file_preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl ChatMessage {
    /// Create a message with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(sender: MessageSender, text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            lang: lang.into(),
            file_name: None,
            file_preview_url: None,
            citations: None,
        }
    }

    /// The fixed Bot greeting opening a session.
    #[must_use]
    pub fn greeting(text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self::new(MessageSender::Bot, text, lang)
    }

    /// An Error-sender message in the given display language.
    #[must_use]
    pub fn error(text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self::new(MessageSender::Error, text, lang)
    }
}

/// A file the user attached to an outgoing message.
///
/// Images are forwarded to the backend as inline binary parts; other files
/// become a textual annotation on the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    /// Host-provided transient preview reference for images (e.g. an object
    /// URL). Copied onto the user message and revoked after the send.
    pub preview_url: Option<String>,
}

impl Attachment {
    #[must_use]
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
            preview_url: None,
        }
    }

    #[must_use]
    pub fn with_preview_url(mut self, url: impl Into<String>) -> Self {
        self.preview_url = Some(url.into());
        self
    }

    /// Whether the attachment is an image (eligible for inline embedding).
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}
