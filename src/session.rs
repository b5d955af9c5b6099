//! Conversation session controller.
//!
//! Owns the active message list, drives the send → translate → stream →
//! back-translate pipeline, arbitrates speech requests, and archives
//! finished sessions into history. Every failure is converted at this
//! boundary into either a chat Error message or a transient [`Notice`];
//! nothing propagates to the UI layer as a panic or error value.

use crate::backend::{ChatBackend, ContentPart, MessageContent, map_citations};
use crate::history::{HistoricalSession, HistoryStore};
use crate::language::backend_lang_code;
use crate::message::{Attachment, ChatMessage, Citation, MessageSender};
use crate::persona;
use crate::settings::{Settings, SettingsStore};
use crate::speech::{RecognitionEvent, Recognizer, SpeechCoordinator, Synthesizer};
use crate::storage::KeyValueStore;
use chrono::Utc;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Category of a transient notice, for UI styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Storage,
    Speech,
}

/// A transient user-visible notice (toast). Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn storage(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Storage,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn speech(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Speech,
            text: text.into(),
        }
    }
}

/// Interim text shown in the bot placeholder while a response streams in.
const PLACEHOLDER_TEXT: &str = "...";

/// Substring heuristic marking a streamed response as an error.
///
/// Matches the error texts this engine and the web client emit. It is a
/// known weak point: a legitimate answer containing "error occurred" would
/// be misclassified.
fn looks_like_error(text: &str) -> bool {
    text.starts_with("Error:")
        || text.contains("error occurred")
        || text.contains("Gemini API Error")
}

/// Build the backend payload for one send: plain text unless an image rides
/// along, in which case an ordered parts list with the inline binary.
/// Non-image files become a textual annotation on the prompt.
fn build_payload(text_en: String, attachment: Option<&Attachment>) -> MessageContent {
    let mut parts: Vec<ContentPart> = Vec::new();
    if !text_en.is_empty() {
        parts.push(ContentPart::Text(text_en));
    }

    match attachment {
        Some(att) if att.is_image() => {
            parts.push(ContentPart::inline_from(att));
            if parts.len() == 1 {
                parts.insert(
                    0,
                    ContentPart::Text(format!(
                        "User attached an image: {}. Consider this image.",
                        att.file_name
                    )),
                );
            }
            MessageContent::Parts(parts)
        }
        Some(att) => {
            let annotation = format!(
                "\n\n[User attached a file: {}. Consider its relevance to the English query \
                 above.]",
                att.file_name
            );
            match parts.first_mut() {
                Some(ContentPart::Text(text)) => text.push_str(&annotation),
                _ => parts.insert(0, ContentPart::Text(annotation)),
            }
            collapse_to_plain(parts)
        }
        None => collapse_to_plain(parts),
    }
}

/// A lone text part travels as a plain string payload.
fn collapse_to_plain(mut parts: Vec<ContentPart>) -> MessageContent {
    if parts.len() == 1 {
        match parts.pop() {
            Some(ContentPart::Text(text)) => return MessageContent::Plain(text),
            Some(part) => parts.push(part),
            None => {}
        }
    }
    MessageContent::Parts(parts)
}

/// The conversation session controller.
pub struct SessionController {
    backend: Arc<dyn ChatBackend>,
    settings: SettingsStore,
    history: HistoryStore,
    speech: SpeechCoordinator,
    messages: Vec<ChatMessage>,
    loading: bool,
    initialized: bool,
    api_unavailable: bool,
    /// Whether the chat view is the active page (archiving on language
    /// change only applies there).
    in_chat: bool,
    /// Fresh token per session; a new token tells the host to re-run
    /// [`Self::initialize_session`].
    session_token: Uuid,
    notices: mpsc::UnboundedSender<Notice>,
}

impl SessionController {
    /// Build a controller over the given capabilities, loading settings and
    /// history from the store. Returns the controller plus the receiver for
    /// transient notices.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        synthesizer: Option<Arc<dyn Synthesizer>>,
        recognizer: Option<Arc<dyn Recognizer>>,
        store: Arc<dyn KeyValueStore>,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let speech = SpeechCoordinator::new(synthesizer, recognizer, notices.clone());
        let settings = SettingsStore::load(Arc::clone(&store));
        let history = HistoryStore::load(store);

        let controller = Self {
            backend,
            settings,
            history,
            speech,
            messages: Vec::new(),
            loading: false,
            initialized: false,
            api_unavailable: false,
            in_chat: false,
            session_token: Uuid::new_v4(),
            notices,
        };
        (controller, notice_rx)
    }

    // ── Read-only surface ─────────────────────────────────────

    /// Messages of the active session, in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn api_unavailable(&self) -> bool {
        self.api_unavailable
    }

    /// Token identifying the current session instance.
    #[must_use]
    pub fn session_token(&self) -> Uuid {
        self.session_token
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.settings.settings()
    }

    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Id of the message currently being spoken, if any.
    #[must_use]
    pub fn speaking_message_id(&self) -> Option<String> {
        self.speech.speaking_message_id()
    }

    // ── Session lifecycle ─────────────────────────────────────

    /// Start (or restart) a session in `language_code`.
    ///
    /// Prior in-memory messages are discarded. The greeting is translated
    /// into the display language when non-English; a translation failure
    /// falls back silently to the English text so startup is never blocked.
    pub async fn initialize_session(&mut self, language_code: &str) {
        info!("initializing chat session (lang={language_code})");
        self.speech.stop_speaking();
        self.loading = true;
        self.api_unavailable = false;
        self.in_chat = true;
        self.messages.clear();

        let backend_code = backend_lang_code(language_code);
        let mut greeting = persona::greeting_text();
        if backend_code != "en" {
            match self
                .backend
                .translate(&greeting, backend_code, Some("en"))
                .await
            {
                Ok(translated) => greeting = translated,
                // Keep the English greeting; startup never blocks on this.
                Err(e) => warn!("greeting translation failed, using English: {e}"),
            }
        }
        self.messages
            .push(ChatMessage::greeting(greeting, language_code));

        if !self.backend.is_available() {
            warn!("backend unavailable: no API key configured");
            self.api_unavailable = true;
            self.initialized = false;
            self.messages
                .push(ChatMessage::error(persona::NOT_CONFIGURED_MESSAGE, language_code));
            self.loading = false;
            return;
        }

        if self.backend.init_session().await {
            self.initialized = true;
        } else {
            warn!("backend session initialization failed");
            self.initialized = false;
            self.messages.push(ChatMessage::error(
                persona::failed_to_initialize_message(),
                language_code,
            ));
        }
        self.loading = false;
    }

    /// Send a user message (optionally with an attached file) and stream
    /// the bot's reply into the message list.
    pub async fn send_message(&mut self, text: &str, attachment: Option<Attachment>) {
        if text.is_empty() && attachment.is_none() {
            return;
        }
        self.speech.stop_speaking();

        let lang = self.settings.language().to_owned();
        if !self.initialized && !self.api_unavailable {
            self.messages.push(ChatMessage::error(
                persona::failed_to_initialize_message(),
                &lang,
            ));
            self.loading = false;
            return;
        }
        if self.api_unavailable {
            self.messages
                .push(ChatMessage::error(persona::NOT_CONFIGURED_MESSAGE, &lang));
            self.loading = false;
            return;
        }

        let mut user_message = ChatMessage::new(MessageSender::User, text, &lang);
        if let Some(att) = &attachment {
            user_message.file_name = Some(att.file_name.clone());
            if att.is_image() {
                user_message.file_preview_url = att.preview_url.clone();
            }
        }
        let user_id = user_message.id.clone();
        self.messages.push(user_message);
        self.loading = true;

        let placeholder = ChatMessage::new(MessageSender::Bot, PLACEHOLDER_TEXT, &lang);
        let placeholder_id = placeholder.id.clone();
        self.messages.push(placeholder);

        // Backend exchange always happens in English.
        let backend_code = backend_lang_code(&lang);
        let mut text_for_backend = text.to_owned();
        if backend_code != "en" && !text.trim().is_empty() {
            match self.backend.translate(text, "en", Some(backend_code)).await {
                Ok(translated) => text_for_backend = translated,
                Err(e) => {
                    warn!("user input translation failed: {e}");
                    self.finalize_placeholder(
                        &placeholder_id,
                        persona::TRANSLATION_ERROR_MESSAGE.to_owned(),
                        MessageSender::Error,
                        None,
                        &lang,
                    );
                    self.loading = false;
                    return;
                }
            }
        }

        let payload = build_payload(text_for_backend, attachment.as_ref());

        let mut stream = self.backend.send_stream(payload).await;
        let mut accumulated = String::new();
        let mut citations: Option<Vec<Citation>> = None;
        let mut failed = false;

        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if let Some(err_text) = chunk.error {
                        // In-band backend error: its text becomes the whole
                        // response and no further chunks are consumed.
                        accumulated = err_text;
                        failed = true;
                        break;
                    }
                    if let Some(delta) = chunk.text {
                        accumulated.push_str(&delta);
                    }
                    if citations.is_none()
                        && let Some(raw) = &chunk.citations
                    {
                        let mapped = map_citations(raw);
                        if !mapped.is_empty() {
                            citations = Some(mapped);
                        }
                    }
                    self.update_placeholder_text(&placeholder_id, format!("{accumulated}..."));
                }
                Err(e) => {
                    error!("response streaming failed: {e}");
                    accumulated = persona::STREAM_FAILURE_MESSAGE.to_owned();
                    failed = true;
                    break;
                }
            }
        }

        let mut final_sender = MessageSender::Bot;
        if failed || looks_like_error(&accumulated) {
            final_sender = MessageSender::Error;
        }

        let mut final_text = accumulated.clone();
        if backend_code != "en" && !accumulated.is_empty() && final_sender == MessageSender::Bot {
            match self
                .backend
                .translate(&accumulated, backend_code, Some("en"))
                .await
            {
                Ok(translated) => final_text = translated,
                Err(e) => {
                    warn!("response translation failed: {e}");
                    final_text = persona::TRANSLATION_ERROR_MESSAGE.to_owned();
                    final_sender = MessageSender::Error;
                }
            }
        }
        if final_text.is_empty() {
            final_text = "No response.".to_owned();
        }

        self.finalize_placeholder(&placeholder_id, final_text, final_sender, citations, &lang);
        self.loading = false;
        self.revoke_preview(&user_id);
    }

    /// Archive the current session when meaningful, then start fresh under
    /// a new session token.
    pub fn end_session_and_start_new(&mut self) {
        self.archive_if_meaningful();
        self.messages.clear();
        self.speech.stop_speaking();
        self.session_token = Uuid::new_v4();
        let _ = self
            .notices
            .send(Notice::info("Current chat session ended. New session started."));
    }

    /// Leaving the chat view: best-effort archive, then clear.
    pub fn leave_chat(&mut self) {
        self.archive_if_meaningful();
        self.messages.clear();
        self.speech.stop_speaking();
        self.in_chat = false;
    }

    /// Persist new settings. A changed display language while in the chat
    /// view archives the current session and starts a new one.
    pub async fn save_settings(&mut self, settings: Settings) {
        let prev_lang = self.settings.language().to_owned();
        if let Err(e) = self.settings.save(settings) {
            warn!("failed to persist settings: {e}");
            let _ = self
                .notices
                .send(Notice::storage("Error: Could not save settings."));
        }

        let new_lang = self.settings.language().to_owned();
        if new_lang != prev_lang && self.in_chat {
            self.archive_if_meaningful();
            self.messages.clear();
            self.speech.stop_speaking();
            self.session_token = Uuid::new_v4();
            self.initialize_session(&new_lang).await;
        }
    }

    /// React to a language switch from the chat UI.
    pub async fn on_language_changed(&mut self, new_code: &str) {
        if self.settings.language() == new_code {
            return;
        }
        let mut settings = self.settings.settings().clone();
        settings.selected_language_code = new_code.to_owned();
        self.save_settings(settings).await;
    }

    // ── Speech surface ────────────────────────────────────────

    /// Request speech output for a message in the active session or the
    /// selected history session. Toggle semantics per the coordinator.
    pub fn request_speak(&mut self, message_id: &str) {
        let message = self
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .or_else(|| {
                self.history
                    .selected()
                    .and_then(|s| s.messages.iter().find(|m| m.id == message_id))
            })
            .cloned();
        if let Some(message) = message {
            let lang = self.settings.language().to_owned();
            self.speech.request_speak(&message, &lang);
        }
    }

    /// Stop speech output unconditionally.
    pub fn stop_speaking(&mut self) {
        self.speech.stop_speaking();
    }

    /// Begin one voice-input recognition in the display language.
    pub fn start_listening(&mut self) -> Option<mpsc::UnboundedReceiver<RecognitionEvent>> {
        let lang = self.settings.language().to_owned();
        self.speech.start_listening(&lang)
    }

    /// Abort voice input.
    pub fn stop_listening(&mut self) {
        self.speech.stop_listening();
    }

    // ── History surface ───────────────────────────────────────

    /// Select an archived session for viewing.
    pub fn view_history_session(&mut self, id: &str) -> Option<&HistoricalSession> {
        self.speech.stop_speaking();
        self.history.view(id)
    }

    /// Delete one archived session.
    pub fn delete_history_session(&mut self, id: &str) {
        if let Err(e) = self.history.delete(id) {
            warn!("failed to persist chat history: {e}");
            let _ = self.notices.send(Notice::storage(
                "Error: Could not save chat history. Storage might be full.",
            ));
        } else {
            let _ = self.notices.send(Notice::info("Chat session deleted."));
        }
    }

    /// Delete all archived sessions.
    pub fn delete_all_history(&mut self) {
        if let Err(e) = self.history.delete_all() {
            warn!("failed to persist chat history: {e}");
            let _ = self.notices.send(Notice::storage(
                "Error: Could not save chat history. Storage might be full.",
            ));
        } else {
            let _ = self.notices.send(Notice::info("All chat history deleted."));
        }
    }

    /// Return from viewing an archived session to the list.
    pub fn back_to_history_list(&mut self) {
        self.history.clear_selection();
        self.speech.stop_speaking();
    }

    // ── Internals ─────────────────────────────────────────────

    /// Snapshot the current session into history when it is meaningful:
    /// more than one message, or a single message sent by the user.
    fn archive_if_meaningful(&mut self) -> bool {
        let meaningful = self.messages.len() > 1
            || self
                .messages
                .first()
                .is_some_and(|m| m.sender == MessageSender::User);
        if !meaningful {
            return false;
        }

        let title = self
            .messages
            .iter()
            .find(|m| m.sender == MessageSender::User)
            .map_or_else(
                || format!("Chat Session - {}", Utc::now().format("%H:%M:%S")),
                |m| {
                    let head: String = m.text.chars().take(50).collect();
                    format!("{head}...")
                },
            );

        let session = HistoricalSession::from_messages(self.messages.clone(), title);
        info!("archiving session {} ({} messages)", session.id, session.message_count);
        if let Err(e) = self.history.archive(session) {
            warn!("failed to persist chat history: {e}");
            let _ = self.notices.send(Notice::storage(
                "Error: Could not save chat history. Storage might be full.",
            ));
        }
        true
    }

    fn update_placeholder_text(&mut self, id: &str, text: String) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.text = text;
        }
    }

    fn finalize_placeholder(
        &mut self,
        id: &str,
        text: String,
        sender: MessageSender,
        citations: Option<Vec<Citation>>,
        lang: &str,
    ) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.text = text;
            message.sender = sender;
            message.citations = citations;
            message.timestamp = Utc::now();
            message.lang = lang.to_owned();
        }
    }

    fn revoke_preview(&mut self, id: &str) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.file_preview_url = None;
        }
    }
}
