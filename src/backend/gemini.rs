//! Gemini chat backend.
//!
//! Streams chat responses via `models/{model}:streamGenerateContent?alt=sse`
//! and performs one-shot translation via `:generateContent`. Conversation
//! history is held adapter-side so the chat is multi-turn; the session
//! controller only sends the newest message.

use crate::backend::sse::SseLineParser;
use crate::backend::{ChunkStream, ContentPart, MessageContent, RawGroundingChunk, StreamChunk};
use crate::error::{AssistantError, Result};
use crate::language::language_name_for_backend_code;
use crate::persona;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Default API endpoint.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for both chat and translation.
const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// In-band error text when `send_stream` is called before `init_session`.
const NOT_INITIALIZED_ERROR: &str =
    "Chat session not initialized. Please try initializing or refreshing.";

/// Connection settings for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; `None` means the backend is unavailable.
    pub api_key: Option<String>,
    /// Base URL (override for tests / proxies).
    pub base_url: String,
    /// Model name.
    pub model: String,
}

impl GeminiConfig {
    /// Read the API key from the environment (`GEMINI_API_KEY`, falling back
    /// to `API_KEY`).
    #[must_use]
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Config with an explicit key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Gemini implementation of [`crate::backend::ChatBackend`].
pub struct GeminiBackend {
    config: GeminiConfig,
    client: reqwest::Client,
    /// Conversation turns (`{"role", "parts"}` objects). `None` until a
    /// session has been initialized.
    history: Arc<Mutex<Option<Vec<serde_json::Value>>>>,
}

impl GeminiBackend {
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            history: Arc::new(Mutex::new(None)),
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, self.config.model
        )
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

/// Convert a payload into Gemini `parts` JSON.
fn content_to_parts(content: &MessageContent) -> Vec<serde_json::Value> {
    match content {
        MessageContent::Plain(text) => vec![serde_json::json!({ "text": text })],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => serde_json::json!({ "text": text }),
                ContentPart::InlineData { mime_type, data } => serde_json::json!({
                    "inlineData": { "mimeType": mime_type, "data": data }
                }),
            })
            .collect(),
    }
}

// ── Response schema (the subset we consume) ───────────────────

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<RawGroundingChunk>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let content = candidate.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }

    fn grounding_chunks(&self) -> Option<Vec<RawGroundingChunk>> {
        let metadata = self.candidates.first()?.grounding_metadata.as_ref()?;
        if metadata.grounding_chunks.is_empty() {
            None
        } else {
            Some(metadata.grounding_chunks.clone())
        }
    }
}

/// Strip a surrounding markdown code fence from a translation reply.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let body = match body.split_once('\n') {
        Some((first_line, tail)) if !first_line.contains(' ') => tail,
        _ => body,
    };
    body.trim()
}

#[async_trait]
impl crate::backend::ChatBackend for GeminiBackend {
    fn is_available(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    async fn init_session(&self) -> bool {
        if !self.is_available() {
            *self.history.lock().await = None;
            return false;
        }
        *self.history.lock().await = Some(Vec::new());
        info!("Gemini chat session initialized (model={})", self.config.model);
        true
    }

    async fn send_stream(&self, content: MessageContent) -> ChunkStream {
        // Snapshot the history plus the new user turn; the model turn is
        // appended once the stream has fully arrived.
        let user_turn = serde_json::json!({
            "role": "user",
            "parts": content_to_parts(&content),
        });

        let contents = {
            let mut guard = self.history.lock().await;
            let Some(history) = guard.as_mut() else {
                return Box::pin(futures_util::stream::once(async {
                    Ok(StreamChunk::error(NOT_INITIALIZED_ERROR))
                }));
            };
            history.push(user_turn);
            history.clone()
        };

        let body = serde_json::json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": persona::system_instruction() }] },
        });

        let request = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", self.config.api_key.clone().unwrap_or_default())
            .json(&body);
        let history = Arc::clone(&self.history);

        Box::pin(async_stream::stream! {
            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!("Gemini stream request failed: {e}");
                    yield Ok(StreamChunk::error(format!("Gemini API Error: {e}")));
                    return;
                }
            };
            if let Err(e) = response.error_for_status_ref() {
                warn!("Gemini stream returned error status: {e}");
                yield Ok(StreamChunk::error(format!("Gemini API Error: {e}")));
                return;
            }

            let mut bytes = response.bytes_stream();
            let mut parser = SseLineParser::new();
            let mut model_text = String::new();

            let mut done = false;
            while !done {
                let payloads = match bytes.next().await {
                    Some(Ok(chunk)) => parser.push_bytes(&chunk),
                    Some(Err(e)) => {
                        yield Err(AssistantError::Stream(format!(
                            "response stream interrupted: {e}"
                        )));
                        return;
                    }
                    None => {
                        done = true;
                        parser.finish().into_iter().collect()
                    }
                };

                for payload in payloads {
                    let parsed: GenerateResponse = match serde_json::from_str(&payload) {
                        Ok(p) => p,
                        Err(e) => {
                            yield Err(AssistantError::Stream(format!(
                                "malformed stream event: {e}"
                            )));
                            return;
                        }
                    };
                    let text = parsed.text();
                    if let Some(t) = &text {
                        model_text.push_str(t);
                    }
                    yield Ok(StreamChunk {
                        text,
                        citations: parsed.grounding_chunks(),
                        error: None,
                    });
                }
            }

            // Record the model turn so the next send carries full context.
            if !model_text.is_empty()
                && let Some(h) = history.lock().await.as_mut()
            {
                h.push(serde_json::json!({
                    "role": "model",
                    "parts": [{ "text": model_text }],
                }));
            }
        })
    }

    async fn translate(
        &self,
        text: &str,
        target_code: &str,
        source_code: Option<&str>,
    ) -> Result<String> {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty())
        else {
            return Err(AssistantError::Translation(
                "API key not available for translation".to_owned(),
            ));
        };

        let target_name = language_name_for_backend_code(target_code);
        let prompt = match source_code {
            Some(source) => format!(
                "Translate the following text from {} to {target_name}. Output ONLY the \
                 translated text, without any additional explanations or conversation. Text \
                 to translate: \"{text}\"",
                language_name_for_backend_code(source)
            ),
            None => format!(
                "Translate the following text to {target_name}. Output ONLY the translated \
                 text, without any additional explanations or conversation. Text to \
                 translate: \"{text}\""
            ),
        };

        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Translation(format!("failed to translate text: {e}")))?
            .error_for_status()
            .map_err(|e| AssistantError::Translation(format!("failed to translate text: {e}")))?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Translation(format!("malformed translate reply: {e}")))?;

        let translated = parsed.text().ok_or_else(|| {
            AssistantError::Translation("translate reply carried no text".to_owned())
        })?;
        Ok(strip_code_fence(&translated).to_owned())
    }
}
