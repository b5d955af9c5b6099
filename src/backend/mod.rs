//! Language-backend capability.
//!
//! The session controller talks to the hosted model through the
//! [`ChatBackend`] trait: availability check, session initialization,
//! streaming send, and one-shot translation. The shipped implementation is
//! [`gemini::GeminiBackend`]; tests substitute scripted fakes.

pub mod gemini;
pub mod sse;

pub use gemini::{GeminiBackend, GeminiConfig};

use crate::error::Result;
use crate::message::{Attachment, Citation, CitationSource};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::Stream;
use serde::Deserialize;
use std::pin::Pin;

/// One part of a structured message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain prompt text.
    Text(String),
    /// Inline binary data (base64), e.g. an attached image.
    InlineData { mime_type: String, data: String },
}

impl ContentPart {
    /// Encode an attachment as an inline binary part.
    ///
    /// The binary-to-base64 encode happens here, at the backend boundary;
    /// the session controller only hands over raw bytes.
    #[must_use]
    pub fn inline_from(attachment: &Attachment) -> Self {
        Self::InlineData {
            mime_type: attachment.mime_type.clone(),
            data: BASE64.encode(&attachment.data),
        }
    }
}

/// Payload shape for one send, decided once by the controller: plain text
/// for text-only messages, ordered parts when binary data rides along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Plain(String),
    Parts(Vec<ContentPart>),
}

/// Grounding source as supplied by the backend, before mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawGroundingSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

/// Raw grounding chunk from the backend's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGroundingChunk {
    #[serde(default)]
    pub web: Option<RawGroundingSource>,
    #[serde(default)]
    pub retrieved_context: Option<RawGroundingSource>,
}

/// Map raw grounding chunks to the citation shape, dropping any chunk with
/// neither a web nor a retrieved-passage source.
#[must_use]
pub fn map_citations(raw: &[RawGroundingChunk]) -> Vec<Citation> {
    raw.iter()
        .map(|chunk| {
            let mut citation = Citation::default();
            if let Some(web) = &chunk.web
                && let Some(uri) = &web.uri
            {
                citation.web = Some(CitationSource {
                    uri: uri.clone(),
                    title: web.title.clone(),
                });
            } else if let Some(passage) = &chunk.retrieved_context
                && let Some(uri) = &passage.uri
            {
                citation.retrieved_passage = Some(CitationSource {
                    uri: uri.clone(),
                    title: passage.title.clone(),
                });
            }
            citation
        })
        .filter(Citation::is_populated)
        .collect()
}

/// One streamed response chunk.
///
/// `error` carries backend-reported failures in-band; transport failures
/// surface as stream-level `Err` items instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub text: Option<String>,
    pub citations: Option<Vec<RawGroundingChunk>>,
    pub error: Option<String>,
}

impl StreamChunk {
    /// A chunk carrying only an in-band error.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            error: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Streamed sequence of response chunks, consumed strictly in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// The hosted generative-language capability.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Whether the backend is configured (credentials present).
    fn is_available(&self) -> bool;

    /// Start a fresh conversation session. Returns `false` on failure; the
    /// caller decides how to surface that.
    async fn init_session(&self) -> bool;

    /// Send one message and stream back response chunks.
    async fn send_stream(&self, content: MessageContent) -> ChunkStream;

    /// Translate `text` into `target_code` (backend short code, e.g. `fr`),
    /// optionally naming the source language.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AssistantError::Translation`] when the call
    /// fails or produces no usable output.
    async fn translate(&self, text: &str, target_code: &str, source_code: Option<&str>)
    -> Result<String>;
}
