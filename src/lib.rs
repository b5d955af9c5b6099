//! Caramel: the conversation engine behind the HERE AND NOW AI HR assistant.
//!
//! A headless session controller for a multilingual HR chat client. It owns
//! message state, streams responses from the Gemini backend, translates
//! between the display language and English, arbitrates speech input and
//! output, and archives finished sessions to persistent history.
//!
//! The host (a UI shell) supplies the external capabilities as trait
//! objects: a [`backend::ChatBackend`], optional [`speech::Synthesizer`] and
//! [`speech::Recognizer`] engines, and a [`storage::KeyValueStore`]. The
//! [`session::SessionController`] ties them together.

pub mod backend;
pub mod error;
pub mod history;
pub mod language;
pub mod message;
pub mod persona;
pub mod session;
pub mod settings;
pub mod speech;
pub mod storage;

pub use backend::gemini::{GeminiBackend, GeminiConfig};
pub use backend::{ChatBackend, ChunkStream, MessageContent, StreamChunk};
pub use error::{AssistantError, Result};
pub use history::{HistoricalSession, HistoryStore};
pub use message::{Attachment, ChatMessage, Citation, CitationSource, MessageSender};
pub use session::{Notice, NoticeKind, SessionController};
pub use settings::{Settings, SettingsStore};
pub use speech::{RecognitionEvent, Recognizer, SpeechCoordinator, Synthesizer, Voice};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
