//! Error types for the conversation engine.

/// Top-level error type for the HR assistant engine.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Backend not configured (missing API key). Terminal for the session
    /// until reconfigured.
    #[error("config error: {0}")]
    Config(String),

    /// Backend reachable but session creation failed. Retryable by
    /// re-invoking initialization.
    #[error("init error: {0}")]
    Init(String),

    /// Translation call failed. Recoverable per-call.
    #[error("translation error: {0}")]
    Translation(String),

    /// Streaming response failed outside the backend's own error channel.
    #[error("stream error: {0}")]
    Stream(String),

    /// Persistence read/write error. In-memory state continues unaffected.
    #[error("storage error: {0}")]
    Storage(String),

    /// Speech output or input capability failure.
    #[error("speech error: {0}")]
    Speech(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;
