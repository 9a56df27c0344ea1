//! Error types for the gloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all gloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Effect errors ---
    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors raised by an `Effects` implementation.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Session save failed: {0}")]
    SessionSave(String),

    #[error("Operation not supported here: {0}")]
    Unsupported(String),
}

/// Errors that escape a single evaluator run.
///
/// Tool failures never become an `EngineError` — they are folded into
/// `ToolResult`s and fed back to the model. What propagates is cancellation,
/// provider failures, and broken effect plumbing.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("run aborted")]
    Aborted,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}

impl EngineError {
    /// Whether this error is the cooperative-cancellation signal.
    pub fn is_aborted(&self) -> bool {
        matches!(self, EngineError::Aborted)
    }
}
