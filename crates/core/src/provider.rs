//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get a reply
//! back, either complete or as a stream of delta chunks. The agent never
//! asks the provider for structured tool calls: tool invocations arrive as
//! markup embedded in the reply text and are extracted by the parser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::ChatMessage;

/// A request for one model reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g. "moonshotai/kimi-k2")
    pub model: String,

    /// The full message context, system message first
    pub messages: Vec<ChatMessage>,

    /// Temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Optional provider-routing hint (OpenRouter-style upstream pin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Accumulate another usage report into this one.
    pub fn add(&mut self, other: Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only near the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A plain text delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            done: false,
            usage: None,
        }
    }

    /// The terminal chunk.
    pub fn finished(usage: Option<Usage>) -> Self {
        Self {
            content: None,
            done: true,
            usage,
        }
    }
}

/// Receiver half of a provider stream.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// Every LLM backend implements this. The conversation calls `complete()`
/// or `stream()` without knowing which backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g. "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get the complete reply text.
    async fn complete(&self, request: ChatRequest)
        -> std::result::Result<String, ProviderError>;

    /// Send a request and get a stream of delta chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single chunk followed by a done chunk.
    async fn stream(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let text = self.complete(request).await?;
        let (tx, rx) = mpsc::channel(2);
        let _ = tx.send(Ok(StreamChunk::text(text))).await;
        let _ = tx.send(Ok(StreamChunk::finished(None))).await;
        Ok(rx)
    }
}
