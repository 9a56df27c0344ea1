//! Effects — the abstract side-effect surface the evaluator invokes.
//!
//! This is the core's only outward dependency. The terminal UI, the
//! headless JSONL event stream, the silent prune-fork effects, and the
//! test recorders all implement this trait; the evaluator stays identical
//! across them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::error::EffectError;
use crate::provider::Usage;

/// What a detached subagent invocation returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnResult {
    pub success: bool,
    pub summary: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// The side-effect surface.
///
/// UI notifications (`stream_chunk`, `tool_start`, ...) are infallible and
/// best-effort. Operations that touch the world (`remember`, `reboot`,
/// `spawn`, ...) return errors, which the evaluator propagates.
#[async_trait]
pub trait Effects: Send + Sync {
    /// A chunk of user-visible assistant prose.
    async fn stream_chunk(&self, text: &str);

    /// The current assistant reply finished streaming.
    async fn stream_done(&self);

    /// A complete tool call was spotted mid-stream, ahead of execution.
    async fn tool_parsed(&self, name: &str, preview: &str);

    /// Token usage for the reply that just finished streaming.
    async fn usage(&self, _usage: Usage) {}

    /// A tool is about to execute.
    async fn tool_start(&self, name: &str, preview: &str);

    /// A tool finished executing.
    async fn tool_done(&self, name: &str, ok: bool, output: &str);

    /// Ask the user to approve a dangerous action.
    async fn confirm(&self, command: &str) -> Result<bool, EffectError>;

    /// Prompt the user for free-form input.
    async fn ask(&self, question: &str) -> Result<String, EffectError>;

    /// Append a note to the memory store.
    async fn remember(&self, content: &str) -> Result<(), EffectError>;

    /// Remove matching notes from the memory store.
    async fn forget(&self, content: &str) -> Result<(), EffectError>;

    /// Rebuild the system prompt from registry + memory and install it.
    async fn refresh_system(&self) -> Result<(), EffectError>;

    /// Persist the session and terminate with the restart signal.
    ///
    /// Does not return on success. An error means the save failed and the
    /// process keeps running.
    async fn reboot(&self, reason: &str, conversation: &Conversation) -> Result<(), EffectError>;

    /// Run the context-prune fork over the conversation history; returns a
    /// short summary of what was pruned.
    async fn manage_context(&self, instructions: &str) -> Result<String, EffectError>;

    /// The run finished successfully.
    async fn complete(&self, summary: &str);

    /// Install a tool from a manifest source; returns a status line.
    async fn install_tool(&self, source: &str) -> Result<String, EffectError>;

    /// Render the current tool listing.
    async fn list_tools(&self) -> Result<String, EffectError>;

    /// Launch a detached subagent and wait for it.
    async fn spawn(&self, task: &str) -> Result<SpawnResult, EffectError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_result_roundtrip() {
        let result = SpawnResult {
            success: true,
            summary: "did the thing".into(),
            exit_code: 0,
            stdout: "events written".into(),
            stderr: String::new(),
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: SpawnResult = serde_json::from_str(&json).unwrap();
        assert!(back.success);
        assert_eq!(back.summary, "did the thing");
    }

    #[test]
    fn spawn_result_default_is_failure_shaped() {
        let result = SpawnResult::default();
        assert!(!result.success);
        assert!(result.summary.is_empty());
    }
}
