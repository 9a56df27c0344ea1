//! Test doubles shared by the engine's unit and integration tests: a
//! scripted provider, a recording effects implementation, and a couple of
//! trivial tools.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use gloop_core::{
    ChatRequest, ChunkReceiver, Conversation, EffectError, Effects, Provider, ProviderError,
    SpawnResult, StreamChunk, Tool, ToolArg, ToolArgs, ToolError, ToolRegistry, Usage, World,
};
use tokio::sync::mpsc;

/// A provider that replays scripted replies, one per request, each
/// delivered as an explicit chunk sequence.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Vec<String>>>,
}

impl ScriptedProvider {
    /// Script with explicit chunk boundaries per reply.
    pub fn chunked(replies: Vec<Vec<&str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|chunks| chunks.into_iter().map(String::from).collect())
                    .collect(),
            ),
        }
    }

    /// Script where each reply arrives as a single chunk.
    pub fn script(replies: Vec<&str>) -> Self {
        Self::chunked(replies.into_iter().map(|r| vec![r]).collect())
    }

    fn next_reply(&self) -> Result<Vec<String>, ProviderError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::NotConfigured("script exhausted".into()))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: ChatRequest) -> Result<String, ProviderError> {
        Ok(self.next_reply()?.concat())
    }

    async fn stream(&self, _request: ChatRequest) -> Result<ChunkReceiver, ProviderError> {
        let chunks = self.next_reply()?;
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(Ok(StreamChunk::text(chunk))).await.is_err() {
                    return;
                }
            }
            let _ = tx
                .send(Ok(StreamChunk::finished(Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }))))
                .await;
        });
        Ok(rx)
    }
}

/// Records every effect invocation as a readable event string.
#[derive(Default)]
pub struct RecordingEffects {
    events: Mutex<Vec<String>>,
    streamed: Mutex<String>,
    confirm_answer: Option<bool>,
    ask_answer: Option<String>,
    spawn_result: Option<SpawnResult>,
}

impl RecordingEffects {
    pub fn with_confirm_answer(mut self, answer: bool) -> Self {
        self.confirm_answer = Some(answer);
        self
    }

    pub fn with_ask_answer(mut self, answer: &str) -> Self {
        self.ask_answer = Some(answer.to_string());
        self
    }

    pub fn with_spawn_result(mut self, result: SpawnResult) -> Self {
        self.spawn_result = Some(result);
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Everything streamed to the user, concatenated.
    pub fn streamed_text(&self) -> String {
        self.streamed.lock().unwrap().clone()
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

#[async_trait]
impl Effects for RecordingEffects {
    async fn stream_chunk(&self, text: &str) {
        self.record(format!("chunk({text})"));
        self.streamed.lock().unwrap().push_str(text);
    }

    async fn stream_done(&self) {
        self.record("stream_done");
    }

    async fn tool_parsed(&self, name: &str, preview: &str) {
        self.record(format!("tool_parsed({name}, {preview})"));
    }

    async fn tool_start(&self, name: &str, _preview: &str) {
        self.record(format!("tool_start({name})"));
    }

    async fn tool_done(&self, name: &str, ok: bool, _output: &str) {
        self.record(format!("tool_done({name}, {ok})"));
    }

    async fn confirm(&self, command: &str) -> Result<bool, EffectError> {
        self.record(format!("confirm({command})"));
        Ok(self.confirm_answer.unwrap_or(true))
    }

    async fn ask(&self, question: &str) -> Result<String, EffectError> {
        self.record(format!("ask({question})"));
        Ok(self.ask_answer.clone().unwrap_or_default())
    }

    async fn remember(&self, content: &str) -> Result<(), EffectError> {
        self.record(format!("remember({content})"));
        Ok(())
    }

    async fn forget(&self, content: &str) -> Result<(), EffectError> {
        self.record(format!("forget({content})"));
        Ok(())
    }

    async fn refresh_system(&self) -> Result<(), EffectError> {
        self.record("refresh_system");
        Ok(())
    }

    async fn reboot(
        &self,
        reason: &str,
        _conversation: &Conversation,
    ) -> Result<(), EffectError> {
        self.record(format!("reboot({reason})"));
        Ok(())
    }

    async fn manage_context(&self, instructions: &str) -> Result<String, EffectError> {
        self.record(format!("manage_context({instructions})"));
        Ok("pruned".into())
    }

    async fn complete(&self, summary: &str) {
        self.record(format!("complete({summary})"));
    }

    async fn install_tool(&self, source: &str) -> Result<String, EffectError> {
        self.record(format!("install({source})"));
        Ok(format!("Installed tool from {source}"))
    }

    async fn list_tools(&self) -> Result<String, EffectError> {
        self.record("list_tools");
        Ok("Available tools: Echo, Boom, Bash".into())
    }

    async fn spawn(&self, task: &str) -> Result<SpawnResult, EffectError> {
        self.record(format!("spawn({task})"));
        Ok(self.spawn_result.clone().unwrap_or(SpawnResult {
            success: true,
            summary: "subtask finished".into(),
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }))
    }

    async fn usage(&self, _usage: Usage) {
        self.record("usage");
    }
}

// --- Trivial tools ---

/// Echoes its first argument back.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "Echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn arguments(&self) -> Vec<ToolArg> {
        vec![ToolArg::new("text", "The text to echo")]
    }
    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        Ok(args.get("text").cloned().unwrap_or_default())
    }
}

/// Always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "Boom"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn arguments(&self) -> Vec<ToolArg> {
        vec![]
    }
    async fn execute(&self, _args: &ToolArgs) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "Boom".into(),
            reason: "synthetic failure".into(),
        })
    }
}

/// Stands in for the real shell tool; records nothing, runs nothing.
pub struct FakeBash;

#[async_trait]
impl Tool for FakeBash {
    fn name(&self) -> &str {
        "Bash"
    }
    fn description(&self) -> &str {
        "Pretends to run a shell command"
    }
    fn arguments(&self) -> Vec<ToolArg> {
        vec![ToolArg::new("command", "The command to run")]
    }
    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        Ok(format!(
            "ran: {}",
            args.get("command").cloned().unwrap_or_default()
        ))
    }
}

/// Standard test registry: Echo, Boom, Bash.
pub fn test_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(FailingTool));
    registry.register(Arc::new(FakeBash));
    registry
}

/// A world over a scripted provider, each reply one chunk.
pub fn worlds(replies: Vec<&str>) -> (World, Arc<Conversation>) {
    worlds_chunked(replies.into_iter().map(|r| vec![r]).collect())
}

/// A world over a scripted provider with explicit chunk boundaries.
pub fn worlds_chunked(replies: Vec<Vec<&str>>) -> (World, Arc<Conversation>) {
    let provider = Arc::new(ScriptedProvider::chunked(replies));
    let conversation = Arc::new(Conversation::new(provider, "test-model"));
    let world = World::new(
        Arc::clone(&conversation),
        Arc::new(RwLock::new(test_registry())),
    );
    (world, conversation)
}
