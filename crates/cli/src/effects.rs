//! The concrete Effects implementation, generic over a presentation sink.
//!
//! World-facing behavior (memory, system refresh, reboot, context prune,
//! tool install, subagent spawn) is identical in both modes; only how
//! events reach the outside differs. The terminal sink prints and asks;
//! the headless sink writes JSONL and auto-answers.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use gloop_core::{
    Conversation, EffectError, Effects, SpawnResult, ToolRegistry, Usage,
};
use gloop_engine::{build_system_prompt, prune_context, render_tool_listing};
use gloop_memory::NoteStore;
use gloop_session::{RebootSession, REBOOT_EXIT_CODE};
use gloop_tools::{install_manifest, load_manifests};
use tracing::info;

use crate::spawn::run_subagent;

/// Presentation side of the effects: everything the user (or the event
/// file) sees. Default no-ops cover the notifications a sink may not
/// care about.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn chunk(&self, text: &str);
    async fn done(&self);
    async fn tool_parsed(&self, _name: &str, _preview: &str) {}
    async fn tool_start(&self, name: &str, preview: &str);
    async fn tool_done(&self, name: &str, ok: bool, output: &str);
    async fn confirm(&self, command: &str) -> Result<bool, EffectError>;
    async fn ask(&self, question: &str) -> Result<String, EffectError>;
    async fn complete(&self, summary: &str);
    async fn usage(&self, _usage: Usage) {}
    async fn remembered(&self, _content: &str) {}
    async fn forgot(&self, _content: &str) {}
    async fn refreshed(&self) {}
    async fn rebooting(&self, _reason: &str) {}
}

/// Effects over a shared runtime and a presentation sink.
pub struct AgentEffects<S> {
    conversation: Arc<Conversation>,
    registry: Arc<RwLock<ToolRegistry>>,
    memory: Arc<NoteStore>,
    tools_dir: PathBuf,
    session_path: PathBuf,
    sink: S,
}

impl<S: Sink> AgentEffects<S> {
    pub fn new(
        conversation: Arc<Conversation>,
        registry: Arc<RwLock<ToolRegistry>>,
        memory: Arc<NoteStore>,
        tools_dir: PathBuf,
        session_path: PathBuf,
        sink: S,
    ) -> Self {
        Self {
            conversation,
            registry,
            memory,
            tools_dir,
            session_path,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn rebuild_system_prompt(&self) {
        let snapshot = self.registry.read().unwrap().clone();
        let prompt = build_system_prompt(&snapshot, &self.memory.notes());
        self.conversation.set_system(prompt);
    }
}

#[async_trait]
impl<S: Sink> Effects for AgentEffects<S> {
    async fn stream_chunk(&self, text: &str) {
        self.sink.chunk(text).await;
    }

    async fn stream_done(&self) {
        self.sink.done().await;
    }

    async fn tool_parsed(&self, name: &str, preview: &str) {
        self.sink.tool_parsed(name, preview).await;
    }

    async fn usage(&self, usage: Usage) {
        self.sink.usage(usage).await;
    }

    async fn tool_start(&self, name: &str, preview: &str) {
        self.sink.tool_start(name, preview).await;
    }

    async fn tool_done(&self, name: &str, ok: bool, output: &str) {
        self.sink.tool_done(name, ok, output).await;
    }

    async fn confirm(&self, command: &str) -> Result<bool, EffectError> {
        self.sink.confirm(command).await
    }

    async fn ask(&self, question: &str) -> Result<String, EffectError> {
        self.sink.ask(question).await
    }

    async fn remember(&self, content: &str) -> Result<(), EffectError> {
        self.memory
            .remember(content)
            .map_err(|e| EffectError::Io(e.to_string()))?;
        self.sink.remembered(content).await;
        Ok(())
    }

    async fn forget(&self, content: &str) -> Result<(), EffectError> {
        self.memory
            .forget(content)
            .map_err(|e| EffectError::Io(e.to_string()))?;
        self.sink.forgot(content).await;
        Ok(())
    }

    async fn refresh_system(&self) -> Result<(), EffectError> {
        self.rebuild_system_prompt();
        self.sink.refreshed().await;
        Ok(())
    }

    async fn reboot(&self, reason: &str, conversation: &Conversation) -> Result<(), EffectError> {
        let session = RebootSession::new(conversation.history(), reason);
        session.save(&self.session_path)?;
        self.sink.rebooting(reason).await;
        info!(reason, "rebooting");
        std::process::exit(REBOOT_EXIT_CODE);
    }

    async fn manage_context(&self, instructions: &str) -> Result<String, EffectError> {
        prune_context(&self.conversation, instructions)
            .await
            .map_err(|e| EffectError::Io(e.to_string()))
    }

    async fn complete(&self, summary: &str) {
        self.sink.complete(summary).await;
    }

    async fn install_tool(&self, source: &str) -> Result<String, EffectError> {
        let status = install_manifest(source, &self.tools_dir)
            .map_err(|e| EffectError::Io(e.to_string()))?;
        // The registry changed; the next Think must see the new listing.
        self.registry
            .write()
            .unwrap()
            .replace_installed(load_manifests(&self.tools_dir));
        self.rebuild_system_prompt();
        Ok(status)
    }

    async fn list_tools(&self) -> Result<String, EffectError> {
        let snapshot = self.registry.read().unwrap().clone();
        Ok(render_tool_listing(&snapshot))
    }

    async fn spawn(&self, task: &str) -> Result<SpawnResult, EffectError> {
        run_subagent(task).await
    }
}
