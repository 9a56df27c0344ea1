//! Headless task mode: run one task to completion, writing the JSONL
//! event stream instead of a terminal UI. This is what `Bash("gloop
//! --task …")` spawns.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gloop_core::{EffectError, Effects, Form, Usage, World};
use gloop_engine::eval;
use gloop_session::{EventLog, HeadlessEvent, SESSION_FILE};
use tracing::{error, info};

use crate::effects::{AgentEffects, Sink};
use crate::runtime::Runtime;

/// The fixed instruction appended to subagent prompts.
pub const TASK_SUFFIX: &str = "Do not stop working until you think the task is complete, \
then return the results. make sure to do that by calling task complete tool with the \
results as arguments .";

/// Append the task suffix unless the task already carries it.
pub fn with_task_suffix(task: &str) -> String {
    if task.contains(TASK_SUFFIX) {
        task.to_string()
    } else {
        format!("{task} {TASK_SUFFIX}")
    }
}

/// Event-writing sink. Accumulates streamed prose into per-reply
/// `assistant` events and usage into the final `complete` event.
pub struct HeadlessSink {
    log: EventLog,
    reply_buffer: Mutex<String>,
    total_usage: Mutex<Usage>,
    completed: Mutex<bool>,
}

impl HeadlessSink {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            reply_buffer: Mutex::new(String::new()),
            total_usage: Mutex::new(Usage::default()),
            completed: Mutex::new(false),
        }
    }

    pub fn completed(&self) -> bool {
        *self.completed.lock().unwrap()
    }

    fn emit(&self, event: HeadlessEvent) {
        if let Err(e) = self.log.append(event) {
            error!(error = %e, "failed to write headless event");
        }
    }
}

#[async_trait]
impl Sink for HeadlessSink {
    async fn chunk(&self, text: &str) {
        self.reply_buffer.lock().unwrap().push_str(text);
    }

    async fn done(&self) {
        let text = std::mem::take(&mut *self.reply_buffer.lock().unwrap());
        if !text.is_empty() {
            self.emit(HeadlessEvent::Assistant { text });
        }
    }

    async fn tool_start(&self, name: &str, preview: &str) {
        self.emit(HeadlessEvent::ToolStart {
            name: name.into(),
            preview: preview.into(),
        });
    }

    async fn tool_done(&self, name: &str, ok: bool, output: &str) {
        self.emit(HeadlessEvent::ToolDone {
            name: name.into(),
            ok,
            output: output.into(),
        });
    }

    async fn confirm(&self, _command: &str) -> Result<bool, EffectError> {
        // Nobody to ask; a headless run trusts its task.
        Ok(true)
    }

    async fn ask(&self, _question: &str) -> Result<String, EffectError> {
        Ok(String::new())
    }

    async fn complete(&self, summary: &str) {
        *self.completed.lock().unwrap() = true;
        let usage = *self.total_usage.lock().unwrap();
        self.emit(HeadlessEvent::Complete {
            summary: summary.into(),
            usage,
        });
    }

    async fn usage(&self, usage: Usage) {
        self.total_usage.lock().unwrap().add(usage);
        self.emit(HeadlessEvent::Usage { usage });
    }

    async fn remembered(&self, content: &str) {
        self.emit(HeadlessEvent::Remember {
            content: content.into(),
        });
    }

    async fn forgot(&self, content: &str) {
        self.emit(HeadlessEvent::Forget {
            content: content.into(),
        });
    }

    async fn refreshed(&self) {
        self.emit(HeadlessEvent::RefreshSystem);
    }

    async fn rebooting(&self, reason: &str) {
        self.emit(HeadlessEvent::Reboot {
            reason: reason.into(),
        });
    }
}

/// Run one task headless. Returns the process exit code.
pub async fn run(runtime: Runtime, task: String, events_path: Option<PathBuf>) -> i32 {
    let events_path = events_path
        .unwrap_or_else(|| std::env::temp_dir().join(format!("gloop-task-{}.jsonl", std::process::id())));
    let log = match EventLog::create(&events_path) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("cannot create event log at {}: {e}", events_path.display());
            return 1;
        }
    };

    let task = with_task_suffix(&task);
    if let Err(e) = log.append(HeadlessEvent::Start { task: task.clone() }) {
        eprintln!("cannot write event log: {e}");
        return 1;
    }

    let effects = AgentEffects::new(
        Arc::clone(&runtime.conversation),
        Arc::clone(&runtime.registry),
        Arc::clone(&runtime.memory),
        runtime.tools_dir.clone(),
        SESSION_FILE.into(),
        HeadlessSink::new(log),
    );
    if let Err(e) = effects.refresh_system().await {
        eprintln!("failed to build system prompt: {e}");
        return 1;
    }

    let world = World::new(
        Arc::clone(&runtime.conversation),
        Arc::clone(&runtime.registry),
    )
    .with_prune_threshold(runtime.config.prune_threshold);

    info!(events = %events_path.display(), "task mode starting");
    match eval(Form::think(task), &world, &effects).await {
        Ok(()) => {
            if effects.sink().completed() {
                0
            } else {
                // The model wound down without CompleteTask; the run
                // still ended cleanly.
                info!("task ended without a completion summary");
                0
            }
        }
        Err(e) => {
            effects.sink().emit(HeadlessEvent::Error {
                message: e.to_string(),
            });
            error!(error = %e, "task failed");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_appended_once() {
        let task = with_task_suffix("audit the repo");
        assert!(task.starts_with("audit the repo "));
        assert!(task.ends_with(TASK_SUFFIX));

        let again = with_task_suffix(&task);
        assert_eq!(again.matches(TASK_SUFFIX).count(), 1);
    }

    #[test]
    fn suffix_matches_spawn_contract() {
        // The exact literal other agents were trained on.
        assert!(TASK_SUFFIX.starts_with("Do not stop working"));
        assert!(TASK_SUFFIX.ends_with("as arguments ."));
    }
}
