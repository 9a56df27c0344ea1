//! The context-prune fork — a nested evaluator run whose only job is to
//! edit the outer conversation's message history.
//!
//! The fork gets a sibling conversation (same provider/model/routing,
//! fresh history, its own system prompt), a registry of exactly three
//! tools (`ViewMessage`, `DeleteMessages`, `CompleteTask`), and a silent
//! effects implementation. Deletions accumulate in a shared set and are
//! applied to the outer history once the fork finishes. Index 0 — the
//! system message slot — is never deletable.
//!
//! Cancellation does not propagate into the fork; an outer abort raises
//! only after the fork returns.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use gloop_core::{
    ChatMessage, Conversation, EffectError, Effects, EngineError, Form, SpawnResult, Tool,
    ToolArg, ToolArgs, ToolError, ToolRegistry, World,
};
use tracing::{debug, info};

use crate::eval::eval;

const SUMMARY_HEAD: usize = 50;
const SUMMARY_TAIL: usize = 50;

const PRUNE_SYSTEM_PROMPT: &str = "\
You are a context editor. The conversation below has grown too large; your job \
is to delete messages that are no longer needed.

Call tools with this markup: <tools><tool>Name(args)</tool></tools>

Available tools:
- ViewMessage(index) — show the full content of one message
- DeleteMessages(indexes) — mark comma-separated message indices for deletion
- CompleteTask(summary) — finish, with a one-line summary of what you removed

Never delete the task goal or anything the agent is actively using. \
Message #0 is the system slot and cannot be deleted. \
When you are done, call CompleteTask.";

/// Run the context-prune fork against `conversation`, applying deletions
/// on completion. Returns a short summary for the tool result.
pub async fn prune_context(
    conversation: &Arc<Conversation>,
    instructions: &str,
) -> Result<String, EngineError> {
    let outer_history = conversation.history();
    let deletions: Arc<Mutex<BTreeSet<usize>>> = Arc::new(Mutex::new(BTreeSet::new()));
    let completed: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ViewMessage {
        history: outer_history.clone(),
    }));
    registry.register(Arc::new(DeleteMessages {
        history_len: outer_history.len(),
        deletions: Arc::clone(&deletions),
    }));

    let forked = Arc::new(conversation.fork(PRUNE_SYSTEM_PROMPT));
    // Fresh world: own cancellation token, pruning disabled inside.
    let world = World::new(forked, Arc::new(RwLock::new(registry))).with_prune_threshold(0);
    let effects = SilentEffects {
        completed: Arc::clone(&completed),
    };

    let input = format!(
        "Instructions: {instructions}\n\nMessage index:\n{}",
        index_summary(&outer_history)
    );
    debug!(messages = outer_history.len(), "starting context-prune fork");
    eval(Form::think(input), &world, &effects).await?;

    let deletions = deletions.lock().unwrap();
    let removed = deletions.len();
    if removed > 0 {
        let kept: Vec<ChatMessage> = outer_history
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !deletions.contains(i))
            .map(|(_, m)| m)
            .collect();
        conversation.set_history(kept);
    }
    info!(removed, "context prune finished");

    let summary = completed.lock().unwrap().take();
    Ok(match summary {
        Some(s) => format!("{s} ({removed} messages removed)"),
        None => format!("Removed {removed} messages from context"),
    })
}

/// One line per message: `#<i> [<role>] "<head>... ...<tail>"`.
pub fn index_summary(history: &[ChatMessage]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(i, m)| format!("#{i} [{}] \"{}\"", m.role, excerpt(&m.content)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn excerpt(content: &str) -> String {
    let flat = content.replace('\n', " ");
    let chars: Vec<char> = flat.chars().collect();
    if chars.len() <= SUMMARY_HEAD + SUMMARY_TAIL {
        return flat;
    }
    let head: String = chars[..SUMMARY_HEAD].iter().collect();
    let tail: String = chars[chars.len() - SUMMARY_TAIL..].iter().collect();
    format!("{head}... ...{tail}")
}

// --- Restricted tools ---

struct ViewMessage {
    history: Vec<ChatMessage>,
}

#[async_trait]
impl Tool for ViewMessage {
    fn name(&self) -> &str {
        "ViewMessage"
    }
    fn description(&self) -> &str {
        "Show the full content of one message by index"
    }
    fn arguments(&self) -> Vec<ToolArg> {
        vec![ToolArg::new("index", "Zero-based message index")]
    }
    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let raw = args.get("index").map(String::as_str).unwrap_or("");
        let Ok(index) = raw.trim().parse::<usize>() else {
            return Err(ToolError::InvalidArguments(format!(
                "not a message index: {raw:?}"
            )));
        };
        Ok(match self.history.get(index) {
            Some(m) => format!("#{index} [{}]\n{}", m.role, m.content),
            None => format!("No message at index {index}"),
        })
    }
}

struct DeleteMessages {
    history_len: usize,
    deletions: Arc<Mutex<BTreeSet<usize>>>,
}

#[async_trait]
impl Tool for DeleteMessages {
    fn name(&self) -> &str {
        "DeleteMessages"
    }
    fn description(&self) -> &str {
        "Mark comma-separated message indices for deletion"
    }
    fn arguments(&self) -> Vec<ToolArg> {
        vec![ToolArg::new("indexes", "Comma-separated message indices")]
    }
    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let raw = args.get("indexes").map(String::as_str).unwrap_or("");
        let valid: Vec<usize> = raw
            .split(',')
            .filter_map(|part| part.trim().parse::<usize>().ok())
            .filter(|&i| i > 0 && i < self.history_len)
            .collect();
        let mut set = self.deletions.lock().unwrap();
        for i in &valid {
            set.insert(*i);
        }
        Ok(format!("Marked {} messages for deletion", valid.len()))
    }
}

// --- Silent effects ---

/// No UI output, memory and refresh are no-ops, nested pruning is
/// refused, reboot and spawn are unavailable.
struct SilentEffects {
    completed: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl Effects for SilentEffects {
    async fn stream_chunk(&self, _text: &str) {}
    async fn stream_done(&self) {}
    async fn tool_parsed(&self, _name: &str, _preview: &str) {}
    async fn tool_start(&self, _name: &str, _preview: &str) {}
    async fn tool_done(&self, _name: &str, _ok: bool, _output: &str) {}

    async fn confirm(&self, _command: &str) -> Result<bool, EffectError> {
        Ok(true)
    }

    async fn ask(&self, _question: &str) -> Result<String, EffectError> {
        Ok(String::new())
    }

    async fn remember(&self, _content: &str) -> Result<(), EffectError> {
        Ok(())
    }

    async fn forget(&self, _content: &str) -> Result<(), EffectError> {
        Ok(())
    }

    async fn refresh_system(&self) -> Result<(), EffectError> {
        Ok(())
    }

    async fn reboot(
        &self,
        _reason: &str,
        _conversation: &Conversation,
    ) -> Result<(), EffectError> {
        Err(EffectError::Unsupported("reboot inside context prune".into()))
    }

    async fn manage_context(&self, _instructions: &str) -> Result<String, EffectError> {
        // Refused, but softly: an error here would kill the fork.
        Ok("Context pruning is not available here".into())
    }

    async fn complete(&self, summary: &str) {
        *self.completed.lock().unwrap() = Some(summary.to_string());
    }

    async fn install_tool(&self, _source: &str) -> Result<String, EffectError> {
        Err(EffectError::Unsupported("install inside context prune".into()))
    }

    async fn list_tools(&self) -> Result<String, EffectError> {
        Ok("ViewMessage, DeleteMessages, CompleteTask".into())
    }

    async fn spawn(&self, _task: &str) -> Result<SpawnResult, EffectError> {
        Err(EffectError::Unsupported("spawn inside context prune".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn conversation_with(replies: Vec<&str>, history: Vec<ChatMessage>) -> Arc<Conversation> {
        let provider = Arc::new(ScriptedProvider::script(replies));
        let conv = Arc::new(Conversation::new(provider, "test-model"));
        conv.set_history(history);
        conv
    }

    fn sample_history() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("identity"),
            ChatMessage::user("goal: build the thing"),
            ChatMessage::assistant("old tool output A"),
            ChatMessage::assistant("old tool output B"),
            ChatMessage::assistant("recent result"),
        ]
    }

    #[tokio::test]
    async fn fork_deletes_marked_messages() {
        let conv = conversation_with(
            vec![
                r#"<tools><tool>DeleteMessages("2, 3")</tool></tools>"#,
                r#"<tools><tool>CompleteTask("dropped stale outputs")</tool></tools>"#,
            ],
            sample_history(),
        );

        let summary = prune_context(&conv, "drop old tool output").await.unwrap();
        assert!(summary.contains("dropped stale outputs"));
        assert!(summary.contains("2 messages removed"));

        let history = conv.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "identity");
        assert_eq!(history[1].content, "goal: build the thing");
        assert_eq!(history[2].content, "recent result");
    }

    #[tokio::test]
    async fn index_zero_and_out_of_range_are_protected() {
        let conv = conversation_with(
            vec![
                r#"<tools><tool>DeleteMessages("0, 4, 99")</tool></tools>"#,
                r#"<tools><tool>CompleteTask("done")</tool></tools>"#,
            ],
            sample_history(),
        );

        prune_context(&conv, "aggressive prune").await.unwrap();
        let history = conv.history();
        // Only #4 was deletable; #0 is immune, #99 out of range.
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "identity");
    }

    #[tokio::test]
    async fn fork_without_deletions_leaves_history_alone() {
        let conv = conversation_with(
            vec![r#"<tools><tool>CompleteTask("nothing to prune")</tool></tools>"#],
            sample_history(),
        );
        let summary = prune_context(&conv, "check").await.unwrap();
        assert!(summary.contains("nothing to prune"));
        assert_eq!(conv.history().len(), 5);
    }

    #[tokio::test]
    async fn view_message_renders_or_reports_missing() {
        let tool = ViewMessage {
            history: sample_history(),
        };
        let mut args = ToolArgs::new();
        args.insert("index".into(), "1".into());
        let out = tool.execute(&args).await.unwrap();
        assert_eq!(out, "#1 [user]\ngoal: build the thing");

        args.insert("index".into(), "42".into());
        let out = tool.execute(&args).await.unwrap();
        assert_eq!(out, "No message at index 42");
    }

    #[test]
    fn index_summary_format() {
        let history = vec![
            ChatMessage::system("short"),
            ChatMessage::user(format!("{}{}", "a".repeat(80), "b".repeat(80))),
        ];
        let summary = index_summary(&history);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "#0 [system] \"short\"");
        assert!(lines[1].starts_with("#1 [user] \""));
        assert!(lines[1].contains("... ..."));
        // 50-char head, 50-char tail
        assert!(lines[1].contains(&"a".repeat(50)));
        assert!(lines[1].contains(&"b".repeat(50)));
    }

    #[test]
    fn excerpt_flattens_newlines() {
        let text = format!("line1\n{}\nlast", "x".repeat(200));
        let e = excerpt(&text);
        assert!(!e.contains('\n'));
        assert!(e.starts_with("line1 "));
        assert!(e.ends_with(" last"));
    }
}
