//! The Form algebra — a tagged description of the next unit of work.
//!
//! Forms are pure data: constructors here, behavior in the evaluator.
//! Every non-terminal variant carries exactly one successor, possibly
//! computed from a result by a boxed continuation. `Seq` is associative
//! with `Nil` as identity. Adding a variant forces an evaluator update
//! through exhaustive matching.

use crate::effects::SpawnResult;
use crate::tool::{ToolCall, ToolResult};

/// Continuation applied to a batch of tool results.
pub type InvokeCont = Box<dyn FnOnce(Vec<ToolResult>) -> Form + Send>;

/// Continuation applied to the user's yes/no answer.
pub type ConfirmCont = Box<dyn FnOnce(bool) -> Form + Send>;

/// Continuation applied to the user's free-form answer.
pub type AskCont = Box<dyn FnOnce(String) -> Form + Send>;

/// Continuation applied to a finished subagent's result.
pub type SpawnCont = Box<dyn FnOnce(SpawnResult) -> Form + Send>;

/// The next unit of work for the evaluator.
pub enum Form {
    /// Send `input` as a user turn and stream the reply.
    Think { input: String },

    /// Execute tools in order, then continue with the results.
    Invoke {
        calls: Vec<ToolCall>,
        then: InvokeCont,
    },

    /// Ask the user to approve a dangerous action.
    Confirm {
        command: String,
        then: ConfirmCont,
    },

    /// Prompt the user for free-form input.
    Ask { question: String, then: AskCont },

    /// Append a note to the memory store, then continue.
    Remember { content: String, then: Box<Form> },

    /// Remove matching notes from the memory store, then continue.
    Forget { content: String, then: Box<Form> },

    /// Push a chunk of assistant prose to the UI, then continue.
    Emit { text: String, then: Box<Form> },

    /// Rebuild the system prompt from registry + memory and install it.
    Refresh,

    /// Persist the session and terminate with the restart signal.
    Reboot { reason: String },

    /// Terminal success.
    Done { summary: String },

    /// Evaluate forms in order.
    Seq(Vec<Form>),

    /// No-op terminal.
    Nil,

    /// Install a tool from a manifest source (dev surface).
    Install { source: String },

    /// Emit the tool listing (dev surface).
    ListTools,

    /// Launch a detached subagent, then continue with its result.
    Spawn { task: String, then: SpawnCont },
}

impl Form {
    pub fn think(input: impl Into<String>) -> Form {
        Form::Think {
            input: input.into(),
        }
    }

    pub fn invoke<F>(calls: Vec<ToolCall>, then: F) -> Form
    where
        F: FnOnce(Vec<ToolResult>) -> Form + Send + 'static,
    {
        Form::Invoke {
            calls,
            then: Box::new(then),
        }
    }

    pub fn confirm<F>(command: impl Into<String>, then: F) -> Form
    where
        F: FnOnce(bool) -> Form + Send + 'static,
    {
        Form::Confirm {
            command: command.into(),
            then: Box::new(then),
        }
    }

    pub fn ask<F>(question: impl Into<String>, then: F) -> Form
    where
        F: FnOnce(String) -> Form + Send + 'static,
    {
        Form::Ask {
            question: question.into(),
            then: Box::new(then),
        }
    }

    pub fn remember(content: impl Into<String>, then: Form) -> Form {
        Form::Remember {
            content: content.into(),
            then: Box::new(then),
        }
    }

    pub fn forget(content: impl Into<String>, then: Form) -> Form {
        Form::Forget {
            content: content.into(),
            then: Box::new(then),
        }
    }

    pub fn emit(text: impl Into<String>, then: Form) -> Form {
        Form::Emit {
            text: text.into(),
            then: Box::new(then),
        }
    }

    pub fn reboot(reason: impl Into<String>) -> Form {
        Form::Reboot {
            reason: reason.into(),
        }
    }

    pub fn done(summary: impl Into<String>) -> Form {
        Form::Done {
            summary: summary.into(),
        }
    }

    pub fn seq(forms: Vec<Form>) -> Form {
        Form::Seq(forms)
    }

    pub fn install(source: impl Into<String>) -> Form {
        Form::Install {
            source: source.into(),
        }
    }

    pub fn spawn<F>(task: impl Into<String>, then: F) -> Form
    where
        F: FnOnce(SpawnResult) -> Form + Send + 'static,
    {
        Form::Spawn {
            task: task.into(),
            then: Box::new(then),
        }
    }

    /// The variant tag, for logging and assertions.
    pub fn tag(&self) -> &'static str {
        match self {
            Form::Think { .. } => "think",
            Form::Invoke { .. } => "invoke",
            Form::Confirm { .. } => "confirm",
            Form::Ask { .. } => "ask",
            Form::Remember { .. } => "remember",
            Form::Forget { .. } => "forget",
            Form::Emit { .. } => "emit",
            Form::Refresh => "refresh",
            Form::Reboot { .. } => "reboot",
            Form::Done { .. } => "done",
            Form::Seq(_) => "seq",
            Form::Nil => "nil",
            Form::Install { .. } => "install",
            Form::ListTools => "list_tools",
            Form::Spawn { .. } => "spawn",
        }
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Form::Think { input } => f.debug_struct("Think").field("input", input).finish(),
            Form::Invoke { calls, .. } => f
                .debug_struct("Invoke")
                .field("calls", calls)
                .field("then", &"<continuation>")
                .finish(),
            Form::Confirm { command, .. } => f
                .debug_struct("Confirm")
                .field("command", command)
                .field("then", &"<continuation>")
                .finish(),
            Form::Ask { question, .. } => f
                .debug_struct("Ask")
                .field("question", question)
                .field("then", &"<continuation>")
                .finish(),
            Form::Remember { content, then } => f
                .debug_struct("Remember")
                .field("content", content)
                .field("then", then)
                .finish(),
            Form::Forget { content, then } => f
                .debug_struct("Forget")
                .field("content", content)
                .field("then", then)
                .finish(),
            Form::Emit { text, then } => f
                .debug_struct("Emit")
                .field("text", text)
                .field("then", then)
                .finish(),
            Form::Refresh => write!(f, "Refresh"),
            Form::Reboot { reason } => f.debug_struct("Reboot").field("reason", reason).finish(),
            Form::Done { summary } => f.debug_struct("Done").field("summary", summary).finish(),
            Form::Seq(forms) => f.debug_tuple("Seq").field(forms).finish(),
            Form::Nil => write!(f, "Nil"),
            Form::Install { source } => {
                f.debug_struct("Install").field("source", source).finish()
            }
            Form::ListTools => write!(f, "ListTools"),
            Form::Spawn { task, .. } => f
                .debug_struct("Spawn")
                .field("task", task)
                .field("then", &"<continuation>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_cover_every_variant() {
        assert_eq!(Form::think("x").tag(), "think");
        assert_eq!(Form::invoke(vec![], |_| Form::Nil).tag(), "invoke");
        assert_eq!(Form::confirm("rm -rf /", |_| Form::Nil).tag(), "confirm");
        assert_eq!(Form::ask("name?", |_| Form::Nil).tag(), "ask");
        assert_eq!(Form::remember("note", Form::Nil).tag(), "remember");
        assert_eq!(Form::forget("note", Form::Nil).tag(), "forget");
        assert_eq!(Form::emit("hi", Form::Nil).tag(), "emit");
        assert_eq!(Form::Refresh.tag(), "refresh");
        assert_eq!(Form::reboot("new code").tag(), "reboot");
        assert_eq!(Form::done("finished").tag(), "done");
        assert_eq!(Form::seq(vec![]).tag(), "seq");
        assert_eq!(Form::Nil.tag(), "nil");
        assert_eq!(Form::install("tool.toml").tag(), "install");
        assert_eq!(Form::ListTools.tag(), "list_tools");
        assert_eq!(Form::spawn("do x", |_| Form::Nil).tag(), "spawn");
    }

    #[test]
    fn continuations_produce_forms() {
        let form = Form::invoke(vec![], |results| {
            assert!(results.is_empty());
            Form::done("ran")
        });
        match form {
            Form::Invoke { then, .. } => {
                let next = then(vec![]);
                assert_eq!(next.tag(), "done");
            }
            _ => panic!("expected Invoke"),
        }
    }

    #[test]
    fn debug_hides_continuations() {
        let form = Form::spawn("audit the repo", |_| Form::Nil);
        let rendered = format!("{form:?}");
        assert!(rendered.contains("audit the repo"));
        assert!(rendered.contains("<continuation>"));
    }

    #[test]
    fn debug_renders_nested_successors() {
        let form = Form::remember("likes rust", Form::emit("noted", Form::Nil));
        let rendered = format!("{form:?}");
        assert!(rendered.contains("likes rust"));
        assert!(rendered.contains("noted"));
        assert!(rendered.contains("Nil"));
    }
}
