//! The Invoke step — execute one batch of tool calls.
//!
//! Calls run strictly in parser order, one at a time. A tool failure,
//! an unknown name, or a user denial is folded into a `ToolResult` and
//! fed back to the model; it never escapes the batch. What does escape:
//! cancellation and broken effect plumbing.

use std::sync::LazyLock;

use gloop_core::{Effects, EngineError, ToolArg, ToolArgs, ToolCall, ToolResult, World};
use regex_lite::Regex;
use tracing::{debug, warn};

/// Pseudo-tool handled inline: free-form question to the user.
pub const ASK_USER_TOOL: &str = "AskUser";

/// Pseudo-tool handled inline: edit the conversation history.
pub const MANAGE_CONTEXT_TOOL: &str = "ManageContext";

/// Registry tool that re-reads installed tool manifests; the system
/// prompt must be rebuilt afterwards.
pub const RELOAD_TOOL: &str = "Reload";

/// Instructions for the periodic context prune.
pub const PRUNE_INSTRUCTIONS: &str = "Prune old tool results and intermediate outputs. \
     Keep the current task goal, recent results, and any information the agent is actively using.";

const ARG_PREVIEW_LEN: usize = 40;
const PREVIEW_ARGS: usize = 3;

/// Commands the built-in gate always asks about, whatever the tool says.
static DESTRUCTIVE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\brm\b", r"\brmdir\b", r"\brm\s+-rf?\b", r"\brm\s+-fr?\b"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Execute a batch of tool calls against the current registry snapshot.
pub async fn invoke_step(
    calls: Vec<ToolCall>,
    world: &World,
    effects: &dyn Effects,
) -> Result<Vec<ToolResult>, EngineError> {
    let registry = world.registry_snapshot();
    let batch_size = calls.len() as u32;
    let reload_called = calls.iter().any(|c| c.name == RELOAD_TOOL);
    let mut results = Vec::with_capacity(calls.len());

    for call in calls {
        if world.cancel.is_cancelled() {
            return Err(EngineError::Aborted);
        }

        // AskUser and ManageContext never reach the registry.
        if call.name == ASK_USER_TOOL {
            effects.tool_start(ASK_USER_TOOL, &args_preview(&call)).await;
            let reply = effects.ask(call.first_arg()).await?;
            let output = format!("User answered: {reply}");
            effects.tool_done(ASK_USER_TOOL, true, &output).await;
            results.push(ToolResult::ok(ASK_USER_TOOL, output));
            continue;
        }
        if call.name == MANAGE_CONTEXT_TOOL {
            effects
                .tool_start(MANAGE_CONTEXT_TOOL, &args_preview(&call))
                .await;
            let summary = effects.manage_context(call.first_arg()).await?;
            effects.tool_done(MANAGE_CONTEXT_TOOL, true, &summary).await;
            results.push(ToolResult::ok(MANAGE_CONTEXT_TOOL, summary));
            continue;
        }

        let Some(tool) = registry.get(&call.name) else {
            let message = format!("Unknown tool: {}", call.name);
            warn!(tool = %call.name, "unknown tool in batch");
            effects.tool_done(&call.name, false, &message).await;
            results.push(ToolResult::error(&call.name, message));
            continue;
        };

        let args = zip_args(&tool.arguments(), &call.raw_args);

        // Two danger gates: the built-in pattern list, then the tool's own
        // hook when the first gate stays quiet.
        let danger = builtin_danger(&call).or_else(|| tool.ask_permission(&args));
        if let Some(description) = danger {
            if !effects.confirm(&description).await? {
                effects.tool_done(&call.name, false, "denied by user").await;
                results.push(ToolResult::error(&call.name, "User denied execution"));
                continue;
            }
        }

        effects.tool_start(&call.name, &args_preview(&call)).await;
        debug!(tool = %call.name, args = call.raw_args.len(), "executing tool");

        match tool.execute(&args).await {
            Ok(output) => {
                effects.tool_done(&call.name, true, "ok").await;
                results.push(ToolResult::ok(&call.name, output));
            }
            Err(e) => {
                let message = error_chain(&e);
                effects.tool_done(&call.name, false, &message).await;
                results.push(ToolResult::error(&call.name, message));
            }
        }
    }

    // The registry changed under us; the model needs the new listing.
    if reload_called {
        effects.refresh_system().await?;
    }

    if world.count_tool_calls(batch_size) {
        effects
            .tool_start(MANAGE_CONTEXT_TOOL, "periodic context prune")
            .await;
        let summary = effects.manage_context(PRUNE_INSTRUCTIONS).await?;
        effects.tool_done(MANAGE_CONTEXT_TOOL, true, &summary).await;
    }

    Ok(results)
}

/// Zip declared argument names with positional raw args. Excess raw args
/// are ignored; missing names are absent keys.
fn zip_args(declared: &[ToolArg], raw_args: &[String]) -> ToolArgs {
    declared
        .iter()
        .zip(raw_args.iter())
        .map(|(spec, value)| (spec.name.clone(), value.clone()))
        .collect()
}

/// The built-in destructive-command gate for Bash.
fn builtin_danger(call: &ToolCall) -> Option<String> {
    if call.name != "Bash" {
        return None;
    }
    let command = call.first_arg();
    if DESTRUCTIVE_PATTERNS.iter().any(|re| re.is_match(command)) {
        Some(format!("Execute destructive command: {command}"))
    } else {
        None
    }
}

/// First few args, each truncated, joined for display.
fn args_preview(call: &ToolCall) -> String {
    call.raw_args
        .iter()
        .take(PREVIEW_ARGS)
        .map(|a| {
            if a.chars().count() > ARG_PREVIEW_LEN {
                let truncated: String = a.chars().take(ARG_PREVIEW_LEN).collect();
                format!("{truncated}…")
            } else {
                a.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render an error with a short excerpt of its source chain.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    let mut depth = 0;
    while let Some(cause) = source {
        if depth >= 3 {
            break;
        }
        message.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
        depth += 1;
    }
    message
}
