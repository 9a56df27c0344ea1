//! Interactive terminal mode: a plain line-oriented loop. Streams
//! assistant prose, prints tool progress lines, and handles Ctrl-C by
//! firing the run's cancellation token.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gloop_core::{EffectError, Effects, World};
use gloop_engine::{eval, route_input};
use gloop_session::{RebootSession, SESSION_FILE};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::effects::{AgentEffects, Sink};
use crate::runtime::Runtime;

/// Printing sink; tracks the in-flight tool so an abort can mark it
/// interrupted.
#[derive(Clone, Default)]
pub struct TerminalSink {
    running_tool: Arc<Mutex<Option<String>>>,
}

impl TerminalSink {
    fn take_running(&self) -> Option<String> {
        self.running_tool.lock().unwrap().take()
    }
}

async fn read_line() -> Result<Option<String>, EffectError> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => Ok(None), // EOF
            Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
            Err(e) => Err(EffectError::Io(e.to_string())),
        }
    })
    .await
    .map_err(|e| EffectError::Io(e.to_string()))?
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

#[async_trait]
impl Sink for TerminalSink {
    async fn chunk(&self, text: &str) {
        prompt(text);
    }

    async fn done(&self) {
        println!();
    }

    async fn tool_parsed(&self, name: &str, preview: &str) {
        println!("  [tool] {name}: {preview}");
    }

    async fn tool_start(&self, name: &str, preview: &str) {
        *self.running_tool.lock().unwrap() = Some(name.to_string());
        debug!(tool = name, preview, "tool starting");
    }

    async fn tool_done(&self, name: &str, ok: bool, output: &str) {
        self.take_running();
        if ok {
            println!("  [ok] {name}");
        } else {
            println!("  [err] {name}: {output}");
        }
    }

    async fn confirm(&self, command: &str) -> Result<bool, EffectError> {
        prompt(&format!("  [confirm] {command}\n  Allow? [y/N] "));
        let answer = read_line().await?.unwrap_or_default();
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    async fn ask(&self, question: &str) -> Result<String, EffectError> {
        prompt(&format!("  [question] {question}\n  > "));
        Ok(read_line().await?.unwrap_or_default())
    }

    async fn complete(&self, summary: &str) {
        println!("\n  [complete] {summary}");
    }

    async fn remembered(&self, content: &str) {
        println!("  [remember] {content}");
    }

    async fn forgot(&self, content: &str) {
        println!("  [forget] {content}");
    }

    async fn rebooting(&self, reason: &str) {
        println!("\n  [reboot] {reason}");
    }
}

/// Run the interactive loop until EOF.
pub async fn run(runtime: Runtime) -> Result<(), Box<dyn std::error::Error>> {
    let sink = TerminalSink::default();
    let effects = AgentEffects::new(
        Arc::clone(&runtime.conversation),
        Arc::clone(&runtime.registry),
        Arc::clone(&runtime.memory),
        runtime.tools_dir.clone(),
        SESSION_FILE.into(),
        sink.clone(),
    );
    effects.refresh_system().await?;

    println!();
    println!("  gloop — model {}", runtime.conversation.model());
    println!("  /tools lists tools, /install <manifest> adds one, Ctrl-C interrupts.");
    println!();

    // A pending reboot session becomes the first input.
    let mut pending = RebootSession::load_and_delete(SESSION_FILE.as_ref()).map(|session| {
        runtime.conversation.set_history(session.history.clone());
        println!("  [resumed] {}", session.reason);
        session.resume_input()
    });

    loop {
        let line = match pending.take() {
            Some(input) => input,
            None => {
                prompt("you> ");
                match read_line().await? {
                    Some(line) => line,
                    None => break, // EOF
                }
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if line.trim() == "exit" {
            break;
        }

        let cancel = CancellationToken::new();
        let world = World::new(
            Arc::clone(&runtime.conversation),
            Arc::clone(&runtime.registry),
        )
        .with_cancel(cancel.clone())
        .with_prune_threshold(runtime.config.prune_threshold);

        // Ctrl-C fires the run's token; the evaluator unwinds at its next
        // checkpoint.
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let result = eval(route_input(&line), &world, &effects).await;
        watcher.abort();

        match result {
            Ok(()) => {}
            Err(e) if e.is_aborted() => {
                if let Some(tool) = sink.take_running() {
                    println!("  [err] {tool}: interrupted");
                }
                println!("[Interrupted]");
            }
            Err(e) => {
                eprintln!("  [error] {e}");
            }
        }
    }

    println!("\n  bye");
    Ok(())
}
