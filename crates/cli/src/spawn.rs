//! Subagent launcher — run this binary again in task mode and collect
//! its completion summary from the event file.

use std::path::PathBuf;

use gloop_core::{EffectError, SpawnResult};
use gloop_session::read_complete;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Launch a detached subagent for `task` and wait for it to finish.
pub async fn run_subagent(task: &str) -> Result<SpawnResult, EffectError> {
    let exe = std::env::current_exe().map_err(|e| EffectError::Io(e.to_string()))?;
    let events_path: PathBuf =
        std::env::temp_dir().join(format!("gloop-task-{}.jsonl", Uuid::new_v4()));

    debug!(task, events = %events_path.display(), "spawning subagent");
    let output = Command::new(exe)
        .arg("--task")
        .arg(task)
        .arg("--events")
        .arg(&events_path)
        .output()
        .await
        .map_err(|e| EffectError::Io(e.to_string()))?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let complete = read_complete(&events_path);
    let _ = std::fs::remove_file(&events_path);

    Ok(match complete {
        Some((summary, _usage)) => SpawnResult {
            success: output.status.success(),
            summary,
            exit_code,
            stdout,
            stderr,
        },
        None => {
            warn!(exit_code, "subagent finished without a complete event");
            SpawnResult {
                success: false,
                summary: "Subagent produced no completion summary".into(),
                exit_code,
                stdout,
                stderr,
            }
        }
    })
}
