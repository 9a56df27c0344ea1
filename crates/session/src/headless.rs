//! The headless event stream — newline-delimited JSON, one event per
//! line, written by task mode and read back by whoever spawned it.
//!
//! The `complete` event is the contract with the spawn launcher: its
//! `summary` becomes the subagent's result.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gloop_core::{EffectError, Usage};

/// All event types task mode can emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeadlessEvent {
    Start { task: String },
    Assistant { text: String },
    ToolStart { name: String, preview: String },
    ToolDone { name: String, ok: bool, output: String },
    Remember { content: String },
    Forget { content: String },
    RefreshSystem,
    Reboot { reason: String },
    Complete { summary: String, usage: Usage },
    Usage { usage: Usage },
    Error { message: String },
}

/// One line of the event file: a timestamp plus the event fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: HeadlessEvent,
}

/// Append-only JSONL event writer.
pub struct EventLog {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl EventLog {
    /// Create (truncating) the event file.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, EffectError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EffectError::Io(e.to_string()))?;
        }
        let file = std::fs::File::create(&path).map_err(|e| EffectError::Io(e.to_string()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, stamped now.
    pub fn append(&self, event: HeadlessEvent) -> Result<(), EffectError> {
        let record = EventRecord {
            ts: Utc::now(),
            event,
        };
        let line = serde_json::to_string(&record).map_err(|e| EffectError::Io(e.to_string()))?;
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{line}").map_err(|e| EffectError::Io(e.to_string()))?;
        file.flush().map_err(|e| EffectError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Scan an event file for the `complete` event. Unparseable lines are
/// skipped — a crashed subagent leaves a truncated tail.
pub fn read_complete(path: &Path) -> Option<(String, Usage)> {
    let content = std::fs::read_to_string(path).ok()?;
    content
        .lines()
        .filter_map(|line| serde_json::from_str::<EventRecord>(line).ok())
        .find_map(|record| match record.event {
            HeadlessEvent::Complete { summary, usage } => Some((summary, usage)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn event_type_tags_are_snake_case() {
        let cases = [
            (
                HeadlessEvent::Start { task: "t".into() },
                r#""type":"start""#,
            ),
            (
                HeadlessEvent::ToolStart {
                    name: "Echo".into(),
                    preview: "x".into(),
                },
                r#""type":"tool_start""#,
            ),
            (HeadlessEvent::RefreshSystem, r#""type":"refresh_system""#),
            (
                HeadlessEvent::Reboot {
                    reason: "r".into(),
                },
                r#""type":"reboot""#,
            ),
            (
                HeadlessEvent::Error {
                    message: "m".into(),
                },
                r#""type":"error""#,
            ),
        ];
        for (event, expected) in cases {
            let json = serde_json::to_string(&EventRecord {
                ts: Utc::now(),
                event,
            })
            .unwrap();
            assert!(json.contains(expected), "{json}");
            assert!(json.contains(r#""ts":"#));
        }
    }

    #[test]
    fn log_appends_one_json_object_per_line() {
        let dir = tempdir().unwrap();
        let log = EventLog::create(dir.path().join("events.jsonl")).unwrap();
        log.append(HeadlessEvent::Start { task: "t".into() }).unwrap();
        log.append(HeadlessEvent::Assistant {
            text: "working".into(),
        })
        .unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<EventRecord>(line).unwrap();
        }
    }

    #[test]
    fn read_complete_finds_summary_and_usage() {
        let dir = tempdir().unwrap();
        let log = EventLog::create(dir.path().join("events.jsonl")).unwrap();
        log.append(HeadlessEvent::Start { task: "t".into() }).unwrap();
        log.append(HeadlessEvent::Complete {
            summary: "all done".into(),
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
        })
        .unwrap();

        let (summary, usage) = read_complete(log.path()).unwrap();
        assert_eq!(summary, "all done");
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn read_complete_skips_garbage_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(
            &path,
            "not json\n{\"ts\":\"2026-01-01T00:00:00Z\",\"type\":\"complete\",\
             \"summary\":\"ok\",\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":2,\
             \"total_tokens\":3}}\ntrailing garbage",
        )
        .unwrap();
        let (summary, _) = read_complete(&path).unwrap();
        assert_eq!(summary, "ok");
    }

    #[test]
    fn read_complete_none_without_event() {
        let dir = tempdir().unwrap();
        let log = EventLog::create(dir.path().join("events.jsonl")).unwrap();
        log.append(HeadlessEvent::Error {
            message: "crashed".into(),
        })
        .unwrap();
        assert!(read_complete(log.path()).is_none());
    }
}
