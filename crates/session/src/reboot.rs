//! Reboot session persistence.
//!
//! A reboot serializes `{history, reason, timestamp}` to a fixed path and
//! exits the process with code 75; a supervising launcher respawns it.
//! On startup the new process loads the file, deletes it, installs the
//! history, and synthesizes a resume input so the model knows why it
//! finds itself mid-conversation.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gloop_core::{ChatMessage, EffectError};

/// The distinguished exit code a supervisor treats as "respawn me".
pub const REBOOT_EXIT_CODE: i32 = 75;

/// Where the session is persisted, relative to the working directory.
pub const SESSION_FILE: &str = ".gloop/reboot_session.json";

/// Everything carried across a reboot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebootSession {
    pub history: Vec<ChatMessage>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl RebootSession {
    pub fn new(history: Vec<ChatMessage>, reason: impl Into<String>) -> Self {
        Self {
            history,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Persist to `path`. A failure here propagates and the process keeps
    /// running instead of exiting.
    pub fn save(&self, path: &Path) -> Result<(), EffectError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EffectError::SessionSave(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EffectError::SessionSave(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| EffectError::SessionSave(e.to_string()))?;
        info!(path = %path.display(), messages = self.history.len(), "reboot session saved");
        Ok(())
    }

    /// Load a pending session and delete the file, if one exists. A
    /// corrupt file is discarded with a warning rather than wedging every
    /// subsequent startup.
    pub fn load_and_delete(path: &Path) -> Option<RebootSession> {
        let content = std::fs::read_to_string(path).ok()?;
        let _ = std::fs::remove_file(path);
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "discarding corrupt reboot session");
                None
            }
        }
    }

    /// The synthetic first input of a rebooted process.
    pub fn resume_input(&self) -> String {
        format!(
            "[System: Rebooted successfully. Reason: {}. Fresh code is now loaded. \
             Continue where you left off.]",
            self.reason
        )
    }
}
