//! # gloop Session
//!
//! Process-lifecycle persistence: the reboot protocol (serialize history,
//! exit 75, supervisor respawns, restarted process resumes) and the
//! headless JSONL event stream that task mode writes for its parent.

pub mod headless;
pub mod reboot;

pub use headless::{read_complete, EventLog, EventRecord, HeadlessEvent};
pub use reboot::{RebootSession, REBOOT_EXIT_CODE, SESSION_FILE};
