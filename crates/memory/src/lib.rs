//! # gloop Memory
//!
//! The persistent note store behind `<remember>` / `<forget>`. Simple,
//! portable, human-inspectable: one text file, one entry per line once an
//! entry outgrows the cap.

pub mod store;

pub use store::{compact_entry, NoteStore, MEMORY_ENTRY_CAP};
