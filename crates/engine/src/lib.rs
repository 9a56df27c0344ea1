//! # gloop Engine
//!
//! The evaluator — the heart of gloop.
//!
//! A run follows a **Think → Invoke → Think** cycle:
//!
//! 1. **Think**: send the pending input as a user turn, stream the reply
//!    through the markup filter, break early once a complete tool block
//!    arrives, and parse the accumulated text into the next Form.
//! 2. **Invoke**: execute the batch of tool calls in order, folding every
//!    failure into a result the model can react to.
//! 3. Feed the formatted results back in as the next Think.
//!
//! The cycle ends when a reply carries `CompleteTask` (success), `Reboot`
//! (self-restart), or no markup at all. Periodically a nested evaluator —
//! the context-prune fork — edits the conversation history down to size.

pub mod eval;
pub mod invoke;
pub mod prompt;
pub mod prune;
pub mod route;
pub mod testing;
pub mod think;

pub use eval::eval;
pub use invoke::{invoke_step, ASK_USER_TOOL, MANAGE_CONTEXT_TOOL, PRUNE_INSTRUCTIONS, RELOAD_TOOL};
pub use prompt::{build_system_prompt, render_tool_listing};
pub use prune::{index_summary, prune_context};
pub use route::route_input;
pub use think::think_step;
