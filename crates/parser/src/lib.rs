//! # gloop Parser
//!
//! Turns raw model output into structure: the response parser extracts
//! tool calls and memory operations from two markup dialects, the stream
//! filter suppresses that markup from user-visible output as chunks
//! arrive, and the form builder translates a parsed response into the
//! next [`Form`](gloop_core::Form) for the evaluator.

pub mod args;
pub mod filter;
pub mod form_builder;
pub mod response;
pub mod spawn;

pub use args::parse_call_args;
pub use filter::{FilterOutput, StreamFilter, ToolSighting};
pub use form_builder::{
    format_result, format_results, has_complete_tool_block, parse_to_form, spawn_result_blob,
    COMPLETE_TOOL, REBOOT_TOOL,
};
pub use response::{format_tool_call, parse_response, parse_tool_call, ParsedResponse};
pub use spawn::{detect_spawn, tokenize};
