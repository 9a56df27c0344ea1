//! Response parsing — extracting tool calls, memory operations, and clean
//! prose from a raw model reply.
//!
//! Two markup dialects are recognized:
//!
//! - **Primary:** `<tools>…</tools>` containers holding `<tool>Name(args)</tool>`,
//!   `<remember>…</remember>`, and `<forget>…</forget>` elements. A stray
//!   `<tools>` opening tag in the closing position is accepted as a
//!   terminator — observed models emit this.
//! - **Alternative:** a `<|tool_calls_section_begin|>…<|tool_calls_section_end|>`
//!   section of `<|tool_call_begin|>HEADER<|tool_call_argument_begin|>JSON<|tool_call_end|>`
//!   records, where `HEADER` is `functions.Name[:index]` or `Name` and the
//!   JSON object's values become positional arguments in key order.
//!
//! Bare top-level `<remember>`, `<forget>`, and `<tool>` tags outside any
//! container are honored too. Everything extracted is removed from the
//! user-visible `clean_text`.

use std::sync::LazyLock;

use regex_lite::Regex;

use gloop_core::ToolCall;

use crate::args::parse_call_args;

pub(crate) const TOOLS_OPEN: &str = "<tools>";
pub(crate) const TOOLS_CLOSE: &str = "</tools>";
pub(crate) const SECTION_BEGIN: &str = "<|tool_calls_section_begin|>";
pub(crate) const SECTION_END: &str = "<|tool_calls_section_end|>";
const CALL_BEGIN: &str = "<|tool_call_begin|>";
const ARG_BEGIN: &str = "<|tool_call_argument_begin|>";
const CALL_END: &str = "<|tool_call_end|>";

/// `functions.Name[:index]` or plain `Name`.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:functions\.)?([A-Za-z_][A-Za-z0-9_]*)(?::[0-9]+)?$").unwrap()
});

/// Everything extracted from one model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub tool_calls: Vec<ToolCall>,
    pub remembers: Vec<String>,
    pub forgets: Vec<String>,
    pub clean_text: String,
}

/// Parse a complete reply blob into tool calls, memory operations, and
/// clean prose, in document order.
pub fn parse_response(text: &str) -> ParsedResponse {
    let mut out = ParsedResponse::default();
    let mut clean = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix(SECTION_BEGIN) {
            let (section, after) = match stripped.find(SECTION_END) {
                Some(pos) => (&stripped[..pos], &stripped[pos + SECTION_END.len()..]),
                None => (stripped, ""),
            };
            parse_sentinel_section(section, &mut out.tool_calls);
            rest = after;
            continue;
        }

        if let Some(stripped) = rest.strip_prefix(TOOLS_OPEN) {
            let close = stripped.find(TOOLS_CLOSE);
            let stray = stripped.find(TOOLS_OPEN);
            let (body, after) = match (close, stray) {
                // Stray `<tools>` before the real closer terminates the container
                (Some(c), Some(s)) if s < c => {
                    (&stripped[..s], &stripped[s + TOOLS_OPEN.len()..])
                }
                (Some(c), _) => (&stripped[..c], &stripped[c + TOOLS_CLOSE.len()..]),
                (None, Some(s)) => (&stripped[..s], &stripped[s + TOOLS_OPEN.len()..]),
                (None, None) => (stripped, ""),
            };
            parse_container_body(body, &mut out);
            rest = after;
            continue;
        }

        if let Some((content, after)) = tagged_region(rest, "remember") {
            out.remembers.push(content.trim().to_string());
            rest = after;
            continue;
        }
        if let Some((content, after)) = tagged_region(rest, "forget") {
            out.forgets.push(content.trim().to_string());
            rest = after;
            continue;
        }
        if let Some((content, after)) = tagged_region(rest, "tool") {
            out.tool_calls.push(parse_tool_call(content));
            rest = after;
            continue;
        }

        let ch = rest.chars().next().unwrap();
        clean.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out.clean_text = clean.trim().to_string();
    out
}

/// If `rest` starts with `<tag>` and a matching closer exists, return the
/// enclosed content and the remainder past the closer. An unterminated tag
/// is treated as literal text by the caller.
fn tagged_region<'a>(rest: &'a str, tag: &str) -> Option<(&'a str, &'a str)> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let stripped = rest.strip_prefix(open.as_str())?;
    let end = stripped.find(close.as_str())?;
    Some((&stripped[..end], &stripped[end + close.len()..]))
}

/// Extract the `<tool>`, `<remember>`, and `<forget>` elements from a
/// container body; anything between elements is discarded.
fn parse_container_body(body: &str, out: &mut ParsedResponse) {
    let mut rest = body;
    while !rest.is_empty() {
        if let Some((content, after)) = tagged_region(rest, "tool") {
            out.tool_calls.push(parse_tool_call(content));
            rest = after;
            continue;
        }
        if let Some((content, after)) = tagged_region(rest, "remember") {
            out.remembers.push(content.trim().to_string());
            rest = after;
            continue;
        }
        if let Some((content, after)) = tagged_region(rest, "forget") {
            out.forgets.push(content.trim().to_string());
            rest = after;
            continue;
        }
        let ch = rest.chars().next().unwrap();
        rest = &rest[ch.len_utf8()..];
    }
}

/// Parse the content of a `<tool>` element: `Name(args…)`, or a bare name
/// with no argument list.
pub fn parse_tool_call(content: &str) -> ToolCall {
    let content = content.trim();
    match (content.find('('), content.rfind(')')) {
        (Some(open), Some(close)) if close > open => ToolCall {
            name: content[..open].trim().to_string(),
            raw_args: parse_call_args(&content[open + 1..close]),
        },
        _ => ToolCall {
            name: content.to_string(),
            raw_args: Vec::new(),
        },
    }
}

/// Render a tool call in the primary markup dialect.
pub fn format_tool_call(call: &ToolCall) -> String {
    let args = call
        .raw_args
        .iter()
        .map(|a| format!("\"{}\"", escape_arg(a)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("<tool>{}({})</tool>", call.name, args)
}

fn escape_arg(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

fn parse_sentinel_section(section: &str, calls: &mut Vec<ToolCall>) {
    let mut rest = section;
    while let Some(start) = rest.find(CALL_BEGIN) {
        rest = &rest[start + CALL_BEGIN.len()..];
        let Some(arg_pos) = rest.find(ARG_BEGIN) else {
            break;
        };
        let header = rest[..arg_pos].trim();
        rest = &rest[arg_pos + ARG_BEGIN.len()..];
        let (json, after) = match rest.find(CALL_END) {
            Some(end) => (&rest[..end], &rest[end + CALL_END.len()..]),
            None => (rest, ""),
        };
        if let Some(name) = parse_call_header(header) {
            calls.push(ToolCall {
                name,
                raw_args: json_args(json.trim()),
            });
        }
        rest = after;
    }
}

fn parse_call_header(header: &str) -> Option<String> {
    HEADER_RE
        .captures(header)
        .map(|caps| caps[1].to_string())
}

/// JSON object values become positional arguments in key order. Anything
/// that fails to parse is passed through whole as a single argument.
fn json_args(json: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(json) {
        Ok(map) => map
            .into_iter()
            .map(|(_, value)| match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Err(_) => vec![json.to_string()],
    }
}
