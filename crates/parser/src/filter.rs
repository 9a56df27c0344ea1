//! The stream filter — suppresses tool/memory markup from user-visible
//! output, character by character, as delta chunks arrive.
//!
//! Three states: `Normal` passes text through; `Buffering` accumulates a
//! potential opening tag after `<`; `Suppressing` swallows everything up
//! to the matching closing tag. While suppressing inside a tool container,
//! every completed `<tool>…</tool>` element fires a sighting immediately,
//! so the UI can show "running Echo…" before the stream even finishes.
//!
//! Nesting: if the currently open tag literal appears again inside the
//! suppressed region (say, a tool writing a file that itself contains
//! `<tools>`), a depth counter keeps suppression alive until the matching
//! closer.

use crate::response::{parse_tool_call, SECTION_BEGIN, SECTION_END, TOOLS_CLOSE, TOOLS_OPEN};

/// Markup openers that switch the filter into suppression.
const OPEN_TAGS: [&str; 4] = [TOOLS_OPEN, "<remember>", "<forget>", SECTION_BEGIN];

const TOOL_CLOSE: &str = "</tool>";

/// Preview length for early tool sightings.
const PREVIEW_LEN: usize = 60;

fn closing_tag(open: &str) -> &'static str {
    match open {
        TOOLS_OPEN => TOOLS_CLOSE,
        "<remember>" => "</remember>",
        "<forget>" => "</forget>",
        _ => SECTION_END,
    }
}

/// Whether this opener delimits a tool container (individual `<tool>`
/// elements inside it fire early sightings).
fn is_container(open: &str) -> bool {
    open == TOOLS_OPEN || open == SECTION_BEGIN
}

/// A complete tool call spotted mid-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSighting {
    pub name: String,
    /// First argument text, truncated.
    pub preview: String,
}

/// Output of feeding one chunk through the filter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterOutput {
    /// Clean, user-visible text.
    pub text: String,
    /// Tool elements completed within this chunk.
    pub tools: Vec<ToolSighting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Buffering,
    Suppressing,
}

/// Incremental markup suppressor. One instance per model reply.
pub struct StreamFilter {
    state: State,
    /// Pending `<`-prefixed text that may still become an opening tag.
    buf: String,
    /// Everything swallowed since the current opening tag.
    suppressed: String,
    open_tag: &'static str,
    close_tag: &'static str,
    nested: usize,
    tools_seen: usize,
}

impl Default for StreamFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFilter {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            buf: String::new(),
            suppressed: String::new(),
            open_tag: "",
            close_tag: "",
            nested: 0,
            tools_seen: 0,
        }
    }

    /// Feed one delta chunk; returns the clean text and any tool
    /// sightings it completed.
    pub fn feed(&mut self, chunk: &str) -> FilterOutput {
        let mut out = FilterOutput::default();
        for c in chunk.chars() {
            self.step(c, &mut out);
        }
        out
    }

    /// End of stream: emit any still-buffering text as normal output and
    /// reset. Text inside an unterminated suppression stays suppressed.
    pub fn flush(&mut self) -> String {
        let tail = match self.state {
            State::Buffering => std::mem::take(&mut self.buf),
            _ => String::new(),
        };
        self.state = State::Normal;
        self.buf.clear();
        self.suppressed.clear();
        self.nested = 0;
        tail
    }

    fn step(&mut self, c: char, out: &mut FilterOutput) {
        match self.state {
            State::Normal => {
                if c == '<' {
                    self.state = State::Buffering;
                    self.buf.push('<');
                } else {
                    out.text.push(c);
                }
            }
            State::Buffering => {
                self.buf.push(c);
                if let Some(tag) = OPEN_TAGS.iter().find(|t| **t == self.buf).copied() {
                    self.open_tag = tag;
                    self.close_tag = closing_tag(tag);
                    self.nested = 0;
                    self.tools_seen = 0;
                    self.suppressed.clear();
                    self.buf.clear();
                    self.state = State::Suppressing;
                } else if !OPEN_TAGS.iter().any(|t| t.starts_with(self.buf.as_str())) {
                    self.flush_mismatch(out);
                }
            }
            State::Suppressing => {
                self.suppressed.push(c);
                if self.suppressed.ends_with(self.open_tag) {
                    self.nested += 1;
                } else if self.suppressed.ends_with(self.close_tag) {
                    if self.nested > 0 {
                        self.nested -= 1;
                    } else {
                        self.state = State::Normal;
                        self.suppressed.clear();
                    }
                } else if is_container(self.open_tag) && self.suppressed.ends_with(TOOL_CLOSE) {
                    self.emit_new_tools(out);
                }
            }
        }
    }

    /// The buffer stopped matching any opening tag: the first char is
    /// plain text, and the rest re-enters the machine (it may contain a
    /// fresh `<`).
    fn flush_mismatch(&mut self, out: &mut FilterOutput) {
        let pending = std::mem::take(&mut self.buf);
        self.state = State::Normal;
        let mut chars = pending.chars();
        if let Some(first) = chars.next() {
            out.text.push(first);
        }
        for c in chars {
            self.step(c, out);
        }
    }

    /// Scan the suppressed buffer for `<tool>…</tool>` elements and emit
    /// sightings for any newer than what we already reported.
    fn emit_new_tools(&mut self, out: &mut FilterOutput) {
        let mut found = 0;
        let mut rest = self.suppressed.as_str();
        while let Some(start) = rest.find("<tool>") {
            let after_open = &rest[start + "<tool>".len()..];
            let Some(end) = after_open.find(TOOL_CLOSE) else {
                break;
            };
            found += 1;
            if found > self.tools_seen {
                let call = parse_tool_call(&after_open[..end]);
                out.tools.push(ToolSighting {
                    preview: call.first_arg().chars().take(PREVIEW_LEN).collect(),
                    name: call.name,
                });
            }
            rest = &after_open[end + TOOL_CLOSE.len()..];
        }
        self.tools_seen = self.tools_seen.max(found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed input split into `n`-char chunks, collecting all output.
    fn run_chunked(input: &str, n: usize) -> (String, Vec<ToolSighting>) {
        let mut filter = StreamFilter::new();
        let mut text = String::new();
        let mut tools = Vec::new();
        let chars: Vec<char> = input.chars().collect();
        for chunk in chars.chunks(n) {
            let s: String = chunk.iter().collect();
            let out = filter.feed(&s);
            text.push_str(&out.text);
            tools.extend(out.tools);
        }
        text.push_str(&filter.flush());
        (text, tools)
    }

    #[test]
    fn plain_text_passes_through_identically() {
        for n in [1, 3, 7, 100] {
            let input = "Hello there! 2 < 3 and 5 > 4. Done.";
            let (text, tools) = run_chunked(input, n);
            assert_eq!(text, input, "chunk size {n}");
            assert!(tools.is_empty());
        }
    }

    #[test]
    fn container_is_suppressed_and_tools_fire() {
        let input = r#"Before <tools><tool>Echo("one")</tool><tool>Echo("two")</tool></tools> After"#;
        for n in [1, 4, 9, 64] {
            let (text, tools) = run_chunked(input, n);
            assert_eq!(text, "Before  After", "chunk size {n}");
            assert_eq!(tools.len(), 2);
            assert_eq!(tools[0].name, "Echo");
            assert_eq!(tools[0].preview, "one");
            assert_eq!(tools[1].preview, "two");
        }
    }

    #[test]
    fn sighting_fires_before_container_closes() {
        let mut filter = StreamFilter::new();
        let out = filter.feed(r#"<tools><tool>Echo("early")</tool>"#);
        assert_eq!(out.tools.len(), 1);
        assert_eq!(out.tools[0].preview, "early");
        assert!(out.text.is_empty());
    }

    #[test]
    fn memory_tags_are_suppressed() {
        let (text, tools) = run_chunked(
            "ok <remember>likes rust</remember> and <forget>old</forget> done",
            1,
        );
        assert_eq!(text, "ok  and  done");
        assert!(tools.is_empty());
    }

    #[test]
    fn sentinel_section_is_suppressed() {
        let input = concat!(
            "Thinking ",
            "<|tool_calls_section_begin|>",
            "<|tool_call_begin|>Echo<|tool_call_argument_begin|>{}<|tool_call_end|>",
            "<|tool_calls_section_end|>",
            " done",
        );
        let (text, _) = run_chunked(input, 5);
        assert_eq!(text, "Thinking  done");
    }

    #[test]
    fn nested_open_tag_keeps_suppressing() {
        let input = "<tools><tool>WriteFile(\"f\", \"<tools>inner</tools>\")</tool></tools>tail";
        let (text, tools) = run_chunked(input, 1);
        assert_eq!(text, "tail");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "WriteFile");
    }

    #[test]
    fn bare_tool_tag_is_not_suppressed() {
        // Only containers and memory tags trigger suppression; a lone
        // <tool> outside any container is the parser's business.
        let (text, tools) = run_chunked("a <tool>Echo(\"x\")</tool> b", 2);
        assert_eq!(text, "a <tool>Echo(\"x\")</tool> b");
        assert!(tools.is_empty());
    }

    #[test]
    fn near_miss_prefix_is_flushed_as_text() {
        let (text, _) = run_chunked("size <toolbox> fits", 3);
        assert_eq!(text, "size <toolbox> fits");
    }

    #[test]
    fn flush_emits_dangling_partial_tag() {
        let mut filter = StreamFilter::new();
        let out = filter.feed("end with <tool");
        assert_eq!(out.text, "end with ");
        assert_eq!(filter.flush(), "<tool");
    }

    #[test]
    fn unterminated_suppression_stays_suppressed() {
        let mut filter = StreamFilter::new();
        let out = filter.feed("visible <tools><tool>Echo(\"x\")");
        assert_eq!(out.text, "visible ");
        assert_eq!(filter.flush(), "");
    }

    #[test]
    fn preview_truncates_to_sixty_chars() {
        let long_arg = "x".repeat(100);
        let input = format!("<tools><tool>Echo(\"{long_arg}\")</tool></tools>");
        let (_, tools) = run_chunked(&input, 16);
        assert_eq!(tools[0].preview.chars().count(), 60);
    }

    #[test]
    fn consecutive_angle_brackets_survive() {
        let (text, _) = run_chunked("a << b <<tools ok", 1);
        assert_eq!(text, "a << b <<tools ok");
    }
}
