//! Subagent spawn detection.
//!
//! A `Bash` call whose command invokes the agent's own binary in task mode
//! (`gloop [flags…] --task "…"`) is lifted into a `Spawn` form instead of
//! being run through the shell. The detector tokenizes with POSIX-like
//! quoting rules so a gloop invocation that is merely *mentioned* inside a
//! quoted string is left alone.

/// The binary name the detector looks for in the first token.
const AGENT_BIN: &str = "gloop";

/// If `command` is a direct gloop task-mode invocation, return the task
/// string.
pub fn detect_spawn(command: &str) -> Option<String> {
    let tokens = tokenize(command);
    let first = tokens.first()?;
    let basename = first.rsplit('/').next().unwrap_or(first);
    if basename != AGENT_BIN {
        return None;
    }

    let mut iter = tokens.iter().skip(1);
    while let Some(token) = iter.next() {
        if token == "--task" {
            return iter.next().cloned();
        }
        if let Some(value) = token.strip_prefix("--task=") {
            return Some(value.to_string());
        }
    }
    None
}

/// POSIX-like shell tokenization: whitespace separates tokens; single
/// quotes are literal; double-quoted and backtick regions respect
/// backslash escapes; a backslash outside quotes escapes the next
/// character. Adjacent quoted and bare segments join into one token.
pub fn tokenize(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_segment = false;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if has_segment {
                    tokens.push(std::mem::take(&mut current));
                    has_segment = false;
                }
            }
            '\'' => {
                has_segment = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    current.push(q);
                }
            }
            quote @ ('"' | '`') => {
                has_segment = true;
                while let Some(q) = chars.next() {
                    if q == quote {
                        break;
                    }
                    if q == '\\' {
                        if let Some(escaped) = chars.next() {
                            current.push(escaped);
                        }
                        continue;
                    }
                    current.push(q);
                }
            }
            '\\' => {
                has_segment = true;
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            _ => {
                has_segment = true;
                current.push(c);
            }
        }
    }

    if has_segment {
        tokens.push(current);
    }
    tokens
}
