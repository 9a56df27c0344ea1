//! Argument-list syntax inside `Name(...)` tool calls.
//!
//! A comma-separated list where each element is either bare (runs to the
//! next unquoted comma, trimmed) or quoted by `"`, `'`, or a backtick.
//! Backslash escapes are interpreted inside double quotes only: `\n`,
//! `\t`, `\\` produce their usual characters and any other escaped
//! character is emitted literally. Keyword-style `name=` / `name:`
//! prefixes are accepted and stripped; positional order is what counts.

/// Parse the text between the parentheses of a tool call into positional
/// argument strings.
pub fn parse_call_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        // Skip whitespace between arguments
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        i = skip_keyword_prefix(&chars, i);
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        match chars.get(i).copied() {
            Some(quote @ ('"' | '\'' | '`')) => {
                let (value, next) = read_quoted(&chars, i + 1, quote);
                args.push(value);
                i = next;
                // Skip anything up to the separating comma
                while i < chars.len() && chars[i] != ',' {
                    i += 1;
                }
                i += 1; // past the comma
            }
            Some(_) => {
                let start = i;
                while i < chars.len() && chars[i] != ',' {
                    i += 1;
                }
                let bare: String = chars[start..i].iter().collect();
                args.push(bare.trim().to_string());
                i += 1; // past the comma
            }
            None => break,
        }
    }

    args
}

/// Skip an optional `name=` / `name:` keyword prefix, returning the index
/// of the value. A `:` only counts as a prefix separator when followed by
/// whitespace or a quote, so bare values like `https://example.com`
/// survive intact.
fn skip_keyword_prefix(chars: &[char], start: usize) -> usize {
    let mut i = start;
    if i >= chars.len() || !(chars[i].is_ascii_alphabetic() || chars[i] == '_') {
        return start;
    }
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    match chars.get(i).copied() {
        Some('=') => i + 1,
        Some(':') => {
            let after = chars.get(i + 1).copied();
            if matches!(after, None | Some(' ' | '\t' | '"' | '\'' | '`')) {
                i + 1
            } else {
                start
            }
        }
        _ => start,
    }
}

/// Read a quoted value starting just after the opening quote. Returns the
/// value and the index just past the closing quote (or the end of input
/// for an unterminated quote).
fn read_quoted(chars: &[char], start: usize, quote: char) -> (String, usize) {
    let mut value = String::new();
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return (value, i + 1);
        }
        if c == '\\' && quote == '"' {
            match chars.get(i + 1).copied() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => value.push('\\'),
            }
            i += 2;
            continue;
        }
        value.push(c);
        i += 1;
    }

    (value, i)
}
