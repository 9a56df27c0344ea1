//! Top-level input routing.
//!
//! Each line the user submits is checked for a slash command before it
//! becomes a Think; everything else goes to the model verbatim.

use gloop_core::Form;

/// Route one top-level input line to its Form.
pub fn route_input(line: &str) -> Form {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix('/') {
        let (command, arg) = match rest.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (rest, ""),
        };
        return match command {
            "install" => Form::install(arg),
            "tools" => Form::ListTools,
            _ => Form::emit(format!("Unknown command: /{command}"), Form::Nil),
        };
    }
    Form::think(trimmed)
}
