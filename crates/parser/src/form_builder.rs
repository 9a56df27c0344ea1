//! Translating a parsed response into the next Form.
//!
//! Ordering contract: memory operations first (remembers, then forgets),
//! then regular tool calls, then subagent spawns, then the terminal form
//! if the reply carried one. A `Reboot` call preempts `CompleteTask` when
//! both appear.

use gloop_core::{Form, SpawnResult, ToolCall, ToolResult};

use crate::response::{parse_response, SECTION_BEGIN, SECTION_END, TOOLS_CLOSE, TOOLS_OPEN};
use crate::spawn::detect_spawn;

/// Pseudo-tool that terminates the run successfully.
pub const COMPLETE_TOOL: &str = "CompleteTask";

/// Pseudo-tool that restarts the process.
pub const REBOOT_TOOL: &str = "Reboot";

/// Format one tool result as a feedback blob for the model.
pub fn format_result(result: &ToolResult) -> String {
    let status = if result.success { "success" } else { "error" };
    format!(
        "<tool_result name=\"{}\" status=\"{}\">\n{}\n</tool_result>",
        result.name, status, result.output
    )
}

/// Format a batch of results, joined by blank lines.
pub fn format_results(results: &[ToolResult]) -> String {
    results
        .iter()
        .map(format_result)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Synthesize the result blob for a finished subagent, shaped like the
/// Bash call it replaced.
pub fn spawn_result_blob(result: &SpawnResult) -> String {
    let output = if result.success {
        format!("Subagent completed.\n{}", result.summary)
    } else {
        let detail = if result.stderr.is_empty() {
            result.summary.clone()
        } else {
            result.stderr.clone()
        };
        format!("Subagent failed (exit code {}).\n{}", result.exit_code, detail)
    };
    format_result(&ToolResult {
        name: "Bash".into(),
        output,
        success: result.success,
    })
}

/// Whether the accumulated reply already contains a complete tool block,
/// in either dialect. The Think step uses this to stop streaming early.
pub fn has_complete_tool_block(text: &str) -> bool {
    if let Some(open) = text.find(TOOLS_OPEN) {
        if text[open + TOOLS_OPEN.len()..].contains(TOOLS_CLOSE) {
            return true;
        }
    }
    if let Some(begin) = text.find(SECTION_BEGIN) {
        if text[begin + SECTION_BEGIN.len()..].contains(SECTION_END) {
            return true;
        }
    }
    false
}

/// Translate a raw reply into the next Form.
pub fn parse_to_form(text: &str) -> Form {
    let parsed = parse_response(text);

    let mut prefix: Vec<Form> = Vec::new();
    for content in parsed.remembers {
        prefix.push(Form::remember(content, Form::Nil));
    }
    for content in parsed.forgets {
        prefix.push(Form::forget(content, Form::Nil));
    }

    let main = build_main_form(parsed.tool_calls);
    if prefix.is_empty() {
        return main;
    }
    prefix.push(main);
    Form::seq(prefix)
}

fn build_main_form(calls: Vec<ToolCall>) -> Form {
    if calls.is_empty() {
        return Form::Nil;
    }

    // Partition: terminals out, spawns lifted from Bash, the rest regular.
    let mut reboot: Option<ToolCall> = None;
    let mut complete: Option<ToolCall> = None;
    let mut spawns: Vec<String> = Vec::new();
    let mut regular: Vec<ToolCall> = Vec::new();

    for call in calls {
        match call.name.as_str() {
            REBOOT_TOOL => reboot = reboot.or(Some(call)),
            COMPLETE_TOOL => complete = complete.or(Some(call)),
            "Bash" => match detect_spawn(call.first_arg()) {
                Some(task) => spawns.push(task),
                None => regular.push(call),
            },
            _ => regular.push(call),
        }
    }

    // Reboot wins over CompleteTask when both appear.
    let terminal = if let Some(call) = reboot {
        Some(Form::reboot(call.first_arg().to_string()))
    } else {
        complete.map(|call| Form::done(call.first_arg().to_string()))
    };

    match terminal {
        Some(terminal) => {
            let followup = spawn_chain_to(spawns, terminal);
            if regular.is_empty() {
                followup
            } else {
                Form::invoke(regular, move |_| followup)
            }
        }
        None if spawns.is_empty() => {
            Form::invoke(regular, |results| Form::think(format_results(&results)))
        }
        None => {
            if regular.is_empty() {
                spawn_chain(spawns, Vec::new())
            } else {
                Form::invoke(regular, move |results| {
                    let blobs = results.iter().map(format_result).collect();
                    spawn_chain(spawns, blobs)
                })
            }
        }
    }
}

/// Right-fold spawns into a chain: each spawn emits its result blob, and
/// the final Think carries every blob accumulated so far.
fn spawn_chain(mut tasks: Vec<String>, blobs: Vec<String>) -> Form {
    if tasks.is_empty() {
        return Form::think(blobs.join("\n\n"));
    }
    let task = tasks.remove(0);
    Form::spawn(task, move |result| {
        let blob = spawn_result_blob(&result);
        let mut blobs = blobs;
        blobs.push(blob.clone());
        Form::emit(blob, spawn_chain(tasks, blobs))
    })
}

/// Spawn chain that ends in a terminal form instead of a Think; used when
/// the same reply also carried `CompleteTask` or `Reboot`.
fn spawn_chain_to(mut tasks: Vec<String>, terminal: Form) -> Form {
    if tasks.is_empty() {
        return terminal;
    }
    let task = tasks.remove(0);
    Form::spawn(task, move |result| {
        let blob = spawn_result_blob(&result);
        Form::emit(blob, spawn_chain_to(tasks, terminal))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk a form's pure structure (no effects), collecting tags. Invoke
    /// continuations are fed empty results; spawn continuations a default
    /// result. Enough to assert the shapes the parser builds.
    fn shape(form: Form) -> Vec<String> {
        let mut tags = Vec::new();
        let mut stack = vec![form];
        while let Some(form) = stack.pop() {
            tags.push(form.tag().to_string());
            match form {
                Form::Seq(forms) => stack.extend(forms.into_iter().rev()),
                Form::Remember { then, .. }
                | Form::Forget { then, .. }
                | Form::Emit { then, .. } => stack.push(*then),
                Form::Invoke { then, .. } => stack.push(then(Vec::new())),
                Form::Spawn { then, .. } => stack.push(then(SpawnResult::default())),
                _ => {}
            }
        }
        tags
    }

    #[test]
    fn no_markup_yields_nil() {
        assert_eq!(parse_to_form("just prose").tag(), "nil");
    }

    #[test]
    fn memory_only_yields_seq_prefix() {
        let form = parse_to_form("<remember>a</remember><forget>b</forget>");
        assert_eq!(
            shape(form),
            vec!["seq", "remember", "nil", "forget", "nil", "nil"]
        );
    }

    #[test]
    fn remembers_come_before_forgets() {
        let form = parse_to_form("<forget>b</forget><remember>a</remember>");
        match form {
            Form::Seq(forms) => {
                assert_eq!(forms[0].tag(), "remember");
                assert_eq!(forms[1].tag(), "forget");
            }
            other => panic!("expected Seq, got {other:?}"),
        }
    }

    #[test]
    fn regular_tools_invoke_then_think() {
        let form = parse_to_form(r#"<tools><tool>Echo("hi")</tool></tools>"#);
        assert_eq!(shape(form), vec!["invoke", "think"]);
    }

    #[test]
    fn think_carries_result_blob() {
        let form = parse_to_form(r#"<tools><tool>Echo("hi")</tool></tools>"#);
        let Form::Invoke { calls, then } = form else {
            panic!("expected Invoke");
        };
        assert_eq!(calls[0].name, "Echo");
        let next = then(vec![ToolResult::ok("Echo", "hi")]);
        let Form::Think { input } = next else {
            panic!("expected Think");
        };
        assert_eq!(
            input,
            "<tool_result name=\"Echo\" status=\"success\">\nhi\n</tool_result>"
        );
    }

    #[test]
    fn complete_task_is_terminal() {
        let form = parse_to_form(r#"<tools><tool>CompleteTask("all done")</tool></tools>"#);
        let Form::Done { summary } = form else {
            panic!("expected Done");
        };
        assert_eq!(summary, "all done");
    }

    #[test]
    fn tools_before_complete_run_first() {
        let form = parse_to_form(
            r#"<tools><tool>Echo("work")</tool><tool>CompleteTask("done")</tool></tools>"#,
        );
        assert_eq!(shape(form), vec!["invoke", "done"]);
    }

    #[test]
    fn reboot_preempts_complete() {
        let form = parse_to_form(
            r#"<tools><tool>CompleteTask("x")</tool><tool>Reboot("new code")</tool></tools>"#,
        );
        let Form::Reboot { reason } = form else {
            panic!("expected Reboot");
        };
        assert_eq!(reason, "new code");
    }

    #[test]
    fn bash_spawn_is_lifted() {
        let form = parse_to_form(
            r#"<tools><tool>Bash("gloop --task \"do x\" --model m/n")</tool></tools>"#,
        );
        let Form::Spawn { task, .. } = form else {
            panic!("expected Spawn, got {form:?}");
        };
        assert_eq!(task, "do x");
    }

    #[test]
    fn quoted_gloop_mention_stays_bash() {
        let form = parse_to_form(
            r#"<tools><tool>Bash("echo \"gloop --task \\\"hi\\\"\"")</tool></tools>"#,
        );
        let Form::Invoke { calls, .. } = form else {
            panic!("expected Invoke, got {form:?}");
        };
        assert_eq!(calls[0].name, "Bash");
    }

    #[test]
    fn mixed_plain_and_spawn_chain_shape() {
        let form = parse_to_form(concat!(
            "<tools>",
            r#"<tool>Echo("a")</tool>"#,
            r#"<tool>Bash("gloop --task \"t1\"")</tool>"#,
            r#"<tool>Bash("gloop --task \"t2\"")</tool>"#,
            "</tools>",
        ));
        // Plain tools first, then each spawn emits its blob, then Think.
        assert_eq!(
            shape(form),
            vec!["invoke", "spawn", "emit", "spawn", "emit", "think"]
        );
    }

    #[test]
    fn spawn_blobs_accumulate_into_final_think() {
        let form = parse_to_form(r#"<tools><tool>Bash("gloop --task \"t\"")</tool></tools>"#);
        let Form::Spawn { then, .. } = form else {
            panic!("expected Spawn");
        };
        let next = then(SpawnResult {
            success: true,
            summary: "subtask done".into(),
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        });
        let Form::Emit { text, then } = next else {
            panic!("expected Emit");
        };
        assert!(text.contains("Subagent completed."));
        assert!(text.contains("subtask done"));
        let Form::Think { input } = *then else {
            panic!("expected Think");
        };
        assert!(input.contains("subtask done"));
    }

    #[test]
    fn memory_prefix_precedes_tool_batch() {
        let form = parse_to_form(concat!(
            r#"<tools><remember>note</remember><tool>Echo("x")</tool></tools>"#,
        ));
        assert_eq!(
            shape(form),
            vec!["seq", "remember", "nil", "invoke", "think"]
        );
    }

    #[test]
    fn counts_match_parse_response() {
        let text = concat!(
            "<remember>r1</remember>",
            r#"<tools><tool>Echo("a")</tool><forget>f1</forget><tool>Echo("b")</tool></tools>"#,
        );
        let parsed = parse_response(text);
        assert_eq!(parsed.tool_calls.len(), 2);
        assert_eq!(parsed.remembers.len(), 1);
        assert_eq!(parsed.forgets.len(), 1);

        let mut remembers = 0;
        let mut forgets = 0;
        let mut invoked = 0;
        let mut stack = vec![parse_to_form(text)];
        while let Some(form) = stack.pop() {
            match form {
                Form::Seq(forms) => stack.extend(forms),
                Form::Remember { then, .. } => {
                    remembers += 1;
                    stack.push(*then);
                }
                Form::Forget { then, .. } => {
                    forgets += 1;
                    stack.push(*then);
                }
                Form::Invoke { calls, .. } => invoked += calls.len(),
                _ => {}
            }
        }
        assert_eq!((invoked, remembers, forgets), (2, 1, 1));
    }

    #[test]
    fn complete_block_detection() {
        assert!(has_complete_tool_block("x <tools><tool>A()</tool></tools> y"));
        assert!(!has_complete_tool_block("x <tools><tool>A()</tool>"));
        assert!(!has_complete_tool_block("</tools> before <tools>"));
        assert!(has_complete_tool_block(concat!(
            "<|tool_calls_section_begin|>stuff<|tool_calls_section_end|>"
        )));
        assert!(!has_complete_tool_block("<|tool_calls_section_begin|>stuff"));
    }

    #[test]
    fn result_blob_format() {
        let blob = format_results(&[
            ToolResult::ok("Echo", "hi"),
            ToolResult::error("Bash", "exit code 1"),
        ]);
        assert_eq!(
            blob,
            "<tool_result name=\"Echo\" status=\"success\">\nhi\n</tool_result>\n\n\
             <tool_result name=\"Bash\" status=\"error\">\nexit code 1\n</tool_result>"
        );
    }
}
