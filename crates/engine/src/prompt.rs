//! System prompt assembly.
//!
//! The prompt is rebuilt from the current registry snapshot plus the
//! memory notes whenever `Refresh` runs — after `Reload`, after a tool
//! install, and at startup.

use gloop_core::ToolRegistry;

/// Build the full system prompt from the tool registry and memory notes.
pub fn build_system_prompt(registry: &ToolRegistry, memory_notes: &str) -> String {
    let mut prompt = String::from(
        "You are gloop, a terminal-resident agent. You get things done by \
calling tools and you keep working until the task is complete.\n\n\
## Calling tools\n\n\
Invoke tools with this exact markup, one batch per reply:\n\n\
<tools>\n<tool>ToolName(\"arg1\", \"arg2\")</tool>\n</tools>\n\n\
Arguments are positional. Quote them with double quotes; use \\n for \
newlines inside double quotes. You may put several <tool> elements in one \
batch; they run in order and you receive every result before your next \
turn.\n\n\
## Memory\n\n\
Write <remember>fact</remember> to keep a note across sessions and \
<forget>fact</forget> to drop one. Memory operations run before any tools \
in the same reply.\n\n",
    );

    prompt.push_str("## Tools\n\n");
    prompt.push_str(&render_tool_listing(registry));

    prompt.push_str(
        "\n## Control\n\n\
These pseudo-tools are always available:\n\
- CompleteTask(summary) — the task is done; summary is shown to the user\n\
- AskUser(question) — ask the user a free-form question\n\
- ManageContext(instructions) — prune stale messages from your context\n\
- Reload() — re-read installed tool manifests after you change them\n\
- Reboot(reason) — restart the process to pick up fresh code\n\n\
Call CompleteTask when you are finished. If a reply needs no tools, just \
answer in prose.\n",
    );

    if !memory_notes.trim().is_empty() {
        prompt.push_str("\n## Notes from memory\n\n");
        prompt.push_str(memory_notes.trim());
        prompt.push('\n');
    }

    prompt
}

/// One line per registered tool: signature and description, then argument
/// descriptions indented beneath.
pub fn render_tool_listing(registry: &ToolRegistry) -> String {
    if registry.is_empty() {
        return "(no tools registered)\n".into();
    }
    let mut listing = String::new();
    for tool in registry.iter() {
        let args = tool.arguments();
        let signature = args
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        listing.push_str(&format!(
            "- {}({}) — {}\n",
            tool.name(),
            signature,
            tool.description()
        ));
        for arg in &args {
            if !arg.description.is_empty() {
                listing.push_str(&format!("    {}: {}\n", arg.name, arg.description));
            }
        }
    }
    listing
}
