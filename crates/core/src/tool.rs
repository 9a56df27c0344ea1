//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools take *positional* text arguments: the parser extracts an ordered
//! list of raw strings from the reply markup, and the invoke step zips
//! them against the tool's declared argument names. Excess raw arguments
//! are ignored; missing ones are simply absent from the map.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::ToolError;

/// A declared tool argument: name and what it means, in call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolArg {
    pub name: String,
    pub description: String,
}

impl ToolArg {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Argument mapping handed to a tool: declared name → raw text value.
pub type ToolArgs = HashMap<String, String>;

/// A parsed request to execute a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to execute
    pub name: String,

    /// Positional argument text, in call order
    pub raw_args: Vec<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, raw_args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            raw_args,
        }
    }

    /// First argument, or empty. Several call sites treat the first
    /// positional argument as the payload (Bash command, task text).
    pub fn first_arg(&self) -> &str {
        self.raw_args.first().map(String::as_str).unwrap_or("")
    }
}

/// The outcome of one tool execution, fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub output: String,
    pub success: bool,
}

impl ToolResult {
    pub fn ok(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            success: true,
        }
    }

    pub fn error(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            success: false,
        }
    }
}

/// The core Tool trait.
///
/// Each tool (Bash, ReadFile, WriteFile, installed command tools, ...)
/// implements this trait and registers in the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "Bash", "ReadFile").
    fn name(&self) -> &str;

    /// A description of what this tool does (rendered into the system prompt).
    fn description(&self) -> &str;

    /// Declared arguments, in positional order.
    fn arguments(&self) -> Vec<ToolArg>;

    /// Execute the tool with the zipped argument mapping.
    async fn execute(&self, args: &ToolArgs) -> std::result::Result<String, ToolError>;

    /// If this call is dangerous, return a description of the danger; the
    /// invoke step will ask the user before executing. The built-in
    /// destructive-command gate runs before this hook.
    fn ask_permission(&self, _args: &ToolArgs) -> Option<String> {
        None
    }
}

/// A registry of available tools.
///
/// Cloning a registry is cheap (the tools are `Arc`s); the invoke step
/// clones a snapshot per batch so a concurrent `Reload` cannot change the
/// tool set mid-batch. Installed (manifest-backed) tools are tracked
/// separately so `Reload` can swap just that subset.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
    installed: HashSet<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built-in tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Register a manifest-installed tool. Replaces any existing entry.
    pub fn register_installed(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.installed.insert(name.clone());
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Swap the installed subset for a new set, leaving built-ins alone.
    pub fn replace_installed(&mut self, tools: Vec<Arc<dyn Tool>>) {
        for name in std::mem::take(&mut self.installed) {
            self.tools.remove(&name);
            self.order.retain(|n| n != &name);
        }
        for tool in tools {
            self.register_installed(tool);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> + '_ {
        self.order.iter().filter_map(|n| self.tools.get(n))
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
