//! Echo tool — returns its input. Handy for wiring checks and demos.

use async_trait::async_trait;
use gloop_core::{Tool, ToolArg, ToolArgs, ToolError};

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "Echo"
    }

    fn description(&self) -> &str {
        "Echo the given text back unchanged."
    }

    fn arguments(&self) -> Vec<ToolArg> {
        vec![ToolArg::new("text", "The text to echo")]
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        Ok(args.get("text").cloned().unwrap_or_default())
    }
}
