//! Installed tools — TOML manifests describing command-backed tools.
//!
//! A manifest names the tool, declares its positional arguments, and
//! gives a shell command template with `{arg}` placeholders:
//!
//! ```toml
//! name = "Deploy"
//! description = "Deploy the site to a target"
//! command = "make deploy TARGET={target}"
//!
//! [[args]]
//! name = "target"
//! description = "Deploy target (staging or prod)"
//! ```
//!
//! `/install <path>` validates a manifest and copies it into the tools
//! directory; the `Reload` tool re-reads every manifest there and swaps
//! the installed subset of the registry atomically. Built-ins are never
//! touched by a reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use gloop_core::{Tool, ToolArg, ToolArgs, ToolError, ToolRegistry};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// A parsed tool manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolManifest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub args: Vec<ToolArg>,
    /// Shell command template with `{arg}` placeholders.
    pub command: String,
}

impl ToolManifest {
    pub fn parse(source: &str) -> Result<Self, ToolError> {
        let manifest: ToolManifest = toml::from_str(source)
            .map_err(|e| ToolError::InvalidArguments(format!("bad tool manifest: {e}")))?;
        if manifest.name.is_empty() || manifest.command.is_empty() {
            return Err(ToolError::InvalidArguments(
                "tool manifest needs both a name and a command".into(),
            ));
        }
        Ok(manifest)
    }
}

/// A tool backed by a manifest's shell command.
pub struct CommandTool {
    manifest: ToolManifest,
}

impl CommandTool {
    pub fn new(manifest: ToolManifest) -> Self {
        Self { manifest }
    }

    /// Substitute `{arg}` placeholders, single-quoting each value.
    fn render_command(&self, args: &ToolArgs) -> String {
        let mut command = self.manifest.command.clone();
        for spec in &self.manifest.args {
            let value = args.get(&spec.name).map(String::as_str).unwrap_or("");
            command = command.replace(&format!("{{{}}}", spec.name), &shell_quote(value));
        }
        command
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[async_trait]
impl Tool for CommandTool {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn description(&self) -> &str {
        &self.manifest.description
    }

    fn arguments(&self) -> Vec<ToolArg> {
        self.manifest.args.clone()
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let command = self.render_command(args);
        debug!(tool = %self.manifest.name, command = %command, "running installed tool");

        let output = Command::new("sh")
            .args(["-c", &command])
            .output()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.manifest.name.clone(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if output.status.success() {
            Ok(stdout.trim().to_string())
        } else {
            Err(ToolError::ExecutionFailed {
                tool_name: self.manifest.name.clone(),
                reason: format!(
                    "[exit code: {}]\n{stdout}\n{stderr}",
                    output.status.code().unwrap_or(-1)
                )
                .trim()
                .to_string(),
            })
        }
    }
}

/// Load every `*.toml` manifest in `dir` as a tool. Unparseable files are
/// skipped with a warning.
pub fn load_manifests(dir: &Path) -> Vec<Arc<dyn Tool>> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    for path in paths {
        let Ok(source) = std::fs::read_to_string(&path) else {
            continue;
        };
        match ToolManifest::parse(&source) {
            Ok(manifest) => {
                debug!(tool = %manifest.name, path = %path.display(), "manifest loaded");
                tools.push(Arc::new(CommandTool::new(manifest)));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping bad manifest"),
        }
    }
    tools
}

/// Validate a manifest file and copy it into the tools directory. Returns
/// a status line for the UI.
pub fn install_manifest(source_path: &str, tools_dir: &Path) -> Result<String, ToolError> {
    let source =
        std::fs::read_to_string(source_path).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "install".into(),
            reason: format!("{source_path}: {e}"),
        })?;
    let manifest = ToolManifest::parse(&source)?;

    std::fs::create_dir_all(tools_dir).map_err(|e| ToolError::ExecutionFailed {
        tool_name: "install".into(),
        reason: e.to_string(),
    })?;
    let dest = tools_dir.join(format!("{}.toml", manifest.name));
    std::fs::write(&dest, &source).map_err(|e| ToolError::ExecutionFailed {
        tool_name: "install".into(),
        reason: e.to_string(),
    })?;
    info!(tool = %manifest.name, dest = %dest.display(), "tool installed");
    Ok(format!(
        "Installed {} — run Reload() to pick it up",
        manifest.name
    ))
}

/// The Reload tool: re-read every manifest and swap the installed subset
/// of the registry.
pub struct ReloadTool {
    registry: Arc<RwLock<ToolRegistry>>,
    tools_dir: PathBuf,
}

impl ReloadTool {
    pub fn new(registry: Arc<RwLock<ToolRegistry>>, tools_dir: PathBuf) -> Self {
        Self {
            registry,
            tools_dir,
        }
    }
}

#[async_trait]
impl Tool for ReloadTool {
    fn name(&self) -> &str {
        "Reload"
    }

    fn description(&self) -> &str {
        "Re-read installed tool manifests and refresh the tool set."
    }

    fn arguments(&self) -> Vec<ToolArg> {
        vec![]
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String, ToolError> {
        let tools = load_manifests(&self.tools_dir);
        let count = tools.len();
        self.registry.write().unwrap().replace_installed(tools);
        info!(count, "installed tools reloaded");
        Ok(format!("Reloaded {count} installed tools"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"
name = "Greet"
description = "Print a greeting"
command = "echo hello {who}"

[[args]]
name = "who"
description = "Who to greet"
"#;

    #[test]
    fn parse_valid_manifest() {
        let manifest = ToolManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.name, "Greet");
        assert_eq!(manifest.args.len(), 1);
        assert_eq!(manifest.args[0].name, "who");
    }

    #[test]
    fn parse_rejects_missing_fields() {
        assert!(ToolManifest::parse("description = \"x\"").is_err());
        assert!(ToolManifest::parse("name = \"X\"\ndescription = \"\"\ncommand = \"\"").is_err());
    }

    #[test]
    fn render_quotes_values() {
        let tool = CommandTool::new(ToolManifest::parse(MANIFEST).unwrap());
        let mut args = ToolArgs::new();
        args.insert("who".into(), "the; world".into());
        assert_eq!(tool.render_command(&args), "echo hello 'the; world'");
    }

    #[test]
    fn render_escapes_single_quotes() {
        let tool = CommandTool::new(ToolManifest::parse(MANIFEST).unwrap());
        let mut args = ToolArgs::new();
        args.insert("who".into(), "o'brien".into());
        assert_eq!(tool.render_command(&args), r"echo hello 'o'\''brien'");
    }

    #[tokio::test]
    async fn command_tool_executes() {
        let tool = CommandTool::new(ToolManifest::parse(MANIFEST).unwrap());
        let mut args = ToolArgs::new();
        args.insert("who".into(), "world".into());
        assert_eq!(tool.execute(&args).await.unwrap(), "hello world");
    }

    #[test]
    fn install_then_load_roundtrip() {
        let dir = tempdir().unwrap();
        let source_path = dir.path().join("greet.toml");
        std::fs::write(&source_path, MANIFEST).unwrap();
        let tools_dir = dir.path().join("tools");

        let status =
            install_manifest(&source_path.to_string_lossy(), &tools_dir).unwrap();
        assert!(status.contains("Installed Greet"));

        let tools = load_manifests(&tools_dir);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "Greet");
    }

    #[test]
    fn load_skips_bad_manifests() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bad.toml"), "not [ valid").unwrap();
        std::fs::write(dir.path().join("good.toml"), MANIFEST).unwrap();
        let tools = load_manifests(dir.path());
        assert_eq!(tools.len(), 1);
    }

    #[tokio::test]
    async fn reload_swaps_installed_subset() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(RwLock::new(ToolRegistry::new()));
        registry
            .write()
            .unwrap()
            .register(Arc::new(crate::echo::EchoTool));

        std::fs::write(dir.path().join("greet.toml"), MANIFEST).unwrap();
        let reload = ReloadTool::new(Arc::clone(&registry), dir.path().to_path_buf());
        let out = reload.execute(&ToolArgs::new()).await.unwrap();
        assert_eq!(out, "Reloaded 1 installed tools");

        {
            let snapshot = registry.read().unwrap();
            assert!(snapshot.get("Echo").is_some());
            assert!(snapshot.get("Greet").is_some());
        }

        // Remove the manifest; reload drops the tool but keeps built-ins.
        std::fs::remove_file(dir.path().join("greet.toml")).unwrap();
        reload.execute(&ToolArgs::new()).await.unwrap();
        let snapshot = registry.read().unwrap();
        assert!(snapshot.get("Echo").is_some());
        assert!(snapshot.get("Greet").is_none());
    }
}
