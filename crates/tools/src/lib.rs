//! # gloop Tools
//!
//! Built-in tools (Bash, ReadFile, WriteFile, Echo, Fetch), TOML-manifest
//! installed tools, and the Reload mechanism that swaps the installed
//! subset of the registry without touching built-ins.

use std::path::Path;
use std::sync::{Arc, RwLock};

use gloop_core::ToolRegistry;

pub mod bash;
pub mod echo;
pub mod fetch;
pub mod files;
pub mod manifest;

pub use bash::BashTool;
pub use echo::EchoTool;
pub use fetch::FetchTool;
pub use files::{ReadFileTool, WriteFileTool};
pub use manifest::{install_manifest, load_manifests, CommandTool, ReloadTool, ToolManifest};

/// The built-in tool set.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(BashTool));
    registry.register(Arc::new(ReadFileTool));
    registry.register(Arc::new(WriteFileTool));
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(FetchTool::new()));
    registry
}

/// Wire a registry for runtime use: register the Reload tool against the
/// shared handle and load whatever manifests are already installed.
pub fn attach_installed(registry: &Arc<RwLock<ToolRegistry>>, tools_dir: &Path) {
    let mut guard = registry.write().unwrap();
    guard.register(Arc::new(ReloadTool::new(
        Arc::clone(registry),
        tools_dir.to_path_buf(),
    )));
    guard.replace_installed(load_manifests(tools_dir));
}
