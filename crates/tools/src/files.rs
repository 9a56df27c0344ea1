//! File tools — read and write files on the local filesystem.

use std::path::Path;

use async_trait::async_trait;
use gloop_core::{Tool, ToolArg, ToolArgs, ToolError};
use tracing::debug;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "ReadFile"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path."
    }

    fn arguments(&self) -> Vec<ToolArg> {
        vec![ToolArg::new("path", "The file path to read")]
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let path = require(args, "path")?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "ReadFile".into(),
                reason: format!("{path}: {e}"),
            })
    }
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "WriteFile"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories as needed."
    }

    fn arguments(&self) -> Vec<ToolArg> {
        vec![
            ToolArg::new("path", "The file path to write"),
            ToolArg::new("content", "The full file content"),
        ]
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let path = require(args, "path")?;
        let content = args.get("content").cloned().unwrap_or_default();

        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ToolError::ExecutionFailed {
                        tool_name: "WriteFile".into(),
                        reason: format!("{path}: {e}"),
                    }
                })?;
            }
        }

        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "WriteFile".into(),
                reason: format!("{path}: {e}"),
            })?;
        debug!(path = %path, bytes = content.len(), "file written");
        Ok(format!("Wrote {} bytes to {path}", content.len()))
    }

    fn ask_permission(&self, args: &ToolArgs) -> Option<String> {
        let path = args.get("path")?;
        if is_outside_working_dir(path) {
            Some(format!("Write to {path} (outside the working directory)"))
        } else {
            None
        }
    }
}

fn require(args: &ToolArgs, name: &str) -> Result<String, ToolError> {
    args.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{name}' argument")))
}

fn is_outside_working_dir(path: &str) -> bool {
    let p = Path::new(path);
    if p.is_absolute() {
        match std::env::current_dir() {
            Ok(cwd) => !p.starts_with(&cwd),
            Err(_) => true,
        }
    } else {
        p.components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(pairs: &[(&str, &str)]) -> ToolArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let path_str = path.to_string_lossy().to_string();

        let out = WriteFileTool
            .execute(&args(&[("path", &path_str), ("content", "hello file")]))
            .await
            .unwrap();
        assert!(out.contains("10 bytes"));

        let content = ReadFileTool
            .execute(&args(&[("path", &path_str)]))
            .await
            .unwrap();
        assert_eq!(content, "hello file");
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deep/nested/file.txt");
        WriteFileTool
            .execute(&args(&[
                ("path", &path.to_string_lossy()),
                ("content", "x"),
            ]))
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn read_missing_file_fails() {
        let err = ReadFileTool
            .execute(&args(&[("path", "/definitely/not/here.txt")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[test]
    fn relative_paths_inside_tree_need_no_permission() {
        assert!(WriteFileTool
            .ask_permission(&args(&[("path", "src/main.rs"), ("content", "x")]))
            .is_none());
    }

    #[test]
    fn parent_escapes_ask_permission() {
        assert!(WriteFileTool
            .ask_permission(&args(&[("path", "../outside.txt"), ("content", "x")]))
            .is_some());
    }

    #[test]
    fn absolute_paths_outside_cwd_ask_permission() {
        assert!(WriteFileTool
            .ask_permission(&args(&[("path", "/etc/passwd"), ("content", "x")]))
            .is_some());
    }
}
