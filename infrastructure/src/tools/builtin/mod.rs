//! Built-in tools
//!
//! Minimal tools that are always available so plans can run without any
//! manifest: `echo`, `read_file` and `run_command`.
//!
//! | Tool | Category | Inputs | Output |
//! |------|----------|--------|--------|
//! | `echo` | general | anything | the arguments as an object |
//! | `read_file` | workspace | `path`, `offset`, `limit` | file contents |
//! | `run_command` | workspace | `command`, `working_dir` | stdout (JSON if it parses) |

use super::command::{CommandOutput, parse_stdout, run_shell};
use super::source::StaticToolSource;
use async_trait::async_trait;
use mender_domain::{
    Tool, ToolArgs, ToolCategory, ToolDefinition, ToolError, ToolHandler, ToolInput, ToolOutput,
    ToolResponse,
};
use serde_json::Value;
use std::path::PathBuf;

/// Source id for builtin tools
pub const BUILTIN_SOURCE: &str = "builtin";

pub const ECHO: &str = "echo";
pub const READ_FILE: &str = "read_file";
pub const RUN_COMMAND: &str = "run_command";

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

/// Source over every builtin tool.
pub fn builtin_source() -> StaticToolSource {
    StaticToolSource::new(BUILTIN_SOURCE).with_tools([
        echo_tool(),
        read_file_tool(),
        run_command_tool(),
    ])
}

pub fn echo_tool() -> Tool {
    Tool::from_fn(
        ToolDefinition::new(ECHO, "Return the given arguments unchanged", ToolCategory::General)
            .with_output(ToolOutput::new("object", "The arguments"))
            .with_tag("debug")
            .with_source(BUILTIN_SOURCE),
        |args| Ok(ToolResponse::new(Value::Object(args.clone()))),
    )
}

pub fn read_file_tool() -> Tool {
    Tool::new(
        ToolDefinition::new(
            READ_FILE,
            "Read the contents of a file at the specified path",
            ToolCategory::Workspace,
        )
        .with_input(ToolInput::new("path", "Path to the file to read", true).with_type("path"))
        .with_input(
            ToolInput::new("offset", "Line number to start reading from (0-indexed)", false)
                .with_type("number"),
        )
        .with_input(
            ToolInput::new("limit", "Maximum number of lines to read", false).with_type("number"),
        )
        .with_output(ToolOutput::new("string", "File contents"))
        .with_tag("filesystem")
        .with_source(BUILTIN_SOURCE),
        ReadFile,
    )
}

pub fn run_command_tool() -> Tool {
    Tool::new(
        ToolDefinition::new(
            RUN_COMMAND,
            "Execute a shell command and return its output",
            ToolCategory::Workspace,
        )
        .with_input(ToolInput::new("command", "The command to execute", true))
        .with_input(
            ToolInput::new("working_dir", "Working directory for the command", false)
                .with_type("path"),
        )
        .with_output(ToolOutput::new("any", "Stdout, parsed as JSON when possible"))
        .with_tag("shell")
        .with_timeout_seconds(60.0)
        .with_source(BUILTIN_SOURCE),
        RunCommand,
    )
}

struct ReadFile;

#[async_trait]
impl ToolHandler for ReadFile {
    async fn invoke(&self, args: &ToolArgs) -> Result<ToolResponse, ToolError> {
        let path = require_str(args, "path")?;

        let metadata = tokio::fs::metadata(path).await.map_err(|e| io_error(path, e))?;
        if !metadata.is_file() {
            return Err(ToolError::invalid_argument(format!("'{}' is not a file", path)));
        }
        if metadata.len() > MAX_READ_SIZE {
            return Err(ToolError::invalid_argument(format!(
                "File too large ({} bytes). Maximum size is {} bytes",
                metadata.len(),
                MAX_READ_SIZE
            )));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| io_error(path, e))?;

        let offset = args.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let limit = args.get("limit").and_then(Value::as_u64).map(|l| l as usize);
        let output = if offset > 0 || limit.is_some() {
            let lines: Vec<&str> = content.lines().collect();
            let start = offset.min(lines.len());
            let end = limit.map_or(lines.len(), |l| (start + l).min(lines.len()));
            lines[start..end].join("\n")
        } else {
            content
        };

        Ok(ToolResponse::new(output))
    }
}

struct RunCommand;

#[async_trait]
impl ToolHandler for RunCommand {
    async fn invoke(&self, args: &ToolArgs) -> Result<ToolResponse, ToolError> {
        let command = require_str(args, "command")?;
        let working_dir = args
            .get("working_dir")
            .and_then(Value::as_str)
            .map(PathBuf::from);

        let CommandOutput { stdout, .. } = run_shell(command, working_dir.as_ref()).await?;
        Ok(ToolResponse::new(parse_stdout(&stdout)))
    }
}

fn require_str<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::invalid_argument(format!("'{}' must be a string", name)))
}

fn io_error(path: &str, e: std::io::Error) -> ToolError {
    match e.kind() {
        std::io::ErrorKind::NotFound => {
            ToolError::new("FileNotFoundError", format!("No such file: {}", path))
        }
        std::io::ErrorKind::PermissionDenied => {
            ToolError::new("PermissionError", format!("Permission denied: {}", path))
        }
        _ => ToolError::execution_failed(format!("Failed to read {}: {}", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_domain::{ErrorCategory, ErrorClassifier};
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_echo_returns_arguments() {
        let response = echo_tool()
            .handler
            .invoke(&args(json!({"a": 1, "b": "two"})))
            .await
            .unwrap();
        assert_eq!(response.output, json!({"a": 1, "b": "two"}));
    }

    #[tokio::test]
    async fn test_read_file_with_offset_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        std::fs::write(&path, "one\ntwo\nthree\nfour").unwrap();

        let response = read_file_tool()
            .handler
            .invoke(&args(json!({"path": path.to_str().unwrap(), "offset": 1, "limit": 2})))
            .await
            .unwrap();
        assert_eq!(response.output, json!("two\nthree"));
    }

    #[tokio::test]
    async fn test_read_missing_file_classifies_as_not_found() {
        let error = read_file_tool()
            .handler
            .invoke(&args(json!({"path": "/nonexistent/file.txt"})))
            .await
            .unwrap_err();
        assert_eq!(
            ErrorClassifier::new().classify(&error),
            ErrorCategory::ResourceNotFound
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command() {
        let response = run_command_tool()
            .handler
            .invoke(&args(json!({"command": "echo '[1, 2]'"})))
            .await
            .unwrap();
        assert_eq!(response.output, json!([1, 2]));
    }

    #[test]
    fn test_builtin_source_lists_all_tools() {
        use crate::tools::source::ToolSource;
        let names: Vec<String> = builtin_source()
            .discover()
            .into_iter()
            .map(|t| t.unwrap().definition.name)
            .collect();
        assert_eq!(names, vec![ECHO, READ_FILE, RUN_COMMAND]);
    }
}
