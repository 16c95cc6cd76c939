//! Shell command execution for tools.
//!
//! [`CommandToolHandler`] turns a command template with `{param_name}`
//! placeholders into a tool. It backs manifest-declared tools and the
//! builtin `run_command`.
//!
//! # Security
//!
//! All argument values are shell-escaped before substitution to prevent
//! command injection: single-quote wrapping on Unix, double-quote wrapping
//! with character escaping on Windows.
//!
//! # Failure mapping
//!
//! A non-zero exit becomes a [`ToolError`] of kind `CommandError` whose
//! message carries the exit code and stderr, so error classification sees
//! what the process actually printed (`No module named 'x'`,
//! `Connection refused`, ...).
//!
//! # Output
//!
//! Stdout that parses as JSON is returned as that value; anything else is
//! returned as a trimmed string.

use async_trait::async_trait;
use mender_domain::{ToolArgs, ToolError, ToolHandler, ToolResponse};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Maximum captured size per stream (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Error kind reported for non-zero exits
pub const COMMAND_ERROR_KIND: &str = "CommandError";

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Tool handler running a shell command template.
#[derive(Debug, Clone)]
pub struct CommandToolHandler {
    template: String,
    working_dir: Option<PathBuf>,
}

impl CommandToolHandler {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            working_dir: None,
        }
    }

    /// Set the working directory for command execution.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

#[async_trait]
impl ToolHandler for CommandToolHandler {
    async fn invoke(&self, args: &ToolArgs) -> Result<ToolResponse, ToolError> {
        let command = render_template(&self.template, args);
        let output = run_shell(&command, self.working_dir.as_ref()).await?;
        Ok(ToolResponse::new(parse_stdout(&output.stdout)))
    }
}

/// Build the final command string by substituting arguments.
///
/// `{param_name}` placeholders are replaced with shell-escaped argument
/// values. Placeholders without an argument are dropped; braces that do not
/// form a placeholder are kept verbatim.
pub fn render_template(template: &str, args: &ToolArgs) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            result.push_str(&rest[open..]);
            return result;
        };

        let name = &after[..close];
        let is_placeholder =
            !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if is_placeholder {
            if let Some(value) = args.get(name) {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                result.push_str(&shell_escape(&text));
            }
        } else {
            result.push('{');
            result.push_str(name);
            result.push('}');
        }
        rest = &after[close + 1..];
    }

    result.push_str(rest);
    result
}

/// Run `command` through the platform shell.
///
/// The child is killed when the returned future is dropped, so an executor
/// timeout also stops the process.
pub async fn run_shell(
    command: &str,
    working_dir: Option<&PathBuf>,
) -> Result<CommandOutput, ToolError> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    };

    if let Some(dir) = working_dir {
        if !dir.is_dir() {
            return Err(ToolError::new(
                "NotFoundError",
                format!("Working directory does not exist: {}", dir.display()),
            ));
        }
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command, "Spawning shell command");
    let output = cmd.output().await.map_err(|e| {
        ToolError::execution_failed(format!("Failed to execute command: {}", e))
    })?;

    let result = CommandOutput {
        stdout: capture(&output.stdout),
        stderr: capture(&output.stderr),
        exit_code: output.status.code(),
    };

    if output.status.success() {
        return Ok(result);
    }

    let detail = if result.stderr.trim().is_empty() {
        result.stdout.trim()
    } else {
        result.stderr.trim()
    };
    let code = result
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    Err(ToolError::new(
        COMMAND_ERROR_KIND,
        format!("exit {}: {}", code, detail),
    ))
}

fn capture(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_OUTPUT_SIZE {
        return text.into_owned();
    }
    let mut end = MAX_OUTPUT_SIZE;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... (output truncated)", &text[..end])
}

pub(crate) fn parse_stdout(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

/// Escape a string for safe shell substitution.
///
/// Uses OS-appropriate escaping:
/// - **Unix**: Single-quote wrapping (`hello 'world'` → `'hello '\''world'\'''`)
/// - **Windows**: Double-quote wrapping with `"` → `\"`, `%` → `%%`, `!` → `^!`
pub fn shell_escape(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '/')
    {
        return s.to_string();
    }

    if cfg!(target_os = "windows") {
        shell_escape_windows(s)
    } else {
        shell_escape_unix(s)
    }
}

fn shell_escape_unix(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 4);
    escaped.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

fn shell_escape_windows(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 4);
    escaped.push('"');
    for ch in s.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '%' => escaped.push_str("%%"),
            '!' => escaped.push_str("^!"),
            _ => escaped.push(ch),
        }
    }
    escaped.push('"');
    escaped
}
