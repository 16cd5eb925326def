//! Process tools — `shell_exec` and `python_exec`.
//!
//! Both run a child process with a timeout and report output the same way:
//! stdout, then `[stderr]` and `[exit code: N]` sections when relevant.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use starbot_core::utils::take_chars;

use super::base::{require_string, Tool, ToolOutput};

/// Maximum output length before truncation (characters).
const MAX_OUTPUT_LEN: usize = 10_000;

// ─────────────────────────────────────────────
// Shared runner
// ─────────────────────────────────────────────

/// Run `command`, optionally feeding `stdin`, and format its output.
async fn run_process(
    mut command: Command,
    stdin: Option<&str>,
    timeout: Duration,
) -> anyhow::Result<String> {
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().context("Failed to spawn process")?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .await
            .context("Failed to write to process stdin")?;
        // closing stdin lets the interpreter start
        drop(pipe);
    }

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.context("Process failed")?,
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "process timed out");
            anyhow::bail!("Command timed out ({}s)", timeout.as_secs());
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output.status.code().unwrap_or(-1);

    let mut combined = stdout.into_owned();
    if !stderr.is_empty() {
        combined.push_str(&format!("\n[stderr]\n{stderr}"));
    }
    if code != 0 {
        combined.push_str(&format!("\n[exit code: {code}]"));
    }
    if combined.is_empty() {
        return Ok("(no output)".to_string());
    }

    let total = combined.chars().count();
    if total > MAX_OUTPUT_LEN {
        let mut truncated = take_chars(&combined, MAX_OUTPUT_LEN).to_string();
        truncated.push_str(&format!(
            "\n... (truncated, {} more chars)",
            total - MAX_OUTPUT_LEN
        ));
        return Ok(truncated);
    }
    Ok(combined)
}

// ─────────────────────────────────────────────
// ShellExecTool
// ─────────────────────────────────────────────

/// Execute shell commands through `sh -c` (or `cmd /C` on Windows).
pub struct ShellExecTool {
    timeout: Duration,
}

impl ShellExecTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl Tool for ShellExecTool {
    fn name(&self) -> &str {
        "shell_exec"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return output."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Shell command to execute" }
            },
            "required": ["command"]
        })
    }

    fn dangerous(&self) -> bool {
        true
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
        let command = require_string(&params, "command")?;
        info!(command = %command, "executing shell command");

        let cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command.as_str()]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command.as_str()]);
            c
        };

        run_process(cmd, None, self.timeout).await.map(ToolOutput::Text)
    }
}

// ─────────────────────────────────────────────
// PythonExecTool
// ─────────────────────────────────────────────

/// Execute a Python snippet by piping it into the interpreter.
pub struct PythonExecTool {
    interpreter: String,
    timeout: Duration,
}

impl PythonExecTool {
    pub fn new(timeout_secs: u64) -> Self {
        let interpreter = if cfg!(target_os = "windows") {
            "python"
        } else {
            "python3"
        };
        Self::with_interpreter(interpreter, timeout_secs)
    }

    pub fn with_interpreter(interpreter: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl Tool for PythonExecTool {
    fn name(&self) -> &str {
        "python_exec"
    }

    fn description(&self) -> &str {
        "Execute Python code and return stdout/stderr output."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": { "type": "string", "description": "Python code to execute" }
            },
            "required": ["code"]
        })
    }

    fn dangerous(&self) -> bool {
        true
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
        let code = require_string(&params, "code")?;
        info!(interpreter = %self.interpreter, bytes = code.len(), "executing python");

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-");
        run_process(cmd, Some(&code), self.timeout)
            .await
            .map(ToolOutput::Text)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
