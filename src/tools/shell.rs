//! Shell command tools: foreground `Bash`, backgrounded `Bash`, and the
//! `BashOutput`/`KillBash` pair that manages backgrounded processes.

use std::process::Stdio;
use std::sync::Arc;

use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::types::{ToolCall, ToolResult};

use super::{parse_input, ToolExecutor};

const MAX_TIMEOUT_MS: f64 = 600_000.0;
const DEFAULT_TIMEOUT_MS: f64 = 120_000.0;

#[derive(Debug, Deserialize)]
struct BashInput {
    #[serde(default)]
    command: String,
    #[serde(default)]
    timeout: Option<f64>,
    #[serde(default)]
    run_in_background: bool,
}

#[derive(Debug, Deserialize)]
struct BashOutputInput {
    #[serde(default)]
    bash_id: String,
}

#[derive(Debug, Deserialize)]
struct KillBashInput {
    #[serde(default)]
    shell_id: String,
}

/// A running backgrounded process. Output from both pipes is merged into a
/// single buffer that `BashOutput` drains; the child handle is kept so
/// `KillBash` can terminate it.
pub(crate) struct BackgroundShell {
    child: Mutex<Child>,
    output: Mutex<String>,
}

impl BackgroundShell {
    /// Take everything buffered since the last drain, leaving the buffer
    /// empty. Readers appending concurrently line up behind the same lock.
    pub(crate) async fn drain_output(&self) -> String {
        let mut buf = self.output.lock().await;
        std::mem::take(&mut *buf)
    }

    pub(crate) async fn kill(&self) {
        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            tracing::debug!(error = %e, "kill failed, process likely already exited");
        }
    }
}

/// Copy one pipe into the shell's buffer until EOF. Runs detached; the task
/// ends when the process closes the pipe.
fn spawn_pipe_reader<R>(shell: Arc<BackgroundShell>, mut pipe: R)
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    shell.output.lock().await.push_str(&chunk);
                }
            }
        }
    });
}

impl ToolExecutor {
    pub(super) async fn execute_bash(&self, call: &ToolCall) -> ToolResult {
        let input: BashInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.command.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: command");
        }

        if input.run_in_background {
            return self.execute_bash_background(call, &input.command).await;
        }

        // The timeout hint is validated and clamped but not yet enforced as
        // a hard kill. TODO: kill the process group once the clamped
        // deadline passes.
        let _timeout_ms = input
            .timeout
            .filter(|t| *t > 0.0)
            .map(|t| t.min(MAX_TIMEOUT_MS))
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        let output = match Command::new("bash")
            .arg("-c")
            .arg(&input.command)
            .current_dir(&self.workdir)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return ToolResult::error(&call.id, format!("Failed to run command: {e}")),
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            ToolResult::ok(&call.id, text)
        } else {
            if text.is_empty() {
                text = format!("command failed: {}", output.status);
            }
            ToolResult::error(&call.id, text)
        }
    }

    async fn execute_bash_background(&self, call: &ToolCall, command: &str) -> ToolResult {
        let mut child = match Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return ToolResult::error(&call.id, format!("Failed to start: {e}")),
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let shell = Arc::new(BackgroundShell {
            child: Mutex::new(child),
            output: Mutex::new(String::new()),
        });
        if let Some(pipe) = stdout {
            spawn_pipe_reader(Arc::clone(&shell), pipe);
        }
        if let Some(pipe) = stderr {
            spawn_pipe_reader(Arc::clone(&shell), pipe);
        }

        // The handle is keyed by the tool call id; that id is what the model
        // passes back to BashOutput and KillBash.
        let bash_id = call.id.clone();
        self.shells.lock().await.insert(bash_id.clone(), shell);
        tracing::debug!(%bash_id, "background process started");

        ToolResult::ok(
            &call.id,
            format!("Background process started (id: {bash_id})"),
        )
    }

    pub(super) async fn execute_bash_output(&self, call: &ToolCall) -> ToolResult {
        let input: BashOutputInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.bash_id.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: bash_id");
        }

        let shell = match self.shells.lock().await.get(&input.bash_id) {
            Some(shell) => Arc::clone(shell),
            None => {
                return ToolResult::error(
                    &call.id,
                    format!("No background shell: {}", input.bash_id),
                )
            }
        };

        let output = shell.drain_output().await;
        if output.is_empty() {
            ToolResult::ok(&call.id, "(no new output)")
        } else {
            ToolResult::ok(&call.id, output)
        }
    }

    pub(super) async fn execute_kill_bash(&self, call: &ToolCall) -> ToolResult {
        let input: KillBashInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.shell_id.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: shell_id");
        }

        let shell = match self.shells.lock().await.remove(&input.shell_id) {
            Some(shell) => shell,
            None => {
                return ToolResult::error(
                    &call.id,
                    format!("No background shell: {}", input.shell_id),
                )
            }
        };

        shell.kill().await;
        ToolResult::ok(&call.id, format!("Shell {} terminated", input.shell_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    #[tokio::test]
    async fn test_bash_captures_stdout() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        let result = executor
            .execute(&call("t1", "Bash", json!({"command": "echo hi"})))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.content, "hi\n");
    }

    #[tokio::test]
    async fn test_bash_merges_stderr() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        let result = executor
            .execute(&call("t1", "Bash", json!({"command": "echo oops >&2"})))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.content, "oops\n");
    }

    #[tokio::test]
    async fn test_bash_nonzero_exit_without_output_reports_status() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        let result = executor
            .execute(&call("t1", "Bash", json!({"command": "exit 3"})))
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("3"), "got: {}", result.content);
    }

    #[tokio::test]
    async fn test_bash_nonzero_exit_keeps_captured_output() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        let result = executor
            .execute(&call(
                "t1",
                "Bash",
                json!({"command": "echo partial; exit 1"}),
            ))
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "partial\n");
    }

    #[tokio::test]
    async fn test_bash_missing_command() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        let result = executor.execute(&call("t1", "Bash", json!({}))).await;
        assert!(result.is_error);
        assert_eq!(result.content, "Missing required parameter: command");
    }

    #[tokio::test]
    async fn test_background_shell_lifecycle() {
        let executor = ToolExecutor::new(std::env::temp_dir());

        let started = executor
            .execute(&call(
                "bg1",
                "Bash",
                json!({"command": "echo done", "run_in_background": true}),
            ))
            .await;
        assert!(!started.is_error);
        assert_eq!(started.content, "Background process started (id: bg1)");

        // Poll until the reader task has flushed the output.
        let mut drained = String::new();
        for _ in 0..50 {
            let result = executor
                .execute(&call("t2", "BashOutput", json!({"bash_id": "bg1"})))
                .await;
            assert!(!result.is_error);
            if result.content != "(no new output)" {
                drained = result.content;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(drained.contains("done"), "got: {drained}");

        // The buffer was cleared by the first successful drain.
        let again = executor
            .execute(&call("t3", "BashOutput", json!({"bash_id": "bg1"})))
            .await;
        assert_eq!(again.content, "(no new output)");

        let killed = executor
            .execute(&call("t4", "KillBash", json!({"shell_id": "bg1"})))
            .await;
        assert!(!killed.is_error);
        assert_eq!(killed.content, "Shell bg1 terminated");

        // Handle is gone after the kill.
        let missing = executor
            .execute(&call("t5", "BashOutput", json!({"bash_id": "bg1"})))
            .await;
        assert!(missing.is_error);
        assert_eq!(missing.content, "No background shell: bg1");
    }

    #[tokio::test]
    async fn test_bash_output_unknown_handle() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        let result = executor
            .execute(&call("t1", "BashOutput", json!({"bash_id": "nope"})))
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "No background shell: nope");
    }

    #[tokio::test]
    async fn test_kill_bash_unknown_handle() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        let result = executor
            .execute(&call("t1", "KillBash", json!({"shell_id": "nope"})))
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "No background shell: nope");
    }
}
