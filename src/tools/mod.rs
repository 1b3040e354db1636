//! Local tool execution.
//!
//! [`ToolExecutor`] is a total function over tool calls: every failure mode
//! (unknown tool, undecodable input, missing file, failed command) comes back
//! as a [`ToolResult`] with `is_error` set, never as an `Err`. The model is
//! the error handler; it sees the failure text in the next turn and decides
//! what to do about it.

mod fs;
mod search;
mod shell;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::types::{ToolCall, ToolDefinition, ToolResult};

use shell::BackgroundShell;

/// Executes tool calls against a working directory.
///
/// Owns the background-shell registry; dropping the executor drops the
/// handles (the processes themselves are not reaped).
pub struct ToolExecutor {
    workdir: PathBuf,
    shells: Mutex<HashMap<String, Arc<BackgroundShell>>>,
}

impl ToolExecutor {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            shells: Mutex::new(HashMap::new()),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run one tool call to completion and report its outcome.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, id = %call.id, "executing tool");
        match call.name.as_str() {
            "Bash" => self.execute_bash(call).await,
            "BashOutput" => self.execute_bash_output(call).await,
            "KillBash" => self.execute_kill_bash(call).await,
            "Read" => self.execute_read(call).await,
            "Write" => self.execute_write(call).await,
            "Edit" => self.execute_edit(call).await,
            "MultiEdit" => self.execute_multi_edit(call).await,
            "Glob" => self.execute_glob(call),
            "Grep" => self.execute_grep(call),
            _ => ToolResult::error(&call.id, format!("Unknown tool: {}", call.name)),
        }
    }

    /// Relative paths are taken against the working directory; absolute
    /// paths pass through untouched.
    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.workdir.join(p)
        }
    }
}

/// Decode a call's raw JSON input into the tool's input struct, turning a
/// decode failure into an error result for that call.
fn parse_input<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ToolResult> {
    serde_json::from_value(call.input.clone()).map_err(|e| {
        ToolResult::error(&call.id, format!("Invalid input for {}: {}", call.name, e))
    })
}

/// The tool catalog advertised to the model. Names and schemas are part of
/// the prompt contract; changing them changes model behavior.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "Bash".to_string(),
            description: "Execute a bash command. Use for running scripts, installing packages, or system operations.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "The bash command to execute"},
                    "description": {"type": "string", "description": "Short description of what this command does"},
                    "timeout": {"type": "number", "description": "Timeout in milliseconds (max 600000)"}
                },
                "required": ["command"]
            }),
        },
        ToolDefinition {
            name: "Read".to_string(),
            description: "Read the contents of a file. Supports offset and limit for partial reads.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to read"},
                    "offset": {"type": "number", "description": "Line number to start reading from (1-based)"},
                    "limit": {"type": "number", "description": "Number of lines to read"}
                },
                "required": ["file_path"]
            }),
        },
        ToolDefinition {
            name: "Write".to_string(),
            description: "Write content to a file, creating it if it doesn't exist.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to write"},
                    "content": {"type": "string", "description": "Content to write to the file"}
                },
                "required": ["file_path", "content"]
            }),
        },
        ToolDefinition {
            name: "Edit".to_string(),
            description: "Edit a file by replacing the first occurrence of old_string with new_string.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to edit"},
                    "old_string": {"type": "string", "description": "The string to find and replace"},
                    "new_string": {"type": "string", "description": "The replacement string"}
                },
                "required": ["file_path", "old_string", "new_string"]
            }),
        },
        ToolDefinition {
            name: "MultiEdit".to_string(),
            description: "Apply multiple edits to a single file.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to edit"},
                    "edits": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "old_string": {"type": "string"},
                                "new_string": {"type": "string"},
                                "replace_all": {"type": "boolean"}
                            },
                            "required": ["old_string", "new_string"]
                        }
                    }
                },
                "required": ["file_path", "edits"]
            }),
        },
        ToolDefinition {
            name: "Glob".to_string(),
            description: "Find files matching a glob pattern.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Glob pattern to match files (e.g. '**/*.rs')"}
                },
                "required": ["pattern"]
            }),
        },
        ToolDefinition {
            name: "Grep".to_string(),
            description: "Search for a regex pattern in files.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Pattern to search for"},
                    "path": {"type": "string", "description": "Directory or file to search in"},
                    "include": {"type": "string", "description": "File pattern to include (e.g. '*.rs')"}
                },
                "required": ["pattern"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "toolu_test".to_string(),
            name: name.to_string(),
            input,
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        let result = executor.execute(&call("Teleport", json!({}))).await;
        assert!(result.is_error);
        assert_eq!(result.content, "Unknown tool: Teleport");
        assert_eq!(result.tool_use_id, "toolu_test");
    }

    #[tokio::test]
    async fn test_undecodable_input_is_error_result() {
        let executor = ToolExecutor::new(std::env::temp_dir());
        // `edits` must be an array of objects.
        let result = executor
            .execute(&call("MultiEdit", json!({"file_path": "a", "edits": "nope"})))
            .await;
        assert!(result.is_error);
        assert!(result.content.starts_with("Invalid input for MultiEdit"));
    }

    #[test]
    fn test_resolve_relative_joins_workdir() {
        let executor = ToolExecutor::new("/work");
        assert_eq!(executor.workdir(), Path::new("/work"));
        assert_eq!(executor.resolve("src/lib.rs"), PathBuf::from("/work/src/lib.rs"));
        assert_eq!(executor.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_catalog_is_name_stable() {
        let names: Vec<String> = tool_definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            ["Bash", "Read", "Write", "Edit", "MultiEdit", "Glob", "Grep"]
        );
    }

    #[test]
    fn test_catalog_schemas_declare_required_fields() {
        for def in tool_definitions() {
            assert_eq!(def.input_schema["type"], "object");
            assert!(def.input_schema["required"].is_array(), "{}", def.name);
        }
    }
}
