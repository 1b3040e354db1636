//! File tools: `Read`, `Write`, `Edit`, and `MultiEdit`.

use serde::Deserialize;

use crate::types::{ToolCall, ToolResult};

use super::{parse_input, ToolExecutor};

#[derive(Debug, Deserialize)]
struct ReadInput {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    offset: Option<f64>,
    #[serde(default)]
    limit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WriteInput {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct EditInput {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    old_string: String,
    #[serde(default)]
    new_string: String,
}

#[derive(Debug, Deserialize)]
struct MultiEditInput {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    edits: Vec<EditOp>,
}

#[derive(Debug, Deserialize)]
struct EditOp {
    #[serde(default)]
    old_string: String,
    #[serde(default)]
    new_string: String,
    #[serde(default)]
    replace_all: bool,
}

impl ToolExecutor {
    pub(super) async fn execute_read(&self, call: &ToolCall) -> ToolResult {
        let input: ReadInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.file_path.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: file_path");
        }

        let content = match tokio::fs::read_to_string(self.resolve(&input.file_path)).await {
            Ok(content) => content,
            Err(e) => return ToolResult::error(&call.id, format!("Error: {e}")),
        };

        let lines: Vec<&str> = content.split('\n').collect();

        // offset is 1-based in the tool contract, clamped so 0 and 1 both
        // mean the first line.
        let start = input
            .offset
            .map(|v| (v as i64 - 1).max(0) as usize)
            .unwrap_or(0);
        if start >= lines.len() {
            return ToolResult::error(&call.id, "Offset beyond file length");
        }
        let end = match input.limit.filter(|v| *v > 0.0) {
            // A huge limit saturates the cast; keep the sum from wrapping.
            Some(limit) => start.saturating_add(limit as usize).min(lines.len()),
            None => lines.len(),
        };

        let mut out = String::new();
        for (i, line) in lines[start..end].iter().enumerate() {
            out.push_str(&format!("{:>5}│{}\n", start + i + 1, line));
        }
        ToolResult::ok(&call.id, out)
    }

    pub(super) async fn execute_write(&self, call: &ToolCall) -> ToolResult {
        let input: WriteInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.file_path.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: file_path");
        }

        let resolved = self.resolve(&input.file_path);
        if let Some(parent) = resolved.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolResult::error(&call.id, format!("Error creating dirs: {e}"));
            }
        }
        if let Err(e) = tokio::fs::write(&resolved, &input.content).await {
            return ToolResult::error(&call.id, format!("Error: {e}"));
        }
        ToolResult::ok(&call.id, format!("Written: {}", input.file_path))
    }

    pub(super) async fn execute_edit(&self, call: &ToolCall) -> ToolResult {
        let input: EditInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.file_path.is_empty() || input.old_string.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameters");
        }

        let resolved = self.resolve(&input.file_path);
        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(e) => return ToolResult::error(&call.id, format!("Error: {e}")),
        };

        if !content.contains(&input.old_string) {
            return ToolResult::error(&call.id, "String not found in file");
        }

        let updated = content.replacen(&input.old_string, &input.new_string, 1);
        if let Err(e) = tokio::fs::write(&resolved, updated).await {
            return ToolResult::error(&call.id, format!("Error: {e}"));
        }
        ToolResult::ok(&call.id, format!("Edited: {}", input.file_path))
    }

    /// Edits are applied in order against an in-memory copy; the file is
    /// written back only after every edit has validated and applied, so a
    /// failure partway through leaves the file untouched.
    pub(super) async fn execute_multi_edit(&self, call: &ToolCall) -> ToolResult {
        let input: MultiEditInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.file_path.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: file_path");
        }
        if input.edits.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: edits");
        }

        let resolved = self.resolve(&input.file_path);
        let mut text = match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(e) => return ToolResult::error(&call.id, format!("Error: {e}")),
        };

        for (i, edit) in input.edits.iter().enumerate() {
            if edit.old_string.is_empty() {
                return ToolResult::error(&call.id, format!("Empty old_string at edit {i}"));
            }
            if !text.contains(&edit.old_string) {
                return ToolResult::error(&call.id, format!("String not found at edit {i}"));
            }
            text = if edit.replace_all {
                text.replace(&edit.old_string, &edit.new_string)
            } else {
                text.replacen(&edit.old_string, &edit.new_string, 1)
            };
        }

        if let Err(e) = tokio::fs::write(&resolved, text).await {
            return ToolResult::error(&call.id, format!("Error: {e}"));
        }
        ToolResult::ok(
            &call.id,
            format!("Applied {} edits to {}", input.edits.len(), input.file_path),
        )
    }
}
