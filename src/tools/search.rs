//! Search tools: `Glob` (filename patterns) and `Grep` (content regex).

use std::path::Path;

use serde::Deserialize;

use crate::types::{ToolCall, ToolResult};

use super::{parse_input, ToolExecutor};

#[derive(Debug, Deserialize)]
struct GlobInput {
    #[serde(default)]
    pattern: String,
}

#[derive(Debug, Deserialize)]
struct GrepInput {
    #[serde(default)]
    pattern: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    include: Option<String>,
}

impl ToolExecutor {
    pub(super) fn execute_glob(&self, call: &ToolCall) -> ToolResult {
        let input: GlobInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.pattern.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: pattern");
        }

        let resolved = self.resolve(&input.pattern);
        let paths = match glob::glob(&resolved.to_string_lossy()) {
            Ok(paths) => paths,
            Err(e) => return ToolResult::error(&call.id, format!("Error: {e}")),
        };

        // Matches are reported relative to the working directory when they
        // fall under it.
        let matches: Vec<String> = paths
            .flatten()
            .map(|p| {
                p.strip_prefix(&self.workdir)
                    .unwrap_or(&p)
                    .display()
                    .to_string()
            })
            .collect();

        if matches.is_empty() {
            ToolResult::ok(&call.id, "No files found")
        } else {
            ToolResult::ok(&call.id, matches.join("\n"))
        }
    }

    pub(super) fn execute_grep(&self, call: &ToolCall) -> ToolResult {
        let input: GrepInput = match parse_input(call) {
            Ok(input) => input,
            Err(result) => return result,
        };
        if input.pattern.is_empty() {
            return ToolResult::error(&call.id, "Missing required parameter: pattern");
        }

        let regex = match regex::Regex::new(&input.pattern) {
            Ok(regex) => regex,
            Err(e) => return ToolResult::error(&call.id, format!("Invalid pattern: {e}")),
        };
        let include = match input.include.as_deref().filter(|s| !s.is_empty()) {
            Some(pat) => match glob::Pattern::new(pat) {
                Ok(pat) => Some(pat),
                Err(e) => return ToolResult::error(&call.id, format!("Invalid include: {e}")),
            },
            None => None,
        };

        let root = match input.path.as_deref().filter(|s| !s.is_empty()) {
            Some(path) => self.resolve(path),
            None => self.workdir.clone(),
        };

        let mut out = String::new();
        for entry in walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if let Some(pat) = &include {
                let name = entry.file_name().to_string_lossy();
                if !pat.matches(&name) {
                    continue;
                }
            }
            grep_file(&regex, entry.path(), &mut out);
        }

        if out.is_empty() {
            ToolResult::ok(&call.id, "No matches found")
        } else {
            ToolResult::ok(&call.id, out)
        }
    }
}

/// Append `path:lineno:line` for every matching line. Unreadable and
/// non-UTF-8 files are skipped, the same way binary files fall out of a
/// text search.
fn grep_file(regex: &regex::Regex, path: &Path, out: &mut String) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    for (i, line) in content.lines().enumerate() {
        if regex.is_match(line) {
            out.push_str(&format!("{}:{}:{}\n", path.display(), i + 1, line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn call(name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "toolu_search".to_string(),
            name: name.to_string(),
            input,
        }
    }

    fn executor_with_tree() -> (TempDir, ToolExecutor) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn lib() {}\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "fn is not rust here\n").unwrap();
        let executor = ToolExecutor::new(dir.path());
        (dir, executor)
    }

    #[tokio::test]
    async fn test_glob_relativizes_matches() {
        let (_dir, executor) = executor_with_tree();
        let result = executor
            .execute(&call("Glob", json!({"pattern": "src/*.rs"})))
            .await;
        assert!(!result.is_error);
        let mut lines: Vec<&str> = result.content.lines().collect();
        lines.sort();
        assert_eq!(lines, ["src/lib.rs", "src/main.rs"]);
    }

    #[tokio::test]
    async fn test_glob_no_matches() {
        let (_dir, executor) = executor_with_tree();
        let result = executor
            .execute(&call("Glob", json!({"pattern": "*.toml"})))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.content, "No files found");
    }

    #[tokio::test]
    async fn test_grep_finds_lines_with_numbers() {
        let (_dir, executor) = executor_with_tree();
        let result = executor
            .execute(&call(
                "Grep",
                json!({"pattern": "fn main", "include": "*.rs"}),
            ))
            .await;
        assert!(!result.is_error);
        assert!(result.content.contains("main.rs:1:fn main() {}"));
        assert!(!result.content.contains("notes.md"));
    }

    #[tokio::test]
    async fn test_grep_include_filters_by_filename() {
        let (_dir, executor) = executor_with_tree();
        let result = executor
            .execute(&call("Grep", json!({"pattern": "fn", "include": "*.md"})))
            .await;
        assert!(!result.is_error);
        assert!(result.content.contains("notes.md:1:"));
        assert!(!result.content.contains(".rs:"));
    }

    #[tokio::test]
    async fn test_grep_no_matches() {
        let (_dir, executor) = executor_with_tree();
        let result = executor
            .execute(&call("Grep", json!({"pattern": "zebra_quux"})))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.content, "No matches found");
    }

    #[tokio::test]
    async fn test_grep_invalid_regex() {
        let (_dir, executor) = executor_with_tree();
        let result = executor
            .execute(&call("Grep", json!({"pattern": "[unclosed"})))
            .await;
        assert!(result.is_error);
        assert!(result.content.starts_with("Invalid pattern:"));
    }
}
