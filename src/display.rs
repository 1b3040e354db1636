//! Terminal presentation and the confirmation prompt.
//!
//! The conversation engine talks to an abstract [`Ui`] so tests can drive it
//! with a scripted implementation; [`TerminalUi`] is the real one.

use std::io::Write;

use console::{style, Term};

use crate::types::Usage;

/// Synchronous display and confirmation surface consumed by the session.
///
/// Calls arrive inline with streaming and tool dispatch, so implementations
/// should not block except in `confirm`, which is an intentional suspension
/// point: nothing else makes progress while the user decides.
pub trait Ui {
    /// A streamed text increment, printed as it arrives.
    fn text_delta(&self, text: &str);

    /// The streamed text for this response is complete.
    fn text_done(&self) {}

    /// A tool call is about to run.
    fn tool_start(&self, name: &str, input: &serde_json::Value);

    /// A tool call finished with the given result.
    fn tool_result(&self, content: &str, is_error: bool);

    /// Blocking yes/no prompt. Returning `false` denies the operation.
    fn confirm(&self, prompt: &str) -> bool;

    /// Show a busy indicator with the given message.
    fn busy(&self, message: &str);

    /// Clear the busy indicator.
    fn idle(&self);

    fn token_usage(&self, usage: &Usage);

    fn error(&self, message: &str);

    fn success(&self, message: &str);

    fn info(&self, message: &str);
}

const MAX_RESULT_LINES: usize = 15;

/// ANSI terminal implementation.
pub struct TerminalUi {
    term: Term,
}

impl TerminalUi {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    pub fn banner(&self, model: &str, cwd: &str) {
        println!();
        println!(
            "  {} {}",
            style("◆ apipod").magenta().bold(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        );
        println!("  {}", style(format!("{cwd} · {model}")).dim());
        println!(
            "  {} {} {}",
            style("Type").dim(),
            style("/help").magenta(),
            style("for commands").dim()
        );
        println!();
    }

    pub fn help(&self) {
        println!();
        for (cmd, desc) in [
            ("/help", "Show this help"),
            ("/clear", "Clear conversation history"),
            ("/quit", "Exit the session"),
        ] {
            println!("  {:<10}  {}", style(cmd).magenta(), style(desc).dim());
        }
        println!();
    }

    pub fn prompt_symbol(&self) -> String {
        format!("{} ", style("❯").magenta().bold())
    }
}

impl Default for TerminalUi {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui for TerminalUi {
    fn text_delta(&self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }

    fn text_done(&self) {
        println!();
    }

    fn tool_start(&self, name: &str, input: &serde_json::Value) {
        let mut label = format!("  {}", style(format!("⚡ {name}")).yellow().bold());
        if let Some(detail) = tool_detail(name, input) {
            label.push(' ');
            label.push_str(&style(detail).dim().to_string());
        }
        println!();
        println!("{label}");
    }

    fn tool_result(&self, content: &str, is_error: bool) {
        let lines: Vec<&str> = content.trim_end_matches('\n').lines().collect();
        let shown = lines.len().min(MAX_RESULT_LINES);
        for line in &lines[..shown] {
            let rendered = if is_error {
                style(*line).red().to_string()
            } else {
                style(*line).dim().to_string()
            };
            println!("  │ {rendered}");
        }
        if lines.len() > shown {
            println!(
                "  │ {}",
                style(format!("... {} more lines", lines.len() - shown)).dim()
            );
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(format!("  {prompt}"))
            .default(false)
            .interact()
            .unwrap_or(false)
    }

    fn busy(&self, message: &str) {
        let _ = self
            .term
            .write_str(&format!("  {}", style(message).cyan().dim()));
        let _ = self.term.flush();
    }

    fn idle(&self) {
        let _ = self.term.clear_line();
    }

    fn token_usage(&self, usage: &Usage) {
        let total = usage.input_tokens + usage.output_tokens;
        let cost = estimate_cost(usage);
        let line = if cost > 0.0 {
            format!(
                "↳ tokens: {} ({} in, {} out) · ~${:.4}",
                total, usage.input_tokens, usage.output_tokens, cost
            )
        } else {
            format!(
                "↳ tokens: {} ({} in, {} out)",
                total, usage.input_tokens, usage.output_tokens
            )
        };
        println!("  {}", style(line).dim());
    }

    fn error(&self, message: &str) {
        println!("  {}", style(format!("✗ {message}")).red().bold());
    }

    fn success(&self, message: &str) {
        println!("  {}", style(format!("✓ {message}")).green().bold());
    }

    fn info(&self, message: &str) {
        println!("  {}", style(message).dim());
    }
}

/// Rough cost estimate in dollars, using Sonnet-class per-million-token
/// pricing.
fn estimate_cost(usage: &Usage) -> f64 {
    usage.input_tokens as f64 / 1_000_000.0 * 3.0 + usage.output_tokens as f64 / 1_000_000.0 * 15.0
}

/// One-line summary of a tool call for the start label: the command for
/// Bash (first line, shortened), the path for file tools, the pattern for
/// search tools.
fn tool_detail(name: &str, input: &serde_json::Value) -> Option<String> {
    let field = match name {
        "Bash" => "command",
        "Read" | "Write" | "Edit" | "MultiEdit" => "file_path",
        "Glob" | "Grep" => "pattern",
        "BashOutput" => "bash_id",
        "KillBash" => "shell_id",
        _ => return None,
    };
    let value = input.get(field)?.as_str()?;
    if name == "Bash" {
        let first = value.lines().next().unwrap_or(value);
        if first.len() < 60 && value.lines().count() == 1 {
            Some(first.to_string())
        } else {
            Some(format!("{first} ..."))
        }
    } else {
        Some(value.to_string())
    }
}
