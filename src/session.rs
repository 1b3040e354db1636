//! The conversation engine: one user turn drives an iterative loop of
//! model requests and local tool dispatch until the model stops asking for
//! tools or the iteration cap is reached.

use std::path::PathBuf;

use crate::client::StreamingClient;
use crate::display::Ui;
use crate::stream::StreamSink;
use crate::tools::{tool_definitions, ToolExecutor};
use crate::types::{
    ContentBlock, Message, MessagesRequest, MessagesResponse, ToolCall, ToolResult,
};
use crate::{Error, Result};

/// Upper bound on request/tool-dispatch cycles for a single user turn.
/// Hitting it ends the turn silently; the partial transcript stays in
/// history.
const MAX_TOOL_ITERATIONS: usize = 25;

/// Tools that mutate state outside the conversation and therefore require
/// the user's go-ahead before running.
fn needs_confirmation(tool_name: &str) -> bool {
    matches!(tool_name, "Bash" | "Write" | "Edit" | "MultiEdit")
}

/// One interactive conversation: message history, the system prompt built
/// at startup, and the tool executor rooted at the working directory.
pub struct Session {
    client: StreamingClient,
    executor: ToolExecutor,
    model: String,
    system: String,
    messages: Vec<Message>,
    ui: Box<dyn Ui>,
}

impl Session {
    /// Create a session rooted at `workdir`, falling back to the process
    /// working directory. The system prompt captures the environment once;
    /// it does not track later filesystem changes.
    pub fn new(
        client: StreamingClient,
        model: impl Into<String>,
        workdir: Option<PathBuf>,
        ui: Box<dyn Ui>,
    ) -> Self {
        let cwd = workdir
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let system = build_system_prompt(&cwd);
        Self {
            client,
            executor: ToolExecutor::new(cwd),
            model: model.into(),
            system,
            messages: Vec::new(),
            ui,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append the user's input to history and run the exchange to
    /// completion.
    pub async fn send_message(&mut self, user_input: &str) -> Result<()> {
        self.messages.push(Message::user(user_input));
        self.run_loop().await
    }

    /// Drop the conversation history. The system prompt and background
    /// shells are unaffected.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.ui.success("Conversation cleared");
    }

    async fn run_loop(&mut self) -> Result<()> {
        let tools = tool_definitions();

        for iteration in 0..MAX_TOOL_ITERATIONS {
            tracing::debug!(iteration, history = self.messages.len(), "requesting completion");

            let mut request = MessagesRequest::new(self.model.clone(), self.messages.clone());
            request.system = self.system.clone();
            request.tools = tools.clone();

            self.ui.busy("Thinking...");
            let mut sink = UiSink {
                ui: self.ui.as_ref(),
                cleared: false,
                streamed: false,
            };
            let outcome = self.client.send_message_stream(request, &mut sink).await;
            let streamed = sink.streamed;
            self.ui.idle();

            let response = outcome?;
            if streamed {
                self.ui.text_done();
            }

            let tool_results = self.dispatch_tools(&response).await;

            self.messages
                .push(Message::assistant(assistant_blocks(&response)));

            if tool_results.is_empty() {
                self.ui.token_usage(&response.usage);
                break;
            }
            self.messages.push(Message::tool_results(tool_results));
        }

        Ok(())
    }

    /// Run every tool_use block in content-array order, in sequence. A
    /// denial or per-tool failure produces an error result and the batch
    /// keeps going; the whole batch comes back as one list.
    async fn dispatch_tools(&self, response: &MessagesResponse) -> Vec<ToolResult> {
        let mut results = Vec::new();

        for block in &response.content {
            if !block.is_tool_use() {
                continue;
            }
            let input = block
                .input
                .clone()
                .unwrap_or_else(|| serde_json::json!({}));

            self.ui.tool_start(&block.name, &input);

            if needs_confirmation(&block.name)
                && !self.ui.confirm(&format!("Allow {}?", block.name))
            {
                results.push(ToolResult::error(&block.id, "User denied this operation"));
                continue;
            }

            let result = self
                .executor
                .execute(&ToolCall {
                    id: block.id.clone(),
                    name: block.name.clone(),
                    input,
                })
                .await;
            self.ui.tool_result(&result.content, result.is_error);
            results.push(result);
        }

        results
    }
}

/// Convert a streamed response into history-form assistant content,
/// dropping anything that is neither text nor tool_use.
fn assistant_blocks(response: &MessagesResponse) -> Vec<ContentBlock> {
    response
        .content
        .iter()
        .filter_map(|block| match block.kind.as_str() {
            "text" => Some(ContentBlock::Text {
                text: block.text.clone(),
            }),
            "tool_use" => Some(ContentBlock::ToolUse {
                id: block.id.clone(),
                name: block.name.clone(),
                input: block
                    .input
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({})),
            }),
            _ => None,
        })
        .collect()
}

fn build_system_prompt(cwd: &std::path::Path) -> String {
    let mut prompt = String::from(
        "You are an agentic coding assistant running in the user's terminal via apipod.\n\
         You help with software engineering tasks: writing code, debugging, running commands, and explaining code.\n\n\
         Guidelines:\n\
         - Be concise and direct\n\
         - Use tools to explore the codebase before making changes\n\
         - Make minimal, surgical changes\n\
         - Run tests/builds after changes when possible\n\
         - Do not add unnecessary comments to code\n\n",
    );

    prompt.push_str(&format!("Working directory: {}\n", cwd.display()));
    prompt.push_str(&format!(
        "Platform: {}/{}\n",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));

    if let Ok(entries) = std::fs::read_dir(cwd) {
        let files: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        if !files.is_empty() {
            prompt.push_str(&format!("Directory contents: {}\n", files.join(", ")));
        }
    }

    prompt
}

/// Bridges stream events to the display: clears the busy indicator on the
/// first visible event and forwards text increments as they arrive.
struct UiSink<'a> {
    ui: &'a dyn Ui,
    cleared: bool,
    streamed: bool,
}

impl UiSink<'_> {
    fn clear_busy(&mut self) {
        if !self.cleared {
            self.ui.idle();
            self.cleared = true;
        }
    }
}

impl StreamSink for UiSink<'_> {
    fn on_text(&mut self, text: &str) {
        self.clear_busy();
        self.streamed = true;
        self.ui.text_delta(text);
    }

    fn on_tool_use_start(&mut self, _id: &str, _name: &str) {
        self.clear_busy();
    }

    fn on_error(&mut self, error: &Error) {
        self.clear_busy();
        self.ui.error(&error.to_string());
    }
}
