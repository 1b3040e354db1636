//! # apipod
//!
//! A terminal coding assistant: a streaming client for an Anthropic-style
//! `/v1/messages` API, a conversation engine that loops between model
//! requests and local tool dispatch, and a tool executor covering shell,
//! file, and search operations.
//!
//! ## Architecture
//!
//! - **client**: streaming HTTP client consuming the SSE response
//! - **stream**: incremental response assembly and the event sink trait
//! - **session**: the request/tool-dispatch loop with confirmation gating
//! - **tools**: local tool execution, including background shells
//! - **types**: wire types for requests, responses, and tool results
//! - **config**: defaults, environment overrides, `~/.apipod/config.json`
//! - **display**: terminal presentation behind the `Ui` trait
//! - **error**: the crate-wide `Error` enum and `Result` alias
//!
//! ## Example
//!
//! ```rust,no_run
//! use apipod::{Config, Session, StreamingClient, TerminalUi};
//!
//! #[tokio::main]
//! async fn main() -> apipod::Result<()> {
//!     let config = Config::load();
//!     let client = StreamingClient::new(&config.base_url, &config.api_key);
//!     let mut session = Session::new(client, &config.model, None, Box::new(TerminalUi::new()));
//!
//!     session.send_message("list the rust files in this project").await?;
//!     Ok(())
//! }
//! ```

/// Streaming HTTP client for the messages endpoint.
mod client;

/// Configuration defaults, environment overrides, and the config file.
mod config;

/// Terminal presentation and the `Ui` collaborator trait.
mod display;

/// Crate-wide error enum and `Result` alias.
mod error;

/// The conversation engine driving requests and tool dispatch.
mod session;

/// Incremental SSE response assembly and the event sink trait.
mod stream;

/// Local tool execution: shell, file, and search tools.
mod tools;

/// Wire types for messages, requests, responses, and tool results.
mod types;

// --- Client and session ---

pub use client::StreamingClient;
pub use session::Session;

// --- Streaming ---

pub use stream::{NoopSink, ResponseAggregator, StreamSink};

// --- Tools ---

pub use tools::{tool_definitions, ToolExecutor};

// --- Configuration and display ---

pub use config::{config_path, Config, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use display::{TerminalUi, Ui};

// --- Errors ---

pub use error::{Error, Result};

// --- Core types ---

pub use types::{
    ContentBlock, Message, MessageContent, MessagesRequest, MessagesResponse, ResponseBlock, Role,
    ToolCall, ToolDefinition, ToolResult, Usage,
};

/// The most commonly used items in one import:
/// `use apipod::prelude::*;`.
pub mod prelude {
    pub use crate::{
        Config, ContentBlock, Error, Message, MessagesRequest, MessagesResponse, Result, Session,
        StreamSink, StreamingClient, ToolCall, ToolExecutor, ToolResult, Ui, Usage,
    };
}
