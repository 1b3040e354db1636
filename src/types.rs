//! Core types: conversation messages, content blocks, and the wire format
//! of the `/v1/messages` streaming completion API.

use serde::{Deserialize, Serialize};

/// Message role in the conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message content: either a plain string (simple user turns) or an ordered
/// sequence of content blocks (assistant turns and tool-result batches).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A message in the conversation history.
///
/// History is append-only within a session. The top level strictly
/// alternates user/assistant; a single user message may bundle several
/// `tool_result` blocks from one dispatch batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// A user message carrying a whole batch of tool results back to the
    /// model.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(results.iter().map(ContentBlock::from).collect()),
        }
    }
}

/// Content block types that can appear in request messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

impl From<&ToolResult> for ContentBlock {
    fn from(result: &ToolResult) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: result.tool_use_id.clone(),
            content: result.content.clone(),
            is_error: result.is_error,
        }
    }
}

/// Tool definition advertised to the model.
///
/// Names and schemas are a stable contract; see
/// [`tool_definitions`](crate::tools::tool_definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Request body for `POST {base_url}/v1/messages`
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system: String,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl MessagesRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: String::new(),
            max_tokens: 0,
            stream: true,
            tools: Vec::new(),
        }
    }
}

/// Token usage counters, updated progressively by `message_delta` events
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// One unit of model output under assembly during streaming.
///
/// Blocks are addressed by their stream index and must be constructible
/// before they are populated: the response content array grows lazily with
/// `ResponseBlock::default()` placeholders when `content_block_start`
/// events arrive out of order.
///
/// `input` stays `None` (or the `{}` sent at block start) until the block's
/// accumulated partial-JSON fragments are parsed at `content_block_stop`;
/// the fragments are never valid JSON individually, so they are buffered
/// outside the block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

impl ResponseBlock {
    pub fn is_tool_use(&self) -> bool {
        self.kind == "tool_use"
    }
}

/// Fully assembled response for one request/response cycle
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

/// A model-issued request to run a local tool, derived from a finalized
/// `tool_use` response block
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Structured outcome of a tool call, fed back to the model.
///
/// Always structurally valid: execution failures set `is_error` instead of
/// propagating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

// --- SSE event payloads -----------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct MessageStartEvent {
    pub message: MessagesResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentBlockStartEvent {
    pub index: usize,
    pub content_block: ResponseBlock,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentBlockDeltaEvent {
    pub index: usize,
    pub delta: BlockDelta,
}

/// Per-block delta payload: text for `text` blocks, partial JSON for
/// `tool_use` blocks
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentBlockStopEvent {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageDeltaEvent {
    pub delta: MessageDeltaBody,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEvent {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert!(matches!(msg.role, Role::User));
        match &msg.content {
            MessageContent::Text(t) => assert_eq!(t, "Hello"),
            _ => panic!("Expected plain text content"),
        }
    }

    #[test]
    fn test_message_user_serializes_as_string() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn test_content_block_serialization() {
        let block = ContentBlock::Text {
            text: "Hello".to_string(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"type\":\"text\""));

        let block = ContentBlock::ToolUse {
            id: "toolu_1".to_string(),
            name: "Bash".to_string(),
            input: serde_json::json!({"command": "ls"}),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_use");
        assert_eq!(json["input"]["command"], "ls");
    }

    #[test]
    fn test_tool_result_block_from_result() {
        let result = ToolResult::error("toolu_1", "User denied this operation");
        let block = ContentBlock::from(&result);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "toolu_1");
        assert_eq!(json["is_error"], true);
    }

    #[test]
    fn test_request_serialization_skips_empty() {
        let req = MessagesRequest::new("test-model", vec![Message::user("hi")]);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("tools").is_none());
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_response_block_deserialization() {
        let json = r#"{"type":"tool_use","id":"toolu_1","name":"Read","input":{}}"#;
        let block: ResponseBlock = serde_json::from_str(json).unwrap();
        assert!(block.is_tool_use());
        assert_eq!(block.id, "toolu_1");
        assert_eq!(block.name, "Read");
        assert_eq!(block.input, Some(serde_json::json!({})));
    }

    #[test]
    fn test_block_delta_deserialization() {
        let delta: BlockDelta =
            serde_json::from_str(r#"{"type":"text_delta","text":"hi"}"#).unwrap();
        assert!(matches!(delta, BlockDelta::TextDelta { text } if text == "hi"));

        let delta: BlockDelta =
            serde_json::from_str(r#"{"type":"input_json_delta","partial_json":"{\"a\""}"#)
                .unwrap();
        assert!(matches!(delta, BlockDelta::InputJsonDelta { .. }));
    }

    #[test]
    fn test_message_start_event() {
        let json = r#"{"type":"message_start","message":{"id":"msg_1","role":"assistant","model":"m","content":[],"usage":{"input_tokens":10,"output_tokens":0}}}"#;
        let event: MessageStartEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.message.id, "msg_1");
        assert_eq!(event.message.usage.input_tokens, 10);
    }
}
