//! Incremental assembly of a streamed response.
//!
//! The completion API delivers a response as a sequence of named SSE events.
//! Text arrives as `text_delta` fragments and tool inputs arrive as
//! `input_json_delta` fragments that may be split at arbitrary byte
//! positions, for example:
//!
//! ```text
//! event: content_block_start
//! data: {"index":0,"content_block":{"type":"tool_use","id":"toolu_1","name":"Read","input":{}}}
//!
//! event: content_block_delta
//! data: {"index":0,"delta":{"type":"input_json_delta","partial_json":"{\"file_p"}}
//!
//! event: content_block_delta
//! data: {"index":0,"delta":{"type":"input_json_delta","partial_json":"ath\":\"a.txt\"}"}}
//!
//! event: content_block_stop
//! data: {"index":0}
//! ```
//!
//! [`ResponseAggregator`] folds these events into a [`MessagesResponse`].
//! Partial JSON is buffered per block index and only parsed once, at
//! `content_block_stop`; a block's `input` is never touched mid-stream
//! because the fragments are not valid JSON on their own.

use std::collections::HashMap;

use crate::types::{
    BlockDelta, ContentBlockDeltaEvent, ContentBlockStartEvent, ContentBlockStopEvent, ErrorEvent,
    MessageDeltaEvent, MessageStartEvent, MessagesResponse, ResponseBlock, Usage,
};
use crate::{Error, Result};

/// Observer notified as stream events are applied, one method per event
/// kind. Callbacks run synchronously inline with parsing, so a slow sink
/// stalls the stream.
///
/// All methods default to no-ops; implement only what you need.
pub trait StreamSink {
    /// The aggregated response was seeded (id, role, model; no content yet).
    fn on_message_start(&mut self, _response: &MessagesResponse) {}

    /// A text increment arrived for some block.
    fn on_text(&mut self, _text: &str) {}

    /// A `tool_use` block opened.
    fn on_tool_use_start(&mut self, _id: &str, _name: &str) {}

    /// A partial-JSON fragment of a tool input arrived.
    fn on_tool_use_input(&mut self, _partial_json: &str) {}

    /// The block at `index` was finalized.
    fn on_content_block_stop(&mut self, _index: usize) {}

    /// Stop reason and/or usage counters were updated.
    fn on_message_delta(&mut self, _stop_reason: Option<&str>, _usage: Option<&Usage>) {}

    /// The server reported a terminal stream error.
    fn on_error(&mut self, _error: &Error) {}
}

/// A sink that ignores every event.
#[derive(Debug, Default)]
pub struct NoopSink;

impl StreamSink for NoopSink {}

/// Stateful accumulator that folds SSE events into a [`MessagesResponse`].
///
/// State lives for exactly one request/response cycle:
/// - the response under assembly, whose content array grows lazily with
///   default blocks so indices may arrive in any order, and
/// - one accumulation buffer per `tool_use` index, discarded when the block
///   is finalized.
pub struct ResponseAggregator {
    response: MessagesResponse,
    tool_inputs: HashMap<usize, String>,
}

impl ResponseAggregator {
    pub fn new() -> Self {
        Self {
            response: MessagesResponse::default(),
            tool_inputs: HashMap::new(),
        }
    }

    /// Apply one named event.
    ///
    /// Unknown event kinds are ignored for forward compatibility. A data
    /// payload that fails to decode is skipped for that event only; the
    /// stream keeps going. The single fatal case is a decodable `error`
    /// event, which notifies the sink and returns `Err`.
    pub fn process_event(
        &mut self,
        kind: &str,
        data: &str,
        sink: &mut dyn StreamSink,
    ) -> Result<()> {
        match kind {
            "message_start" => {
                if let Some(event) = decode::<MessageStartEvent>(kind, data) {
                    self.response = event.message;
                    sink.on_message_start(&self.response);
                }
            }

            "content_block_start" => {
                if let Some(event) = decode::<ContentBlockStartEvent>(kind, data) {
                    while self.response.content.len() <= event.index {
                        self.response.content.push(ResponseBlock::default());
                    }
                    let is_tool_use = event.content_block.is_tool_use();
                    self.response.content[event.index] = event.content_block;
                    if is_tool_use {
                        self.tool_inputs.insert(event.index, String::new());
                        let block = &self.response.content[event.index];
                        sink.on_tool_use_start(&block.id, &block.name);
                    }
                }
            }

            "content_block_delta" => {
                if let Some(event) = decode::<ContentBlockDeltaEvent>(kind, data) {
                    match event.delta {
                        BlockDelta::TextDelta { text } => {
                            if let Some(block) = self.response.content.get_mut(event.index) {
                                block.text.push_str(&text);
                            }
                            sink.on_text(&text);
                        }
                        BlockDelta::InputJsonDelta { partial_json } => {
                            if let Some(buf) = self.tool_inputs.get_mut(&event.index) {
                                buf.push_str(&partial_json);
                            }
                            sink.on_tool_use_input(&partial_json);
                        }
                    }
                }
            }

            "content_block_stop" => {
                if let Some(event) = decode::<ContentBlockStopEvent>(kind, data) {
                    if let Some(buf) = self.tool_inputs.remove(&event.index) {
                        if let Some(block) = self.response.content.get_mut(event.index) {
                            match serde_json::from_str(&buf) {
                                Ok(input) => block.input = Some(input),
                                Err(e) => {
                                    // Dispatch substitutes an empty input for
                                    // blocks that never got a parseable one.
                                    tracing::debug!(
                                        index = event.index,
                                        error = %e,
                                        "tool input did not parse as JSON"
                                    );
                                }
                            }
                        }
                    }
                    sink.on_content_block_stop(event.index);
                }
            }

            "message_delta" => {
                if let Some(event) = decode::<MessageDeltaEvent>(kind, data) {
                    if event.delta.stop_reason.is_some() {
                        self.response.stop_reason = event.delta.stop_reason.clone();
                    }
                    if let Some(usage) = event.usage {
                        self.response.usage = usage;
                    }
                    sink.on_message_delta(event.delta.stop_reason.as_deref(), event.usage.as_ref());
                }
            }

            "error" => {
                if let Some(event) = decode::<ErrorEvent>(kind, data) {
                    let err = Error::api(event.error.message);
                    sink.on_error(&err);
                    return Err(err);
                }
            }

            // Forward compatibility: ping and any future event kinds.
            _ => {}
        }

        Ok(())
    }

    /// Consume the aggregator, yielding the assembled response.
    pub fn into_response(self) -> MessagesResponse {
        self.response
    }
}

impl Default for ResponseAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one event payload, logging and yielding `None` on malformed JSON
/// (lenient per-line skip).
fn decode<T: serde::de::DeserializeOwned>(kind: &str, data: &str) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(event = kind, error = %e, "skipping malformed event payload");
            None
        }
    }
}
