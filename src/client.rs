//! Streaming HTTP client for the `/v1/messages` completion endpoint.

use eventsource_stream::Eventsource;
use futures::StreamExt;

use crate::stream::{ResponseAggregator, StreamSink};
use crate::types::{MessagesRequest, MessagesResponse};
use crate::{Error, Result};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 16384;

/// Client for one API endpoint. Cheap to clone; the underlying
/// `reqwest::Client` pools connections internally.
#[derive(Debug, Clone)]
pub struct StreamingClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl StreamingClient {
    /// Create a client for `base_url` (trailing slashes trimmed)
    /// authenticating with `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a completion request and consume its SSE response stream,
    /// forwarding each event to `sink` and returning the fully assembled
    /// response.
    ///
    /// The request is always sent with `stream: true`, and a zero
    /// `max_tokens` is replaced with the server-side maximum we ask for by
    /// default. Transport failures, non-success HTTP statuses, and stream
    /// `error` events are all fatal; no retries are attempted.
    pub async fn send_message_stream(
        &self,
        mut request: MessagesRequest,
        sink: &mut dyn StreamSink,
    ) -> Result<MessagesResponse> {
        request.stream = true;
        if request.max_tokens == 0 {
            request.max_tokens = DEFAULT_MAX_TOKENS;
        }

        let url = format!("{}/v1/messages", self.base_url);
        tracing::debug!(%url, model = %request.model, messages = request.messages.len(), "sending request");

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(format!(
                "request failed with status {}: {}",
                status, body
            )));
        }

        let mut aggregator = ResponseAggregator::new();
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| Error::stream(format!("reading event stream: {e}")))?;
            aggregator.process_event(&event.event, &event.data, sink)?;
        }

        let response = aggregator.into_response();
        tracing::debug!(
            id = %response.id,
            stop_reason = ?response.stop_reason,
            blocks = response.content.len(),
            "stream complete"
        );
        Ok(response)
    }
}
