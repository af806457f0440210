//! Adapter for the agent `converse` call shape.
//!
//! Requests carry the agent id and session in the body instead of the URL,
//! and responses wrap their payload (`completion.text` when buffered,
//! `chunk` events when streamed). The adapter unwraps both so the rest of the
//! client sees the same shapes the runtime adapter produces.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use saldo_core::config::AppConfig;
use serde_json::{json, Value};
use tracing::debug;

use crate::runtime::{
    ensure_success, is_event_stream, parse_endpoint, response_lines, send_with_retry,
    with_bearer, Delivery, Invocation, InvocationBoundary, InvocationRequest, InvokeError,
    RuntimeSettings,
};

pub struct ConverseClient {
    client: Client,
    settings: RuntimeSettings,
}

impl ConverseClient {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self { client: Client::new(), settings }
    }

    pub fn from_config(config: &AppConfig, agent_id: String) -> Self {
        Self::new(RuntimeSettings::from_config(config, agent_id))
    }

    fn operation(delivery: Delivery) -> &'static str {
        match delivery {
            Delivery::Buffered => "converse",
            Delivery::Streaming => "converse-stream",
        }
    }
}

#[async_trait]
impl InvocationBoundary for ConverseClient {
    async fn invoke(&self, request: &InvocationRequest) -> Result<Invocation, InvokeError> {
        let mut url = parse_endpoint(&self.settings.endpoint)?;
        url.path_segments_mut()
            .map_err(|_| InvokeError::InvalidEndpoint(self.settings.endpoint.clone()))?
            .pop_if_empty()
            .push(Self::operation(request.delivery));

        let body = json!({
            "agentId": self.settings.runtime_arn,
            "sessionId": request.session_id.as_str(),
            "input": { "text": request.prompt },
        });

        debug!(
            event_name = "agent.converse.invoke",
            session_id = %request.session_id,
            delivery = ?request.delivery,
            "invoking agent converse"
        );

        let response = send_with_retry(self.settings.max_attempts, || {
            let builder = self
                .client
                .post(url.clone())
                .header(ACCEPT, request.delivery.accept())
                .header(CONTENT_TYPE, "application/json")
                .json(&body);
            with_bearer(builder, self.settings.bearer_token.as_ref())
        })
        .await?;
        let response = ensure_success(response).await?;

        if is_event_stream(&response) {
            let lines = response_lines(response).map(|line| line.map(unwrap_chunk_line));
            return Ok(Invocation::Streamed(Box::pin(lines)));
        }
        Ok(Invocation::Buffered(normalize_completion(response.text().await?)))
    }
}

/// Rewrites `{"completion": {"text": …}}` as `{"text": …}`; other bodies are
/// left alone.
pub fn normalize_completion(body: String) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(&body) else {
        return body;
    };
    match parsed.get("completion").and_then(|completion| completion.get("text")) {
        Some(Value::String(text)) => json!({ "text": text }).to_string(),
        _ => body,
    }
}

/// Replaces a `chunk` event line with the chunk it carries, keeping any
/// `data:` framing so the stream decoder sees an ordinary event line.
pub fn unwrap_chunk_line(line: String) -> String {
    let (prefix, payload) = match line.strip_prefix("data:") {
        Some(rest) => ("data: ", rest.trim_start()),
        None => ("", line.as_str()),
    };
    let Ok(event) = serde_json::from_str::<Value>(payload) else {
        return line;
    };
    let Some(chunk) = event.get("chunk") else {
        return line;
    };

    let unwrapped = match chunk.get("bytes") {
        Some(Value::String(embedded)) => embedded.clone(),
        _ => chunk.to_string(),
    };
    format!("{prefix}{unwrapped}")
}
