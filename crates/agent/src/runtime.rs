use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use saldo_core::config::AppConfig;
use saldo_core::domain::session::SessionId;
use saldo_core::stream::LineBuffer;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SESSION_HEADER: &str = "X-Amzn-Bedrock-AgentCore-Runtime-Session-Id";
pub const EVENT_STREAM: &str = "text/event-stream";

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("agent runtime transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("agent runtime returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid agent endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("agent response stream failed: {0}")]
    Stream(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Buffered,
    Streaming,
}

impl Delivery {
    pub fn from_stream_flag(stream: bool) -> Self {
        if stream {
            Self::Streaming
        } else {
            Self::Buffered
        }
    }

    pub fn accept(self) -> &'static str {
        match self {
            Self::Buffered => "application/json",
            Self::Streaming => EVENT_STREAM,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationRequest {
    pub prompt: String,
    pub session_id: SessionId,
    pub delivery: Delivery,
}

pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, InvokeError>> + Send>>;

/// A response, classified by its declared content type rather than by the
/// requested delivery mode.
pub enum Invocation {
    Buffered(String),
    Streamed(LineStream),
}

impl Invocation {
    pub async fn from_response(response: Response) -> Result<Self, InvokeError> {
        if is_event_stream(&response) {
            return Ok(Self::Streamed(Box::pin(response_lines(response))));
        }
        Ok(Self::Buffered(response.text().await?))
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(body) => f.debug_tuple("Buffered").field(body).finish(),
            Self::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// Sends a prompt to the hosted agent and hands back its response.
#[async_trait]
pub trait InvocationBoundary: Send + Sync {
    async fn invoke(&self, request: &InvocationRequest) -> Result<Invocation, InvokeError>;
}

#[async_trait]
impl<T> InvocationBoundary for Box<T>
where
    T: InvocationBoundary + ?Sized,
{
    async fn invoke(&self, request: &InvocationRequest) -> Result<Invocation, InvokeError> {
        (**self).invoke(request).await
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeSettings {
    pub endpoint: String,
    pub runtime_arn: String,
    pub qualifier: String,
    pub bearer_token: Option<SecretString>,
    pub max_attempts: u32,
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig, runtime_arn: String) -> Self {
        Self {
            endpoint: config.agent_endpoint(),
            runtime_arn,
            qualifier: config.agent.qualifier.clone(),
            bearer_token: config.agent.bearer_token.clone(),
            max_attempts: config.agent.max_attempts,
        }
    }
}

/// Adapter for the `InvokeAgentRuntime` call shape.
pub struct AgentCoreClient {
    client: Client,
    settings: RuntimeSettings,
}

impl AgentCoreClient {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self { client: Client::new(), settings }
    }

    pub fn invocation_url(&self) -> Result<Url, InvokeError> {
        let mut url = parse_endpoint(&self.settings.endpoint)?;
        url.path_segments_mut()
            .map_err(|_| InvokeError::InvalidEndpoint(self.settings.endpoint.clone()))?
            .pop_if_empty()
            .extend(["runtimes", self.settings.runtime_arn.as_str(), "invocations"]);
        url.query_pairs_mut().append_pair("qualifier", &self.settings.qualifier);
        Ok(url)
    }
}

#[async_trait]
impl InvocationBoundary for AgentCoreClient {
    async fn invoke(&self, request: &InvocationRequest) -> Result<Invocation, InvokeError> {
        let url = self.invocation_url()?;
        let body = json!({ "prompt": request.prompt });

        debug!(
            event_name = "agent.runtime.invoke",
            session_id = %request.session_id,
            delivery = ?request.delivery,
            "invoking agent runtime"
        );

        let response = send_with_retry(self.settings.max_attempts, || {
            let builder = self
                .client
                .post(url.clone())
                .header(ACCEPT, request.delivery.accept())
                .header(CONTENT_TYPE, "application/json")
                .header(SESSION_HEADER, request.session_id.as_str())
                .json(&body);
            with_bearer(builder, self.settings.bearer_token.as_ref())
        })
        .await?;

        Invocation::from_response(ensure_success(response).await?).await
    }
}

/// Finds the runtime ARN for `name` through the control-plane listing.
pub async fn resolve_runtime_arn(
    config: &AppConfig,
    name: &str,
) -> Result<Option<String>, InvokeError> {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RuntimeSummary {
        agent_runtime_arn: String,
        agent_runtime_name: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ListRuntimesResponse {
        #[serde(default)]
        agent_runtimes: Vec<RuntimeSummary>,
        next_token: Option<String>,
    }

    let client = Client::new();
    let mut url = parse_endpoint(&config.control_endpoint())?;
    url.path_segments_mut()
        .map_err(|_| InvokeError::InvalidEndpoint(config.control_endpoint()))?
        .pop_if_empty()
        .extend(["runtimes", ""]);

    let mut next_token: Option<String> = None;
    loop {
        let mut page_url = url.clone();
        if let Some(token) = &next_token {
            page_url.query_pairs_mut().append_pair("nextToken", token);
        }

        let response = send_with_retry(config.agent.max_attempts, || {
            with_bearer(client.get(page_url.clone()), config.agent.bearer_token.as_ref())
        })
        .await?;
        let page: ListRuntimesResponse = ensure_success(response).await?.json().await?;

        if let Some(found) =
            page.agent_runtimes.into_iter().find(|runtime| runtime.agent_runtime_name == name)
        {
            info!(
                event_name = "agent.runtime.resolved",
                runtime_name = name,
                runtime_arn = %found.agent_runtime_arn,
                "resolved agent runtime by name"
            );
            return Ok(Some(found.agent_runtime_arn));
        }

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => return Ok(None),
        }
    }
}

/// Sends the request built by `build`, retrying connection failures,
/// throttling and server errors until `max_attempts` is reached.
pub(crate) async fn send_with_retry<F>(
    max_attempts: u32,
    build: F,
) -> Result<Response, InvokeError>
where
    F: Fn() -> RequestBuilder,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match build().send().await {
            Ok(response) if is_retryable_status(response.status()) && attempt < max_attempts => {
                warn!(
                    event_name = "agent.transport.retry",
                    attempt,
                    status = response.status().as_u16(),
                    "retrying agent request"
                );
            }
            Ok(response) => return Ok(response),
            Err(error) if (error.is_connect() || error.is_timeout()) && attempt < max_attempts => {
                warn!(event_name = "agent.transport.retry", attempt, %error, "retrying agent request");
            }
            Err(error) => return Err(InvokeError::Transport(error)),
        }

        tokio::time::sleep(RETRY_BACKOFF * attempt).await;
        attempt += 1;
    }
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response, InvokeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(InvokeError::Status { status: status.as_u16(), body })
}

pub(crate) fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase().starts_with(EVENT_STREAM))
        .unwrap_or(false)
}

/// Lines of a streamed body, read one chunk at a time.
pub(crate) fn response_lines(
    response: Response,
) -> impl Stream<Item = Result<String, InvokeError>> + Send {
    try_stream! {
        let mut buffer = LineBuffer::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|error| InvokeError::Stream(error.to_string()))?;
            for line in buffer.push(&chunk) {
                yield line;
            }
        }
        if let Some(line) = buffer.finish() {
            yield line;
        }
    }
}

pub(crate) fn with_bearer(builder: RequestBuilder, token: Option<&SecretString>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token.expose_secret()),
        None => builder,
    }
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, InvokeError> {
    Url::parse(endpoint).map_err(|error| InvokeError::InvalidEndpoint(format!("{endpoint}: {error}")))
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
