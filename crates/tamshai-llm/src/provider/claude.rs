use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::errors::LlmError;
use crate::generator::{AnswerGenerator, AnswerRequest, AnswerStream};
use crate::prompt::{context_block, instructions};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/";
const MESSAGES_PATH: &str = "messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_VERSION: &str = "2023-06-01";

#[derive(Clone, Debug)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub anthropic_version: String,
}

impl ClaudeConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|err| LlmError::config(&format!("claude base url parse failed: {err}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(60),
            anthropic_version: DEFAULT_VERSION.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self, LlmError> {
        self.base_url = Url::parse(base_url.as_ref())
            .map_err(|err| LlmError::config(&format!("claude base url parse failed: {err}")))?;
        if !self.base_url.path().ends_with('/') {
            self.base_url
                .set_path(&format!("{}/", self.base_url.path().trim_end_matches('/')));
        }
        Ok(self)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Anthropic Messages API provider.
///
/// The data context travels as its own system block tagged
/// `cache_control: ephemeral`, so repeated questions over the same cached
/// context reuse the provider-side prompt cache.
pub struct ClaudeGenerator {
    client: Client,
    config: ClaudeConfig,
    messages_url: Url,
}

impl ClaudeGenerator {
    pub fn new(config: ClaudeConfig) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|err| LlmError::config(&format!("claude api key is not a valid header: {err}")))?;
        headers.insert("x-api-key", key);
        let version = HeaderValue::from_str(&config.anthropic_version)
            .map_err(|err| LlmError::config(&format!("anthropic version header: {err}")))?;
        headers.insert("anthropic-version", version);

        let client = Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| LlmError::config(&format!("claude client build failed: {err}")))?;
        let messages_url = config
            .base_url
            .join(MESSAGES_PATH)
            .map_err(|err| LlmError::config(&format!("claude messages url: {err}")))?;
        Ok(Self {
            client,
            config,
            messages_url,
        })
    }

    fn build_request(&self, request: &AnswerRequest, stream: bool) -> MessagesRequest {
        MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: vec![
                SystemBlock {
                    kind: "text",
                    text: instructions(&request.caller),
                    cache_control: None,
                },
                SystemBlock {
                    kind: "text",
                    text: context_block(&request.context),
                    cache_control: Some(CacheControl { kind: "ephemeral" }),
                },
            ],
            messages: vec![RequestMessage {
                role: "user",
                content: request.query.clone(),
            }],
            stream,
        }
    }

    async fn send(&self, body: &MessagesRequest) -> Result<reqwest::Response, LlmError> {
        let mut builder = self.client.post(self.messages_url.clone()).json(body);
        if body.stream {
            builder = builder.header("accept", "text/event-stream");
        }
        let response = builder.send().await.map_err(|err| {
            LlmError::provider_unavailable(&format!("claude request error: {err}"))
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable>".into());
            return Err(map_http_error(status, &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl AnswerGenerator for ClaudeGenerator {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn answer(&self, request: &AnswerRequest) -> Result<String, LlmError> {
        let body = self.build_request(request, false);
        let response = self.send(&body).await?;
        let payload = response.json::<MessagesResponse>().await.map_err(|err| {
            LlmError::provider_unavailable(&format!("claude response decode: {err}"))
        })?;
        debug!(
            target: "tamshai::llm",
            model = %self.config.model,
            stop_reason = payload.stop_reason.as_deref().unwrap_or_default(),
            "claude answer received"
        );
        Ok(payload
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect())
    }

    async fn answer_stream(&self, request: AnswerRequest) -> Result<AnswerStream, LlmError> {
        let body = self.build_request(&request, true);
        let response = self.send(&body).await?;

        let stream = try_stream! {
            let mut reader = EventStreamReader::new(response.bytes_stream());
            while let Some(event) = reader.next_event().await? {
                match event {
                    StreamEvent::TextDelta(text) => yield text,
                    StreamEvent::Stop => break,
                    StreamEvent::Ignored => {}
                }
            }
        };
        Ok(stream.boxed())
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: Vec<SystemBlock>,
    messages: Vec<RequestMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct SystemBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::provider_unavailable(&format!("claude auth failed: {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::provider_unavailable(&format!("claude rate limited request: {body}"))
        }
        StatusCode::BAD_REQUEST => LlmError::schema(&format!("claude rejected request: {body}")),
        _ => LlmError::provider_unavailable(&format!(
            "claude returned {}: {}",
            status.as_u16(),
            body
        )),
    }
}

enum StreamEvent {
    TextDelta(String),
    Stop,
    Ignored,
}

struct EventStreamReader<S>
where
    S: futures_util::Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    inner: S,
    buffer: Vec<u8>,
}

impl<S> EventStreamReader<S>
where
    S: futures_util::Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
        }
    }

    async fn next_event(&mut self) -> Result<Option<StreamEvent>, LlmError> {
        loop {
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }
            match self.inner.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    return Err(LlmError::provider_unavailable(&format!(
                        "claude stream read error: {err}"
                    )))
                }
                None => {
                    if self.buffer.iter().all(u8::is_ascii_whitespace) {
                        return Ok(None);
                    }
                    self.buffer.extend_from_slice(b"\n\n");
                    return self.try_parse_event();
                }
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<StreamEvent>, LlmError> {
        let delimiter = b"\n\n";
        let Some(pos) = self
            .buffer
            .windows(delimiter.len())
            .position(|window| window == delimiter)
        else {
            return Ok(None);
        };
        let event_bytes = self
            .buffer
            .drain(..pos + delimiter.len())
            .collect::<Vec<_>>();
        let event_str = String::from_utf8_lossy(&event_bytes);

        let mut event_name = None;
        let mut data: Option<String> = None;
        for line in event_str.lines() {
            let line = line.trim();
            if let Some(name) = line.strip_prefix("event:") {
                event_name = Some(name.trim().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                let value = value.trim();
                data = Some(match data {
                    Some(existing) => existing + value,
                    None => value.to_string(),
                });
            }
        }

        let name = event_name.unwrap_or_default();
        match data {
            Some(payload) => parse_stream_event(&name, &payload).map(Some),
            None => Ok(Some(StreamEvent::Ignored)),
        }
    }
}

fn parse_stream_event(event: &str, payload: &str) -> Result<StreamEvent, LlmError> {
    match event {
        "content_block_delta" => {
            let value: Value = serde_json::from_str(payload).map_err(|err| {
                LlmError::provider_unavailable(&format!(
                    "claude content_block_delta decode: {err}; payload={payload}"
                ))
            })?;
            let delta = value
                .get("delta")
                .and_then(Value::as_object)
                .ok_or_else(|| LlmError::provider_unavailable("claude delta missing payload"))?;
            match delta.get("type").and_then(Value::as_str) {
                Some("text_delta") => Ok(StreamEvent::TextDelta(
                    delta
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                )),
                _ => Ok(StreamEvent::Ignored),
            }
        }
        "message_stop" => Ok(StreamEvent::Stop),
        "error" => {
            let value: Value = serde_json::from_str(payload).unwrap_or(Value::Null);
            let message = value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or(payload);
            Err(LlmError::provider_unavailable(&format!(
                "claude stream error: {message}"
            )))
        }
        _ => Ok(StreamEvent::Ignored),
    }
}
