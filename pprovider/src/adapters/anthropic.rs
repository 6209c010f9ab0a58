//! Anthropic adapter speaking the native messages protocol.
//!
//! The wire shape differs from the OpenAI family in three ways this module
//! has to honor: the system prompt is a top-level field rather than a
//! message, auth travels in `x-api-key` plus an `anthropic-version` header,
//! and streaming frames are typed SSE events rather than bare choice
//! deltas.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use pcommon::VendorName;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::adapters::framing::{LineBuffer, sse_data};
use crate::adapters::http::{map_send_error, map_status, parse_retry_after};
use crate::catalog::ModelListCache;
use crate::{
    AdapterFuture, Attachment, AttachmentKind, BoxedDeltaStream, ChatRequest, ChatResponse,
    CredentialVault, FinishReason, Role, SecretString, StreamDelta, TokenUsage, VendorAdapter,
    VendorError, VendorExtras,
};

pub const ANTHROPIC_VENDOR: &str = "anthropic";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The messages API requires `max_tokens`; this applies when the caller
/// leaves it unset.
const DEFAULT_MAX_TOKENS: u32 = 1024;

impl CredentialVault {
    /// Stores an Anthropic API key for provider-authenticated requests.
    ///
    /// Anthropic keys are expected to start with `sk-ant-`.
    pub fn set_anthropic_api_key(&self, api_key: impl Into<String>) -> Result<(), VendorError> {
        let api_key = api_key.into();
        if !api_key.starts_with("sk-ant-") {
            return Err(VendorError::auth(
                "Anthropic API key must start with 'sk-ant-'",
            ));
        }

        self.set_api_key(ANTHROPIC_VENDOR, api_key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    pub tools: Vec<AnthropicTool>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: u32,
    pub stream: bool,
    pub extras: VendorExtras,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnthropicMessage {
    pub role: AnthropicRole,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnthropicRole {
    User,
    Assistant,
}

impl AnthropicRole {
    fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnthropicStopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    Other,
}

impl From<AnthropicStopReason> for FinishReason {
    fn from(value: AnthropicStopReason) -> Self {
        match value {
            AnthropicStopReason::EndTurn => Self::Stop,
            AnthropicStopReason::MaxTokens => Self::Length,
            AnthropicStopReason::ToolUse => Self::ToolCall,
            AnthropicStopReason::Other => Self::Stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicResponse {
    pub model: String,
    pub text: String,
    pub stop_reason: AnthropicStopReason,
    pub usage: Option<TokenUsage>,
    pub raw: Value,
}

impl AnthropicResponse {
    fn into_chat_response(self) -> ChatResponse {
        ChatResponse {
            vendor: VendorName::from(ANTHROPIC_VENDOR),
            model: self.model,
            text: self.text,
            finish: self.stop_reason.into(),
            usage: self.usage,
            raw: Some(self.raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnthropicStreamChunk {
    TextDelta(String),
    Finished(AnthropicStopReason),
}

pub type AnthropicChunkStream =
    Pin<Box<dyn Stream<Item = Result<AnthropicStreamChunk, VendorError>> + Send + 'static>>;

pub trait AnthropicTransport: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: AnthropicRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<AnthropicResponse, VendorError>>;

    fn stream<'a>(
        &'a self,
        request: AnthropicRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<AnthropicChunkStream, VendorError>>;

    fn list_models<'a>(
        &'a self,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<Vec<String>, VendorError>>;
}

#[derive(Clone)]
pub struct AnthropicAdapter {
    vault: Arc<CredentialVault>,
    transport: Arc<dyn AnthropicTransport>,
    fallback_model: String,
    models: Arc<ModelListCache>,
}

impl AnthropicAdapter {
    pub fn new(vault: Arc<CredentialVault>, transport: Arc<dyn AnthropicTransport>) -> Self {
        Self {
            vault,
            transport,
            fallback_model: "claude-sonnet-4-5".to_string(),
            models: Arc::new(ModelListCache::default()),
        }
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub fn default_http_transport(client: Client) -> AnthropicHttpTransport {
        AnthropicHttpTransport::new(client)
    }

    fn api_key(&self) -> Result<SecretString, VendorError> {
        self.vault.require_api_key(ANTHROPIC_VENDOR)
    }

    fn build_request(&self, request: ChatRequest, stream: bool) -> AnthropicRequest {
        let model = if request.model.trim().is_empty() {
            self.fallback_model.clone()
        } else {
            request.model
        };

        let mut system_parts = Vec::new();
        let mut messages = Vec::new();
        for message in request.messages {
            match message.role {
                Role::System => system_parts.push(message.content),
                Role::Assistant => messages.push(AnthropicMessage {
                    role: AnthropicRole::Assistant,
                    content: message.content,
                    attachments: message.attachments,
                }),
                // The messages API has no tool role for plain text; tool
                // output is carried as user content.
                Role::User | Role::Tool => messages.push(AnthropicMessage {
                    role: AnthropicRole::User,
                    content: message.content,
                    attachments: message.attachments,
                }),
            }
        }

        let tools = request
            .tools
            .into_iter()
            .map(|tool| AnthropicTool {
                name: tool.name,
                description: tool.description,
                input_schema: tool.input_schema,
            })
            .collect::<Vec<_>>();

        AnthropicRequest {
            model,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
            messages,
            tools,
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_tokens: request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream,
            extras: request.extras,
        }
    }
}

impl VendorAdapter for AnthropicAdapter {
    fn vendor(&self) -> VendorName {
        VendorName::from(ANTHROPIC_VENDOR)
    }

    fn send<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> AdapterFuture<'a, Result<ChatResponse, VendorError>> {
        Box::pin(async move {
            request.validate()?;
            let api_key = self.api_key()?;
            let anthropic_request = self.build_request(request, false);

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(VendorError::canceled("Anthropic request canceled"));
                }
                result = self.transport.complete(anthropic_request, api_key) => result?,
            };

            Ok(response.into_chat_response())
        })
    }

    fn send_stream<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> AdapterFuture<'a, Result<BoxedDeltaStream, VendorError>> {
        Box::pin(async move {
            request.validate()?;
            let api_key = self.api_key()?;
            let anthropic_request = self.build_request(request, true);

            let mut chunks = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(VendorError::canceled("Anthropic request canceled"));
                }
                result = self.transport.stream(anthropic_request, api_key) => result?,
            };

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    match chunk? {
                        AnthropicStreamChunk::TextDelta(delta) => {
                            yield StreamDelta::text(delta);
                        }
                        AnthropicStreamChunk::Finished(reason) => {
                            yield StreamDelta::finish(reason.into());
                            break;
                        }
                    }
                }
            };

            Ok(Box::pin(stream) as BoxedDeltaStream)
        })
    }

    fn models<'a>(&'a self) -> AdapterFuture<'a, Result<Vec<String>, VendorError>> {
        Box::pin(async move {
            if let Some(models) = self.models.cached() {
                return Ok(models);
            }

            let api_key = self.api_key()?;
            let models = self.transport.list_models(api_key).await?;
            self.models.store(models.clone());
            Ok(models)
        })
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicHttpTransport {
    client: Client,
    base_url: String,
}

impl AnthropicHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn apply_headers(
        &self,
        builder: reqwest::RequestBuilder,
        api_key: &SecretString,
    ) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    async fn parse_error(response: Response) -> VendorError {
        let status = response.status();
        let retry_after = parse_retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("Anthropic request failed with status {status}"));

        map_status(status, message, retry_after)
    }
}

impl AnthropicTransport for AnthropicHttpTransport {
    fn complete<'a>(
        &'a self,
        request: AnthropicRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<AnthropicResponse, VendorError>> {
        Box::pin(async move {
            let api_request = build_api_request(request)?;
            let url = self.endpoint("messages");
            let builder = self.client.post(url).json(&api_request);
            let response = self
                .apply_headers(builder, &api_key)
                .send()
                .await
                .map_err(map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let raw: Value = response.json().await.map_err(map_send_error)?;
            parse_api_response(raw)
        })
    }

    fn stream<'a>(
        &'a self,
        mut request: AnthropicRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<AnthropicChunkStream, VendorError>> {
        Box::pin(async move {
            request.stream = true;
            let api_request = build_api_request(request)?;
            let url = self.endpoint("messages");
            let builder = self.client.post(url).json(&api_request);
            let response = self
                .apply_headers(builder, &api_key)
                .send()
                .await
                .map_err(map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut lines = LineBuffer::new();
                let mut stop_reason = AnthropicStopReason::Other;
                let mut finished = false;

                while let Some(item) = chunks.next().await {
                    let bytes = item.map_err(|err| VendorError::fault(err.to_string()))?;
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|err| VendorError::fault(err.to_string()))?;

                    for line in lines.push(text) {
                        let Some(payload) = sse_data(&line) else {
                            continue;
                        };

                        match decode_stream_event(payload)? {
                            StreamEventAction::Text(delta) => {
                                yield AnthropicStreamChunk::TextDelta(delta);
                            }
                            StreamEventAction::StopReason(reason) => {
                                stop_reason = reason;
                            }
                            StreamEventAction::Stop => {
                                yield AnthropicStreamChunk::Finished(stop_reason);
                                finished = true;
                                break;
                            }
                            StreamEventAction::Ignore => {}
                        }
                    }

                    if finished {
                        break;
                    }
                }
            };

            Ok(Box::pin(stream) as AnthropicChunkStream)
        })
    }

    fn list_models<'a>(
        &'a self,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<Vec<String>, VendorError>> {
        Box::pin(async move {
            let url = self.endpoint("models");
            let builder = self.client.get(url);
            let response = self
                .apply_headers(builder, &api_key)
                .send()
                .await
                .map_err(map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let parsed: ApiModelList = response.json().await.map_err(map_send_error)?;

            let mut ids = parsed
                .data
                .into_iter()
                .map(|model| model.id)
                .collect::<Vec<_>>();
            ids.sort();
            Ok(ids)
        })
    }
}

fn build_api_request(request: AnthropicRequest) -> Result<ApiRequest, VendorError> {
    if request.messages.is_empty() {
        return Err(VendorError::invalid_request(
            "Anthropic request requires at least one non-system message",
        ));
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .into_iter()
                .map(|tool| {
                    let input_schema = serde_json::from_str::<Value>(&tool.input_schema).map_err(
                        |_| VendorError::invalid_request("Anthropic tool schema must be valid JSON"),
                    )?;
                    Ok(ApiTool {
                        name: tool.name,
                        description: tool.description,
                        input_schema,
                    })
                })
                .collect::<Result<Vec<_>, VendorError>>()?,
        )
    };

    Ok(ApiRequest {
        model: request.model,
        system: request.system,
        messages: request
            .messages
            .into_iter()
            .map(|message| ApiMessage {
                role: message.role.as_str().to_string(),
                content: build_api_content(message.content, message.attachments),
            })
            .collect(),
        tools,
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens: request.max_tokens,
        stream: request.stream,
        extras: request.extras,
    })
}

fn parse_stop_reason(value: Option<&str>) -> AnthropicStopReason {
    match value {
        Some("end_turn") => AnthropicStopReason::EndTurn,
        Some("max_tokens") => AnthropicStopReason::MaxTokens,
        Some("tool_use") => AnthropicStopReason::ToolUse,
        _ => AnthropicStopReason::Other,
    }
}

fn parse_api_response(raw: Value) -> Result<AnthropicResponse, VendorError> {
    let parsed: ApiResponse = serde_json::from_value(raw.clone())
        .map_err(|err| VendorError::fault(format!("malformed Anthropic response: {err}")))?;

    let text = parsed
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    Ok(AnthropicResponse {
        model: parsed.model,
        text,
        stop_reason: parse_stop_reason(parsed.stop_reason.as_deref()),
        usage: parsed.usage.map(|usage| TokenUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        }),
        raw,
    })
}

#[derive(Debug)]
enum StreamEventAction {
    Text(String),
    StopReason(AnthropicStopReason),
    Stop,
    Ignore,
}

/// Decodes one SSE data payload. Event kinds carry their type inline, so
/// the `event:` field never needs inspecting.
fn decode_stream_event(payload: &str) -> Result<StreamEventAction, VendorError> {
    let event: ApiStreamEvent = serde_json::from_str(payload)
        .map_err(|err| VendorError::fault(format!("malformed Anthropic stream event: {err}")))?;

    match event.kind.as_str() {
        "content_block_delta" => {
            let text = event.delta.and_then(|delta| delta.text).unwrap_or_default();
            if text.is_empty() {
                Ok(StreamEventAction::Ignore)
            } else {
                Ok(StreamEventAction::Text(text))
            }
        }
        "message_delta" => Ok(StreamEventAction::StopReason(parse_stop_reason(
            event
                .delta
                .and_then(|delta| delta.stop_reason)
                .as_deref(),
        ))),
        "message_stop" => Ok(StreamEventAction::Stop),
        "error" => match event.error {
            Some(error) => Err(map_stream_error(&error.message, Some(error.kind.as_str()))),
            None => Err(VendorError::fault("Anthropic stream reported an unnamed error")),
        },
        _ => Ok(StreamEventAction::Ignore),
    }
}

fn map_stream_error(message: &str, error_kind: Option<&str>) -> VendorError {
    match error_kind {
        Some("rate_limit_error") => VendorError::rate_limited(message.to_string()),
        Some("authentication_error") | Some("permission_error") => {
            VendorError::auth(message.to_string())
        }
        Some("invalid_request_error") => VendorError::invalid_request(message.to_string()),
        _ => VendorError::fault(message.to_string()),
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_tokens: u32,
    stream: bool,
    #[serde(flatten)]
    extras: VendorExtras,
}

fn build_api_content(content: String, attachments: Vec<Attachment>) -> ApiContent {
    let images = attachments
        .into_iter()
        .filter(|attachment| attachment.kind == AttachmentKind::Image)
        .collect::<Vec<_>>();

    if images.is_empty() {
        return ApiContent::Text(content);
    }

    let mut blocks = Vec::with_capacity(images.len() + 1);
    if !content.is_empty() {
        blocks.push(ApiBlockOut::Text { text: content });
    }
    blocks.extend(images.into_iter().map(|attachment| ApiBlockOut::Image {
        source: ApiImageSource {
            kind: "url".to_string(),
            url: attachment.reference,
        },
    }));

    ApiContent::Blocks(blocks)
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: ApiContent,
}

/// Plain text when the message has no media, content blocks otherwise.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiBlockOut>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ApiBlockOut {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ApiImageSource },
}

#[derive(Debug, Serialize)]
struct ApiImageSource {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    #[serde(default)]
    content: Vec<ApiContentBlock>,
    stop_reason: Option<String>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiStreamEvent {
    #[serde(rename = "type")]
    kind: String,
    delta: Option<ApiStreamDelta>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamDelta {
    text: Option<String>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiModelList {
    data: Vec<ApiModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    kind: String,
    message: String,
}
