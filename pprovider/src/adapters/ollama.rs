//! Ollama adapter speaking the native local API.
//!
//! Ollama needs no credentials and streams NDJSON rather than SSE: one
//! JSON object per line with a `done` flag on the last. Model discovery
//! uses `GET /api/tags`.

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

use crate::adapters::framing::LineBuffer;
use crate::adapters::http::{map_send_error, map_status, parse_retry_after};
use crate::catalog::ModelListCache;
use crate::{
    AdapterFuture, BoxedDeltaStream, ChatRequest, ChatResponse, FinishReason, Role, StreamDelta,
    TokenUsage, VendorAdapter, VendorError, VendorExtras,
};

pub const OLLAMA_VENDOR: &str = "ollama";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, PartialEq)]
pub struct OllamaRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
    pub extras: VendorExtras,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OllamaDoneReason {
    Stop,
    Length,
    Other,
}

impl From<OllamaDoneReason> for FinishReason {
    fn from(value: OllamaDoneReason) -> Self {
        match value {
            OllamaDoneReason::Stop => Self::Stop,
            OllamaDoneReason::Length => Self::Length,
            OllamaDoneReason::Other => Self::Stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OllamaResponse {
    pub model: String,
    pub text: String,
    pub done_reason: OllamaDoneReason,
    pub usage: Option<TokenUsage>,
    pub raw: Value,
}

impl OllamaResponse {
    fn into_chat_response(self) -> ChatResponse {
        ChatResponse {
            vendor: VendorName::from(OLLAMA_VENDOR),
            model: self.model,
            text: self.text,
            finish: self.done_reason.into(),
            usage: self.usage,
            raw: Some(self.raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OllamaStreamChunk {
    TextDelta(String),
    Finished(OllamaDoneReason),
}

pub type OllamaChunkStream =
    Pin<Box<dyn Stream<Item = Result<OllamaStreamChunk, VendorError>> + Send + 'static>>;

pub trait OllamaTransport: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: OllamaRequest,
    ) -> AdapterFuture<'a, Result<OllamaResponse, VendorError>>;

    fn stream<'a>(
        &'a self,
        request: OllamaRequest,
    ) -> AdapterFuture<'a, Result<OllamaChunkStream, VendorError>>;

    fn list_models<'a>(&'a self) -> AdapterFuture<'a, Result<Vec<String>, VendorError>>;
}

#[derive(Clone)]
pub struct OllamaAdapter {
    transport: Arc<dyn OllamaTransport>,
    fallback_model: String,
    models: Arc<ModelListCache>,
}

impl OllamaAdapter {
    pub fn new(transport: Arc<dyn OllamaTransport>) -> Self {
        Self {
            transport,
            fallback_model: "llama3.2".to_string(),
            models: Arc::new(ModelListCache::default()),
        }
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub fn default_http_transport(client: Client) -> OllamaHttpTransport {
        OllamaHttpTransport::new(client)
    }

    fn build_request(&self, request: ChatRequest, stream: bool) -> OllamaRequest {
        let model = if request.model.trim().is_empty() {
            self.fallback_model.clone()
        } else {
            request.model
        };

        let messages = request
            .messages
            .into_iter()
            .map(|message| OllamaMessage {
                role: match message.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                }
                .to_string(),
                content: message.content,
            })
            .collect::<Vec<_>>();

        OllamaRequest {
            model,
            messages,
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_tokens: request.options.max_tokens,
            stream,
            extras: request.extras,
        }
    }
}

impl VendorAdapter for OllamaAdapter {
    fn vendor(&self) -> VendorName {
        VendorName::from(OLLAMA_VENDOR)
    }

    fn send<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> AdapterFuture<'a, Result<ChatResponse, VendorError>> {
        Box::pin(async move {
            request.validate()?;
            let ollama_request = self.build_request(request, false);

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(VendorError::canceled("Ollama request canceled"));
                }
                result = self.transport.complete(ollama_request) => result?,
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
            let ollama_request = self.build_request(request, true);

            let mut chunks = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(VendorError::canceled("Ollama request canceled"));
                }
                result = self.transport.stream(ollama_request) => result?,
            };

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    match chunk? {
                        OllamaStreamChunk::TextDelta(delta) => {
                            yield StreamDelta::text(delta);
                        }
                        OllamaStreamChunk::Finished(reason) => {
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

            let models = self.transport.list_models().await?;
            self.models.store(models.clone());
            Ok(models)
        })
    }
}

#[derive(Debug, Clone)]
pub struct OllamaHttpTransport {
    client: Client,
    base_url: String,
}

impl OllamaHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: OLLAMA_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn parse_error(response: Response) -> VendorError {
        let status = response.status();
        let retry_after = parse_retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("Ollama request failed with status {status}: {}", truncate(&body, 512)));

        map_status(status, message, retry_after)
    }
}

impl OllamaTransport for OllamaHttpTransport {
    fn complete<'a>(
        &'a self,
        request: OllamaRequest,
    ) -> AdapterFuture<'a, Result<OllamaResponse, VendorError>> {
        Box::pin(async move {
            let api_request = build_api_request(request)?;
            let url = self.endpoint("api/chat");
            let response = self
                .client
                .post(url)
                .json(&api_request)
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
        mut request: OllamaRequest,
    ) -> AdapterFuture<'a, Result<OllamaChunkStream, VendorError>> {
        Box::pin(async move {
            request.stream = true;
            let api_request = build_api_request(request)?;
            let url = self.endpoint("api/chat");
            let response = self
                .client
                .post(url)
                .json(&api_request)
                .send()
                .await
                .map_err(map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut lines = LineBuffer::new();
                let mut finished = false;

                while let Some(item) = chunks.next().await {
                    let bytes = item.map_err(|err| VendorError::fault(err.to_string()))?;
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|err| VendorError::fault(err.to_string()))?;

                    for line in lines.push(text) {
                        if line.is_empty() {
                            continue;
                        }

                        let parsed: ApiStreamResponse = serde_json::from_str(&line)
                            .map_err(|err| VendorError::fault(err.to_string()))?;

                        if let Some(message) = &parsed.message
                            && !message.content.is_empty()
                        {
                            yield OllamaStreamChunk::TextDelta(message.content.clone());
                        }

                        if parsed.done {
                            yield OllamaStreamChunk::Finished(parse_done_reason(
                                parsed.done_reason.as_deref(),
                            ));
                            finished = true;
                            break;
                        }
                    }

                    if finished {
                        break;
                    }
                }
            };

            Ok(Box::pin(stream) as OllamaChunkStream)
        })
    }

    fn list_models<'a>(&'a self) -> AdapterFuture<'a, Result<Vec<String>, VendorError>> {
        Box::pin(async move {
            let url = self.endpoint("api/tags");
            let response = self.client.get(url).send().await.map_err(map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let parsed: ApiTagsResponse = response.json().await.map_err(map_send_error)?;

            let mut ids = parsed
                .models
                .into_iter()
                .map(|model| model.name)
                .collect::<Vec<_>>();
            ids.sort();
            Ok(ids)
        })
    }
}

fn build_api_request(request: OllamaRequest) -> Result<ApiRequest, VendorError> {
    if request.messages.is_empty() {
        return Err(VendorError::invalid_request(
            "Ollama request requires at least one message",
        ));
    }

    let options = ApiOptions {
        temperature: request.temperature,
        top_p: request.top_p,
        num_predict: request.max_tokens,
    };

    Ok(ApiRequest {
        model: request.model,
        messages: request
            .messages
            .into_iter()
            .map(|message| ApiMessage {
                role: message.role,
                content: message.content,
            })
            .collect(),
        stream: request.stream,
        options,
        extras: request.extras,
    })
}

fn parse_done_reason(value: Option<&str>) -> OllamaDoneReason {
    match value {
        Some("stop") => OllamaDoneReason::Stop,
        Some("length") => OllamaDoneReason::Length,
        _ => OllamaDoneReason::Other,
    }
}

fn parse_api_response(raw: Value) -> Result<OllamaResponse, VendorError> {
    let parsed: ApiChatResponse = serde_json::from_value(raw.clone())
        .map_err(|err| VendorError::fault(format!("malformed Ollama response: {err}")))?;

    let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
        (None, None) => None,
        (input, output) => {
            let input_tokens = input.unwrap_or(0);
            let output_tokens = output.unwrap_or(0);
            Some(TokenUsage {
                input_tokens,
                output_tokens,
                total_tokens: input_tokens + output_tokens,
            })
        }
    };

    Ok(OllamaResponse {
        model: parsed.model,
        text: parsed
            .message
            .map(|message| message.content)
            .unwrap_or_default(),
        done_reason: parse_done_reason(parsed.done_reason.as_deref()),
        usage,
        raw,
    })
}

fn truncate(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }

    let mut end = max;
    while !input.is_char_boundary(end) {
        end -= 1;
    }

    let mut output = input[..end].to_string();
    output.push_str("...");
    output
}

fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok()?;
    Some(parsed.error)
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
    options: ApiOptions,
    #[serde(flatten)]
    extras: VendorExtras,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    model: String,
    message: Option<ApiResponseMessage>,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiStreamResponse {
    message: Option<ApiResponseMessage>,
    #[serde(default)]
    done: bool,
    done_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: String,
}

#[derive(Debug, Deserialize)]
struct ApiTagsResponse {
    #[serde(default)]
    models: Vec<ApiModelTag>,
}

#[derive(Debug, Deserialize)]
struct ApiModelTag {
    name: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{ChatMessage, VendorErrorKind};

    #[test]
    fn api_request_maps_max_tokens_to_num_predict() {
        let request = OllamaRequest {
            model: "llama3.2".to_string(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            temperature: Some(0.4),
            top_p: None,
            max_tokens: Some(64),
            stream: false,
            extras: VendorExtras::new(),
        };

        let api_request = build_api_request(request).expect("request builds");
        let body = serde_json::to_value(&api_request).expect("request serializes");

        assert_eq!(body["options"]["num_predict"], json!(64));
        assert_eq!(body["options"]["temperature"], json!(0.4));
        assert!(body["options"].get("top_p").is_none());
    }

    #[test]
    fn api_request_rejects_empty_prompts() {
        let request = OllamaRequest {
            model: "llama3.2".to_string(),
            messages: Vec::new(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: false,
            extras: VendorExtras::new(),
        };

        let err = build_api_request(request).expect_err("empty prompt must fail");
        assert_eq!(err.kind, VendorErrorKind::InvalidRequest);
    }

    #[test]
    fn api_response_parsing_reads_usage_counts() {
        let raw = json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "hello"},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 9,
            "eval_count": 4
        });

        let response = parse_api_response(raw).expect("response parses");
        assert_eq!(response.text, "hello");
        assert_eq!(response.done_reason, OllamaDoneReason::Stop);
        assert_eq!(response.usage.map(|usage| usage.total_tokens), Some(13));
    }

    #[test]
    fn adapter_substitutes_fallback_model() {
        struct NoopTransport;

        impl OllamaTransport for NoopTransport {
            fn complete<'a>(
                &'a self,
                _request: OllamaRequest,
            ) -> AdapterFuture<'a, Result<OllamaResponse, VendorError>> {
                Box::pin(async move { Err(VendorError::fault("not wired")) })
            }

            fn stream<'a>(
                &'a self,
                _request: OllamaRequest,
            ) -> AdapterFuture<'a, Result<OllamaChunkStream, VendorError>> {
                Box::pin(async move { Err(VendorError::fault("not wired")) })
            }

            fn list_models<'a>(&'a self) -> AdapterFuture<'a, Result<Vec<String>, VendorError>> {
                Box::pin(async move { Err(VendorError::fault("not wired")) })
            }
        }

        let adapter = OllamaAdapter::new(Arc::new(NoopTransport)).with_fallback_model("qwen2.5");
        let request = ChatRequest::new("", vec![ChatMessage::new(Role::User, "hi")]);

        let built = adapter.build_request(request, false);
        assert_eq!(built.model, "qwen2.5");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 512), "short");
        let truncated = truncate("héllo wörld", 3);
        assert!(truncated.ends_with("..."));
    }
}
