//! OpenAI adapter over the injectable transport.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use pcommon::VendorName;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::catalog::ModelListCache;
use crate::{
    AdapterFuture, BoxedDeltaStream, ChatRequest, ChatResponse, CredentialVault, SecretString,
    StreamDelta, VendorAdapter, VendorError,
};

use super::transport::{OpenAiHttpTransport, OpenAiTransport};
use super::types::{OpenAiMessage, OpenAiRequest, OpenAiStreamChunk, OpenAiTool};

pub const OPENAI_VENDOR: &str = "openai";

impl CredentialVault {
    /// Stores an OpenAI API key for provider-authenticated requests.
    ///
    /// OpenAI keys are expected to start with `sk-`.
    pub fn set_openai_api_key(&self, api_key: impl Into<String>) -> Result<(), VendorError> {
        let api_key = api_key.into();
        if !api_key.starts_with("sk-") {
            return Err(VendorError::auth("OpenAI API key must start with 'sk-'"));
        }

        self.set_api_key(OPENAI_VENDOR, api_key)
    }
}

#[derive(Clone)]
pub struct OpenAiAdapter {
    vault: Arc<CredentialVault>,
    transport: Arc<dyn OpenAiTransport>,
    fallback_model: String,
    models: Arc<ModelListCache>,
}

impl OpenAiAdapter {
    pub fn new(vault: Arc<CredentialVault>, transport: Arc<dyn OpenAiTransport>) -> Self {
        Self {
            vault,
            transport,
            fallback_model: "gpt-4o-mini".to_string(),
            models: Arc::new(ModelListCache::default()),
        }
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub fn default_http_transport(client: Client) -> OpenAiHttpTransport {
        OpenAiHttpTransport::new(client)
    }

    fn api_key(&self) -> Result<SecretString, VendorError> {
        self.vault.require_api_key(OPENAI_VENDOR)
    }

    fn build_request(&self, request: ChatRequest, stream: bool) -> OpenAiRequest {
        let model = if request.model.trim().is_empty() {
            self.fallback_model.clone()
        } else {
            request.model
        };

        let messages = request
            .messages
            .into_iter()
            .map(OpenAiMessage::from)
            .collect::<Vec<_>>();

        let tools = request
            .tools
            .into_iter()
            .map(OpenAiTool::from)
            .collect::<Vec<_>>();

        OpenAiRequest {
            model,
            messages,
            tools,
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_tokens: request.options.max_tokens,
            stream,
            extras: request.extras,
        }
    }
}

impl VendorAdapter for OpenAiAdapter {
    fn vendor(&self) -> VendorName {
        VendorName::from(OPENAI_VENDOR)
    }

    fn send<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> AdapterFuture<'a, Result<ChatResponse, VendorError>> {
        Box::pin(async move {
            request.validate()?;
            let api_key = self.api_key()?;
            let openai_request = self.build_request(request, false);

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(VendorError::canceled("OpenAI request canceled"));
                }
                result = self.transport.complete(openai_request, api_key) => result?,
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
            let openai_request = self.build_request(request, true);

            let mut chunks = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(VendorError::canceled("OpenAI request canceled"));
                }
                result = self.transport.stream(openai_request, api_key) => result?,
            };

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    match chunk? {
                        OpenAiStreamChunk::TextDelta(delta) => {
                            yield StreamDelta::text(delta);
                        }
                        OpenAiStreamChunk::Finished(reason) => {
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
