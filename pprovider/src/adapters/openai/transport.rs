//! OpenAI transport trait and reqwest-based HTTP implementation.

use std::pin::Pin;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, Response};

use crate::adapters::framing::{LineBuffer, sse_data};
use crate::adapters::http::{map_send_error, map_status, parse_retry_after};
use crate::{AdapterFuture, SecretString, VendorError};

use super::payload::{
    OpenAiApiModelList, OpenAiApiStreamResponse, build_api_request, extract_error_message,
    parse_api_response, parse_finish_reason,
};
use super::types::{OpenAiRequest, OpenAiResponse, OpenAiStreamChunk};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub type OpenAiChunkStream =
    Pin<Box<dyn Stream<Item = Result<OpenAiStreamChunk, VendorError>> + Send + 'static>>;

pub trait OpenAiTransport: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<OpenAiResponse, VendorError>>;

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<OpenAiChunkStream, VendorError>>;

    fn list_models<'a>(
        &'a self,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<Vec<String>, VendorError>>;
}

#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    client: Client,
    base_url: String,
    organization: Option<String>,
}

impl OpenAiHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: OPENAI_BASE_URL.to_string(),
            organization: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn apply_auth(
        &self,
        builder: reqwest::RequestBuilder,
        api_key: &SecretString,
    ) -> reqwest::RequestBuilder {
        let builder = builder.bearer_auth(api_key.expose());
        match &self.organization {
            Some(organization) => builder.header("OpenAI-Organization", organization),
            None => builder,
        }
    }

    async fn parse_error(response: Response) -> VendorError {
        let status = response.status();
        let retry_after = parse_retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("OpenAI request failed with status {status}"));

        map_status(status, message, retry_after)
    }
}

impl OpenAiTransport for OpenAiHttpTransport {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<OpenAiResponse, VendorError>> {
        Box::pin(async move {
            let api_request = build_api_request(request)?;
            let url = self.endpoint("chat/completions");
            let builder = self.client.post(url).json(&api_request);
            let response = self
                .apply_auth(builder, &api_key)
                .send()
                .await
                .map_err(map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let raw: serde_json::Value = response.json().await.map_err(map_send_error)?;
            parse_api_response(raw)
        })
    }

    fn stream<'a>(
        &'a self,
        mut request: OpenAiRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<OpenAiChunkStream, VendorError>> {
        Box::pin(async move {
            request.stream = true;
            let api_request = build_api_request(request)?;
            let url = self.endpoint("chat/completions");
            let builder = self.client.post(url).json(&api_request);
            let response = self
                .apply_auth(builder, &api_key)
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
                        let Some(payload) = sse_data(&line) else {
                            continue;
                        };

                        if payload == "[DONE]" {
                            finished = true;
                            break;
                        }

                        let parsed: OpenAiApiStreamResponse = serde_json::from_str(payload)
                            .map_err(|err| VendorError::fault(err.to_string()))?;

                        if let Some(choice) = parsed.choices.first() {
                            if let Some(content) = &choice.delta.content
                                && !content.is_empty()
                            {
                                yield OpenAiStreamChunk::TextDelta(content.clone());
                            }

                            if let Some(reason) = choice.finish_reason.as_deref() {
                                yield OpenAiStreamChunk::Finished(parse_finish_reason(Some(reason)));
                                finished = true;
                                break;
                            }
                        }
                    }

                    if finished {
                        break;
                    }
                }
            };

            Ok(Box::pin(stream) as OpenAiChunkStream)
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
                .apply_auth(builder, &api_key)
                .send()
                .await
                .map_err(map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let parsed: OpenAiApiModelList = response.json().await.map_err(map_send_error)?;

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
