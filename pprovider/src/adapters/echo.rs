//! Loopback vendor that answers with its own prompt.
//!
//! Useful for wiring tests and demos: `send` returns the flattened prompt
//! text verbatim, `send_stream` replays it in fixed-size chunks. Always
//! compiled; it needs no network, credentials, or features.

use pcommon::VendorName;
use tokio_util::sync::CancellationToken;

use crate::{
    AdapterFuture, BoxedDeltaStream, ChatRequest, ChatResponse, FinishReason, StreamDelta,
    VecDeltaStream, VendorAdapter, VendorError,
};

pub const ECHO_VENDOR: &str = "echo";

const DEFAULT_CHUNK_CHARS: usize = 16;

#[derive(Debug, Clone)]
pub struct EchoAdapter {
    chunk_chars: usize,
}

impl Default for EchoAdapter {
    fn default() -> Self {
        Self {
            chunk_chars: DEFAULT_CHUNK_CHARS,
        }
    }
}

impl EchoAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    fn flatten(request: &ChatRequest) -> String {
        request
            .messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl VendorAdapter for EchoAdapter {
    fn vendor(&self) -> VendorName {
        VendorName::from(ECHO_VENDOR)
    }

    fn send<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> AdapterFuture<'a, Result<ChatResponse, VendorError>> {
        Box::pin(async move {
            request.validate()?;
            if cancel.is_cancelled() {
                return Err(VendorError::canceled("echo request canceled"));
            }

            let text = Self::flatten(&request);

            Ok(ChatResponse {
                vendor: VendorName::from(ECHO_VENDOR),
                model: request.model,
                text,
                finish: FinishReason::Stop,
                usage: None,
                raw: None,
            })
        })
    }

    fn send_stream<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> AdapterFuture<'a, Result<BoxedDeltaStream, VendorError>> {
        Box::pin(async move {
            request.validate()?;
            if cancel.is_cancelled() {
                return Err(VendorError::canceled("echo request canceled"));
            }

            let text = Self::flatten(&request);
            let chars = text.chars().collect::<Vec<_>>();
            let mut deltas = chars
                .chunks(self.chunk_chars)
                .map(|chunk| Ok(StreamDelta::text(chunk.iter().collect::<String>())))
                .collect::<Vec<_>>();
            deltas.push(Ok(StreamDelta::finish(FinishReason::Stop)));

            Ok(Box::pin(VecDeltaStream::new(deltas)) as BoxedDeltaStream)
        })
    }

    fn models<'a>(&'a self) -> AdapterFuture<'a, Result<Vec<String>, VendorError>> {
        Box::pin(async move { Ok(vec![ECHO_VENDOR.to_string()]) })
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::{ChatMessage, Role};

    #[tokio::test]
    async fn send_returns_flattened_prompt_verbatim() {
        let adapter = EchoAdapter::new();
        let request = ChatRequest::new(
            "echo",
            vec![
                ChatMessage::new(Role::System, "Summarize the text."),
                ChatMessage::new(Role::User, "The sky is blue."),
            ],
        );

        let response = adapter
            .send(request, CancellationToken::new())
            .await
            .expect("echo send works");

        assert_eq!(response.text, "Summarize the text.\nThe sky is blue.");
        assert_eq!(response.finish, FinishReason::Stop);
        assert_eq!(response.vendor, VendorName::from("echo"));
    }

    #[tokio::test]
    async fn stream_replays_prompt_and_ends_with_final_delta() {
        let adapter = EchoAdapter::new().with_chunk_chars(4);
        let request = ChatRequest::new("echo", vec![ChatMessage::new(Role::User, "hello world")]);

        let mut stream = adapter
            .send_stream(request, CancellationToken::new())
            .await
            .expect("echo stream works");

        let mut collected = String::new();
        let mut finals = 0;
        while let Some(delta) = stream.next().await {
            let delta = delta.expect("deltas are ok");
            collected.push_str(&delta.text);
            if delta.is_final {
                finals += 1;
                assert_eq!(delta.finish, Some(FinishReason::Stop));
            }
        }

        assert_eq!(collected, "hello world");
        assert_eq!(finals, 1);
    }

    #[tokio::test]
    async fn pre_canceled_token_short_circuits() {
        let adapter = EchoAdapter::new();
        let request = ChatRequest::new("echo", vec![ChatMessage::new(Role::User, "hi")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = adapter
            .send(request, cancel)
            .await
            .expect_err("canceled token must fail");
        assert_eq!(err.kind, crate::VendorErrorKind::Canceled);
    }
}
