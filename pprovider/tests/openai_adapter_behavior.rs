#![cfg(feature = "vendor-openai")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use pprovider::adapters::openai::{
    OpenAiAdapter, OpenAiChunkStream, OpenAiFinishReason, OpenAiRequest, OpenAiResponse,
    OpenAiStreamChunk, OpenAiTransport, OpenAiUsage,
};
use pprovider::{
    AdapterFuture, CancellationToken, ChatMessage, ChatRequest, CredentialVault, FinishReason,
    Role, SecretString, ToolDefinition, VendorAdapter, VendorError, VendorErrorKind,
};

#[derive(Default)]
struct FakeTransport {
    captured_key: Mutex<Option<String>>,
    captured_request: Mutex<Option<OpenAiRequest>>,
    model_calls: AtomicU32,
}

impl OpenAiTransport for FakeTransport {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<OpenAiResponse, VendorError>> {
        Box::pin(async move {
            *self.captured_request.lock().expect("request lock") = Some(request);
            *self.captured_key.lock().expect("key lock") = Some(api_key.expose().to_string());

            Ok(OpenAiResponse {
                model: "gpt-4o-mini".to_string(),
                content: "hello world".to_string(),
                finish_reason: OpenAiFinishReason::Stop,
                usage: Some(OpenAiUsage {
                    prompt_tokens: 7,
                    completion_tokens: 3,
                    total_tokens: 10,
                }),
                raw: serde_json::json!({"id": "chatcmpl-1"}),
            })
        })
    }

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> AdapterFuture<'a, Result<OpenAiChunkStream, VendorError>> {
        Box::pin(async move {
            *self.captured_request.lock().expect("request lock") = Some(request);
            *self.captured_key.lock().expect("key lock") = Some(api_key.expose().to_string());

            let chunks = futures_util::stream::iter(vec![
                Ok(OpenAiStreamChunk::TextDelta("hello".to_string())),
                Ok(OpenAiStreamChunk::TextDelta(" world".to_string())),
                Ok(OpenAiStreamChunk::Finished(OpenAiFinishReason::Stop)),
            ]);

            Ok(Box::pin(chunks) as OpenAiChunkStream)
        })
    }

    fn list_models<'a>(
        &'a self,
        _api_key: SecretString,
    ) -> AdapterFuture<'a, Result<Vec<String>, VendorError>> {
        Box::pin(async move {
            self.model_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()])
        })
    }
}

fn adapter_with(transport: Arc<FakeTransport>) -> OpenAiAdapter {
    let vault = Arc::new(CredentialVault::new());
    vault
        .set_openai_api_key("sk-live-123")
        .expect("key should set");
    OpenAiAdapter::new(vault, transport)
}

#[tokio::test]
async fn send_maps_openai_response_to_chat_response() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = adapter_with(transport.clone());

    let request = ChatRequest::new("gpt-4o", vec![ChatMessage::new(Role::User, "hi")])
        .with_tools(vec![ToolDefinition {
            name: "lookup".to_string(),
            description: "Look up an id".to_string(),
            input_schema: "{\"type\":\"object\"}".to_string(),
        }]);

    let response = adapter
        .send(request, CancellationToken::new())
        .await
        .expect("send works");

    assert_eq!(response.vendor.as_str(), "openai");
    assert_eq!(response.text, "hello world");
    assert_eq!(response.finish, FinishReason::Stop);
    assert_eq!(response.usage.map(|usage| usage.total_tokens), Some(10));
    assert!(response.raw.is_some());

    let key = transport
        .captured_key
        .lock()
        .expect("key lock")
        .clone()
        .expect("key captured");
    assert_eq!(key, "sk-live-123");

    let captured = transport
        .captured_request
        .lock()
        .expect("request lock")
        .clone()
        .expect("request captured");
    assert_eq!(captured.model, "gpt-4o");
    assert_eq!(captured.messages.len(), 1);
    assert_eq!(captured.tools.len(), 1);
    assert!(!captured.stream);
}

#[tokio::test]
async fn empty_model_falls_back_to_adapter_default() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = adapter_with(transport.clone()).with_fallback_model("gpt-4.1-mini");

    let request = ChatRequest::new("", vec![ChatMessage::new(Role::User, "hi")]);
    adapter
        .send(request, CancellationToken::new())
        .await
        .expect("send works");

    let captured = transport
        .captured_request
        .lock()
        .expect("request lock")
        .clone()
        .expect("request captured");
    assert_eq!(captured.model, "gpt-4.1-mini");
}

#[tokio::test]
async fn stream_maps_chunks_and_marks_exactly_one_final_delta() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = adapter_with(transport.clone());

    let request =
        ChatRequest::new("gpt-4o-mini", vec![ChatMessage::new(Role::User, "hi")]).enable_streaming();

    let mut stream = adapter
        .send_stream(request, CancellationToken::new())
        .await
        .expect("stream opens");

    let mut text = String::new();
    let mut finals = 0;
    while let Some(delta) = stream.next().await {
        let delta = delta.expect("deltas are ok");
        text.push_str(&delta.text);
        if delta.is_final {
            finals += 1;
            assert_eq!(delta.finish, Some(FinishReason::Stop));
        }
    }

    assert_eq!(text, "hello world");
    assert_eq!(finals, 1);

    let captured = transport
        .captured_request
        .lock()
        .expect("request lock")
        .clone()
        .expect("request captured");
    assert!(captured.stream);
}

#[tokio::test]
async fn missing_credentials_fail_with_auth_on_first_use() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = OpenAiAdapter::new(Arc::new(CredentialVault::new()), transport);

    let request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::new(Role::User, "hi")]);
    let err = adapter
        .send(request, CancellationToken::new())
        .await
        .expect_err("missing key must fail");

    assert_eq!(err.kind, VendorErrorKind::Auth);
    assert!(err.message.contains("openai"));
}

#[tokio::test]
async fn malformed_api_keys_are_rejected_at_storage_time() {
    let vault = CredentialVault::new();
    let err = vault
        .set_openai_api_key("live-123")
        .expect_err("bad key shape must fail");
    assert_eq!(err.kind, VendorErrorKind::Auth);
}

#[tokio::test]
async fn pre_canceled_token_wins_the_race() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = adapter_with(transport);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::new(Role::User, "hi")]);
    let err = adapter
        .send(request, cancel)
        .await
        .expect_err("canceled token must fail");
    assert_eq!(err.kind, VendorErrorKind::Canceled);
}

#[tokio::test]
async fn model_listing_is_served_from_cache_within_ttl() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = adapter_with(transport.clone());

    let first = adapter.models().await.expect("models listed");
    let second = adapter.models().await.expect("models listed");

    assert_eq!(first, second);
    assert_eq!(transport.model_calls.load(Ordering::SeqCst), 1);
}
