use reqwest::StatusCode;
use serde_json::json;

use crate::adapters::openai::{OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiRole, OpenAiTool};
use crate::{Attachment, VendorErrorKind, VendorExtras};

use super::payload::{build_api_request, parse_api_response, parse_finish_reason};
use crate::adapters::http::map_status;

fn message(role: OpenAiRole, content: &str) -> OpenAiMessage {
    OpenAiMessage {
        role,
        content: content.to_string(),
        attachments: Vec::new(),
    }
}

fn request_with(messages: Vec<OpenAiMessage>) -> OpenAiRequest {
    OpenAiRequest {
        model: "gpt-4o-mini".to_string(),
        messages,
        tools: Vec::new(),
        temperature: None,
        top_p: None,
        max_tokens: None,
        stream: false,
        extras: VendorExtras::new(),
    }
}

#[test]
fn api_request_flattens_vendor_extras_into_body() {
    let mut request = request_with(vec![message(OpenAiRole::User, "hi")]);
    request.extras.insert("seed".to_string(), json!(42));
    request.extras.insert("logprobs".to_string(), json!(true));

    let api_request = build_api_request(request).expect("request should build");
    let body = serde_json::to_value(&api_request).expect("request serializes");

    assert_eq!(body["seed"], json!(42));
    assert_eq!(body["logprobs"], json!(true));
    assert_eq!(body["model"], json!("gpt-4o-mini"));
    assert!(body.get("temperature").is_none());
}

#[test]
fn api_request_rejects_empty_non_assistant_content() {
    let request = request_with(vec![message(OpenAiRole::User, "   ")]);

    let err = build_api_request(request).expect_err("empty content must fail");
    assert_eq!(err.kind, VendorErrorKind::InvalidRequest);
}

#[test]
fn image_attachments_turn_content_into_parts() {
    let mut with_image = message(OpenAiRole::User, "what is in this image?");
    with_image.attachments.push(Attachment::image("https://example.com/cat.png"));
    with_image.attachments.push(Attachment::audio("https://example.com/meow.wav"));
    let request = request_with(vec![with_image]);

    let api_request = build_api_request(request).expect("request builds");
    let body = serde_json::to_value(&api_request).expect("request serializes");

    let content = &body["messages"][0]["content"];
    assert_eq!(content[0]["type"], json!("text"));
    assert_eq!(content[0]["text"], json!("what is in this image?"));
    assert_eq!(content[1]["type"], json!("image_url"));
    assert_eq!(
        content[1]["image_url"]["url"],
        json!("https://example.com/cat.png")
    );
    assert_eq!(
        content.as_array().map(Vec::len),
        Some(2),
        "audio references are not forwarded"
    );
}

#[test]
fn plain_messages_keep_string_content() {
    let request = request_with(vec![message(OpenAiRole::User, "hi")]);

    let api_request = build_api_request(request).expect("request builds");
    let body = serde_json::to_value(&api_request).expect("request serializes");

    assert_eq!(body["messages"][0]["content"], json!("hi"));
}

#[test]
fn api_request_rejects_malformed_tool_schema() {
    let mut request = request_with(vec![message(OpenAiRole::User, "hi")]);
    request.tools.push(OpenAiTool {
        name: "lookup".to_string(),
        description: "Look up an id".to_string(),
        input_schema: "{not json".to_string(),
    });

    let err = build_api_request(request).expect_err("bad schema must fail");
    assert_eq!(err.kind, VendorErrorKind::InvalidRequest);
}

#[test]
fn finish_reason_parsing_covers_documented_values() {
    assert_eq!(parse_finish_reason(Some("stop")), OpenAiFinishReason::Stop);
    assert_eq!(parse_finish_reason(Some("length")), OpenAiFinishReason::Length);
    assert_eq!(
        parse_finish_reason(Some("tool_calls")),
        OpenAiFinishReason::ToolCalls
    );
    assert_eq!(
        parse_finish_reason(Some("content_filter")),
        OpenAiFinishReason::Other
    );
    assert_eq!(parse_finish_reason(None), OpenAiFinishReason::Other);
}

#[test]
fn api_response_parsing_keeps_raw_payload() {
    let raw = json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "message": {"content": "hello world"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
    });

    let response = parse_api_response(raw.clone()).expect("response parses");
    assert_eq!(response.content, "hello world");
    assert_eq!(response.finish_reason, OpenAiFinishReason::Stop);
    assert_eq!(response.usage.map(|usage| usage.total_tokens), Some(10));
    assert_eq!(response.raw, raw);
}

#[test]
fn api_response_without_choices_is_a_vendor_fault() {
    let raw = json!({"model": "gpt-4o-mini", "choices": []});
    let err = parse_api_response(raw).expect_err("choiceless response must fail");
    assert_eq!(err.kind, VendorErrorKind::VendorFault);
}

#[test]
fn status_mapping_is_exhaustive_over_the_canonical_kinds() {
    let kind = |status| map_status(status, "detail".to_string(), None).kind;

    assert_eq!(kind(StatusCode::UNAUTHORIZED), VendorErrorKind::Auth);
    assert_eq!(kind(StatusCode::FORBIDDEN), VendorErrorKind::Auth);
    assert_eq!(kind(StatusCode::TOO_MANY_REQUESTS), VendorErrorKind::RateLimited);
    assert_eq!(kind(StatusCode::BAD_REQUEST), VendorErrorKind::InvalidRequest);
    assert_eq!(kind(StatusCode::UNPROCESSABLE_ENTITY), VendorErrorKind::InvalidRequest);
    assert_eq!(kind(StatusCode::REQUEST_TIMEOUT), VendorErrorKind::VendorFault);
    assert_eq!(kind(StatusCode::INTERNAL_SERVER_ERROR), VendorErrorKind::VendorFault);
    assert_eq!(kind(StatusCode::BAD_GATEWAY), VendorErrorKind::VendorFault);
    assert_eq!(kind(StatusCode::SERVICE_UNAVAILABLE), VendorErrorKind::VendorFault);
}

#[test]
fn rate_limit_mapping_carries_the_retry_after_hint() {
    let error = map_status(
        StatusCode::TOO_MANY_REQUESTS,
        "slow down".to_string(),
        Some(std::time::Duration::from_secs(7)),
    );

    assert_eq!(error.kind, VendorErrorKind::RateLimited);
    assert!(error.retryable);
    assert_eq!(error.retry_after, Some(std::time::Duration::from_secs(7)));
}
