//! Full-surface wiring tests over the echo loopback vendor: assemble at
//! the prompt layer, dispatch through the registry, observe the uniform
//! response contract. No network involved.

use parlance::prelude::*;

fn echo_dispatcher() -> Dispatcher {
    let (registry, _vault) = bootstrap_registry(vec![]).expect("bootstrap works");
    Dispatcher::new(registry)
}

#[tokio::test]
async fn summarize_pattern_round_trips_through_the_echo_vendor() {
    let dispatcher = echo_dispatcher();

    let pattern = Pattern::new("summarize", "Summarize the text.");
    let request = assemble(
        Some(&pattern),
        None,
        &[],
        "The sky is blue.",
        GenerationOptions::default(),
    )
    .expect("assembly works");

    let response = dispatcher
        .send(request, "echo", "echo")
        .await
        .expect("dispatch works");

    assert_eq!(response.text, "Summarize the text.\nThe sky is blue.");
    assert_eq!(response.finish, FinishReason::Stop);
    assert_eq!(response.vendor, VendorName::from("echo"));
}

#[tokio::test]
async fn streamed_dispatch_delivers_the_same_text_incrementally() {
    let dispatcher = echo_dispatcher();

    let pattern = Pattern::new("summarize", "Summarize the text.");
    let request = assemble(
        Some(&pattern),
        None,
        &[],
        "The sky is blue.",
        GenerationOptions::default().enable_streaming(),
    )
    .expect("assembly works");

    let outcome = dispatcher
        .dispatch(request, "echo", "echo")
        .await
        .expect("dispatch works");
    let DispatchOutcome::Stream(stream) = outcome else {
        panic!("streaming request must yield a stream");
    };

    let (text, finish, error) = collect_stream_text(stream).await;
    assert!(error.is_none());
    assert_eq!(text, "Summarize the text.\nThe sky is blue.");
    assert_eq!(finish, Some(FinishReason::Stop));
}

#[tokio::test]
async fn strategy_text_lands_exactly_where_the_ordering_rule_says() {
    let dispatcher = echo_dispatcher();

    let pattern = Pattern::new("summarize", "Summarize the text.");
    let strategy = Strategy::new(
        "chain-of-thought",
        "\nThink step by step.",
        "\nShow your reasoning.",
    );
    let context = vec![user_message("earlier question"), assistant_message("earlier answer")];

    let request = assemble(
        Some(&pattern),
        Some(&strategy),
        &context,
        "The sky is blue.",
        GenerationOptions::default(),
    )
    .expect("assembly works");

    let response = dispatcher
        .send(request, "echo", "echo")
        .await
        .expect("dispatch works");

    let expected = [
        "Summarize the text.\nThink step by step.",
        "earlier question",
        "earlier answer",
        "The sky is blue.\nShow your reasoning.",
    ]
    .join("\n");
    assert_eq!(response.text, expected);
}

#[tokio::test]
async fn dispatching_to_an_unregistered_vendor_is_an_unknown_vendor_error() {
    let dispatcher = echo_dispatcher();

    let request = assemble(None, None, &[], "hi", GenerationOptions::default())
        .expect("assembly works");

    let err = dispatcher
        .send(request, "closed-ai", "model-x")
        .await
        .expect_err("unknown vendor must fail");
    assert_eq!(err.kind, DispatchErrorKind::UnknownVendor);
}

#[tokio::test]
async fn registry_reports_echo_models_without_network() {
    let (registry, _vault) = bootstrap_registry(vec![]).expect("bootstrap works");

    let models = registry.list_models("echo").await.expect("models listed");
    assert_eq!(models, vec!["echo".to_string()]);

    let descriptor = registry.descriptor("echo").expect("descriptor exists");
    assert!(descriptor.capabilities.streaming);
}

#[tokio::test]
async fn bootstrapping_the_same_vendor_twice_is_rejected() {
    let err = bootstrap_registry(vec![
        VendorBuildConfig::new("echo"),
        VendorBuildConfig::new("echo"),
    ])
    .expect_err("duplicate vendor must fail");

    assert_eq!(err.kind, VendorErrorKind::InvalidRequest);
    assert!(err.message.contains("already registered"));
}
