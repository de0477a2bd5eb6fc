use std::time::Duration;

use pitch_verdict::gateway::{
    Attribution, ChatGateway, ChatModel, ChatRequest, FinishReason, Message, OpenRouterAdapter,
    ProviderError,
};
use pitch_verdict::{PipelineError, Stage};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer, timeout: Duration) -> OpenRouterAdapter {
    OpenRouterAdapter::with_config("sk-test", server.uri(), timeout, None, Some("pitch-tests".into()))
        .unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(
        ChatModel::openrouter("anthropic/claude-sonnet-4"),
        vec![Message::system("sys"), Message::user("hi")],
        Attribution::new("test"),
    )
}

fn ok_body(content: &str) -> Value {
    json!({
        "choices": [{
            "message": { "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 20 }
    })
}

#[tokio::test]
async fn openrouter_parses_success_content_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-title", "pitch-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("hello")))
        .mount(&server)
        .await;

    let resp = adapter(&server, Duration::from_secs(5))
        .chat(request())
        .await
        .unwrap();
    assert_eq!(resp.content, "hello");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.input_tokens, 10);
    assert_eq!(resp.output_tokens, 20);
}

#[tokio::test]
async fn openrouter_omits_unset_temperature_and_sends_json_mode() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("{}")))
        .mount(&server)
        .await;

    let gateway = adapter(&server, Duration::from_secs(5));
    gateway
        .chat(request().temperature(None).max_tokens(256).json())
        .await
        .unwrap();
    gateway
        .chat(request().temperature(Some(0.3)))
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);

    let first: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(first.get("temperature").is_none());
    assert_eq!(first["max_tokens"], 256);
    assert_eq!(first["response_format"]["type"], "json_object");
    assert_eq!(first["messages"][0]["role"], "system");
    assert_eq!(first["model"], "anthropic/claude-sonnet-4");

    let second: Value = serde_json::from_slice(&received[1].body).unwrap();
    assert!((second["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    assert!(second.get("response_format").is_none());
}

#[tokio::test]
async fn openrouter_falls_back_to_tool_call_arguments_when_content_empty() {
    let server = MockServer::start().await;
    let args = r#"{"verdict": "pass"}"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{"function": {"arguments": args}}]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let resp = adapter(&server, Duration::from_secs(5))
        .chat(request().json())
        .await
        .unwrap();
    assert_eq!(resp.content, args);
    assert_eq!(resp.finish_reason, FinishReason::ToolCalls);
    // usage is optional
    assert_eq!(resp.input_tokens, 0);
}

#[tokio::test]
async fn openrouter_passes_apologies_through_as_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_body("```text\nSorry, I can't help with that.\n```")),
        )
        .mount(&server)
        .await;

    let resp = adapter(&server, Duration::from_secs(5))
        .chat(request())
        .await
        .unwrap();
    assert!(resp.content.contains("Sorry"));
}

#[tokio::test]
async fn openrouter_classifies_http_429_as_rate_limit_and_keeps_context() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-request-id", "abc123")
                .set_body_json(json!({
                    "error": { "message": "rate limited", "code": "rate_limit_exceeded" }
                })),
        )
        .mount(&server)
        .await;

    let err = adapter(&server, Duration::from_secs(5))
        .chat(request())
        .await
        .unwrap_err();
    match err {
        ProviderError::RateLimited {
            retry_after,
            context,
        } => {
            assert_eq!(retry_after, Duration::from_secs(60));
            let ctx = context.expect("expected error context");
            assert_eq!(ctx.http_status, Some(429));
            assert_eq!(ctx.provider_code.as_deref(), Some("rate_limit_exceeded"));
            assert_eq!(ctx.request_id.as_deref(), Some("abc123"));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn openrouter_server_errors_surface_status_without_retrying() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "message": "overloaded", "code": 503 }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server, Duration::from_secs(5))
        .chat(request())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.context().unwrap().provider_code.as_deref(), Some("503"));

    let wrapped = PipelineError::from_provider(Stage::RiskFirst, err, Duration::ZERO);
    assert_eq!(wrapped.status_code(), 503);
    assert_eq!(wrapped.code(), "upstream_error");

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn openrouter_transport_timeout_maps_to_stage_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_body("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = adapter(&server, Duration::from_millis(200))
        .chat(request())
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err:?}");

    let wrapped = PipelineError::from_provider(Stage::Adjudication, err, Duration::from_millis(200));
    assert!(matches!(
        wrapped,
        PipelineError::UpstreamTimeout {
            stage: Stage::Adjudication,
            ..
        }
    ));
    assert_eq!(wrapped.status_code(), 504);
}

#[tokio::test]
async fn openrouter_rejects_oversized_input_before_sending() {
    let server = MockServer::start().await;

    let huge = "x".repeat(500_001);
    let req = ChatRequest::new(
        ChatModel::openrouter("anthropic/claude-sonnet-4"),
        vec![Message::user(huge)],
        Attribution::new("test"),
    );

    let err = adapter(&server, Duration::from_secs(5))
        .chat(req)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}
