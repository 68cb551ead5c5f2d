//! Model invocation against mock HTTP endpoints.

use std::sync::Arc;

use relaychat::providers::{
    LlmProvider, LocalBinding, ModelInvoker, ProviderError, WorkersAiProvider,
};
use relaychat::session::Message;
use serde_json::json;
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCOUNT: &str = "acct-123";
const TOKEN: &str = "token-abc";

fn binding(server: &MockServer) -> Arc<dyn LlmProvider> {
    Arc::new(LocalBinding::try_new(server.uri(), 5).unwrap())
}

fn rest(server: &MockServer) -> Arc<dyn LlmProvider> {
    Arc::new(WorkersAiProvider::try_new(ACCOUNT, TOKEN, server.uri(), 5).unwrap())
}

fn messages() -> Vec<Message> {
    vec![
        Message::system("You are a friendly chatbot."),
        Message::user("Hello!"),
    ]
}

#[tokio::test]
async fn test_binding_reply_is_returned() {
    let local = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/run/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Hi there!"})))
        .expect(1)
        .mount(&local)
        .await;

    let invoker = ModelInvoker::new(Some(binding(&local)), None);
    assert_eq!(invoker.run(messages()).await.unwrap(), "Hi there!");
}

#[tokio::test]
async fn test_remote_binding_falls_back_to_rest() {
    let local = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/run/"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": "Binding AI needs to be run remotely"})),
        )
        .expect(1)
        .mount(&local)
        .await;

    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/accounts/acct-123/ai/run/"))
        .and(header("authorization", "Bearer token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {"response": "From REST"}
        })))
        .expect(1)
        .mount(&remote)
        .await;

    let invoker = ModelInvoker::new(Some(binding(&local)), Some(rest(&remote)));
    assert_eq!(invoker.run(messages()).await.unwrap(), "From REST");
}

#[tokio::test]
async fn test_remote_binding_without_credentials_surfaces_binding_error() {
    let local = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string("binding ai NEEDS to be run REMOTELY"),
        )
        .mount(&local)
        .await;

    let invoker = ModelInvoker::new(Some(binding(&local)), None);
    let err = invoker.run(messages()).await.unwrap_err();

    assert!(err.is_fallback_eligible());
    assert_eq!(err.to_string(), "binding ai NEEDS to be run REMOTELY");
}

#[tokio::test]
async fn test_other_binding_failure_does_not_reach_rest() {
    let local = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "model overloaded"})))
        .mount(&local)
        .await;

    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(0)
        .mount(&remote)
        .await;

    let invoker = ModelInvoker::new(Some(binding(&local)), Some(rest(&remote)));
    let err = invoker.run(messages()).await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::Provider {
            message: "model overloaded".to_string()
        }
    );
}

#[tokio::test]
async fn test_binding_tls_failure_is_classified() {
    let local = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_string("error:0A000410:SSL routines::sslv3 alert handshake failure"),
        )
        .mount(&local)
        .await;

    let invoker = ModelInvoker::new(Some(binding(&local)), None);
    let err = invoker.run(messages()).await.unwrap_err();
    assert!(err.is_tls_interception());
}

#[tokio::test]
async fn test_rest_sends_full_message_list() {
    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/accounts/acct-123/ai/run/"))
        .and(wiremock::matchers::body_json(json!({
            "messages": [
                {"role": "system", "content": "You are a friendly chatbot."},
                {"role": "user", "content": "Hello!"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {"output_text": "ok"}
        })))
        .expect(1)
        .mount(&remote)
        .await;

    let invoker = ModelInvoker::new(None, Some(rest(&remote)));
    assert_eq!(invoker.run(messages()).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_rest_http_error_keeps_body_excerpt() {
    let remote = MockServer::start().await;
    let long_body = "x".repeat(500);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(long_body))
        .mount(&remote)
        .await;

    let invoker = ModelInvoker::new(None, Some(rest(&remote)));
    let err = invoker.run(messages()).await.unwrap_err();

    match err {
        ProviderError::Http { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body.chars().count(), 200);
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rest_unsuccessful_payload_is_an_error() {
    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{"message": "bad input"}]
        })))
        .mount(&remote)
        .await;

    let invoker = ModelInvoker::new(None, Some(rest(&remote)));
    let err = invoker.run(messages()).await.unwrap_err();
    assert_eq!(err.to_string(), "Cloudflare AI returned an error response.");
}

#[tokio::test]
async fn test_rest_missing_result_yields_empty_reply() {
    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&remote)
        .await;

    let invoker = ModelInvoker::new(None, Some(rest(&remote)));
    assert_eq!(invoker.run(messages()).await.unwrap(), "");
}

#[tokio::test]
async fn test_no_backend_configured() {
    let invoker = ModelInvoker::new(None, None);
    let err = invoker.run(messages()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "AI binding unavailable and no API token configured."
    );
}
