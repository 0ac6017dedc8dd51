//! Integration tests for the OpenAI-compatible backend against a mock server.

#![cfg(feature = "openai")]

use lens_core::defaults::IMAGE_SAFETY_BLOCKED;
use lens_core::{Error, GenerationBackend, GenerationOptions};
use lens_inference::openai::{OpenAIBackend, OpenAIConfig};
use lens_inference::{ImageGenerationBackend, VisionBackend};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

fn backend_for(server: &MockServer) -> OpenAIBackend {
    let config = OpenAIConfig::default()
        .with_base_url(server.uri())
        .with_api_key("test-key")
        .with_gen_model("test-gen");
    OpenAIBackend::new(config).unwrap()
}

#[tokio::test]
async fn test_generation_sends_auth_and_attribution_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("HTTP-Referer", "https://virallens.app"))
        .and(header("X-Title", "ViralLens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("## Analysis")))
        .expect(1)
        .mount(&server)
        .await;

    let config = OpenAIConfig {
        http_referer: Some("https://virallens.app".to_string()),
        x_title: Some("ViralLens".to_string()),
        ..OpenAIConfig::default()
            .with_base_url(server.uri())
            .with_api_key("test-key")
    };
    let backend = OpenAIBackend::new(config).unwrap();

    let out = backend.generate("Analyze this").await.unwrap();
    assert_eq!(out, "## Analysis");
}

#[tokio::test]
async fn test_json_mode_and_temperature_in_request_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-gen",
            "response_format": {"type": "json_object"},
            "temperature": 0.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("[]")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let options = GenerationOptions::default().with_temperature(0.5).json();
    let out = backend
        .generate_with_options("", "ideas please", &options)
        .await
        .unwrap();
    assert_eq!(out, "[]");
}

#[tokio::test]
async fn test_system_prompt_is_first_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("hi")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    assert_eq!(
        backend.generate_with_system("be brief", "hello").await.unwrap(),
        "hi"
    );
}

#[tokio::test]
async fn test_vision_sends_data_url_content_part() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is shown?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,aW1n"}}
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("  A red bike.  ")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let description = backend
        .describe_image(b"img", "image/png", Some("What is shown?"))
        .await
        .unwrap();
    assert_eq!(description, "A red bike.");
}

#[tokio::test]
async fn test_image_generation_base64_becomes_data_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_partial_json(serde_json::json!({"n": 1, "size": "1024x1024"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": [{"b64_json": "iVBORw0"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let url = backend.generate_image("a cozy cafe").await.unwrap();
    assert_eq!(url, "data:image/png;base64,iVBORw0");
}

#[tokio::test]
async fn test_image_generation_with_no_images_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.generate_image("x").await.unwrap_err();
    assert_eq!(
        err.detail(),
        "Image generation succeeded but returned no images."
    );
}

#[tokio::test]
async fn test_image_generation_safety_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {
                "message": "Your request was rejected as a result of our safety system.",
                "type": "invalid_request_error",
                "code": "content_policy_violation"
            }
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.generate_image("something disallowed").await.unwrap_err();
    assert!(matches!(err, Error::ImageGeneration(_)));
    assert_eq!(err.detail(), IMAGE_SAFETY_BLOCKED);
}

#[tokio::test]
async fn test_image_generation_server_error_is_wrapped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": {"message": "overloaded", "type": "server_error"}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.generate_image("x").await.unwrap_err();
    assert!(err
        .detail()
        .starts_with("Error during image generation: "));
    assert!(err.detail().contains("overloaded"));
}

#[tokio::test]
async fn test_health_check_reflects_models_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    assert!(VisionBackend::health_check(&backend).await.unwrap());
}

#[tokio::test]
async fn test_authentication_failure_surfaces_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.generate("hello").await.unwrap_err();
    assert!(err.detail().contains("Incorrect API key provided"));
}
