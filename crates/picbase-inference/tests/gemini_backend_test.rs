//! Gemini backend against a stubbed HTTP server.

use picbase_inference::{AnnotationContext, Error, GeminiAnnotator, GeminiConfig, ImageAnnotator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IMAGE: &[u8] = b"\x89PNG\r\n\x1a\nfake";

fn annotator(server: &MockServer) -> GeminiAnnotator {
    GeminiAnnotator::new(
        GeminiConfig::new("test-key")
            .with_base_url(server.uri())
            .with_model("gemini-test")
            .with_timeout_secs(2),
    )
    .expect("client")
}

fn candidate(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_annotate_sends_inline_image_and_parses_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"parts": [{}, {"inline_data": {"mime_type": "image/png", "data": "iVBORw0KGgpmYWtl"}}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
            r#"{"title":"Mountain sunset","description":"Orange light on peaks.","caption":"Golden hour","categories":["Nature","outdoor"],"tags":["sunset","Mountains"]}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let suggestion = annotator(&server)
        .annotate(IMAGE, "image/png", &AnnotationContext::default())
        .await
        .expect("annotate");

    assert_eq!(suggestion.title.as_deref(), Some("Mountain sunset"));
    assert_eq!(suggestion.caption.as_deref(), Some("Golden hour"));
    assert_eq!(suggestion.categories, vec!["nature", "outdoor"]);
    assert_eq!(suggestion.tags, vec!["sunset", "mountains"]);
}

#[tokio::test]
async fn test_context_is_appended_to_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(r#"{"title":"x"}"#)))
        .mount(&server)
        .await;

    annotator(&server)
        .annotate(
            IMAGE,
            "image/png",
            &AnnotationContext {
                description: Some("grandma's garden".to_string()),
                link: Some("https://example.com/garden".to_string()),
            },
        )
        .await
        .expect("annotate");

    let requests = server.received_requests().await.expect("recorded");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Additional context provided by user: grandma's garden"));
    assert!(prompt.contains("Related link context: https://example.com/garden"));
}

#[tokio::test]
async fn test_prose_response_uses_heuristics() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
            "A cat sleeps on a sunny windowsill inside a cozy room. Very calm.",
        )))
        .mount(&server)
        .await;

    let suggestion = annotator(&server)
        .annotate(IMAGE, "image/png", &AnnotationContext::default())
        .await
        .expect("annotate");

    assert_eq!(
        suggestion.caption.as_deref(),
        Some("A cat sleeps on a sunny windowsill inside a cozy room")
    );
    assert_eq!(suggestion.categories, vec!["animal", "indoor"]);
}

#[tokio::test]
async fn test_api_error_message_surfaces() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let err = annotator(&server)
        .annotate(IMAGE, "image/png", &AnnotationContext::default())
        .await
        .unwrap_err();

    match err {
        Error::Inference(msg) => {
            assert!(msg.contains("429"));
            assert!(msg.contains("Quota exceeded"));
            assert!(!msg.contains("test-key"));
        }
        other => panic!("expected inference error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_inference_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(candidate(r#"{"title":"late"}"#))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = annotator(&server)
        .annotate(IMAGE, "image/png", &AnnotationContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Inference(ref m) if m.contains("timed out")));
}

#[tokio::test]
async fn test_empty_candidates_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = annotator(&server)
        .annotate(IMAGE, "image/png", &AnnotationContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models/gemini-test"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "models/gemini-test"})))
        .mount(&server)
        .await;

    assert!(annotator(&server).health_check().await.unwrap());
}

#[tokio::test]
async fn test_health_check_unreachable() {
    let gemini = GeminiAnnotator::new(
        GeminiConfig::new("k").with_base_url("http://127.0.0.1:1"),
    )
    .unwrap();
    assert!(!gemini.health_check().await.unwrap());
}
