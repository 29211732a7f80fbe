//! Ollama vision backend against a stubbed HTTP server.

use picbase_inference::{AnnotationContext, Error, ImageAnnotator, OllamaVisionAnnotator};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_annotate_posts_base64_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "llava",
            "images": ["aW1hZ2U="],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llava",
            "response": "```json\n{\"title\": \"Red bicycle\", \"categories\": [\"vehicle\"], \"tags\": [\"bike\", \"red\"]}\n```",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let annotator = OllamaVisionAnnotator::new(server.uri(), "llava").unwrap();
    let suggestion = annotator
        .annotate(b"image", "image/jpeg", &AnnotationContext::default())
        .await
        .unwrap();

    assert_eq!(suggestion.title.as_deref(), Some("Red bicycle"));
    assert_eq!(suggestion.categories, vec!["vehicle"]);
    assert_eq!(suggestion.tags, vec!["bike", "red"]);
}

#[tokio::test]
async fn test_server_error_is_inference_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'llava' not found"))
        .mount(&server)
        .await;

    let annotator = OllamaVisionAnnotator::new(server.uri(), "llava").unwrap();
    let err = annotator
        .annotate(b"image", "image/jpeg", &AnnotationContext::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Inference(ref m) if m.contains("not found")));
}

#[tokio::test]
async fn test_health_check_uses_tags_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .expect(1)
        .mount(&server)
        .await;

    let annotator = OllamaVisionAnnotator::new(server.uri(), "llava").unwrap();
    assert!(annotator.health_check().await.unwrap());
}
