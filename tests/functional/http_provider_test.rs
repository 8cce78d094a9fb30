//! Functional tests for the HTTP provider against a mock queue API

use gen_studio::assets::{AssetUploader, LocalAsset};
use gen_studio::config::ProviderConfig;
use gen_studio::error::AppError;
use gen_studio::provider::{HttpProvider, ProviderGateway, QueueUpdate};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn provider(server: &MockServer, proxy: bool) -> HttpProvider {
    HttpProvider::new(ProviderConfig {
        queue_url: if proxy {
            "https://queue.example".to_string()
        } else {
            server.uri()
        },
        storage_url: server.uri(),
        api_key: "secret".to_string(),
        proxy_url: proxy.then(|| format!("{}/proxy", server.uri())),
        poll_interval_ms: 1,
        request_timeout_ms: 5000,
    })
    .unwrap()
}

fn drain(mut rx: mpsc::UnboundedReceiver<QueueUpdate>) -> Vec<QueueUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

fn log_messages(update: &QueueUpdate) -> Vec<String> {
    update.logs.iter().filter_map(|line| line.message.clone()).collect()
}

#[tokio::test]
async fn test_submit_polls_and_fetches_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acme/model"))
        .and(header("Authorization", "Key secret"))
        .and(body_json(json!({"prompt": "fox"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"request_id": "req-1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/acme/model/requests/req-1/status"))
        .and(query_param("logs", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "IN_PROGRESS",
            "logs": [{"message": "loading"}]
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/acme/model/requests/req-1/status"))
        .and(query_param("logs", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "COMPLETED",
            "logs": [{"message": "loading"}, {"message": "rendering"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/acme/model/requests/req-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "images": [{"url": "https://cdn.test/fox.png", "content_type": "image/png"}]
        })))
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    let output = provider(&server, false)
        .submit("acme/model", json!({"prompt": "fox"}), tx)
        .await
        .unwrap();

    assert_eq!(output.image_urls(), vec!["https://cdn.test/fox.png".to_string()]);

    let updates = drain(rx);
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].relevant_messages(), vec!["loading".to_string()]);
    // Only the new tail is forwarded
    assert_eq!(log_messages(&updates[1]), vec!["rendering".to_string()]);
}

#[tokio::test]
async fn test_nested_result_images() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acme/model"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "req-2",
            "status_url": format!("{}/custom/status", server.uri()),
            "response_url": format!("{}/custom/result", server.uri())
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/custom/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "COMPLETED"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/custom/result"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"images": [{"url": "https://cdn.test/nested.png"}]}
        })))
        .mount(&server)
        .await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let output = provider(&server, false)
        .submit("acme/model", json!({"prompt": "fox"}), tx)
        .await
        .unwrap();

    assert_eq!(output.image_urls(), vec!["https://cdn.test/nested.png".to_string()]);
}

#[tokio::test]
async fn test_rejected_submission_surfaces_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acme/model"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"detail": "Prompt was flagged"})))
        .mount(&server)
        .await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = provider(&server, false)
        .submit("acme/model", json!({"prompt": "fox"}), tx)
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(422));
    assert_eq!(err.user_message(), "Prompt was flagged");
}

#[tokio::test]
async fn test_unexpected_queue_status_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acme/model"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"request_id": "req-3"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/acme/model/requests/req-3/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "FAILED"})))
        .mount(&server)
        .await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = provider(&server, false)
        .submit("acme/model", json!({}), tx)
        .await
        .unwrap_err();

    assert!(err.user_message().contains("FAILED"));
}

#[tokio::test]
async fn test_requests_are_routed_through_proxy() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/proxy"))
        .and(header("x-fal-target-url", "https://queue.example/acme/model"))
        .and(header("Authorization", "Key secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "req-4",
            "status_url": "https://queue.example/status",
            "response_url": "https://queue.example/result"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/proxy"))
        .and(header("x-fal-target-url", "https://queue.example/status?logs=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "COMPLETED", "logs": []})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/proxy"))
        .and(header("x-fal-target-url", "https://queue.example/result"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "images": [{"url": "https://cdn.test/proxied.png"}]
        })))
        .mount(&server)
        .await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let output = provider(&server, true)
        .submit("acme/model", json!({"prompt": "fox"}), tx)
        .await
        .unwrap();

    assert_eq!(output.image_urls(), vec!["https://cdn.test/proxied.png".to_string()]);
}

#[tokio::test]
async fn test_asset_upload_initiates_then_puts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/upload/initiate"))
        .and(body_json(json!({"content_type": "image/png", "file_name": "sketch.png"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "upload_url": format!("{}/upload/abc", server.uri()),
            "file_url": "https://cdn.test/abc.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/abc"))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let asset = LocalAsset::new("sketch.png", None, PNG.to_vec());
    let url = provider(&server, false).upload(&asset).await.unwrap();

    assert_eq!(url, "https://cdn.test/abc.png");
}

#[tokio::test]
async fn test_asset_upload_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/upload/initiate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let asset = LocalAsset::new("sketch.png", Some("image/png".to_string()), PNG.to_vec());
    let err = provider(&server, false).upload(&asset).await.unwrap_err();

    assert!(matches!(err, AppError::UploadFailed(_)));
}
