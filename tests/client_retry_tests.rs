use pinbeam::config::PinterestConfig;
use pinbeam::pinterest::client::{PinterestApi, PinterestClient};
use pinbeam::pinterest::retry::BackoffPolicy;
use pinbeam::pinterest::types::{MediaSource, PinPayload};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server_uri: &str) -> PinterestClient {
    let cfg = PinterestConfig {
        api_base: server_uri.to_string(),
        ..PinterestConfig::default()
    };
    PinterestClient::with_backoff(
        &cfg,
        BackoffPolicy::without_jitter(3, Duration::from_millis(1)),
    )
}

fn payload() -> PinPayload {
    PinPayload {
        board_id: "b1".to_string(),
        media_source: MediaSource::image_url("https://media.example/p.jpg".to_string()),
        title: Some("Retry me".to_string()),
        description: None,
        alt_text: None,
        link: None,
    }
}

#[tokio::test]
async fn create_pin_succeeds_on_the_third_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pins"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"message": "too many requests"})),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pins"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "ext-3rd"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let created = client.create_pin("token", &payload()).await.unwrap();
    assert_eq!(created.id, "ext-3rd");
}

#[tokio::test]
async fn create_pin_gives_up_after_three_rate_limited_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pins"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"message": "too many requests"})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client.create_pin("token", &payload()).await.unwrap_err();
    assert_eq!(err.to_string(), "rate limit exceeded after 3 retries");
}

#[tokio::test]
async fn create_pin_does_not_retry_other_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pins"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "exploded"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client.create_pin("token", &payload()).await.unwrap_err();
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("exploded"));
}

#[tokio::test]
async fn fetch_boards_follows_the_bookmark_cursor() {
    let server = MockServer::start().await;

    // The cursor-bearing mock is narrower, so it is mounted first.
    Mock::given(method("GET"))
        .and(path("/boards"))
        .and(query_param("bookmark", "cursor-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "b2", "name": "Recipes"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/boards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "b1", "name": "Inspiration"}],
            "bookmark": "cursor-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let boards = client.fetch_boards("token").await.unwrap();
    assert_eq!(boards.len(), 2);
    assert_eq!(boards[0].id, "b1");
    assert_eq!(boards[1].id, "b2");
}

#[tokio::test]
async fn error_bodies_surface_their_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user_account"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"error_description": "scope missing"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client.fetch_account("token").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Pinterest API error (403): scope missing"
    );
}
