// End-to-end tests for the waitlist HTTP surface.

mod harness;

use axum::http::StatusCode;
use harness::{TestApp, settle};
use std::time::Duration;
use waitlist_gateway::metrics::REQUEST_LATENCY;

#[tokio::test(start_paused = true)]
async fn test_new_email_is_stored() {
    let app = TestApp::new();

    let (status, body) = app.join("First.Person@Example.com", "203.0.113.7").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully joined the waitlist");
    assert_eq!(body["data"]["email"], "First.Person@Example.com");
    assert!(body["data"]["timestamp"].as_str().unwrap().ends_with('Z'));

    assert!(app.state.store.exists("first.person@example.com").await);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_in_any_case_conflicts() {
    let app = TestApp::new();

    let (status, _) = app.join("dup@example.com", "203.0.113.7").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.join("DUP@Example.COM", "203.0.113.8").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "This email is already on the waitlist");
    assert_eq!(app.state.store.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_email_never_reaches_store() {
    let app = TestApp::new();

    for body in [
        r#"{"email": "not-an-email"}"#,
        r#"{"email": ""}"#,
        r#"{"email": 42}"#,
        r#"{}"#,
        r#"[]"#,
    ] {
        let (status, json) = app.post_raw(body, Some("203.0.113.9")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["error"], "Invalid email address");
        // keep this client clear of the rate limit
        tokio::time::advance(Duration::from_secs(61)).await;
    }

    assert!(app.state.store.is_empty().await);
    settle().await;
    assert_eq!(app.notifier.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_body_is_server_error() {
    let app = TestApp::new();

    let (status, json) = app.post_raw("{not json", Some("203.0.113.10")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
}

#[tokio::test(start_paused = true)]
async fn test_fourth_request_in_window_is_limited() {
    let app = TestApp::new();
    let client = "198.51.100.20";

    for i in 0..3 {
        let (status, _) = app.join(&format!("user{i}@example.com"), client).await;
        assert_eq!(status, StatusCode::CREATED, "request {}", i + 1);
    }

    let (status, body) = app.join("user3@example.com", client).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests. Please try again later.");

    // another client is unaffected
    let (status, _) = app.join("other@example.com", "198.51.100.21").await;
    assert_eq!(status, StatusCode::CREATED);

    tokio::time::advance(Duration::from_secs(61)).await;
    let (status, _) = app.join("user3@example.com", client).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_precedes_validation() {
    let app = TestApp::with_args(&["--rate-limit", "1"]);

    let (status, _) = app.post_raw(r#"{"email": "bad"}"#, Some("198.51.100.30")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.join("good@example.com", "198.51.100.30").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test(start_paused = true)]
async fn test_latency_recorded_for_rejections() {
    let app = TestApp::with_args(&["--rate-limit", "1"]);
    let before = REQUEST_LATENCY.get_sample_count();

    let (status, _) = app.post_raw(r#"{"email": "bad"}"#, Some("198.51.100.40")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.join("late@example.com", "198.51.100.40").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // other tests in this binary record samples too
    assert!(REQUEST_LATENCY.get_sample_count() >= before + 2);
}

#[tokio::test(start_paused = true)]
async fn test_unidentified_clients_share_a_bucket() {
    let app = TestApp::new();

    for i in 0..3 {
        let body = format!(r#"{{"email": "anon{i}@example.com"}}"#);
        let (status, _) = app.post_raw(&body, None).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = app.post_raw(r#"{"email": "anon3@example.com"}"#, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test(start_paused = true)]
async fn test_one_notification_per_stored_entry() {
    let app = TestApp::new();

    app.join("notify@example.com", "203.0.113.7").await;
    app.join("NOTIFY@example.com", "203.0.113.7").await;
    app.post_raw(r#"{"email": "nope"}"#, Some("203.0.113.7")).await;
    settle().await;

    let sent = app.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, "notify@example.com");
    assert_eq!(sent[0].ip_address.as_deref(), Some("203.0.113.7"));
    let geo = sent[0].geolocation.as_ref().unwrap();
    assert_eq!(geo.place().as_deref(), Some("Guadalajara, Mexico"));
}

#[tokio::test(start_paused = true)]
async fn test_private_client_gets_no_location() {
    let app = TestApp::new();

    app.join("lan@example.com", "192.168.1.100").await;
    settle().await;

    let sent = app.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].geolocation, None);
}

#[tokio::test(start_paused = true)]
async fn test_api_prefix_route() {
    let app = TestApp::new();

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/waitlist")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"email": "api@example.com"}"#))
        .unwrap();
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_service_metadata() {
    let app = TestApp::new();
    app.state.store.insert("meta@example.com").await.unwrap();

    let (status, body) = app.get("/waitlist").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "angel.rent waitlist API");
    assert_eq!(body["signups"], 1);
    assert!(body["sendGrid"]["configured"].is_boolean());
    assert_eq!(
        body["sendGrid"]["configured"].as_bool(),
        Some(!body["sendGrid"]["apiKeyPrefix"].is_null())
    );
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
