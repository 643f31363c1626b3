//! One-time code integration tests.
//!
//! Tests verify:
//! - Codes go to the stored admin address and are keyed by the `otp_id` cookie
//! - A code verifies once, within its lifetime, for its own client only
//! - The routes exist only when enabled

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::{json, Value};

use gallery_admin::auth::ArtifactMode;
use gallery_admin::{DocumentStore, MemoryAssetHost, MemoryStore};

use super::test_utils::{
    body_json, json_request, set_cookie_header, set_cookie_value, test_app, TestApp,
    TestAppBuilder, ADMIN_EMAIL,
};

fn otp_app() -> TestApp<MemoryAssetHost> {
    TestAppBuilder::new(ArtifactMode::Cookie)
        .otp(Duration::from_secs(300))
        .build()
}

/// Request a code and return the client id from the `otp_id` cookie.
async fn send_otp<H>(app: &TestApp<H>) -> String {
    let response = app.send(json_request("POST", "/send-otp", json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let client_id = set_cookie_value(&response, "otp_id").expect("otp_id cookie");
    assert_eq!(body_json(response).await["success"], true);
    client_id
}

async fn verify_otp<H>(
    app: &TestApp<H>,
    client_id: Option<&str>,
    body: Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/verify-otp")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(client_id) = client_id {
        builder = builder.header(header::COOKIE, format!("otp_id={}", client_id));
    }
    app.send(builder.body(Body::from(body.to_string())).unwrap())
        .await
}

#[tokio::test]
async fn test_send_otp_mails_admin() {
    let app = otp_app();
    let response = app.send(json_request("POST", "/send-otp", json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie_header(&response, "otp_id").unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=300"));

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ADMIN_EMAIL);
    assert_eq!(sent[0].1.len(), 6);
    assert!(sent[0].1.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_verify_otp_is_single_use() {
    let app = otp_app();
    let client_id = send_otp(&app).await;
    let code = app.mailer.last_code().unwrap();

    let response = verify_otp(&app, Some(&client_id), json!({ "otp": code })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie_header(&response, "otp_id")
        .unwrap()
        .contains("Max-Age=0"));
    assert_eq!(body_json(response).await["success"], true);

    let response = verify_otp(&app, Some(&client_id), json!({ "otp": code })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "otp_not_issued");
}

#[tokio::test]
async fn test_verify_otp_accepts_numeric_code() {
    let app = otp_app();
    let client_id = send_otp(&app).await;
    let code: u64 = app.mailer.last_code().unwrap().parse().unwrap();

    let response = verify_otp(&app, Some(&client_id), json!({ "otp": code })).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verify_otp_mismatch_keeps_code() {
    let app = otp_app();
    let client_id = send_otp(&app).await;
    let code = app.mailer.last_code().unwrap();
    let wrong = if code == "123456" { "654321" } else { "123456" };

    let response = verify_otp(&app, Some(&client_id), json!({ "otp": wrong })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "otp_mismatch");

    let response = verify_otp(&app, Some(&client_id), json!({ "otp": code })).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verify_otp_without_cookie() {
    let app = otp_app();
    send_otp(&app).await;
    let code = app.mailer.last_code().unwrap();

    let response = verify_otp(&app, None, json!({ "otp": code })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "otp_not_issued");
}

#[tokio::test]
async fn test_verify_otp_expired() {
    let app = TestAppBuilder::new(ArtifactMode::Cookie)
        .otp(Duration::ZERO)
        .build();
    let client_id = send_otp(&app).await;
    let code = app.mailer.last_code().unwrap();

    let response = verify_otp(&app, Some(&client_id), json!({ "otp": code })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "otp_expired");
}

#[tokio::test]
async fn test_otp_clients_are_isolated() {
    let app = otp_app();

    let first = send_otp(&app).await;
    let first_code = app.mailer.last_code().unwrap();
    let second = send_otp(&app).await;
    let second_code = app.mailer.last_code().unwrap();
    assert_ne!(first, second);

    // A code only verifies for the client it was issued to
    if first_code != second_code {
        let response = verify_otp(&app, Some(&second), json!({ "otp": first_code })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = verify_otp(&app, Some(&first), json!({ "otp": first_code })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = verify_otp(&app, Some(&second), json!({ "otp": second_code })).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_send_otp_without_admin_record() {
    let app = TestAppBuilder::new(ArtifactMode::Cookie)
        .store(MemoryStore::new())
        .otp(Duration::from_secs(300))
        .build();

    let response = app.send(json_request("POST", "/send-otp", json!({}))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "mail_error");
    assert!(app.mailer.sent().is_empty());
    assert!(app.store.get("login").await.unwrap().is_none());
}

#[tokio::test]
async fn test_otp_routes_absent_when_disabled() {
    let app = test_app();

    let response = app.send(json_request("POST", "/send-otp", json!({}))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = verify_otp(&app, Some("whatever"), json!({ "otp": "123456" })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
