//! Authentication integration tests.
//!
//! Tests verify:
//! - Correct credentials issue an artifact; wrong ones never do
//! - The artifact is accepted for one hour and rejected after tampering
//! - Each artifact mode delivers and reads its artifact in the right place
//! - Logout revokes sessions and clears cookies

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use gallery_admin::auth::{ArtifactMode, TokenSigner};
use gallery_admin::MemoryStore;

use super::test_utils::{
    body_json, get_request, json_request, set_cookie_header, set_cookie_value, set_cookies,
    test_app, TestAppBuilder, ADMIN_EMAIL, ADMIN_PASSWORD, TEST_SECRET,
};

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let response = app.send(get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_sets_secure_cookie() {
    let app = test_app();
    let response = app
        .send(json_request(
            "POST",
            "/login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie_header(&response, "token").expect("token cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=None"));
    assert!(cookie.contains("Max-Age=3600"));

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["email"], ADMIN_EMAIL);
    assert!(json.get("token").is_none());
}

#[tokio::test]
async fn test_login_wrong_password_issues_nothing() {
    let app = test_app();
    let response = app
        .send(json_request(
            "POST",
            "/login",
            json!({ "email": ADMIN_EMAIL, "password": "wrong" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "invalid_credentials");
    assert_eq!(json["status"], 401);
}

#[tokio::test]
async fn test_login_wrong_email_rejected() {
    let app = test_app();
    let response = app
        .send(json_request(
            "POST",
            "/login",
            json!({ "email": "someone@example.com", "password": ADMIN_PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_missing_fields_rejected() {
    let app = test_app();
    let response = app
        .send(json_request("POST", "/login", json!({ "email": ADMIN_EMAIL })))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_login_coerces_numeric_password() {
    let store = MemoryStore::new();
    store
        .set("login", json!({ "email": ADMIN_EMAIL, "password": 123456 }))
        .await
        .unwrap();
    let app = TestAppBuilder::new(ArtifactMode::Cookie)
        .store(store)
        .build();

    // Stored number, submitted string
    let response = app
        .send(json_request(
            "POST",
            "/login",
            json!({ "email": ADMIN_EMAIL, "password": "123456" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Stored number, submitted number
    let response = app
        .send(json_request(
            "POST",
            "/login",
            json!({ "email": ADMIN_EMAIL, "password": 123456 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_without_stored_record_rejected() {
    let app = TestAppBuilder::new(ArtifactMode::Cookie)
        .store(MemoryStore::new())
        .build();
    let response = app
        .send(json_request(
            "POST",
            "/login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Artifact Checks
// =============================================================================

#[tokio::test]
async fn test_check_auth_with_valid_cookie() {
    let app = test_app();
    let token = app.login().await;

    for uri in ["/check-auth", "/verify-token"] {
        let response = app.get_authorized(uri, &token).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["email"], ADMIN_EMAIL);
        assert!(json["expires_at"].as_u64().is_some());
    }
}

#[tokio::test]
async fn test_check_auth_without_artifact() {
    let app = test_app();
    let response = app.send(get_request("/check-auth")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "unauthenticated");
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let app = test_app();
    let token = app.login().await;

    // Flip one character in the signature and one in the payload
    let mut sig_tampered = token.clone().into_bytes();
    let last = sig_tampered.len() - 1;
    sig_tampered[last] = if sig_tampered[last] == b'0' { b'1' } else { b'0' };
    let sig_tampered = String::from_utf8(sig_tampered).unwrap();

    let mut payload_tampered = token.clone().into_bytes();
    payload_tampered[0] = if payload_tampered[0] == b'A' { b'B' } else { b'A' };
    let payload_tampered = String::from_utf8(payload_tampered).unwrap();

    for bad in [sig_tampered, payload_tampered] {
        let response = app.get_authorized("/check-auth", &bad).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "invalid_artifact");
    }
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = test_app();
    let signer = TokenSigner::new(TEST_SECRET);

    // Issued a little over an hour ago
    let issued_at = gallery_admin::auth::unix_now() - 3601;
    let (token, _) = signer.issue_at(ADMIN_EMAIL, issued_at);

    let response = app.get_authorized("/check-auth", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "invalid_artifact");
}

#[tokio::test]
async fn test_expired_bearer_token_forbidden() {
    let app = TestAppBuilder::new(ArtifactMode::Bearer).build();
    let issued_at = gallery_admin::auth::unix_now() - 3601;
    let (token, _) = TokenSigner::new(TEST_SECRET).issue_at(ADMIN_EMAIL, issued_at);

    for uri in ["/check-auth", "/images"] {
        let response = app.get_authorized(uri, &token).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);

        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_artifact");
        assert_eq!(json["status"], 403);
    }
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let app = test_app();
    let (token, _) = TokenSigner::new("another-secret").issue(ADMIN_EMAIL);

    let response = app.get_authorized("/check-auth", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Access Guard
// =============================================================================

#[tokio::test]
async fn test_gallery_routes_require_artifact() {
    let app = test_app();

    let response = app.send(get_request("/images")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request(
            "POST",
            "/delete",
            json!({ "key": "k", "public_id": "p" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get_authorized("/images", "garbage").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_gallery_routes_accept_valid_artifact() {
    let app = test_app();
    let token = app.login().await;

    let response = app.get_authorized("/images", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

// =============================================================================
// Bearer Mode
// =============================================================================

#[tokio::test]
async fn test_bearer_mode_returns_token_in_body() {
    let app = TestAppBuilder::new(ArtifactMode::Bearer).build();
    let response = app
        .send(json_request(
            "POST",
            "/login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());

    let json = body_json(response).await;
    let token = json["token"].as_str().unwrap();
    assert!(TokenSigner::new(TEST_SECRET).verify(token).is_ok());
}

#[tokio::test]
async fn test_bearer_mode_reads_authorization_header() {
    let app = TestAppBuilder::new(ArtifactMode::Bearer).build();
    let token = app.login().await;

    let response = app.get_authorized("/images", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    // A cookie is not an accepted carrier in bearer mode
    let request = Request::builder()
        .uri("/images")
        .header(header::COOKIE, format!("token={}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Session Mode
// =============================================================================

#[tokio::test]
async fn test_session_mode_login_and_logout() {
    let app = TestAppBuilder::new(ArtifactMode::Session).build();
    let sid = app.login().await;
    assert_eq!(sid.len(), 64);

    let response = app.get_authorized("/check-auth", &sid).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post_json_authorized("/logout", &sid, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = set_cookie_header(&response, "sid").expect("sid cookie cleared");
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(body_json(response).await["success"], true);

    let response = app.get_authorized("/check-auth", &sid).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "invalid_artifact");
}

#[tokio::test]
async fn test_session_ids_are_not_signed_tokens() {
    let app = TestAppBuilder::new(ArtifactMode::Session).build();
    let (token, _) = TokenSigner::new(TEST_SECRET).issue(ADMIN_EMAIL);

    let response = app.get_authorized("/check-auth", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_clears_token_cookie() {
    let app = test_app();
    let token = app.login().await;

    let response = app.post_json_authorized("/logout", &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookie_value(&response, "token").as_deref(), Some(""));
    assert!(set_cookie_header(&response, "token")
        .unwrap()
        .contains("Max-Age=0"));
}

#[tokio::test]
async fn test_logout_without_artifact_succeeds() {
    let app = test_app();
    let response = app.send(json_request("POST", "/logout", json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
}
