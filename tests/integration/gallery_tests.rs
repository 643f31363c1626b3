//! Gallery integration tests.
//!
//! Tests verify:
//! - Every file is validated before any host upload starts
//! - Batches are all-or-nothing and keep submission order
//! - Listing is newest first
//! - Records are deleted only after the host confirms

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use gallery_admin::auth::ArtifactMode;
use gallery_admin::UploadPolicy;

use super::test_utils::{
    body_json, png_bytes, test_app, FlakyHost, MultipartForm, TestAppBuilder,
};

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_keeps_submission_order() {
    let app = test_app();
    let token = app.login().await;

    let form = MultipartForm::new()
        .file("first.png", "image/png", &png_bytes())
        .file("second.jpg", "image/jpeg", &png_bytes());
    let response = app.upload(&token, form).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let images = json["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert!(images[0]["public_id"].as_str().unwrap().ends_with(".png"));
    assert!(images[1]["public_id"].as_str().unwrap().ends_with(".jpg"));
    for image in images {
        assert!(!image["key"].as_str().unwrap().is_empty());
        assert!(image["url"].as_str().unwrap().starts_with("memory://assets/gallery/"));
    }

    assert_eq!(app.host.len().await, 2);
}

#[tokio::test]
async fn test_images_listed_newest_first() {
    let app = test_app();
    let token = app.login().await;

    let response = app
        .upload(
            &token,
            MultipartForm::new().file("old.png", "image/png", &png_bytes()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let old_key = body_json(response).await["images"][0]["key"].clone();

    let response = app
        .upload(
            &token,
            MultipartForm::new().file("new.gif", "image/gif", &png_bytes()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let new_key = body_json(response).await["images"][0]["key"].clone();

    let response = app.get_authorized("/images", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    let listing = listing.as_array().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0]["key"], new_key);
    assert_eq!(listing[1]["key"], old_key);
}

#[tokio::test]
async fn test_upload_without_files_rejected() {
    let app = test_app();
    let token = app.login().await;

    let response = app
        .upload(&token, MultipartForm::new().text("note", "hello"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "no_files_provided");
}

#[tokio::test]
async fn test_upload_rejects_non_image_before_uploading() {
    let app = test_app();
    let token = app.login().await;

    let form = MultipartForm::new()
        .file("fine.png", "image/png", &png_bytes())
        .file("notes.txt", "text/plain", b"plain text");
    let response = app.upload(&token, form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "unsupported_file_type");

    // The valid file in the same batch never reached the host
    assert!(app.host.is_empty().await);
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = TestAppBuilder::new(ArtifactMode::Cookie)
        .policy(UploadPolicy::default().with_max_bytes(16))
        .build();
    let token = app.login().await;

    let response = app
        .upload(
            &token,
            MultipartForm::new().file("big.png", "image/png", &png_bytes()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "file_too_large");
    assert_eq!(json["status"], 400);
    assert!(app.host.is_empty().await);
}

#[tokio::test]
async fn test_upload_rejects_empty_file() {
    let app = TestAppBuilder::new(ArtifactMode::Cookie)
        .policy(UploadPolicy::permissive())
        .build();
    let token = app.login().await;

    let response = app
        .upload(
            &token,
            MultipartForm::new().file("empty.png", "image/png", &[]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "empty_file");
}

#[tokio::test]
async fn test_permissive_policy_accepts_any_type() {
    let app = TestAppBuilder::new(ArtifactMode::Cookie)
        .policy(UploadPolicy::permissive())
        .build();
    let token = app.login().await;

    let response = app
        .upload(
            &token,
            MultipartForm::new().file("notes.txt", "text/plain", b"plain text"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.host.len().await, 1);
}

#[tokio::test]
async fn test_upload_folder_override() {
    let app = test_app();
    let token = app.login().await;

    let form = MultipartForm::new()
        .text("folder", "events/2024")
        .file("party.png", "image/png", &png_bytes());
    let response = app.upload(&token, form).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let public_id = json["images"][0]["public_id"].as_str().unwrap();
    assert!(public_id.starts_with("events/2024/"), "{}", public_id);
}

#[tokio::test]
async fn test_upload_invalid_folder_rejected() {
    let app = test_app();
    let token = app.login().await;

    for folder in ["../secrets", "a//b", "with space"] {
        let form = MultipartForm::new()
            .text("folder", folder)
            .file("party.png", "image/png", &png_bytes());
        let response = app.upload(&token, form).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", folder);
        assert_eq!(body_json(response).await["error"], "invalid_request");
    }
    assert!(app.host.is_empty().await);
}

#[tokio::test]
async fn test_failed_batch_commits_nothing() {
    let host = Arc::new(FlakyHost::new());
    let app = TestAppBuilder::new(ArtifactMode::Cookie).build_with_host(host.clone());
    let token = app.login().await;

    let form = MultipartForm::new()
        .file("one.png", "image/png", &png_bytes())
        .file("fail.png", "image/png", &png_bytes())
        .file("three.png", "image/png", &png_bytes());
    let response = app.upload(&token, form).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "upload_failed");

    // Every file was attempted, the successful ones were discarded again
    assert_eq!(host.upload_calls(), 3);
    assert_eq!(host.destroy_calls(), 2);
    assert_eq!(host.stored().await, 0);

    let response = app.get_authorized("/images", &token).await;
    assert_eq!(body_json(response).await, json!([]));
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_removes_asset_and_record() {
    let app = test_app();
    let token = app.login().await;

    let response = app
        .upload(
            &token,
            MultipartForm::new().file("gone.png", "image/png", &png_bytes()),
        )
        .await;
    let image = body_json(response).await["images"][0].clone();

    let response = app
        .post_json_authorized(
            "/delete",
            &token,
            json!({ "key": image["key"], "public_id": image["public_id"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    assert!(app.host.is_empty().await);
    let response = app.get_authorized("/images", &token).await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_delete_missing_parameters() {
    let app = test_app();
    let token = app.login().await;

    for body in [
        json!({ "key": "k" }),
        json!({ "public_id": "p" }),
        json!({}),
        json!({ "key": "  ", "public_id": "p" }),
    ] {
        let response = app.post_json_authorized("/delete", &token, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "missing_parameters");
    }
}

#[tokio::test]
async fn test_delete_invalid_json() {
    let app = test_app();
    let token = app.login().await;

    let response = app
        .post_json_authorized("/delete", &token, json!("not an object"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_delete_keeps_record_when_host_refuses() {
    let host = Arc::new(FlakyHost::new());
    let app = TestAppBuilder::new(ArtifactMode::Cookie).build_with_host(host.clone());
    let token = app.login().await;

    let response = app
        .upload(
            &token,
            MultipartForm::new().file("stuck.png", "image/png", &png_bytes()),
        )
        .await;
    let image = body_json(response).await["images"][0].clone();
    let public_id = image["public_id"].as_str().unwrap().to_string();
    host.refuse_destroy(&public_id);

    let response = app
        .post_json_authorized(
            "/delete",
            &token,
            json!({ "key": image["key"], "public_id": public_id }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "remote_delete_failed");

    assert!(host.contains(&public_id).await);
    let response = app.get_authorized("/images", &token).await;
    let listing = body_json(response).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["public_id"], public_id.as_str());
}

#[tokio::test]
async fn test_delete_mismatched_public_id_rejected() {
    let app = test_app();
    let token = app.login().await;

    let response = app
        .upload(
            &token,
            MultipartForm::new()
                .file("kept.png", "image/png", &png_bytes())
                .file("other.png", "image/png", &png_bytes()),
        )
        .await;
    let images = body_json(response).await["images"].clone();

    let response = app
        .post_json_authorized(
            "/delete",
            &token,
            json!({ "key": images[0]["key"], "public_id": images[1]["public_id"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");

    assert_eq!(app.host.len().await, 2);
    let response = app.get_authorized("/images", &token).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_unknown_key_destroys_nothing() {
    let app = test_app();
    let token = app.login().await;

    let response = app
        .upload(
            &token,
            MultipartForm::new().file("kept.png", "image/png", &png_bytes()),
        )
        .await;
    let image = body_json(response).await["images"][0].clone();

    let response = app
        .post_json_authorized(
            "/delete",
            &token,
            json!({ "key": "-NoSuchKey000000000", "public_id": image["public_id"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.host.len().await, 1);
    let response = app.get_authorized("/images", &token).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_crafted_key_cannot_wipe_gallery() {
    let app = test_app();
    let token = app.login().await;

    let form = MultipartForm::new()
        .file("a.png", "image/png", &png_bytes())
        .file("b.png", "image/png", &png_bytes())
        .file("c.png", "image/png", &png_bytes());
    let response = app.upload(&token, form).await;
    let images = body_json(response).await["images"].clone();

    for key in ["/", "//", "x/y"] {
        let response = app
            .post_json_authorized(
                "/delete",
                &token,
                json!({ "key": key, "public_id": images[0]["public_id"] }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", key);
        assert_eq!(body_json(response).await["error"], "invalid_request");
    }

    assert_eq!(app.host.len().await, 3);
    let response = app.get_authorized("/images", &token).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);
}
