//! HTTP request handlers for the gallery admin API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /login`, `POST /logout` - Artifact issuance and revocation
//! - `GET /check-auth`, `GET /verify-token` - Artifact status
//! - `POST /upload`, `GET /images`, `POST /delete` - Gallery (protected)
//! - `POST /send-otp`, `POST /verify-otp` - One-time codes (optional)

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Extension, Multipart, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::{
    authenticate, ArtifactStrategy, CookieSettings, Delivery, Identity, OtpMailer, OtpStore,
};
use crate::error::{AuthError, GalleryError, MailError};
use crate::gallery::GalleryService;
use crate::host::{AssetHost, ImageUpload};
use crate::store::{coerce_to_string, CredentialStore, DocumentStore, GalleryEntry};

/// Cookie identifying the requester of a one-time code.
pub const OTP_COOKIE: &str = "otp_id";

/// Multipart text field that overrides the upload folder.
pub const FOLDER_FIELD: &str = "folder";

// =============================================================================
// Application State
// =============================================================================

/// Shared state for the login and gallery handlers.
pub struct AppState<D, H> {
    /// Upload, list and delete workflows
    pub gallery: GalleryService<D, H>,

    /// The admin credential record
    pub credentials: CredentialStore<D>,

    /// How login artifacts are issued and checked
    pub strategy: Arc<dyn ArtifactStrategy>,
}

impl<D: DocumentStore, H: AssetHost> AppState<D, H> {
    pub fn new(
        gallery: GalleryService<D, H>,
        credentials: CredentialStore<D>,
        strategy: Arc<dyn ArtifactStrategy>,
    ) -> Self {
        Self {
            gallery,
            credentials,
            strategy,
        }
    }
}

impl<D, H> Clone for AppState<D, H> {
    fn clone(&self) -> Self {
        Self {
            gallery: self.gallery.clone(),
            credentials: self.credentials.clone(),
            strategy: Arc::clone(&self.strategy),
        }
    }
}

/// Shared state for the one-time code handlers.
pub struct OtpState<D> {
    pub store: Arc<OtpStore>,
    pub mailer: Arc<dyn OtpMailer>,
    pub cookie: CookieSettings,

    /// Source of the recipient address
    pub credentials: CredentialStore<D>,
}

impl<D: DocumentStore> OtpState<D> {
    pub fn new(
        store: OtpStore,
        mailer: Arc<dyn OtpMailer>,
        credentials: CredentialStore<D>,
    ) -> Self {
        Self {
            store: Arc::new(store),
            mailer,
            cookie: CookieSettings::new(OTP_COOKIE),
            credentials,
        }
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie = self.cookie.with_secure(secure);
        self
    }
}

impl<D> Clone for OtpState<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            mailer: Arc::clone(&self.mailer),
            cookie: self.cookie.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Body of `POST /login`.
///
/// Fields are kept as raw JSON so numeric values can be string-coerced.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Value,

    #[serde(default)]
    pub password: Value,
}

/// Body of `POST /delete`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub public_id: Option<String>,
}

/// Body of `POST /verify-otp`.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub otp: Value,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Error type identifier (e.g., "invalid_credentials", "file_too_large")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            status: Some(status.as_u16()),
            ..Self::new(error, message)
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Bare `{success: true}`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Response from `POST /login`.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub email: String,

    /// Artifact expiry (Unix epoch seconds)
    pub expires_at: u64,

    /// The token itself, only in bearer mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Response from `GET /check-auth`.
#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub success: bool,
    pub email: String,
    pub expires_at: u64,
}

/// Response from `POST /upload`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub images: Vec<GalleryEntry>,
}

// =============================================================================
// Error Responses
// =============================================================================

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            GalleryError::NoFilesProvided => (StatusCode::BAD_REQUEST, "no_files_provided"),
            GalleryError::EmptyFile { .. } => (StatusCode::BAD_REQUEST, "empty_file"),
            GalleryError::UnsupportedFileType { .. } => {
                (StatusCode::BAD_REQUEST, "unsupported_file_type")
            }
            GalleryError::FileTooLarge { .. } => (StatusCode::BAD_REQUEST, "file_too_large"),
            GalleryError::MissingParameters(_) => (StatusCode::BAD_REQUEST, "missing_parameters"),
            GalleryError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GalleryError::UpstreamUploadFailure { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upload_failed")
            }
            GalleryError::RemoteDeleteFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "remote_delete_failed")
            }
            GalleryError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// `GET /health` answers `{"status": "healthy", "version": "..."}`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle `POST /login`.
///
/// Compares the submitted credentials with the stored record and, on a
/// match, issues an artifact through the configured strategy: a cookie in
/// cookie and session modes, a `token` field in bearer mode.
///
/// # Response
///
/// - `200 OK`: `{success, email, expires_at[, token]}`
/// - `401 Unauthorized`: wrong, missing or unreadable credentials
/// - `500 Internal Server Error`: credential record could not be loaded
pub async fn login_handler<D: DocumentStore, H: AssetHost>(
    State(state): State<AppState<D, H>>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Unreadable login body: {}", rejection.body_text());
            return Err(AuthError::InvalidCredentials);
        }
    };

    let (Some(email), Some(password)) = (
        coerce_to_string(&request.email),
        coerce_to_string(&request.password),
    ) else {
        return Err(AuthError::InvalidCredentials);
    };

    if !state.credentials.verify(&email, &password).await? {
        return Err(AuthError::InvalidCredentials);
    }

    let issued = state.strategy.issue(&email).await;
    info!(
        email = %email,
        mode = %state.strategy.mode(),
        expires_at = issued.expires_at,
        "Admin logged in"
    );

    let mut body = LoginResponse {
        success: true,
        email,
        expires_at: issued.expires_at,
        token: None,
    };

    match issued.delivery {
        Delivery::Cookie(cookie) => {
            let jar = jar.add(cookie.build(issued.value, issued.max_age));
            Ok((jar, Json(body)).into_response())
        }
        Delivery::Body => {
            body.token = Some(issued.value);
            Ok(Json(body).into_response())
        }
    }
}

/// Handle `POST /logout`.
///
/// Revokes the presented artifact where the strategy keeps server-side state
/// and clears the artifact cookie. Always succeeds.
pub async fn logout_handler<D: DocumentStore, H: AssetHost>(
    State(state): State<AppState<D, H>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    if let Some(artifact) = state.strategy.extract(&headers) {
        state.strategy.revoke(&artifact).await;
        debug!(mode = %state.strategy.mode(), "Artifact revoked");
    }

    match state.strategy.cookie() {
        Some(cookie) => (jar.add(cookie.expired()), Json(SuccessResponse::ok())).into_response(),
        None => Json(SuccessResponse::ok()).into_response(),
    }
}

/// Handle `GET /check-auth` and `GET /verify-token`.
pub async fn check_auth_handler<D: DocumentStore, H: AssetHost>(
    State(state): State<AppState<D, H>>,
    headers: HeaderMap,
) -> Result<Json<AuthStatusResponse>, AuthError> {
    let identity = authenticate(state.strategy.as_ref(), &headers).await?;
    Ok(Json(AuthStatusResponse {
        success: true,
        email: identity.email,
        expires_at: identity.expires_at,
    }))
}

/// Handle `POST /upload`.
///
/// Every multipart part with a filename is an image; an optional `folder`
/// text part selects the destination folder. The batch is all-or-nothing.
///
/// # Response
///
/// - `200 OK`: `{success: true, images: [{key, url, public_id}, ...]}` in input order
/// - `400 Bad Request`: no files, empty file, wrong type, too large, bad folder
/// - `500 Internal Server Error`: host or store failure (nothing committed)
pub async fn upload_handler<D: DocumentStore, H: AssetHost>(
    State(state): State<AppState<D, H>>,
    Extension(identity): Extension<Identity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, GalleryError> {
    let mut multipart =
        multipart.map_err(|rejection| GalleryError::InvalidRequest(rejection.body_text()))?;

    let mut files = Vec::new();
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GalleryError::InvalidRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);

        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| GalleryError::InvalidRequest(e.body_text()))?;
                files.push(ImageUpload::new(filename, content_type, data));
            }
            None if name.as_deref() == Some(FOLDER_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| GalleryError::InvalidRequest(e.body_text()))?;
                let text = text.trim().trim_matches('/');
                if !text.is_empty() {
                    folder = Some(validate_folder(text)?.to_string());
                }
            }
            None => {
                debug!(field = ?name, "Ignoring non-file multipart field");
            }
        }
    }

    let folder = folder.unwrap_or_else(|| state.gallery.folder().to_string());
    let images = state.gallery.upload_to(&folder, files).await?;

    info!(
        email = %identity.email,
        count = images.len(),
        folder = %folder,
        "Images uploaded"
    );

    Ok(Json(UploadResponse {
        success: true,
        images,
    }))
}

/// Folders are `/`-separated segments of ASCII letters, digits, `-` and `_`.
fn validate_folder(folder: &str) -> Result<&str, GalleryError> {
    let valid = folder.len() <= 128
        && folder.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });

    if valid {
        Ok(folder)
    } else {
        Err(GalleryError::InvalidRequest(format!(
            "Invalid folder '{}'",
            folder
        )))
    }
}

/// Handle `GET /images`: every gallery entry, newest first.
pub async fn images_handler<D: DocumentStore, H: AssetHost>(
    State(state): State<AppState<D, H>>,
) -> Result<Json<Vec<GalleryEntry>>, GalleryError> {
    Ok(Json(state.gallery.list().await?))
}

/// Handle `POST /delete`.
///
/// # Response
///
/// - `200 OK`: `{success: true}`; asset and record are gone
/// - `400 Bad Request`: `key` or `public_id` missing, `key` not a single
///   gallery key, or `public_id` not the one stored under `key`
/// - `500 Internal Server Error`: the host did not confirm; the record is kept
pub async fn delete_handler<D: DocumentStore, H: AssetHost>(
    State(state): State<AppState<D, H>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, GalleryError> {
    let Json(request) =
        payload.map_err(|rejection| GalleryError::InvalidRequest(rejection.body_text()))?;

    state
        .gallery
        .delete(request.key.as_deref(), request.public_id.as_deref())
        .await?;

    info!(
        email = %identity.email,
        key = request.key.as_deref().unwrap_or_default(),
        "Image deleted"
    );
    Ok(Json(SuccessResponse::ok()))
}

/// Handle `POST /send-otp`.
///
/// Issues a code for a fresh client id, delivers it to the stored admin
/// address and hands the client id back in the `otp_id` cookie.
pub async fn send_otp_handler<D: DocumentStore>(
    State(state): State<OtpState<D>>,
    jar: CookieJar,
) -> Result<Response, AuthError> {
    let recipient = state
        .credentials
        .load()
        .await?
        .map(|record| record.email)
        .ok_or(MailError::NoRecipient)?;

    let client_id = OtpStore::new_client_id();
    let code = state.store.issue(&client_id).await;
    let ttl = state.store.ttl();

    state.mailer.send_code(&recipient, &code, ttl).await?;
    debug!(ttl_secs = ttl.as_secs(), "One-time code sent");

    let jar = jar.add(state.cookie.build(client_id, ttl));
    Ok((jar, Json(SuccessResponse::ok())).into_response())
}

/// Handle `POST /verify-otp`.
///
/// # Response
///
/// - `200 OK`: `{success: true}`; the code is consumed
/// - `400 Bad Request`: `otp_not_issued`, `otp_expired` or `otp_mismatch`
pub async fn verify_otp_handler<D: DocumentStore>(
    State(state): State<OtpState<D>>,
    jar: CookieJar,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let client_id = jar
        .get(state.cookie.name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::OtpNotIssued)?;

    let code = payload
        .ok()
        .and_then(|Json(request)| coerce_to_string(&request.otp))
        .unwrap_or_default();

    if let Err(e) = state.store.verify(&client_id, &code).await {
        if matches!(e, AuthError::OtpMismatch) {
            warn!("One-time code mismatch");
        }
        return Err(e);
    }

    info!("One-time code verified");
    let jar = jar.add(state.cookie.expired());
    Ok((jar, Json(SuccessResponse::ok())).into_response())
}
