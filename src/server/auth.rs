//! Access guard for protected gallery routes.
//!
//! The guard asks the configured [`ArtifactStrategy`] to locate and verify
//! the login artifact. On success the verified [`Identity`] is attached to the
//! request extensions so handlers can read it with `Extension<Identity>`;
//! otherwise the request is answered with 401 (no artifact) or 403 (an
//! artifact that fails verification) and never reaches the handler.
//!
//! ```text
//! request ──► extract(headers) ──► verify(artifact) ──► handler
//!                  │                      │
//!                  ▼                      ▼
//!          401 unauthenticated      403 invalid_artifact
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, warn};

use super::handlers::ErrorResponse;
use crate::auth::{authenticate, ArtifactStrategy};
use crate::error::{ArtifactRejection, AuthError};

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AuthError::InvalidArtifact { .. } => (StatusCode::FORBIDDEN, "invalid_artifact"),
            AuthError::OtpNotIssued => (StatusCode::BAD_REQUEST, "otp_not_issued"),
            AuthError::OtpExpired => (StatusCode::BAD_REQUEST, "otp_expired"),
            AuthError::OtpMismatch => (StatusCode::BAD_REQUEST, "otp_mismatch"),
            AuthError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            AuthError::Mail(_) => (StatusCode::INTERNAL_SERVER_ERROR, "mail_error"),
        };
        let message = self.to_string();

        // Wrong passwords and forged artifacts are worth noticing; missing or
        // expired artifacts are routine.
        match &self {
            _ if status.is_server_error() => {
                error!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Server error: {}",
                    message
                );
            }
            AuthError::InvalidCredentials
            | AuthError::OtpMismatch
            | AuthError::InvalidArtifact {
                reason: ArtifactRejection::BadSignature | ArtifactRejection::Malformed,
            } => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

/// Middleware that admits only requests carrying a valid artifact.
///
/// # Usage
///
/// ```ignore
/// let protected = Router::new()
///     .route("/images", get(images_handler))
///     .layer(middleware::from_fn_with_state(strategy, require_artifact));
/// ```
pub async fn require_artifact(
    State(strategy): State<Arc<dyn ArtifactStrategy>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticate(strategy.as_ref(), request.headers()).await?;

    debug!(
        email = %identity.email,
        path = %request.uri().path(),
        "Artifact accepted"
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
