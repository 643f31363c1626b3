//! Router configuration for the gallery admin API.
//!
//! # Route Structure
//!
//! ```text
//! /health                        - Health check (public)
//! /login, /logout                - Artifact issuance and revocation (public)
//! /check-auth, /verify-token     - Artifact status (public, checks the artifact itself)
//! /upload, /images, /delete      - Gallery (protected)
//! /send-otp, /verify-otp         - One-time codes (public, only when enabled)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gallery_admin::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::new(gallery, credentials, strategy);
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://admin.example.com".to_string()]);
//!
//! let router = create_router(state, None, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_artifact;
use super::handlers::{
    check_auth_handler, delete_handler, health_handler, images_handler, login_handler,
    logout_handler, send_otp_handler, upload_handler, verify_otp_handler, AppState, OtpState,
};
use crate::host::AssetHost;
use crate::store::DocumentStore;

/// Default request body limit: 50 MiB.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 50 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin, without credentials)
    pub cors_origins: Option<Vec<String>>,

    /// Largest accepted request body in bytes
    pub max_request_bytes: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// By default CORS allows any origin, the body limit is 50 MiB and
    /// tracing is enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins. Listed origins may send cookies.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_max_request_bytes(mut self, bytes: usize) -> Self {
        self.max_request_bytes = bytes;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Gallery routes sit behind [`require_artifact`]; the one-time code routes
/// are mounted only when `otp` is provided.
pub fn create_router<D, H>(
    state: AppState<D, H>,
    otp: Option<OtpState<D>>,
    config: RouterConfig,
) -> Router
where
    D: DocumentStore + 'static,
    H: AssetHost + 'static,
{
    let cors = build_cors_layer(&config);

    let protected_routes = Router::new()
        .route("/upload", post(upload_handler::<D, H>))
        .route("/images", get(images_handler::<D, H>))
        .route("/delete", post(delete_handler::<D, H>))
        .layer(middleware::from_fn_with_state(
            state.strategy.clone(),
            require_artifact,
        ))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(login_handler::<D, H>))
        .route("/logout", post(logout_handler::<D, H>))
        .route("/check-auth", get(check_auth_handler::<D, H>))
        .route("/verify-token", get(check_auth_handler::<D, H>))
        .with_state(state);

    let mut router = Router::new().merge(protected_routes).merge(public_routes);

    if let Some(otp) = otp {
        let otp_routes = Router::new()
            .route("/send-otp", post(send_otp_handler::<D>))
            .route("/verify-otp", post(verify_otp_handler::<D>))
            .with_state(otp);
        router = router.merge(otp_routes);
    }

    let router = router
        .layer(DefaultBodyLimit::max(config.max_request_bytes))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins).allow_credentials(true)
        }
    }
}
