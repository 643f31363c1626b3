//! HTTP server layer for the gallery admin API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │      /login  /check-auth  /upload  /images  /delete  ...        │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │  (guard)    │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::require_artifact;
pub use handlers::{
    check_auth_handler, delete_handler, health_handler, images_handler, login_handler,
    logout_handler, send_otp_handler, upload_handler, verify_otp_handler, AppState,
    AuthStatusResponse, DeleteRequest, ErrorResponse, HealthResponse, LoginRequest, LoginResponse,
    OtpState, SuccessResponse, UploadResponse, VerifyOtpRequest, FOLDER_FIELD, OTP_COOKIE,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_REQUEST_BYTES};
