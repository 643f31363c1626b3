//! # Gallery Admin
//!
//! Authentication and image gallery backend for a single administrator.
//!
//! The admin logs in with the email/password pair stored in a hosted document
//! store, receives an expiring artifact (signed cookie, bearer token or
//! server-side session) and can then upload images to an external asset host,
//! list the gallery newest first and delete entries.
//!
//! ## Features
//!
//! - **Pluggable artifacts**: cookie, bearer or session mode behind one trait
//! - **All-or-nothing uploads**: bounded concurrent host uploads with rollback
//! - **Verified deletes**: records are removed only after the host confirms
//! - **Backends**: Firebase Realtime Database, Cloudinary, S3, and in-memory
//!   versions of each for development and tests
//! - **One-time codes**: optional keyed, expiring, single-use codes
//!
//! ## Architecture
//!
//! - [`store`] - Document store trait, Firebase and memory adapters
//! - [`host`] - Asset host trait, Cloudinary, S3 and memory adapters
//! - [`gallery`] - Upload policy and gallery workflows
//! - [`auth`] - Signed tokens, sessions, artifact strategies, one-time codes
//! - [`server`] - Axum handlers, access guard and router
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use gallery_admin::{
//!     build_strategy, create_router, AppState, ArtifactMode, CredentialStore, GalleryService,
//!     GalleryStore, MemoryAssetHost, MemoryStore, RouterConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::with_admin("admin@example.com", "hunter2"));
//!     let host = Arc::new(MemoryAssetHost::new());
//!
//!     let gallery = GalleryService::new(GalleryStore::new(store.clone()), host);
//!     let strategy = build_strategy(
//!         ArtifactMode::Cookie,
//!         Some("secret"),
//!         Duration::from_secs(3600),
//!         true,
//!     )
//!     .unwrap();
//!
//!     let state = AppState::new(gallery, CredentialStore::new(store), strategy);
//!     let router = create_router(state, None, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod gallery;
pub mod host;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use auth::{
    build_strategy, ArtifactMode, ArtifactStrategy, Identity, LogMailer, OtpMailer, OtpStore,
    SessionStore, TokenClaims, TokenSigner,
};
pub use config::{
    AssetHostBackend, CheckConfig, Cli, Command, ServeConfig, StoreArgs, StoreBackend,
    TokenConfig, TokenOutputFormat,
};
pub use error::{ArtifactRejection, AuthError, GalleryError, HostError, MailError, StoreError};
pub use gallery::{GalleryService, UploadPolicy};
pub use host::{
    create_s3_client, AssetHost, CloudinaryConfig, CloudinaryHost, DestroyOutcome, HostedAsset,
    ImageUpload, MemoryAssetHost, S3AssetHost,
};
pub use server::{create_router, AppState, ErrorResponse, OtpState, RouterConfig};
pub use store::{
    CredentialStore, DocumentStore, FirebaseStore, GalleryEntry, GalleryRecord, GalleryStore,
    MemoryStore,
};
