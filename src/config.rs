//! Configuration management for the gallery admin service.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `GALLERY_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` (default): run the HTTP server
//! - `token`: mint a signed admin token offline
//! - `check`: verify the document store is reachable and report its contents
//!
//! # Environment Variables
//!
//! - `GALLERY_HOST` / `GALLERY_PORT` - Bind address (default: 0.0.0.0:4000)
//! - `GALLERY_STORE` - `firebase` or `memory` (default: firebase)
//! - `GALLERY_STORE_URL` / `GALLERY_STORE_AUTH` - Realtime database URL and auth token
//! - `GALLERY_ADMIN_EMAIL` / `GALLERY_ADMIN_PASSWORD` - Admin seed for the memory store
//! - `GALLERY_ASSET_HOST` - `cloudinary`, `s3` or `memory` (default: cloudinary)
//! - `GALLERY_S3_BUCKET`, `GALLERY_S3_ENDPOINT`, `GALLERY_S3_REGION`, `GALLERY_S3_PUBLIC_URL`
//! - `GALLERY_CLOUDINARY_CLOUD_NAME`, `GALLERY_CLOUDINARY_API_KEY`, `GALLERY_CLOUDINARY_API_SECRET`
//! - `GALLERY_UPLOAD_FOLDER` - Destination folder (default: gallery)
//! - `GALLERY_UPLOAD_CONCURRENCY` - Parallel host uploads per request (default: 4)
//! - `GALLERY_UPLOAD_POLICY` - Enforce image type and size limit (default: true)
//! - `GALLERY_MAX_UPLOAD_BYTES` / `GALLERY_MAX_REQUEST_BYTES` - 5 MiB / 50 MiB
//! - `GALLERY_ARTIFACT_MODE` - `cookie`, `bearer` or `session` (default: cookie)
//! - `GALLERY_AUTH_SECRET` - HMAC secret for signed tokens
//! - `GALLERY_TOKEN_TTL` - Artifact lifetime in seconds (default: 3600)
//! - `GALLERY_COOKIE_SECURE` - Send `Secure; SameSite=None` cookies (default: true)
//! - `GALLERY_CORS_ORIGINS` - Comma-separated allowed origins
//! - `GALLERY_OTP` / `GALLERY_OTP_TTL` - One-time code routes (default: off, 300 s)

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::auth::ArtifactMode;
use crate::gallery::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOAD_CONCURRENCY, DEFAULT_UPLOAD_FOLDER};
use crate::server::DEFAULT_MAX_REQUEST_BYTES;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 4000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default artifact lifetime in seconds (1 hour).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Default one-time code lifetime in seconds (5 minutes).
pub const DEFAULT_OTP_TTL_SECS: u64 = 300;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Gallery Admin - authentication and image gallery backend.
///
/// Runs the server when no subcommand is given.
#[derive(Parser, Debug, Clone)]
#[command(name = "gallery-admin")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The command to run; bare invocation means `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Mint a signed admin token
    Token(TokenConfig),

    /// Check the document store and report the admin record and gallery size
    Check(CheckConfig),
}

/// Document store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Firebase Realtime Database REST API
    Firebase,
    /// In-process store (development and tests)
    Memory,
}

/// Asset host backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AssetHostBackend {
    Cloudinary,
    S3,
    /// In-process host (development and tests)
    Memory,
}

/// Document store settings shared by `serve` and `check`.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Document store backend.
    #[arg(long = "store", value_enum, default_value_t = StoreBackend::Firebase, env = "GALLERY_STORE")]
    pub backend: StoreBackend,

    /// Realtime database URL (e.g. https://my-app-default-rtdb.firebaseio.com).
    #[arg(long, env = "GALLERY_STORE_URL")]
    pub store_url: Option<String>,

    /// Realtime database auth token or secret.
    #[arg(long, env = "GALLERY_STORE_AUTH")]
    pub store_auth: Option<String>,

    /// Admin email seeded into the memory store.
    #[arg(long, env = "GALLERY_ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    /// Admin password seeded into the memory store.
    #[arg(long, env = "GALLERY_ADMIN_PASSWORD")]
    pub admin_password: Option<String>,
}

impl StoreArgs {
    pub fn validate(&self) -> Result<(), String> {
        match self.backend {
            StoreBackend::Firebase => {
                if self.store_url.as_deref().map_or(true, str::is_empty) {
                    return Err(
                        "The firebase store requires a database URL. Set --store-url or GALLERY_STORE_URL"
                            .to_string(),
                    );
                }
            }
            StoreBackend::Memory => {
                if self.admin_email.is_some() != self.admin_password.is_some() {
                    return Err(
                        "--admin-email and --admin-password must be given together".to_string(),
                    );
                }
            }
        }
        Ok(())
    }

    /// Admin seed for the memory store, when both halves are set.
    pub fn admin_seed(&self) -> Option<(&str, &str)> {
        Some((self.admin_email.as_deref()?, self.admin_password.as_deref()?))
    }
}

/// Configuration for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GALLERY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GALLERY_PORT")]
    pub port: u16,

    // =========================================================================
    // Document Store
    // =========================================================================
    #[command(flatten)]
    pub store: StoreArgs,

    // =========================================================================
    // Asset Host
    // =========================================================================
    /// Where uploaded images are hosted.
    #[arg(long, value_enum, default_value_t = AssetHostBackend::Cloudinary, env = "GALLERY_ASSET_HOST")]
    pub asset_host: AssetHostBackend,

    /// S3 bucket for uploaded images.
    #[arg(long, env = "GALLERY_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "GALLERY_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "GALLERY_S3_REGION")]
    pub s3_region: String,

    /// Public base URL of the bucket (CDN or website endpoint).
    #[arg(long, env = "GALLERY_S3_PUBLIC_URL")]
    pub s3_public_url: Option<String>,

    #[arg(long, env = "GALLERY_CLOUDINARY_CLOUD_NAME")]
    pub cloudinary_cloud_name: Option<String>,

    #[arg(long, env = "GALLERY_CLOUDINARY_API_KEY")]
    pub cloudinary_api_key: Option<String>,

    #[arg(long, env = "GALLERY_CLOUDINARY_API_SECRET")]
    pub cloudinary_api_secret: Option<String>,

    // =========================================================================
    // Uploads
    // =========================================================================
    /// Default destination folder at the asset host.
    #[arg(long, default_value = DEFAULT_UPLOAD_FOLDER, env = "GALLERY_UPLOAD_FOLDER")]
    pub upload_folder: String,

    /// Maximum concurrent host uploads per request.
    #[arg(long, default_value_t = DEFAULT_UPLOAD_CONCURRENCY, env = "GALLERY_UPLOAD_CONCURRENCY")]
    pub upload_concurrency: usize,

    /// Enforce the image type and size policy (`--upload-policy=false` to disable).
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "GALLERY_UPLOAD_POLICY")]
    pub upload_policy: bool,

    /// Largest accepted image in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "GALLERY_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    /// Largest accepted request body in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_REQUEST_BYTES, env = "GALLERY_MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    // =========================================================================
    // Authentication
    // =========================================================================
    /// How the login artifact is delivered.
    #[arg(long, value_enum, default_value_t = ArtifactMode::Cookie, env = "GALLERY_ARTIFACT_MODE")]
    pub artifact_mode: ArtifactMode,

    /// Secret key for HMAC-SHA256 signed tokens (cookie and bearer modes).
    #[arg(long, env = "GALLERY_AUTH_SECRET")]
    pub auth_secret: Option<String>,

    /// Artifact lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS, env = "GALLERY_TOKEN_TTL")]
    pub token_ttl: u64,

    /// Mark artifact cookies `Secure; SameSite=None` (`--cookie-secure=false` for plain http).
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "GALLERY_COOKIE_SECURE")]
    pub cookie_secure: bool,

    // =========================================================================
    // One-time codes
    // =========================================================================
    /// Mount /send-otp and /verify-otp.
    #[arg(long = "otp", default_value_t = false, env = "GALLERY_OTP")]
    pub otp_enabled: bool,

    /// One-time code lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_OTP_TTL_SECS, env = "GALLERY_OTP_TTL")]
    pub otp_ttl: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin without credentials.
    #[arg(long, env = "GALLERY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;

        if self.artifact_mode.uses_signed_tokens()
            && self.auth_secret.as_deref().map_or(true, str::is_empty)
        {
            return Err(format!(
                "Artifact mode '{}' signs tokens but no secret was provided. \
                 Set --auth-secret or GALLERY_AUTH_SECRET, or use --artifact-mode=session",
                self.artifact_mode
            ));
        }

        match self.asset_host {
            AssetHostBackend::S3 => {
                if self.s3_bucket.as_deref().map_or(true, str::is_empty) {
                    return Err(
                        "S3 bucket name is required. Set --s3-bucket or GALLERY_S3_BUCKET"
                            .to_string(),
                    );
                }
            }
            AssetHostBackend::Cloudinary => {
                if self.cloudinary().is_none() {
                    return Err("Cloudinary requires cloud name, API key and API secret \
                         (GALLERY_CLOUDINARY_CLOUD_NAME, GALLERY_CLOUDINARY_API_KEY, \
                         GALLERY_CLOUDINARY_API_SECRET)"
                        .to_string());
                }
            }
            AssetHostBackend::Memory => {}
        }

        if self.upload_concurrency == 0 {
            return Err("upload_concurrency must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }
        if self.max_request_bytes < self.max_upload_bytes {
            return Err("max_request_bytes must be at least max_upload_bytes".to_string());
        }
        if self.token_ttl == 0 {
            return Err("token_ttl must be greater than 0".to_string());
        }
        if self.otp_enabled && self.otp_ttl == 0 {
            return Err("otp_ttl must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Whether the artifact rides in a cookie while CORS has no explicit
    /// origins. Browsers on another origin will then never send it.
    pub fn cookie_artifact_without_cors_origins(&self) -> bool {
        let uses_cookie = matches!(
            self.artifact_mode,
            ArtifactMode::Cookie | ArtifactMode::Session
        );
        uses_cookie && self.cors_origins.as_ref().map_or(true, Vec::is_empty)
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cloudinary credentials as `(cloud_name, api_key, api_secret)`, when all are set.
    pub fn cloudinary(&self) -> Option<(&str, &str, &str)> {
        fn non_empty(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|s| !s.is_empty())
        }
        Some((
            non_empty(&self.cloudinary_cloud_name)?,
            non_empty(&self.cloudinary_api_key)?,
            non_empty(&self.cloudinary_api_secret)?,
        ))
    }
}

/// Output format for the `token` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenOutputFormat {
    /// The bare token
    Token,
    /// JSON with token, email and timestamps
    Json,
    /// A ready-to-use `Authorization` header
    Header,
}

/// Configuration for the `token` command.
#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// Admin email to embed in the token.
    #[arg(long)]
    pub email: String,

    /// Secret key for HMAC-SHA256 signing.
    #[arg(long, env = "GALLERY_AUTH_SECRET")]
    pub secret: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub ttl: u64,

    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret must not be empty".to_string());
        }
        if self.email.trim().is_empty() {
            return Err("Email must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("TTL must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Configuration for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print every gallery entry.
    #[arg(long, default_value_t = false)]
    pub list_images: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
