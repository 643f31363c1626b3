//! Gallery Admin - authentication and image gallery backend.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gallery_admin::{
    auth::DEFAULT_OTP_SLOTS,
    build_strategy,
    config::{
        AssetHostBackend, CheckConfig, Cli, Command, ServeConfig, StoreArgs, StoreBackend,
        TokenConfig, TokenOutputFormat,
    },
    create_router, create_s3_client, AppState, AssetHost, CloudinaryConfig, CloudinaryHost,
    CredentialStore, DocumentStore, FirebaseStore, GalleryService, GalleryStore, LogMailer,
    MemoryAssetHost, MemoryStore, OtpState, OtpStore, RouterConfig, S3AssetHost, TokenSigner,
    UploadPolicy,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Gallery Admin v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Store: {:?}", config.store.backend);
    if let Some(ref url) = config.store.store_url {
        info!("  Store URL: {}", url);
    }
    info!("  Asset host: {:?}", config.asset_host);
    info!(
        "  Uploads: folder '{}', {} concurrent, policy {}",
        config.upload_folder,
        config.upload_concurrency,
        if config.upload_policy { "enforced" } else { "OFF" }
    );
    info!(
        "  Artifact: {} (ttl {}s)",
        config.artifact_mode, config.token_ttl
    );
    if !config.cookie_secure {
        warn!("  Cookies are sent without the Secure attribute; use only over plain-http development setups");
    }
    if config.cookie_artifact_without_cors_origins() {
        warn!(
            "  {} mode without --cors-origins: cross-origin browsers will not send the cookie",
            config.artifact_mode
        );
    }
    if config.otp_enabled {
        info!("  One-time codes: enabled (ttl {}s)", config.otp_ttl);
    }

    let http = reqwest::Client::new();

    match config.store.backend {
        StoreBackend::Firebase => match open_firebase(&config.store, http.clone()) {
            Ok(store) => serve_with_store(Arc::new(store), http, config).await,
            Err(e) => {
                error!("Invalid store configuration: {}", e);
                ExitCode::FAILURE
            }
        },
        StoreBackend::Memory => {
            let store = open_memory(&config.store);
            serve_with_store(Arc::new(store), http, config).await
        }
    }
}

fn open_firebase(args: &StoreArgs, http: reqwest::Client) -> Result<FirebaseStore, String> {
    let url = args.store_url.as_deref().unwrap_or_default();
    FirebaseStore::new(http, url, args.store_auth.clone()).map_err(|e| e.to_string())
}

fn open_memory(args: &StoreArgs) -> MemoryStore {
    match args.admin_seed() {
        Some((email, password)) => MemoryStore::with_admin(email, password),
        None => {
            warn!("Memory store has no admin record; every login will be rejected");
            MemoryStore::new()
        }
    }
}

/// Pick the asset host and continue.
async fn serve_with_store<D>(store: Arc<D>, http: reqwest::Client, config: ServeConfig) -> ExitCode
where
    D: DocumentStore + 'static,
{
    match config.asset_host {
        AssetHostBackend::Cloudinary => {
            let Some((cloud_name, api_key, api_secret)) = config.cloudinary() else {
                error!("Cloudinary credentials are incomplete");
                return ExitCode::FAILURE;
            };
            let host = CloudinaryHost::new(
                http,
                CloudinaryConfig::new(cloud_name, api_key, api_secret),
            );
            serve(store, Arc::new(host), config).await
        }
        AssetHostBackend::S3 => {
            let bucket = config.s3_bucket.clone().unwrap_or_default();
            let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
            let host = S3AssetHost::new(
                client,
                bucket,
                &config.s3_region,
                config.s3_public_url.clone(),
            );
            info!("  S3 bucket: {}", host.bucket());
            serve(store, Arc::new(host), config).await
        }
        AssetHostBackend::Memory => {
            warn!("  Uploaded images are kept in memory and lost on restart");
            serve(store, Arc::new(MemoryAssetHost::new()), config).await
        }
    }
}

async fn serve<D, H>(store: Arc<D>, host: Arc<H>, config: ServeConfig) -> ExitCode
where
    D: DocumentStore + 'static,
    H: AssetHost + 'static,
{
    let credentials = CredentialStore::new(store.clone());

    info!("");
    info!("Connecting to document store...");
    match credentials.load().await {
        Ok(Some(record)) => info!("  Admin record found for {}", record.email),
        Ok(None) => warn!("  No admin record stored; every login will be rejected"),
        Err(e) => {
            error!("  Failed to reach the document store: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let policy = if config.upload_policy {
        UploadPolicy::default().with_max_bytes(config.max_upload_bytes)
    } else {
        UploadPolicy::permissive()
    };

    let gallery = GalleryService::new(GalleryStore::new(store), host)
        .with_policy(policy)
        .with_folder(config.upload_folder.as_str())
        .with_concurrency(config.upload_concurrency);

    let strategy = match build_strategy(
        config.artifact_mode,
        config.auth_secret.as_deref(),
        Duration::from_secs(config.token_ttl),
        config.cookie_secure,
    ) {
        Ok(strategy) => strategy,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let otp = config.otp_enabled.then(|| {
        OtpState::new(
            OtpStore::with_config(Duration::from_secs(config.otp_ttl), DEFAULT_OTP_SLOTS),
            Arc::new(LogMailer),
            credentials.clone(),
        )
        .with_cookie_secure(config.cookie_secure)
    });

    let state = AppState::new(gallery, credentials, strategy);
    let router = create_router(state, otp, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -X POST http://{}/login -H 'content-type: application/json' \\", addr);
    info!("         -d '{{\"email\":\"...\",\"password\":\"...\"}}'");
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "gallery_admin=debug,tower_http=debug"
    } else {
        "gallery_admin=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_max_request_bytes(config.max_request_bytes);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let signer = TokenSigner::new(&config.secret).with_ttl(Duration::from_secs(config.ttl));
    let (token, claims) = signer.issue(config.email.trim());

    match config.format {
        TokenOutputFormat::Token => {
            println!("{}", token);
        }
        TokenOutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "email": claims.email,
                "iat": claims.iat,
                "exp": claims.exp,
                "ttl": config.ttl,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        TokenOutputFormat::Header => {
            println!("Authorization: Bearer {}", token);
            eprintln!();
            eprintln!("Tip: bearer tokens are accepted with --artifact-mode=bearer");
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Gallery Admin Configuration Check");
    println!("══════════════════════════════════");
    println!();

    if let Err(e) = config.store.validate() {
        println!("✗ Store: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Store: {:?}", config.store.backend);

    match config.store.backend {
        StoreBackend::Firebase => {
            let store = match open_firebase(&config.store, reqwest::Client::new()) {
                Ok(store) => store,
                Err(e) => {
                    println!("✗ Store URL: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            println!("✓ Store URL: {}", store.base_url());
            report_store(Arc::new(store), config.list_images).await
        }
        StoreBackend::Memory => {
            report_store(Arc::new(open_memory(&config.store)), config.list_images).await
        }
    }
}

async fn report_store<D: DocumentStore>(store: Arc<D>, list_images: bool) -> ExitCode {
    println!();
    print!("Loading admin record... ");

    match CredentialStore::new(store.clone()).load().await {
        Ok(Some(record)) => println!("✓ {}", record.email),
        Ok(None) => {
            println!("✗ missing");
            println!();
            println!("  No usable {{email, password}} record at 'login'.");
            println!("  Every login will be rejected until one is stored.");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - The database URL is correct and reachable");
            println!("  - The auth token grants read access");
            return ExitCode::FAILURE;
        }
    }

    print!("Loading gallery... ");
    let entries = match GalleryStore::new(store).list_all().await {
        Ok(entries) => {
            println!("✓ {} image(s)", entries.len());
            entries
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if list_images {
        println!();
        println!("Gallery (newest first):");
        println!("───────────────────────");
        if entries.is_empty() {
            println!("  (no images)");
        }
        for entry in &entries {
            println!("  {}  {}  {}", entry.key, entry.public_id, entry.url);
        }
    }

    println!();
    println!("══════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
