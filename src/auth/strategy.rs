//! Pluggable authentication artifacts.
//!
//! The server delegates everything about the login artifact to one
//! [`ArtifactStrategy`]: how it is issued, where the client presents it,
//! how it is verified and how logout revokes it.
//!
//! | Mode      | Artifact               | Presented as                    |
//! |-----------|------------------------|---------------------------------|
//! | `cookie`  | signed token           | `token` cookie                  |
//! | `bearer`  | signed token           | `Authorization: Bearer <token>` |
//! | `session` | random session id      | `sid` cookie                    |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use clap::ValueEnum;
use http::header::AUTHORIZATION;
use http::HeaderMap;

use super::session::SessionStore;
use super::token::TokenSigner;
use crate::error::{ArtifactRejection, AuthError};

/// Cookie carrying a signed token.
pub const TOKEN_COOKIE: &str = "token";

/// Cookie carrying a session id.
pub const SESSION_COOKIE: &str = "sid";

/// Which artifact the server issues at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ArtifactMode {
    /// Signed token in an HttpOnly cookie
    #[default]
    Cookie,
    /// Signed token in the login body, presented as a bearer token
    Bearer,
    /// Opaque session id in a cookie, backed by a server-side table
    Session,
}

impl ArtifactMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactMode::Cookie => "cookie",
            ArtifactMode::Bearer => "bearer",
            ArtifactMode::Session => "session",
        }
    }

    /// Whether this mode signs tokens and therefore needs a secret.
    pub fn uses_signed_tokens(&self) -> bool {
        !matches!(self, ArtifactMode::Session)
    }
}

impl fmt::Display for ArtifactMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of an artifact cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: &'static str,

    /// Send the `Secure` attribute (and `SameSite=None`); when off the cookie
    /// falls back to `SameSite=Lax` so it still works over plain http.
    pub secure: bool,
}

impl CookieSettings {
    pub fn new(name: &'static str) -> Self {
        Self { name, secure: true }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Cookie holding `value` for `max_age`.
    pub fn build(&self, value: String, max_age: Duration) -> Cookie<'static> {
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        self.base(value, time::Duration::seconds(max_age))
    }

    /// Cookie that clears this one in the browser.
    pub fn expired(&self) -> Cookie<'static> {
        self.base(String::new(), time::Duration::ZERO)
    }

    /// Value of this cookie in the request headers, if present and non-empty.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        CookieJar::from_headers(headers)
            .get(self.name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn base(&self, value: String, max_age: time::Duration) -> Cookie<'static> {
        let same_site = if self.secure {
            SameSite::None
        } else {
            SameSite::Lax
        };
        Cookie::build((self.name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(same_site)
            .max_age(max_age)
            .build()
    }
}

/// How an issued artifact reaches the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Set as a cookie
    Cookie(CookieSettings),
    /// Returned in the response body
    Body,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct IssuedArtifact {
    pub value: String,
    pub expires_at: u64,
    pub max_age: Duration,
    pub delivery: Delivery,
}

/// The authenticated admin behind a verified artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub expires_at: u64,
}

/// Issues, locates, verifies and revokes login artifacts.
#[async_trait]
pub trait ArtifactStrategy: Send + Sync {
    fn mode(&self) -> ArtifactMode;

    /// Find the artifact in a request, if the client sent one.
    fn extract(&self, headers: &HeaderMap) -> Option<String>;

    async fn issue(&self, email: &str) -> IssuedArtifact;

    async fn verify(&self, artifact: &str) -> Result<Identity, ArtifactRejection>;

    /// Invalidate an artifact server-side. Stateless artifacts cannot be
    /// revoked and rely on expiry.
    async fn revoke(&self, _artifact: &str) {}

    /// Cookie used by this strategy, if any.
    fn cookie(&self) -> Option<&CookieSettings> {
        None
    }
}

/// Extract and verify the artifact carried by `headers`.
pub async fn authenticate(
    strategy: &dyn ArtifactStrategy,
    headers: &HeaderMap,
) -> Result<Identity, AuthError> {
    let artifact = strategy
        .extract(headers)
        .ok_or(AuthError::Unauthenticated)?;

    strategy
        .verify(&artifact)
        .await
        .map_err(|reason| AuthError::InvalidArtifact { reason })
}

/// Signed token in an HttpOnly cookie.
pub struct CookieTokenStrategy {
    signer: TokenSigner,
    cookie: CookieSettings,
}

impl CookieTokenStrategy {
    pub fn new(signer: TokenSigner) -> Self {
        Self {
            signer,
            cookie: CookieSettings::new(TOKEN_COOKIE),
        }
    }

    pub fn with_cookie(mut self, cookie: CookieSettings) -> Self {
        self.cookie = cookie;
        self
    }
}

#[async_trait]
impl ArtifactStrategy for CookieTokenStrategy {
    fn mode(&self) -> ArtifactMode {
        ArtifactMode::Cookie
    }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        self.cookie.read(headers)
    }

    async fn issue(&self, email: &str) -> IssuedArtifact {
        let (token, claims) = self.signer.issue(email);
        IssuedArtifact {
            value: token,
            expires_at: claims.exp,
            max_age: self.signer.ttl(),
            delivery: Delivery::Cookie(self.cookie.clone()),
        }
    }

    async fn verify(&self, artifact: &str) -> Result<Identity, ArtifactRejection> {
        let claims = self.signer.verify(artifact)?;
        Ok(Identity {
            email: claims.email,
            expires_at: claims.exp,
        })
    }

    fn cookie(&self) -> Option<&CookieSettings> {
        Some(&self.cookie)
    }
}

/// Signed token returned in the body and presented as a bearer token.
pub struct BearerTokenStrategy {
    signer: TokenSigner,
}

impl BearerTokenStrategy {
    pub fn new(signer: TokenSigner) -> Self {
        Self { signer }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl ArtifactStrategy for BearerTokenStrategy {
    fn mode(&self) -> ArtifactMode {
        ArtifactMode::Bearer
    }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        bearer_token(headers)
    }

    async fn issue(&self, email: &str) -> IssuedArtifact {
        let (token, claims) = self.signer.issue(email);
        IssuedArtifact {
            value: token,
            expires_at: claims.exp,
            max_age: self.signer.ttl(),
            delivery: Delivery::Body,
        }
    }

    async fn verify(&self, artifact: &str) -> Result<Identity, ArtifactRejection> {
        let claims = self.signer.verify(artifact)?;
        Ok(Identity {
            email: claims.email,
            expires_at: claims.exp,
        })
    }
}

/// Random session id in a cookie, backed by [`SessionStore`].
pub struct SessionStrategy {
    sessions: SessionStore,
    cookie: CookieSettings,
}

impl SessionStrategy {
    pub fn new(sessions: SessionStore) -> Self {
        Self {
            sessions,
            cookie: CookieSettings::new(SESSION_COOKIE),
        }
    }

    pub fn with_cookie(mut self, cookie: CookieSettings) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[async_trait]
impl ArtifactStrategy for SessionStrategy {
    fn mode(&self) -> ArtifactMode {
        ArtifactMode::Session
    }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        self.cookie.read(headers)
    }

    async fn issue(&self, email: &str) -> IssuedArtifact {
        let (id, session) = self.sessions.create(email).await;
        IssuedArtifact {
            value: id,
            expires_at: session.expires_at,
            max_age: self.sessions.ttl(),
            delivery: Delivery::Cookie(self.cookie.clone()),
        }
    }

    async fn verify(&self, artifact: &str) -> Result<Identity, ArtifactRejection> {
        let session = self.sessions.get(artifact).await?;
        Ok(Identity {
            email: session.email,
            expires_at: session.expires_at,
        })
    }

    async fn revoke(&self, artifact: &str) {
        self.sessions.revoke(artifact).await;
    }

    fn cookie(&self) -> Option<&CookieSettings> {
        Some(&self.cookie)
    }
}

/// Build the strategy for `mode`.
///
/// Token modes require a secret; session mode ignores it.
pub fn build_strategy(
    mode: ArtifactMode,
    secret: Option<&str>,
    ttl: Duration,
    cookie_secure: bool,
) -> Result<Arc<dyn ArtifactStrategy>, String> {
    let signer = || match secret.filter(|s| !s.is_empty()) {
        Some(secret) => Ok(TokenSigner::new(secret).with_ttl(ttl)),
        None => Err(format!("artifact mode '{}' requires an auth secret", mode)),
    };

    let strategy: Arc<dyn ArtifactStrategy> = match mode {
        ArtifactMode::Cookie => Arc::new(
            CookieTokenStrategy::new(signer()?)
                .with_cookie(CookieSettings::new(TOKEN_COOKIE).with_secure(cookie_secure)),
        ),
        ArtifactMode::Bearer => Arc::new(BearerTokenStrategy::new(signer()?)),
        ArtifactMode::Session => Arc::new(
            SessionStrategy::new(SessionStore::with_ttl(ttl))
                .with_cookie(CookieSettings::new(SESSION_COOKIE).with_secure(cookie_secure)),
        ),
    };

    Ok(strategy)
}
