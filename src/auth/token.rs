//! HMAC-SHA256 signed tokens.
//!
//! # Token Format
//!
//! ```text
//! token     = base64url(claims_json) "." hex(signature)
//! signature = HMAC-SHA256(secret_key, base64url(claims_json))
//! claims    = {"email": "...", "iat": <unix secs>, "exp": <unix secs>}
//! ```
//!
//! This is not a JWT: there is no header segment and the signature is hex.
//! Only this server reads these tokens.
//!
//! A token is accepted while `now < exp`. Signatures are compared in
//! constant time.
//!
//! # Example
//!
//! ```rust
//! use gallery_admin::auth::TokenSigner;
//!
//! let signer = TokenSigner::new("my-secret-key");
//! let (token, claims) = signer.issue("admin@example.com");
//!
//! assert_eq!(signer.verify(&token).unwrap(), claims);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::ArtifactRejection;

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime: 1 hour.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Claims carried by a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Admin email the token was issued to
    pub email: String,

    /// Issued-at (Unix epoch seconds)
    pub iat: u64,

    /// Expiry (Unix epoch seconds)
    pub exp: u64,
}

/// Issues and verifies signed tokens.
#[derive(Clone)]
pub struct TokenSigner {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,

    /// Lifetime of issued tokens
    ttl: Duration,
}

impl TokenSigner {
    /// Create a signer with the default 1 hour lifetime.
    ///
    /// The secret should be at least 32 bytes.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Override the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `email`, valid from now for the configured ttl.
    pub fn issue(&self, email: &str) -> (String, TokenClaims) {
        self.issue_at(email, unix_now())
    }

    /// Issue a token with an explicit issue time.
    pub fn issue_at(&self, email: &str, issued_at: u64) -> (String, TokenClaims) {
        let claims = TokenClaims {
            email: email.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl.as_secs()),
        };
        (self.encode(&claims), claims)
    }

    /// Serialize and sign arbitrary claims.
    pub fn encode(&self, claims: &TokenClaims) -> String {
        // Serializing a struct of strings and integers cannot fail
        let json = serde_json::to_vec(claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = hex::encode(self.compute_signature(&payload));
        format!("{}.{}", payload, signature)
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, ArtifactRejection> {
        self.verify_at(token, unix_now())
    }

    /// Verify a token against an explicit time.
    ///
    /// The signature is checked before the claims are trusted, so a forged
    /// token reports `BadSignature` even if its expiry has passed.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<TokenClaims, ArtifactRejection> {
        let (payload, signature) = token
            .trim()
            .split_once('.')
            .ok_or(ArtifactRejection::Malformed)?;

        let provided_sig = hex::decode(signature).map_err(|_| ArtifactRejection::Malformed)?;
        let expected_sig = self.compute_signature(payload);

        if !bool::from(provided_sig.ct_eq(&expected_sig)) {
            return Err(ArtifactRejection::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| ArtifactRejection::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&json).map_err(|_| ArtifactRejection::Malformed)?;

        if now >= claims.exp {
            return Err(ArtifactRejection::Expired);
        }

        Ok(claims)
    }

    fn compute_signature(&self, payload: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}
