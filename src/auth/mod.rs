//! Admin authentication.
//!
//! - [`TokenSigner`]: HMAC-SHA256 signed, expiring tokens
//! - [`SessionStore`]: server-side sessions for the session mode
//! - [`ArtifactStrategy`]: the configurable artifact (cookie, bearer, session)
//! - [`OtpStore`] / [`OtpMailer`]: the optional one-time code side-channel

mod otp;
mod session;
mod strategy;
mod token;

pub use otp::{LogMailer, OtpMailer, OtpStore, DEFAULT_OTP_SLOTS, DEFAULT_OTP_TTL};
pub use session::{Session, SessionStore};
pub use strategy::{
    authenticate, bearer_token, build_strategy, ArtifactMode, ArtifactStrategy,
    BearerTokenStrategy, CookieSettings, CookieTokenStrategy, Delivery, Identity, IssuedArtifact,
    SessionStrategy, SESSION_COOKIE, TOKEN_COOKIE,
};
pub use token::{unix_now, TokenClaims, TokenSigner, DEFAULT_TOKEN_TTL};
