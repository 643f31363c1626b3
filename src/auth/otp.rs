//! One-time code side-channel.
//!
//! Codes are kept per client in a bounded LRU map. Each client is identified
//! by an opaque id handed out together with the code (the `otp_id` cookie),
//! so concurrent requesters never overwrite each other's slot.
//!
//! ```text
//! send-otp ──► issue(client_id) ──► slot {code, expires_at}
//!                                        │
//! verify-otp ──► verify(client_id, code) ┘
//!                  ├─ no slot       → OtpNotIssued
//!                  ├─ now >= expiry → OtpExpired   (slot dropped)
//!                  ├─ wrong code    → OtpMismatch  (slot kept)
//!                  └─ match         → Ok           (slot consumed)
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use rand::{Rng, RngCore};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::info;

use super::token::unix_now;
use crate::error::{AuthError, MailError};

/// Default code lifetime: 5 minutes.
pub const DEFAULT_OTP_TTL: Duration = Duration::from_secs(300);

/// Maximum number of outstanding codes.
pub const DEFAULT_OTP_SLOTS: usize = 1024;

#[derive(Debug, Clone)]
struct OtpSlot {
    code: String,
    expires_at: u64,
}

/// Keyed, time-bound store of one-time codes.
pub struct OtpStore {
    slots: RwLock<LruCache<String, OtpSlot>>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_OTP_TTL, DEFAULT_OTP_SLOTS)
    }

    pub fn with_config(ttl: Duration, capacity: usize) -> Self {
        Self {
            slots: RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh random client id (16 random bytes, hex).
    pub fn new_client_id() -> String {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Uniformly random 6-digit code.
    pub fn generate_code() -> String {
        rand::rng().random_range(100_000u32..=999_999).to_string()
    }

    /// Issue a new code for `client_id`, replacing any previous one.
    pub async fn issue(&self, client_id: &str) -> String {
        self.issue_at(client_id, unix_now()).await
    }

    pub async fn issue_at(&self, client_id: &str, now: u64) -> String {
        let code = Self::generate_code();
        self.insert_at(client_id, &code, now).await;
        code
    }

    /// Store a known code for `client_id`.
    pub async fn insert_at(&self, client_id: &str, code: &str, now: u64) {
        let slot = OtpSlot {
            code: code.to_string(),
            expires_at: now.saturating_add(self.ttl.as_secs()),
        };
        self.slots.write().await.put(client_id.to_string(), slot);
    }

    /// Verify and consume the code for `client_id`.
    pub async fn verify(&self, client_id: &str, code: &str) -> Result<(), AuthError> {
        self.verify_at(client_id, code, unix_now()).await
    }

    pub async fn verify_at(&self, client_id: &str, code: &str, now: u64) -> Result<(), AuthError> {
        let mut slots = self.slots.write().await;

        let slot = slots.peek(client_id).ok_or(AuthError::OtpNotIssued)?;

        if now >= slot.expires_at {
            slots.pop(client_id);
            return Err(AuthError::OtpExpired);
        }

        if !bool::from(slot.code.as_bytes().ct_eq(code.trim().as_bytes())) {
            return Err(AuthError::OtpMismatch);
        }

        slots.pop(client_id);
        Ok(())
    }

    /// Number of outstanding codes.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivers one-time codes to the admin.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_code(&self, recipient: &str, code: &str, ttl: Duration)
        -> Result<(), MailError>;
}

/// Mailer that writes deliveries to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_code(
        &self,
        recipient: &str,
        code: &str,
        ttl: Duration,
    ) -> Result<(), MailError> {
        if recipient.trim().is_empty() {
            return Err(MailError::NoRecipient);
        }
        info!(
            recipient = %recipient,
            code = %code,
            ttl_secs = ttl.as_secs(),
            "One-time code issued"
        );
        Ok(())
    }
}
