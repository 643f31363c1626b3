//! Server-side session table for the session artifact mode.

use std::collections::HashMap;
use std::time::Duration;

use rand::RngCore;
use tokio::sync::RwLock;

use super::token::{unix_now, DEFAULT_TOKEN_TTL};
use crate::error::ArtifactRejection;

/// Random bytes per session id (hex-encoded to 64 chars).
const SESSION_ID_BYTES: usize = 32;

/// A live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub created_at: u64,
    pub expires_at: u64,
}

/// In-memory session table.
///
/// Sessions live for a fixed ttl from creation and are never extended.
/// Expired entries are dropped when looked up and swept on every create.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TOKEN_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session for `email` and return its id.
    pub async fn create(&self, email: &str) -> (String, Session) {
        self.create_at(email, unix_now()).await
    }

    pub async fn create_at(&self, email: &str, now: u64) -> (String, Session) {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let id = hex::encode(bytes);

        let session = Session {
            email: email.to_string(),
            created_at: now,
            expires_at: now.saturating_add(self.ttl.as_secs()),
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| now < s.expires_at);
        sessions.insert(id.clone(), session.clone());

        (id, session)
    }

    /// Look up a session by id.
    pub async fn get(&self, id: &str) -> Result<Session, ArtifactRejection> {
        self.get_at(id, unix_now()).await
    }

    pub async fn get_at(&self, id: &str, now: u64) -> Result<Session, ArtifactRejection> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return Err(ArtifactRejection::UnknownSession),
                Some(session) if now < session.expires_at => return Ok(session.clone()),
                Some(_) => {}
            }
        }

        self.sessions.write().await.remove(id);
        Err(ArtifactRejection::Expired)
    }

    /// Remove a session. Returns whether it existed.
    pub async fn revoke(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Number of stored sessions, expired or not.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
