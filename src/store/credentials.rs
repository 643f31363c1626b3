//! Admin credential record.
//!
//! The store holds exactly one `{email, password}` record under `login`.
//! This system only ever reads it.

use std::sync::Arc;

use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::debug;

use super::DocumentStore;
use crate::error::StoreError;

/// Store path of the credential singleton.
pub const LOGIN_PATH: &str = "login";

/// The stored admin credentials, string-coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub email: String,
    pub password: String,
}

impl CredentialRecord {
    /// Build a record from the raw store value.
    ///
    /// Returns `None` when either field is missing or not coercible.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            email: coerce_to_string(value.get("email")?)?,
            password: coerce_to_string(value.get("password")?)?,
        })
    }

    /// Compare submitted credentials against this record.
    ///
    /// Both fields are always compared so a mismatch takes the same path
    /// whichever field is wrong.
    pub fn matches(&self, email: &str, password: &str) -> bool {
        let email_ok = self.email.as_bytes().ct_eq(email.as_bytes());
        let password_ok = self.password.as_bytes().ct_eq(password.as_bytes());
        (email_ok & password_ok).into()
    }
}

/// String coercion applied to both stored and submitted values.
///
/// Strings pass through, numbers and booleans use their JSON text, anything
/// else (null, arrays, objects) is treated as absent.
pub fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read-only view of the credential singleton.
pub struct CredentialStore<D> {
    store: Arc<D>,
}

impl<D> Clone for CredentialStore<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<D: DocumentStore> CredentialStore<D> {
    pub fn new(store: Arc<D>) -> Self {
        Self { store }
    }

    /// Load the credential record, if one is stored and well-formed.
    pub async fn load(&self) -> Result<Option<CredentialRecord>, StoreError> {
        let value = self.store.get(LOGIN_PATH).await?;
        let record = value.as_ref().and_then(CredentialRecord::from_value);
        if record.is_none() {
            debug!("no usable credential record at '{}'", LOGIN_PATH);
        }
        Ok(record)
    }

    /// Check submitted credentials. A missing record never matches.
    pub async fn verify(&self, email: &str, password: &str) -> Result<bool, StoreError> {
        Ok(self
            .load()
            .await?
            .map(|record| record.matches(email, password))
            .unwrap_or(false))
    }
}
