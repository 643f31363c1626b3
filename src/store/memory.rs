//! In-process document store.
//!
//! Keeps the whole tree as a single JSON object behind a lock. Used for
//! development (`--store memory`) and by the test suites.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{path_segments, DocumentStore};
use crate::error::StoreError;

/// Alphabet used for push keys. Ordered by ASCII value so keys compare the
/// same way as the numbers they encode.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Build a 20-character push key from a millisecond timestamp and a sequence
/// number.
///
/// The first 8 characters encode the timestamp, the remaining 12 the
/// sequence, so keys sort chronologically and stay unique within the same
/// millisecond.
pub fn push_key(millis: u64, sequence: u64) -> String {
    let mut key = [0u8; 20];

    let mut ts = millis;
    for slot in key[..8].iter_mut().rev() {
        *slot = PUSH_CHARS[(ts % 64) as usize];
        ts /= 64;
    }

    let mut seq = sequence;
    for slot in key[8..].iter_mut().rev() {
        *slot = PUSH_CHARS[(seq % 64) as usize];
        seq /= 64;
    }

    key.iter().map(|&b| b as char).collect()
}

/// JSON tree held in memory.
pub struct MemoryStore {
    root: RwLock<Map<String, Value>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Map::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Create a store pre-seeded with the admin credential record.
    pub fn with_admin(email: impl Into<String>, password: impl Into<String>) -> Self {
        let mut root = Map::new();
        root.insert(
            super::LOGIN_PATH.to_string(),
            serde_json::json!({ "email": email.into(), "password": password.into() }),
        );
        Self {
            root: RwLock::new(root),
            sequence: AtomicU64::new(0),
        }
    }

    /// Overwrite the value at `path`, creating intermediate objects.
    pub async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = path_segments(path)?;
        let mut root = self.root.write().await;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        let mut node = &mut *root;
        for segment in parents {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            let Value::Object(map) = child else {
                return Err(StoreError::InvalidPath(path.to_string()));
            };
            node = map;
        }
        node.insert(last.to_string(), value);
        Ok(())
    }

    fn next_key(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        push_key(millis, sequence)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(root: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut node = root.get(*first)?;
    for segment in rest {
        node = node.as_object()?.get(*segment)?;
    }
    Some(node)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = path_segments(path)?;
        let root = self.root.read().await;
        Ok(lookup(&root, &segments).cloned())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let key = self.next_key();
        self.set(&format!("{}/{}", path, key), value).await?;
        Ok(key)
    }

    async fn list(&self, path: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let segments = path_segments(path)?;
        let root = self.root.read().await;
        let mut children: Vec<(String, Value)> = match lookup(&root, &segments) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        };
        // Match the REST API, which hands back children ordered by key.
        children.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(children)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let segments = path_segments(path)?;
        let mut root = self.root.write().await;
        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut node = &mut *root;
        for segment in parents {
            match node.get_mut(*segment) {
                Some(Value::Object(map)) => node = map,
                _ => return Ok(()),
            }
        }
        node.remove(*last);
        Ok(())
    }
}
