//! Per-execution result store
//!
//! A mutable map from string keys to JSON values, scoped to one flow
//! execution. Seeded with initial inputs, written to by each task's result,
//! read by downstream tasks and by the caller after completion. All writes
//! go through one lock, so a task never reads a key mid-write.

use crate::task::TaskOutput;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared key/value store for one flow execution
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl Store {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with initial inputs
    pub fn seeded(seed: HashMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(seed)),
        }
    }

    /// Get a value
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().await.get(key).cloned()
    }

    /// Whether a key is present
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.read().await.contains_key(key)
    }

    /// Set a single value
    pub async fn insert(&self, key: impl Into<String>, value: Value) {
        self.inner.write().await.insert(key.into(), value);
    }

    /// Merge a task's outputs under one write lock
    pub async fn merge(&self, outputs: TaskOutput) {
        let mut inner = self.inner.write().await;
        for (key, value) in outputs {
            inner.insert(key, value);
        }
    }

    /// Remove a value
    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().await.remove(key)
    }

    /// Current keys
    pub async fn keys(&self) -> Vec<String> {
        self.inner.read().await.keys().cloned().collect()
    }

    /// Copy of the full map, for the caller at completion
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.read().await.clone()
    }
}
