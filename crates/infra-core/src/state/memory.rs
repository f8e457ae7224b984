//! In-memory state store
//!
//! No persistence across runs: every plugin looks "never applied" on
//! the next invocation. Useful for tests and for throwaway runs where
//! re-converging from scratch is harmless.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::Error;
use crate::state::StateStore;

type Records = HashMap<String, HashMap<String, Value>>;

/// In-memory state store implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Records>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of plugin records across all hosts
    pub async fn len(&self) -> usize {
        self.inner.read().await.values().map(|p| p.len()).sum()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, host: &str, plugin: &str) -> Result<Option<Value>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(host).and_then(|p| p.get(plugin)).cloned())
    }

    async fn set(&self, host: &str, plugin: &str, state: Value) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard
            .entry(host.to_string())
            .or_default()
            .insert(plugin.to_string(), state);
        Ok(())
    }

    async fn remove(&self, host: &str, plugin: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        if let Some(plugins) = guard.get_mut(host) {
            plugins.remove(plugin);
            if plugins.is_empty() {
                guard.remove(host);
            }
        }
        Ok(())
    }

    async fn hosts(&self) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Everything is already "persisted"
        Ok(())
    }
}
