//! Persisted state store
//!
//! The store is the single piece of state carried across process
//! invocations: a record of what each plugin last applied, keyed by
//! `(host, plugin name)`. It is opened once, read entirely into
//! memory, mutated only by the engine (never by plugins directly), and
//! persisted durably after each successful plugin application, so an
//! interrupted run never loses records already written.

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use async_trait::async_trait;
use serde_json::Value;

/// Trait for state store implementations
///
/// Reads never block on I/O after the initial load; `set` must persist
/// the full store to durable storage before returning.
///
/// A write failure is fatal for the plugin being recorded: the change
/// was applied to the system but not recorded, a known inconsistency
/// window the engine reports rather than hides. Nothing is rolled
/// back.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Last-applied state for a plugin on a host, if any
    async fn get(&self, host: &str, plugin: &str) -> Result<Option<Value>, crate::Error>;

    /// Upsert a plugin's record and persist before returning
    async fn set(&self, host: &str, plugin: &str, state: Value) -> Result<(), crate::Error>;

    /// Remove a plugin's record (persisted before returning)
    async fn remove(&self, host: &str, plugin: &str) -> Result<(), crate::Error>;

    /// Host names with at least one record
    async fn hosts(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
