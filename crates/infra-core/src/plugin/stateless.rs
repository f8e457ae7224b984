//! Precondition-gated plugins

use async_trait::async_trait;
use serde_json::Value;

use crate::context::HostContext;
use crate::error::Result;

/// A plugin gated by a boolean precondition
///
/// `check` returning `true` means "apply `handle`"; `false` means the
/// system is already in the desired condition and `handle` is skipped.
///
/// # Contract
///
/// - `check` must be pure observation: no side effects beyond
///   inspection.
/// - `handle` must tolerate being invoked when the target is already
///   partially in place. Defensive idempotency is the plugin author's
///   responsibility, not the engine's: a known benign failure
///   ("already installed") belongs in `check`, never swallowed inside
///   `handle`.
/// - Any hook may fail; a failure aborts this plugin for the current
///   host without retry.
#[async_trait]
pub trait StatelessPlugin: Send + Sync {
    /// Plugin name, unique within a host's plugin list
    fn name(&self) -> &str;

    /// Observe whether corrective action is needed
    async fn check(&self, ctx: &HostContext) -> Result<bool>;

    /// Apply the corrective action
    async fn handle(&self, ctx: &HostContext) -> Result<()>;

    /// The immutable value this plugin was configured with, recorded
    /// into the state store after a successful `handle`
    fn value(&self) -> Option<Value> {
        None
    }

    /// Optional maintenance hook, run unconditionally before the
    /// convergence decision; never participates in diffing
    async fn update(&self, _ctx: &HostContext) -> Result<()> {
        Ok(())
    }
}
