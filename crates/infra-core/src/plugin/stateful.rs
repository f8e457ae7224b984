//! Desired/current diffing plugins
//!
//! The typed [`StatefulPlugin`] trait is what plugin authors
//! implement. The engine works against the object-safe
//! [`ErasedStatefulPlugin`], produced by a blanket adapter that moves
//! state values through `serde_json::Value` and change payloads
//! through `Box<dyn Any>`; the typing round-trips inside the adapter
//! and never leaks into the engine.

use std::any::Any;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::HostContext;
use crate::error::{Error, Result};

/// How a stateful plugin observes "current" state
///
/// Re-probing is more correct under external drift but costs a system
/// call per run; trusting the store is cheaper but masks drift caused
/// outside this tool. The strategy is a property of each plugin, not
/// of the engine: a hostname can be changed behind the tool's back
/// and must be probed, while an expensive package inventory may trust
/// its last recorded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Probe the live system on every run
    LiveProbe,
    /// Use the last persisted state as "current" when available;
    /// falls back to a live probe when there is no usable record
    TrustStore,
}

/// A plugin that computes a typed diff between observed and desired state
///
/// # Contract
///
/// - `current` must not mutate system state.
/// - `diff` must be a deterministic, side-effect-free function of
///   `(current, desired)`, returning `None` when and only when no
///   corrective action is required.
/// - `handle` must bring the system from whatever `current` was to
///   `desired` using only the change value; it must not re-read
///   `current`.
#[async_trait]
pub trait StatefulPlugin: Send + Sync {
    /// Observed/desired state type, persisted to the state store
    type State: Serialize + DeserializeOwned + Send + Sync;

    /// The corrective-action payload computed by `diff`
    type Change: fmt::Debug + Send + 'static;

    /// Plugin name, unique within a host's plugin list
    fn name(&self) -> &str;

    /// The declared desired state
    fn desired(&self) -> &Self::State;

    /// How this plugin observes current state
    fn observation(&self) -> Observation {
        Observation::LiveProbe
    }

    /// Observe the present state of the system
    async fn current(&self, ctx: &HostContext) -> Result<Self::State>;

    /// Decide what must change; `None` means no action required
    fn diff(
        &self,
        ctx: &HostContext,
        current: &Self::State,
        desired: &Self::State,
    ) -> Option<Self::Change>;

    /// Apply the change
    async fn handle(&self, ctx: &HostContext, change: Self::Change) -> Result<()>;

    /// Optional maintenance hook, run unconditionally before the
    /// convergence decision; never participates in diffing
    async fn update(&self, _ctx: &HostContext) -> Result<()> {
        Ok(())
    }
}

/// A computed change, ready to report and apply
///
/// The payload is the plugin's own `Change` type behind `dyn Any`; it
/// only travels from `plan` back into `apply` on the same plugin.
pub struct PlannedChange {
    summary: String,
    payload: Box<dyn Any + Send>,
}

impl PlannedChange {
    /// Human-readable description of the change, for reporting
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

impl fmt::Debug for PlannedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannedChange")
            .field("summary", &self.summary)
            .finish()
    }
}

/// Object-safe view of a stateful plugin, as the engine drives it
///
/// State values cross this boundary as `serde_json::Value`, the same
/// representation the state store persists.
#[async_trait]
pub trait ErasedStatefulPlugin: Send + Sync {
    /// Plugin name, unique within a host's plugin list
    fn name(&self) -> &str;

    /// How this plugin observes current state
    fn observation(&self) -> Observation;

    /// The desired state, serialized for persistence
    fn desired_value(&self) -> Result<Value>;

    /// Probe the live system and serialize the observation
    async fn observe(&self, ctx: &HostContext) -> Result<Value>;

    /// Decode `current` and compute the diff against the desired state
    ///
    /// Fails with [`Error::InvalidState`] when `current` no longer
    /// decodes as this plugin's state type (stale store schema).
    fn plan(&self, ctx: &HostContext, current: &Value) -> Result<Option<PlannedChange>>;

    /// Apply a change previously produced by `plan`
    async fn apply(&self, ctx: &HostContext, change: PlannedChange) -> Result<()>;

    /// Run the unconditional maintenance hook
    async fn update(&self, ctx: &HostContext) -> Result<()>;
}

#[async_trait]
impl<P> ErasedStatefulPlugin for P
where
    P: StatefulPlugin + 'static,
{
    fn name(&self) -> &str {
        StatefulPlugin::name(self)
    }

    fn observation(&self) -> Observation {
        StatefulPlugin::observation(self)
    }

    fn desired_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.desired())?)
    }

    async fn observe(&self, ctx: &HostContext) -> Result<Value> {
        let current = self.current(ctx).await?;
        Ok(serde_json::to_value(&current)?)
    }

    fn plan(&self, ctx: &HostContext, current: &Value) -> Result<Option<PlannedChange>> {
        let current: P::State = serde_json::from_value(current.clone()).map_err(|e| {
            Error::invalid_state(format!(
                "stored state for {} does not decode: {e}",
                StatefulPlugin::name(self)
            ))
        })?;

        Ok(self.diff(ctx, &current, self.desired()).map(|change| {
            PlannedChange {
                summary: format!("{change:?}"),
                payload: Box::new(change),
            }
        }))
    }

    async fn apply(&self, ctx: &HostContext, change: PlannedChange) -> Result<()> {
        let change = change
            .payload
            .downcast::<P::Change>()
            .map_err(|_| {
                Error::other(format!(
                    "change payload for {} came from a different plugin",
                    StatefulPlugin::name(self)
                ))
            })?;
        self.handle(ctx, *change).await
    }

    async fn update(&self, ctx: &HostContext) -> Result<()> {
        StatefulPlugin::update(self, ctx).await
    }
}
