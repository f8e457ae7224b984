//! The plugin contract
//!
//! Every provisioning unit is one of two closed variants:
//!
//! - [`StatelessPlugin`]: gated by a boolean precondition. `check`
//!   observes, `handle` acts; there is no before/after comparison
//!   value, so `handle` itself must be idempotent.
//! - [`StatefulPlugin`]: computes a typed diff between observed and
//!   desired state. `current` observes, `diff` decides, `handle`
//!   applies exactly the diff it was given.
//!
//! The engine dispatches by matching on the [`Plugin`] variant; a
//! plugin never declares its kind through a tag field or by probing
//! for method presence.
//!
//! Both variants share a `name` (unique within a host's plugin list,
//! since it keys the persisted state store) and an optional `update` hook
//! for maintenance actions independent of convergence (refreshing a
//! package index, say). `update` runs unconditionally and never
//! participates in diffing.

pub mod stateful;
pub mod stateless;

pub use stateful::{
    ErasedStatefulPlugin, Observation, PlannedChange, StatefulPlugin,
};
pub use stateless::StatelessPlugin;

/// A provisioning unit, ready for the engine
///
/// Constructed once by configuration and read-only thereafter; the
/// only state a plugin sees changing is what it queries externally.
pub enum Plugin {
    /// Precondition-gated unit
    Stateless(Box<dyn StatelessPlugin>),
    /// Desired/current diffing unit
    Stateful(Box<dyn ErasedStatefulPlugin>),
}

impl Plugin {
    /// Wrap a stateless plugin
    pub fn stateless<P>(plugin: P) -> Self
    where
        P: StatelessPlugin + 'static,
    {
        Plugin::Stateless(Box::new(plugin))
    }

    /// Wrap a stateful plugin, erasing its state and change types
    pub fn stateful<P>(plugin: P) -> Self
    where
        P: StatefulPlugin + 'static,
    {
        Plugin::Stateful(Box::new(plugin))
    }

    /// The plugin's name (the state-store key)
    pub fn name(&self) -> &str {
        match self {
            Plugin::Stateless(p) => p.name(),
            Plugin::Stateful(p) => p.name(),
        }
    }

    /// Run the unconditional maintenance hook
    pub async fn update(&self, ctx: &crate::HostContext) -> crate::Result<()> {
        match self {
            Plugin::Stateless(p) => p.update(ctx).await,
            Plugin::Stateful(p) => p.update(ctx).await,
        }
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Plugin::Stateless(_) => "Stateless",
            Plugin::Stateful(_) => "Stateful",
        };
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("kind", &kind)
            .finish()
    }
}
