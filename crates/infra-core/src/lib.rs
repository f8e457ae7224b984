// # infra-core
//
// Core library for the infra host convergence engine.
//
// ## Architecture Overview
//
// This library provides the machinery for driving a set of named hosts
// toward their declared configuration:
// - **Plugin**: Closed two-variant contract (stateless / stateful) that
//   every provisioning unit implements
// - **HostContext**: Immutable per-host execution handle with a scoped
//   reporter
// - **StateStore**: Trait for the persisted record of last-applied state
//   (idempotency across runs)
// - **Engine**: Drives the per-host, per-plugin convergence lifecycle
// - **exec**: Scoped external-process invocation with captured status
//   and output
//
// ## Design Principles
//
// 1. **Convergence**: Plugins observe drift and apply the minimal
//    corrective action; a clean second run is a no-op
// 2. **Isolation**: One failing plugin never blocks the rest of a
//    host's plugin list
// 3. **Sequential**: Hosts and plugins run strictly in declared order,
//    one at a time; later plugins may depend on earlier ones
// 4. **Durable state**: The store is flushed after every successful
//    plugin application, so an interrupted run loses nothing already
//    recorded

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod exec;
pub mod plugin;
pub mod state;

// Re-export core types for convenience
pub use config::{HostConfig, InfraConfig};
pub use context::{HostContext, Reporter};
pub use engine::{Engine, HostReport, PluginOutcome, RunReport};
pub use error::{Error, Result};
pub use plugin::{Observation, Plugin, StatefulPlugin, StatelessPlugin};
pub use state::{FileStateStore, MemoryStateStore, StateStore};
