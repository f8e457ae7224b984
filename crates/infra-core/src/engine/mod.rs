//! The convergence engine
//!
//! Drives every named host through its declared plugin list, one host
//! at a time, one plugin at a time:
//!
//! ```text
//! ┌────────────┐     per host      ┌──────────────┐
//! │ InfraConfig│ ───────────────▶  │ HostContext  │
//! └────────────┘                   └──────┬───────┘
//!                                         │ per plugin, in order
//!                                         ▼
//!                        update ─▶ check / current+diff ─▶ handle
//!                                         │
//!                                         ▼
//!                                  ┌─────────────┐
//!                                  │ StateStore  │  (record applied)
//!                                  └─────────────┘
//! ```
//!
//! Lifecycle per plugin: the optional `update` hook runs
//! unconditionally; then the variant decides: a stateless plugin's
//! `check` gates `handle`, a stateful plugin's `diff` over
//! (current, desired) produces the change `handle` applies. The store
//! records what was applied, after `handle` returned successfully.
//!
//! One failing plugin aborts only itself; the remaining plugins for
//! the host still run. The engine is a finite single pass, with no
//! loops and no retries.

use serde_json::Value;

use crate::config::InfraConfig;
use crate::context::HostContext;
use crate::error::{Error, Result};
use crate::plugin::{Observation, Plugin};
use crate::state::StateStore;

/// Outcome of one plugin's run on one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOutcome {
    /// No action was required (precondition false / diff absent)
    Satisfied,

    /// A corrective action was applied and recorded
    Applied {
        /// Human-readable change summary (stateful plugins only)
        summary: Option<String>,
    },

    /// A hook failed; the causal chain, as reported
    Failed {
        /// Formatted error chain
        error: String,
    },
}

/// One plugin's entry in the run report
#[derive(Debug, Clone)]
pub struct PluginRun {
    /// Plugin name
    pub plugin: String,
    /// What happened
    pub outcome: PluginOutcome,
}

/// Everything that happened on one host
#[derive(Debug, Clone)]
pub struct HostReport {
    /// Short host name
    pub host: String,
    /// Set when the host's context could not be built (no plugin ran)
    pub context_error: Option<String>,
    /// Per-plugin outcomes, in execution order
    pub runs: Vec<PluginRun>,
}

impl HostReport {
    fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            context_error: None,
            runs: Vec::new(),
        }
    }

    /// Outcome for a named plugin, if it ran
    pub fn outcome(&self, plugin: &str) -> Option<&PluginOutcome> {
        self.runs
            .iter()
            .find(|r| r.plugin == plugin)
            .map(|r| &r.outcome)
    }
}

/// Full report of a run, host by host
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Per-host reports, in processing order
    pub hosts: Vec<HostReport>,
}

impl RunReport {
    /// Report for a named host, if it was processed
    pub fn host(&self, name: &str) -> Option<&HostReport> {
        self.hosts.iter().find(|h| h.host == name)
    }

    /// Number of failed plugin runs across all hosts
    pub fn failures(&self) -> usize {
        self.hosts
            .iter()
            .map(|h| {
                h.runs
                    .iter()
                    .filter(|r| matches!(r.outcome, PluginOutcome::Failed { .. }))
                    .count()
            })
            .sum()
    }

    /// Number of hosts whose context could not be built (no plugin
    /// ran on them)
    pub fn context_failures(&self) -> usize {
        self.hosts
            .iter()
            .filter(|h| h.context_error.is_some())
            .count()
    }

    /// Whether no host got past context construction
    ///
    /// A run can complete with per-plugin failures and still count as
    /// a run; when every named host failed before its first plugin,
    /// nothing ran at all and callers should treat the result as
    /// fatal.
    pub fn no_host_ran(&self) -> bool {
        !self.hosts.is_empty() && self.hosts.iter().all(|h| h.context_error.is_some())
    }

    /// Whether every plugin on every host completed without failure
    pub fn is_clean(&self) -> bool {
        self.failures() == 0 && self.context_failures() == 0
    }
}

/// The convergence engine
///
/// Owns the host configuration and the persisted state store. The
/// store is mutated only here (never by plugins) and only after a
/// plugin's `handle` has returned successfully, so the single-threaded
/// sequential model needs no locking discipline beyond "one writer".
pub struct Engine {
    config: InfraConfig,
    store: Box<dyn StateStore>,
}

impl Engine {
    /// Create an engine over a validated configuration
    pub fn new(config: InfraConfig, store: Box<dyn StateStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// Converge the named hosts, strictly in the given order
    ///
    /// Fatal before any plugin executes: an empty host list, or any
    /// named host missing from the configuration. After that, failures
    /// are isolated: a broken plugin or an unresolvable host context
    /// is recorded in the report and the run continues.
    pub async fn run(&self, hosts: &[String]) -> Result<RunReport> {
        if hosts.is_empty() {
            return Err(Error::config("No hosts provided"));
        }
        for host in hosts {
            if !self.config.contains(host) {
                return Err(Error::config(format!("Host {host} not found in config")));
            }
        }

        tracing::info!("running for hosts: {}", hosts.join(", "));

        let mut report = RunReport::default();
        for host in hosts {
            report.hosts.push(self.run_host(host).await);
        }

        self.store.flush().await?;
        Ok(report)
    }

    async fn run_host(&self, host: &str) -> HostReport {
        let mut report = HostReport::new(host);
        // Presence was checked up front
        let Some(host_config) = self.config.host(host) else {
            report.context_error = Some(format!("Host {host} not found in config"));
            return report;
        };

        let ctx = match HostContext::resolve(host, host_config) {
            Ok(ctx) => ctx,
            Err(e) => {
                let chain = e.chain();
                tracing::error!(host = %host, "{chain}");
                report.context_error = Some(chain);
                return report;
            }
        };

        if host_config.plugins.is_empty() {
            ctx.reporter.warn("No plugins found for host");
            return report;
        }

        for plugin in &host_config.plugins {
            let pctx = ctx.scoped(plugin.name());
            pctx.reporter.info("converging");

            let outcome = match self.run_plugin(&pctx, plugin).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let wrapped = e.for_plugin(host, plugin.name());
                    let chain = wrapped.chain();
                    pctx.reporter.error(&chain);
                    PluginOutcome::Failed { error: chain }
                }
            };

            match &outcome {
                PluginOutcome::Satisfied => pctx.reporter.info("already converged"),
                PluginOutcome::Applied { .. } => pctx.reporter.info("applied"),
                PluginOutcome::Failed { .. } => {}
            }

            report.runs.push(PluginRun {
                plugin: plugin.name().to_string(),
                outcome,
            });
        }

        report
    }

    /// Drive one plugin through its lifecycle
    ///
    /// Errors come back unwrapped; the caller attaches host and plugin
    /// context before reporting.
    async fn run_plugin(&self, ctx: &HostContext, plugin: &Plugin) -> Result<PluginOutcome> {
        // Maintenance hook: unconditional, reported but never fatal
        if let Err(e) = plugin.update(ctx).await {
            ctx.reporter
                .warn(format!("update hook failed: {}", e.chain()));
        }

        match plugin {
            Plugin::Stateless(p) => {
                if !p.check(ctx).await? {
                    // No action needed; the store's action path stays
                    // untouched for stateless no-ops
                    return Ok(PluginOutcome::Satisfied);
                }
                p.handle(ctx).await?;
                self.record(ctx, p.name(), p.value().unwrap_or(Value::Null))
                    .await?;
                Ok(PluginOutcome::Applied { summary: None })
            }

            Plugin::Stateful(p) => {
                let stored = self.store.get(&ctx.host, p.name()).await?;
                let (current, from_store) = match (p.observation(), stored) {
                    (Observation::TrustStore, Some(state)) => (state, true),
                    _ => (p.observe(ctx).await?, false),
                };

                let planned = match p.plan(ctx, &current) {
                    Ok(planned) => planned,
                    // A stale record must not wedge the host: fall
                    // back to the live system and re-plan
                    Err(Error::InvalidState(msg)) if from_store => {
                        ctx.reporter
                            .warn(format!("{msg}; re-probing live state"));
                        let live = p.observe(ctx).await?;
                        p.plan(ctx, &live)?
                    }
                    Err(e) => return Err(e),
                };

                match planned {
                    None => {
                        // A completed no-op still counts as a run
                        self.record(ctx, p.name(), p.desired_value()?).await?;
                        Ok(PluginOutcome::Satisfied)
                    }
                    Some(change) => {
                        let summary = change.summary().to_string();
                        ctx.reporter.diff(&summary);
                        p.apply(ctx, change).await?;
                        self.record(ctx, p.name(), p.desired_value()?).await?;
                        Ok(PluginOutcome::Applied {
                            summary: Some(summary),
                        })
                    }
                }
            }
        }
    }

    /// Record a completed run; persists durably before returning
    ///
    /// A failure here is fatal to recording this plugin's outcome;
    /// the system-level change already made by `handle` stands.
    async fn record(&self, ctx: &HostContext, plugin: &str, state: Value) -> Result<()> {
        self.store.set(&ctx.host, plugin, state).await
    }
}
