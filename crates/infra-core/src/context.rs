//! Per-host execution context and scoped reporter
//!
//! A [`HostContext`] is built once per host iteration from the host's
//! configuration plus ambient process facts, and handed (immutably) to
//! every plugin hook. The [`Reporter`] inside it is a value, not a
//! global: scoping it to a plugin produces a new handle whose lifetime
//! is tied to that invocation.

use crate::config::HostConfig;
use crate::error::{Error, Result};

/// Immutable per-host execution handle
///
/// Created and destroyed per host iteration; never shared mutably
/// across hosts. Construction does not contact the host.
#[derive(Debug, Clone)]
pub struct HostContext {
    /// Short host name (the configuration key)
    pub host: String,

    /// User the run acts as
    pub user: String,

    /// Target architecture (e.g. "aarch64", "x86_64")
    pub arch: String,

    /// Target OS (e.g. "macos", "linux")
    pub os: String,

    /// Scoped reporter for this host (or plugin) invocation
    pub reporter: Reporter,
}

impl HostContext {
    /// Assemble the context for a named host
    ///
    /// `arch` and `os` come from the running process; all plugins in
    /// this system act on the local machine or a single
    /// already-connected host, so the ambient facts are the target's.
    ///
    /// Fails when the acting user cannot be resolved from the host
    /// configuration or the environment, which is fatal for this
    /// host's run.
    pub fn resolve(name: &str, config: &HostConfig) -> Result<Self> {
        let user = match &config.user {
            Some(user) => user.clone(),
            None => std::env::var("USER").map_err(|_| {
                Error::config("Cannot resolve user: not in host config and USER is unset")
                    .for_host(name)
            })?,
        };

        Ok(Self {
            host: name.to_string(),
            user,
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            reporter: Reporter::for_host(name),
        })
    }

    /// Narrow this context to a single plugin invocation
    pub fn scoped(&self, plugin: &str) -> Self {
        let mut ctx = self.clone();
        ctx.reporter = self.reporter.scoped(plugin);
        ctx
    }
}

/// Scoped reporting handle
///
/// Every event carries the host (and, once scoped, the plugin) it
/// belongs to, so interleaved output from a multi-host run stays
/// attributable. Cloning is cheap; dropping the handle ends the scope.
#[derive(Debug, Clone)]
pub struct Reporter {
    host: String,
    plugin: Option<String>,
}

impl Reporter {
    /// Create a reporter scoped to a host
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            plugin: None,
        }
    }

    /// Narrow to a plugin within this host
    pub fn scoped(&self, plugin: impl Into<String>) -> Self {
        Self {
            host: self.host.clone(),
            plugin: Some(plugin.into()),
        }
    }

    /// Report progress
    pub fn info(&self, message: impl std::fmt::Display) {
        match &self.plugin {
            Some(plugin) => tracing::info!(host = %self.host, plugin = %plugin, "{message}"),
            None => tracing::info!(host = %self.host, "{message}"),
        }
    }

    /// Report a non-fatal problem
    pub fn warn(&self, message: impl std::fmt::Display) {
        match &self.plugin {
            Some(plugin) => tracing::warn!(host = %self.host, plugin = %plugin, "{message}"),
            None => tracing::warn!(host = %self.host, "{message}"),
        }
    }

    /// Report a failure (full causal chain expected in `message`)
    pub fn error(&self, message: impl std::fmt::Display) {
        match &self.plugin {
            Some(plugin) => tracing::error!(host = %self.host, plugin = %plugin, "{message}"),
            None => tracing::error!(host = %self.host, "{message}"),
        }
    }

    /// Report the computed change a stateful plugin is about to apply
    pub fn diff(&self, summary: &str) {
        match &self.plugin {
            Some(plugin) => {
                tracing::info!(host = %self.host, plugin = %plugin, "applying change: {summary}")
            }
            None => tracing::info!(host = %self.host, "applying change: {summary}"),
        }
    }
}
