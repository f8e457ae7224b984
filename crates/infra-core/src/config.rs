//! Host configuration types
//!
//! The configuration maps a short host name to the host's connection
//! facts and its declared plugin list. Where the configuration comes
//! from (a config file, generated code) is the caller's concern; this
//! module only defines the shape and its invariants.

use std::collections::HashSet;

use crate::plugin::Plugin;

/// Configuration for a single host
///
/// Plugins run in the exact order they were added. Later plugins may
/// depend on earlier ones having completed (e.g. installing a package
/// manager before installing packages with it); the engine does not
/// reorder or infer dependencies.
pub struct HostConfig {
    /// Address or hostname to act on
    pub host: String,

    /// User to act as (falls back to the ambient `USER` at context
    /// construction when unset)
    pub user: Option<String>,

    /// SSH port, for configurations that target a remote host
    pub port: Option<u16>,

    /// Plugins to converge, in order
    pub plugins: Vec<Plugin>,
}

impl HostConfig {
    /// Create a host configuration with an empty plugin list
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: None,
            plugins: Vec::new(),
        }
    }

    /// Set the user to act as
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the SSH port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Append a plugin to the host's list
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Validate this host's plugin list
    ///
    /// Plugin names key the persisted state store, so no two plugins
    /// under the same host may share a name.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let mut seen = HashSet::new();
        for plugin in &self.plugins {
            if !seen.insert(plugin.name()) {
                return Err(crate::Error::config(format!(
                    "Duplicate plugin name {:?} (plugin names key the state store)",
                    plugin.name()
                )));
            }
        }
        Ok(())
    }
}

/// The full host map
///
/// Hosts keep insertion order so that repeated runs over the same
/// configuration iterate identically.
#[derive(Default)]
pub struct InfraConfig {
    hosts: Vec<(String, HostConfig)>,
}

impl InfraConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host under a short name
    pub fn with_host(mut self, name: impl Into<String>, config: HostConfig) -> Self {
        self.hosts.push((name.into(), config));
        self
    }

    /// Look up a host by name
    pub fn host(&self, name: &str) -> Option<&HostConfig> {
        self.hosts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Whether a host name is configured
    pub fn contains(&self, name: &str) -> bool {
        self.host(name).is_some()
    }

    /// Configured host names, in declaration order
    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(|(n, _)| n.as_str())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let mut seen = HashSet::new();
        for (name, host) in &self.hosts {
            if !seen.insert(name.as_str()) {
                return Err(crate::Error::config(format!(
                    "Host {name} is declared twice"
                )));
            }
            host.validate().map_err(|e| match e {
                crate::Error::Config(msg) => {
                    crate::Error::config(format!("Host {name}: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}
