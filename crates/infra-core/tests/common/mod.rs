//! Test doubles and common utilities for engine contract tests
//!
//! The doubles converge a tiny in-memory "system" instead of a real
//! machine, and count every hook invocation so tests can assert which
//! parts of the lifecycle ran.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use infra_core::plugin::Observation;
use infra_core::{
    Error, HostConfig, HostContext, InfraConfig, Plugin, Result, StatefulPlugin, StatelessPlugin,
};
use serde_json::Value;

/// Hook invocation counters, shared with the test after the plugin
/// moves into the engine
#[derive(Clone, Default)]
pub struct Counters {
    pub check: Arc<AtomicUsize>,
    pub current: Arc<AtomicUsize>,
    pub handle: Arc<AtomicUsize>,
    pub update: Arc<AtomicUsize>,
}

impl Counters {
    pub fn checks(&self) -> usize {
        self.check.load(Ordering::SeqCst)
    }

    pub fn currents(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn handles(&self) -> usize {
        self.handle.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.update.load(Ordering::SeqCst)
    }
}

/// A fake package inventory standing in for a real machine
#[derive(Clone, Default)]
pub struct FakeSystem {
    packages: Arc<Mutex<Vec<String>>>,
    installed: Arc<AtomicBool>,
}

impl FakeSystem {
    pub fn with_packages(packages: &[&str]) -> Self {
        Self {
            packages: Arc::new(Mutex::new(
                packages.iter().map(|p| p.to_string()).collect(),
            )),
            installed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn packages(&self) -> Vec<String> {
        self.packages.lock().unwrap().clone()
    }

    pub fn tool_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    pub fn set_tool_installed(&self, installed: bool) {
        self.installed.store(installed, Ordering::SeqCst);
    }
}

/// The diff a [`PackagesPlugin`] applies
#[derive(Debug, PartialEq)]
pub struct PackagesChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Stateful double: converges the fake system's package set
pub struct PackagesPlugin {
    pub system: FakeSystem,
    pub desired: Vec<String>,
    pub observation: Observation,
    pub counters: Counters,
}

impl PackagesPlugin {
    pub fn new(system: &FakeSystem, desired: &[&str], observation: Observation) -> (Self, Counters) {
        let counters = Counters::default();
        let plugin = Self {
            system: system.clone(),
            desired: desired.iter().map(|p| p.to_string()).collect(),
            observation,
            counters: counters.clone(),
        };
        (plugin, counters)
    }
}

#[async_trait]
impl StatefulPlugin for PackagesPlugin {
    type State = Vec<String>;
    type Change = PackagesChange;

    fn name(&self) -> &str {
        "packages"
    }

    fn desired(&self) -> &Vec<String> {
        &self.desired
    }

    fn observation(&self) -> Observation {
        self.observation
    }

    async fn current(&self, _ctx: &HostContext) -> Result<Vec<String>> {
        self.counters.current.fetch_add(1, Ordering::SeqCst);
        Ok(self.system.packages())
    }

    fn diff(
        &self,
        _ctx: &HostContext,
        current: &Vec<String>,
        desired: &Vec<String>,
    ) -> Option<PackagesChange> {
        let added: Vec<String> = desired
            .iter()
            .filter(|p| !current.contains(p))
            .cloned()
            .collect();
        let removed: Vec<String> = current
            .iter()
            .filter(|p| !desired.contains(p))
            .cloned()
            .collect();

        if added.is_empty() && removed.is_empty() {
            return None;
        }
        Some(PackagesChange { added, removed })
    }

    async fn handle(&self, _ctx: &HostContext, change: PackagesChange) -> Result<()> {
        self.counters.handle.fetch_add(1, Ordering::SeqCst);
        let mut packages = self.system.packages.lock().unwrap();
        packages.retain(|p| !change.removed.contains(p));
        packages.extend(change.added);
        Ok(())
    }

    async fn update(&self, _ctx: &HostContext) -> Result<()> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stateless double: "installs a tool" onto the fake system
pub struct InstallerPlugin {
    pub system: FakeSystem,
    pub counters: Counters,
    pub fail_handle: bool,
    pub fail_update: bool,
}

impl InstallerPlugin {
    pub fn new(system: &FakeSystem) -> (Self, Counters) {
        let counters = Counters::default();
        let plugin = Self {
            system: system.clone(),
            counters: counters.clone(),
            fail_handle: false,
            fail_update: false,
        };
        (plugin, counters)
    }

    pub fn failing(system: &FakeSystem) -> (Self, Counters) {
        let (mut plugin, counters) = Self::new(system);
        plugin.fail_handle = true;
        (plugin, counters)
    }
}

#[async_trait]
impl StatelessPlugin for InstallerPlugin {
    fn name(&self) -> &str {
        "installer"
    }

    async fn check(&self, _ctx: &HostContext) -> Result<bool> {
        self.counters.check.fetch_add(1, Ordering::SeqCst);
        Ok(!self.system.tool_installed())
    }

    async fn handle(&self, _ctx: &HostContext) -> Result<()> {
        self.counters.handle.fetch_add(1, Ordering::SeqCst);
        if self.fail_handle {
            return Err(Error::other("installer script exited with status 1"));
        }
        self.system.installed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn value(&self) -> Option<Value> {
        Some(serde_json::json!(true))
    }

    async fn update(&self, _ctx: &HostContext) -> Result<()> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        if self.fail_update {
            return Err(Error::other("index refresh failed"));
        }
        Ok(())
    }
}

/// Single-host configuration around a plugin list
pub fn host_with_plugins(name: &str, plugins: Vec<Plugin>) -> InfraConfig {
    let mut host = HostConfig::new("localhost").with_user("tester");
    for plugin in plugins {
        host = host.with_plugin(plugin);
    }
    InfraConfig::new().with_host(name, host)
}
