//! Hostname plugin
//!
//! The hostname can drift independently of this tool (another admin,
//! a DHCP hook), so this plugin always probes the live system instead
//! of trusting the state store.

use async_trait::async_trait;
use infra_core::exec;
use infra_core::plugin::Observation;
use infra_core::{Error, HostContext, Result, StatefulPlugin};

/// Converges the machine's hostname toward a declared name
pub struct Hostname {
    desired: String,
}

impl Hostname {
    /// Declare the hostname the machine should carry
    pub fn new(desired: impl Into<String>) -> Self {
        Self {
            desired: desired.into(),
        }
    }
}

#[async_trait]
impl StatefulPlugin for Hostname {
    type State = String;
    type Change = String;

    fn name(&self) -> &str {
        "hostname"
    }

    fn desired(&self) -> &String {
        &self.desired
    }

    fn observation(&self) -> Observation {
        Observation::LiveProbe
    }

    async fn current(&self, ctx: &HostContext) -> Result<String> {
        match ctx.os.as_str() {
            "macos" => {
                let out = exec::run("scutil", &["--get", "LocalHostName"]).await?;
                Ok(out.stdout_trimmed().to_string())
            }
            "linux" => {
                let out = exec::run("hostnamectl", &["--static"]).await?;
                Ok(out.stdout_trimmed().to_string())
            }
            os => Err(Error::other(format!(
                "hostname plugin does not support os {os}"
            ))),
        }
    }

    fn diff(&self, _ctx: &HostContext, current: &String, desired: &String) -> Option<String> {
        (current != desired).then(|| desired.clone())
    }

    async fn handle(&self, ctx: &HostContext, change: String) -> Result<()> {
        match ctx.os.as_str() {
            "macos" => {
                exec::run("sudo", &["scutil", "--set", "HostName", &change]).await?;
                exec::run("sudo", &["scutil", "--set", "LocalHostName", &change]).await?;
            }
            "linux" => {
                exec::run("sudo", &["hostnamectl", "set-hostname", &change]).await?;
            }
            os => {
                return Err(Error::other(format!(
                    "hostname plugin does not support os {os}"
                )));
            }
        }
        Ok(())
    }
}
