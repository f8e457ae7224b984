//! Tool installer plugins
//!
//! Stateless, precondition-gated: `check` asks whether the tool is on
//! `PATH`, `handle` runs the upstream installer. The installers are
//! written to tolerate a partially completed earlier attempt.

use async_trait::async_trait;
use infra_core::exec;
use infra_core::{HostContext, Result, StatelessPlugin};
use serde_json::Value;

const HOMEBREW_INSTALL: &str =
    "/bin/bash -c \"$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)\"";

/// Bootstraps Homebrew when `brew` is not on `PATH`
#[derive(Default)]
pub struct InstallHomebrew;

impl InstallHomebrew {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StatelessPlugin for InstallHomebrew {
    fn name(&self) -> &str {
        "install-homebrew"
    }

    async fn check(&self, _ctx: &HostContext) -> Result<bool> {
        Ok(exec::lookup("brew").is_none())
    }

    async fn handle(&self, _ctx: &HostContext) -> Result<()> {
        exec::shell(HOMEBREW_INSTALL).await?;
        Ok(())
    }
}

const DEFAULT_PYTHON_VERSION: &str = "3.12";

/// Installs the Rye toolchain manager and pins its default Python
pub struct InstallRye {
    python_version: String,
}

impl InstallRye {
    pub fn new() -> Self {
        Self {
            python_version: DEFAULT_PYTHON_VERSION.to_string(),
        }
    }

    /// Pin a specific Python toolchain version
    pub fn with_python_version(mut self, version: impl Into<String>) -> Self {
        self.python_version = version.into();
        self
    }
}

impl Default for InstallRye {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatelessPlugin for InstallRye {
    fn name(&self) -> &str {
        "install-rye"
    }

    async fn check(&self, _ctx: &HostContext) -> Result<bool> {
        Ok(exec::lookup("rye").is_none())
    }

    async fn handle(&self, _ctx: &HostContext) -> Result<()> {
        let version = &self.python_version;
        exec::shell(&format!(
            "RYE_TOOLCHAIN_VERSION=\"{version}\" RYE_INSTALL_OPTION=\"--yes\" \
             /bin/bash -c \"$(curl -fsSL https://rye.astral.sh/get)\""
        ))
        .await?;

        // The installer drops rye into ~/.rye/shims, which is not on
        // PATH yet during this same run
        let rye = "$HOME/.rye/shims/rye";
        exec::shell(&format!(
            "{rye} config --set-bool behavior.global-python=true"
        ))
        .await?;
        exec::shell(&format!("{rye} config --set default.toolchain={version}")).await?;
        exec::shell(&format!("{rye} toolchain fetch {version}")).await?;
        Ok(())
    }

    fn value(&self) -> Option<Value> {
        Some(serde_json::json!({ "python_version": self.python_version }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rye_records_its_configured_version() {
        let plugin = InstallRye::new().with_python_version("3.11");
        assert_eq!(
            plugin.value(),
            Some(serde_json::json!({ "python_version": "3.11" }))
        );
    }

    #[test]
    fn rye_defaults_its_python_version() {
        let plugin = InstallRye::new();
        assert_eq!(
            plugin.value(),
            Some(serde_json::json!({ "python_version": "3.12" }))
        );
    }

    #[test]
    fn homebrew_records_no_value() {
        assert_eq!(InstallHomebrew::new().value(), None);
    }
}
