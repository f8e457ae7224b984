// # Homebrew formula plugin
//
// Stateful plugin that converges the set of Homebrew formulae
// installed on request. The desired state is a list of formula names;
// the diff is a plain set difference.
//
// ## Observation strategy
//
// This plugin trusts the persisted state store: listing installed
// formulae shells out to `brew ls` on every run, which is slow on
// large installations, and package drift outside this tool is an
// accepted tradeoff here. Plugins whose state drifts independently
// (hostname, say) must live-probe instead.

use async_trait::async_trait;
use infra_core::exec;
use infra_core::plugin::Observation;
use infra_core::{HostContext, Result, StatefulPlugin};

/// Set difference between installed and desired formulae
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaChange {
    /// Formulae to install
    pub added: Vec<String>,
    /// Formulae to uninstall
    pub removed: Vec<String>,
}

/// Converges the Homebrew formula set toward a declared list
pub struct BrewFormula {
    desired: Vec<String>,
}

impl BrewFormula {
    /// Declare the full set of formulae that should be installed
    pub fn new<I, S>(desired: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            desired: desired.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl StatefulPlugin for BrewFormula {
    type State = Vec<String>;
    type Change = FormulaChange;

    fn name(&self) -> &str {
        "brew-formula"
    }

    fn desired(&self) -> &Vec<String> {
        &self.desired
    }

    fn observation(&self) -> Observation {
        Observation::TrustStore
    }

    async fn current(&self, _ctx: &HostContext) -> Result<Vec<String>> {
        let out = exec::run("brew", &["ls", "--installed-on-request", "--formula"]).await?;
        Ok(out.stdout_lines())
    }

    fn diff(
        &self,
        _ctx: &HostContext,
        current: &Vec<String>,
        desired: &Vec<String>,
    ) -> Option<FormulaChange> {
        let added: Vec<String> = desired
            .iter()
            .filter(|f| !current.contains(f))
            .cloned()
            .collect();
        let removed: Vec<String> = current
            .iter()
            .filter(|f| !desired.contains(f))
            .cloned()
            .collect();

        if added.is_empty() && removed.is_empty() {
            return None;
        }
        Some(FormulaChange { added, removed })
    }

    async fn handle(&self, _ctx: &HostContext, change: FormulaChange) -> Result<()> {
        if !change.added.is_empty() {
            let mut args = vec!["install"];
            args.extend(change.added.iter().map(String::as_str));
            exec::run("brew", &args).await?;
        }
        if !change.removed.is_empty() {
            let mut args = vec!["uninstall"];
            args.extend(change.removed.iter().map(String::as_str));
            exec::run("brew", &args).await?;
        }
        Ok(())
    }

    async fn update(&self, _ctx: &HostContext) -> Result<()> {
        exec::run("brew", &["update"]).await?;
        Ok(())
    }
}
