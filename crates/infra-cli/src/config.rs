//! The host map
//!
//! Hosts and their plugin lists are declared in code, so the compiler
//! checks every plugin's configuration. Plugin order matters: later
//! plugins may depend on earlier ones (Homebrew must exist before
//! formulae can be installed with it).

use infra_core::{HostConfig, InfraConfig, Plugin};
use infra_plugin_brew::BrewFormula;
use infra_plugin_system::{Hostname, InstallHomebrew, InstallRye};

const BREW_FORMULAE: &[&str] = &[
    "age",
    "bash",
    "bat",
    "coreutils",
    "curl",
    "diffutils",
    "eza",
    "fd",
    "findutils",
    "fish",
    "fzf",
    "gawk",
    "git",
    "git-delta",
    "gnu-sed",
    "gnu-tar",
    "go",
    "grep",
    "gzip",
    "jq",
    "just",
    "micro",
    "sops",
    "unzip",
    "wget",
    "yq",
    "zip",
];

/// Build the full host configuration
pub fn hosts() -> InfraConfig {
    InfraConfig::new()
        .with_host(
            "sid",
            HostConfig::new("sid.lan").with_user("adam").with_port(22),
        )
        .with_host(
            "macbook",
            HostConfig::new("localhost")
                .with_plugin(Plugin::stateful(Hostname::new("adam-macbook")))
                .with_plugin(Plugin::stateless(InstallHomebrew::new()))
                .with_plugin(Plugin::stateful(BrewFormula::new(
                    BREW_FORMULAE.iter().copied(),
                )))
                .with_plugin(Plugin::stateless(InstallRye::new())),
        )
}
