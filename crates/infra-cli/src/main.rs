// # infra - host convergence CLI
//
// Thin integration layer only: parses arguments, initializes tracing,
// opens the state store, and hands the host list to the engine. All
// convergence logic lives in infra-core; the host map lives in
// config.rs.
//
// Exit codes:
// - 0: run completed (individual plugin failures are reported, not
//   fatal)
// - 1: fatal error before any plugin executed (no hosts given, host
//   missing from the configuration, state store unusable), or no host
//   could run at all (every host context failed)

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use infra_core::{Engine, FileStateStore, RunReport};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "infra",
    author,
    version,
    about = "Converge named hosts onto their declared configuration"
)]
struct Cli {
    /// Hosts to converge, processed strictly in the given order
    #[arg(value_name = "HOST")]
    hosts: Vec<String>,

    /// Path to the persisted state file
    #[arg(long, value_name = "FILE")]
    state_file: Option<PathBuf>,

    /// Sets the log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Exit codes for the two termination scenarios the contract defines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfraExitCode {
    /// Run completed, possibly with reported plugin failures
    Completed = 0,
    /// Fatal error before any plugin executed
    Fatal = 1,
}

impl From<InfraExitCode> for ExitCode {
    fn from(code: InfraExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if cli.hosts.is_empty() {
        error!("No hosts provided");
        return InfraExitCode::Fatal.into();
    }

    match run(cli).await {
        Ok(report) => conclude(&report).into(),
        Err(e) => {
            error!("{}", e.chain());
            InfraExitCode::Fatal.into()
        }
    }
}

/// Map a finished run to its exit code
///
/// A completed run exits 0 even with plugin failures; when every
/// named host failed context construction, nothing ran at all and the
/// run is fatal.
fn conclude(report: &RunReport) -> InfraExitCode {
    if report.no_host_ran() {
        error!("no host could run: every host context failed");
        return InfraExitCode::Fatal;
    }

    let failures = report.failures();
    let unreachable = report.context_failures();
    if failures > 0 || unreachable > 0 {
        warn!("done with {failures} failed plugin(s), {unreachable} unreachable host(s)");
    } else {
        info!("done");
    }
    InfraExitCode::Completed
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> infra_core::Result<RunReport> {
    let state_path = cli.state_file.unwrap_or_else(default_state_path);
    let store = FileStateStore::open(&state_path).await?;
    let engine = Engine::new(config::hosts(), Box::new(store))?;
    engine.run(&cli.hosts).await
}

/// `~/.infra/state.json`, falling back to the working directory when
/// `HOME` is unset
fn default_state_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".infra").join("state.json"),
        None => PathBuf::from("infra-state.json"),
    }
}
