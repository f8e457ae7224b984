//! Scoped external-process invocation
//!
//! Plugin side effects are shell-outs. Each invocation captures exit
//! status and output explicitly; "already satisfied" is never
//! distinguished from "genuine failure" by catching errors. Plugin
//! authors put the benign case into `check`/`diff` instead.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured result of an external process
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Exit status code (-1 when terminated by a signal)
    pub status: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExecOutput {
    /// Whether the process exited zero
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Standard output with surrounding whitespace trimmed
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Standard output split into non-empty lines
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Run a program and fail on non-zero exit
///
/// The error carries the command line, the exit status, and the
/// trimmed stderr, so the reported chain names what actually broke.
pub async fn run(program: &str, args: &[&str]) -> Result<ExecOutput> {
    let output = run_unchecked(program, args).await?;
    if !output.success() {
        return Err(Error::Exec {
            command: command_line(program, args),
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// Run a program and capture the result without judging the status
pub async fn run_unchecked(program: &str, args: &[&str]) -> Result<ExecOutput> {
    tracing::debug!(command = %command_line(program, args), "spawning");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| Error::Spawn {
            command: program.to_string(),
            source,
        })?;

    Ok(ExecOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a script through `/bin/sh -c`, failing on non-zero exit
pub async fn shell(script: &str) -> Result<ExecOutput> {
    run("/bin/sh", &["-c", script]).await
}

/// Locate a program on `PATH`
///
/// Pure inspection, fit for `check` preconditions.
pub fn lookup(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn command_line(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let out = run("echo", &["hello"]).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout_trimmed(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let err = shell("echo boom >&2; exit 3").await.unwrap_err();
        match err {
            Error::Exec { status, stderr, .. } => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected Exec error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unchecked_reports_status_without_failing() {
        let out = run_unchecked("/bin/sh", &["-c", "exit 5"]).await.unwrap();
        assert_eq!(out.status, 5);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let err = run("definitely-not-a-real-binary", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn lookup_finds_sh() {
        assert!(lookup("sh").is_some());
        assert!(lookup("definitely-not-a-real-binary").is_none());
    }

    #[test]
    fn stdout_lines_skips_blanks() {
        let out = ExecOutput {
            status: 0,
            stdout: "bat\n\nfd\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(out.stdout_lines(), ["bat", "fd"]);
    }
}
