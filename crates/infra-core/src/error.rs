//! Error types for the convergence engine
//!
//! Errors are wrapped with context at each boundary they cross (host
//! name, plugin name) and reported as a causal chain from the outermost
//! description to the innermost root cause, joined with `" -> "`.

use thiserror::Error;

/// Result type alias for infra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the convergence engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (invalid host map, unknown host argument)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Per-host context construction errors
    #[error("Failed to build context for host {host}")]
    Context {
        /// Host name
        host: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// A plugin hook failed for a host
    #[error("Plugin {plugin} failed for host {host}")]
    Plugin {
        /// Host name
        host: String,
        /// Plugin name
        plugin: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// A persisted state value no longer decodes as the plugin's type
    #[error("Invalid persisted state: {0}")]
    InvalidState(String),

    /// An external process could not be spawned
    #[error("Failed to spawn {command}")]
    Spawn {
        /// The program that failed to start
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An external process exited non-zero
    #[error("{command} exited with status {status}: {stderr}")]
    Exec {
        /// The invoked command line
        command: String,
        /// Exit status code (-1 if terminated by signal)
        status: i32,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create an invalid-state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Wrap this error with host context
    pub fn for_host(self, host: impl Into<String>) -> Self {
        Self::Context {
            host: host.into(),
            source: Box::new(self),
        }
    }

    /// Wrap this error with host and plugin context
    pub fn for_plugin(self, host: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self::Plugin {
            host: host.into(),
            plugin: plugin.into(),
            source: Box::new(self),
        }
    }

    /// Format this error as a human-readable causal chain
    pub fn chain(&self) -> String {
        chain(self)
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Walk an error's `source()` chain and join every message with `" -> "`
///
/// The outermost description comes first, the root cause last. The
/// original message is never lost, no matter how many boundaries the
/// error crossed.
pub fn chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        parts.push(cause.to_string());
        current = cause.source();
    }
    parts.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_preserves_root_cause() {
        let root = Error::Exec {
            command: "brew install jq".to_string(),
            status: 1,
            stderr: "no bottle available".to_string(),
        };
        let wrapped = root.for_plugin("macbook", "brew-formula");

        let chain = wrapped.chain();
        assert_eq!(
            chain,
            "Plugin brew-formula failed for host macbook -> \
             brew install jq exited with status 1: no bottle available"
        );
    }

    #[test]
    fn chain_of_single_error_has_no_separator() {
        let err = Error::config("no hosts provided");
        assert_eq!(err.chain(), "Configuration error: no hosts provided");
    }

    #[test]
    fn chain_crosses_multiple_boundaries() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let root = Error::Spawn {
            command: "hostnamectl".to_string(),
            source: io,
        };
        let wrapped = root.for_plugin("sid", "hostname");

        let chain = wrapped.chain();
        assert!(chain.starts_with("Plugin hostname failed for host sid"));
        assert!(chain.ends_with("no such file"));
        assert_eq!(chain.matches(" -> ").count(), 2);
    }
}
