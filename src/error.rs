//! Error types for the relay.

use std::path::PathBuf;

/// A single problem found while validating reporter options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required option is absent.
    #[error("missing required option `{0}`")]
    MissingField(&'static str),

    /// The `testCases` table is absent.
    #[error("missing `testCases` table")]
    MissingTestCases,

    /// The `testCases` table has no `default` entry.
    #[error("`testCases` has no `default` entry")]
    MissingDefaultTestCase,

    /// An option is present but has the wrong shape.
    #[error("invalid option `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
}

/// Relay errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Options failed validation.
    #[error("configuration rejected: {}", join_errors(.0))]
    Config(Vec<ConfigError>),

    /// The service URL could not be turned into an endpoint.
    #[error("invalid service url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {message}")]
    Client { message: String },

    /// The flush did not settle before its deadline. Requests still in
    /// flight are aborted and every record of the batch stays pending;
    /// those that did reach Spira are posted again by the next flush.
    #[error("flush timed out after {timeout_ms} ms ({responded}/{submitted} responses)")]
    FlushTimedOut {
        timeout_ms: u64,
        submitted: usize,
        responded: usize,
    },

    /// A submission task panicked or was aborted.
    #[error("submission task failed: {message}")]
    Task { message: String },

    /// Reading an input file failed.
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input file is not valid JSON for its purpose.
    #[error("failed to parse `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
