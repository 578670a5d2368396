//! Error types for the mergemine core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. Callers
//! in the CLI wrap them with `anyhow` context.
//!
//! The two text parsers (history and tool-outcome) have no error type: they
//! never fail on malformed input and report anomalies through `tracing`.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A commit id (full or abbreviated) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Materialization errors
// ---------------------------------------------------------------------------

/// Filesystem errors while writing, filtering, or pruning snapshots.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// A filesystem operation on a snapshot failed.
    #[error("snapshot I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl MaterializeError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Report errors
// ---------------------------------------------------------------------------

/// Errors reading or writing JSON artifacts (scenario lists, records,
/// samples, summaries).
#[derive(Debug, Error)]
pub enum ReportError {
    /// The baseline label has no records among the configurations.
    #[error("baseline configuration '{0}' is not among the aggregated configurations")]
    UnknownBaseline(String),

    /// JSON (de)serialization failure.
    #[error("JSON error in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Generic I/O error.
    #[error("report I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool runner errors
// ---------------------------------------------------------------------------

/// Errors from invoking the external merge tool.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The tool process could not be spawned.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The execution log could not be opened or appended.
    #[error("execution log error at '{path}': {source}")]
    Log {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
