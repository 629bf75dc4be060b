//! Error types for the clone library.

use thiserror::Error;

/// Process exit codes used by the CLI boundary.
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_VALIDATION_ERROR: u8 = 2;
pub const EXIT_CONFIG_ERROR: u8 = 3;
pub const EXIT_NOT_FOUND: u8 = 4;
pub const EXIT_UNAUTHORIZED: u8 = 5;
pub const EXIT_TRANSIENT_FETCH: u8 = 6;
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for clone operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (token, batch sizes, YAML fields).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input supplied by the caller.
    #[error("Invalid {param}: {message}")]
    Validation { param: String, message: String },

    /// The remote service reported that a resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service rejected the token or lacks access to the resource.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Pagination of a database was interrupted.
    #[error("Failed to fetch rows of database {database_id}: {message}")]
    TransientFetch {
        database_id: String,
        message: String,
    },

    /// Unclassified remote failure during create/update.
    #[error("Clone failed: {0}")]
    Clone(String),

    /// IO error (config file reads)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connection refused, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a Validation error naming the offending parameter
    pub fn validation(param: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a TransientFetch error for a database
    pub fn transient_fetch(database_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TransientFetch {
            database_id: database_id.into(),
            message: message.into(),
        }
    }

    /// Create a Clone error
    pub fn clone_failed(message: impl Into<String>) -> Self {
        Error::Clone(message.into())
    }

    /// Whether the remote service classified this failure itself.
    pub fn is_remote_classified(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Unauthorized(_) | Error::Validation { .. }
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) | Error::Yaml(_) => EXIT_CONFIG_ERROR,
            Error::Validation { .. } => EXIT_VALIDATION_ERROR,
            Error::NotFound(_) => EXIT_NOT_FOUND,
            Error::Unauthorized(_) => EXIT_UNAUTHORIZED,
            Error::TransientFetch { .. } => EXIT_TRANSIENT_FETCH,
            Error::Io(_) => EXIT_IO_ERROR,
            Error::Clone(_) | Error::Json(_) | Error::Http(_) => EXIT_FAILURE,
        }
    }

    /// HTTP-style status category for request-handling layers.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation { .. } => 400,
            Error::Unauthorized(_) => 401,
            Error::NotFound(_) => 404,
            Error::TransientFetch { .. } | Error::Http(_) => 502,
            Error::Config(_)
            | Error::Clone(_)
            | Error::Io(_)
            | Error::Yaml(_)
            | Error::Json(_) => 500,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for clone operations.
pub type Result<T> = std::result::Result<T, Error>;
