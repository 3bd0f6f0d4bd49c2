/*!
 * Error types for Steadfast
 */

use std::fmt;
use std::io;
use std::path::PathBuf;
use steadfast_core_resilience::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SteadfastError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug, Error)]
pub enum SteadfastError {
    /// Configuration file could not be read
    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file is not valid TOML for the expected schema
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML
    #[error("Failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Limiter or decision parameters rejected by the engine
    #[error("Invalid limiter configuration: {0}")]
    Limiter(#[from] ConfigError),

    /// Any other configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Some simulated tasks did not succeed
    #[error("{failed} of {total} tasks did not succeed")]
    Incomplete { failed: usize, total: usize },
}

impl SteadfastError {
    /// Map the error to a process exit code
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => EXIT_FATAL,
            ErrorCategory::Io | ErrorCategory::Workload => EXIT_PARTIAL,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            SteadfastError::ConfigRead { .. }
            | SteadfastError::ConfigParse(_)
            | SteadfastError::ConfigRender(_)
            | SteadfastError::Limiter(_)
            | SteadfastError::Config(_)
            | SteadfastError::Logging(_) => ErrorCategory::Configuration,
            SteadfastError::Io(_) => ErrorCategory::Io,
            SteadfastError::Incomplete { .. } => ErrorCategory::Workload,
        }
    }

    /// True for errors that stop the process before any work runs
    pub fn is_fatal(&self) -> bool {
        self.exit_code() == EXIT_FATAL
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration and startup errors
    Configuration,
    /// I/O operation errors
    Io,
    /// Work that ran but did not fully succeed
    Workload,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Workload => write!(f, "workload"),
        }
    }
}
