//! Centralized error handling for the diabetes risk pipeline.
//!
//! Every stage returns [`Result<T>`], an alias over [`PipelineError`]. The
//! variants mirror the failure categories an operator needs to tell apart
//! when a batch run stops:
//!
//! ```
//! use diabetes_risk::error::PipelineError;
//!
//! fn describe(err: &PipelineError) -> &'static str {
//!     match err {
//!         PipelineError::Validation(_) => "upstream gate not satisfied",
//!         PipelineError::Schema(_) => "expected column absent",
//!         PipelineError::Io(_) => "file missing or unreadable",
//!         _ => "other failure",
//!     }
//! }
//! ```
//!
//! ## Conversions
//!
//! `From` is implemented for the library errors the stages touch (I/O,
//! Polars, JSON, YAML, HTTP), so `?` works without ceremony:
//!
//! ```no_run
//! use diabetes_risk::error::Result;
//!
//! fn read_status(path: &str) -> Result<String> {
//!     let content = std::fs::read_to_string(path)?;
//!     Ok(content)
//! }
//! ```
//!
//! ## Context
//!
//! [`ResultExt`] adds `.context()` to any convertible `Result`. Unlike a
//! plain string wrapper it keeps the variant of the underlying error, so a
//! schema problem stays a schema problem after context is attached.

use std::fmt;

/// Main error type for pipeline operations.
#[derive(Debug)]
pub enum PipelineError {
    /// File not found or unreadable (dataset, model, test data, status flag)
    Io(std::io::Error),

    /// Missing or invalid configuration (paths, schema, params)
    Configuration(String),

    /// Upstream gate not satisfied, or split preconditions violated
    Validation(String),

    /// Expected column absent
    Schema(String),

    /// Data processing errors (Polars, casting, encoding)
    DataProcessing(String),

    /// Model fitting, persistence or prediction errors
    Model(String),

    /// Experiment tracking errors
    Tracking(String),

    /// Generic error with context
    Other(String),
}

impl PipelineError {
    /// Build a not-found I/O error naming the missing file.
    pub fn not_found(what: &str, path: &std::path::Path) -> Self {
        Self::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{what} not found: {}", path.display()),
        ))
    }

    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Configuration(_) => "configuration",
            Self::Validation(_) => "validation",
            Self::Schema(_) => "schema",
            Self::DataProcessing(_) => "data_processing",
            Self::Model(_) => "model",
            Self::Tracking(_) => "tracking",
            Self::Other(_) => "other",
        }
    }

    fn prefixed(self, prefix: &str) -> Self {
        match self {
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), format!("{prefix}: {e}"))),
            Self::Configuration(msg) => Self::Configuration(format!("{prefix}: {msg}")),
            Self::Validation(msg) => Self::Validation(format!("{prefix}: {msg}")),
            Self::Schema(msg) => Self::Schema(format!("{prefix}: {msg}")),
            Self::DataProcessing(msg) => Self::DataProcessing(format!("{prefix}: {msg}")),
            Self::Model(msg) => Self::Model(format!("{prefix}: {msg}")),
            Self::Tracking(msg) => Self::Tracking(format!("{prefix}: {msg}")),
            Self::Other(msg) => Self::Other(format!("{prefix}: {msg}")),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Schema(msg) => write!(f, "Schema error: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Model(msg) => write!(f, "Model error: {msg}"),
            Self::Tracking(msg) => write!(f, "Tracking error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::DataProcessing(format!("JSON error: {err}"))
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration(format!("YAML error: {err}"))
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Tracking(err.to_string())
    }
}

impl From<PipelineError> for String {
    fn from(err: PipelineError) -> Self {
        err.to_string()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PipelineError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().prefixed(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().prefixed(&f()))
    }
}
