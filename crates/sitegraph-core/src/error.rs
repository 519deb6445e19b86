//! Error types for the SiteGraph engine.
//!
//! All errors in the system are represented by the [`Error`] enum.
//! Precondition violations (caller bugs) surface as typed variants;
//! data-quality problems are logged and skipped by the builder instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// The core error type for all graph operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// An analysis was requested before the graph was built
    #[error("Graph not built: call build() before running analyses")]
    NotBuilt,

    /// An algorithm parameter is outside its valid range
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Personalized PageRank was asked for without any seed page
    #[error("Personalized PageRank requires at least one seed page")]
    EmptySeedSet,

    /// Page is not part of the graph
    #[error("Page not found in graph: {}", path.display())]
    PageNotFound { path: PathBuf },

    /// Page data cannot be analysed
    #[error("Invalid page {}: {reason}", path.display())]
    InvalidPage { path: PathBuf, reason: String },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic unclassified error
    #[error("Error: {0}")]
    Other(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a page not found error
    pub fn page_not_found(path: impl Into<PathBuf>) -> Self {
        Error::PageNotFound { path: path.into() }
    }

    /// Create an invalid page error
    pub fn invalid_page(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidPage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error is a caller precondition violation
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::NotBuilt | Error::InvalidParameter { .. } | Error::EmptySeedSet
        )
    }
}
