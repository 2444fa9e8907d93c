//! # Error Types
//!
//! Recoverable errors only exist at the configuration boundary. Contract
//! violations inside the managers (stale handles, double destroys) are
//! assertions, not values of this type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by UMBRA.
#[derive(Error, Debug)]
pub enum UmbraError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::UmbraConfig`].
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration parsed but violates a constraint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for UMBRA operations.
pub type UmbraResult<T> = Result<T, UmbraError>;
