//! Top-level error types for the mkdmg binary.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, MkdmgError>;

/// Main error type surfaced to `main`
#[derive(Error, Debug)]
pub enum MkdmgError {
    /// CLI argument errors
    #[error(transparent)]
    Cli(#[from] CliError),

    /// Disk image errors
    #[error(transparent)]
    Dmg(#[from] crate::dmg::Error),

    /// Errors with ad-hoc context
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Missing required argument
    #[error("missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}
