//! Error taxonomy for the work schedule pipeline.

use thiserror::Error;

/// Result type used across the pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal failures for a single pipeline invocation. None of these are
/// retried internally; the caller owns retry policy and can branch on the
/// kind.
#[derive(Error, Debug)]
pub enum Error {
    /// The uploaded export could not be decoded or tokenized
    #[error("parse error: {0}")]
    Parse(String),

    /// A normalization or reconciliation invariant was violated
    #[error("transform error: {0}")]
    Transform(String),

    /// The template is structurally incompatible with the configuration
    #[error("render error: {0}")]
    Render(String),

    /// A required configuration value is absent or malformed
    #[error("config error: {0}")]
    Config(String),

    /// A collaborator call (object store, work data store) failed
    #[error("storage error: {0}")]
    Storage(String),
}
