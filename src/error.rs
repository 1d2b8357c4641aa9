//! Error types for the bounce tree passes.

use thiserror::Error;

/// Errors that can occur while augmenting, filtering or rendering a bundle.
///
/// Missing field data is not an error: a bounce without the requested
/// samples yields an undefined colour value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BounceError {
    /// A pass that needs augmented data was run on a fresh bundle.
    #[error("bundle has not been augmented")]
    NotAugmented,

    /// Malformed or contradictory filter, colour or field options.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A loaded track whose arena cannot form a bounce tree.
    #[error("malformed track #{track}: {reason}")]
    MalformedTrack { track: usize, reason: String },
}

impl BounceError {
    pub fn config(msg: impl Into<String>) -> Self {
        BounceError::InvalidConfig(msg.into())
    }
}

/// Result type for bounce tree operations.
pub type Result<T> = std::result::Result<T, BounceError>;
