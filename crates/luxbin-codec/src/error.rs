//! Error types for the codec.

use thiserror::Error;

/// Errors raised while decoding measurement results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// A measured outcome is not a binary string.
    #[error("invalid bitstring '{bitstring}': {reason}")]
    InvalidBitstring {
        /// Offending outcome.
        bitstring: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Nothing was measured.
    #[error("no measurement outcomes to decode")]
    EmptyCounts,
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
