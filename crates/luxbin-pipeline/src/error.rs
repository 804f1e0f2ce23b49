//! Error types for the pipeline crate.

use thiserror::Error;

/// Errors raised while building, running or recording pipeline stages.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// A stage was handed a message with no characters.
    #[error("Message is empty")]
    EmptyMessage,

    /// Relay leg outside 1..=3.
    #[error("Unknown relay leg {0}; legs are numbered 1 to 3")]
    InvalidLeg(u8),

    /// A consensus round was started without voters.
    #[error("Consensus needs at least one voter")]
    NoVoters,

    /// Wrong number of nodes for a multi-node stage.
    #[error("Expected {expected} nodes, got {got}")]
    NodeCount {
        /// Nodes required.
        expected: usize,
        /// Nodes supplied.
        got: usize,
    },

    /// Circuit construction failed.
    #[error("Circuit error: {0}")]
    Circuit(#[from] luxbin_ir::IrError),

    /// Backend submission or polling failed.
    #[error("Backend error: {0}")]
    Backend(#[from] luxbin_hal::HalError),

    /// A histogram could not be decoded.
    #[error("Decode error: {0}")]
    Codec(#[from] luxbin_codec::CodecError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A spawned voter task panicked or was aborted.
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
