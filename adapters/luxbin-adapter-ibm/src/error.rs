//! Error types for the IBM adapter.

use luxbin_hal::HalError;
use thiserror::Error;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Errors raised while talking to IBM Quantum.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IbmError {
    /// No token in the environment.
    #[error("IBM Quantum token not found. Set the IBM_QUANTUM_TOKEN environment variable.")]
    MissingToken,

    /// Token cannot be placed in an HTTP header.
    #[error("Invalid IBM Quantum token")]
    InvalidToken,

    /// IAM exchange of an API key failed.
    #[error("IAM token exchange failed: {0}")]
    IamTokenExchange(String),

    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the service.
    #[error("IBM Quantum API error: {message}")]
    Api {
        /// Status or error code, when the service sent one.
        code: Option<String>,
        /// Error text.
        message: String,
    },

    /// Unknown job id.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job ended in a failed state.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Job was cancelled.
    #[error("Job was cancelled: {0}")]
    JobCancelled(String),

    /// Circuit could not be emitted as OpenQASM.
    #[error("Circuit conversion error: {0}")]
    Circuit(#[from] luxbin_ir::IrError),

    /// Device offline or unknown.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Circuit wider than the device.
    #[error("Circuit requires {required} qubits but backend only has {available}")]
    TooManyQubits {
        /// Qubits needed.
        required: usize,
        /// Qubits available.
        available: usize,
    },

    /// Request parameter rejected before sending.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<IbmError> for HalError {
    fn from(e: IbmError) -> Self {
        match e {
            IbmError::MissingToken | IbmError::InvalidToken | IbmError::IamTokenExchange(_) => {
                HalError::AuthenticationFailed(e.to_string())
            }
            IbmError::JobNotFound(id) => HalError::JobNotFound(id),
            IbmError::JobFailed(msg) => HalError::JobFailed(msg),
            IbmError::JobCancelled(_) => HalError::JobCancelled,
            IbmError::BackendUnavailable(msg) => HalError::BackendUnavailable(msg),
            IbmError::TooManyQubits { .. } => HalError::CircuitTooLarge(e.to_string()),
            IbmError::Circuit(err) => HalError::Circuit(err),
            IbmError::Http(err) => HalError::Network(err),
            _ => HalError::Backend(e.to_string()),
        }
    }
}
