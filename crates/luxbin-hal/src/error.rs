//! Backend errors.

use thiserror::Error;

/// Failures of a backend while accepting, running or reporting a job.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// The device is offline or refuses jobs.
    #[error("Backend is not accepting jobs: {0}")]
    BackendUnavailable(String),

    /// Credentials were missing or rejected.
    #[error("Authentication with the backend failed: {0}")]
    AuthenticationFailed(String),

    /// The backend did not accept the job.
    #[error("Could not submit job: {0}")]
    SubmissionFailed(String),

    /// The job ran and failed.
    #[error("Job failed on the backend: {0}")]
    JobFailed(String),

    /// The job was cancelled before it produced counts.
    #[error("Job was cancelled")]
    JobCancelled,

    /// No job with this id is known to the backend.
    #[error("Unknown job {0}")]
    JobNotFound(String),

    /// The circuit failed validation.
    #[error("Circuit rejected: {0}")]
    InvalidCircuit(String),

    /// The circuit could not be built or emitted.
    #[error(transparent)]
    Circuit(#[from] luxbin_ir::IrError),

    /// HTTP transport failure.
    #[error("Request to backend failed: {0}")]
    Network(#[from] reqwest::Error),

    /// A payload could not be encoded or decoded.
    #[error("Malformed backend payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A backend setting is out of range or missing.
    #[error("Invalid backend configuration: {0}")]
    Configuration(String),

    /// The wait policy ran out before the job finished.
    #[error("Gave up waiting for job {0}")]
    Timeout(String),

    /// The circuit needs more qubits than the device has.
    #[error("Circuit does not fit the backend: {0}")]
    CircuitTooLarge(String),

    /// Shot count is zero or above the backend limit.
    #[error("Shot count out of range: {0}")]
    InvalidShots(String),

    /// Any other provider-side failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result alias for backend operations.
pub type HalResult<T> = Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_job() {
        assert_eq!(
            HalError::Timeout("job-7".into()).to_string(),
            "Gave up waiting for job job-7"
        );
        assert_eq!(HalError::JobNotFound("x".into()).to_string(), "Unknown job x");
    }
}
