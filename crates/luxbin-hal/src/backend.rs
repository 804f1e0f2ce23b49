//! Backend trait and configuration.
//!
//! ```text
//!   capabilities() ──→ validate() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `capabilities()` | sync | yes | `&Capabilities` |
//! | `availability()` | async | yes | `HalResult<BackendAvailability>` |
//! | `validate()` | async | yes | `HalResult<ValidationResult>` |
//! | `submit()` | async | yes | `HalResult<JobId>` |
//! | `status()` | async | yes | `HalResult<JobStatus>` |
//! | `result()` | async | yes | `HalResult<ExecutionResult>` |
//! | `cancel()` | async | yes | `HalResult<()>` |
//! | `wait()` | async | provided | `HalResult<ExecutionResult>` |
//! | `wait_policy()` | sync | provided | `WaitPolicy` |
//! | `job_url()` | sync | provided | `Option<String>` |

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use luxbin_ir::Circuit;

use crate::capability::Capabilities;
use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobStatus};
use crate::result::ExecutionResult;

/// Settings a [`BackendFactory`] builds a backend from.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name, also used as the node label.
    pub name: String,
    /// Service base URL, for remote backends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// API token. Never serialized and redacted in `Debug`.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Backend-specific settings such as `seed` or `readout_error`.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Settings with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: None,
            token: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the service URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the API token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add a backend-specific setting.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Read an extra value as `u64`.
    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(serde_json::Value::as_u64)
    }

    /// Read an extra value as `f64`.
    pub fn extra_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Read an extra value as a string.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(serde_json::Value::as_str)
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("extra", &self.extra)
            .finish()
    }
}

/// How [`Backend::wait`] polls a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Number of polls before giving up.
    pub max_polls: u32,
}

impl WaitPolicy {
    /// Create a policy.
    pub fn new(poll_interval: Duration, max_polls: u32) -> Self {
        Self {
            poll_interval,
            max_polls,
        }
    }

    /// Upper bound on the total wait.
    pub fn timeout(&self) -> Duration {
        self.poll_interval * self.max_polls
    }
}

impl Default for WaitPolicy {
    /// 500 ms polls for up to five minutes.
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 600)
    }
}

/// Trait for quantum backends.
///
/// `capabilities()` is synchronous and infallible; implementations cache it
/// at construction time. `submit()` returns a job in `Queued` state and
/// `result()` is only valid once `status()` reports `Completed`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Name shown in logs and reports.
    fn name(&self) -> &str;

    /// Qubit count, gate set and shot limit, cached at construction.
    fn capabilities(&self) -> &Capabilities;

    /// Whether the backend takes jobs right now, with queue depth if known.
    async fn availability(&self) -> HalResult<BackendAvailability>;

    /// Check a circuit against the backend before submitting it.
    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult>;

    /// Submit `circuit` for `shots` repetitions and return the job id.
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId>;

    /// Current lifecycle state of a job.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Counts of a completed job. A backend may forget the job once its
    /// counts have been handed over.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult>;

    /// Ask the backend to stop a job.
    async fn cancel(&self, job_id: &JobId) -> HalResult<()>;

    /// Polling cadence used by [`Backend::wait`].
    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::default()
    }

    /// Web page where a job can be inspected, if the provider has one.
    fn job_url(&self, _job_id: &JobId) -> Option<String> {
        None
    }

    /// Poll until the job is terminal, then fetch its counts.
    async fn wait(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let policy = self.wait_policy();

        for _ in 0..policy.max_polls {
            match self.status(job_id).await? {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {
                    tokio::time::sleep(policy.poll_interval).await;
                }
            }
        }

        tracing::warn!(job = %job_id, timeout = ?policy.timeout(), "gave up waiting for job");
        Err(HalError::Timeout(job_id.0.clone()))
    }
}

/// Backend availability information.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    /// Whether the backend is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs currently in queue (if known).
    pub queue_depth: Option<u32>,
    /// Estimated wait time for a new job (if known).
    pub estimated_wait: Option<Duration>,
    /// Human-readable status message.
    pub status_message: Option<String>,
}

impl BackendAvailability {
    /// Create availability for a backend that is always available.
    pub fn always_available() -> Self {
        Self {
            is_available: true,
            queue_depth: Some(0),
            estimated_wait: Some(Duration::ZERO),
            status_message: None,
        }
    }

    /// Create availability for an offline backend.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            estimated_wait: None,
            status_message: Some(reason.into()),
        }
    }
}

/// Result of circuit validation against backend constraints.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Circuit can be submitted as-is.
    Valid,
    /// Circuit cannot run on this backend.
    Invalid {
        /// Reasons the circuit is invalid.
        reasons: Vec<String>,
    },
}

impl ValidationResult {
    /// Check if the circuit can be submitted.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Check a circuit against qubit count and gate set.
    pub fn check(circuit: &Circuit, capabilities: &Capabilities) -> Self {
        let mut reasons = vec![];

        if circuit.num_qubits() > capabilities.num_qubits as usize {
            reasons.push(format!(
                "circuit uses {} qubits, backend has {}",
                circuit.num_qubits(),
                capabilities.num_qubits
            ));
        }

        for inst in circuit.instructions() {
            if let Some(gate) = inst.as_gate() {
                let reason = format!("gate '{}' not supported", gate.name());
                if !capabilities.gate_set.contains(gate.name()) && !reasons.contains(&reason) {
                    reasons.push(reason);
                }
            }
        }

        if reasons.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid { reasons }
        }
    }
}

/// Backends that can be built from a [`BackendConfig`].
pub trait BackendFactory: Backend + Sized {
    /// Build the backend, rejecting out-of-range settings.
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxbin_ir::QubitId;

    #[test]
    fn test_backend_config() {
        let config = BackendConfig::new("test")
            .with_endpoint("https://api.example.com")
            .with_token("secret-token")
            .with_extra("seed", serde_json::json!(42))
            .with_extra("readout_error", serde_json::json!(0.02));

        assert_eq!(config.name, "test");
        assert_eq!(config.endpoint, Some("https://api.example.com".to_string()));
        assert_eq!(config.extra_u64("seed"), Some(42));
        assert_eq!(config.extra_f64("readout_error"), Some(0.02));
        assert_eq!(config.extra_str("seed"), None);
    }

    #[test]
    fn test_backend_config_redacts_token() {
        let config = BackendConfig::new("ibm_fez").with_token("super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn test_default_wait_policy() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_validation_check() {
        let mut circuit = Circuit::with_size("wide", 6, 0);
        circuit.h(QubitId(5)).unwrap();

        assert!(ValidationResult::check(&circuit, &Capabilities::simulator(6)).is_valid());

        match ValidationResult::check(&circuit, &Capabilities::simulator(5)) {
            ValidationResult::Invalid { reasons } => {
                assert_eq!(reasons.len(), 1);
                assert!(reasons[0].contains("6 qubits"));
            }
            ValidationResult::Valid => panic!("expected invalid"),
        }
    }

    #[test]
    fn test_backend_availability() {
        let avail = BackendAvailability::always_available();
        assert!(avail.is_available);
        assert_eq!(avail.queue_depth, Some(0));

        let avail = BackendAvailability::unavailable("maintenance");
        assert!(!avail.is_available);
        assert_eq!(avail.status_message, Some("maintenance".to_string()));
    }
}
