//! [`Backend`] implementation over the IBM Quantum Runtime API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use luxbin_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, Capabilities, Counts,
    ExecutionResult, HalError, HalResult, JobId, JobStatus, ValidationResult, WaitPolicy,
};
use luxbin_ir::{Circuit, qasm};

use crate::api::{BackendInfo, DEFAULT_ENDPOINT, IbmClient, JobResultResponse, JobStatusResponse};
use crate::error::{IbmError, IbmResult};

/// Page on which a job can be inspected.
pub const JOB_URL_BASE: &str = "https://quantum.ibm.com/jobs";

/// How long backend info stays fresh.
const BACKEND_INFO_TTL: Duration = Duration::from_secs(5 * 60);

/// Hardware queues can hold a job for hours.
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLLS: u32 = 1440;

/// A single IBM Quantum device.
pub struct IbmBackend {
    client: Arc<IbmClient>,
    target: String,
    capabilities: Capabilities,
    backend_info: Arc<RwLock<Option<(BackendInfo, Instant)>>>,
    /// Classical register width of each submitted job.
    clbit_widths: Arc<RwLock<HashMap<String, usize>>>,
}

impl IbmBackend {
    /// Connect to `target` using credentials from the environment.
    ///
    /// `IBM_QUANTUM_TOKEN` is required. When `IBM_SERVICE_CRN` is also set,
    /// the token is treated as an IBM Cloud API key and exchanged via IAM.
    pub async fn connect(target: impl Into<String>) -> IbmResult<Self> {
        let target = target.into();
        let token = std::env::var("IBM_QUANTUM_TOKEN").map_err(|_| IbmError::MissingToken)?;

        let client = match std::env::var("IBM_SERVICE_CRN") {
            Ok(crn) => {
                tracing::info!(backend = %target, "connecting to IBM Cloud (IAM key exchange)");
                IbmClient::connect(&token, &crn).await?
            }
            Err(_) => {
                tracing::info!(backend = %target, "connecting to IBM Quantum with bearer token");
                IbmClient::new(DEFAULT_ENDPOINT, &token)?
            }
        };

        Ok(Self::with_client(client, target))
    }

    /// Wrap an existing client.
    pub fn with_client(client: IbmClient, target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            client: Arc::new(client),
            capabilities: Capabilities::ibm(&target, device_qubits(&target)),
            target,
            backend_info: Arc::new(RwLock::new(None)),
            clbit_widths: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Device name.
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn get_backend_info(&self) -> IbmResult<BackendInfo> {
        {
            let cached = self.backend_info.read().await;
            if let Some((info, fetched_at)) = cached.as_ref() {
                if fetched_at.elapsed() < BACKEND_INFO_TTL {
                    return Ok(info.clone());
                }
            }
        }

        let info = self.client.get_backend(&self.target).await?;
        *self.backend_info.write().await = Some((info.clone(), Instant::now()));
        Ok(info)
    }

    /// Rebuild counts from per-shot hex samples.
    ///
    /// `width` is the classical register size recorded at submission; when
    /// unknown it is inferred from the samples.
    fn results_to_counts(results: &JobResultResponse, width: Option<usize>) -> Counts {
        let mut counts = Counts::new();
        let Some(result) = results.results.first() else {
            return counts;
        };
        for register in result.data.values() {
            let width = width.unwrap_or_else(|| infer_bit_width(&register.samples));
            for sample in &register.samples {
                counts.insert(hex_to_binary(sample, width), 1);
            }
        }
        counts
    }
}

/// Qubit count of the Heron devices LUXBIN runs on.
fn device_qubits(target: &str) -> u32 {
    match target {
        "ibm_torino" => 133,
        _ => 156,
    }
}

fn map_status(status: &JobStatusResponse) -> JobStatus {
    match status.normalized_status().as_str() {
        "QUEUED" => JobStatus::Queued,
        "VALIDATING" | "RUNNING" => JobStatus::Running,
        "COMPLETED" => JobStatus::Completed,
        "FAILED" | "ERROR" => JobStatus::Failed(
            status
                .error_message()
                .unwrap_or_else(|| "unknown error".to_string()),
        ),
        "CANCELLED" => JobStatus::Cancelled,
        other => {
            tracing::debug!(job = %status.id, status = other, "unrecognised job status");
            JobStatus::Running
        }
    }
}

/// Bits needed for the largest sample, at least one.
fn infer_bit_width(samples: &[String]) -> usize {
    let max = samples
        .iter()
        .filter_map(|s| u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok())
        .max()
        .unwrap_or(0);
    if max == 0 {
        1
    } else {
        64 - max.leading_zeros() as usize
    }
}

/// Hex sample to a zero-padded bitstring of `width` bits.
///
/// Input that is not hex is returned unchanged.
fn hex_to_binary(hex: &str, width: usize) -> String {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    match u64::from_str_radix(digits, 16) {
        Ok(value) => format!("{value:0>width$b}"),
        Err(_) => digits.to_string(),
    }
}

#[async_trait]
impl Backend for IbmBackend {
    fn name(&self) -> &str {
        &self.target
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        match self.get_backend_info().await {
            Ok(info) if info.status.operational => Ok(BackendAvailability {
                is_available: true,
                queue_depth: info.status.pending_jobs,
                estimated_wait: None,
                status_message: info.status.status_msg,
            }),
            Ok(info) => Ok(BackendAvailability::unavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "backend offline".to_string()),
            )),
            Err(e) => {
                tracing::warn!(backend = %self.target, "availability check failed: {e}");
                Ok(BackendAvailability::unavailable("failed to query backend"))
            }
        }
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        Ok(ValidationResult::check(circuit, &self.capabilities))
    }

    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        let info = self.get_backend_info().await?;
        if circuit.num_qubits() > info.num_qubits {
            return Err(IbmError::TooManyQubits {
                required: circuit.num_qubits(),
                available: info.num_qubits,
            }
            .into());
        }
        if !info.status.operational {
            return Err(HalError::BackendUnavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| format!("{} offline", self.target)),
            ));
        }
        if let Some(max) = info.max_shots {
            if shots > max {
                return Err(HalError::InvalidShots(format!(
                    "{shots} exceeds the {max}-shot limit of {}",
                    self.target
                )));
            }
        }

        let program = qasm::emit(circuit)?;
        let response = self
            .client
            .submit_sampler_job(&self.target, vec![program], shots)
            .await
            .map_err(|e| HalError::SubmissionFailed(e.to_string()))?;

        self.clbit_widths
            .write()
            .await
            .insert(response.id.clone(), circuit.num_clbits());
        tracing::info!(backend = %self.target, job = %response.id, shots, "job submitted");

        Ok(JobId(response.id))
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let status = self.client.get_job_status(job_id.as_str()).await?;
        Ok(map_status(&status))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let status = self.client.get_job_status(job_id.as_str()).await?;
        let status = map_status(&status);
        if status.is_pending() {
            return Err(HalError::Backend(format!("job {job_id} not yet completed")));
        }

        // The job is done, so its register width is no longer needed.
        let width = self.clbit_widths.write().await.remove(job_id.as_str());
        match status {
            JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
            JobStatus::Cancelled => return Err(HalError::JobCancelled),
            _ => {}
        }

        let results = self.client.get_job_results(job_id.as_str()).await?;
        let counts = Self::results_to_counts(&results, width);
        let shots = u32::try_from(counts.total_shots()).unwrap_or(u32::MAX);

        Ok(ExecutionResult::new(counts, shots))
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        self.client.cancel_job(job_id.as_str()).await?;
        self.clbit_widths.write().await.remove(job_id.as_str());
        Ok(())
    }

    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(POLL_INTERVAL, MAX_POLLS)
    }

    fn job_url(&self, job_id: &JobId) -> Option<String> {
        Some(format!("{JOB_URL_BASE}/{job_id}"))
    }
}

impl BackendFactory for IbmBackend {
    /// Build from a config holding the token; `extra.backend` names the device.
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let token = config
            .token
            .as_deref()
            .ok_or(IbmError::MissingToken)?;
        let endpoint = config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let target = config.extra_str("backend").unwrap_or(&config.name);
        let client = IbmClient::new(endpoint, token)?;
        Ok(Self::with_client(client, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ClassicalRegisterData, SamplerResult};

    fn response(samples: &[&str]) -> JobResultResponse {
        let mut data = HashMap::new();
        data.insert(
            "c".to_string(),
            ClassicalRegisterData {
                samples: samples.iter().map(|s| (*s).to_string()).collect(),
            },
        );
        JobResultResponse {
            results: vec![SamplerResult { data }],
        }
    }

    fn status(value: &str, reason: Option<&str>) -> JobStatusResponse {
        serde_json::from_value(serde_json::json!({
            "id": "job-1",
            "status": value,
            "state": {"status": value, "reason": reason},
        }))
        .unwrap()
    }

    #[test]
    fn test_hex_to_binary_pads_to_width() {
        assert_eq!(hex_to_binary("0x0", 5), "00000");
        assert_eq!(hex_to_binary("0x1", 5), "00001");
        assert_eq!(hex_to_binary("0x1f", 5), "11111");
        assert_eq!(hex_to_binary("a", 4), "1010");
        assert_eq!(hex_to_binary("0b01", 2), "0b01");
    }

    #[test]
    fn test_infer_bit_width() {
        assert_eq!(infer_bit_width(&["0x0".into(), "0x3".into()]), 2);
        assert_eq!(infer_bit_width(&["0x10".into()]), 5);
        assert_eq!(infer_bit_width(&["0x0".into(), "0x0".into()]), 1);
    }

    #[test]
    fn test_results_to_counts_uses_recorded_width() {
        let results = response(&["0x0", "0x3", "0x0", "0x1f"]);
        let counts = IbmBackend::results_to_counts(&results, Some(5));
        assert_eq!(counts.get("00000"), 2);
        assert_eq!(counts.get("00011"), 1);
        assert_eq!(counts.get("11111"), 1);
        assert_eq!(counts.total_shots(), 4);
    }

    #[test]
    fn test_results_to_counts_infers_width() {
        let results = response(&["0x0", "0x3", "0x3"]);
        let counts = IbmBackend::results_to_counts(&results, None);
        assert_eq!(counts.get("00"), 1);
        assert_eq!(counts.get("11"), 2);
    }

    #[test]
    fn test_results_to_counts_empty() {
        let results = JobResultResponse { results: vec![] };
        assert!(IbmBackend::results_to_counts(&results, Some(5)).is_empty());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status(&status("Queued", None)), JobStatus::Queued);
        assert_eq!(map_status(&status("Validating", None)), JobStatus::Running);
        assert_eq!(map_status(&status("RUNNING", None)), JobStatus::Running);
        assert_eq!(map_status(&status("Completed", None)), JobStatus::Completed);
        assert_eq!(map_status(&status("Cancelled", None)), JobStatus::Cancelled);
        assert_eq!(map_status(&status("Paused", None)), JobStatus::Running);
        assert_eq!(
            map_status(&status("Failed", Some("circuit too deep"))),
            JobStatus::Failed("circuit too deep".into())
        );
        assert_eq!(
            map_status(&status("ERROR", None)),
            JobStatus::Failed("unknown error".into())
        );
    }

    #[test]
    fn test_job_url_and_wait_policy() {
        let client = IbmClient::new(DEFAULT_ENDPOINT, "token").unwrap();
        let backend = IbmBackend::with_client(client, "ibm_fez");

        assert_eq!(
            backend.job_url(&JobId::new("d0q1")).as_deref(),
            Some("https://quantum.ibm.com/jobs/d0q1")
        );
        assert_eq!(backend.wait_policy().timeout(), Duration::from_secs(2 * 60 * 60));
        assert_eq!(backend.name(), "ibm_fez");
        assert_eq!(backend.capabilities().num_qubits, 156);
    }

    async fn mock_job(server: &mut mockito::Server, id: &str, status: &str) -> mockito::Mock {
        server
            .mock("GET", format!("/v1/jobs/{id}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"id": id, "status": status}).to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_result_forgets_register_width() {
        let mut server = mockito::Server::new_async().await;
        let _done = mock_job(&mut server, "job-done", "Completed").await;
        let _failed = mock_job(&mut server, "job-failed", "Failed").await;
        let _queued = mock_job(&mut server, "job-queued", "Queued").await;
        let _results = server
            .mock("GET", "/v1/jobs/job-done/results")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results": [{"data": {"c": {"samples": ["0x1", "0x1"]}}}]}"#)
            .create_async()
            .await;

        let client = IbmClient::new(server.url(), "token").unwrap();
        let backend = IbmBackend::with_client(client, "ibm_fez");
        {
            let mut widths = backend.clbit_widths.write().await;
            for id in ["job-done", "job-failed", "job-queued"] {
                widths.insert(id.to_string(), 3);
            }
        }

        let result = backend.result(&JobId::new("job-done")).await.unwrap();
        assert_eq!(result.counts.get("001"), 2);
        assert!(matches!(
            backend.result(&JobId::new("job-failed")).await,
            Err(HalError::JobFailed(_))
        ));
        assert!(backend.result(&JobId::new("job-queued")).await.is_err());

        let widths = backend.clbit_widths.read().await;
        assert_eq!(widths.len(), 1);
        assert!(widths.contains_key("job-queued"));
    }

    #[test]
    fn test_from_config_requires_token() {
        assert!(matches!(
            IbmBackend::from_config(BackendConfig::new("ibm_torino")),
            Err(HalError::AuthenticationFailed(_))
        ));

        let backend = IbmBackend::from_config(
            BackendConfig::new("ibm")
                .with_token("token")
                .with_extra("backend", serde_json::json!("ibm_torino")),
        )
        .unwrap();
        assert_eq!(backend.target(), "ibm_torino");
        assert_eq!(backend.capabilities().num_qubits, 133);
    }
}
