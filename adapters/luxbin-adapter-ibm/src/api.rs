//! IBM Quantum Runtime REST client.
//!
//! Only the calls a LUXBIN stage needs are covered: device lookup, Sampler V2
//! submission, status polling, result retrieval and cancellation.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, header};
use serde::{Deserialize, Serialize};

use crate::error::{IbmError, IbmResult};

/// IBM Quantum Runtime API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://quantum.cloud.ibm.com/api";

/// IBM Cloud IAM token endpoint.
const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Value of the `IBM-API-Version` header.
const IBM_API_VERSION: &str = "2025-05-01";

/// User-Agent sent with every request.
const USER_AGENT: &str = concat!("luxbin/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// IBM Quantum Runtime client.
pub struct IbmClient {
    client: Client,
    endpoint: String,
    /// Whether the bearer token came from an IAM exchange.
    iam: bool,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("iam", &self.iam)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
}

impl IbmClient {
    /// Client that sends `token` as a bearer token unchanged.
    pub fn new(endpoint: impl Into<String>, token: &str) -> IbmResult<Self> {
        let headers = Self::default_headers(token, None)?;
        Ok(Self {
            client: Self::build(headers)?,
            endpoint: endpoint.into(),
            iam: false,
        })
    }

    /// Client for an IBM Cloud instance: exchanges `api_key` for an IAM
    /// bearer token and attaches the `Service-CRN` header to every request.
    pub async fn connect(api_key: &str, service_crn: &str) -> IbmResult<Self> {
        Self::connect_at(IAM_TOKEN_URL, DEFAULT_ENDPOINT, api_key, service_crn).await
    }

    async fn connect_at(
        iam_url: &str,
        endpoint: &str,
        api_key: &str,
        service_crn: &str,
    ) -> IbmResult<Self> {
        let iam = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let params = [
            ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
            ("apikey", api_key),
        ];
        let response = iam
            .post(iam_url)
            .header(header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| IbmError::IamTokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IbmError::IamTokenExchange(format!(
                "IAM returned {status}: {body}"
            )));
        }

        let token: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| IbmError::IamTokenExchange(format!("unreadable IAM response: {e}")))?;

        let headers = Self::default_headers(&token.access_token, Some(service_crn))?;
        Ok(Self {
            client: Self::build(headers)?,
            endpoint: endpoint.to_string(),
            iam: true,
        })
    }

    fn default_headers(token: &str, service_crn: Option<&str>) -> IbmResult<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| IbmError::InvalidToken)?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::HeaderName::from_static("ibm-api-version"),
            header::HeaderValue::from_static(IBM_API_VERSION),
        );
        if let Some(crn) = service_crn {
            headers.insert(
                header::HeaderName::from_static("service-crn"),
                header::HeaderValue::from_str(crn)
                    .map_err(|_| IbmError::InvalidParameter("invalid Service-CRN value".into()))?,
            );
        }
        Ok(headers)
    }

    fn build(headers: header::HeaderMap) -> IbmResult<Client> {
        Ok(Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?)
    }

    /// API endpoint in use.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the bearer token came from an IAM exchange.
    pub fn is_iam(&self) -> bool {
        self.iam
    }

    /// Configuration and status of one device.
    pub async fn get_backend(&self, name: &str) -> IbmResult<BackendInfo> {
        let url = format!("{}/v1/backends/{}/configuration", self.endpoint, name);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IbmError::BackendUnavailable(name.to_string()));
        }
        let config: BackendConfigResponse = ok_json(response).await?;

        let url = format!("{}/v1/backends/{}/status", self.endpoint, name);
        let response = self.client.get(&url).send().await?;
        let status = if response.status().is_success() {
            let s: BackendStatusResponse = response.json().await?;
            BackendStatus {
                operational: s.state,
                status_msg: (!s.status.is_empty()).then_some(s.status),
                pending_jobs: Some(u32::try_from(s.length_queue).unwrap_or(u32::MAX)),
            }
        } else {
            tracing::debug!(backend = name, status = %response.status(), "status lookup failed");
            BackendStatus {
                operational: true,
                status_msg: None,
                pending_jobs: None,
            }
        };

        Ok(BackendInfo {
            name: config.backend_name,
            num_qubits: config.n_qubits,
            status,
            basis_gates: config.basis_gates,
            max_shots: config.max_shots,
        })
    }

    /// Submit OpenQASM 3 programs to the Sampler V2 primitive.
    pub async fn submit_sampler_job(
        &self,
        backend: &str,
        circuits: Vec<String>,
        shots: u32,
    ) -> IbmResult<SubmitResponse> {
        if shots == 0 {
            return Err(IbmError::InvalidParameter("shots must be positive".into()));
        }
        let url = format!("{}/v1/jobs", self.endpoint);
        let body = SamplerJobRequest::new(backend, circuits, shots);
        let response = self.client.post(&url).json(&body).send().await?;
        ok_json(response).await
    }

    /// Current state of a job.
    pub async fn get_job_status(&self, job_id: &str) -> IbmResult<JobStatusResponse> {
        let url = format!("{}/v1/jobs/{}", self.endpoint, job_id);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IbmError::JobNotFound(job_id.to_string()));
        }
        ok_json(response).await
    }

    /// Results of a completed job.
    pub async fn get_job_results(&self, job_id: &str) -> IbmResult<JobResultResponse> {
        let url = format!("{}/v1/jobs/{}/results", self.endpoint, job_id);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IbmError::JobNotFound(job_id.to_string()));
        }
        ok_json(response).await
    }

    /// Request cancellation of a job.
    pub async fn cancel_job(&self, job_id: &str) -> IbmResult<()> {
        let url = format!("{}/v1/jobs/{}/cancel", self.endpoint, job_id);
        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

/// Decode a success body, or turn the response into [`IbmError::Api`].
async fn ok_json<T: serde::de::DeserializeOwned>(response: Response) -> IbmResult<T> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

async fn api_error(response: Response) -> IbmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .and_then(ApiErrorResponse::into_message)
        .unwrap_or(body);
    IbmError::Api {
        code: Some(status.as_u16().to_string()),
        message,
    }
}

// ============================================================================
// Request types
// ============================================================================

/// Sampler V2 job body.
#[derive(Debug, Serialize)]
struct SamplerJobRequest {
    program_id: &'static str,
    backend: String,
    params: SamplerParams,
}

#[derive(Debug, Serialize)]
struct SamplerParams {
    version: u8,
    /// Each PUB is `[qasm, parameter_values, shots]`.
    pubs: Vec<(String, serde_json::Value, u32)>,
    options: SamplerOptions,
}

#[derive(Debug, Serialize)]
struct SamplerOptions {
    /// Lets the service lay logical circuits out on the device.
    optimization_level: u8,
}

impl SamplerJobRequest {
    fn new(backend: &str, circuits: Vec<String>, shots: u32) -> Self {
        Self {
            program_id: "sampler",
            backend: backend.to_string(),
            params: SamplerParams {
                version: 2,
                pubs: circuits
                    .into_iter()
                    .map(|qasm| (qasm, serde_json::json!({}), shots))
                    .collect(),
                options: SamplerOptions {
                    optimization_level: 1,
                },
            },
        }
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl ApiErrorResponse {
    fn into_message(self) -> Option<String> {
        self.message
            .or_else(|| self.errors.into_iter().next().map(|e| e.message))
    }
}

#[derive(Debug, Deserialize)]
struct BackendConfigResponse {
    backend_name: String,
    n_qubits: usize,
    #[serde(default)]
    basis_gates: Vec<String>,
    #[serde(default)]
    max_shots: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BackendStatusResponse {
    state: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    length_queue: u64,
}

/// Device description.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Device name.
    pub name: String,
    /// Number of physical qubits.
    pub num_qubits: usize,
    /// Operational state.
    pub status: BackendStatus,
    /// Native gates.
    pub basis_gates: Vec<String>,
    /// Shot limit per job.
    pub max_shots: Option<u32>,
}

/// Operational state of a device.
#[derive(Debug, Clone)]
pub struct BackendStatus {
    /// Whether the device accepts jobs.
    pub operational: bool,
    /// Status text such as `"active"`.
    pub status_msg: Option<String>,
    /// Jobs waiting in the queue.
    pub pending_jobs: Option<u32>,
}

/// Job submission response.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Job id.
    pub id: String,
}

/// Job status response. The service reports mixed case (`"Completed"`).
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    /// Job id.
    pub id: String,
    /// Job status.
    pub status: String,
    /// Failure details.
    #[serde(default)]
    pub state: Option<JobState>,
}

/// Failure details of a job.
#[derive(Debug, Clone, Deserialize)]
pub struct JobState {
    /// Status string.
    #[serde(default)]
    pub status: String,
    /// Reason for failure or cancellation.
    #[serde(default)]
    pub reason: Option<String>,
}

impl JobStatusResponse {
    /// Status in upper case.
    pub fn normalized_status(&self) -> String {
        self.status.to_uppercase()
    }

    /// Reason reported for a failure.
    pub fn error_message(&self) -> Option<String> {
        self.state.as_ref().and_then(|s| s.reason.clone())
    }
}

/// Sampler V2 results.
#[derive(Debug, Deserialize)]
pub struct JobResultResponse {
    /// One entry per submitted PUB.
    pub results: Vec<SamplerResult>,
}

/// Results for one PUB.
#[derive(Debug, Deserialize)]
pub struct SamplerResult {
    /// Classical register name to per-shot samples.
    #[serde(default)]
    pub data: HashMap<String, ClassicalRegisterData>,
}

/// Per-shot samples of one classical register.
#[derive(Debug, Deserialize)]
pub struct ClassicalRegisterData {
    /// Hex strings such as `"0x1a"`, one per shot.
    pub samples: Vec<String>,
}
