//! IBM Quantum Runtime backend for LUXBIN.
//!
//! Stage circuits are emitted as OpenQASM 3 and submitted to the Sampler V2
//! primitive. Counts come back as hex samples per shot and are rebuilt into
//! bitstrings using the classical register width recorded at submission.
//!
//! # Authentication
//!
//! | Variables | Mode |
//! |-----------|------|
//! | `IBM_QUANTUM_TOKEN` | Bearer token sent as-is |
//! | `IBM_QUANTUM_TOKEN` + `IBM_SERVICE_CRN` | Token used as an IBM Cloud API key, exchanged via IAM |
//!
//! # Example
//!
//! ```ignore
//! use luxbin_adapter_ibm::IbmBackend;
//! use luxbin_hal::Backend;
//!
//! let backend = IbmBackend::connect("ibm_fez").await?;
//! let job_id = backend.submit(&circuit, 500).await?;
//! println!("{}", backend.job_url(&job_id).unwrap_or_default());
//! let result = backend.wait(&job_id).await?;
//! ```

mod api;
mod backend;
mod error;

pub use api::{BackendInfo, BackendStatus, DEFAULT_ENDPOINT, IbmClient};
pub use backend::{IbmBackend, JOB_URL_BASE};
pub use error::{IbmError, IbmResult};
