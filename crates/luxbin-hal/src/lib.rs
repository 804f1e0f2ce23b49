//! LUXBIN Hardware Abstraction Layer
//!
//! Every pipeline stage talks to a quantum backend through the [`Backend`]
//! trait, so the same stage code runs against the local simulator and the
//! IBM Quantum service.
//!
//! # Overview
//!
//! - [`Backend`]: async job lifecycle (submit, poll, fetch results)
//! - [`Capabilities`]: qubit count, gate set and shot limits
//! - [`Counts`] / [`ExecutionResult`]: measured bitstring histograms
//!
//! # Supported Backends
//!
//! | Backend | Crate | Authentication |
//! |---------|-------|----------------|
//! | Local Simulator | `luxbin-adapter-sim` | None |
//! | IBM Quantum | `luxbin-adapter-ibm` | `IBM_QUANTUM_TOKEN` env var |
//!
//! # Bitstring Convention
//!
//! Bitstrings are written with classical bit 0 as the right-most character,
//! which is how the IBM service reports them.
//!
//! # Example: Implementing a Backend
//!
//! ```ignore
//! use luxbin_hal::{
//!     Backend, BackendAvailability, Capabilities, ExecutionResult, HalResult, JobId,
//!     JobStatus, ValidationResult,
//! };
//! use luxbin_ir::Circuit;
//! use async_trait::async_trait;
//!
//! struct MyBackend {
//!     capabilities: Capabilities,
//! }
//!
//! #[async_trait]
//! impl Backend for MyBackend {
//!     fn name(&self) -> &str { "my_backend" }
//!     fn capabilities(&self) -> &Capabilities { &self.capabilities }
//!     async fn availability(&self) -> HalResult<BackendAvailability> {
//!         Ok(BackendAvailability::always_available())
//!     }
//!     async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
//!         Ok(ValidationResult::Valid)
//!     }
//!     async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> { todo!() }
//!     async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> { todo!() }
//!     async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> { todo!() }
//!     async fn cancel(&self, job_id: &JobId) -> HalResult<()> { todo!() }
//! }
//! ```

pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod result;

pub use backend::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, ValidationResult, WaitPolicy,
};
pub use capability::{Capabilities, GateSet};
pub use error::{HalError, HalResult};
pub use job::{Job, JobId, JobStatus};
pub use result::{Counts, ExecutionResult};
