//! Pipeline nodes and the single-backend stage runners.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use luxbin_codec::{DEFAULT_DECODE_CHARS, Decoded, decode_counts};
use luxbin_hal::{Backend, Counts, HalError, JobId, ValidationResult};
use luxbin_ir::Circuit;

use crate::circuits::{RelayLeg, Stroke, echo_circuit, ping_circuit, relay_circuit};
use crate::error::PipelineResult;
use crate::report::Phase;

/// A labelled backend taking part in the pipeline.
#[derive(Clone)]
pub struct Node {
    label: String,
    backend: Arc<dyn Backend>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("label", &self.label)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Node {
    /// Node labelled with its backend's name.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            label: backend.name().to_string(),
            backend,
        }
    }

    /// Override the label shown in logs and reports.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Label shown in logs and reports.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The backend behind this node.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Validate, submit and wait for `circuit`.
    #[instrument(skip(self, circuit), fields(node = %self.label, circuit = circuit.name()))]
    pub async fn run(&self, circuit: &Circuit, shots: u32) -> PipelineResult<NodeRun> {
        let start = Instant::now();

        if let ValidationResult::Invalid { reasons } = self.backend.validate(circuit).await? {
            return Err(HalError::InvalidCircuit(reasons.join("; ")).into());
        }

        let job_id = self.backend.submit(circuit, shots).await?;
        let job_url = self.backend.job_url(&job_id);
        debug!(job = %job_id, "submitted");

        let in_flight = InFlight::new(Arc::clone(&self.backend), job_id.clone());
        let waited = self.backend.wait(&job_id).await;
        if !matches!(waited, Err(HalError::Timeout(_))) {
            in_flight.settle();
        }
        let result = waited?;
        let elapsed = start.elapsed();
        info!(
            job = %job_id,
            outcomes = result.counts.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "job completed"
        );

        Ok(NodeRun {
            counts: result.counts,
            job_id,
            job_url,
            elapsed,
        })
    }
}

/// A submitted job that is cancelled on the backend if dropped unsettled.
///
/// Covers the caller giving up: a wait that timed out, or a task aborted
/// while its job was still queued.
struct InFlight {
    backend: Arc<dyn Backend>,
    job_id: Option<JobId>,
}

impl InFlight {
    fn new(backend: Arc<dyn Backend>, job_id: JobId) -> Self {
        Self {
            backend,
            job_id: Some(job_id),
        }
    }

    /// The job reached a terminal state; nothing to cancel.
    fn settle(mut self) {
        self.job_id = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(job_id) = self.job_id.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(job = %job_id, "no runtime left to cancel abandoned job");
            return;
        };
        let backend = Arc::clone(&self.backend);
        runtime.spawn(async move {
            match backend.cancel(&job_id).await {
                Ok(()) => {
                    info!(job = %job_id, backend = backend.name(), "abandoned job cancelled");
                }
                Err(e) => warn!(job = %job_id, error = %e, "could not cancel abandoned job"),
            }
        });
    }
}

/// Raw outcome of one job on one node.
#[derive(Debug, Clone)]
pub struct NodeRun {
    /// Measured histogram.
    pub counts: Counts,
    /// Provider job id.
    pub job_id: JobId,
    /// Provider page for the job, if any.
    pub job_url: Option<String>,
    /// Submit-to-result wall time.
    pub elapsed: Duration,
}

/// A decoded single-node stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Stage that ran.
    pub phase: Phase,
    /// Message sent.
    pub input: String,
    /// Message decoded from the histogram.
    pub output: String,
    /// Label of the node that ran it.
    pub node: String,
    /// Provider job id.
    pub job: String,
    /// Provider page for the job, if any.
    pub job_url: Option<String>,
    /// Submit-to-result wall time.
    pub elapsed: Duration,
    /// Per-character channel readings.
    pub decoded: Decoded,
}

async fn run_decoded(
    node: &Node,
    phase: Phase,
    input: &str,
    circuit: Circuit,
    shots: u32,
) -> PipelineResult<StageOutcome> {
    let run = node.run(&circuit, shots).await?;
    let decoded = decode_counts(&run.counts, DEFAULT_DECODE_CHARS)?;
    info!(
        phase = %phase,
        node = node.label(),
        input,
        output = %decoded.message,
        "stage decoded"
    );
    Ok(StageOutcome {
        phase,
        input: input.to_string(),
        output: decoded.message.clone(),
        node: node.label().to_string(),
        job: run.job_id.0,
        job_url: run.job_url,
        elapsed: run.elapsed,
        decoded,
    })
}

/// Send `message` through an echo circuit on `node`.
pub async fn run_echo(node: &Node, message: &str, shots: u32) -> PipelineResult<StageOutcome> {
    run_decoded(node, Phase::Echo, message, echo_circuit(message)?, shots).await
}

/// Closing echo of a pipeline, logged under its own phase.
pub async fn run_final_echo(
    node: &Node,
    message: &str,
    shots: u32,
) -> PipelineResult<StageOutcome> {
    run_decoded(node, Phase::EchoFinal, message, echo_circuit(message)?, shots).await
}

/// Carry `message` over one relay leg on `node`.
pub async fn run_relay_leg(
    node: &Node,
    message: &str,
    leg: RelayLeg,
    shots: u32,
) -> PipelineResult<StageOutcome> {
    let circuit = relay_circuit(message, leg)?;
    run_decoded(node, Phase::Relay, message, circuit, shots).await
}

/// Hit `message` back with a ping or pong on `node`.
pub async fn run_ping(
    node: &Node,
    message: &str,
    stroke: Stroke,
    shots: u32,
) -> PipelineResult<StageOutcome> {
    let circuit = ping_circuit(message, stroke)?;
    run_decoded(node, Phase::PingPong, message, circuit, shots).await
}
