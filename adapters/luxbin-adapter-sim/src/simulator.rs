//! Simulator backend implementation.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

use luxbin_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, Capabilities, Counts,
    ExecutionResult, HalError, HalResult, Job, JobId, JobStatus, ValidationResult,
};
use luxbin_ir::{Circuit, InstructionKind, QubitId};

use crate::noise::NoiseModel;
use crate::statevector::{Statevector, sample_cumulative};

const DEFAULT_MAX_QUBITS: u32 = 20;

struct SimJob {
    job: Job,
    result: Option<ExecutionResult>,
}

/// Local statevector backend.
///
/// Jobs run to completion inside `submit`, so `status` always reports a
/// terminal state. Measurements are sampled from the final state: every
/// stage circuit measures only at the end.
pub struct SimulatorBackend {
    config: BackendConfig,
    capabilities: Capabilities,
    noise: NoiseModel,
    jobs: Arc<Mutex<FxHashMap<String, SimJob>>>,
    rng: Mutex<StdRng>,
}

impl SimulatorBackend {
    /// Create a new noise-free simulator named `simulator`.
    pub fn new() -> Self {
        Self::build(
            BackendConfig::new("simulator"),
            DEFAULT_MAX_QUBITS,
            NoiseModel::ideal(),
            None,
        )
    }

    /// Create a simulator with custom max qubits.
    pub fn with_max_qubits(max_qubits: u32) -> Self {
        Self::build(
            BackendConfig::new("simulator"),
            max_qubits,
            NoiseModel::ideal(),
            None,
        )
    }

    fn build(config: BackendConfig, max_qubits: u32, noise: NoiseModel, seed: Option<u64>) -> Self {
        let mut capabilities = Capabilities::simulator(max_qubits);
        capabilities.name = config.name.clone();
        if !noise.is_ideal() {
            capabilities = capabilities.with_feature("noise");
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            capabilities,
            noise,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
            rng: Mutex::new(rng),
        }
    }

    /// Rename the backend, e.g. to label a pipeline node.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self.capabilities.name = self.config.name.clone();
        self
    }

    /// Seed the sampler for reproducible histograms.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock().unwrap_or_else(PoisonError::into_inner) = StdRng::seed_from_u64(seed);
        self
    }

    /// Apply a noise model to every subsequent job.
    pub fn with_noise(mut self, noise: NoiseModel) -> Self {
        self.noise = noise;
        if !noise.is_ideal() && !self.capabilities.features.iter().any(|f| f == "noise") {
            self.capabilities = self.capabilities.with_feature("noise");
        }
        self
    }

    /// The active noise model.
    pub fn noise(&self) -> NoiseModel {
        self.noise
    }

    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    fn run_simulation(&self, circuit: &Circuit, shots: u32) -> ExecutionResult {
        let start = Instant::now();
        let measured = circuit.measurement_map();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut counts = Counts::new();

        if self.noise.is_coherent() {
            let state = self.evolve(circuit, &mut *rng);
            debug!(qubits = state.num_qubits(), shots, "sampling final state");
            let cumulative = state.cumulative_probabilities();
            for _ in 0..shots {
                let outcome = sample_cumulative(&cumulative, &mut *rng);
                counts.insert(self.read_out(outcome, &measured, &mut *rng), 1);
            }
        } else {
            debug!(shots, p = self.noise.depolarizing, "per-shot noisy evolution");
            for _ in 0..shots {
                let outcome = self.evolve(circuit, &mut *rng).sample(&mut *rng);
                counts.insert(self.read_out(outcome, &measured, &mut *rng), 1);
            }
        }

        let elapsed = start.elapsed();
        debug!(?elapsed, distinct = counts.len(), "simulation completed");
        ExecutionResult::new(counts, shots).with_execution_time(elapsed.as_millis() as u64)
    }

    fn evolve<R: Rng + ?Sized>(&self, circuit: &Circuit, rng: &mut R) -> Statevector {
        let mut state = Statevector::new(circuit.num_qubits());
        for inst in circuit.instructions() {
            if let InstructionKind::Gate(gate) = &inst.kind {
                let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
                state.apply_gate(gate, &qubits);
                if self.noise.depolarizing > 0.0 {
                    for &q in &qubits {
                        if rng.r#gen::<f64>() < self.noise.depolarizing {
                            state.apply_random_pauli(q, rng);
                        }
                    }
                }
            }
        }
        state
    }

    /// Project a basis index onto the classical register, bit 0 right-most.
    fn read_out<R: Rng + ?Sized>(
        &self,
        outcome: usize,
        measured: &[Option<QubitId>],
        rng: &mut R,
    ) -> String {
        measured
            .iter()
            .rev()
            .map(|qubit| {
                let mut bit = qubit.is_some_and(|q| (outcome >> q.index()) & 1 == 1);
                if self.noise.readout_error > 0.0 && rng.r#gen::<f64>() < self.noise.readout_error
                {
                    bit = !bit;
                }
                if bit { '1' } else { '0' }
            })
            .collect()
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        Ok(ValidationResult::check(circuit, &self.capabilities))
    }

    #[instrument(skip(self, circuit), fields(backend = %self.config.name))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        if shots == 0 || shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} shots requested, simulator accepts 1..={}",
                self.capabilities.max_shots
            )));
        }
        if circuit.num_qubits() > self.capabilities.num_qubits as usize {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but simulator only supports {}",
                circuit.num_qubits(),
                self.capabilities.num_qubits
            )));
        }

        let job_id = JobId::new(Uuid::new_v4().to_string());
        let job = Job::new(job_id.clone(), shots).with_backend(self.config.name.clone());
        {
            let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            jobs.insert(job_id.0.clone(), SimJob { job, result: None });
        }
        debug!(job = %job_id, "submitted");

        let result = self.run_simulation(circuit, shots);

        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sim_job) = jobs.get_mut(&job_id.0) {
            sim_job.result = Some(result);
            sim_job.job = sim_job.job.clone().with_status(JobStatus::Completed);
        }

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&job_id.0)
            .map(|j| j.job.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }

    /// Hands the counts over once; the job is forgotten afterwards.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        match jobs.get(&job_id.0) {
            Some(sim_job) if sim_job.result.is_some() => jobs
                .remove(&job_id.0)
                .and_then(|j| j.result)
                .ok_or_else(|| HalError::JobNotFound(job_id.0.clone())),
            Some(_) => Err(HalError::Backend(format!("job {job_id} has no result"))),
            None => Err(HalError::JobNotFound(job_id.0.clone())),
        }
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(&job_id.0) {
            Some(sim_job) if sim_job.job.status.is_terminal() => Ok(()),
            Some(sim_job) => {
                sim_job.job = sim_job.job.clone().with_status(JobStatus::Cancelled);
                Ok(())
            }
            None => Err(HalError::JobNotFound(job_id.0.clone())),
        }
    }
}

impl BackendFactory for SimulatorBackend {
    /// Recognised extras: `max_qubits`, `seed`, `depolarizing`, `readout_error`.
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let max_qubits = match config.extra_u64("max_qubits") {
            Some(v) => u32::try_from(v).map_err(|_| {
                HalError::Configuration(format!("max_qubits {v} is out of range"))
            })?,
            None => DEFAULT_MAX_QUBITS,
        };
        let noise = NoiseModel::new(
            config.extra_f64("depolarizing").unwrap_or(0.0),
            config.extra_f64("readout_error").unwrap_or(0.0),
        )?;
        let seed = config.extra_u64("seed");
        Ok(Self::build(config, max_qubits, noise, seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxbin_ir::ClbitId;

    fn bell() -> Circuit {
        let mut circuit = Circuit::with_size("bell", 2, 2);
        circuit
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .measure_all()
            .unwrap();
        circuit
    }

    #[tokio::test]
    async fn test_simulator_capabilities() {
        let backend = SimulatorBackend::new();
        let caps = backend.capabilities();
        assert!(caps.is_simulator);
        assert_eq!(caps.num_qubits, 20);
        assert!(!caps.features.contains(&"noise".to_string()));
    }

    #[tokio::test]
    async fn test_simulator_bell_state() {
        let backend = SimulatorBackend::new().with_seed(11);
        let job_id = backend.submit(&bell(), 1000).await.unwrap();
        assert_eq!(backend.status(&job_id).await.unwrap(), JobStatus::Completed);

        let result = backend.wait(&job_id).await.unwrap();
        assert_eq!(result.shots, 1000);
        let counts = &result.counts;
        assert_eq!(counts.get("00") + counts.get("11"), 1000);
        assert_eq!(counts.get("01") + counts.get("10"), 0);
    }

    #[tokio::test]
    async fn test_clbit_zero_is_rightmost() {
        let mut circuit = Circuit::with_size("x0", 3, 3);
        circuit.x(QubitId(0)).unwrap().measure_all().unwrap();

        let backend = SimulatorBackend::new();
        let job_id = backend.submit(&circuit, 10).await.unwrap();
        let result = backend.result(&job_id).await.unwrap();
        assert_eq!(result.counts.get("001"), 10);
    }

    #[tokio::test]
    async fn test_unmeasured_clbits_read_zero() {
        let mut circuit = Circuit::with_size("partial", 2, 3);
        circuit
            .x(QubitId(0))
            .unwrap()
            .x(QubitId(1))
            .unwrap()
            .measure(QubitId(1), ClbitId(2))
            .unwrap();

        let backend = SimulatorBackend::new();
        let job_id = backend.submit(&circuit, 5).await.unwrap();
        let result = backend.result(&job_id).await.unwrap();
        assert_eq!(result.counts.get("100"), 5);
    }

    #[tokio::test]
    async fn test_seed_reproduces_counts() {
        let mut circuit = Circuit::with_size("spread", 3, 3);
        for q in 0..3 {
            circuit.h(QubitId(q)).unwrap();
        }
        circuit.measure_all().unwrap();

        let a = SimulatorBackend::new().with_seed(99);
        let b = SimulatorBackend::new().with_seed(99);
        let ra = a.result(&a.submit(&circuit, 500).await.unwrap()).await.unwrap();
        let rb = b.result(&b.submit(&circuit, 500).await.unwrap()).await.unwrap();
        assert_eq!(ra.counts, rb.counts);
    }

    #[tokio::test]
    async fn test_readout_noise_spreads_counts() {
        let mut circuit = Circuit::with_size("zero", 2, 2);
        circuit.measure_all().unwrap();

        let backend = SimulatorBackend::new()
            .with_seed(5)
            .with_noise(NoiseModel::new(0.0, 0.2).unwrap());
        assert!(backend.capabilities().features.contains(&"noise".to_string()));

        let job_id = backend.submit(&circuit, 2000).await.unwrap();
        let counts = backend.result(&job_id).await.unwrap().counts;
        assert_eq!(counts.total_shots(), 2000);
        assert!(counts.get("00") < 2000);
        assert!(counts.get("00") > 1000);
    }

    #[tokio::test]
    async fn test_depolarizing_noise_spreads_counts() {
        let mut circuit = Circuit::with_size("idle", 1, 1);
        for _ in 0..10 {
            circuit.h(QubitId(0)).unwrap().h(QubitId(0)).unwrap();
        }
        circuit.measure_all().unwrap();

        let backend = SimulatorBackend::new()
            .with_seed(3)
            .with_noise(NoiseModel::new(0.1, 0.0).unwrap());
        let job_id = backend.submit(&circuit, 500).await.unwrap();
        let counts = backend.result(&job_id).await.unwrap().counts;
        assert!(counts.get("1") > 0);
    }

    #[tokio::test]
    async fn test_simulator_too_many_qubits() {
        let backend = SimulatorBackend::with_max_qubits(5);
        let circuit = Circuit::with_size("test", 10, 0);
        let result = backend.submit(&circuit, 100).await;
        assert!(matches!(result, Err(HalError::CircuitTooLarge(_))));
    }

    #[tokio::test]
    async fn test_simulator_rejects_zero_shots() {
        let backend = SimulatorBackend::new();
        let result = backend.submit(&bell(), 0).await;
        assert!(matches!(result, Err(HalError::InvalidShots(_))));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let backend = SimulatorBackend::new();
        let err = backend.status(&JobId::new("nope")).await.unwrap_err();
        assert!(matches!(err, HalError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_fetched_jobs_are_released() {
        let mut circuit = Circuit::with_size("coin", 1, 1);
        circuit.h(QubitId(0)).unwrap().measure_all().unwrap();

        let backend = SimulatorBackend::new().with_seed(1);
        for _ in 0..100 {
            let job_id = backend.submit(&circuit, 10).await.unwrap();
            assert_eq!(backend.wait(&job_id).await.unwrap().shots, 10);
        }
        assert!(backend.jobs.lock().unwrap().is_empty());

        let job_id = backend.submit(&circuit, 10).await.unwrap();
        assert_eq!(backend.jobs.lock().unwrap().len(), 1);
        backend.result(&job_id).await.unwrap();
        assert!(matches!(
            backend.result(&job_id).await,
            Err(HalError::JobNotFound(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_oversized_max_qubits() {
        let config = BackendConfig::new("big")
            .with_extra("max_qubits", serde_json::json!(u64::from(u32::MAX) + 1));
        assert!(matches!(
            SimulatorBackend::from_config(config),
            Err(HalError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = BackendConfig::new("QNode-Alpha")
            .with_extra("max_qubits", serde_json::json!(8))
            .with_extra("seed", serde_json::json!(1))
            .with_extra("readout_error", serde_json::json!(0.01));
        let backend = SimulatorBackend::from_config(config).unwrap();
        assert_eq!(backend.name(), "QNode-Alpha");
        assert_eq!(backend.capabilities().name, "QNode-Alpha");
        assert_eq!(backend.capabilities().num_qubits, 8);
        assert_eq!(backend.noise().readout_error, 0.01);

        let bad = BackendConfig::new("x").with_extra("depolarizing", serde_json::json!(2.0));
        assert!(SimulatorBackend::from_config(bad).is_err());
    }
}
