//! LUXBIN Local Statevector Backend
//!
//! Runs LUXBIN stage circuits without network access. It stands in for the
//! IBM service during development and tests, and it can mimic hardware
//! imperfections with a simple [`NoiseModel`].
//!
//! # Performance
//!
//! | Qubits | Memory | Simulation Speed |
//! |--------|--------|------------------|
//! | 5 | ~512 B | Instant |
//! | 10 | ~16 KB | Instant |
//! | 20 | ~16 MB | Moderate |
//!
//! Noise-free circuits are evolved once and sampled per shot; a depolarizing
//! model forces one evolution per shot.
//!
//! # Example
//!
//! ```ignore
//! use luxbin_adapter_sim::{NoiseModel, SimulatorBackend};
//! use luxbin_hal::Backend;
//!
//! let backend = SimulatorBackend::new()
//!     .named("QNode-Alpha")
//!     .with_seed(42)
//!     .with_noise(NoiseModel::new(0.01, 0.02)?);
//!
//! let job_id = backend.submit(&circuit, 1000).await?;
//! let result = backend.wait(&job_id).await?;
//! ```

mod noise;
mod simulator;
mod statevector;

pub use noise::NoiseModel;
pub use simulator::SimulatorBackend;
