//! Noise applied by the simulator.
//!
//! Two channels are modelled, enough to make simulated runs look like
//! hardware output instead of a handful of sharp peaks:
//!
//! - **Depolarizing**: after each gate, every operand qubit suffers a random
//!   Pauli error with probability `depolarizing`.
//! - **Readout**: each reported classical bit flips with probability
//!   `readout_error`.

use serde::{Deserialize, Serialize};

use luxbin_hal::{HalError, HalResult};

/// Simulator noise parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    /// Per-gate, per-qubit Pauli error probability.
    #[serde(default)]
    pub depolarizing: f64,
    /// Per-bit readout flip probability.
    #[serde(default)]
    pub readout_error: f64,
}

impl NoiseModel {
    /// Noise-free model.
    pub fn ideal() -> Self {
        Self::default()
    }

    /// Build a model, rejecting probabilities outside `[0, 1]`.
    pub fn new(depolarizing: f64, readout_error: f64) -> HalResult<Self> {
        for (name, p) in [("depolarizing", depolarizing), ("readout_error", readout_error)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(HalError::Configuration(format!(
                    "{name} probability must be within [0, 1], got {p}"
                )));
            }
        }
        Ok(Self {
            depolarizing,
            readout_error,
        })
    }

    /// Whether the gate layer is noise-free, so one evolution serves all shots.
    pub fn is_coherent(&self) -> bool {
        self.depolarizing == 0.0
    }

    /// Whether no noise is applied at all.
    pub fn is_ideal(&self) -> bool {
        self.is_coherent() && self.readout_error == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(NoiseModel::new(1.5, 0.0).is_err());
        assert!(NoiseModel::new(0.0, -0.1).is_err());
        assert!(NoiseModel::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_ideal() {
        assert!(NoiseModel::ideal().is_ideal());
        let noisy = NoiseModel::new(0.0, 0.02).unwrap();
        assert!(noisy.is_coherent());
        assert!(!noisy.is_ideal());
    }
}
