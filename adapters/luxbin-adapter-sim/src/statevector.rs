//! Statevector simulation engine.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use luxbin_ir::StandardGate;

/// Amplitudes of an n-qubit register. Bit `q` of a basis index is qubit `q`.
#[derive(Debug, Clone)]
pub struct Statevector {
    amplitudes: Vec<Complex64>,
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Apply a gate to the given qubits.
    pub fn apply_gate(&mut self, gate: &StandardGate, qubits: &[usize]) {
        match gate {
            StandardGate::X => self.apply_x(qubits[0]),
            StandardGate::Y => self.apply_y(qubits[0]),
            StandardGate::Z => self.apply_z(qubits[0]),
            StandardGate::H => self.apply_h(qubits[0]),
            StandardGate::S => self.apply_phase(qubits[0], PI / 2.0),
            StandardGate::T => self.apply_phase(qubits[0], PI / 4.0),
            StandardGate::Tdg => self.apply_phase(qubits[0], -PI / 4.0),
            StandardGate::Rx(theta) => self.apply_rx(qubits[0], *theta),
            StandardGate::Ry(theta) => self.apply_ry(qubits[0], *theta),
            StandardGate::Rz(theta) => self.apply_rz(qubits[0], *theta),
            StandardGate::CX => self.apply_cx(qubits[0], qubits[1]),
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1]),
        }
    }

    /// Apply a uniformly random Pauli (X, Y or Z) to a qubit.
    pub fn apply_random_pauli<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) {
        match rng.gen_range(0..3) {
            0 => self.apply_x(qubit),
            1 => self.apply_y(qubit),
            _ => self.apply_z(qubit),
        }
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    fn apply_x(&mut self, qubit: usize) {
        for (i, j) in pairs(self.amplitudes.len(), qubit) {
            self.amplitudes.swap(i, j);
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        let i_val = Complex64::new(0.0, 1.0);
        for (i, j) in pairs(self.amplitudes.len(), qubit) {
            let a = self.amplitudes[i];
            self.amplitudes[i] = -i_val * self.amplitudes[j];
            self.amplitudes[j] = i_val * a;
        }
    }

    fn apply_z(&mut self, qubit: usize) {
        self.apply_phase(qubit, PI);
    }

    fn apply_h(&mut self, qubit: usize) {
        for (i, j) in pairs(self.amplitudes.len(), qubit) {
            let a = self.amplitudes[i];
            let b = self.amplitudes[j];
            self.amplitudes[i] = FRAC_1_SQRT_2 * (a + b);
            self.amplitudes[j] = FRAC_1_SQRT_2 * (a - b);
        }
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask != 0 {
                *amp *= phase;
            }
        }
    }

    fn apply_rx(&mut self, qubit: usize, theta: f64) {
        let c = (theta / 2.0).cos();
        let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
        for (i, j) in pairs(self.amplitudes.len(), qubit) {
            let a = self.amplitudes[i];
            let b = self.amplitudes[j];
            self.amplitudes[i] = c * a + neg_i_s * b;
            self.amplitudes[j] = neg_i_s * a + c * b;
        }
    }

    fn apply_ry(&mut self, qubit: usize, theta: f64) {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        for (i, j) in pairs(self.amplitudes.len(), qubit) {
            let a = self.amplitudes[i];
            let b = self.amplitudes[j];
            self.amplitudes[i] = c * a - s * b;
            self.amplitudes[j] = s * a + c * b;
        }
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            *amp *= if i & mask == 0 { phase_0 } else { phase_1 };
        }
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                self.amplitudes.swap(i, i | tgt_mask);
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            if (i & mask1 != 0) && (i & mask2 == 0) {
                self.amplitudes.swap(i, (i & !mask1) | mask2);
            }
        }
    }

    // =========================================================================
    // Measurement
    // =========================================================================

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Running sum of basis-state probabilities, for repeated sampling.
    pub fn cumulative_probabilities(&self) -> Vec<f64> {
        self.amplitudes
            .iter()
            .scan(0.0, |acc, amp| {
                *acc += amp.norm_sqr();
                Some(*acc)
            })
            .collect()
    }

    /// Sample one basis index.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        sample_cumulative(&self.cumulative_probabilities(), rng)
    }
}

/// Index pairs `(i, j)` differing only in bit `qubit`, with the bit clear in `i`.
fn pairs(len: usize, qubit: usize) -> impl Iterator<Item = (usize, usize)> {
    let mask = 1 << qubit;
    (0..len).filter(move |i| i & mask == 0).map(move |i| (i, i | mask))
}

/// Draw a basis index from a cumulative distribution.
pub fn sample_cumulative<R: Rng + ?Sized>(cumulative: &[f64], rng: &mut R) -> usize {
    let total = cumulative.last().copied().unwrap_or(1.0);
    let r: f64 = rng.r#gen::<f64>() * total;
    cumulative
        .partition_point(|&c| c <= r)
        .min(cumulative.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2);
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(1.0, 0.0)));
        for amp in &sv.amplitudes[1..] {
            assert!(approx_eq(*amp, Complex64::new(0.0, 0.0)));
        }
    }

    #[test]
    fn test_bell_state() {
        let mut sv = Statevector::new(2);
        sv.apply_gate(&StandardGate::H, &[0]);
        sv.apply_gate(&StandardGate::CX, &[0, 1]);

        assert!(approx_eq(sv.amplitudes[0], Complex64::new(FRAC_1_SQRT_2, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[2], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(FRAC_1_SQRT_2, 0.0)));
    }

    #[test]
    fn test_ry_pi_flips() {
        let mut sv = Statevector::new(1);
        sv.apply_gate(&StandardGate::Ry(PI), &[0]);
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_rx_half_turn_probabilities() {
        let mut sv = Statevector::new(1);
        sv.apply_gate(&StandardGate::Rx(PI / 2.0), &[0]);
        let cumulative = sv.cumulative_probabilities();
        assert!((cumulative[0] - 0.5).abs() < 1e-12);
        assert!((cumulative[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hth_is_not_identity() {
        // H·T·H rotates |0⟩ away from the pole: P(1) = sin²(π/8).
        let mut sv = Statevector::new(1);
        for gate in [StandardGate::H, StandardGate::T, StandardGate::H] {
            sv.apply_gate(&gate, &[0]);
        }
        let p1 = 1.0 - sv.cumulative_probabilities()[0];
        assert!((p1 - (PI / 8.0).sin().powi(2)).abs() < 1e-12);
    }

    #[test]
    fn test_swap_moves_excitation() {
        let mut sv = Statevector::new(2);
        sv.apply_gate(&StandardGate::X, &[0]);
        sv.apply_gate(&StandardGate::Swap, &[0, 1]);
        assert!(approx_eq(sv.amplitudes[0b10], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_sample_deterministic() {
        let mut sv = Statevector::new(3);
        sv.apply_gate(&StandardGate::X, &[2]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(sv.sample(&mut rng), 0b100);
        }
    }

    #[test]
    fn test_random_pauli_preserves_norm() {
        let mut sv = Statevector::new(2);
        sv.apply_gate(&StandardGate::H, &[0]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            sv.apply_random_pauli(1, &mut rng);
        }
        let total = *sv.cumulative_probabilities().last().unwrap();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
