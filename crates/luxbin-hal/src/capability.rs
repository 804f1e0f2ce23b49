//! Backend capability introspection.

use serde::{Deserialize, Serialize};

/// Hardware capabilities of a quantum backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Supported gate set (OpenQASM 3 naming convention).
    pub gate_set: GateSet,
    /// Maximum number of shots per job.
    pub max_shots: u32,
    /// Whether this is a simulator (`true`) or real hardware (`false`).
    pub is_simulator: bool,
    /// Additional capability flags such as `"statevector"` or `"noise"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Capabilities {
    /// Create capabilities for a local simulator.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            name: "simulator".into(),
            num_qubits,
            gate_set: GateSet::luxbin(),
            max_shots: 100_000,
            is_simulator: true,
            features: vec!["statevector".into()],
        }
    }

    /// Create capabilities for an IBM Heron processor.
    ///
    /// Circuits are submitted in logical gates; the service maps them onto
    /// the native set.
    pub fn ibm(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: GateSet::ibm_heron(),
            max_shots: 100_000,
            is_simulator: false,
            features: vec![],
        }
    }

    /// Add a feature flag.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }
}

/// Set of gates a backend accepts.
///
/// If `native` is empty, every supported gate is considered native.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSet {
    /// Single-qubit gates supported.
    pub single_qubit: Vec<String>,
    /// Two-qubit gates supported.
    pub two_qubit: Vec<String>,
    /// Native gates (execute without decomposition on this backend).
    pub native: Vec<String>,
}

fn names(gates: &[&str]) -> Vec<String> {
    gates.iter().map(|g| (*g).to_string()).collect()
}

impl GateSet {
    /// Every gate a LUXBIN stage circuit uses, all native.
    pub fn luxbin() -> Self {
        Self {
            single_qubit: names(&["x", "y", "z", "h", "s", "t", "tdg", "rx", "ry", "rz"]),
            two_qubit: names(&["cx", "swap"]),
            native: vec![],
        }
    }

    /// IBM Heron (ibm_fez, ibm_torino, ibm_marrakesh).
    ///
    /// Native gates are `cz, rz, sx, x`; the standard-library gates used by
    /// the stage circuits are accepted and decomposed by the service.
    pub fn ibm_heron() -> Self {
        let mut single = names(&["rz", "sx", "x", "id"]);
        single.extend(names(&["y", "z", "h", "s", "t", "tdg", "rx", "ry"]));
        Self {
            single_qubit: single,
            two_qubit: names(&["cz", "cx", "swap"]),
            native: names(&["rz", "sx", "x", "cz", "id"]),
        }
    }

    /// Check if a gate is supported.
    pub fn contains(&self, gate: &str) -> bool {
        self.single_qubit.iter().any(|g| g == gate) || self.two_qubit.iter().any(|g| g == gate)
    }

    /// Check if a gate executes without decomposition.
    pub fn is_native(&self, gate: &str) -> bool {
        if self.native.is_empty() {
            self.contains(gate)
        } else {
            self.native.iter().any(|g| g == gate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luxbin_gate_set() {
        let gates = GateSet::luxbin();
        for gate in ["h", "t", "rx", "ry", "rz", "cx", "swap"] {
            assert!(gates.contains(gate), "{gate} missing");
            assert!(gates.is_native(gate));
        }
        assert!(!gates.contains("ccx"));
    }

    #[test]
    fn test_ibm_heron_native_subset() {
        let gates = GateSet::ibm_heron();
        assert!(gates.contains("h"));
        assert!(!gates.is_native("h"));
        assert!(gates.is_native("cz"));
    }

    #[test]
    fn test_simulator_capabilities() {
        let caps = Capabilities::simulator(12).with_feature("noise");
        assert!(caps.is_simulator);
        assert_eq!(caps.num_qubits, 12);
        assert!(caps.features.contains(&"noise".to_string()));
    }
}
