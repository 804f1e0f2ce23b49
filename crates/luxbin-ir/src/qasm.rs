//! OpenQASM 3 emitter.
//!
//! Remote backends accept circuits as OpenQASM 3 source with the standard
//! gate library included. Angles are printed with `f64` round-trip precision.

use crate::circuit::Circuit;
use crate::error::IrResult;
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// Emit a circuit as OpenQASM 3 source code.
pub fn emit(circuit: &Circuit) -> IrResult<String> {
    let mut emitter = Emitter::new();
    emitter.emit_circuit(circuit);
    Ok(emitter.output)
}

struct Emitter {
    output: String,
}

impl Emitter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn emit_circuit(&mut self, circuit: &Circuit) {
        self.writeln("OPENQASM 3.0;");
        self.writeln("include \"stdgates.inc\";");
        self.writeln("");

        let num_qubits = circuit.num_qubits();
        if num_qubits > 0 {
            self.writeln(&format!("qubit[{num_qubits}] q;"));
        }
        let num_clbits = circuit.num_clbits();
        if num_clbits > 0 {
            self.writeln(&format!("bit[{num_clbits}] c;"));
        }
        if num_qubits > 0 || num_clbits > 0 {
            self.writeln("");
        }

        for instruction in circuit.instructions() {
            self.emit_instruction(instruction);
        }
    }

    fn emit_instruction(&mut self, instruction: &Instruction) {
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let qubits = emit_qubits(&instruction.qubits);
                let params = gate.parameters();
                if params.is_empty() {
                    self.writeln(&format!("{} {qubits};", gate.name()));
                } else {
                    let params: Vec<String> = params.iter().map(|p| format!("{p:?}")).collect();
                    self.writeln(&format!("{}({}) {qubits};", gate.name(), params.join(", ")));
                }
            }
            InstructionKind::Measure => {
                for (q, c) in instruction.qubits.iter().zip(&instruction.clbits) {
                    self.writeln(&format!("{} = measure {};", emit_clbit(*c), emit_qubit(*q)));
                }
            }
            InstructionKind::Barrier => {
                let qubits = emit_qubits(&instruction.qubits);
                if qubits.is_empty() {
                    self.writeln("barrier;");
                } else {
                    self.writeln(&format!("barrier {qubits};"));
                }
            }
        }
    }
}

fn emit_qubit(qubit: QubitId) -> String {
    format!("q[{}]", qubit.0)
}

fn emit_clbit(clbit: ClbitId) -> String {
    format!("c[{}]", clbit.0)
}

fn emit_qubits(qubits: &[QubitId]) -> String {
    qubits
        .iter()
        .map(|q| emit_qubit(*q))
        .collect::<Vec<_>>()
        .join(", ")
}
