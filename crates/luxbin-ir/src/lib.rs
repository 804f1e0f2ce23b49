//! LUXBIN Circuit Representation
//!
//! A deliberately small circuit model covering the gates the LUXBIN message
//! stages are built from, plus an OpenQASM 3 emitter used when circuits are
//! shipped to a remote backend.
//!
//! # Example: Encoding one character
//!
//! ```rust
//! use luxbin_ir::{Circuit, ClbitId, QubitId};
//!
//! let mut circuit = Circuit::with_size("one_char", 1, 1);
//! circuit
//!     .h(QubitId(0))?
//!     .ry(0.5, QubitId(0))?
//!     .rz(0.25, QubitId(0))?
//!     .measure(QubitId(0), ClbitId(0))?;
//!
//! assert_eq!(circuit.depth(), 4);
//! let qasm = luxbin_ir::qasm::emit(&circuit)?;
//! assert!(qasm.contains("c[0] = measure q[0];"));
//! # Ok::<(), luxbin_ir::IrError>(())
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `X`, `Y`, `Z` | 1 | Pauli gates |
//! | `H` | 1 | Hadamard gate |
//! | `S`, `T`, `Tdg` | 1 | Phase gates |
//! | `Rx`, `Ry`, `Rz` | 1 | Rotation gates |
//! | `CX` | 2 | Controlled-NOT |
//! | `Swap` | 2 | SWAP gate |

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qasm;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use qubit::{ClbitId, QubitId};
