//! Stage circuits.
//!
//! Every circuit encodes one character per qubit, applies a stage-specific
//! transformation and measures qubit `i` into classical bit `i`. Only the
//! first [`MAX_MESSAGE_QUBITS`] characters of a message are used.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use luxbin_codec::{PingAngles, encode_char};
use luxbin_ir::{Circuit, QubitId};

use crate::error::{PipelineError, PipelineResult};

/// Qubits used per message.
pub const MAX_MESSAGE_QUBITS: usize = 5;

/// Character appended to short consensus proposals.
pub const CONSENSUS_PAD: char = 'A';

fn message_chars(message: &str) -> PipelineResult<Vec<char>> {
    let chars: Vec<char> = message.chars().take(MAX_MESSAGE_QUBITS).collect();
    if chars.is_empty() {
        return Err(PipelineError::EmptyMessage);
    }
    Ok(chars)
}

fn q(i: usize) -> QubitId {
    QubitId(i as u32)
}

fn sized(name: &str, n: usize) -> Circuit {
    Circuit::with_size(name, n as u32, n as u32)
}

/// `h` then the character encoding on every qubit.
fn superpose_and_encode(circuit: &mut Circuit, chars: &[char]) -> PipelineResult<()> {
    for (i, &c) in chars.iter().enumerate() {
        circuit.h(q(i))?;
        encode_char(circuit, q(i), c)?;
    }
    Ok(())
}

fn cx_chain(circuit: &mut Circuit, n: usize) -> PipelineResult<()> {
    for i in 0..n.saturating_sub(1) {
        circuit.cx(q(i), q(i + 1))?;
    }
    Ok(())
}

fn h_all(circuit: &mut Circuit, n: usize) -> PipelineResult<()> {
    for i in 0..n {
        circuit.h(q(i))?;
    }
    Ok(())
}

/// Echo: encode, entangle, a per-qubit `h t h` mirror, entangle again.
pub fn echo_circuit(message: &str) -> PipelineResult<Circuit> {
    let chars = message_chars(message)?;
    let n = chars.len();
    let mut circuit = sized("luxbin_echo", n);

    superpose_and_encode(&mut circuit, &chars)?;
    cx_chain(&mut circuit, n)?;
    for i in 0..n {
        circuit.h(q(i))?.t(q(i))?.h(q(i))?;
    }
    cx_chain(&mut circuit, n)?;
    circuit.measure_all()?;
    Ok(circuit)
}

/// One leg of the relay race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelayLeg {
    /// Phase shift and microwave kick.
    First,
    /// Swap chain and microwave modulation.
    Second,
    /// Ring entanglement and microwave resonance.
    Third,
}

impl RelayLeg {
    /// Legs in running order.
    pub const ALL: [RelayLeg; 3] = [RelayLeg::First, RelayLeg::Second, RelayLeg::Third];

    /// Leg from its 1-based number.
    pub fn from_number(leg: u8) -> PipelineResult<Self> {
        match leg {
            1 => Ok(RelayLeg::First),
            2 => Ok(RelayLeg::Second),
            3 => Ok(RelayLeg::Third),
            other => Err(PipelineError::InvalidLeg(other)),
        }
    }

    /// 1-based leg number.
    pub fn number(self) -> u8 {
        match self {
            RelayLeg::First => 1,
            RelayLeg::Second => 2,
            RelayLeg::Third => 3,
        }
    }

    /// Short description of the leg's transformation.
    pub fn description(self) -> &'static str {
        match self {
            RelayLeg::First => "Phase + MW kick",
            RelayLeg::Second => "Swap + MW mod",
            RelayLeg::Third => "Loop + MW resonance",
        }
    }
}

impl fmt::Display for RelayLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Leg {}", self.number())
    }
}

/// Relay: encode, apply the leg transformation, close with `h` on all.
pub fn relay_circuit(message: &str, leg: RelayLeg) -> PipelineResult<Circuit> {
    let chars = message_chars(message)?;
    let n = chars.len();
    let mut circuit = sized(&format!("luxbin_relay_leg{}", leg.number()), n);

    superpose_and_encode(&mut circuit, &chars)?;
    match leg {
        RelayLeg::First => {
            for i in 0..n {
                circuit.rz(PI / 4.0, q(i))?.rx(PI / 6.0, q(i))?;
            }
            for i in (0..n.saturating_sub(1)).step_by(2) {
                circuit.cx(q(i), q(i + 1))?;
            }
        }
        RelayLeg::Second => {
            for i in 0..n.saturating_sub(1) {
                circuit.swap(q(i), q(i + 1))?;
            }
            for i in 0..n {
                circuit.ry(PI / 3.0, q(i))?.rx(PI / 4.0, q(i))?;
            }
        }
        RelayLeg::Third => {
            cx_chain(&mut circuit, n)?;
            if n > 1 {
                circuit.cx(q(n - 1), q(0))?;
            }
            for i in 0..n {
                circuit.h(q(i))?.rx(PI / 3.0, q(i))?;
            }
        }
    }
    h_all(&mut circuit, n)?;
    circuit.measure_all()?;
    Ok(circuit)
}

/// The five-character proposal a consensus circuit encodes.
pub fn consensus_proposal(message: &str) -> PipelineResult<String> {
    if message.is_empty() {
        return Err(PipelineError::EmptyMessage);
    }
    Ok(message
        .chars()
        .chain(std::iter::repeat(CONSENSUS_PAD))
        .take(MAX_MESSAGE_QUBITS)
        .collect())
}

/// Consensus: always five qubits, short proposals padded with `A`.
pub fn consensus_circuit(message: &str) -> PipelineResult<Circuit> {
    let chars: Vec<char> = consensus_proposal(message)?.chars().collect();
    let n = chars.len();
    let mut circuit = sized("luxbin_consensus", n);

    superpose_and_encode(&mut circuit, &chars)?;
    cx_chain(&mut circuit, n)?;
    for i in 0..n {
        circuit.rz(PI / 5.0, q(i))?.rx(PI / 6.0, q(i))?;
    }
    h_all(&mut circuit, n)?;
    circuit.measure_all()?;
    Ok(circuit)
}

/// Direction of a ping-pong rally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stroke {
    /// Forward rotations, entangled left to right.
    Ping,
    /// Mirrored rotations, entangled right to left.
    Pong,
}

impl Stroke {
    /// Stroke played on the zero-based `rally`: even rallies ping, odd pong.
    pub fn for_rally(rally: usize) -> Self {
        if rally % 2 == 1 {
            Stroke::Pong
        } else {
            Stroke::Ping
        }
    }

    /// Whether this is the returning stroke.
    pub fn is_pong(self) -> bool {
        self == Stroke::Pong
    }
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stroke::Ping => write!(f, "PING"),
            Stroke::Pong => write!(f, "PONG"),
        }
    }
}

/// Ping or pong: half-range encoding, directional entanglement, `t h` finish.
pub fn ping_circuit(message: &str, stroke: Stroke) -> PipelineResult<Circuit> {
    let chars = message_chars(message)?;
    let n = chars.len();
    let name = match stroke {
        Stroke::Ping => "luxbin_ping",
        Stroke::Pong => "luxbin_pong",
    };
    let mut circuit = sized(name, n);

    for (i, &c) in chars.iter().enumerate() {
        let angles = PingAngles::for_char(c);
        circuit.h(q(i))?;
        match stroke {
            Stroke::Ping => circuit
                .ry(angles.theta, q(i))?
                .rz(-angles.phi, q(i))?
                .rx(angles.gamma, q(i))?,
            Stroke::Pong => circuit
                .ry(-angles.theta, q(i))?
                .rz(angles.phi, q(i))?
                .rx(-angles.gamma, q(i))?,
        };
    }
    match stroke {
        Stroke::Ping => cx_chain(&mut circuit, n)?,
        Stroke::Pong => {
            for i in (1..n).rev() {
                circuit.cx(q(i), q(i - 1))?;
            }
        }
    }
    for i in 0..n {
        circuit.t(q(i))?.h(q(i))?;
    }
    circuit.measure_all()?;
    Ok(circuit)
}
