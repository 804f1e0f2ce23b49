//! Rotation angles derived from a character.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use luxbin_ir::{Circuit, IrResult, QubitId};

use crate::channel::Channel;

/// Full Bloch-sphere encoding of one character.
///
/// Light drives RY over a full turn, sound drives RZ and microwave drives RX
/// over half a turn each.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodingAngles {
    /// RY angle.
    pub ry: f64,
    /// RZ angle.
    pub rz: f64,
    /// RX angle.
    pub rx: f64,
}

impl EncodingAngles {
    /// Angles for `c`.
    pub fn for_char(c: char) -> Self {
        Self {
            ry: Channel::Light.normalized(c) * TAU,
            rz: Channel::Sound.normalized(c) * PI,
            rx: Channel::Microwave.normalized(c) * PI,
        }
    }
}

/// Apply RY, RZ then RX encoding `c` onto `qubit`.
pub fn encode_char(circuit: &mut Circuit, qubit: QubitId, c: char) -> IrResult<()> {
    let angles = EncodingAngles::for_char(c);
    circuit
        .ry(angles.ry, qubit)?
        .rz(angles.rz, qubit)?
        .rx(angles.rx, qubit)?;
    Ok(())
}

/// Half-range angles used by the ping-pong stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PingAngles {
    /// Light angle, up to π.
    pub theta: f64,
    /// Sound angle, up to π/2.
    pub phi: f64,
    /// Microwave angle, up to π/2.
    pub gamma: f64,
}

impl PingAngles {
    /// Angles for `c`.
    pub fn for_char(c: char) -> Self {
        Self {
            theta: Channel::Light.normalized(c) * PI,
            phi: Channel::Sound.normalized(c) * FRAC_PI_2,
            gamma: Channel::Microwave.normalized(c) * FRAC_PI_2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxbin_ir::StandardGate;

    #[test]
    fn test_angles_for_a() {
        let angles = EncodingAngles::for_char('A');
        assert_eq!(angles.ry, 0.0);
        assert_eq!(angles.rx, 0.0);
        let expected_rz = (440.0 - 262.6) / (2349.3 - 262.6) * PI;
        assert!((angles.rz - expected_rz).abs() < 1e-12);
    }

    #[test]
    fn test_encode_char_gate_order() {
        let mut circuit = Circuit::with_size("enc", 1, 0);
        encode_char(&mut circuit, QubitId(0), 'z').unwrap();

        let gates: Vec<_> = circuit
            .instructions()
            .iter()
            .filter_map(|i| i.as_gate())
            .collect();
        assert_eq!(gates.len(), 3);
        assert!(matches!(gates[0], StandardGate::Ry(_)));
        assert!(matches!(gates[1], StandardGate::Rz(_)));
        assert!(matches!(gates[2], StandardGate::Rx(_)));
    }

    #[test]
    fn test_ping_angles_are_half_of_encoding() {
        let enc = EncodingAngles::for_char('M');
        let ping = PingAngles::for_char('M');
        assert!((ping.theta * 2.0 - enc.ry).abs() < 1e-12);
        assert!((ping.phi * 2.0 - enc.rz).abs() < 1e-12);
        assert!((ping.gamma * 2.0 - enc.rx).abs() < 1e-12);
    }

    #[test]
    fn test_encode_rejects_missing_qubit() {
        let mut circuit = Circuit::with_size("enc", 1, 0);
        assert!(encode_char(&mut circuit, QubitId(3), 'A').is_err());
    }
}
