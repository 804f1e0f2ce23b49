//! Measurement histogram to message.

use serde::{Deserialize, Serialize};

use luxbin_hal::Counts;

use crate::error::{CodecError, CodecResult};
use crate::vote::{ChannelVote, Triple};

/// Characters decoded from a histogram unless told otherwise.
pub const DEFAULT_DECODE_CHARS: usize = 5;

/// Outcome of [`decode_counts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoded {
    /// Decoded text, one character per outcome used.
    pub message: String,
    /// Light value of each outcome.
    pub wavelengths: Vec<f64>,
    /// Sound value of each outcome.
    pub frequencies: Vec<f64>,
    /// Microwave value of each outcome.
    pub microwaves: Vec<f64>,
    /// Channel readings of each outcome.
    pub votes: Vec<ChannelVote>,
}

/// Relative value of a bitstring: `int(bits) / (2^len − 1)`.
///
/// The empty bitstring has nothing to scale by and maps to the midpoint.
pub fn bitstring_ratio(bits: &str) -> CodecResult<f64> {
    let invalid = |reason| CodecError::InvalidBitstring {
        bitstring: bits.to_string(),
        reason,
    };
    if bits.len() > 64 {
        return Err(invalid("longer than 64 bits"));
    }
    if bits.is_empty() {
        return Ok(0.5);
    }
    if !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(invalid("not binary"));
    }
    let value = u64::from_str_radix(bits, 2).map_err(|_| invalid("not binary"))?;
    let max = u64::MAX >> (64 - bits.len());
    Ok(value as f64 / max as f64)
}

/// Decode the `n_chars` most frequent outcomes into a message.
///
/// Each outcome's ratio is placed on all three channels, each channel names
/// its nearest character, and the channels vote.
pub fn decode_counts(counts: &Counts, n_chars: usize) -> CodecResult<Decoded> {
    if counts.is_empty() {
        return Err(CodecError::EmptyCounts);
    }

    let mut decoded = Decoded {
        message: String::with_capacity(n_chars),
        wavelengths: Vec::with_capacity(n_chars),
        frequencies: Vec::with_capacity(n_chars),
        microwaves: Vec::with_capacity(n_chars),
        votes: Vec::with_capacity(n_chars),
    };

    for (bits, _) in counts.sorted().into_iter().take(n_chars) {
        let triple = Triple::from_ratio(bitstring_ratio(bits)?);
        let vote = triple.vote();
        decoded.message.push(vote.resolve());
        decoded.wavelengths.push(triple.light);
        decoded.frequencies.push(triple.sound);
        decoded.microwaves.push(triple.microwave);
        decoded.votes.push(vote);
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitstring_ratio() {
        assert_eq!(bitstring_ratio("00000").unwrap(), 0.0);
        assert_eq!(bitstring_ratio("11111").unwrap(), 1.0);
        assert_eq!(bitstring_ratio("1").unwrap(), 1.0);
        assert!((bitstring_ratio("00011").unwrap() - 3.0 / 31.0).abs() < 1e-15);
        assert_eq!(bitstring_ratio("").unwrap(), 0.5);
    }

    #[test]
    fn test_bitstring_ratio_rejects_garbage() {
        assert!(matches!(
            bitstring_ratio("01x"),
            Err(CodecError::InvalidBitstring { .. })
        ));
        assert!(bitstring_ratio("+1").is_err());
        assert!(bitstring_ratio(&"1".repeat(65)).is_err());
        assert_eq!(bitstring_ratio(&"1".repeat(64)).unwrap(), 1.0);
    }

    #[test]
    fn test_decode_empty_counts() {
        assert_eq!(
            decode_counts(&Counts::new(), 5),
            Err(CodecError::EmptyCounts)
        );
    }

    #[test]
    fn test_decode_uses_frequency_order() {
        let counts: Counts = [("11111", 10), ("00000", 40), ("10000", 20)]
            .into_iter()
            .collect();
        let decoded = decode_counts(&counts, 5).unwrap();

        // 00000: light A, sound space, microwave A -> A
        // 10000: ratio 16/31 -> light 554.8 (space), sound 1339.7 (P), mw 6.06 (N)
        // 11111: light 700 (space), sound Z, mw 8.0 (Z) -> Z
        assert_eq!(decoded.message, "A Z");
        assert_eq!(decoded.wavelengths.len(), 3);
        assert_eq!(decoded.votes[0].sound, ' ');
    }

    #[test]
    fn test_decode_truncates_to_n_chars() {
        let counts: Counts = (0..12u32)
            .map(|i| (format!("{i:05b}"), u64::from(i) + 1))
            .collect();
        let decoded = decode_counts(&counts, 5).unwrap();
        assert_eq!(decoded.message.chars().count(), 5);
        assert_eq!(decoded.votes.len(), 5);
    }
}
