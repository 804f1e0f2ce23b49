//! LUXBIN Triple-Channel Character Encoding
//!
//! Every character of the LUXBIN alphabet (`A`–`Z` and space) has a value on
//! three physical channels. Encoding turns those values into qubit rotations;
//! decoding maps measured bitstrings back onto the channels and lets the
//! channels vote on the character.
//!
//! | Channel | Range | Rotation |
//! |---------|-------|----------|
//! | Light | 400 – 700 nm | RY, full turn |
//! | Sound | 262.6 – 2349.3 Hz | RZ, half turn |
//! | Microwave | 4 – 8 GHz | RX, half turn |
//!
//! # Example
//!
//! ```rust
//! use luxbin_codec::{Channel, decode_counts};
//! use luxbin_hal::Counts;
//!
//! assert_eq!(Channel::Light.value_of('n'), 450.6);
//!
//! let counts: Counts = [("00000", 700), ("11111", 300)].into_iter().collect();
//! let decoded = decode_counts(&counts, 5)?;
//! assert_eq!(decoded.message, "AZ");
//! # Ok::<(), luxbin_codec::CodecError>(())
//! ```

pub mod channel;
pub mod decode;
pub mod encode;
pub mod error;
pub mod profile;
pub mod vote;

pub use channel::{ALPHABET, Channel, color_name, mw_band, note_name};
pub use decode::{DEFAULT_DECODE_CHARS, Decoded, bitstring_ratio, decode_counts};
pub use encode::{EncodingAngles, PingAngles, encode_char};
pub use error::{CodecError, CodecResult};
pub use profile::{MessageProfile, PROFILE_CHARS, spectrum_position};
pub use vote::{Agreement, ChannelVote, Triple};
