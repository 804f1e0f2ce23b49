//! Spectral summary of a whole message.

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::vote::Triple;

/// Characters of a message a profile looks at.
pub const PROFILE_CHARS: usize = 5;

/// Per-channel average over the first five characters of a message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MessageProfile {
    /// Channel averages.
    pub average: Triple,
    /// Characters averaged.
    pub chars: usize,
}

impl MessageProfile {
    /// Profile of `message`, `None` when it is empty.
    pub fn of(message: &str) -> Option<Self> {
        let triples: Vec<Triple> = message
            .chars()
            .take(PROFILE_CHARS)
            .map(Triple::of_char)
            .collect();
        if triples.is_empty() {
            return None;
        }
        let n = triples.len() as f64;
        let sum = |f: fn(&Triple) -> f64| triples.iter().map(f).sum::<f64>() / n;
        Some(Self {
            average: Triple {
                light: sum(|t| t.light),
                sound: sum(|t| t.sound),
                microwave: sum(|t| t.microwave),
            },
            chars: triples.len(),
        })
    }

    /// Average on `channel`.
    pub fn get(&self, channel: Channel) -> f64 {
        self.average.get(channel)
    }

    /// Column of this profile on a spectrum bar of `width` cells.
    pub fn position(&self, channel: Channel, width: usize) -> usize {
        spectrum_position(channel, self.get(channel), width)
    }
}

/// `⌊normalised value × width⌋`, clamped to `0..=width`.
pub fn spectrum_position(channel: Channel, value: f64, width: usize) -> usize {
    let scaled = (channel.normalize(value) * width as f64).floor();
    if scaled <= 0.0 {
        0
    } else {
        (scaled as usize).min(width)
    }
}
