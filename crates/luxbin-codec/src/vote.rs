//! Triple-channel readings and the majority vote over them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;

/// One value per channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    /// Wavelength in nm.
    pub light: f64,
    /// Frequency in Hz.
    pub sound: f64,
    /// Frequency in GHz.
    pub microwave: f64,
}

impl Triple {
    /// Table values of a character.
    pub fn of_char(c: char) -> Self {
        Self {
            light: Channel::Light.value_of(c),
            sound: Channel::Sound.value_of(c),
            microwave: Channel::Microwave.value_of(c),
        }
    }

    /// The same relative position on every channel.
    pub fn from_ratio(ratio: f64) -> Self {
        Self {
            light: Channel::Light.from_ratio(ratio),
            sound: Channel::Sound.from_ratio(ratio),
            microwave: Channel::Microwave.from_ratio(ratio),
        }
    }

    /// Value on `channel`.
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Light => self.light,
            Channel::Sound => self.sound,
            Channel::Microwave => self.microwave,
        }
    }

    /// Each value normalised to its channel range.
    pub fn normalized(&self) -> Self {
        Self {
            light: Channel::Light.normalize(self.light),
            sound: Channel::Sound.normalize(self.sound),
            microwave: Channel::Microwave.normalize(self.microwave),
        }
    }

    /// Nearest character on each channel.
    pub fn vote(&self) -> ChannelVote {
        ChannelVote {
            light: Channel::Light.nearest_char(self.light),
            sound: Channel::Sound.nearest_char(self.sound),
            microwave: Channel::Microwave.nearest_char(self.microwave),
        }
    }
}

/// The character each channel reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelVote {
    /// Light reading.
    pub light: char,
    /// Sound reading.
    pub sound: char,
    /// Microwave reading.
    pub microwave: char,
}

impl ChannelVote {
    /// Character at least two channels agree on, otherwise the light reading.
    pub fn resolve(&self) -> char {
        if self.light == self.sound || self.light == self.microwave {
            self.light
        } else if self.sound == self.microwave {
            self.sound
        } else {
            self.light
        }
    }

    /// How many channels agree.
    pub fn agreement(&self) -> Agreement {
        let sl = self.light == self.sound;
        let lm = self.light == self.microwave;
        let sm = self.sound == self.microwave;
        if sl && lm {
            Agreement::Unanimous
        } else if sl || lm || sm {
            Agreement::Majority
        } else {
            Agreement::Split
        }
    }
}

/// Channel agreement level of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Agreement {
    /// All three channels read the same character.
    Unanimous,
    /// Exactly two channels agree.
    Majority,
    /// Every channel reads something different.
    Split,
}

impl fmt::Display for Agreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Agreement::Unanimous => write!(f, "3/3 AGREE"),
            Agreement::Majority => write!(f, "2/3 AGREE"),
            Agreement::Split => write!(f, "ALL DIFFER"),
        }
    }
}
