//! The three physical channels and their character tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Characters with a table entry, in table order.
pub const ALPHABET: [char; 27] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', ' ',
];

const WAVELENGTHS_NM: [f64; 27] = [
    400.0, 403.9, 407.8, 411.7, 415.6, 419.5, 423.4, 427.3, 431.2, 435.1, 439.0, 442.9, 446.8,
    450.6, 454.5, 458.4, 462.3, 466.2, 470.1, 474.0, 477.9, 481.8, 485.7, 489.6, 493.5, 497.4,
    540.3,
];

const FREQUENCIES_HZ: [f64; 27] = [
    440.0, 493.9, 523.3, 587.3, 659.3, 698.5, 784.0, 830.6, 880.0, 932.3, 987.8, 1046.5, 1108.7,
    1174.7, 1244.5, 1318.5, 1396.9, 1480.0, 1568.0, 1661.2, 1760.0, 1864.7, 1975.5, 2093.0,
    2217.5, 2349.3, 262.6,
];

const MICROWAVES_GHZ: [f64; 27] = [
    4.000, 4.154, 4.308, 4.462, 4.615, 4.769, 4.923, 5.077, 5.231, 5.385, 5.538, 5.692, 5.846,
    6.000, 6.154, 6.308, 6.462, 6.615, 6.769, 6.923, 7.077, 7.231, 7.385, 7.538, 7.692, 7.846,
    5.500,
];

/// A physical quantity a character is mapped onto.
///
/// | Channel | Unit | Range | Rotation |
/// |---------|------|-------|----------|
/// | Light | nm | 400 – 700 | RY |
/// | Sound | Hz | 262.6 – 2349.3 | RZ |
/// | Microwave | GHz | 4 – 8 | RX |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Visible wavelength.
    Light,
    /// Audible frequency.
    Sound,
    /// Transmon drive frequency.
    Microwave,
}

impl Channel {
    /// All channels in vote order.
    pub const ALL: [Channel; 3] = [Channel::Light, Channel::Sound, Channel::Microwave];

    fn table(self) -> &'static [f64; 27] {
        match self {
            Channel::Light => &WAVELENGTHS_NM,
            Channel::Sound => &FREQUENCIES_HZ,
            Channel::Microwave => &MICROWAVES_GHZ,
        }
    }

    /// Lower bound of the normalisation range.
    pub fn min(self) -> f64 {
        match self {
            Channel::Light => 400.0,
            Channel::Sound => 262.6,
            Channel::Microwave => 4.0,
        }
    }

    /// Upper bound of the normalisation range.
    pub fn max(self) -> f64 {
        match self {
            Channel::Light => 700.0,
            Channel::Sound => 2349.3,
            Channel::Microwave => 8.0,
        }
    }

    /// Value used for characters outside the table.
    pub fn default_value(self) -> f64 {
        match self {
            Channel::Light => 540.3,
            Channel::Sound => 262.6,
            Channel::Microwave => 5.5,
        }
    }

    /// Unit suffix.
    pub fn unit(self) -> &'static str {
        match self {
            Channel::Light => "nm",
            Channel::Sound => "Hz",
            Channel::Microwave => "GHz",
        }
    }

    /// Table value of `c`, case-insensitive.
    pub fn value_of(self, c: char) -> f64 {
        let upper = c.to_ascii_uppercase();
        ALPHABET
            .iter()
            .position(|&a| a == upper)
            .map_or(self.default_value(), |i| self.table()[i])
    }

    /// Table character closest to `value`; ties go to the earlier entry.
    pub fn nearest_char(self, value: f64) -> char {
        let mut best = (ALPHABET[0], f64::INFINITY);
        for (&c, &v) in ALPHABET.iter().zip(self.table()) {
            let distance = (v - value).abs();
            if distance < best.1 {
                best = (c, distance);
            }
        }
        best.0
    }

    /// Point at `ratio` along the channel range.
    pub fn from_ratio(self, ratio: f64) -> f64 {
        self.min() + ratio * (self.max() - self.min())
    }

    /// Position of `value` within the channel range, `0.0` at the minimum.
    pub fn normalize(self, value: f64) -> f64 {
        (value - self.min()) / (self.max() - self.min())
    }

    /// Normalised table value of `c`.
    pub fn normalized(self, c: char) -> f64 {
        self.normalize(self.value_of(c))
    }

    /// Descriptive band for a value on this channel.
    pub fn label(self, value: f64) -> &'static str {
        match self {
            Channel::Light => color_name(value),
            Channel::Sound => note_name(value),
            Channel::Microwave => mw_band(value),
        }
    }

    /// `value` with unit, at the precision used in reports.
    pub fn format(self, value: f64) -> String {
        match self {
            Channel::Microwave => format!("{value:.2}{}", self.unit()),
            _ => format!("{value:.0}{}", self.unit()),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Light => write!(f, "light"),
            Channel::Sound => write!(f, "sound"),
            Channel::Microwave => write!(f, "microwave"),
        }
    }
}

/// Colour of a wavelength in nanometres.
pub fn color_name(nm: f64) -> &'static str {
    match nm {
        x if x < 440.0 => "Violet",
        x if x < 490.0 => "Blue",
        x if x < 510.0 => "Cyan",
        x if x < 565.0 => "Green",
        x if x < 590.0 => "Yellow",
        x if x < 625.0 => "Orange",
        _ => "Red",
    }
}

/// Musical register of a frequency in hertz.
pub fn note_name(hz: f64) -> &'static str {
    match hz {
        x if x < 300.0 => "C4",
        x if x < 500.0 => "A4-B4",
        x if x < 700.0 => "D5-E5",
        x if x < 1000.0 => "G5-B5",
        x if x < 1500.0 => "C6-F6",
        x if x < 2000.0 => "G6-B6",
        _ => "C7+",
    }
}

/// Microwave band of a frequency in gigahertz.
pub fn mw_band(ghz: f64) -> &'static str {
    match ghz {
        x if x < 5.0 => "C-band",
        x if x < 6.0 => "C/X-trans",
        x if x < 7.0 => "X-band lo",
        _ => "X-band hi",
    }
}
