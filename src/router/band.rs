//! Frequency bands and their wire ordinals

use std::fmt;
use std::str::FromStr;

/// Wi-Fi radio band.
///
/// The discriminant is the router's `ssid_number` for the band and also the
/// 1-based position of the band's entry on the connection status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrequencyBand {
    TwoPointFourGhz = 1,
    FiveGhz = 2,
}

impl FrequencyBand {
    /// All bands, in ordinal order
    pub const ALL: [FrequencyBand; 2] = [FrequencyBand::TwoPointFourGhz, FrequencyBand::FiveGhz];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyBand::TwoPointFourGhz => "2.4 GHz",
            FrequencyBand::FiveGhz => "5 GHz",
        }
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrequencyBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.trim_end_matches("ghz") {
            "2.4" | "24" => Ok(FrequencyBand::TwoPointFourGhz),
            "5" => Ok(FrequencyBand::FiveGhz),
            _ => Err(format!("unknown band '{}', expected 2.4 or 5", s)),
        }
    }
}
