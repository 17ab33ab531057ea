//! Quality modes and their upscale ratios
//!
//! Each mode trades render resolution against output detail. The raw values
//! match the FidelityFX FSR1 quality enum so hosts that store the integer
//! setting can map it back.

use std::fmt;
use std::str::FromStr;

/// Scale factor used for raw values that do not name a known mode
pub const DEFAULT_SCALE_FACTOR: f64 = 1.5;

/// Upscaling quality mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QualityMode {
    /// 1.3x upscaling ratio
    UltraQuality,
    /// 1.5x upscaling ratio
    #[default]
    Quality,
    /// 1.7x upscaling ratio
    Balanced,
    /// 2.0x upscaling ratio
    Performance,
}

impl QualityMode {
    /// Every mode, from highest quality to highest performance
    pub const ALL: [QualityMode; 4] = [QualityMode::UltraQuality, QualityMode::Quality, QualityMode::Balanced, QualityMode::Performance];

    /// Returns the ratio between output and input dimensions for this mode
    pub fn scale_factor(self) -> f64 {
        match self {
            QualityMode::UltraQuality => 1.3,
            QualityMode::Quality => 1.5,
            QualityMode::Balanced => 1.7,
            QualityMode::Performance => 2.0,
        }
    }

    /// Maps a raw FSR1 quality value (0..=3) to a mode
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(QualityMode::UltraQuality),
            1 => Some(QualityMode::Quality),
            2 => Some(QualityMode::Balanced),
            3 => Some(QualityMode::Performance),
            _ => None,
        }
    }

    /// Returns the raw FSR1 quality value of this mode
    pub fn to_raw(self) -> i32 {
        match self {
            QualityMode::UltraQuality => 0,
            QualityMode::Quality => 1,
            QualityMode::Balanced => 2,
            QualityMode::Performance => 3,
        }
    }

    /// Returns the human-readable name of this mode
    pub fn name(self) -> &'static str {
        match self {
            QualityMode::UltraQuality => "Ultra Quality",
            QualityMode::Quality => "Quality",
            QualityMode::Balanced => "Balanced",
            QualityMode::Performance => "Performance",
        }
    }
}

/// Scale factor for a raw FSR1 quality value, falling back to [`DEFAULT_SCALE_FACTOR`]
pub fn scale_factor_of_raw(raw: i32) -> f64 {
    QualityMode::from_raw(raw).map_or(DEFAULT_SCALE_FACTOR, QualityMode::scale_factor)
}

impl fmt::Display for QualityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string does not name a quality mode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid quality mode '{0}', expected one of: ultra-quality, quality, balanced, performance")]
pub struct ParseQualityModeError(String);

impl FromStr for QualityMode {
    type Err = ParseQualityModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "ultra-quality" | "ultra" => Ok(QualityMode::UltraQuality),
            "quality" => Ok(QualityMode::Quality),
            "balanced" => Ok(QualityMode::Balanced),
            "performance" => Ok(QualityMode::Performance),
            _ => Err(ParseQualityModeError(s.to_string())),
        }
    }
}
