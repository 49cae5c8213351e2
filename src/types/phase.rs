//! Calibration phase definitions

use colored::Color;
use serde::{Deserialize, Serialize};

/// The three live phases of a calibration session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalibrationPhase {
    /// Initial phase, operator tunes the focal length
    Tune,
    /// Focal length locked, subject is guided into the band
    Guide,
    /// Subject is in the band, hold timer running
    Countdown,
}

impl CalibrationPhase {
    /// Terminal color for this phase
    pub fn color(&self) -> Color {
        match self {
            CalibrationPhase::Tune => Color::Cyan,
            CalibrationPhase::Guide => Color::Yellow,
            CalibrationPhase::Countdown => Color::Green,
        }
    }

    /// Get emoji for phase
    pub fn emoji(&self) -> &'static str {
        match self {
            CalibrationPhase::Tune => "🔧",
            CalibrationPhase::Guide => "🧭",
            CalibrationPhase::Countdown => "⏱",
        }
    }
}

impl std::fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CalibrationPhase::Tune => "TUNE",
            CalibrationPhase::Guide => "GUIDE",
            CalibrationPhase::Countdown => "COUNTDOWN",
        };
        write!(f, "{}", name)
    }
}
