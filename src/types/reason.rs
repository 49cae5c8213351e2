//! Reason codes for every tick decision and phase change

use serde::{Deserialize, Serialize};

/// Reason codes attached to each tick output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // C001: Tuning
    // =========================================================================
    /// Focal length changed by the operator
    C001_FOCAL_ADJUSTED,
    /// Adjustment refused, focal length would drop to zero or below
    C001_FOCAL_REJECTED,

    // =========================================================================
    // C002: Phase held
    // =========================================================================
    /// Phase is TUNE
    C002_PHASE_TUNE,
    /// Phase is GUIDE, subject outside the band
    C002_PHASE_GUIDE,
    /// No face detected this tick
    C002_NO_FACE,

    // =========================================================================
    // C003: Hold
    // =========================================================================
    /// Hold accumulating toward confirmation
    C003_HOLD_ACCUMULATING,
    /// Hold broken, progress discarded
    C003_HOLD_RESET,

    // =========================================================================
    // C005: Transitions
    // =========================================================================
    /// TUNE → GUIDE on operator lock
    C005_TRANSITION_TO_GUIDE,
    /// GUIDE → COUNTDOWN on first in-band tick
    C005_TRANSITION_TO_COUNTDOWN,
    /// COUNTDOWN → confirmed
    C005_TRANSITION_TO_CONFIRMED,
    /// Any phase → cancelled on operator quit
    C005_TRANSITION_TO_CANCELLED,
    /// Session already ended, tick ignored
    C005_TERMINAL,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::C001_FOCAL_ADJUSTED => "C001_FOCAL_ADJUSTED",
            Self::C001_FOCAL_REJECTED => "C001_FOCAL_REJECTED",
            Self::C002_PHASE_TUNE => "C002_PHASE_TUNE",
            Self::C002_PHASE_GUIDE => "C002_PHASE_GUIDE",
            Self::C002_NO_FACE => "C002_NO_FACE",
            Self::C003_HOLD_ACCUMULATING => "C003_HOLD_ACCUMULATING",
            Self::C003_HOLD_RESET => "C003_HOLD_RESET",
            Self::C005_TRANSITION_TO_GUIDE => "C005_TRANSITION_TO_GUIDE",
            Self::C005_TRANSITION_TO_COUNTDOWN => "C005_TRANSITION_TO_COUNTDOWN",
            Self::C005_TRANSITION_TO_CONFIRMED => "C005_TRANSITION_TO_CONFIRMED",
            Self::C005_TRANSITION_TO_CANCELLED => "C005_TRANSITION_TO_CANCELLED",
            Self::C005_TERMINAL => "C005_TERMINAL",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::C001_FOCAL_ADJUSTED => "Focal length adjusted",
            Self::C001_FOCAL_REJECTED => "Focal length must stay positive",
            Self::C002_PHASE_TUNE => "Tuning focal length",
            Self::C002_PHASE_GUIDE => "Guiding subject into range",
            Self::C002_NO_FACE => "No face in frame",
            Self::C003_HOLD_ACCUMULATING => "Holding correct distance",
            Self::C003_HOLD_RESET => "Hold broken, starting over",
            Self::C005_TRANSITION_TO_GUIDE => "Focal length locked",
            Self::C005_TRANSITION_TO_COUNTDOWN => "Entering COUNTDOWN",
            Self::C005_TRANSITION_TO_CONFIRMED => "Distance confirmed",
            Self::C005_TRANSITION_TO_CANCELLED => "Operator quit",
            Self::C005_TERMINAL => "Session already ended",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
