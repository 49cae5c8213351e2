//! Per-tick output for terminal display and observers

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{CalibrationPhase, CenteringHint, Guidance, Outcome, ReasonCode};

/// Everything decided on one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickOutput {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Tick number within the session, starting at 1
    pub tick: u64,
    /// Phase after this tick
    pub phase: CalibrationPhase,
    /// Smoothed distance estimate, absent when no face was seen
    pub distance_cm: Option<f64>,
    /// Focal length after this tick
    pub focal_length: f64,
    pub guidance: Guidance,
    pub centering: Option<CenteringHint>,
    /// Subject inside the tolerance band this tick
    pub is_perfect: bool,
    /// Continuous in-band time so far (milliseconds)
    pub hold_ms: u64,
    pub reason: ReasonCode,
    /// Set on the tick that ended the session
    pub outcome: Option<Outcome>,
}

impl TickOutput {
    fn distance_label(&self) -> String {
        match self.distance_cm {
            Some(d) => format!("{:.0}cm", d),
            None => "--".to_string(),
        }
    }

    fn guidance_label(&self) -> String {
        match self.centering {
            Some(hint) => format!("{} | {}", self.guidance.text(), hint.text()),
            None => self.guidance.text(),
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let line = format!(
            "{} d={} | f={:.0} | phase={} | hold={:.1}s | {} | {}",
            self.phase.emoji(),
            self.distance_label(),
            self.focal_length,
            self.phase,
            self.hold_ms as f64 / 1000.0,
            self.guidance_label(),
            self.reason.code()
        );
        match self.outcome {
            Some(Outcome::Confirmed) => line.green().bold().to_string(),
            Some(Outcome::Abandoned) => line.red().to_string(),
            None => line.color(self.phase.color()).to_string(),
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        let mut line = format!(
            "tick={} | d={} | f={:.0} | phase={} | hold={:.1}s | guidance={} | reason={}",
            self.tick,
            self.distance_label(),
            self.focal_length,
            self.phase,
            self.hold_ms as f64 / 1000.0,
            self.guidance_label(),
            self.reason.code()
        );
        if let Some(outcome) = self.outcome {
            line.push_str(&format!(" | outcome={}", outcome));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TickOutput {
        TickOutput {
            timestamp: Utc::now(),
            tick: 7,
            phase: CalibrationPhase::Countdown,
            distance_cm: Some(151.6),
            focal_length: 810.0,
            guidance: Guidance::Countdown { remaining_secs: 2 },
            centering: Some(CenteringHint::MoveLeft),
            is_perfect: true,
            hold_ms: 3100,
            reason: ReasonCode::C003_HOLD_ACCUMULATING,
            outcome: None,
        }
    }

    #[test]
    fn test_parseable_string() {
        let line = sample().to_parseable_string();
        assert!(line.starts_with("tick=7 | d=152cm | f=810 | phase=COUNTDOWN | hold=3.1s"));
        assert!(line.contains("Hold still... 2 | Move Left"));
        assert!(line.ends_with("reason=C003_HOLD_ACCUMULATING"));
    }

    #[test]
    fn test_missing_distance_and_outcome() {
        let mut out = sample();
        out.distance_cm = None;
        out.outcome = Some(Outcome::Abandoned);
        let line = out.to_parseable_string();
        assert!(line.contains("d=--"));
        assert!(line.ends_with("outcome=ABANDONED"));
    }
}
