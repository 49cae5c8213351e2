//! Guidance shown to the subject each tick

use serde::{Deserialize, Serialize};

use crate::types::Outcome;

/// Distance advice for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Guidance {
    /// Still tuning the focal length
    Tuning,
    NoFace,
    MoveFarther,
    MoveCloser,
    /// In band, hold still
    Perfect,
    /// Left the band during the hold
    Repositioning,
    /// In band, whole seconds left in the hold
    Countdown { remaining_secs: u64 },
    Confirmed,
    Cancelled,
}

impl Guidance {
    pub fn text(&self) -> String {
        match self {
            Guidance::Tuning => "Tune focal length, then lock".to_string(),
            Guidance::NoFace => "No face detected".to_string(),
            Guidance::MoveFarther => "Move farther".to_string(),
            Guidance::MoveCloser => "Move closer".to_string(),
            Guidance::Perfect => "Perfect distance! Hold still...".to_string(),
            Guidance::Repositioning => "You moved! Reposition...".to_string(),
            Guidance::Countdown { remaining_secs } => {
                format!("Perfect distance! Hold still... {}", remaining_secs)
            }
            Guidance::Confirmed => "Distance locked".to_string(),
            Guidance::Cancelled => "Calibration cancelled".to_string(),
        }
    }
}

impl From<Outcome> for Guidance {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Confirmed => Guidance::Confirmed,
            Outcome::Abandoned => Guidance::Cancelled,
        }
    }
}

/// Advisory left/right hint; never affects the in-band decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenteringHint {
    MoveLeft,
    MoveRight,
}

impl CenteringHint {
    /// Compare a face centre with the frame centre
    pub fn from_offset(face_center_x: f64, frame_width: f64, margin_px: f64) -> Option<Self> {
        let frame_center = frame_width / 2.0;
        if face_center_x < frame_center - margin_px {
            Some(CenteringHint::MoveRight)
        } else if face_center_x > frame_center + margin_px {
            Some(CenteringHint::MoveLeft)
        } else {
            None
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            CenteringHint::MoveLeft => "Move Left",
            CenteringHint::MoveRight => "Move Right",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centering_hint() {
        assert_eq!(CenteringHint::from_offset(320.0, 640.0, 60.0), None);
        assert_eq!(
            CenteringHint::from_offset(200.0, 640.0, 60.0),
            Some(CenteringHint::MoveRight)
        );
        assert_eq!(
            CenteringHint::from_offset(500.0, 640.0, 60.0),
            Some(CenteringHint::MoveLeft)
        );
        // Exactly on the margin stays centred
        assert_eq!(CenteringHint::from_offset(260.0, 640.0, 60.0), None);
    }

    #[test]
    fn test_countdown_text() {
        let g = Guidance::Countdown { remaining_secs: 3 };
        assert!(g.text().ends_with('3'));
    }
}
