//! Configuration for calibration sessions and the network service
//!
//! Every tunable that shapes a session is passed explicitly into the
//! estimator and state machine constructors. Values load from a JSON file;
//! missing fields take the defaults declared in the crate root.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CalibrationError;
use crate::{
    AVERAGE_FACE_WIDTH_CM, CENTERING_MARGIN_PX, CM_PER_INCH, DEFAULT_ADDR, DEFAULT_FOCAL_LENGTH,
    DISTANCE_TOLERANCE_CM, FOCAL_LENGTH_STEP, HOLD_DURATION_MS, SMOOTHING_WEIGHT,
    VIEWING_DISTANCE_RATIO,
};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub calibration: CalibrationConfig,
    pub server: ServerConfig,
}

/// Parameters of one calibration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Real-world face width used by the pinhole model (cm)
    pub average_face_width_cm: f64,
    /// Focal length the Tune phase starts from
    pub initial_focal_length: f64,
    /// Focal length change per up/down command
    pub focal_length_step: f64,
    /// Weight of the newest raw width, in (0, 1]
    pub smoothing_weight: f64,
    /// Half-width of the "perfect" band (cm)
    pub tolerance_cm: f64,
    /// Continuous in-band hold required to confirm (ms)
    pub hold_duration_ms: u64,
    /// Viewing distance as a multiple of the screen diagonal
    pub viewing_distance_ratio: f64,
    /// Horizontal offset before a left/right hint (px)
    pub centering_margin_px: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            average_face_width_cm: AVERAGE_FACE_WIDTH_CM,
            initial_focal_length: DEFAULT_FOCAL_LENGTH,
            focal_length_step: FOCAL_LENGTH_STEP,
            smoothing_weight: SMOOTHING_WEIGHT,
            tolerance_cm: DISTANCE_TOLERANCE_CM,
            hold_duration_ms: HOLD_DURATION_MS,
            viewing_distance_ratio: VIEWING_DISTANCE_RATIO,
            centering_margin_px: CENTERING_MARGIN_PX,
        }
    }
}

impl CalibrationConfig {
    /// Ideal viewing distance (cm) for a screen diagonal given in inches
    pub fn ideal_distance_cm(&self, screen_size_inches: f64) -> f64 {
        screen_size_inches * CM_PER_INCH * self.viewing_distance_ratio
    }

    /// Reject values that would make the pinhole model or the hold meaningless
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let positive = [
            ("average_face_width_cm", self.average_face_width_cm),
            ("initial_focal_length", self.initial_focal_length),
            ("focal_length_step", self.focal_length_step),
            ("tolerance_cm", self.tolerance_cm),
            ("viewing_distance_ratio", self.viewing_distance_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CalibrationError::input(format!(
                    "config field {} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(self.smoothing_weight > 0.0 && self.smoothing_weight <= 1.0) {
            return Err(CalibrationError::input(format!(
                "config field smoothing_weight must be in (0, 1], got {}",
                self.smoothing_weight
            )));
        }
        if self.centering_margin_px < 0.0 {
            return Err(CalibrationError::input(
                "config field centering_margin_px must not be negative",
            ));
        }
        Ok(())
    }
}

/// Network listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = ?path.as_ref(), "loaded configuration");
                    config
                }
                Err(err) => {
                    tracing::warn!(
                        path = ?path.as_ref(),
                        %err,
                        "failed to parse configuration, using defaults"
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    path = ?path.as_ref(),
                    %err,
                    "failed to read configuration, using defaults"
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.calibration.average_face_width_cm, 14.0);
        assert_eq!(config.calibration.initial_focal_length, 800.0);
        assert_eq!(config.calibration.smoothing_weight, 0.7);
        assert_eq!(config.calibration.hold_duration_ms, 5000);
        assert_eq!(config.server.addr, "127.0.0.1:8765");
        assert!(config.calibration.validate().is_ok());
    }

    #[test]
    fn test_ideal_distance_for_24_inch() {
        let config = CalibrationConfig::default();
        assert!((config.ideal_distance_cm(24.0) - 152.4).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"calibration": {"tolerance_cm": 3.0}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.calibration.tolerance_cm, 3.0);
        assert_eq!(config.calibration.hold_duration_ms, 5000);
        assert_eq!(config.server.addr, "127.0.0.1:8765");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CalibrationConfig::default();
        config.smoothing_weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = CalibrationConfig::default();
        config.initial_focal_length = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = AppConfig::load_from_file("/nonexistent/distguide.json");
        assert_eq!(config.calibration, CalibrationConfig::default());
    }
}
