//! Distance Estimator: pinhole model over an exponentially smoothed face width
//!
//! distance_cm = (face_width_cm * focal_length) / smoothed_width_px
//!
//! The first observation seeds the filter; every later one blends in as
//! `w * raw + (1 - w) * previous`.

use crate::config::CalibrationConfig;
use crate::error::CalibrationError;

/// One tick's estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEstimate {
    /// Distance from the camera (centimeters)
    pub distance_cm: f64,
    /// Smoothed face width the estimate was computed from (pixels)
    pub smoothed_width: f64,
}

/// Converts face widths into distances for a single session
#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    face_width_cm: f64,
    focal_length: f64,
    weight: f64,
    smoothed: Option<f64>,
}

impl DistanceEstimator {
    /// Create estimator from session configuration
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            face_width_cm: config.average_face_width_cm,
            focal_length: config.initial_focal_length,
            weight: config.smoothing_weight,
            smoothed: None,
        }
    }

    /// Fold one raw width into the filter and estimate distance
    pub fn observe(&mut self, raw_width: f64) -> Result<DistanceEstimate, CalibrationError> {
        if !(raw_width.is_finite() && raw_width > 0.0) {
            return Err(CalibrationError::InvalidMeasurement { value: raw_width });
        }

        let smoothed = match self.smoothed {
            None => raw_width,
            Some(prev) => self.weight * raw_width + (1.0 - self.weight) * prev,
        };
        self.smoothed = Some(smoothed);

        Ok(DistanceEstimate {
            distance_cm: self.distance_for(smoothed),
            smoothed_width: smoothed,
        })
    }

    /// Pinhole distance for a given width at the current focal length
    pub fn distance_for(&self, width_px: f64) -> f64 {
        (self.face_width_cm * self.focal_length) / width_px
    }

    /// Shift the focal length. No lower bound is enforced here.
    pub fn adjust_focal_length(&mut self, delta: f64) {
        self.focal_length += delta;
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn smoothed_width(&self) -> Option<f64> {
        self.smoothed
    }

}

// =============================================================================
// TESTS
// =============================================================================
