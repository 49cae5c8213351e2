//! Error types for calibration sessions
//!
//! Per-tick detector misses and out-of-band distances are not errors; they are
//! absorbed by the state machine as guidance. Only failures that end a request
//! or a session live here.

use std::fmt;
use tracing::error;

/// Error codes for structured error reporting
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Calibration error code constants
///
/// Error code range: 3001-3005
pub struct CalibrationErrorCodes;

impl CalibrationErrorCodes {
    /// Camera / frame source could not be opened
    pub const ACQUISITION: i32 = 3001;

    /// Screen size or configuration value rejected
    pub const INPUT_VALIDATION: i32 = 3002;

    /// Non-positive face width handed to the estimator
    pub const INVALID_MEASUREMENT: i32 = 3003;

    /// Another session already owns the camera
    pub const SESSION_BUSY: i32 = 3004;

    /// Worker ended without delivering an outcome
    pub const OUTCOME_LOST: i32 = 3005;
}

/// Log a calibration error with structured context
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        error_code = err.code(),
        context,
        "calibration error: {}",
        err.message()
    );
}

/// Calibration-related errors
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Frame source could not be opened or failed before the first tick
    Acquisition { reason: String },

    /// Inbound screen size or session configuration rejected
    InputValidation { reason: String },

    /// Raw face width was zero, negative or not finite
    InvalidMeasurement { value: f64 },

    /// A session is already running in this process
    SessionBusy,

    /// The one-shot channel closed before an outcome arrived
    OutcomeLost,
}

impl CalibrationError {
    pub fn acquisition(reason: impl Into<String>) -> Self {
        Self::Acquisition {
            reason: reason.into(),
        }
    }

    pub fn input(reason: impl Into<String>) -> Self {
        Self::InputValidation {
            reason: reason.into(),
        }
    }
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::Acquisition { .. } => CalibrationErrorCodes::ACQUISITION,
            CalibrationError::InputValidation { .. } => CalibrationErrorCodes::INPUT_VALIDATION,
            CalibrationError::InvalidMeasurement { .. } => {
                CalibrationErrorCodes::INVALID_MEASUREMENT
            }
            CalibrationError::SessionBusy => CalibrationErrorCodes::SESSION_BUSY,
            CalibrationError::OutcomeLost => CalibrationErrorCodes::OUTCOME_LOST,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::Acquisition { reason } => {
                format!("Cannot open frame source: {}", reason)
            }
            CalibrationError::InputValidation { reason } => {
                format!("Invalid input: {}", reason)
            }
            CalibrationError::InvalidMeasurement { value } => {
                format!("Face width must be positive, got {}", value)
            }
            CalibrationError::SessionBusy => "A calibration session is already running".to_string(),
            CalibrationError::OutcomeLost => {
                "Calibration worker stopped without an outcome".to_string()
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}

impl std::error::Error for CalibrationError {}
