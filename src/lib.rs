//! distguide: viewing-distance calibration engine
//!
//! Camera frames → face detection → DistanceEstimator → CalibrationMachine,
//! driven by a CalibrationSession worker that reports one Outcome.

pub mod config;
pub mod core;
pub mod error;
pub mod types;

// =============================================================================
// ESTIMATION DEFAULTS
// =============================================================================

/// Average adult face width (centimeters), anthropometric constant
pub const AVERAGE_FACE_WIDTH_CM: f64 = 14.0;

/// Starting focal length before the operator tunes it
pub const DEFAULT_FOCAL_LENGTH: f64 = 800.0;

/// Focal length change per operator up/down command
pub const FOCAL_LENGTH_STEP: f64 = 10.0;

/// Weight of the newest raw width in the exponential filter
pub const SMOOTHING_WEIGHT: f64 = 0.7;

// =============================================================================
// GUIDANCE DEFAULTS
// =============================================================================

/// Half-width of the acceptable band around the ideal distance (centimeters)
pub const DISTANCE_TOLERANCE_CM: f64 = 5.0;

/// Continuous in-band time required before confirmation (milliseconds)
pub const HOLD_DURATION_MS: u64 = 5000;

/// Face centre offset from frame centre before a left/right hint (pixels)
pub const CENTERING_MARGIN_PX: f64 = 60.0;

// =============================================================================
// SCREEN → DISTANCE
// =============================================================================

pub const CM_PER_INCH: f64 = 2.54;

/// Recommended viewing distance as a multiple of the screen diagonal
pub const VIEWING_DISTANCE_RATIO: f64 = 2.5;

// =============================================================================
// PROTOCOL
// =============================================================================

/// Sent to the caller when the hold completes
pub const TOKEN_CONFIRMED: &str = "CALIBRATION_OK";

/// Sent to the caller when the operator quits or the stream ends
pub const TOKEN_ABANDONED: &str = "CALIBRATION_ABANDONED";

pub const DEFAULT_ADDR: &str = "127.0.0.1:8765";

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
