//! Calibration Machine: three-phase guidance with a continuous-hold requirement
//!
//! Phase transitions:
//! - TUNE → GUIDE: operator lock
//! - GUIDE → COUNTDOWN: distance inside ideal ± tolerance
//! - COUNTDOWN → GUIDE: distance leaves the band (hold discarded)
//! - COUNTDOWN → confirmed: in band for the full hold duration
//! - any → cancelled: operator quit
//!
//! The machine owns the session's DistanceEstimator so that focal-length
//! tuning can only happen while the machine is in TUNE.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::CalibrationConfig;
use crate::core::estimator::DistanceEstimator;
use crate::error::CalibrationError;
use crate::types::{
    CalibrationPhase, CenteringHint, FaceObservation, Guidance, OperatorCommand, Outcome,
    ReasonCode, TickOutput,
};

/// Where the subject stands relative to the band this tick
#[derive(Debug, Clone, Copy, PartialEq)]
enum BandCheck {
    NoFace,
    TooClose,
    TooFar,
    InBand,
}

impl BandCheck {
    fn is_perfect(self) -> bool {
        self == BandCheck::InBand
    }

    fn guidance(self) -> Guidance {
        match self {
            BandCheck::NoFace => Guidance::NoFace,
            BandCheck::TooClose => Guidance::MoveFarther,
            BandCheck::TooFar => Guidance::MoveCloser,
            BandCheck::InBand => Guidance::Perfect,
        }
    }
}

/// Calibration state machine for one session
#[derive(Debug)]
pub struct CalibrationMachine {
    estimator: DistanceEstimator,
    /// Target distance (cm), fixed for the session
    ideal_distance_cm: f64,
    tolerance_cm: f64,
    hold: Duration,
    focal_step: f64,
    centering_margin_px: f64,
    /// Current phase
    phase: CalibrationPhase,
    /// When the current hold began, only set in COUNTDOWN
    countdown_start: Option<Instant>,
    /// Set once, on the tick that ends the session
    outcome: Option<Outcome>,
    /// Number of updates
    tick_count: u64,
}

impl CalibrationMachine {
    /// Create machine targeting `ideal_distance_cm`
    pub fn new(config: &CalibrationConfig, ideal_distance_cm: f64) -> Self {
        Self {
            estimator: DistanceEstimator::new(config),
            ideal_distance_cm,
            tolerance_cm: config.tolerance_cm,
            hold: Duration::from_millis(config.hold_duration_ms),
            focal_step: config.focal_length_step,
            centering_margin_px: config.centering_margin_px,
            phase: CalibrationPhase::Tune,
            countdown_start: None,
            outcome: None,
            tick_count: 0,
        }
    }

    /// Update using the wall clock
    pub fn update(
        &mut self,
        command: OperatorCommand,
        observation: &FaceObservation,
        frame_width: f64,
    ) -> Result<TickOutput, CalibrationError> {
        self.update_at(Instant::now(), command, observation, frame_width)
    }

    /// Run one tick at time `now`
    ///
    /// Quit is honoured before anything else and the quitting frame is not
    /// measured. Otherwise the observation is folded into the estimator with
    /// the focal length as it stood at the start of the tick, then the
    /// command and the band check drive the phase.
    pub fn update_at(
        &mut self,
        now: Instant,
        command: OperatorCommand,
        observation: &FaceObservation,
        frame_width: f64,
    ) -> Result<TickOutput, CalibrationError> {
        if let Some(outcome) = self.outcome {
            let guidance = Guidance::from(outcome);
            return Ok(self.output(None, None, guidance, false, 0, ReasonCode::C005_TERMINAL));
        }

        self.tick_count += 1;

        if command == OperatorCommand::Quit {
            info!(phase = %self.phase, tick = self.tick_count, "operator quit");
            self.outcome = Some(Outcome::Abandoned);
            self.countdown_start = None;
            return Ok(self.output(
                None,
                None,
                Guidance::Cancelled,
                false,
                0,
                ReasonCode::C005_TRANSITION_TO_CANCELLED,
            ));
        }

        let estimate = match observation.face() {
            Some(face) => Some(self.estimator.observe(face.width)?),
            None => None,
        };
        let distance_cm = estimate.map(|e| e.distance_cm);
        let centering = observation.face().and_then(|face| {
            CenteringHint::from_offset(face.center_x(), frame_width, self.centering_margin_px)
        });
        let band = self.check_band(distance_cm);

        debug!(
            tick = self.tick_count,
            phase = %self.phase,
            distance_cm = ?distance_cm,
            ?band,
            "tick"
        );

        let (guidance, hold_ms, reason) = match self.phase {
            CalibrationPhase::Tune => self.tune(command),
            CalibrationPhase::Guide => self.guide(now, band),
            CalibrationPhase::Countdown => self.countdown(now, band),
        };

        Ok(self.output(distance_cm, centering, guidance, band.is_perfect(), hold_ms, reason))
    }

    fn check_band(&self, distance_cm: Option<f64>) -> BandCheck {
        match distance_cm {
            None => BandCheck::NoFace,
            Some(d) if d < self.ideal_distance_cm - self.tolerance_cm => BandCheck::TooClose,
            Some(d) if d > self.ideal_distance_cm + self.tolerance_cm => BandCheck::TooFar,
            Some(_) => BandCheck::InBand,
        }
    }

    fn tune(&mut self, command: OperatorCommand) -> (Guidance, u64, ReasonCode) {
        let reason = match command {
            OperatorCommand::Lock => {
                self.phase = CalibrationPhase::Guide;
                info!(
                    focal_length = self.estimator.focal_length(),
                    ideal_distance_cm = self.ideal_distance_cm,
                    "focal length locked"
                );
                return (Guidance::Tuning, 0, ReasonCode::C005_TRANSITION_TO_GUIDE);
            }
            OperatorCommand::IncreaseFocalLength => self.adjust_focal(self.focal_step),
            OperatorCommand::DecreaseFocalLength => self.adjust_focal(-self.focal_step),
            OperatorCommand::None | OperatorCommand::Quit => ReasonCode::C002_PHASE_TUNE,
        };
        (Guidance::Tuning, 0, reason)
    }

    fn adjust_focal(&mut self, delta: f64) -> ReasonCode {
        let next = self.estimator.focal_length() + delta;
        if next <= 0.0 {
            warn!(
                focal_length = self.estimator.focal_length(),
                delta, "refusing focal length adjustment"
            );
            return ReasonCode::C001_FOCAL_REJECTED;
        }
        self.estimator.adjust_focal_length(delta);
        debug!(focal_length = next, "focal length adjusted");
        ReasonCode::C001_FOCAL_ADJUSTED
    }

    fn guide(&mut self, now: Instant, band: BandCheck) -> (Guidance, u64, ReasonCode) {
        match band {
            BandCheck::InBand => {
                self.phase = CalibrationPhase::Countdown;
                self.countdown_start = Some(now);
                info!(tick = self.tick_count, "in range, hold started");
                (Guidance::Perfect, 0, ReasonCode::C005_TRANSITION_TO_COUNTDOWN)
            }
            BandCheck::NoFace => (Guidance::NoFace, 0, ReasonCode::C002_NO_FACE),
            _ => (band.guidance(), 0, ReasonCode::C002_PHASE_GUIDE),
        }
    }

    fn countdown(&mut self, now: Instant, band: BandCheck) -> (Guidance, u64, ReasonCode) {
        let start = match (band.is_perfect(), self.countdown_start) {
            (true, Some(start)) => start,
            _ => {
                // Hold must be continuous; any miss starts over from GUIDE
                self.phase = CalibrationPhase::Guide;
                self.countdown_start = None;
                info!(tick = self.tick_count, ?band, "hold broken");
                return (Guidance::Repositioning, 0, ReasonCode::C003_HOLD_RESET);
            }
        };

        let elapsed = now.saturating_duration_since(start);
        let hold_ms = elapsed.as_millis() as u64;

        if elapsed >= self.hold {
            self.outcome = Some(Outcome::Confirmed);
            info!(tick = self.tick_count, hold_ms, "distance confirmed");
            return (Guidance::Confirmed, hold_ms, ReasonCode::C005_TRANSITION_TO_CONFIRMED);
        }

        let remaining_ms = (self.hold - elapsed).as_millis() as u64;
        let remaining_secs = remaining_ms.div_ceil(1000);
        (
            Guidance::Countdown { remaining_secs },
            hold_ms,
            ReasonCode::C003_HOLD_ACCUMULATING,
        )
    }

    fn output(
        &self,
        distance_cm: Option<f64>,
        centering: Option<CenteringHint>,
        guidance: Guidance,
        is_perfect: bool,
        hold_ms: u64,
        reason: ReasonCode,
    ) -> TickOutput {
        TickOutput {
            timestamp: chrono::Utc::now(),
            tick: self.tick_count,
            phase: self.phase,
            distance_cm,
            focal_length: self.estimator.focal_length(),
            guidance,
            centering,
            is_perfect,
            hold_ms,
            reason,
            outcome: self.outcome,
        }
    }

    /// Get current phase
    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Terminal outcome, once reached
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn countdown_start(&self) -> Option<Instant> {
        self.countdown_start
    }

    pub fn ideal_distance_cm(&self) -> f64 {
        self.ideal_distance_cm
    }

    pub fn estimator(&self) -> &DistanceEstimator {
        &self.estimator
    }

    /// Get update count
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

// =============================================================================
// TESTS
// =============================================================================
