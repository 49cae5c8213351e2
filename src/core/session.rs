//! Calibration Session: one end-to-end run on a dedicated worker thread
//!
//! `start` validates the screen size, opens the frame source, then moves the
//! devices onto a worker thread that samples until the machine reaches a
//! terminal state. The outcome crosses back through a one-shot channel; device
//! handles never leave the worker. A claimed `SessionSlot` travels with the
//! devices and is freed only once the worker has released them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::CalibrationConfig;
use crate::core::devices::Devices;
use crate::core::machine::CalibrationMachine;
use crate::error::{log_calibration_error, CalibrationError};
use crate::types::{BoundingBox, FaceObservation, Outcome, TickOutput};

/// Parse an inbound screen size message (inches)
pub fn parse_screen_size(text: &str) -> Result<f64, CalibrationError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| CalibrationError::input(format!("{:?} is not a number", text.trim())))?;
    validate_screen_size(value)
}

pub fn validate_screen_size(value: f64) -> Result<f64, CalibrationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CalibrationError::input(format!(
            "screen size must be a positive number of inches, got {}",
            value
        )));
    }
    Ok(value)
}

/// Exclusive claim on the process's capture devices, freed on drop
#[derive(Debug)]
pub struct SessionSlot {
    active: Arc<AtomicBool>,
}

impl SessionSlot {
    /// Claim the slot, or fail with `SessionBusy` if someone holds it
    pub fn try_claim(active: &Arc<AtomicBool>) -> Result<Self, CalibrationError> {
        active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| CalibrationError::SessionBusy)?;
        Ok(Self {
            active: Arc::clone(active),
        })
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Releases the frame source however the worker exits
struct DeviceGuard {
    devices: Devices,
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.devices.source.release();
        debug!("frame source released");
    }
}

/// A calibration request that has not started yet
pub struct CalibrationSession {
    config: CalibrationConfig,
    devices: Devices,
    ticks: Option<mpsc::UnboundedSender<TickOutput>>,
    slot: Option<SessionSlot>,
}

impl CalibrationSession {
    pub fn new(config: CalibrationConfig, devices: Devices) -> Self {
        Self {
            config,
            devices,
            ticks: None,
            slot: None,
        }
    }

    /// Stream every tick's output to an observer
    pub fn with_tick_observer(mut self, ticks: mpsc::UnboundedSender<TickOutput>) -> Self {
        self.ticks = Some(ticks);
        self
    }

    /// Hold `slot` until the worker has released the devices
    pub fn with_slot(mut self, slot: SessionSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Start sampling. Consumes the session; a new one is needed per request.
    ///
    /// Fails with `InputValidation` before any device is touched, or with
    /// `Acquisition` if the frame source cannot be opened, in which case the
    /// source is released before returning. Opening may block on a real
    /// device, so async callers should run this on a blocking thread.
    pub fn start(self, screen_size_inches: f64) -> Result<SessionHandle, CalibrationError> {
        let screen_size_inches = validate_screen_size(screen_size_inches)?;
        self.config.validate()?;

        let ideal_distance_cm = self.config.ideal_distance_cm(screen_size_inches);
        info!(screen_size_inches, ideal_distance_cm, "starting calibration session");

        let mut guard = DeviceGuard {
            devices: self.devices,
        };
        if let Err(err) = guard.devices.source.open() {
            log_calibration_error(&err, "session start");
            return Err(err);
        }

        let machine = CalibrationMachine::new(&self.config, ideal_distance_cm);
        let ticks = self.ticks;
        let slot = self.slot;
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let worker = thread::Builder::new()
            .name("distguide-session".to_string())
            .spawn(move || {
                let outcome = run_loop(guard, machine, ticks);
                // Devices are released by now; the next caller may claim them
                drop(slot);
                if outcome_tx.send(outcome).is_err() {
                    debug!(%outcome, "caller stopped waiting for outcome");
                }
            })
            .map_err(|e| CalibrationError::acquisition(format!("cannot spawn worker: {}", e)))?;

        Ok(SessionHandle {
            ideal_distance_cm,
            outcome: outcome_rx,
            worker: Some(worker),
        })
    }
}

/// Caller's side of a running session
#[derive(Debug)]
pub struct SessionHandle {
    ideal_distance_cm: f64,
    outcome: oneshot::Receiver<Outcome>,
    worker: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn ideal_distance_cm(&self) -> f64 {
        self.ideal_distance_cm
    }

    /// Wait for the terminal outcome
    pub async fn outcome(self) -> Result<Outcome, CalibrationError> {
        self.outcome.await.map_err(|_| CalibrationError::OutcomeLost)
    }

    /// Blocking wait; must not be called from inside an async runtime
    pub fn wait(mut self) -> Result<Outcome, CalibrationError> {
        let outcome = self
            .outcome
            .blocking_recv()
            .map_err(|_| CalibrationError::OutcomeLost);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("calibration worker panicked");
            }
        }
        outcome
    }
}

/// Sampling loop; returns once the machine is terminal or frames run out
fn run_loop(
    mut guard: DeviceGuard,
    mut machine: CalibrationMachine,
    ticks: Option<mpsc::UnboundedSender<TickOutput>>,
) -> Outcome {
    let outcome = loop {
        let frame = match guard.devices.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(ticks = machine.tick_count(), "frame stream ended");
                break Outcome::Abandoned;
            }
            Err(err) => {
                log_calibration_error(&err, "frame read");
                break Outcome::Abandoned;
            }
        };

        let command = guard.devices.input.poll();
        let mut detections = guard.devices.detector.detect(&frame);
        detections.retain(is_measurable);
        let observation = FaceObservation::from_detections(&detections);

        let output = match machine.update_at(
            frame.captured_at,
            command,
            &observation,
            frame.width as f64,
        ) {
            Ok(output) => output,
            Err(err) => {
                log_calibration_error(&err, "tick");
                continue;
            }
        };

        if let Some(ticks) = &ticks {
            // Observer going away does not stop the session
            let _ = ticks.send(output.clone());
        }

        if let Some(outcome) = output.outcome {
            break outcome;
        }
    };

    drop(guard);
    info!(%outcome, ticks = machine.tick_count(), "calibration session finished");
    outcome
}

fn is_measurable(face: &BoundingBox) -> bool {
    let ok = face.width.is_finite()
        && face.width > 0.0
        && face.height.is_finite()
        && face.height > 0.0;
    if !ok {
        warn!(?face, "dropping degenerate detection");
    }
    ok
}
