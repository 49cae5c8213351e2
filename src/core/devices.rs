//! Device capabilities consumed by a session, plus trace-driven replay devices
//!
//! A session owns one `Devices` bundle for its whole lifetime. Real capture
//! backends implement the three traits; the replay devices play back a JSON
//! trace with deterministic frame timestamps.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CalibrationError;
use crate::types::{BoundingBox, OperatorCommand};

/// One captured frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position in the stream, starting at 0
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// Capture time; the state machine's clock for this tick
    pub captured_at: Instant,
}

/// Camera-like stream of frames
pub trait FrameSource: Send {
    /// Acquire the underlying device
    fn open(&mut self) -> Result<(), CalibrationError>;

    /// Next frame, `Ok(None)` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>, CalibrationError>;

    /// Release the device. Must be safe to call more than once.
    fn release(&mut self);
}

/// Face bounding-box detector
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Vec<BoundingBox>;
}

/// Non-blocking operator key poll, called once per tick
pub trait OperatorInput: Send {
    fn poll(&mut self) -> OperatorCommand;
}

/// Everything one session needs, owned exclusively by that session
pub struct Devices {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn FaceDetector>,
    pub input: Box<dyn OperatorInput>,
}

/// Hands out a fresh `Devices` bundle per calibration request
pub trait DeviceProvider: Send + Sync {
    fn devices(&self) -> Devices;
}

// =============================================================================
// REPLAY TRACE
// =============================================================================

/// One recorded tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceFrame {
    #[serde(default)]
    pub faces: Vec<BoundingBox>,
    #[serde(default)]
    pub command: OperatorCommand,
}

/// Recorded detections and key presses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Simulate a camera that cannot be opened
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub frames: Vec<TraceFrame>,
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

fn default_frame_interval_ms() -> u64 {
    33
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            frame_interval_ms: default_frame_interval_ms(),
            unavailable: false,
            frames: Vec::new(),
        }
    }
}

impl Trace {
    pub fn new(frame_width: u32, frame_height: u32, frame_interval_ms: u64) -> Self {
        Self {
            frame_width,
            frame_height,
            frame_interval_ms,
            ..Self::default()
        }
    }

    /// A trace whose camera refuses to open
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Load a trace from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            CalibrationError::acquisition(format!("cannot read {:?}: {}", path.as_ref(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            CalibrationError::acquisition(format!("cannot parse {:?}: {}", path.as_ref(), e))
        })
    }

    /// Append one frame
    pub fn push(&mut self, faces: Vec<BoundingBox>, command: OperatorCommand) -> &mut Self {
        self.frames.push(TraceFrame { faces, command });
        self
    }

    /// Append `count` frames showing the same face with no key pressed
    pub fn repeat_face(&mut self, face: BoundingBox, count: usize) -> &mut Self {
        for _ in 0..count {
            self.push(vec![face], OperatorCommand::None);
        }
        self
    }

    /// Append `count` empty frames
    pub fn repeat_empty(&mut self, count: usize) -> &mut Self {
        for _ in 0..count {
            self.push(Vec::new(), OperatorCommand::None);
        }
        self
    }

    /// Centred square face of the given width
    pub fn centered_face(&self, width: f64) -> BoundingBox {
        BoundingBox::new(
            self.frame_width as f64 / 2.0 - width / 2.0,
            self.frame_height as f64 / 2.0 - width / 2.0,
            width,
            width,
        )
    }
}

// =============================================================================
// REPLAY DEVICES
// =============================================================================

/// Open/release/frame counters shared with whoever built the devices
#[derive(Debug, Default)]
pub struct DeviceStats {
    opened: AtomicUsize,
    released: AtomicUsize,
    frames: AtomicUsize,
}

impl DeviceStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }
}

/// Frame source that plays back a trace
pub struct ReplayCamera {
    trace: Arc<Trace>,
    stats: Arc<DeviceStats>,
    cursor: usize,
    started: Option<Instant>,
    released: bool,
}

impl ReplayCamera {
    pub fn new(trace: Arc<Trace>, stats: Arc<DeviceStats>) -> Self {
        Self {
            trace,
            stats,
            cursor: 0,
            started: None,
            released: false,
        }
    }
}

impl FrameSource for ReplayCamera {
    fn open(&mut self) -> Result<(), CalibrationError> {
        if self.trace.unavailable {
            return Err(CalibrationError::acquisition("replay camera is unavailable"));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        self.started = Some(Instant::now());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CalibrationError> {
        let started = self
            .started
            .ok_or_else(|| CalibrationError::acquisition("replay camera read before open"))?;
        if self.cursor >= self.trace.frames.len() {
            return Ok(None);
        }

        let index = self.cursor as u64;
        self.cursor += 1;
        self.stats.frames.fetch_add(1, Ordering::SeqCst);

        Ok(Some(Frame {
            index,
            width: self.trace.frame_width,
            height: self.trace.frame_height,
            captured_at: started + Duration::from_millis(index * self.trace.frame_interval_ms),
        }))
    }

    fn release(&mut self) {
        self.started = None;
        if !self.released {
            self.released = true;
            self.stats.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Detector returning the faces recorded for each frame index
pub struct ReplayDetector {
    trace: Arc<Trace>,
}

impl FaceDetector for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Vec<BoundingBox> {
        self.trace
            .frames
            .get(frame.index as usize)
            .map(|f| f.faces.clone())
            .unwrap_or_default()
    }
}

/// Operator input returning the recorded command for each tick
pub struct ReplayInput {
    trace: Arc<Trace>,
    cursor: usize,
}

impl OperatorInput for ReplayInput {
    fn poll(&mut self) -> OperatorCommand {
        let command = self
            .trace
            .frames
            .get(self.cursor)
            .map(|f| f.command)
            .unwrap_or_default();
        self.cursor += 1;
        command
    }
}

/// Provider that replays the same trace for every request
#[derive(Clone)]
pub struct ReplayProvider {
    trace: Arc<Trace>,
    stats: Arc<DeviceStats>,
}

impl ReplayProvider {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace: Arc::new(trace),
            stats: Arc::new(DeviceStats::default()),
        }
    }

    /// Counters accumulated across every session this provider served
    pub fn stats(&self) -> Arc<DeviceStats> {
        Arc::clone(&self.stats)
    }
}

impl DeviceProvider for ReplayProvider {
    fn devices(&self) -> Devices {
        Devices {
            source: Box::new(ReplayCamera::new(
                Arc::clone(&self.trace),
                Arc::clone(&self.stats),
            )),
            detector: Box::new(ReplayDetector {
                trace: Arc::clone(&self.trace),
            }),
            input: Box::new(ReplayInput {
                trace: Arc::clone(&self.trace),
                cursor: 0,
            }),
        }
    }
}
