//! Core types for distguide

mod command;
mod guidance;
mod observation;
mod outcome;
mod output;
mod phase;
mod reason;

pub use command::OperatorCommand;
pub use guidance::{CenteringHint, Guidance};
pub use observation::{BoundingBox, FaceObservation};
pub use outcome::Outcome;
pub use output::TickOutput;
pub use phase::CalibrationPhase;
pub use reason::ReasonCode;
