//! Core modules for distguide

pub mod api;
pub mod devices;
pub mod estimator;
pub mod machine;
pub mod session;

pub use api::{create_router, run_server, AppState};
pub use devices::{
    DeviceProvider, DeviceStats, Devices, FaceDetector, Frame, FrameSource, OperatorInput,
    ReplayProvider, Trace, TraceFrame,
};
pub use estimator::{DistanceEstimate, DistanceEstimator};
pub use machine::CalibrationMachine;
pub use session::{
    parse_screen_size, validate_screen_size, CalibrationSession, SessionHandle, SessionSlot,
};
