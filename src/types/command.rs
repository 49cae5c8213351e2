//! Operator key commands polled once per tick

use serde::{Deserialize, Serialize};

/// What the operator asked for on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorCommand {
    #[default]
    None,
    /// End the session now
    Quit,
    /// Freeze the focal length and start guiding
    Lock,
    IncreaseFocalLength,
    DecreaseFocalLength,
}
