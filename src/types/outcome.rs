//! Terminal result of a session

use serde::{Deserialize, Serialize};

use crate::{TOKEN_ABANDONED, TOKEN_CONFIRMED};

/// How a session ended. Produced once, consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Subject held the correct distance for the full hold duration
    Confirmed,
    /// Operator quit, or the frame stream ended first
    Abandoned,
}

impl Outcome {
    /// Wire token sent to the waiting caller
    pub fn token(&self) -> &'static str {
        match self {
            Outcome::Confirmed => TOKEN_CONFIRMED,
            Outcome::Abandoned => TOKEN_ABANDONED,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Outcome::Confirmed => "CONFIRMED",
            Outcome::Abandoned => "ABANDONED",
        };
        write!(f, "{}", name)
    }
}
