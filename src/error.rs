//! Generation error taxonomy
//!
//! Every failure is reported through `GenError`; generators never panic on bad
//! input. Variants carry enough context (which check failed, expected vs.
//! actual) to log or surface to a human. There is no partial success: a
//! terrain is either fully valid or an error is returned instead.

use thiserror::Error;

use crate::geometry::Point;

#[derive(Debug, Error)]
pub enum GenError {
    // --- Invalid parameters: rejected immediately, never retried ---
    #[error("invalid dimensions {width}x{height}: both must be positive")]
    InvalidDimensions { width: usize, height: usize },

    #[error("level count {requested} outside supported range [{min}, {max}]")]
    LevelCountOutOfRange { requested: usize, min: usize, max: usize },

    #[error("custom parameter '{key}' is malformed: {reason}")]
    MalformedCustomParam { key: String, reason: String },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    // --- Generation failures: retryable with a different seed/params ---
    #[error("{algorithm} produced zero usable rooms")]
    NoRooms { algorithm: &'static str },

    #[error("{algorithm} produced no clearings")]
    NoClearings { algorithm: &'static str },

    #[error(
        "walkable coverage too low: {walkable} of {total} tiles ({actual_pct:.1}%), need {required_pct:.0}%"
    )]
    LowCoverage {
        walkable: usize,
        total: usize,
        actual_pct: f64,
        required_pct: f64,
    },

    #[error("generation failure: {0}")]
    GenerationFailure(String),

    // --- Connectivity violations: hard failures, never tolerated ---
    #[error(
        "walkable region is disconnected: flood fill from {start:?} reached {reached} of {walkable} walkable tiles"
    )]
    Disconnected {
        start: Point,
        reached: usize,
        walkable: usize,
    },

    #[error("stair at {point:?} on level {level} has no walkable orthogonal neighbor")]
    IsolatedStair { point: Point, level: usize },

    #[error("stair list entry {point:?} is out of bounds or not a stair tile (found {found})")]
    BadStairTile { point: Point, found: &'static str },

    #[error("level {level} is missing required stairs: {missing}")]
    MissingStairs { level: usize, missing: &'static str },

    #[error("connectivity violation: {0}")]
    ConnectivityViolation(String),
}

impl GenError {
    /// Whether retrying with a different seed could plausibly succeed.
    /// Parameter errors are permanent; the caller must fix its inputs.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            GenError::InvalidDimensions { .. }
                | GenError::LevelCountOutOfRange { .. }
                | GenError::MalformedCustomParam { .. }
                | GenError::InvalidParameters(_)
        )
    }
}
