//! Error taxonomy
//!
//! Structural problems surface through validation reports, not through these
//! types. The enums here cover programmer errors (unknown materials), bad
//! caller input (hint quadrants, tuning files) and the single unrecoverable
//! generation failure: a backup template that does not validate.

use thiserror::Error;

use crate::tuning::Difficulty;

/// Errors raised by the material physics model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhysicsError {
    /// Material type name is not one of mirror, water, glass, metal, absorber
    #[error("unknown material type: {0}")]
    UnknownMaterial(String),
}

/// Errors raised when slicing hints out of a puzzle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintError {
    #[error("quadrant must be 0-3, got {0}")]
    InvalidQuadrant(u8),
}

/// Errors raised while loading tuning overrides
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning for {difficulty}: {reason}")]
    Invalid {
        difficulty: Difficulty,
        reason: String,
    },
}

/// Errors that escape the generation pipeline
///
/// Every recoverable failure (timeouts, spacing, placement, physics) is
/// handled inside the retry loop and ends in the backup template. Only a
/// broken template or an unusable tuning table reaches the caller.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Tuning(#[from] TuningError),
    #[error("backup puzzle for {difficulty} failed validation: {}", errors.join("; "))]
    BackupInvalid {
        difficulty: Difficulty,
        errors: Vec<String>,
    },
}
