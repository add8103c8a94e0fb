//! Laser Grid - daily laser-reflection puzzles
//!
//! Core modules:
//! - `sim`: Deterministic beam simulation (grid geometry, material physics, tracing)
//! - `generate`: Entry/exit placement, material layout, the generation pipeline
//! - `validate`: Structural, physical and uniqueness checks before a puzzle ships
//! - `puzzle`: The finished puzzle artifact, answer checking and hints
//! - `tuning`: Data-driven per-difficulty configuration

pub mod error;
pub mod generate;
pub mod puzzle;
pub mod sim;
pub mod tuning;
pub mod validate;

pub use error::{GenerationError, HintError, PhysicsError, TuningError};
pub use generate::{GeneratedPuzzle, PointPlacementService, PuzzleGenerator, PuzzleSource};
pub use puzzle::{AnswerCheck, Hint, Puzzle, Quadrant};
pub use sim::{GridPosition, LaserPath, Material, MaterialKind, trace};
pub use tuning::{Difficulty, Tuning};
pub use validate::{PuzzleValidator, ValidationReport};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Hard iteration ceiling for a single trace
    pub const MAX_BOUNCES: u32 = 1000;
    /// Beam is considered extinguished below this intensity
    pub const MIN_INTENSITY: f32 = 0.01;

    /// Maximum water perturbation (degrees) before scaling by diffusion
    pub const WATER_MAX_PERTURBATION: f32 = 30.0;
    /// Fixed surface normal of water (degrees, horizontal)
    pub const WATER_NORMAL: f32 = 0.0;
    /// Fixed surface normal of glass (degrees, vertical)
    pub const GLASS_NORMAL: f32 = 90.0;

    /// Allowed deviation from the target material density, as a share of the target
    pub const DENSITY_TOLERANCE: f32 = 0.10;
    /// Number of hint levels every puzzle carries
    pub const HINT_LEVELS: usize = 4;
    /// Path reveal per hint level (percent)
    pub const HINT_REVEAL_PERCENT: [u8; HINT_LEVELS] = [25, 50, 75, 100];

    /// Upper bound on alternative traces explored by the uniqueness check
    pub const MAX_UNIQUENESS_TRACES: usize = 128;

    /// Knuth multiplicative hash constant (golden ratio)
    pub const GOLDEN_HASH: u32 = 2_654_435_761;
}

/// Normalized angle to [0, 360) degrees
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Unit direction vector for a heading in degrees (x = column, y = row)
///
/// Components within float noise of zero are flushed so cardinal headings
/// stay exactly on their row or column.
#[inline]
pub fn direction_vector(degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    let flush = |v: f32| if v.abs() < 1e-5 { 0.0 } else { v };
    Vec2::new(flush(radians.cos()), flush(radians.sin()))
}

/// Reflect a heading off a surface with the given normal (both in degrees)
///
/// Degree form of `v' = v - 2(v·n)n`.
#[inline]
pub fn reflect_degrees(incident: f32, normal: f32) -> f32 {
    normalize_degrees(2.0 * normal + 180.0 - incident)
}
