//! Deterministic beam simulation
//!
//! Everything that decides where a beam goes lives here. This module must be
//! pure and deterministic:
//! - No RNG (glass and water roll from a hash of their cell)
//! - No I/O or shared mutable state
//! - Bounded work per trace (iteration ceiling and intensity floor)

pub mod grid;
pub mod material;
pub mod trace;

pub use grid::{
    GridPosition, Side, SideRelation, best_side_relation, boundary_cells, entry_heading,
    max_diagonal_distance,
};
pub use material::{
    ForcedOutcome, Interaction, Material, MaterialKind, MaterialProperties, Outcome, PerturbBand,
    alternative_outcomes, cell_roll, interact,
};
pub use trace::{LaserPath, PathSegment, TerminationReason, Tracer, trace, trace_with_direction};
