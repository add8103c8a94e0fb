//! Puzzle generation
//!
//! - `placement`: ranks entry/exit candidates
//! - `cache`: optional candidate cache handed to placement
//! - `layout`: carves a mirror route and scatters decoys
//! - `backup`: fixed per-difficulty puzzles for when generation gives up
//! - `generator`: the attempt loop, retry policy and daily set
//!
//! Unlike `sim`, this module uses a seeded RNG. The seed is the only source
//! of variation, so a date and difficulty always map to the same layout.

pub mod backup;
pub mod cache;
pub mod generator;
pub mod layout;
pub mod placement;

pub use cache::{CandidateCache, CandidateKey, MemoryCache, NoCache};
pub use generator::{
    AttemptFailure, FailureKind, GeneratedPuzzle, PuzzleGenerator, PuzzleSource, daily_seed,
    puzzle_id,
};
pub use layout::{Layout, LayoutRequest, Route, build_layout, carve_route};
pub use placement::{EntryExitPair, PlacementType, PointPlacementService};
