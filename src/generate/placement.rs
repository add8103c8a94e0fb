//! Entry/exit point placement
//!
//! Enumerates ordered pairs of boundary cells, drops pairs that sit too
//! close together, and ranks the rest. The result is a candidate list:
//! generation walks it best-first until one pair yields a valid puzzle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::cache::{CandidateCache, CandidateKey, NoCache};
use crate::sim::{GridPosition, SideRelation, best_side_relation, boundary_cells};
use crate::tuning::{Difficulty, SpacingConstraints, Tuning};

/// Scoring weights
const PROXIMITY_WEIGHT: f32 = 0.4;
const POSITION_WEIGHT: f32 = 0.4;
const DIAGONAL_WEIGHT: f32 = 0.1;
const SIDES_WEIGHT: f32 = 0.1;

/// Smallest minimum distance spacing expansion may relax to
const MIN_RELAXED_DISTANCE: u32 = 2;

/// How a candidate pair is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementType {
    Corner,
    Edge,
    Optimal,
}

/// A ranked entry/exit candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryExitPair {
    pub entry: GridPosition,
    pub exit: GridPosition,
    /// Manhattan distance between entry and exit
    pub distance: u32,
    pub validation_score: f32,
    pub placement_type: PlacementType,
}

/// Ranks entry/exit candidates for a difficulty
#[derive(Clone)]
pub struct PointPlacementService {
    tuning: Tuning,
    cache: Arc<dyn CandidateCache>,
}

impl PointPlacementService {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            cache: Arc::new(NoCache),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CandidateCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Ranked candidates, best first
    pub fn select_entry_exit_pairs(&self, difficulty: Difficulty, grid_size: u32) -> Vec<EntryExitPair> {
        self.select_expanded(difficulty, grid_size, 0)
    }

    /// Ranked candidates with the search space widened `expansion` times
    ///
    /// Each level lowers the minimum distance by one (never below 2) and
    /// doubles the candidate cap.
    pub fn select_expanded(
        &self,
        difficulty: Difficulty,
        grid_size: u32,
        expansion: u32,
    ) -> Vec<EntryExitPair> {
        let spacing = expanded(&self.tuning.config(difficulty).spacing, expansion);
        let key = CandidateKey::new(difficulty, grid_size, expansion, &spacing);
        self.cache
            .get_or_compute(key, &|| rank_candidates(&spacing, grid_size))
    }
}

fn expanded(spacing: &SpacingConstraints, expansion: u32) -> SpacingConstraints {
    let relaxed = spacing.min_distance.saturating_sub(expansion);
    SpacingConstraints {
        min_distance: relaxed.max(MIN_RELAXED_DISTANCE).min(spacing.min_distance),
        max_search_attempts: spacing
            .max_search_attempts
            .saturating_mul(1usize << expansion.min(16)),
        ..spacing.clone()
    }
}

/// Enumerate, filter, score and sort every ordered boundary pair
pub fn rank_candidates(spacing: &SpacingConstraints, grid_size: u32) -> Vec<EntryExitPair> {
    let boundary = boundary_cells(grid_size);
    let mut candidates: Vec<EntryExitPair> = boundary
        .iter()
        .flat_map(|entry| boundary.iter().map(move |exit| (*entry, *exit)))
        .filter(|(entry, exit)| entry != exit)
        .filter(|(entry, exit)| entry.manhattan(exit) >= spacing.min_distance)
        .map(|(entry, exit)| score_pair(entry, exit, spacing, grid_size))
        .collect();

    // Stable sort keeps enumeration order among equal scores
    candidates.sort_by(|a, b| b.validation_score.total_cmp(&a.validation_score));
    candidates.truncate(spacing.max_search_attempts);
    candidates
}

/// Score one pair
pub fn score_pair(
    entry: GridPosition,
    exit: GridPosition,
    spacing: &SpacingConstraints,
    grid_size: u32,
) -> EntryExitPair {
    let distance = entry.manhattan(&exit);
    let preferred = spacing.preferred_distance.max(1) as f32;

    let proximity = (1.0 - (distance as f32 - preferred).abs() / preferred).max(0.0);

    let cell_value = |p: &GridPosition| {
        if p.is_corner(grid_size) {
            spacing.corner_multiplier
        } else {
            spacing.edge_multiplier
        }
    };
    let position =
        ((cell_value(&entry) + cell_value(&exit)) / 2.0 / spacing.corner_multiplier).min(1.0);

    // Straight pairs have ratio 1, perfect diagonals 1/sqrt(2)
    let ratio = entry.euclidean(&exit) / distance.max(1) as f32;
    let diagonal = ((1.0 - ratio) / (1.0 - std::f32::consts::FRAC_1_SQRT_2)).clamp(0.0, 1.0);

    let sides = match best_side_relation(&entry, &exit, grid_size) {
        SideRelation::Opposite => 1.0,
        SideRelation::Adjacent => 0.5,
        SideRelation::Same => 0.0,
    };

    let validation_score = PROXIMITY_WEIGHT * proximity
        + POSITION_WEIGHT * position
        + DIAGONAL_WEIGHT * diagonal
        + SIDES_WEIGHT * sides;

    let placement_type = if entry.is_corner(grid_size) && exit.is_corner(grid_size) {
        PlacementType::Corner
    } else if distance.abs_diff(spacing.preferred_distance) <= 1 {
        PlacementType::Optimal
    } else {
        PlacementType::Edge
    };

    EntryExitPair {
        entry,
        exit,
        distance,
        validation_score,
        placement_type,
    }
}
