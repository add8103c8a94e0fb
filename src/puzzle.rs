//! The finished puzzle artifact
//!
//! A `Puzzle` is built once by the generation pipeline and never mutated
//! afterwards. Consumers replay it, slice hints out of it and check answers
//! against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::HintError;
use crate::sim::{GridPosition, LaserPath, Material, PathSegment, max_diagonal_distance};
use crate::tuning::Difficulty;

/// One rung of the hint ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    /// 1-based level
    pub level: u8,
    /// Share of the solution path revealed (percent)
    pub reveal_percent: u8,
    pub segments: Vec<PathSegment>,
}

/// A validated daily puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    pub id: String,
    pub difficulty: Difficulty,
    pub grid_size: u32,
    pub materials: Vec<Material>,
    pub entry: GridPosition,
    pub solution: GridPosition,
    pub solution_path: LaserPath,
    pub hints: Vec<Hint>,
    pub material_density: f32,
    pub created_at: DateTime<Utc>,
}

/// One quarter of the grid, split at the midpoint row and column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TryFrom<u8> for Quadrant {
    type Error = HintError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quadrant::TopLeft),
            1 => Ok(Quadrant::TopRight),
            2 => Ok(Quadrant::BottomLeft),
            3 => Ok(Quadrant::BottomRight),
            other => Err(HintError::InvalidQuadrant(other)),
        }
    }
}

impl Quadrant {
    pub fn contains(&self, cell: &GridPosition, grid_size: u32) -> bool {
        let mid = (grid_size / 2) as i32;
        let top = cell.row < mid;
        let left = cell.col < mid;
        match self {
            Quadrant::TopLeft => top && left,
            Quadrant::TopRight => top && !left,
            Quadrant::BottomLeft => !top && left,
            Quadrant::BottomRight => !top && !left,
        }
    }
}

/// Result of checking a player's answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCheck {
    pub is_correct: bool,
    pub correct_exit: GridPosition,
    /// 0-100, falls off linearly with distance from the correct exit
    pub accuracy: u8,
}

/// Material share of the grid
pub fn material_density(material_count: usize, grid_size: u32) -> f32 {
    let cells = (grid_size as f32).powi(2).max(1.0);
    material_count as f32 / cells
}

/// Hint ladder revealing growing prefixes of the solution path
pub fn build_hints(path: &LaserPath) -> Vec<Hint> {
    let total = path.segments.len();
    HINT_REVEAL_PERCENT
        .iter()
        .enumerate()
        .map(|(i, &percent)| {
            let count = (total * percent as usize).div_ceil(100);
            Hint {
                level: i as u8 + 1,
                reveal_percent: percent,
                segments: path.segments[..count].to_vec(),
            }
        })
        .collect()
}

impl Puzzle {
    /// Trace a layout and wrap it as a puzzle
    ///
    /// Returns `None` when the beam never leaves the grid.
    pub fn from_layout(
        id: String,
        difficulty: Difficulty,
        grid_size: u32,
        materials: Vec<Material>,
        entry: GridPosition,
        created_at: DateTime<Utc>,
    ) -> Option<Puzzle> {
        let path = crate::sim::trace(&materials, entry, grid_size);
        let solution = path.exit?;
        Some(Puzzle {
            id,
            difficulty,
            grid_size,
            material_density: material_density(materials.len(), grid_size),
            materials,
            entry,
            solution,
            hints: build_hints(&path),
            solution_path: path,
            created_at,
        })
    }

    /// Compare a player's chosen boundary cell with the solution
    pub fn validate_answer(&self, player: GridPosition) -> AnswerCheck {
        let max_distance = max_diagonal_distance(self.grid_size);
        let ratio = if max_distance > 0.0 {
            player.euclidean(&self.solution) / max_distance
        } else {
            0.0
        };
        let accuracy = (100.0 * (1.0 - ratio).max(0.0)).round() as u8;

        AnswerCheck {
            is_correct: player == self.solution,
            correct_exit: self.solution,
            accuracy,
        }
    }

    /// Part of the solution path touching one quadrant
    ///
    /// The exit is withheld: the returned path has no exit and every hop
    /// that starts or ends on the exit cell is dropped.
    pub fn hint_path(&self, quadrant: u8) -> Result<LaserPath, HintError> {
        let quadrant = Quadrant::try_from(quadrant)?;
        let n = self.grid_size;
        let exit = self.solution_path.exit;

        let segments: Vec<PathSegment> = self
            .solution_path
            .segments
            .iter()
            .filter(|s| Some(s.start) != exit && Some(s.end) != exit)
            .filter(|s| quadrant.contains(&s.start, n) || quadrant.contains(&s.end, n))
            .cloned()
            .collect();

        let bounces = segments
            .iter()
            .filter(|s| s.outcome == Some(crate::sim::Outcome::Reflected))
            .count() as u32;

        Ok(LaserPath {
            segments,
            exit: None,
            terminated: false,
            termination_reason: None,
            bounces,
            intensity: self.solution_path.intensity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::trace;

    fn at(row: i32, col: i32) -> GridPosition {
        GridPosition::new(row, col)
    }

    fn sample_puzzle() -> Puzzle {
        let materials = vec![
            Material::mirror(at(3, 1), 45.0),
            Material::mirror(at(3, 4), 45.0),
        ];
        let entry = at(0, 1);
        let path = trace(&materials, entry, 6);
        Puzzle {
            id: "2026-10-19-easy".into(),
            difficulty: Difficulty::Easy,
            grid_size: 6,
            material_density: material_density(materials.len(), 6),
            materials,
            entry,
            solution: path.exit.unwrap(),
            hints: build_hints(&path),
            solution_path: path,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_correct_answer_scores_full_accuracy() {
        let puzzle = sample_puzzle();
        let check = puzzle.validate_answer(puzzle.solution);
        assert!(check.is_correct);
        assert_eq!(check.accuracy, 100);
        assert_eq!(check.correct_exit, at(5, 4));
    }

    #[test]
    fn test_far_answer_scores_low() {
        let puzzle = sample_puzzle();
        // Solution is (5, 4); (0, 0) is sqrt(41) away on a 5*sqrt(2) diagonal
        let check = puzzle.validate_answer(at(0, 0));
        assert!(!check.is_correct);
        assert_eq!(check.accuracy, 9);
    }

    #[test]
    fn test_hint_ladder() {
        let puzzle = sample_puzzle();
        assert_eq!(puzzle.hints.len(), HINT_LEVELS);
        let total = puzzle.solution_path.segments.len();
        assert_eq!(total, 8);
        let counts: Vec<usize> = puzzle.hints.iter().map(|h| h.segments.len()).collect();
        assert_eq!(counts, vec![2, 4, 6, 8]);
        assert_eq!(puzzle.hints[3].reveal_percent, 100);
    }

    #[test]
    fn test_hint_path_hides_exit() {
        let puzzle = sample_puzzle();
        for q in 0..4 {
            let hint = puzzle.hint_path(q).unwrap();
            assert!(hint.exit.is_none());
            assert!(hint.segments.iter().all(|s| s.end != puzzle.solution));
        }
        // Path runs down column 1 through the top-left quadrant
        let top_left = puzzle.hint_path(0).unwrap();
        assert!(top_left.segments.iter().any(|s| s.end == at(1, 1)));
        // Bottom-right holds the second mirror at (3, 4)
        let bottom_right = puzzle.hint_path(3).unwrap();
        assert!(bottom_right.segments.iter().any(|s| s.end == at(3, 4)));
        assert_eq!(bottom_right.bounces, 1);
    }

    #[test]
    fn test_hint_path_hides_exit_crossed_earlier() {
        // Runs west along the bottom row through (5, 2), loops up and comes
        // back down column 2 to leave through (5, 2)
        let materials = vec![
            Material::mirror(at(2, 4), 135.0),
            Material::mirror(at(5, 4), 135.0),
            Material::mirror(at(5, 1), 45.0),
            Material::mirror(at(3, 1), 135.0),
            Material::mirror(at(3, 2), 45.0),
        ];
        let puzzle = Puzzle::from_layout(
            "crossing".into(),
            Difficulty::Easy,
            6,
            materials,
            at(2, 5),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(puzzle.solution, at(5, 2));
        let crossings = puzzle
            .solution_path
            .segments
            .iter()
            .filter(|s| s.start == at(5, 2) || s.end == at(5, 2))
            .count();
        assert_eq!(crossings, 3);

        for q in 0..4 {
            let hint = puzzle.hint_path(q).unwrap();
            assert!(
                hint.segments
                    .iter()
                    .all(|s| s.start != puzzle.solution && s.end != puzzle.solution)
            );
        }
        let bottom_left = puzzle.hint_path(2).unwrap();
        assert!(bottom_left.segments.iter().any(|s| s.start == at(5, 1) && s.end == at(4, 1)));
    }

    #[test]
    fn test_invalid_quadrant() {
        let puzzle = sample_puzzle();
        assert_eq!(puzzle.hint_path(4), Err(HintError::InvalidQuadrant(4)));
    }

    #[test]
    fn test_puzzle_json_round_trip() {
        let puzzle = sample_puzzle();
        let json = serde_json::to_string(&puzzle).unwrap();
        assert!(json.contains("\"solutionPath\""));
        assert!(json.contains("\"gridSize\":6"));
        let back: Puzzle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, puzzle);
    }
}
