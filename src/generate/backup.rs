//! Hand-built backup puzzles
//!
//! One fixed layout per difficulty, served when generation gives up. Each
//! keeps glass and water off the beam so the solution is unique, stays
//! inside the difficulty's reflection range and material whitelist, and
//! lands within density tolerance.

use chrono::{DateTime, Utc};

use crate::puzzle::Puzzle;
use crate::sim::{GridPosition, Material, MaterialKind};
use crate::tuning::Difficulty;

fn at(row: i32, col: i32) -> GridPosition {
    GridPosition::new(row, col)
}

fn place(kind: MaterialKind, row: i32, col: i32) -> Material {
    Material::new(kind, at(row, col))
}

/// Entry cell and materials of the backup layout
pub fn template(difficulty: Difficulty) -> (GridPosition, Vec<Material>) {
    use MaterialKind::*;

    match difficulty {
        // Down column 1, across row 3, down column 4
        Difficulty::Easy => (
            at(0, 1),
            vec![
                Material::mirror(at(3, 1), 45.0),
                Material::mirror(at(3, 4), 45.0),
                place(Absorber, 1, 4),
                place(Metal, 5, 1),
                Material::mirror(at(1, 2), 135.0),
            ],
        ),
        // East along row 2, south, west along row 5, south out of column 2
        Difficulty::Medium => (
            at(2, 0),
            vec![
                Material::mirror(at(2, 5), 45.0),
                Material::mirror(at(5, 5), 135.0),
                Material::mirror(at(5, 2), 135.0),
                place(Water, 6, 6),
                place(Absorber, 1, 3),
                place(Metal, 4, 1),
                place(Absorber, 0, 7),
                place(Water, 3, 2),
                place(Metal, 7, 5),
                Material::mirror(at(0, 2), 45.0),
                place(Metal, 6, 4),
                place(Absorber, 4, 7),
                place(Water, 7, 0),
            ],
        ),
        // Five-turn staircase leaving through the east wall
        Difficulty::Hard => (
            at(0, 7),
            vec![
                Material::mirror(at(2, 7), 135.0),
                Material::mirror(at(2, 2), 135.0),
                Material::mirror(at(6, 2), 45.0),
                Material::mirror(at(6, 5), 45.0),
                Material::mirror(at(8, 5), 45.0),
                place(Glass, 0, 2),
                place(Water, 4, 4),
                place(Absorber, 4, 8),
                place(Metal, 9, 1),
                place(Glass, 7, 8),
                place(Absorber, 1, 0),
                place(Water, 9, 9),
                place(Metal, 3, 9),
                place(Absorber, 5, 0),
                Material::mirror(at(0, 0), 45.0),
                place(Glass, 9, 4),
                place(Metal, 0, 9),
                place(Absorber, 4, 6),
                place(Water, 5, 7),
                place(Metal, 7, 1),
                Material::mirror(at(3, 5), 135.0),
                place(Absorber, 9, 6),
                place(Glass, 1, 4),
                place(Water, 5, 4),
            ],
        ),
    }
}

/// Backup puzzle for `difficulty`, not yet validated
///
/// `None` only if the template's beam fails to leave the grid.
pub fn backup_puzzle(id: String, difficulty: Difficulty, created_at: DateTime<Utc>) -> Option<Puzzle> {
    let (entry, materials) = template(difficulty);
    Puzzle::from_layout(
        id,
        difficulty,
        difficulty.grid_size(),
        materials,
        entry,
        created_at,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::PuzzleValidator;

    #[test]
    fn test_templates_validate_cleanly() {
        let validator = PuzzleValidator::default();
        for difficulty in Difficulty::ALL {
            let puzzle = backup_puzzle(format!("backup-{difficulty}"), difficulty, Utc::now()).unwrap();
            let report = validator.validate_puzzle(&puzzle);
            assert!(report.valid, "{difficulty}: {:?}", report.errors);
            assert!(report.warnings.is_empty(), "{difficulty}: {:?}", report.warnings);
        }
    }

    #[test]
    fn test_template_exits() {
        let exits: Vec<_> = Difficulty::ALL
            .iter()
            .map(|&d| backup_puzzle(String::new(), d, Utc::now()).map(|p| (p.solution, p.solution_path.bounces)))
            .collect();
        assert_eq!(
            exits,
            vec![
                Some((at(5, 4), 2)),
                Some((at(7, 2), 3)),
                Some((at(8, 9), 5)),
            ]
        );
    }
}
