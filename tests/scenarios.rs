//! End-to-end checks across tracing, placement, generation and validation

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;

use laser_grid::generate::placement::score_pair;
use laser_grid::generate::{PuzzleGenerator, PuzzleSource};
use laser_grid::puzzle::{build_hints, material_density};
use laser_grid::sim::TerminationReason;
use laser_grid::validate::explore_alternatives;
use laser_grid::{Difficulty, GridPosition, Material, MaterialKind, Puzzle, PuzzleValidator, Tuning, trace};

fn at(row: i32, col: i32) -> GridPosition {
    GridPosition::new(row, col)
}

fn puzzle_from(materials: Vec<Material>, entry: GridPosition, solution: GridPosition) -> Puzzle {
    let path = trace(&materials, entry, 6);
    Puzzle {
        id: "scenario".into(),
        difficulty: Difficulty::Easy,
        grid_size: 6,
        material_density: material_density(materials.len(), 6),
        materials,
        entry,
        solution,
        hints: build_hints(&path),
        solution_path: path,
        created_at: Utc::now(),
    }
}

#[test]
fn test_scenario_a_empty_grid() {
    let path = trace(&[], at(0, 2), 6);
    assert_eq!(path.exit, Some(at(5, 2)));
    assert_eq!(path.bounces, 0);
    assert!(!path.terminated);
}

#[test]
fn test_scenario_b_single_mirror() {
    let path = trace(&[Material::mirror(at(1, 2), 45.0)], at(0, 2), 6);
    assert_eq!(path.bounces, 1);
    assert_eq!(path.exit, Some(at(1, 5)));
}

#[test]
fn test_scenario_c_absorber_has_no_exit() {
    let materials = vec![Material::new(MaterialKind::Absorber, at(2, 2))];
    let path = trace(&materials, at(0, 2), 6);
    assert!(path.terminated);
    assert_eq!(path.termination_reason, Some(TerminationReason::Absorbed));
    assert_eq!(path.exit, None);

    let puzzle = puzzle_from(materials, at(0, 2), at(5, 2));
    let report = PuzzleValidator::default().validate_puzzle(&puzzle);
    assert!(!report.valid);
    assert!(
        report
            .error_messages()
            .iter()
            .any(|m| m.contains("no valid exit point"))
    );
}

#[test]
fn test_scenario_d_metal_reverses() {
    let path = trace(&[Material::new(MaterialKind::Metal, at(3, 3))], at(3, 0), 6);
    let turn = path.segments.iter().position(|s| s.start == at(3, 3)).unwrap();
    assert!((path.segments[turn].direction - 180.0).abs() < 1e-4);
    assert_eq!(path.intensity, 1.0);
}

#[test]
fn test_scenario_e_corner_pair_scores_higher() {
    let tuning = Tuning::default();
    for difficulty in Difficulty::ALL {
        let config = tuning.config(difficulty);
        let n = config.grid_size as i32;
        let corner = score_pair(at(0, 0), at(0, n - 1), &config.spacing, config.grid_size);
        // Same Manhattan distance, both cells mid-edge
        let edge = score_pair(at(0, 1), at(n - 1, 1), &config.spacing, config.grid_size);
        assert_eq!(corner.distance, edge.distance);
        assert!(corner.validation_score > edge.validation_score, "{difficulty}");
    }
}

#[test]
fn test_daily_set_is_valid_unique_and_answerable() {
    let generator = PuzzleGenerator::default();
    let validator = PuzzleValidator::default();
    let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

    for (difficulty, result) in generator.generate_daily_set(date) {
        let generated = result.unwrap();
        let puzzle = &generated.puzzle;
        assert_eq!(generated.source, PuzzleSource::Generated);

        let n = puzzle.grid_size;
        assert!(puzzle.entry.is_boundary(n));
        assert!(puzzle.solution.is_boundary(n));
        assert_ne!(puzzle.entry, puzzle.solution);

        let report = validator.validate_puzzle(puzzle);
        assert!(report.valid, "{difficulty}: {:?}", report.errors);

        let search = explore_alternatives(puzzle);
        assert_eq!(search.exits.into_iter().collect::<Vec<_>>(), vec![puzzle.solution]);

        let check = puzzle.validate_answer(puzzle.solution);
        assert!(check.is_correct);
        assert_eq!(check.accuracy, 100);

        // Survives the JSON interchange format unchanged
        let json = serde_json::to_string(puzzle).unwrap();
        assert!(validator.validate_json(&json).valid);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_seeded_generation_is_valid(seed in any::<u64>(), difficulty_index in 0usize..3) {
        let difficulty = Difficulty::ALL[difficulty_index];
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let generated = PuzzleGenerator::default().generate(difficulty, date, Some(seed)).unwrap();
        let report = PuzzleValidator::default().validate_puzzle(&generated.puzzle);
        prop_assert!(report.valid, "{:?}", report.errors);
        let replay = trace(&generated.puzzle.materials, generated.puzzle.entry, generated.puzzle.grid_size);
        prop_assert_eq!(replay, generated.puzzle.solution_path.clone());
    }
}
