//! Puzzle validation
//!
//! Runs every check against a puzzle and accumulates findings instead of
//! stopping at the first one. Structural and physical problems are errors;
//! style problems (density, variety, reflection count) are warnings and
//! never block a puzzle.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::puzzle::{Puzzle, material_density};
use crate::sim::{
    ForcedOutcome, GridPosition, LaserPath, MaterialKind, Tracer, alternative_outcomes,
};
use crate::tuning::{Difficulty, Tuning};

/// Which family of check raised an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Structure,
    Grid,
    Material,
    Difficulty,
    Solution,
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of validating a puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_path: Option<LaserPath>,
}

impl ValidationReport {
    pub fn has_error(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}

/// Findings collected while checks run
#[derive(Default)]
struct Findings {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Findings {
    fn error(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            kind,
            message: message.into(),
        });
    }

    fn warn(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            kind,
            message: message.into(),
        });
    }

    fn into_report(self, solution_path: Option<LaserPath>) -> ValidationReport {
        ValidationReport {
            valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
            solution_path,
        }
    }
}

/// Result of exploring alternative glass/water outcomes
#[derive(Debug, Clone, PartialEq)]
pub struct UniquenessSearch {
    /// Every exit reached by some explored trace
    pub exits: BTreeSet<GridPosition>,
    pub traces: usize,
    /// Search stopped at the trace budget before exhausting alternatives
    pub truncated: bool,
}

/// Stateless validator over a tuning table
#[derive(Debug, Clone, Default)]
pub struct PuzzleValidator {
    tuning: Tuning,
}

impl PuzzleValidator {
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Validate a puzzle received as JSON
    ///
    /// Shape problems (missing fields, wrong tuple arity, unknown difficulty
    /// or material type) become structural errors instead of failing.
    pub fn validate_json(&self, json: &str) -> ValidationReport {
        match serde_json::from_str::<Puzzle>(json) {
            Ok(puzzle) => self.validate_puzzle(&puzzle),
            Err(err) => {
                let mut findings = Findings::default();
                findings.error(IssueKind::Structure, format!("malformed puzzle: {err}"));
                findings.into_report(None)
            }
        }
    }

    /// Run every check against `puzzle`
    pub fn validate_puzzle(&self, puzzle: &Puzzle) -> ValidationReport {
        let mut findings = Findings::default();

        self.check_structure(puzzle, &mut findings);
        let grid_ok = self.check_grid(puzzle, &mut findings);
        self.check_materials(puzzle, &mut findings);
        self.check_difficulty(puzzle, &mut findings);

        // Tracing needs a sane grid to mean anything
        let solution_path = if grid_ok {
            Some(self.check_solution(puzzle, &mut findings))
        } else {
            None
        };

        let report = findings.into_report(solution_path);
        if !report.valid {
            log::debug!(
                "Puzzle {} failed validation: {}",
                puzzle.id,
                report.error_messages().join("; ")
            );
        }
        report
    }

    fn check_structure(&self, puzzle: &Puzzle, findings: &mut Findings) {
        if puzzle.id.trim().is_empty() {
            findings.error(IssueKind::Structure, "puzzle id is missing");
        }
        if !Difficulty::ALL.iter().any(|d| d.grid_size() == puzzle.grid_size) {
            findings.error(
                IssueKind::Structure,
                format!("grid size {} is not one of 6, 8, 10", puzzle.grid_size),
            );
        }
        if puzzle.hints.len() != HINT_LEVELS {
            findings.error(
                IssueKind::Structure,
                format!(
                    "expected {HINT_LEVELS} hint levels, found {}",
                    puzzle.hints.len()
                ),
            );
        }
    }

    /// Returns whether entry and solution are usable for tracing
    fn check_grid(&self, puzzle: &Puzzle, findings: &mut Findings) -> bool {
        let n = puzzle.grid_size;
        let mut ok = n > 0;

        for (label, cell) in [("entry", puzzle.entry), ("solution", puzzle.solution)] {
            if !cell.in_bounds(n) {
                findings.error(IssueKind::Grid, format!("{label} {cell} is outside the grid"));
                ok = false;
            } else if !cell.is_boundary(n) {
                findings.error(IssueKind::Grid, format!("{label} {cell} is not on the grid boundary"));
                ok = false;
            }
        }
        if puzzle.entry == puzzle.solution {
            findings.error(IssueKind::Grid, "entry and solution are the same cell");
            ok = false;
        }
        ok
    }

    fn check_materials(&self, puzzle: &Puzzle, findings: &mut Findings) {
        let n = puzzle.grid_size;
        let mut occupied = HashSet::new();

        for material in &puzzle.materials {
            let at = material.position;
            if !at.in_bounds(n) {
                findings.error(
                    IssueKind::Material,
                    format!("{} at {at} is outside the grid", material.kind),
                );
            }
            if !occupied.insert(at) {
                findings.error(IssueKind::Material, format!("more than one material at {at}"));
            }
            if at == puzzle.entry {
                findings.error(IssueKind::Material, format!("{} sits on the entry cell", material.kind));
            }
            if at == puzzle.solution {
                findings.error(
                    IssueKind::Material,
                    format!("{} sits on the solution cell", material.kind),
                );
            }

            let props = &material.properties;
            for (name, value) in [
                ("reflectivity", props.reflectivity),
                ("transparency", props.transparency),
                ("diffusion", props.diffusion),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    findings.error(
                        IssueKind::Material,
                        format!("{} at {at} has {name} {value} outside [0, 1]", material.kind),
                    );
                }
            }

            if material.kind == MaterialKind::Mirror {
                match material.angle {
                    None => findings.error(IssueKind::Material, format!("mirror at {at} has no angle")),
                    Some(angle) if !(0.0..360.0).contains(&angle) => findings.error(
                        IssueKind::Material,
                        format!("mirror at {at} has angle {angle} outside [0, 360)"),
                    ),
                    Some(_) => {}
                }
            }
        }

        let target = self.tuning.config(puzzle.difficulty).target_density;
        let density = material_density(puzzle.materials.len(), n);
        let slack = target * DENSITY_TOLERANCE;
        if (density - target).abs() > slack {
            findings.warn(
                IssueKind::Material,
                format!("material density {density:.3} is outside {target:.3} ± {slack:.3}"),
            );
        }
        if (density - puzzle.material_density).abs() > 1e-3 {
            findings.warn(
                IssueKind::Material,
                format!(
                    "recorded density {:.3} does not match actual {density:.3}",
                    puzzle.material_density
                ),
            );
        }
    }

    fn check_difficulty(&self, puzzle: &Puzzle, findings: &mut Findings) {
        let config = self.tuning.config(puzzle.difficulty);

        if puzzle.grid_size != config.grid_size {
            findings.error(
                IssueKind::Difficulty,
                format!(
                    "{} puzzles use a {}x{} grid, found {}",
                    puzzle.difficulty, config.grid_size, config.grid_size, puzzle.grid_size
                ),
            );
        }

        let kinds: BTreeSet<MaterialKind> = puzzle.materials.iter().map(|m| m.kind).collect();
        for kind in &kinds {
            if !config.materials.allows(*kind) {
                findings.error(
                    IssueKind::Difficulty,
                    format!("{kind} is not allowed in {} puzzles", puzzle.difficulty),
                );
            }
        }
        if kinds.len() < config.materials.variety_floor {
            findings.warn(
                IssueKind::Difficulty,
                format!(
                    "only {} material types, {} puzzles should use at least {}",
                    kinds.len(),
                    puzzle.difficulty,
                    config.materials.variety_floor
                ),
            );
        }
    }

    fn check_solution(&self, puzzle: &Puzzle, findings: &mut Findings) -> LaserPath {
        let path = Tracer::new(&puzzle.materials, puzzle.grid_size).run(puzzle.entry);

        match path.exit {
            None => {
                let reason = path
                    .termination_reason
                    .map(|r| r.describe())
                    .unwrap_or("beam terminated");
                findings.error(IssueKind::Solution, format!("no valid exit point ({reason})"));
                return path;
            }
            Some(exit) if exit != puzzle.solution => {
                findings.error(
                    IssueKind::Solution,
                    format!("beam exits at {exit}, puzzle declares {}", puzzle.solution),
                );
                return path;
            }
            Some(_) => {}
        }

        if path != puzzle.solution_path {
            findings.warn(IssueKind::Solution, "stored solution path differs from a fresh trace");
        }

        let complexity = &self.tuning.config(puzzle.difficulty).complexity;
        if !complexity.contains(path.bounces) {
            findings.warn(
                IssueKind::Difficulty,
                format!(
                    "{} reflections, {} puzzles target {}-{}",
                    path.bounces,
                    puzzle.difficulty,
                    complexity.min_reflections,
                    complexity.max_reflections
                ),
            );
        }

        let search = explore_alternatives(puzzle);
        let others: Vec<String> = search
            .exits
            .iter()
            .filter(|&&exit| exit != puzzle.solution)
            .map(ToString::to_string)
            .collect();
        if !others.is_empty() {
            findings.error(
                IssueKind::Solution,
                format!("solution is not unique: beam can also exit at {}", others.join(", ")),
            );
        }
        if search.truncated {
            findings.warn(
                IssueKind::Solution,
                format!("uniqueness search stopped after {} traces", search.traces),
            );
        }

        path
    }
}

/// Breadth-first search over glass/water outcomes reachable from the entry
///
/// Each node pins some probabilistic cells to a forced outcome. Tracing a
/// node reveals which unpinned probabilistic cells the beam meets; every
/// alternative outcome of those cells becomes a child node.
pub fn explore_alternatives(puzzle: &Puzzle) -> UniquenessSearch {
    let mut queue = VecDeque::from([BTreeMap::<GridPosition, ForcedOutcome>::new()]);
    let mut visited = HashSet::new();
    let mut exits = BTreeSet::new();
    let mut traces = 0;

    while let Some(forced) = queue.pop_front() {
        if !visited.insert(forced.clone()) {
            continue;
        }
        if traces >= MAX_UNIQUENESS_TRACES {
            return UniquenessSearch {
                exits,
                traces,
                truncated: true,
            };
        }

        let path = Tracer::new(&puzzle.materials, puzzle.grid_size)
            .with_forced(forced.clone())
            .run(puzzle.entry);
        traces += 1;

        if let Some(exit) = path.exit {
            exits.insert(exit);
        }

        for material in path.probabilistic_hits() {
            if forced.contains_key(&material.position) {
                continue;
            }
            for outcome in alternative_outcomes(material) {
                let mut child = forced.clone();
                child.insert(material.position, outcome);
                queue.push_back(child);
            }
        }
    }

    UniquenessSearch {
        exits,
        traces,
        truncated: false,
    }
}
