//! Generation pipeline
//!
//! One attempt takes the next ranked entry/exit pair, carves a layout for
//! it, traces and validates the result. Failed attempts are classified and
//! the retry policy reacts per kind; when any retry bound, the attempt
//! ceiling or the time budget runs out, the backup template is served.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate, Utc};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::backup::backup_puzzle;
use super::cache::CandidateCache;
use super::layout::{LayoutRequest, build_layout};
use super::placement::{EntryExitPair, PointPlacementService};
use crate::consts::GOLDEN_HASH;
use crate::error::GenerationError;
use crate::puzzle::Puzzle;
use crate::sim::GridPosition;
use crate::tuning::{Difficulty, Tuning};
use crate::validate::{IssueKind, PuzzleValidator, ValidationIssue};

/// Share of decoys dropped per validation relaxation step
const DECOY_THINNING: f32 = 0.25;
/// Decoy scale never goes below this
const MIN_DECOY_SCALE: f32 = 0.25;

/// Where a puzzle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleSource {
    Generated,
    Backup,
}

/// A validated puzzle plus how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPuzzle {
    pub puzzle: Puzzle,
    pub source: PuzzleSource,
    /// Generation attempts spent, including the successful one
    pub attempts: u32,
    /// Non-blocking validator findings
    pub warnings: Vec<ValidationIssue>,
}

/// Why an attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Validation,
    Spacing,
    MaterialPlacement,
    Physics,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Validation => "validation",
            FailureKind::Spacing => "spacing",
            FailureKind::MaterialPlacement => "material placement",
            FailureKind::Physics => "physics",
        };
        f.write_str(name)
    }
}

/// A failed generation attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failure: {message}")]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Retry counters, one per recoverable failure kind
#[derive(Debug, Default)]
struct Relaxation {
    validation: u32,
    spacing: u32,
    placement: u32,
    physics: u32,
}

/// Mutable state of one `generate` call
struct Run {
    difficulty: Difficulty,
    rng: Pcg32,
    relax: Relaxation,
    candidates: Vec<EntryExitPair>,
    cursor: usize,
    tried: HashSet<(GridPosition, GridPosition)>,
}

/// Seed for a puzzle day when the caller supplies none
pub fn daily_seed(date: NaiveDate, difficulty: Difficulty) -> u64 {
    let day = date.num_days_from_ce() as u64;
    let salt = (difficulty.index() as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    day.wrapping_mul(GOLDEN_HASH as u64) ^ salt
}

/// Puzzle id for a day and difficulty, e.g. `2026-10-19-medium`
pub fn puzzle_id(date: NaiveDate, difficulty: Difficulty) -> String {
    format!(
        "{}-{}",
        date.format("%Y-%m-%d"),
        difficulty.as_str().to_lowercase()
    )
}

/// Shuffle runs of equal score so ties do not always favour enumeration order
fn shuffle_ties(pairs: &mut [EntryExitPair], rng: &mut Pcg32) {
    for group in pairs.chunk_by_mut(|a, b| a.validation_score == b.validation_score) {
        group.shuffle(rng);
    }
}

/// Daily puzzle generator
#[derive(Clone)]
pub struct PuzzleGenerator {
    tuning: Tuning,
    placement: PointPlacementService,
    validator: PuzzleValidator,
}

impl Default for PuzzleGenerator {
    fn default() -> Self {
        let tuning = Tuning::default();
        Self {
            placement: PointPlacementService::new(tuning.clone()),
            validator: PuzzleValidator::new(tuning.clone()),
            tuning,
        }
    }
}

impl PuzzleGenerator {
    /// Generator over a checked tuning table
    pub fn new(tuning: Tuning) -> Result<Self, GenerationError> {
        tuning.check()?;
        Ok(Self {
            placement: PointPlacementService::new(tuning.clone()),
            validator: PuzzleValidator::new(tuning.clone()),
            tuning,
        })
    }

    /// Share a candidate cache across calls
    pub fn with_cache(mut self, cache: Arc<dyn CandidateCache>) -> Self {
        self.placement = self.placement.with_cache(cache);
        self
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Generate the puzzle for `difficulty` on `date`
    ///
    /// The same date, difficulty and seed always give the same layout; only
    /// `created_at` differs between calls. Without a seed one is derived
    /// from the date and difficulty.
    pub fn generate(
        &self,
        difficulty: Difficulty,
        date: NaiveDate,
        seed: Option<u64>,
    ) -> Result<GeneratedPuzzle, GenerationError> {
        let seed = seed.unwrap_or_else(|| daily_seed(date, difficulty));
        let fallback = &self.tuning.fallback;
        let budget = Duration::from_millis(fallback.timeout_ms);
        let started = Instant::now();

        let mut run = Run {
            difficulty,
            rng: Pcg32::seed_from_u64(seed),
            relax: Relaxation::default(),
            candidates: Vec::new(),
            cursor: 0,
            tried: HashSet::new(),
        };
        self.refresh_candidates(&mut run);

        let mut attempts = 0;
        let mut last_failure = None;

        while attempts < fallback.max_generation_attempts {
            if started.elapsed() > budget {
                last_failure = Some(AttemptFailure::new(
                    FailureKind::Timeout,
                    format!("budget of {}ms spent", fallback.timeout_ms),
                ));
                break;
            }
            attempts += 1;

            let failure = match self.attempt(&mut run, date) {
                Ok((puzzle, warnings)) => {
                    log::info!(
                        "Generated {} after {attempts} attempt(s) (seed {seed})",
                        puzzle.id
                    );
                    return Ok(GeneratedPuzzle {
                        puzzle,
                        source: PuzzleSource::Generated,
                        attempts,
                        warnings,
                    });
                }
                Err(failure) => failure,
            };
            log::debug!("{difficulty} attempt {attempts}: {failure}");

            let keep_going = self.react(&mut run, &failure);
            last_failure = Some(failure);
            if !keep_going {
                break;
            }
        }

        let reason = last_failure
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no attempts allowed".to_string());
        log::warn!(
            "Falling back to backup {difficulty} puzzle after {attempts} attempt(s): {reason}"
        );
        self.backup(difficulty, date, attempts)
    }

    /// Validated backup puzzle for `difficulty`
    pub fn backup(
        &self,
        difficulty: Difficulty,
        date: NaiveDate,
        attempts: u32,
    ) -> Result<GeneratedPuzzle, GenerationError> {
        let invalid = |errors: Vec<String>| GenerationError::BackupInvalid { difficulty, errors };

        let puzzle = backup_puzzle(puzzle_id(date, difficulty), difficulty, Utc::now())
            .ok_or_else(|| invalid(vec!["beam never leaves the grid".to_string()]))?;
        let report = self.validator.validate_puzzle(&puzzle);
        if !report.valid {
            return Err(invalid(report.error_messages()));
        }

        log::info!("Serving backup puzzle {}", puzzle.id);
        Ok(GeneratedPuzzle {
            puzzle,
            source: PuzzleSource::Backup,
            attempts,
            warnings: report.warnings,
        })
    }

    /// Easy, medium and hard puzzles for one day, generated in parallel
    pub fn generate_daily_set(
        &self,
        date: NaiveDate,
    ) -> Vec<(Difficulty, Result<GeneratedPuzzle, GenerationError>)> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = Difficulty::ALL
                .iter()
                .map(|&difficulty| {
                    (
                        difficulty,
                        scope.spawn(move || self.generate(difficulty, date, None)),
                    )
                })
                .collect();

            handles
                .into_iter()
                .map(|(difficulty, handle)| {
                    // A panicking worker still gets the day its backup puzzle
                    let result = handle.join().unwrap_or_else(|_| {
                        log::warn!("{difficulty} worker panicked");
                        self.backup(difficulty, date, 0)
                    });
                    (difficulty, result)
                })
                .collect()
        })
    }

    /// Load the candidate list for the current spacing expansion
    fn refresh_candidates(&self, run: &mut Run) {
        let grid_size = self.tuning.config(run.difficulty).grid_size;
        let mut candidates =
            self.placement
                .select_expanded(run.difficulty, grid_size, run.relax.spacing);
        candidates.retain(|p| !run.tried.contains(&(p.entry, p.exit)));
        shuffle_ties(&mut candidates, &mut run.rng);
        run.candidates = candidates;
        run.cursor = 0;
    }

    /// Update retry state after a failure; `false` means give up
    fn react(&self, run: &mut Run, failure: &AttemptFailure) -> bool {
        let bounds = &self.tuning.fallback;
        match failure.kind {
            FailureKind::Timeout => false,
            FailureKind::Validation => {
                run.relax.validation += 1;
                run.relax.validation <= bounds.max_validation_retries
            }
            FailureKind::Spacing => {
                run.relax.spacing += 1;
                if run.relax.spacing > bounds.max_spacing_retries {
                    return false;
                }
                self.refresh_candidates(run);
                true
            }
            FailureKind::MaterialPlacement => {
                run.relax.placement += 1;
                if run.relax.placement > bounds.max_placement_retries {
                    run.relax.placement = 0;
                    self.advance(run);
                }
                true
            }
            FailureKind::Physics => {
                run.relax.physics += 1;
                if run.relax.physics > bounds.max_physics_retries {
                    return false;
                }
                self.advance(run);
                true
            }
        }
    }

    fn advance(&self, run: &mut Run) {
        if let Some(pair) = run.candidates.get(run.cursor) {
            run.tried.insert((pair.entry, pair.exit));
        }
        run.cursor += 1;
    }

    fn attempt(
        &self,
        run: &mut Run,
        date: NaiveDate,
    ) -> Result<(Puzzle, Vec<ValidationIssue>), AttemptFailure> {
        let config = self.tuning.config(run.difficulty);
        let pair = run
            .candidates
            .get(run.cursor)
            .cloned()
            .ok_or_else(|| AttemptFailure::new(FailureKind::Spacing, "no entry/exit candidates left"))?;

        let mut complexity = config.complexity.clone();
        complexity.min_reflections = complexity
            .min_reflections
            .saturating_sub(run.relax.validation);
        complexity.max_reflections += run.relax.validation;
        let target_reflections = complexity
            .preferred_reflections
            .saturating_sub(run.relax.placement)
            .max(complexity.min_reflections);
        let decoy_scale =
            (1.0 - DECOY_THINNING * run.relax.validation as f32).max(MIN_DECOY_SCALE);

        let request = LayoutRequest {
            complexity,
            target_reflections,
            decoy_scale,
        };
        let layout = build_layout(&pair, config, &request, &mut run.rng).ok_or_else(|| {
            AttemptFailure::new(
                FailureKind::MaterialPlacement,
                format!(
                    "no route from {} to {} with about {target_reflections} reflections",
                    pair.entry, pair.exit
                ),
            )
        })?;

        let puzzle = Puzzle::from_layout(
            puzzle_id(date, run.difficulty),
            run.difficulty,
            config.grid_size,
            layout.materials,
            pair.entry,
            Utc::now(),
        )
        .ok_or_else(|| AttemptFailure::new(FailureKind::Physics, "no valid exit point"))?;

        if puzzle.solution != pair.exit {
            return Err(AttemptFailure::new(
                FailureKind::Physics,
                format!("beam exits at {}, layout targets {}", puzzle.solution, pair.exit),
            ));
        }

        let report = self.validator.validate_puzzle(&puzzle);
        if report.valid {
            return Ok((puzzle, report.warnings));
        }
        let kind = if report.has_error(IssueKind::Solution) {
            FailureKind::Physics
        } else {
            FailureKind::Validation
        };
        Err(AttemptFailure::new(kind, report.error_messages().join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::cache::MemoryCache;
    use crate::tuning::FallbackConfig;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_generates_valid_puzzles() {
        let generator = PuzzleGenerator::default();
        let validator = PuzzleValidator::default();
        for difficulty in Difficulty::ALL {
            let result = generator.generate(difficulty, day(), None).unwrap();
            assert_eq!(result.source, PuzzleSource::Generated, "{difficulty}");
            let puzzle = &result.puzzle;
            assert_eq!(puzzle.id, puzzle_id(day(), difficulty));
            assert_eq!(puzzle.grid_size, difficulty.grid_size());
            let report = validator.validate_puzzle(puzzle);
            assert!(report.valid, "{difficulty}: {:?}", report.errors);
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let generator = PuzzleGenerator::default();
        let a = generator.generate(Difficulty::Medium, day(), Some(7)).unwrap();
        let b = generator.generate(Difficulty::Medium, day(), Some(7)).unwrap();
        assert_eq!(a.puzzle.materials, b.puzzle.materials);
        assert_eq!(a.puzzle.entry, b.puzzle.entry);
        assert_eq!(a.puzzle.solution_path, b.puzzle.solution_path);
        assert_eq!(a.attempts, b.attempts);
    }

    #[test]
    fn test_puzzle_id_format() {
        assert_eq!(puzzle_id(day(), Difficulty::Medium), "2026-10-19-medium");
    }

    #[test]
    fn test_daily_seeds_differ() {
        let seeds: HashSet<u64> = Difficulty::ALL
            .iter()
            .map(|&d| daily_seed(day(), d))
            .chain([daily_seed(day().succ_opt().unwrap(), Difficulty::Easy)])
            .collect();
        assert_eq!(seeds.len(), 4);
    }

    #[test]
    fn test_zero_attempts_serves_backup() {
        let tuning = Tuning {
            fallback: FallbackConfig {
                max_generation_attempts: 0,
                ..FallbackConfig::default()
            },
            ..Tuning::default()
        };
        let generator = PuzzleGenerator::new(tuning).unwrap();
        let result = generator.generate(Difficulty::Hard, day(), None).unwrap();
        assert_eq!(result.source, PuzzleSource::Backup);
        assert_eq!(result.attempts, 0);
        assert_eq!(result.puzzle.id, "2026-10-19-hard");
        assert_eq!(result.puzzle.solution, GridPosition::new(8, 9));
    }

    #[test]
    fn test_spent_budget_serves_backup() {
        let tuning = Tuning {
            fallback: FallbackConfig {
                timeout_ms: 0,
                ..FallbackConfig::default()
            },
            ..Tuning::default()
        };
        let generator = PuzzleGenerator::new(tuning).unwrap();
        // A zero budget may still squeeze in an attempt on a fast clock
        let result = generator.generate(Difficulty::Easy, day(), None).unwrap();
        assert!(result.attempts <= 1);
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let mut tuning = Tuning::default();
        tuning.easy.grid_size = 7;
        assert!(matches!(
            PuzzleGenerator::new(tuning),
            Err(GenerationError::Tuning(_))
        ));
    }

    #[test]
    fn test_react_bounds() {
        let generator = PuzzleGenerator::default();
        let mut run = Run {
            difficulty: Difficulty::Easy,
            rng: Pcg32::seed_from_u64(1),
            relax: Relaxation::default(),
            candidates: Vec::new(),
            cursor: 0,
            tried: HashSet::new(),
        };
        generator.refresh_candidates(&mut run);
        let physics = AttemptFailure::new(FailureKind::Physics, "wrong exit");
        for _ in 0..5 {
            assert!(generator.react(&mut run, &physics));
        }
        assert!(!generator.react(&mut run, &physics));
        assert_eq!(run.cursor, 5);
        assert_eq!(run.tried.len(), 5);

        let timeout = AttemptFailure::new(FailureKind::Timeout, "slow");
        assert!(!generator.react(&mut run, &timeout));

        // Spacing expansion skips pairs already tried
        let spacing = AttemptFailure::new(FailureKind::Spacing, "exhausted");
        assert!(generator.react(&mut run, &spacing));
        assert_eq!(run.cursor, 0);
        assert!(
            run.candidates
                .iter()
                .all(|p| !run.tried.contains(&(p.entry, p.exit)))
        );
    }

    #[test]
    fn test_daily_set_with_shared_cache() {
        let cache = Arc::new(MemoryCache::new());
        let generator = PuzzleGenerator::default().with_cache(cache.clone());
        let set = generator.generate_daily_set(day());
        assert_eq!(set.len(), 3);
        for (difficulty, result) in &set {
            let result = result.as_ref().unwrap();
            assert_eq!(result.puzzle.difficulty, *difficulty);
        }
        assert!(cache.len() >= 3);
    }
}
