//! Per-difficulty generation tuning
//!
//! Immutable parameter records consumed by placement, layout and validation.
//! The built-in table lives in `Tuning::default()`; overrides can be loaded
//! from a JSON file.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TuningError;
use crate::sim::MaterialKind;

/// Puzzle difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Fixed grid size for this difficulty
    pub fn grid_size(&self) -> u32 {
        match self {
            Difficulty::Easy => 6,
            Difficulty::Medium => 8,
            Difficulty::Hard => 10,
        }
    }

    /// Stable index used for seed derivation
    pub fn index(&self) -> u32 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry/exit spacing rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacingConstraints {
    /// Minimum Manhattan distance between entry and exit
    pub min_distance: u32,
    /// Distance the placement score is centred on
    pub preferred_distance: u32,
    /// Cap on ranked candidates handed to generation
    pub max_search_attempts: usize,
    /// Position-type weight for corner cells
    pub corner_multiplier: f32,
    /// Position-type weight for non-corner edge cells
    pub edge_multiplier: f32,
}

/// Relative weight of one material type in decoy placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialWeight {
    pub kind: MaterialKind,
    pub weight: f32,
}

/// Which materials may appear and how often
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialGenerationConfig {
    /// Allowed material types with their decoy weights
    pub weights: Vec<MaterialWeight>,
    /// Material used to bend the solution route
    pub critical_material: MaterialKind,
    /// Minimum number of critical materials on the route
    pub critical_minimum: u32,
    /// Number of distinct types below which validation warns
    pub variety_floor: usize,
}

impl MaterialGenerationConfig {
    pub fn allows(&self, kind: MaterialKind) -> bool {
        self.weights.iter().any(|w| w.kind == kind)
    }

    pub fn allowed(&self) -> impl Iterator<Item = MaterialKind> + '_ {
        self.weights.iter().map(|w| w.kind)
    }
}

/// Reflection-count targets for the solution route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityConfig {
    pub min_reflections: u32,
    pub max_reflections: u32,
    pub preferred_reflections: u32,
}

impl ComplexityConfig {
    pub fn contains(&self, reflections: u32) -> bool {
        (self.min_reflections..=self.max_reflections).contains(&reflections)
    }
}

/// Everything generation and validation need to know about one difficulty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyConfig {
    pub difficulty: Difficulty,
    pub grid_size: u32,
    /// Target share of cells holding a material
    pub target_density: f32,
    /// Time budget handed to the player (seconds)
    pub time_limit_secs: u32,
    /// Score a perfect answer is worth
    pub base_score: u32,
    pub spacing: SpacingConstraints,
    pub materials: MaterialGenerationConfig,
    pub complexity: ComplexityConfig,
}

/// Retry/fallback policy for the generation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackConfig {
    /// Hard ceiling on generation attempts before the backup template
    pub max_generation_attempts: u32,
    /// Wall-clock budget (milliseconds) before the backup template
    pub timeout_ms: u64,
    pub max_validation_retries: u32,
    pub max_spacing_retries: u32,
    pub max_placement_retries: u32,
    pub max_physics_retries: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_generation_attempts: 40,
            timeout_ms: 5_000,
            max_validation_retries: 3,
            max_spacing_retries: 3,
            max_placement_retries: 3,
            max_physics_retries: 5,
        }
    }
}

/// Complete tuning table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tuning {
    pub easy: DifficultyConfig,
    pub medium: DifficultyConfig,
    pub hard: DifficultyConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

fn weights(pairs: &[(MaterialKind, f32)]) -> Vec<MaterialWeight> {
    pairs
        .iter()
        .map(|&(kind, weight)| MaterialWeight { kind, weight })
        .collect()
}

impl Default for Tuning {
    fn default() -> Self {
        use MaterialKind::*;

        Self {
            easy: DifficultyConfig {
                difficulty: Difficulty::Easy,
                grid_size: 6,
                target_density: 0.15,
                time_limit_secs: 180,
                base_score: 100,
                spacing: SpacingConstraints {
                    min_distance: 3,
                    preferred_distance: 5,
                    max_search_attempts: 60,
                    corner_multiplier: 1.0,
                    edge_multiplier: 0.4,
                },
                materials: MaterialGenerationConfig {
                    weights: weights(&[(Mirror, 0.6), (Metal, 0.2), (Absorber, 0.2)]),
                    critical_material: Mirror,
                    critical_minimum: 1,
                    variety_floor: 1,
                },
                complexity: ComplexityConfig {
                    min_reflections: 1,
                    max_reflections: 3,
                    preferred_reflections: 2,
                },
            },
            medium: DifficultyConfig {
                difficulty: Difficulty::Medium,
                grid_size: 8,
                target_density: 0.20,
                time_limit_secs: 300,
                base_score: 250,
                spacing: SpacingConstraints {
                    min_distance: 4,
                    preferred_distance: 7,
                    max_search_attempts: 120,
                    corner_multiplier: 1.25,
                    edge_multiplier: 0.45,
                },
                materials: MaterialGenerationConfig {
                    weights: weights(&[
                        (Mirror, 0.4),
                        (Metal, 0.2),
                        (Water, 0.2),
                        (Absorber, 0.2),
                    ]),
                    critical_material: Mirror,
                    critical_minimum: 2,
                    variety_floor: 3,
                },
                complexity: ComplexityConfig {
                    min_reflections: 2,
                    max_reflections: 5,
                    preferred_reflections: 3,
                },
            },
            hard: DifficultyConfig {
                difficulty: Difficulty::Hard,
                grid_size: 10,
                target_density: 0.25,
                time_limit_secs: 480,
                base_score: 500,
                spacing: SpacingConstraints {
                    min_distance: 5,
                    preferred_distance: 9,
                    max_search_attempts: 200,
                    corner_multiplier: 1.5,
                    edge_multiplier: 0.5,
                },
                materials: MaterialGenerationConfig {
                    weights: weights(&[
                        (Mirror, 0.3),
                        (Metal, 0.15),
                        (Water, 0.2),
                        (Glass, 0.2),
                        (Absorber, 0.15),
                    ]),
                    critical_material: Mirror,
                    critical_minimum: 3,
                    variety_floor: 4,
                },
                complexity: ComplexityConfig {
                    min_reflections: 3,
                    max_reflections: 7,
                    preferred_reflections: 5,
                },
            },
            fallback: FallbackConfig::default(),
        }
    }
}

impl Tuning {
    /// Configuration for one difficulty
    pub fn config(&self, difficulty: Difficulty) -> &DifficultyConfig {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    /// Load a tuning table from a JSON file and check it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        let tuning: Tuning = serde_json::from_str(&json)?;
        tuning.check()?;
        log::info!("Loaded tuning overrides");
        Ok(tuning)
    }

    /// Reject tables the pipeline cannot work with
    pub fn check(&self) -> Result<(), TuningError> {
        for difficulty in Difficulty::ALL {
            let config = self.config(difficulty);
            let invalid = |reason: &str| TuningError::Invalid {
                difficulty,
                reason: reason.to_string(),
            };

            if config.difficulty != difficulty {
                return Err(invalid("entry is filed under the wrong difficulty"));
            }
            if config.grid_size != difficulty.grid_size() {
                return Err(invalid("grid size does not match difficulty"));
            }
            if !(0.0..=1.0).contains(&config.target_density) {
                return Err(invalid("target density must be within [0, 1]"));
            }
            if config.spacing.preferred_distance == 0 || config.spacing.corner_multiplier <= 0.0 {
                return Err(invalid("spacing weights must be positive"));
            }
            if config.materials.weights.is_empty()
                || config.materials.weights.iter().any(|w| w.weight < 0.0)
            {
                return Err(invalid("material weights must be non-empty and non-negative"));
            }
            if !config.materials.allows(config.materials.critical_material) {
                return Err(invalid("critical material is not an allowed material"));
            }
            let c = &config.complexity;
            if c.min_reflections > c.max_reflections
                || !c.contains(c.preferred_reflections)
            {
                return Err(invalid("reflection range is inconsistent"));
            }
        }
        Ok(())
    }
}
