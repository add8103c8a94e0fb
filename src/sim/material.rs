//! Material physics
//!
//! Static rules mapping a material to how it treats an incoming beam.
//! Glass and water are the only materials whose outcome is not fixed by
//! geometry; both draw their roll from a hash of the cell they occupy so a
//! trace is reproducible on every call.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::grid::GridPosition;
use crate::consts::*;
use crate::error::PhysicsError;
use crate::{normalize_degrees, reflect_degrees};

/// Material types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum MaterialKind {
    Mirror,
    Water,
    Glass,
    Metal,
    Absorber,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 5] = [
        MaterialKind::Mirror,
        MaterialKind::Water,
        MaterialKind::Glass,
        MaterialKind::Metal,
        MaterialKind::Absorber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialKind::Mirror => "mirror",
            MaterialKind::Water => "water",
            MaterialKind::Glass => "glass",
            MaterialKind::Metal => "metal",
            MaterialKind::Absorber => "absorber",
        }
    }

    pub fn parse(s: &str) -> Result<Self, PhysicsError> {
        match s.to_lowercase().as_str() {
            "mirror" => Ok(MaterialKind::Mirror),
            "water" => Ok(MaterialKind::Water),
            "glass" => Ok(MaterialKind::Glass),
            "metal" => Ok(MaterialKind::Metal),
            "absorber" => Ok(MaterialKind::Absorber),
            _ => Err(PhysicsError::UnknownMaterial(s.to_string())),
        }
    }

    /// Glass and water outcomes depend on a per-cell roll
    pub fn is_probabilistic(&self) -> bool {
        matches!(self, MaterialKind::Glass | MaterialKind::Water)
    }

    pub fn default_properties(&self) -> MaterialProperties {
        let (reflectivity, transparency, diffusion, absorption) = match self {
            MaterialKind::Mirror => (1.0, 0.0, 0.0, false),
            MaterialKind::Metal => (1.0, 0.0, 0.0, false),
            MaterialKind::Water => (0.8, 0.2, 0.3, false),
            MaterialKind::Glass => (0.5, 0.5, 0.0, false),
            MaterialKind::Absorber => (0.0, 0.0, 0.0, true),
        };
        MaterialProperties {
            reflectivity,
            transparency,
            diffusion,
            absorption,
        }
    }
}

impl TryFrom<String> for MaterialKind {
    type Error = PhysicsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        MaterialKind::parse(&s)
    }
}

impl From<MaterialKind> for &'static str {
    fn from(kind: MaterialKind) -> Self {
        kind.as_str()
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optical coefficients, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    pub reflectivity: f32,
    pub transparency: f32,
    pub diffusion: f32,
    pub absorption: bool,
}

/// A grid cell occupant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(rename = "type")]
    pub kind: MaterialKind,
    pub position: GridPosition,
    /// Surface angle in degrees [0, 360); mirrors only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    pub properties: MaterialProperties,
}

impl Material {
    /// Material with the default properties of its type
    pub fn new(kind: MaterialKind, position: GridPosition) -> Self {
        Self {
            kind,
            position,
            angle: None,
            properties: kind.default_properties(),
        }
    }

    pub fn mirror(position: GridPosition, angle: f32) -> Self {
        Self {
            angle: Some(normalize_degrees(angle)),
            ..Self::new(MaterialKind::Mirror, position)
        }
    }
}

/// What happened to the beam at a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Reflected,
    Transmitted,
    Absorbed,
}

/// Result of a beam meeting a material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    pub outcome: Outcome,
    /// Heading after the interaction (degrees)
    pub new_direction: f32,
    pub intensity: f32,
    /// Cell the interaction happened in
    pub position: GridPosition,
}

impl Interaction {
    pub fn reflected(&self) -> bool {
        self.outcome == Outcome::Reflected
    }
}

/// Where inside its diffusion band a water perturbation lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PerturbBand {
    Low,
    Centre,
    High,
}

impl PerturbBand {
    /// Position in [-1, 1]
    fn unit(&self) -> f32 {
        match self {
            PerturbBand::Low => -1.0,
            PerturbBand::Centre => 0.0,
            PerturbBand::High => 1.0,
        }
    }
}

/// Outcome imposed on a probabilistic material instead of its cell roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ForcedOutcome {
    Transmit,
    Reflect,
    Perturb(PerturbBand),
}

/// Physically possible outcomes of a probabilistic material
///
/// Deterministic materials have none.
pub fn alternative_outcomes(material: &Material) -> Vec<ForcedOutcome> {
    let props = &material.properties;
    match material.kind {
        MaterialKind::Glass if !props.absorption => {
            let mut outcomes = Vec::with_capacity(2);
            if props.transparency > 0.0 {
                outcomes.push(ForcedOutcome::Transmit);
            }
            if props.reflectivity > 0.0 {
                outcomes.push(ForcedOutcome::Reflect);
            }
            outcomes
        }
        MaterialKind::Water if !props.absorption && props.diffusion > 0.0 => vec![
            ForcedOutcome::Perturb(PerturbBand::Low),
            ForcedOutcome::Perturb(PerturbBand::Centre),
            ForcedOutcome::Perturb(PerturbBand::High),
        ],
        _ => Vec::new(),
    }
}

/// Deterministic roll in [0, 1) for a cell
pub fn cell_roll(cell: GridPosition) -> f32 {
    let hash = (cell.row as u32)
        .wrapping_mul(GOLDEN_HASH)
        .wrapping_add((cell.col as u32).wrapping_add(7919).wrapping_mul(104_729));
    let hash = hash ^ (hash >> 13);
    (hash % 1000) as f32 / 1000.0
}

/// Headings equal up to float noise, modulo a full turn
fn same_heading(a: f32, b: f32) -> bool {
    let diff = normalize_degrees(a - b);
    diff < 1e-3 || diff > 360.0 - 1e-3
}

/// Apply a material to a beam arriving with `incident` heading and `intensity`
///
/// `forced` replaces the cell roll of glass and water; it is ignored by the
/// other materials.
pub fn interact(
    material: &Material,
    incident: f32,
    intensity: f32,
    forced: Option<ForcedOutcome>,
) -> Interaction {
    let props = &material.properties;
    let position = material.position;
    // A reflection that leaves the heading unchanged is a pass-through, not a bounce
    let reflect = |direction: f32, factor: f32| {
        let new_direction = normalize_degrees(direction);
        let outcome = if same_heading(new_direction, incident) {
            Outcome::Transmitted
        } else {
            Outcome::Reflected
        };
        Interaction {
            outcome,
            new_direction,
            intensity: intensity * factor,
            position,
        }
    };

    let absorbed = Interaction {
        outcome: Outcome::Absorbed,
        new_direction: normalize_degrees(incident),
        intensity: 0.0,
        position,
    };
    if props.absorption {
        return absorbed;
    }

    match material.kind {
        MaterialKind::Mirror => {
            // Surface normal is perpendicular to the mirror's angle
            let normal = material.angle.unwrap_or(0.0) + 90.0;
            reflect(reflect_degrees(incident, normal), props.reflectivity)
        }
        MaterialKind::Metal => reflect(incident + 180.0, props.reflectivity),
        MaterialKind::Water => {
            let unit = match forced {
                Some(ForcedOutcome::Perturb(band)) => band.unit(),
                _ => cell_roll(position) * 2.0 - 1.0,
            };
            let perturbation = unit * WATER_MAX_PERTURBATION * props.diffusion;
            reflect(
                reflect_degrees(incident, WATER_NORMAL) + perturbation,
                props.reflectivity,
            )
        }
        MaterialKind::Glass => {
            let transmit = match forced {
                Some(ForcedOutcome::Transmit) => true,
                Some(ForcedOutcome::Reflect) => false,
                _ => {
                    let total = props.transparency + props.reflectivity;
                    total > 0.0 && cell_roll(position) < props.transparency / total
                }
            };
            if transmit {
                Interaction {
                    outcome: Outcome::Transmitted,
                    new_direction: normalize_degrees(incident),
                    intensity: intensity * props.transparency,
                    position,
                }
            } else {
                reflect(reflect_degrees(incident, GLASS_NORMAL), props.reflectivity)
            }
        }
        MaterialKind::Absorber => absorbed,
    }
}
