//! Beam tracing
//!
//! Steps a beam cell by cell from its entry point until it leaves the grid,
//! is absorbed, runs out of intensity, or hits the iteration ceiling.
//! The tracer holds no state between calls: the same materials, entry and
//! grid always produce the same path.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::grid::{GridPosition, entry_heading};
use super::material::{ForcedOutcome, Material, Outcome, interact};
use crate::consts::*;
use crate::{direction_vector, normalize_degrees};

/// Why a trace stopped before leaving the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Absorbed,
    MaxBounces,
    MinIntensity,
}

impl TerminationReason {
    pub fn describe(&self) -> &'static str {
        match self {
            TerminationReason::Absorbed => "beam absorbed",
            TerminationReason::MaxBounces => "iteration ceiling reached",
            TerminationReason::MinIntensity => "beam intensity fell below the floor",
        }
    }
}

/// One hop from a cell to the next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub start: GridPosition,
    pub end: GridPosition,
    /// Heading travelled along this hop (degrees)
    pub direction: f32,
    /// Occupant of `end`, if the beam met a material there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    /// What the material did to the beam
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

/// Full result of a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaserPath {
    pub segments: Vec<PathSegment>,
    /// Boundary cell the beam left through
    pub exit: Option<GridPosition>,
    pub terminated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<TerminationReason>,
    /// Reflections along the path
    pub bounces: u32,
    /// Intensity when the trace ended
    pub intensity: f32,
}

impl LaserPath {
    /// Number of segments where a material changed the beam's heading
    pub fn reflection_count(&self) -> u32 {
        self.bounces
    }

    /// Probabilistic materials the beam met, in path order, without repeats
    pub fn probabilistic_hits(&self) -> Vec<&Material> {
        let mut seen = Vec::new();
        for material in self.segments.iter().filter_map(|s| s.material.as_ref()) {
            if material.kind.is_probabilistic()
                && !seen.iter().any(|m: &&Material| m.position == material.position)
            {
                seen.push(material);
            }
        }
        seen
    }

    /// Cells the beam occupied, starting at the entry
    pub fn cells(&self) -> Vec<GridPosition> {
        let mut cells: Vec<GridPosition> = self.segments.first().map(|s| s.start).into_iter().collect();
        cells.extend(self.segments.iter().map(|s| s.end));
        cells
    }
}

/// Beam tracer over a fixed material layout
///
/// `forced` pins glass/water cells to a specific outcome; the validator uses
/// it to explore alternative physically valid traces.
pub struct Tracer<'a> {
    grid_size: u32,
    occupants: HashMap<GridPosition, &'a Material>,
    forced: BTreeMap<GridPosition, ForcedOutcome>,
}

impl<'a> Tracer<'a> {
    pub fn new(materials: &'a [Material], grid_size: u32) -> Self {
        Self {
            grid_size,
            occupants: materials.iter().map(|m| (m.position, m)).collect(),
            forced: BTreeMap::new(),
        }
    }

    pub fn with_forced(mut self, forced: BTreeMap<GridPosition, ForcedOutcome>) -> Self {
        self.forced = forced;
        self
    }

    /// Trace from `entry`, heading inferred from the edge it sits on
    pub fn run(&self, entry: GridPosition) -> LaserPath {
        let heading = entry_heading(&entry, self.grid_size).unwrap_or(0.0);
        self.run_with_direction(entry, heading)
    }

    /// Trace from `entry` with an explicit initial heading (degrees)
    pub fn run_with_direction(&self, entry: GridPosition, initial_direction: f32) -> LaserPath {
        let mut pos = entry.to_vec2();
        let mut cell = entry;
        let mut direction = normalize_degrees(initial_direction);
        let mut intensity = 1.0_f32;
        let mut bounces = 0;
        let mut segments = Vec::new();

        for _ in 0..MAX_BOUNCES {
            let next_pos = pos + step(direction);
            let next = GridPosition::from_vec2_rounded(next_pos);

            if !next.in_bounds(self.grid_size) {
                return LaserPath {
                    segments,
                    exit: Some(next.clamp_to_grid(self.grid_size)),
                    terminated: false,
                    termination_reason: None,
                    bounces,
                    intensity,
                };
            }

            let Some(&material) = self.occupants.get(&next) else {
                segments.push(PathSegment {
                    start: cell,
                    end: next,
                    direction,
                    material: None,
                    outcome: None,
                });
                pos = next_pos;
                cell = next;
                continue;
            };

            let hit = interact(material, direction, intensity, self.forced.get(&next).copied());
            segments.push(PathSegment {
                start: cell,
                end: next,
                direction,
                material: Some(material.clone()),
                outcome: Some(hit.outcome),
            });

            if hit.outcome == Outcome::Absorbed {
                return terminated(segments, TerminationReason::Absorbed, bounces, 0.0);
            }
            if hit.reflected() {
                bounces += 1;
            }

            direction = hit.new_direction;
            intensity = hit.intensity;
            // Interactions happen at the cell centre
            pos = hit.position.to_vec2();
            cell = hit.position;

            if intensity < MIN_INTENSITY {
                return terminated(segments, TerminationReason::MinIntensity, bounces, intensity);
            }
        }

        log::debug!("Trace from {} hit the iteration ceiling", entry);
        terminated(segments, TerminationReason::MaxBounces, bounces, intensity)
    }
}

fn terminated(
    segments: Vec<PathSegment>,
    reason: TerminationReason,
    bounces: u32,
    intensity: f32,
) -> LaserPath {
    LaserPath {
        segments,
        exit: None,
        terminated: true,
        termination_reason: Some(reason),
        bounces,
        intensity,
    }
}

/// Per-iteration displacement: the dominant axis advances exactly one cell
fn step(direction: f32) -> Vec2 {
    let dir = direction_vector(direction);
    dir / dir.x.abs().max(dir.y.abs())
}

/// Trace a beam through `materials` from `entry` on a `grid_size` grid
pub fn trace(materials: &[Material], entry: GridPosition, grid_size: u32) -> LaserPath {
    Tracer::new(materials, grid_size).run(entry)
}

/// Trace with an explicit initial heading instead of the edge-inferred one
pub fn trace_with_direction(
    materials: &[Material],
    entry: GridPosition,
    grid_size: u32,
    initial_direction: f32,
) -> LaserPath {
    Tracer::new(materials, grid_size).run_with_direction(entry, initial_direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::material::MaterialKind;
    use proptest::prelude::*;

    fn at(row: i32, col: i32) -> GridPosition {
        GridPosition::new(row, col)
    }

    #[test]
    fn test_empty_grid_straight_through() {
        let path = trace(&[], at(0, 2), 6);
        assert!(!path.terminated);
        assert_eq!(path.exit, Some(at(5, 2)));
        assert_eq!(path.segments.len(), 5);
        assert_eq!(path.bounces, 0);
        assert!(path.segments.iter().all(|s| s.direction == 90.0));
        assert_eq!(path.cells().first(), Some(&at(0, 2)));
        assert_eq!(path.cells().last(), Some(&at(5, 2)));
    }

    #[test]
    fn test_single_mirror_turns_east() {
        let materials = vec![Material::mirror(at(1, 2), 45.0)];
        let path = trace(&materials, at(0, 2), 6);
        assert!(!path.terminated);
        assert_eq!(path.reflection_count(), 1);
        assert_eq!(path.exit, Some(at(1, 5)));
        let after = &path.segments[1];
        assert_eq!(after.start, at(1, 2));
        assert!(after.direction.abs() < 1e-4);
    }

    #[test]
    fn test_absorber_blocks_path() {
        let materials = vec![Material::new(MaterialKind::Absorber, at(3, 2))];
        let path = trace(&materials, at(0, 2), 6);
        assert!(path.terminated);
        assert_eq!(path.exit, None);
        assert_eq!(path.termination_reason, Some(TerminationReason::Absorbed));
        assert_eq!(path.intensity, 0.0);
    }

    #[test]
    fn test_metal_reverses_heading() {
        let materials = vec![Material::new(MaterialKind::Metal, at(3, 3))];
        let path = trace(&materials, at(3, 0), 6);
        let hit = path
            .segments
            .iter()
            .position(|s| s.end == at(3, 3))
            .unwrap();
        assert_eq!(path.segments[hit].direction, 0.0);
        let back = &path.segments[hit + 1];
        assert!((back.direction - 180.0).abs() < 1e-4);
        assert_eq!(back.start, at(3, 3));
        assert_eq!(path.intensity, 1.0);
        // Bounces straight back out through the entry cell
        assert_eq!(path.exit, Some(at(3, 0)));
    }

    #[test]
    fn test_two_mirrors() {
        let materials = vec![
            Material::mirror(at(3, 1), 45.0),
            Material::mirror(at(3, 4), 45.0),
        ];
        let path = trace(&materials, at(0, 1), 6);
        assert_eq!(path.exit, Some(at(5, 4)));
        assert_eq!(path.bounces, 2);
    }

    #[test]
    fn test_glass_chain_runs_out_of_intensity() {
        // Transmitting glass halves intensity on every pass
        let materials: Vec<Material> = (1..10)
            .map(|col| Material::new(MaterialKind::Glass, at(4, col)))
            .collect();
        let forced = materials
            .iter()
            .map(|m| (m.position, ForcedOutcome::Transmit))
            .collect();
        let path = Tracer::new(&materials, 10).with_forced(forced).run(at(4, 0));
        assert!(path.terminated);
        assert_eq!(path.termination_reason, Some(TerminationReason::MinIntensity));
    }

    #[test]
    fn test_straight_through_glass_reflection_adds_no_bounce() {
        let materials = vec![Material::new(MaterialKind::Glass, at(3, 2))];
        let forced = BTreeMap::from([(at(3, 2), ForcedOutcome::Reflect)]);
        let path = Tracer::new(&materials, 6).with_forced(forced).run(at(3, 0));
        assert!(path.segments.iter().all(|s| s.direction == 0.0));
        assert_eq!(path.bounces, 0);
        assert_eq!(path.exit, Some(at(3, 5)));
        assert!((path.intensity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_non_boundary_entry_defaults_east() {
        let path = trace(&[], at(2, 2), 6);
        assert_eq!(path.exit, Some(at(2, 5)));
    }

    #[test]
    fn test_diagonal_heading_moves_one_cell_per_step() {
        let path = trace_with_direction(&[], at(0, 0), 6, 45.0);
        assert_eq!(path.exit, Some(at(5, 5)));
        assert_eq!(path.segments.len(), 5);
    }

    #[test]
    fn test_probabilistic_hits_deduplicated() {
        let materials = vec![Material::new(MaterialKind::Water, at(3, 2))];
        let path = trace(&materials, at(0, 2), 6);
        let hits = path.probabilistic_hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].position, at(3, 2));
    }

    fn arb_material(grid_size: i32) -> impl Strategy<Value = Material> {
        (
            0..grid_size,
            0..grid_size,
            0usize..5,
            prop_oneof![Just(0.0f32), Just(45.0), Just(90.0), Just(135.0), 0.0f32..360.0],
        )
            .prop_map(|(row, col, kind, angle)| {
                let kind = MaterialKind::ALL[kind];
                let mut material = Material::new(kind, at(row, col));
                if kind == MaterialKind::Mirror {
                    material.angle = Some(angle);
                }
                material
            })
    }

    proptest! {
        #[test]
        fn prop_trace_terminates_and_is_deterministic(
            materials in proptest::collection::vec(arb_material(8), 0..20),
            entry_index in 0usize..28,
        ) {
            let entry = crate::sim::grid::boundary_cells(8)[entry_index];
            let first = trace(&materials, entry, 8);
            let second = trace(&materials, entry, 8);
            prop_assert!(first.segments.len() <= MAX_BOUNCES as usize);
            prop_assert_eq!(first.terminated, first.exit.is_none());
            if let Some(exit) = first.exit {
                prop_assert!(exit.is_boundary(8));
            }
            prop_assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }
    }
}
