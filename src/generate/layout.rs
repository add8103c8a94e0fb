//! Material layout
//!
//! Builds a layout that steers the beam from a chosen entry to a chosen
//! exit. The route is carved first as a chain of straight legs along grid
//! rows and columns, with a mirror at every leg intersection. Decoys then
//! fill cells the route never touches, so they change how the puzzle looks
//! without changing where the beam goes.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

use super::placement::EntryExitPair;
use crate::sim::{GridPosition, Material, MaterialKind, entry_heading};
use crate::tuning::{ComplexityConfig, DifficultyConfig, MaterialGenerationConfig};

/// Random line draws per (reflection count, exit line) combination
const ROUTE_ATTEMPTS: usize = 48;

/// A full grid row or column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Row(i32),
    Col(i32),
}

impl Line {
    fn is_row(&self) -> bool {
        matches!(self, Line::Row(_))
    }

    /// Crossing cell of a row and a column
    fn intersect(&self, other: &Line) -> Option<GridPosition> {
        match (self, other) {
            (Line::Row(row), Line::Col(col)) | (Line::Col(col), Line::Row(row)) => {
                Some(GridPosition::new(*row, *col))
            }
            _ => None,
        }
    }
}

/// Carved solution route
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Entry, every turn, exit
    pub waypoints: Vec<GridPosition>,
    /// Every cell the beam occupies, entry first
    pub cells: Vec<GridPosition>,
    /// One mirror per turn
    pub mirrors: Vec<Material>,
}

impl Route {
    pub fn reflections(&self) -> u32 {
        self.mirrors.len() as u32
    }
}

/// Route plus decoys
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub route: Route,
    pub materials: Vec<Material>,
}

/// Knobs the generator loosens between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRequest {
    pub complexity: ComplexityConfig,
    /// Reflection count to aim for within the complexity range
    pub target_reflections: u32,
    /// Multiplier on the target density used for decoys
    pub decoy_scale: f32,
}

/// Axis-aligned heading from `a` to `b`
fn heading_between(a: GridPosition, b: GridPosition) -> Option<f32> {
    if a == b {
        None
    } else if a.row == b.row {
        Some(if b.col > a.col { 0.0 } else { 180.0 })
    } else if a.col == b.col {
        Some(if b.row > a.row { 90.0 } else { 270.0 })
    } else {
        None
    }
}

/// Cells after `a` up to and including `b` along a row or column
fn cells_between(a: GridPosition, b: GridPosition) -> Vec<GridPosition> {
    let d_row = (b.row - a.row).signum();
    let d_col = (b.col - a.col).signum();
    let steps = a.manhattan(&b) as i32;
    (1..=steps)
        .map(|i| GridPosition::new(a.row + d_row * i, a.col + d_col * i))
        .collect()
}

/// Mirror angle that turns `incoming` into `outgoing`
///
/// A mirror at angle `a` maps heading `d` to `2a - d`.
pub fn mirror_angle(incoming: f32, outgoing: f32) -> f32 {
    ((incoming + outgoing) / 2.0).rem_euclid(180.0)
}

fn entry_line(entry: GridPosition, grid_size: u32) -> Option<(Line, f32)> {
    let heading = entry_heading(&entry, grid_size)?;
    let line = if heading == 0.0 || heading == 180.0 {
        Line::Row(entry.row)
    } else {
        Line::Col(entry.col)
    };
    Some((line, heading))
}

/// Lines a beam can leave along through `exit`, with the outgoing heading
fn exit_lines(exit: GridPosition, grid_size: u32) -> Vec<(Line, f32)> {
    exit.sides(grid_size)
        .into_iter()
        .map(|side| {
            let heading = side.outward_heading();
            let line = if heading == 0.0 || heading == 180.0 {
                Line::Row(exit.row)
            } else {
                Line::Col(exit.col)
            };
            (line, heading)
        })
        .collect()
}

/// Check a chain of lines and turn it into a route
fn assemble(
    entry: GridPosition,
    exit: GridPosition,
    entry_heading: f32,
    exit_heading: f32,
    lines: &[Line],
) -> Option<Route> {
    let mut waypoints = vec![entry];
    for pair in lines.windows(2) {
        waypoints.push(pair[0].intersect(&pair[1])?);
    }
    waypoints.push(exit);

    let headings = waypoints
        .windows(2)
        .map(|w| heading_between(w[0], w[1]))
        .collect::<Option<Vec<f32>>>()?;
    if headings.first() != Some(&entry_heading) || headings.last() != Some(&exit_heading) {
        return None;
    }

    let mut cells = vec![entry];
    for w in waypoints.windows(2) {
        cells.extend(cells_between(w[0], w[1]));
    }
    // A route that crosses itself would run into its own mirrors
    let unique: HashSet<&GridPosition> = cells.iter().collect();
    if unique.len() != cells.len() {
        return None;
    }

    let mirrors = (1..waypoints.len() - 1)
        .map(|i| Material::mirror(waypoints[i], mirror_angle(headings[i - 1], headings[i])))
        .collect();

    Some(Route {
        waypoints,
        cells,
        mirrors,
    })
}

/// Carve a route with exactly `reflections` turns
fn carve(
    entry: GridPosition,
    exit: GridPosition,
    grid_size: u32,
    reflections: u32,
    exit_line: (Line, f32),
    rng: &mut Pcg32,
) -> Option<Route> {
    let (first, heading) = entry_line(entry, grid_size)?;
    let attempts = if reflections <= 1 { 1 } else { ROUTE_ATTEMPTS };

    for _ in 0..attempts {
        let mut lines = vec![first];
        for _ in 1..reflections {
            let index = rng.random_range(0..grid_size as i32);
            let previous = lines[lines.len() - 1];
            lines.push(if previous.is_row() {
                Line::Col(index)
            } else {
                Line::Row(index)
            });
        }
        if reflections > 0 {
            lines.push(exit_line.0);
        } else if exit_line.0 != first {
            return None;
        }

        if let Some(route) = assemble(entry, exit, heading, exit_line.1, &lines) {
            return Some(route);
        }
    }
    None
}

/// Carve a route from `pair.entry` to `pair.exit`
///
/// Reflection counts inside the complexity range are tried closest to the
/// target first. The parity of the count is fixed by geometry: entry and
/// exit legs along the same axis need an even number of turns.
pub fn carve_route(
    pair: &EntryExitPair,
    grid_size: u32,
    request: &LayoutRequest,
    rng: &mut Pcg32,
) -> Option<Route> {
    let (first, _) = entry_line(pair.entry, grid_size)?;
    let complexity = &request.complexity;

    let mut options: Vec<(u32, (Line, f32))> = Vec::new();
    for exit_line in exit_lines(pair.exit, grid_size) {
        for k in complexity.min_reflections..=complexity.max_reflections {
            let turns_axis = k % 2 == 1;
            if exit_line.0.is_row() == (first.is_row() != turns_axis) {
                options.push((k, exit_line));
            }
        }
    }
    options.sort_by_key(|(k, _)| k.abs_diff(request.target_reflections));

    options
        .into_iter()
        .find_map(|(k, exit_line)| carve(pair.entry, pair.exit, grid_size, k, exit_line, rng))
}

fn weighted_pick(config: &MaterialGenerationConfig, rng: &mut Pcg32) -> MaterialKind {
    let total: f32 = config.weights.iter().map(|w| w.weight).sum();
    let mut roll = rng.random::<f32>() * total;
    for w in &config.weights {
        if roll < w.weight {
            return w.kind;
        }
        roll -= w.weight;
    }
    config.critical_material
}

fn decoy(kind: MaterialKind, position: GridPosition, rng: &mut Pcg32) -> Material {
    match kind {
        MaterialKind::Mirror => Material::mirror(position, rng.random_range(0..8) as f32 * 45.0),
        other => Material::new(other, position),
    }
}

/// Fill cells off the route with decoys
///
/// Missing allowed types are placed first so the layout reaches the
/// difficulty's variety floor, then weighted picks fill the rest. The
/// critical material is topped up to its minimum last.
pub fn place_decoys(
    route: &Route,
    config: &DifficultyConfig,
    decoy_scale: f32,
    rng: &mut Pcg32,
) -> Vec<Material> {
    let n = config.grid_size as i32;
    let taken: HashSet<GridPosition> = route.cells.iter().copied().collect();
    let mut free: Vec<GridPosition> = (0..n)
        .flat_map(|row| (0..n).map(move |col| GridPosition::new(row, col)))
        .filter(|p| !taken.contains(p))
        .collect();
    free.shuffle(rng);

    let cells = (config.grid_size as f32).powi(2);
    let target_total = (config.target_density * decoy_scale * cells).round() as usize;
    let mut budget = target_total.saturating_sub(route.mirrors.len());

    let mut present: HashSet<MaterialKind> = route.mirrors.iter().map(|m| m.kind).collect();
    let missing: Vec<MaterialKind> = config
        .materials
        .allowed()
        .filter(|kind| !present.contains(kind))
        .collect();
    let variety_gap = config.materials.variety_floor.saturating_sub(present.len());
    budget = budget.max(variety_gap);

    let mut free = free.into_iter();
    let mut decoys = Vec::new();

    for kind in missing {
        if decoys.len() >= budget {
            break;
        }
        let Some(position) = free.next() else { break };
        decoys.push(decoy(kind, position, rng));
        present.insert(kind);
    }

    while decoys.len() < budget {
        let Some(position) = free.next() else { break };
        let kind = weighted_pick(&config.materials, rng);
        decoys.push(decoy(kind, position, rng));
    }

    let critical = config.materials.critical_material;
    let mut critical_count = route
        .mirrors
        .iter()
        .chain(decoys.iter())
        .filter(|m| m.kind == critical)
        .count() as u32;
    while critical_count < config.materials.critical_minimum {
        let Some(position) = free.next() else { break };
        decoys.push(decoy(critical, position, rng));
        critical_count += 1;
    }

    decoys
}

/// Route and decoys for one entry/exit pair
pub fn build_layout(
    pair: &EntryExitPair,
    config: &DifficultyConfig,
    request: &LayoutRequest,
    rng: &mut Pcg32,
) -> Option<Layout> {
    let route = carve_route(pair, config.grid_size, request, rng)?;
    let mut materials = route.mirrors.clone();
    materials.extend(place_decoys(&route, config, request.decoy_scale, rng));
    materials.sort_by_key(|m| m.position);
    Some(Layout { route, materials })
}
