//! Grid geometry
//!
//! Cells are addressed as (row, col), 0-indexed from the top-left corner.
//! Rows grow southwards and columns grow eastwards, which matches the
//! heading convention used by the tracer (0° = east, 90° = south).

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Grid size as a signed coordinate bound, saturating for absurd sizes
fn extent(grid_size: u32) -> i32 {
    i32::try_from(grid_size).unwrap_or(i32::MAX)
}

/// A cell on the puzzle grid
///
/// Serialized as a `[row, col]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct GridPosition {
    pub row: i32,
    pub col: i32,
}

impl From<[i32; 2]> for GridPosition {
    fn from([row, col]: [i32; 2]) -> Self {
        Self { row, col }
    }
}

impl From<GridPosition> for [i32; 2] {
    fn from(p: GridPosition) -> Self {
        [p.row, p.col]
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One edge of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Heading of a beam that enters the grid through this side
    pub fn inward_heading(&self) -> f32 {
        match self {
            Side::Top => 90.0,
            Side::Bottom => 270.0,
            Side::Left => 0.0,
            Side::Right => 180.0,
        }
    }

    /// Heading of a beam that leaves the grid through this side
    pub fn outward_heading(&self) -> f32 {
        self.opposite().inward_heading()
    }
}

/// How two sides relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SideRelation {
    Same,
    Adjacent,
    Opposite,
}

impl GridPosition {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Cell containing a continuous beam position (x = column, y = row)
    pub fn from_vec2_rounded(p: Vec2) -> Self {
        Self {
            row: p.y.round() as i32,
            col: p.x.round() as i32,
        }
    }

    /// Cell centre as a continuous position
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.col as f32, self.row as f32)
    }

    #[inline]
    pub fn in_bounds(&self, grid_size: u32) -> bool {
        let n = extent(grid_size);
        (0..n).contains(&self.row) && (0..n).contains(&self.col)
    }

    /// In bounds and on the outer ring
    pub fn is_boundary(&self, grid_size: u32) -> bool {
        let last = extent(grid_size) - 1;
        self.in_bounds(grid_size)
            && (self.row == 0 || self.row == last || self.col == 0 || self.col == last)
    }

    pub fn is_corner(&self, grid_size: u32) -> bool {
        let last = extent(grid_size) - 1;
        self.in_bounds(grid_size)
            && (self.row == 0 || self.row == last)
            && (self.col == 0 || self.col == last)
    }

    /// Nearest in-bounds cell
    pub fn clamp_to_grid(&self, grid_size: u32) -> Self {
        let last = extent(grid_size) - 1;
        Self {
            row: self.row.clamp(0, last),
            col: self.col.clamp(0, last),
        }
    }

    /// Sides this cell lies on, in top/bottom/left/right order
    ///
    /// Corners lie on two sides; interior cells on none.
    pub fn sides(&self, grid_size: u32) -> Vec<Side> {
        let mut sides = Vec::with_capacity(2);
        if !self.in_bounds(grid_size) {
            return sides;
        }
        let last = extent(grid_size) - 1;
        if self.row == 0 {
            sides.push(Side::Top);
        }
        if self.row == last {
            sides.push(Side::Bottom);
        }
        if self.col == 0 {
            sides.push(Side::Left);
        }
        if self.col == last {
            sides.push(Side::Right);
        }
        sides
    }

    pub fn manhattan(&self, other: &GridPosition) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    pub fn euclidean(&self, other: &GridPosition) -> f32 {
        self.to_vec2().distance(other.to_vec2())
    }
}

/// Relation between two sides
pub fn side_relation(a: Side, b: Side) -> SideRelation {
    if a == b {
        SideRelation::Same
    } else if a.opposite() == b {
        SideRelation::Opposite
    } else {
        SideRelation::Adjacent
    }
}

/// Best relation between any side of `a` and any side of `b`
pub fn best_side_relation(a: &GridPosition, b: &GridPosition, grid_size: u32) -> SideRelation {
    let b_sides = b.sides(grid_size);
    a.sides(grid_size)
        .into_iter()
        .flat_map(|sa| b_sides.iter().map(move |&sb| side_relation(sa, sb)))
        .max()
        .unwrap_or(SideRelation::Same)
}

/// Every boundary cell, row-major
pub fn boundary_cells(grid_size: u32) -> Vec<GridPosition> {
    let n = grid_size as i32;
    (0..n)
        .flat_map(|row| (0..n).map(move |col| GridPosition::new(row, col)))
        .filter(|p| p.is_boundary(grid_size))
        .collect()
}

/// Longest straight-line distance on the grid (corner to corner)
pub fn max_diagonal_distance(grid_size: u32) -> f32 {
    (grid_size.saturating_sub(1)) as f32 * std::f32::consts::SQRT_2
}

/// Heading of a beam injected at `entry`
///
/// Edges are checked top, bottom, left, right, so corners take the first
/// matching edge. Cells off the boundary have no edge and yield `None`.
pub fn entry_heading(entry: &GridPosition, grid_size: u32) -> Option<f32> {
    entry
        .sides(grid_size)
        .first()
        .filter(|_| entry.is_boundary(grid_size))
        .map(Side::inward_heading)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_cell_count() {
        // 4n - 4 cells on the outer ring
        assert_eq!(boundary_cells(6).len(), 20);
        assert_eq!(boundary_cells(8).len(), 28);
        assert_eq!(boundary_cells(10).len(), 36);
        assert!(boundary_cells(6).iter().all(|p| p.is_boundary(6)));
    }

    #[test]
    fn test_corners_and_edges() {
        assert!(GridPosition::new(0, 0).is_corner(6));
        assert!(GridPosition::new(5, 5).is_corner(6));
        assert!(!GridPosition::new(0, 2).is_corner(6));
        assert!(GridPosition::new(0, 2).is_boundary(6));
        assert!(!GridPosition::new(2, 2).is_boundary(6));
        assert!(!GridPosition::new(6, 0).is_boundary(6));
    }

    #[test]
    fn test_distances() {
        let a = GridPosition::new(0, 0);
        let b = GridPosition::new(3, 4);
        assert_eq!(a.manhattan(&b), 7);
        assert!((a.euclidean(&b) - 5.0).abs() < 1e-5);
        assert!((max_diagonal_distance(6) - 5.0 * std::f32::consts::SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn test_entry_heading() {
        assert_eq!(entry_heading(&GridPosition::new(0, 2), 6), Some(90.0));
        assert_eq!(entry_heading(&GridPosition::new(5, 2), 6), Some(270.0));
        assert_eq!(entry_heading(&GridPosition::new(3, 0), 6), Some(0.0));
        assert_eq!(entry_heading(&GridPosition::new(3, 5), 6), Some(180.0));
        // Corner: top edge wins
        assert_eq!(entry_heading(&GridPosition::new(0, 5), 6), Some(90.0));
        assert_eq!(entry_heading(&GridPosition::new(2, 2), 6), None);
    }

    #[test]
    fn test_side_relations() {
        let n = 6;
        let top = GridPosition::new(0, 2);
        let bottom = GridPosition::new(5, 3);
        let left = GridPosition::new(2, 0);
        assert_eq!(best_side_relation(&top, &bottom, n), SideRelation::Opposite);
        assert_eq!(best_side_relation(&top, &left, n), SideRelation::Adjacent);
        assert_eq!(
            best_side_relation(&top, &GridPosition::new(0, 4), n),
            SideRelation::Same
        );
        // Top-left corner vs right edge: left/right are opposite
        assert_eq!(
            best_side_relation(&GridPosition::new(0, 0), &GridPosition::new(3, 5), n),
            SideRelation::Opposite
        );
    }

    #[test]
    fn test_clamp_and_serde() {
        assert_eq!(GridPosition::new(6, 2).clamp_to_grid(6), GridPosition::new(5, 2));
        assert_eq!(GridPosition::new(-1, 7).clamp_to_grid(6), GridPosition::new(0, 5));

        let json = serde_json::to_string(&GridPosition::new(1, 2)).unwrap();
        assert_eq!(json, "[1,2]");
        let back: GridPosition = serde_json::from_str("[4,0]").unwrap();
        assert_eq!(back, GridPosition::new(4, 0));
    }
}
