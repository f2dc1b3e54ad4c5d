//! Grid coordinates, extents and compass geometry
//!
//! The simulation raster is row-major with `row` increasing southward and
//! `col` increasing eastward. Direction vectors use Cartesian east/north
//! components (+x = east, +y = north), so converting a coordinate delta to
//! a direction flips the row axis.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Integer cell coordinate (row, col) into the simulation raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    /// Row index, increasing southward
    pub row: usize,
    /// Column index, increasing eastward
    pub col: usize,
}

impl CellCoord {
    /// Create a coordinate from row and column indices
    #[must_use]
    pub fn new(row: usize, col: usize) -> Self {
        CellCoord { row, col }
    }

    /// Iterate the 8-connected neighbors that fall inside `extent`
    ///
    /// Out-of-grid offsets are skipped, never reported as errors.
    pub fn neighbors8(self, extent: GridExtent) -> impl Iterator<Item = CellCoord> {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dr, dc)| {
            let row = self.row.checked_add_signed(dr as isize)?;
            let col = self.col.checked_add_signed(dc as isize)?;
            let coord = CellCoord { row, col };
            extent.contains(coord).then_some(coord)
        })
    }

    /// Unit direction vector (east/north components) from `self` to `other`
    ///
    /// Returns zero for identical coordinates.
    #[must_use]
    pub fn direction_to(self, other: CellCoord) -> Vector2<f32> {
        let east = other.col as f32 - self.col as f32;
        let north = self.row as f32 - other.row as f32;
        let v = Vector2::new(east, north);
        let norm = v.norm();
        if norm > 0.0 {
            v / norm
        } else {
            Vector2::zeros()
        }
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The 8-connected neighborhood offsets as (drow, dcol) pairs
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Rectangular raster extent in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridExtent {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

impl GridExtent {
    /// Create an extent from width (columns) and height (rows)
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        GridExtent { width, height }
    }

    /// Whether `coord` falls inside this extent
    #[must_use]
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.col < self.width && coord.row < self.height
    }

    /// Row-major flat index of `coord`
    ///
    /// Callers must check `contains` first; indexing past the extent is a
    /// logic error surfaced by the backing slice.
    #[must_use]
    pub fn index(&self, coord: CellCoord) -> usize {
        coord.row * self.width + coord.col
    }

    /// Total number of cells
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

impl std::fmt::Display for GridExtent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Convert a compass bearing (0° = North, clockwise, pointing *toward*)
/// into east/north Cartesian components of unit magnitude
#[must_use]
pub fn bearing_unit_vector(bearing_deg: f32) -> Vector2<f32> {
    let rad = bearing_deg.rem_euclid(360.0).to_radians();
    Vector2::new(rad.sin(), rad.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn neighbors_inside_grid() {
        let extent = GridExtent::new(5, 5);
        let center: Vec<_> = CellCoord::new(2, 2).neighbors8(extent).collect();
        assert_eq!(center.len(), 8);

        let corner: Vec<_> = CellCoord::new(0, 0).neighbors8(extent).collect();
        assert_eq!(corner.len(), 3);
        assert!(corner.contains(&CellCoord::new(0, 1)));
        assert!(corner.contains(&CellCoord::new(1, 0)));
        assert!(corner.contains(&CellCoord::new(1, 1)));
    }

    #[test]
    fn neighbors_clipped_at_far_edge() {
        let extent = GridExtent::new(3, 3);
        let edge: Vec<_> = CellCoord::new(2, 2).neighbors8(extent).collect();
        assert_eq!(edge.len(), 3);
        assert!(edge.iter().all(|c| extent.contains(*c)));
    }

    #[test]
    fn direction_axes() {
        let from = CellCoord::new(2, 2);
        // East neighbor
        let east = from.direction_to(CellCoord::new(2, 3));
        assert_relative_eq!(east.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(east.y, 0.0, epsilon = 1e-6);
        // North neighbor (row decreases)
        let north = from.direction_to(CellCoord::new(1, 2));
        assert_relative_eq!(north.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(north.y, 1.0, epsilon = 1e-6);
        // Diagonals are normalized
        let ne = from.direction_to(CellCoord::new(1, 3));
        assert_relative_eq!(ne.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn bearing_vector_cardinals() {
        let north = bearing_unit_vector(0.0);
        assert_relative_eq!(north.y, 1.0, epsilon = 1e-6);
        let east = bearing_unit_vector(90.0);
        assert_relative_eq!(east.x, 1.0, epsilon = 1e-6);
        let south = bearing_unit_vector(180.0);
        assert_relative_eq!(south.y, -1.0, epsilon = 1e-6);
        let west = bearing_unit_vector(270.0);
        assert_relative_eq!(west.x, -1.0, epsilon = 1e-6);
        // Out-of-range bearings wrap
        let wrapped = bearing_unit_vector(450.0);
        assert_relative_eq!(wrapped.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn row_major_indexing() {
        let extent = GridExtent::new(4, 3);
        assert_eq!(extent.index(CellCoord::new(0, 0)), 0);
        assert_eq!(extent.index(CellCoord::new(1, 0)), 4);
        assert_eq!(extent.index(CellCoord::new(2, 3)), 11);
        assert_eq!(extent.cell_count(), 12);
        assert!(!extent.contains(CellCoord::new(3, 0)));
        assert!(!extent.contains(CellCoord::new(0, 4)));
    }
}
