//! Binary occupancy grid.
//!
//! A dense 2D grid of integer cells addressed by column (x) and row (y).
//! Cells hold [`FREE`] or [`OCCUPIED`], although callers may store other
//! values through [`OccupancyGrid::set_cell`] as their own annotations.
//! Out-of-range access is never an error: reads return `None` and writes
//! are dropped.

#![warn(missing_docs)]

use occugrid_geometry::Point;

use super::GridPoint;
use crate::error::MappingError;

/// Value stored in a single grid cell.
pub type CellValue = i32;

/// Cell value for free space.
pub const FREE: CellValue = 0;

/// Cell value for an occupied cell.
pub const OCCUPIED: CellValue = 1;

const DEFAULT_WIDTH: usize = 10;
const DEFAULT_HEIGHT: usize = 10;

/// Outcome of [`OccupancyGrid::insert_point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The point fell inside the grid and this cell is now occupied.
    Inserted(GridPoint),
    /// The point was outside the grid (or not finite); nothing changed.
    Dropped,
}

impl Insertion {
    /// Returns `true` if the point was written into the grid.
    pub fn is_inserted(&self) -> bool {
        matches!(self, Insertion::Inserted(_))
    }
}

/// Dense row-major occupancy grid.
///
/// The backing storage always holds exactly `width * height` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OccupancyGrid {
    /// Number of columns
    width: usize,
    /// Number of rows
    height: usize,
    /// Cell values, row 0 first
    cells: Vec<CellValue>,
}

/// Validates a grid shape and returns its cell count.
fn checked_cell_count(width: usize, height: usize) -> Result<usize, MappingError> {
    if width == 0 || height == 0 {
        return Err(MappingError::InvalidDimensions(
            "Width and height must be non-zero",
        ));
    }
    width
        .checked_mul(height)
        .ok_or(MappingError::InvalidDimensions(
            "Map dimensions too large, would cause overflow",
        ))
}

impl OccupancyGrid {
    /// Creates a new grid with every cell free.
    ///
    /// # Arguments
    /// * `width` - Number of columns
    /// * `height` - Number of rows
    ///
    /// # Returns
    /// * `Result<Self, MappingError>` - The grid, or `InvalidDimensions` if either
    ///   dimension is zero or the cell count overflows
    pub fn new(width: usize, height: usize) -> Result<Self, MappingError> {
        let total = checked_cell_count(width, height)?;
        Ok(OccupancyGrid {
            width,
            height,
            cells: vec![FREE; total],
        })
    }

    /// Builds a grid from explicit rows, row 0 first.
    ///
    /// Every row must have the same, non-zero length.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Result<Self, MappingError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let total = checked_cell_count(width, height)?;
        if rows.iter().any(|row| row.len() != width) {
            return Err(MappingError::InvalidDimensions(
                "All rows must have the same width",
            ));
        }

        let mut cells = Vec::with_capacity(total);
        for row in rows {
            cells.extend(row);
        }
        Ok(OccupancyGrid {
            width,
            height,
            cells,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells (`width * height`).
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    fn index(&self, p: GridPoint) -> usize {
        p.row * self.width + p.col
    }

    /// Resolves signed indices to a cell address, `None` when out of range.
    fn locate(&self, col: i64, row: i64) -> Option<GridPoint> {
        let col = usize::try_from(col).ok()?;
        let row = usize::try_from(row).ok()?;
        (col < self.width && row < self.height).then_some(GridPoint::new(col, row))
    }

    /// Sets every cell to [`FREE`].
    pub fn clear(&mut self) {
        self.cells.fill(FREE);
    }

    /// Marks the cell containing `point` as occupied.
    ///
    /// The bounds check is done on the real coordinates, then they are
    /// truncated to a column/row. A point outside `[0, width) x [0, height)`
    /// is dropped without touching the grid.
    pub fn insert_point(&mut self, point: &Point) -> Insertion {
        let (x, y) = point.point();
        let inside = x >= 0.0 && x < self.width as f64 && y >= 0.0 && y < self.height as f64;
        if !inside {
            return Insertion::Dropped;
        }

        let p = GridPoint::new(x as usize, y as usize);
        let index = self.index(p);
        self.cells[index] = OCCUPIED;
        Insertion::Inserted(p)
    }

    /// Reads a cell.
    ///
    /// Returns `None` for any address outside the grid, including negative
    /// indices. Never mutates the grid.
    pub fn get_cell(&self, col: i64, row: i64) -> Option<CellValue> {
        self.locate(col, row).map(|p| self.cells[self.index(p)])
    }

    /// Writes a cell.
    ///
    /// Returns `false`, leaving the grid unchanged, if the address is out of range.
    pub fn set_cell(&mut self, col: i64, row: i64, value: CellValue) -> bool {
        match self.locate(col, row) {
            Some(p) => {
                let index = self.index(p);
                self.cells[index] = value;
                true
            }
            None => false,
        }
    }

    /// Extends (or shrinks) the grid by the given deltas.
    ///
    /// Cells whose indices remain in range keep their values, new cells are
    /// free, and cells beyond a shrunk edge are discarded. A delta that would
    /// leave either dimension at zero or below is rejected and the grid is
    /// left as it was.
    pub fn grow(&mut self, delta_cols: isize, delta_rows: isize) -> Result<(), MappingError> {
        let width = self
            .width
            .checked_add_signed(delta_cols)
            .ok_or(MappingError::InvalidDimensions(
                "Resulting width must be positive",
            ))?;
        let height = self
            .height
            .checked_add_signed(delta_rows)
            .ok_or(MappingError::InvalidDimensions(
                "Resulting height must be positive",
            ))?;
        let total = checked_cell_count(width, height)?;

        let mut cells = vec![FREE; total];
        let keep_cols = width.min(self.width);
        for (row, old_row) in self.rows().take(height).enumerate() {
            let start = row * width;
            cells[start..start + keep_cols].copy_from_slice(&old_row[..keep_cols]);
        }

        self.width = width;
        self.height = height;
        self.cells = cells;
        Ok(())
    }

    /// Reallocates the grid with new dimensions, discarding all contents.
    ///
    /// Unlike [`grow`](Self::grow) this is a hard reset: every cell is free
    /// afterwards.
    pub fn resize_to(&mut self, width: usize, height: usize) -> Result<(), MappingError> {
        let total = checked_cell_count(width, height)?;
        self.width = width;
        self.height = height;
        self.cells = vec![FREE; total];
        Ok(())
    }

    /// Iterates over the rows of the grid, row 0 first.
    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.cells.chunks(self.width)
    }

    /// Iterates over the addresses of all non-free cells in row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != FREE)
            .map(|(i, _)| GridPoint::new(i % self.width, i / self.width))
    }

    /// Number of non-free cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|value| **value != FREE).count()
    }

    /// Renders the grid for terminal inspection.
    ///
    /// Two characters per cell: `.` for free and `x` for anything else, each
    /// followed by a space. One line per row, row 0 first.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.height * (self.width * 2 + 1));
        for row in self.rows() {
            for value in row {
                out.push(if *value == FREE { '.' } else { 'x' });
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }
}

impl Default for OccupancyGrid {
    fn default() -> Self {
        OccupancyGrid {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            cells: vec![FREE; DEFAULT_WIDTH * DEFAULT_HEIGHT],
        }
    }
}

impl std::fmt::Display for OccupancyGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "OccupancyGrid ({}x{})", self.width, self.height)?;
        write!(f, "{}", self.render())
    }
}
