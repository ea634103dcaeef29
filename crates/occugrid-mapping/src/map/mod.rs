//! Occupancy grid storage.
//!
//! This module provides the binary occupancy grid the mapper writes sensor
//! returns into, together with the cell addressing type.

pub mod occupancy_grid;
pub mod point_types;

pub use occupancy_grid::{CellValue, FREE, Insertion, OCCUPIED, OccupancyGrid};
pub use point_types::GridPoint;
