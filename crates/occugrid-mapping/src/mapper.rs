//! Projection of range sweeps into the occupancy grid.

use std::path::Path;

use occugrid_geometry::{Point, Pose};
use tracing::{debug, error, info, trace};

use crate::error::MappingError;
use crate::map::{Insertion, OccupancyGrid};
use crate::record;
use crate::scan::RangeReading;

/// Counts of what happened to the readings of one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateSummary {
    /// Readings that landed inside the grid and marked a cell occupied.
    pub inserted: usize,
    /// Readings that projected outside the grid (or were not finite).
    pub dropped: usize,
}

impl std::ops::AddAssign for UpdateSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.dropped += rhs.dropped;
    }
}

/// Owns an occupancy grid and the tracked robot position sweeps are projected from.
///
/// The tracked position is only ever changed through [`Mapper::set_position`]
/// or [`Mapper::set_position_from_pose`]; processing a sweep does not move it.
#[derive(Debug, Clone)]
pub struct Mapper {
    grid: OccupancyGrid,
    x: i64,
    y: i64,
}

impl Mapper {
    /// Creates a mapper with a free `width` x `height` grid and the robot at `(start_x, start_y)`.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::InvalidDimensions` if either dimension is zero.
    pub fn new(width: usize, height: usize, start_x: i64, start_y: i64) -> Result<Self, MappingError> {
        let grid = OccupancyGrid::new(width, height)?;
        info!(width, height, start_x, start_y, "Mapper created");
        Ok(Mapper {
            grid,
            x: start_x,
            y: start_y,
        })
    }

    /// Wraps an existing grid, e.g. one restored with [`record::load_grid`].
    pub fn with_grid(grid: OccupancyGrid, start_x: i64, start_y: i64) -> Self {
        Mapper {
            grid,
            x: start_x,
            y: start_y,
        }
    }

    /// The tracked position as `(x, y)`.
    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    /// Moves the tracked position.
    pub fn set_position(&mut self, x: i64, y: i64) {
        if (x, y) != (self.x, self.y) {
            debug!(from_x = self.x, from_y = self.y, x, y, "Tracked position moved");
        }
        self.x = x;
        self.y = y;
    }

    /// Moves the tracked position to a pose snapshot, truncating toward zero.
    ///
    /// The heading is ignored; projection is position-only.
    pub fn set_position_from_pose(&mut self, pose: &Pose) {
        self.set_position(pose.x as i64, pose.y as i64);
    }

    /// The owned grid.
    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Mutable access to the owned grid.
    pub fn grid_mut(&mut self) -> &mut OccupancyGrid {
        &mut self.grid
    }

    /// Projects a reading to an absolute cell address.
    ///
    /// Each Cartesian offset is truncated toward zero before it is added to
    /// the tracked position. Returns `None` for a non-finite reading.
    pub fn project(&self, reading: &RangeReading) -> Option<(i64, i64)> {
        let (dx, dy) = reading.offset();
        if !dx.is_finite() || !dy.is_finite() {
            return None;
        }
        Some((
            self.x.saturating_add(dx as i64),
            self.y.saturating_add(dy as i64),
        ))
    }

    /// Marks the cell hit by every reading of a sweep as occupied.
    ///
    /// Readings are handled independently and in order. Those that project
    /// outside the grid are dropped; the grid never grows here.
    pub fn update_map(&mut self, readings: &[RangeReading]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();

        for reading in readings {
            let insertion = match self.project(reading) {
                Some((col, row)) => self.grid.insert_point(&Point::new(col as f64, row as f64)),
                None => Insertion::Dropped,
            };

            match insertion {
                Insertion::Inserted(_) => summary.inserted += 1,
                Insertion::Dropped => {
                    trace!(distance = reading.distance, angle_deg = reading.angle_deg, "Reading dropped");
                    summary.dropped += 1;
                }
            }
        }

        debug!(
            inserted = summary.inserted,
            dropped = summary.dropped,
            x = self.x,
            y = self.y,
            "Applied sweep"
        );
        summary
    }

    /// Writes the grid to `path` in the plain-text map format.
    ///
    /// The file is created or truncated. A failure is logged and returned;
    /// the grid itself is never touched by an export.
    pub fn record_map(&self, path: impl AsRef<Path>) -> Result<(), MappingError> {
        let path = path.as_ref();
        match record::save_grid(&self.grid, path) {
            Ok(()) => {
                info!(path = %path.display(), "Map recorded");
                Ok(())
            }
            Err(e) => {
                error!("Unable to record map: {}", e);
                Err(e)
            }
        }
    }

    /// Console rendering of the grid.
    pub fn show_map(&self) -> String {
        self.grid.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{FREE, GridPoint, OCCUPIED};
    use tempfile::TempDir;

    fn readings(pairs: &[(f64, f64)]) -> Vec<RangeReading> {
        pairs.iter().copied().map(RangeReading::from).collect()
    }

    #[test]
    fn test_mapper_creation() {
        let mapper = Mapper::new(8, 6, 2, 3).unwrap();
        assert_eq!(mapper.position(), (2, 3));
        assert_eq!(mapper.grid().width(), 8);
        assert_eq!(mapper.grid().height(), 6);
        assert_eq!(mapper.grid().occupied_count(), 0);

        assert!(matches!(
            Mapper::new(0, 6, 0, 0),
            Err(MappingError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_update_map_cardinal_sweep() {
        let mut mapper = Mapper::new(10, 10, 5, 5).unwrap();
        let summary = mapper.update_map(&readings(&[(1.0, 0.0), (2.0, 90.0), (3.0, 180.0), (2.0, 270.0)]));

        assert_eq!(summary, UpdateSummary { inserted: 4, dropped: 0 });
        let occupied: Vec<_> = mapper.grid().occupied_cells().collect();
        assert_eq!(
            occupied,
            vec![
                GridPoint::new(5, 3),
                GridPoint::new(2, 5),
                GridPoint::new(6, 5),
                GridPoint::new(5, 7),
            ]
        );
        assert_eq!(mapper.position(), (5, 5));
    }

    #[test]
    fn test_projection_truncates_offsets() {
        let mapper = Mapper::new(10, 10, 5, 5).unwrap();
        // 2.9 * cos(0) truncates to 2
        assert_eq!(mapper.project(&RangeReading::new(2.9, 0.0)), Some((7, 5)));
        // Negative offsets truncate toward zero, not toward -inf
        assert_eq!(mapper.project(&RangeReading::new(0.9, 180.0)), Some((5, 5)));
        // 45°: 3 * 0.7071 = 2.12 on both axes
        assert_eq!(mapper.project(&RangeReading::new(3.0, 45.0)), Some((7, 7)));
        assert_eq!(mapper.project(&RangeReading::new(f64::NAN, 10.0)), None);
        assert_eq!(mapper.project(&RangeReading::new(1.0, f64::INFINITY)), None);
    }

    #[test]
    fn test_update_map_drops_out_of_bounds() {
        let mut mapper = Mapper::new(5, 5, 0, 0).unwrap();
        let summary = mapper.update_map(&readings(&[
            (2.0, 0.0),   // (2, 0) inside
            (1.0, 180.0), // (-1, 0) outside
            (1.0, 270.0), // (0, -1) outside
            (10.0, 45.0), // (7, 7) outside
            (f64::NAN, 0.0),
        ]));

        assert_eq!(summary, UpdateSummary { inserted: 1, dropped: 4 });
        assert_eq!(mapper.grid().occupied_count(), 1);
        assert_eq!(mapper.grid().get_cell(2, 0), Some(OCCUPIED));
        assert_eq!(mapper.grid().width(), 5);
        assert_eq!(mapper.grid().height(), 5);
    }

    #[test]
    fn test_repeated_hits_are_idempotent() {
        let mut mapper = Mapper::new(4, 4, 1, 1).unwrap();
        let sweep = readings(&[(1.0, 0.0), (1.0, 0.0), (1.4, 0.0)]);
        let summary = mapper.update_map(&sweep);
        assert_eq!(summary.inserted, 3);
        assert_eq!(mapper.grid().occupied_count(), 1);
        assert_eq!(mapper.grid().get_cell(2, 1), Some(OCCUPIED));

        mapper.update_map(&sweep);
        assert_eq!(mapper.grid().occupied_count(), 1);
    }

    #[test]
    fn test_empty_sweep() {
        let mut mapper = Mapper::new(4, 4, 1, 1).unwrap();
        assert_eq!(mapper.update_map(&[]), UpdateSummary::default());
        assert_eq!(mapper.grid().occupied_count(), 0);
    }

    #[test]
    fn test_position_updates_are_explicit() {
        let mut mapper = Mapper::new(10, 10, 1, 1).unwrap();
        mapper.update_map(&readings(&[(1.0, 0.0)]));
        assert_eq!(mapper.position(), (1, 1));

        mapper.set_position(6, 2);
        mapper.update_map(&readings(&[(1.0, 90.0)]));
        assert_eq!(mapper.grid().get_cell(2, 1), Some(OCCUPIED));
        assert_eq!(mapper.grid().get_cell(6, 3), Some(OCCUPIED));

        mapper.set_position_from_pose(&Pose::new(3.9, 8.2, 1.0));
        assert_eq!(mapper.position(), (3, 8));
        mapper.set_position_from_pose(&Pose::new(-0.5, 0.7, 0.0));
        assert_eq!(mapper.position(), (0, 0));
    }

    #[test]
    fn test_show_map() {
        let mut mapper = Mapper::new(3, 2, 0, 0).unwrap();
        mapper.update_map(&readings(&[(2.0, 0.0)]));
        assert_eq!(mapper.show_map(), ". . x \n. . . \n");
    }

    #[test]
    fn test_record_map_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("map.txt");

        let mut mapper = Mapper::new(6, 4, 2, 2).unwrap();
        mapper.update_map(&readings(&[(2.0, 0.0), (1.0, 90.0), (2.0, 180.0)]));
        mapper.grid_mut().set_cell(5, 3, 9);
        mapper.record_map(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
        assert_eq!(contents.lines().next().unwrap().split_whitespace().count(), 6);

        let restored = record::load_grid(&path).unwrap();
        assert_eq!(&restored, mapper.grid());
    }

    #[test]
    fn test_record_map_failure_leaves_state_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("map.txt");

        let mut mapper = Mapper::new(10, 10, 5, 5).unwrap();
        mapper.update_map(&readings(&[(1.0, 0.0), (2.0, 90.0)]));
        let before = mapper.grid().clone();

        let result = mapper.record_map(&path);
        assert!(matches!(result, Err(MappingError::Record { .. })));
        assert_eq!(mapper.grid(), &before);
        assert_eq!(mapper.grid().get_cell(6, 5), Some(OCCUPIED));
        assert_eq!(mapper.grid().get_cell(5, 7), Some(OCCUPIED));
        assert_eq!(mapper.grid().get_cell(0, 0), Some(FREE));
    }

    #[test]
    fn test_with_grid() {
        let mut grid = OccupancyGrid::new(3, 3).unwrap();
        grid.set_cell(0, 0, 1);
        let mut mapper = Mapper::with_grid(grid, 1, 1);
        mapper.update_map(&readings(&[(1.0, 0.0)]));
        assert_eq!(mapper.grid().occupied_count(), 2);
    }
}
