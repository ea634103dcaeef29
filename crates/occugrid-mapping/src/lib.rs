//! Occupancy mapping from range-and-bearing sweeps.
//!
//! [`Mapper`] owns an [`OccupancyGrid`] and a tracked robot position. Each
//! sweep of `(distance, angle)` readings is projected from that position into
//! grid cells, which are marked occupied when they land inside the grid.
//! The grid can be exported to, and restored from, a plain-text file.

pub mod error;
pub mod map;
pub mod mapper;
pub mod record;
pub mod scan;
pub mod task;

pub use error::MappingError;
pub use map::{GridPoint, Insertion, OccupancyGrid};
pub use mapper::{Mapper, UpdateSummary};
pub use scan::{PoseSource, RangeReading, RangeSource, Scan};
pub use task::{MappingOutcome, MappingTaskConfig, run_mapping_task};
