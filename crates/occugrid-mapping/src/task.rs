//! Reactive mapping loop.
//!
//! The mapper never pulls data itself. This task owns it, applies every pose
//! snapshot and sweep it is handed over broadcast channels, and periodically
//! exports the grid.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use occugrid_geometry::Pose;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::mapper::{Mapper, UpdateSummary};
use crate::scan::Scan;

/// Settings for [`run_mapping_task`].
#[derive(Debug, Clone)]
pub struct MappingTaskConfig {
    /// Where to export the grid. `None` disables exports.
    pub record_path: Option<PathBuf>,
    /// Period between exports while the task runs.
    pub record_interval: Duration,
    /// Stop after this many sweeps. `None` runs until the scan channel closes.
    pub max_sweeps: Option<u64>,
}

impl Default for MappingTaskConfig {
    fn default() -> Self {
        MappingTaskConfig {
            record_path: None,
            record_interval: Duration::from_secs(1),
            max_sweeps: None,
        }
    }
}

/// What the mapping task hands back when it stops.
#[derive(Debug)]
pub struct MappingOutcome {
    /// The mapper, with everything it accumulated.
    pub mapper: Mapper,
    /// Sweeps applied.
    pub sweeps: u64,
    /// Insert/drop counts over all sweeps.
    pub totals: UpdateSummary,
}

/// Runs the mapper against pose and scan broadcasts.
///
/// Pose snapshots move the tracked position; each scan is applied with
/// [`Mapper::update_map`]. When both are pending the pose is applied first.
/// The grid is exported every `record_interval` and once more on exit.
///
/// # Arguments
/// * `mapper` - The mapper to drive; ownership returns in the outcome.
/// * `scan_rx` - Receiver for `Arc<Scan>` sweeps.
/// * `pose_rx` - Receiver for `Arc<Pose>` snapshots.
/// * `config` - Export and stop settings.
///
/// # Errors
/// Fails if `record_interval` is zero, or if the scan channel closes before
/// `max_sweeps` sweeps were applied.
pub async fn run_mapping_task(
    mut mapper: Mapper,
    mut scan_rx: broadcast::Receiver<Arc<Scan>>,
    mut pose_rx: broadcast::Receiver<Arc<Pose>>,
    config: &MappingTaskConfig,
) -> anyhow::Result<MappingOutcome> {
    anyhow::ensure!(
        !config.record_interval.is_zero(),
        "record interval must be non-zero"
    );

    info!(max_sweeps = ?config.max_sweeps, record_path = ?config.record_path, "Mapping task started");
    let mut ticker = time::interval_at(
        Instant::now() + config.record_interval,
        config.record_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sweeps = 0u64;
    let mut totals = UpdateSummary::default();
    let mut pose_open = true;
    let mut scans_closed = false;

    loop {
        tokio::select! {
            biased;

            result = pose_rx.recv(), if pose_open => {
                match result {
                    Ok(pose) => mapper.set_position_from_pose(&pose),
                    Err(RecvError::Lagged(n)) => {
                        warn!("Pose receiver lagged by {} messages in mapping task.", n);
                    }
                    Err(RecvError::Closed) => {
                        warn!("Pose channel closed. Keeping the last tracked position.");
                        pose_open = false;
                    }
                }
            }
            result = scan_rx.recv() => {
                match result {
                    Ok(scan) => {
                        totals += mapper.update_map(&scan);
                        sweeps += 1;
                        debug!(sweeps, readings = scan.len(), "Sweep applied");
                        if config.max_sweeps.is_some_and(|max| sweeps >= max) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!("Scan receiver lagged by {} sweeps in mapping task.", n);
                    }
                    Err(RecvError::Closed) => {
                        info!("Scan channel closed.");
                        scans_closed = true;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if let Some(path) = &config.record_path {
                    // Failures are logged by record_map; keep mapping.
                    let _ = mapper.record_map(path);
                }
            }
        }
    }

    if let Some(path) = &config.record_path {
        if mapper.record_map(path).is_err() {
            warn!("Final map export failed; the map is still held in memory.");
        }
    }

    info!(
        sweeps,
        inserted = totals.inserted,
        dropped = totals.dropped,
        occupied = mapper.grid().occupied_count(),
        "Mapping task finished"
    );

    if let Some(max) = config.max_sweeps {
        if scans_closed && sweeps < max {
            return Err(anyhow::anyhow!(
                "Scan channel closed after {} of {} sweeps",
                sweeps,
                max
            ));
        }
    }

    Ok(MappingOutcome {
        mapper,
        sweeps,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::OCCUPIED;
    use crate::record::load_grid;
    use crate::scan::RangeReading;
    use tempfile::TempDir;

    fn scan(pairs: &[(f64, f64)]) -> Arc<Scan> {
        Arc::new(pairs.iter().copied().map(RangeReading::from).collect())
    }

    #[tokio::test]
    async fn test_applies_pose_before_scans() {
        let (scan_tx, scan_rx) = broadcast::channel(16);
        let (pose_tx, pose_rx) = broadcast::channel(16);
        let mapper = Mapper::new(10, 10, 0, 0).unwrap();

        pose_tx.send(Arc::new(Pose::new(5.0, 5.0, 0.0))).unwrap();
        scan_tx.send(scan(&[(1.0, 0.0), (2.0, 90.0)])).unwrap();
        scan_tx.send(scan(&[(3.0, 180.0), (2.0, 270.0), (20.0, 0.0)])).unwrap();
        drop(pose_tx);
        drop(scan_tx);

        let outcome = run_mapping_task(mapper, scan_rx, pose_rx, &MappingTaskConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.sweeps, 2);
        assert_eq!(outcome.totals, UpdateSummary { inserted: 4, dropped: 1 });
        let grid = outcome.mapper.grid();
        assert_eq!(grid.occupied_count(), 4);
        for (col, row) in [(6, 5), (5, 7), (2, 5), (5, 3)] {
            assert_eq!(grid.get_cell(col, row), Some(OCCUPIED));
        }
        assert_eq!(outcome.mapper.position(), (5, 5));
    }

    #[tokio::test]
    async fn test_stops_at_max_sweeps_and_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("map.txt");
        let (scan_tx, scan_rx) = broadcast::channel(16);
        let (pose_tx, pose_rx) = broadcast::channel::<Arc<Pose>>(16);
        let mapper = Mapper::new(4, 4, 1, 1).unwrap();

        scan_tx.send(scan(&[(1.0, 0.0)])).unwrap();
        scan_tx.send(scan(&[(1.0, 90.0)])).unwrap();
        scan_tx.send(scan(&[(1.0, 180.0)])).unwrap();

        let config = MappingTaskConfig {
            record_path: Some(path.clone()),
            max_sweeps: Some(2),
            ..MappingTaskConfig::default()
        };
        let outcome = run_mapping_task(mapper, scan_rx, pose_rx, &config).await.unwrap();

        assert_eq!(outcome.sweeps, 2);
        assert_eq!(outcome.mapper.grid().occupied_count(), 2);
        // Third sweep was never applied
        assert_eq!(outcome.mapper.grid().get_cell(0, 1), Some(0));
        assert_eq!(&load_grid(&path).unwrap(), outcome.mapper.grid());

        drop(scan_tx);
        drop(pose_tx);
    }

    #[tokio::test]
    async fn test_early_close_is_an_error() {
        let (scan_tx, scan_rx) = broadcast::channel(16);
        let (_pose_tx, pose_rx) = broadcast::channel::<Arc<Pose>>(16);
        let mapper = Mapper::new(4, 4, 0, 0).unwrap();

        scan_tx.send(scan(&[(1.0, 0.0)])).unwrap();
        drop(scan_tx);

        let config = MappingTaskConfig {
            max_sweeps: Some(5),
            ..MappingTaskConfig::default()
        };
        let result = run_mapping_task(mapper, scan_rx, pose_rx, &config).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_survives_lagged_scans() {
        let (scan_tx, scan_rx) = broadcast::channel(2);
        let (_pose_tx, pose_rx) = broadcast::channel::<Arc<Pose>>(4);
        let mapper = Mapper::new(10, 1, 0, 0).unwrap();

        for distance in 1..=5 {
            scan_tx.send(scan(&[(distance as f64, 0.0)])).unwrap();
        }
        drop(scan_tx);

        let outcome = run_mapping_task(mapper, scan_rx, pose_rx, &MappingTaskConfig::default())
            .await
            .unwrap();

        // Only the two newest sweeps survive the overflow
        assert_eq!(outcome.sweeps, 2);
        let occupied: Vec<_> = outcome.mapper.grid().occupied_cells().map(|p| p.col).collect();
        assert_eq!(occupied, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_rejects_zero_interval() {
        let (_scan_tx, scan_rx) = broadcast::channel::<Arc<Scan>>(1);
        let (_pose_tx, pose_rx) = broadcast::channel::<Arc<Pose>>(1);
        let mapper = Mapper::new(2, 2, 0, 0).unwrap();
        let config = MappingTaskConfig {
            record_interval: Duration::ZERO,
            ..MappingTaskConfig::default()
        };
        assert!(run_mapping_task(mapper, scan_rx, pose_rx, &config).await.is_err());
    }
}
