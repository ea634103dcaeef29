mod blackboard; // shared robot state
mod bus; // broadcast topics
mod settings; // layered configuration
mod sim; // simulated range sensor and odometry

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Context;
use blackboard::{Blackboard, raise_fault, set_pose, snapshot, touch_sweep};
use bus::Topic;
use occugrid_geometry::Pose;
use occugrid_mapping::{Mapper, PoseSource, RangeSource, Scan, run_mapping_task};
use settings::{Settings, load_settings};
use sim::{Room, SimulatedLidar, SimulatedOdometry};
use spin_sleep::SpinSleeper;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Missing this many sweep periods in a row raises a fault.
const STALL_PERIODS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = load_settings(config_path.as_deref()).context("loading settings")?;

    info!(
        width = settings.grid.width,
        height = settings.grid.height,
        "Occugrid driver started"
    );

    let outcome = run(&settings).await?;

    info!(
        sweeps = outcome.sweeps,
        inserted = outcome.totals.inserted,
        dropped = outcome.totals.dropped,
        occupied = outcome.mapper.grid().occupied_count(),
        "Mapping finished"
    );
    println!("{}", outcome.mapper.grid());
    Ok(())
}

async fn run(settings: &Settings) -> anyhow::Result<occugrid_mapping::MappingOutcome> {
    let bb: Blackboard = Arc::default();
    let grid = &settings.grid;
    let mapper = Mapper::new(grid.width, grid.height, grid.start_x, grid.start_y)
        .context("creating mapper")?;

    let room = Room::new(&settings.room)?;
    // Centre of the starting cell
    let start = Pose::new(grid.start_x as f64 + 0.5, grid.start_y as f64 + 0.5, 0.0);
    anyhow::ensure!(
        room.contains(&start.position()),
        "start pose {} lies outside the room",
        start
    );
    set_pose(&bb, start);

    let lidar = SimulatedLidar::new(room, &settings.sensor, Arc::clone(&bb))?;
    let odometry = SimulatedOdometry::new(start, &settings.motion, room);

    let scan_topic: Topic<Scan> = Topic::new(16);
    let pose_topic: Topic<Pose> = Topic::new(16);
    let scan_rx = scan_topic.subscribe();
    let pose_rx = pose_topic.subscribe();

    let period = settings.sweep_period();
    let sensor = spawn_sensor_thread(lidar, odometry, scan_topic, pose_topic, bb.clone(), period)?;
    let watchdog = tokio::spawn(watchdog(bb.clone(), period.saturating_mul(STALL_PERIODS)));

    let outcome = run_mapping_task(mapper, scan_rx, pose_rx, &settings.task_config()).await;
    watchdog.abort();

    // The receivers are gone now, so the sensor thread stops on its next publish
    join_sensor_thread(sensor).await;

    let state = snapshot(&bb);
    info!(
        sweeps_published = state.sweeps_published,
        pose = %state.pose,
        faults = ?state.faults,
        "Sensor summary"
    );
    outcome
}

/// Runs the sensors on a dedicated thread at `period`, publishing the pose
/// before the sweep taken from it. Stops once nobody listens any more.
fn spawn_sensor_thread<L, O>(
    mut lidar: L,
    mut odometry: O,
    scan_topic: Topic<Scan>,
    pose_topic: Topic<Pose>,
    bb: Blackboard,
    period: Duration,
) -> anyhow::Result<JoinHandle<()>>
where
    L: RangeSource + Send + 'static,
    L::Error: std::fmt::Display,
    O: PoseSource + Send + 'static,
    O::Error: std::fmt::Display,
{
    info!(?period, "Spawning sensor thread...");
    let handle = std::thread::Builder::new()
        .name("sensor".into())
        .spawn(move || {
            info!("Sensor thread started.");
            let sleeper = SpinSleeper::new(100_000);
            loop {
                let pose = match odometry.current_pose() {
                    Ok(pose) => pose,
                    Err(e) => {
                        warn!(%e, "Odometry read failed");
                        raise_fault(&bb, "odometry read failed");
                        sleeper.sleep(period);
                        continue;
                    }
                };
                set_pose(&bb, pose);
                if !pose_topic.publish(pose) {
                    break;
                }

                match lidar.sweep() {
                    Ok(scan) => {
                        if !scan_topic.publish(scan) {
                            break;
                        }
                        touch_sweep(&bb);
                    }
                    Err(e) => {
                        warn!(%e, "Sweep failed");
                        raise_fault(&bb, "sweep failed");
                    }
                }
                sleeper.sleep(period);
            }
            info!("Sensor thread stopped.");
        })?;
    Ok(handle)
}

/// Waits for the sensor thread on the blocking pool. Returns `false` if it panicked.
async fn join_sensor_thread(handle: JoinHandle<()>) -> bool {
    match tokio::task::spawn_blocking(move || handle.join()).await {
        Ok(Ok(())) => true,
        Ok(Err(_)) => {
            error!("Sensor thread panicked");
            false
        }
        Err(e) => {
            error!(%e, "Failed to join sensor thread");
            false
        }
    }
}

/// Raises a fault whenever no sweep was published for `timeout`.
async fn watchdog(bb: Blackboard, timeout: Duration) {
    let mut tick = tokio::time::interval(timeout.max(Duration::from_millis(1)));
    loop {
        tick.tick().await;
        let last_sweep_ts = snapshot(&bb).last_sweep_ts;
        let age = Instant::now() - last_sweep_ts;
        if age > timeout {
            warn!(?age, "No sweep published in time");
            raise_fault(&bb, "sweep timeout");
        }
    }
}
