use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use occugrid_geometry::Pose;

/// Shared view of the simulated robot, written by the sensor thread.
#[derive(Clone)]
pub struct State {
    pub pose: Pose,
    pub sweeps_published: u64,
    pub last_sweep_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            pose: Pose::default(),
            sweeps_published: 0,
            last_sweep_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn set_pose(bb: &Blackboard, pose: Pose) {
    bb.write().pose = pose;
}

pub fn touch_sweep(bb: &Blackboard) {
    let mut g = bb.write();
    g.sweeps_published += 1;
    g.last_sweep_ts = Instant::now();
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faults_are_deduplicated() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "lidar blind");
        raise_fault(&bb, "lidar blind");
        raise_fault(&bb, "odometry stalled");
        assert_eq!(snapshot(&bb).faults, vec!["lidar blind", "odometry stalled"]);
    }

    #[test]
    fn test_pose_and_sweep_bookkeeping() {
        let bb: Blackboard = Arc::default();
        set_pose(&bb, Pose::new(3.0, 4.0, 0.0));
        touch_sweep(&bb);
        touch_sweep(&bb);

        let state = snapshot(&bb);
        assert_eq!(state.pose, Pose::new(3.0, 4.0, 0.0));
        assert_eq!(state.sweeps_published, 2);
    }
}
