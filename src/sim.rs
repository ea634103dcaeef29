//! Simulated collaborators for the driver: a range sensor inside a
//! rectangular room and constant-velocity odometry.
//!
//! The simulated base translates without turning, which matches the mapper's
//! position-only projection: beam angles are reported in the world frame.

use std::convert::Infallible;

use anyhow::{Context, bail};
use occugrid_geometry::{Point, Pose, deg_to_rad};
use occugrid_mapping::{PoseSource, RangeReading, RangeSource, Scan};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::blackboard::{Blackboard, snapshot};
use crate::settings::{MotionSettings, RoomSettings, SensorSettings};

/// Keeps the simulated base this far from the walls.
const WALL_MARGIN: f64 = 1.0;

/// Axis-aligned rectangular room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Room {
    pub min: Point,
    pub max: Point,
}

impl Room {
    pub fn new(settings: &RoomSettings) -> anyhow::Result<Self> {
        if !(settings.max_x > settings.min_x && settings.max_y > settings.min_y) {
            bail!("room must have positive extent, got {:?}", settings);
        }
        Ok(Room {
            min: Point::new(settings.min_x, settings.min_y),
            max: Point::new(settings.max_x, settings.max_y),
        })
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x() > self.min.x() && p.x() < self.max.x() && p.y() > self.min.y() && p.y() < self.max.y()
    }

    /// Distance from `origin` (inside the room) to the first wall along `angle_rad`.
    pub fn ray_distance(&self, origin: &Point, angle_rad: f64) -> f64 {
        let (dx, dy) = (angle_rad.cos(), angle_rad.sin());
        let mut t = f64::INFINITY;
        if dx > f64::EPSILON {
            t = t.min((self.max.x() - origin.x()) / dx);
        } else if dx < -f64::EPSILON {
            t = t.min((self.min.x() - origin.x()) / dx);
        }
        if dy > f64::EPSILON {
            t = t.min((self.max.y() - origin.y()) / dy);
        } else if dy < -f64::EPSILON {
            t = t.min((self.min.y() - origin.y()) / dy);
        }
        t
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Ray-casting range sensor. Casts from the pose on the blackboard.
pub struct SimulatedLidar {
    room: Room,
    beams: usize,
    max_range: f64,
    noise: Normal<f64>,
    rng: StdRng,
    bb: Blackboard,
}

impl SimulatedLidar {
    /// Fails if `noise_std` is negative or NaN.
    pub fn new(room: Room, settings: &SensorSettings, bb: Blackboard) -> anyhow::Result<Self> {
        let noise = Normal::new(0.0, settings.noise_std)
            .with_context(|| format!("invalid range noise std {}", settings.noise_std))?;
        Ok(SimulatedLidar {
            room,
            beams: settings.beams,
            max_range: settings.max_range,
            noise,
            rng: seeded_rng(settings.seed),
            bb,
        })
    }
}

impl RangeSource for SimulatedLidar {
    type Error = anyhow::Error;

    fn sweep(&mut self) -> anyhow::Result<Scan> {
        let origin = snapshot(&self.bb).pose.position();
        if !self.room.contains(&origin) {
            bail!("robot at {} is outside the room", origin);
        }

        let step = 360.0 / self.beams.max(1) as f64;
        let mut scan = Scan::new();
        for i in 0..self.beams {
            let angle_deg = i as f64 * step;
            let wall = self.room.ray_distance(&origin, deg_to_rad(angle_deg));
            let distance = wall + self.noise.sample(&mut self.rng);
            // No return beyond the sensor's reach
            if distance > 0.0 && distance <= self.max_range {
                scan.push(RangeReading::new(distance, angle_deg));
            }
        }
        Ok(scan)
    }
}

/// Constant-velocity odometry that bounces off the room walls.
pub struct SimulatedOdometry {
    pose: Pose,
    vx: f64,
    vy: f64,
    room: Room,
}

impl SimulatedOdometry {
    pub fn new(start: Pose, motion: &MotionSettings, room: Room) -> Self {
        SimulatedOdometry {
            pose: start,
            vx: motion.vx,
            vy: motion.vy,
            room,
        }
    }
}

impl PoseSource for SimulatedOdometry {
    type Error = Infallible;

    /// Returns the current pose, then advances one step.
    fn current_pose(&mut self) -> Result<Pose, Infallible> {
        let current = self.pose;

        let next_x = self.pose.x + self.vx;
        if next_x < self.room.min.x() + WALL_MARGIN || next_x > self.room.max.x() - WALL_MARGIN {
            self.vx = -self.vx;
        }
        let next_y = self.pose.y + self.vy;
        if next_y < self.room.min.y() + WALL_MARGIN || next_y > self.room.max.y() - WALL_MARGIN {
            self.vy = -self.vy;
        }
        self.pose.x += self.vx;
        self.pose.y += self.vy;

        Ok(current)
    }
}
