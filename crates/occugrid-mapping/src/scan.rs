//! Range readings and the collaborator seams that produce them.
//!
//! A range sensor delivers one [`Scan`] per sweep: an ordered list of
//! `(distance, angle)` returns, with 0° along the robot's local +x axis and
//! angles increasing counter‑clockwise. A pose source delivers the snapshot
//! the mapper projects from. The mapper never pulls from either; the driver
//! does and hands the results over.

use occugrid_geometry::{Pose, deg_to_rad};

/// A single range return.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeReading {
    /// Distance to the return, in grid cells.
    pub distance: f64,
    /// Bearing of the return in degrees, counter‑clockwise from +x.
    pub angle_deg: f64,
}

impl RangeReading {
    /// Construct a new reading.
    pub const fn new(distance: f64, angle_deg: f64) -> Self {
        RangeReading {
            distance,
            angle_deg,
        }
    }

    /// Cartesian offset `(d·cos θ, d·sin θ)` of this return from the sensor.
    pub fn offset(&self) -> (f64, f64) {
        let angle = deg_to_rad(self.angle_deg);
        (self.distance * angle.cos(), self.distance * angle.sin())
    }
}

impl From<(f64, f64)> for RangeReading {
    fn from((distance, angle_deg): (f64, f64)) -> Self {
        RangeReading::new(distance, angle_deg)
    }
}

/// One sweep of range readings, in the order the sensor produced them.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scan {
    readings: Vec<RangeReading>,
}

impl Scan {
    /// Creates an empty sweep.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reading to the end of the sweep.
    pub fn push(&mut self, reading: RangeReading) {
        self.readings.push(reading);
    }

    /// Number of readings.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Returns `true` if the sweep has no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Iterates over the readings in sweep order.
    pub fn iter(&self) -> std::slice::Iter<'_, RangeReading> {
        self.readings.iter()
    }

    /// The readings as a slice.
    pub fn readings(&self) -> &[RangeReading] {
        &self.readings
    }

    /// Distance of the reading at `index`, or `None` past the end.
    pub fn range(&self, index: usize) -> Option<f64> {
        self.readings.get(index).map(|r| r.distance)
    }

    /// The closest finite return and its index. Ties go to the lower index.
    pub fn nearest(&self) -> Option<(usize, RangeReading)> {
        self.extreme(|candidate, best| candidate < best)
    }

    /// The farthest finite return and its index. Ties go to the lower index.
    pub fn farthest(&self) -> Option<(usize, RangeReading)> {
        self.extreme(|candidate, best| candidate > best)
    }

    fn extreme(&self, better: impl Fn(f64, f64) -> bool) -> Option<(usize, RangeReading)> {
        self.readings
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, r)| r.distance.is_finite())
            .fold(None, |best, (i, r)| match best {
                Some((_, b)) if !better(r.distance, b.distance) => best,
                _ => Some((i, r)),
            })
    }
}

impl From<Vec<RangeReading>> for Scan {
    fn from(readings: Vec<RangeReading>) -> Self {
        Scan { readings }
    }
}

impl FromIterator<RangeReading> for Scan {
    fn from_iter<I: IntoIterator<Item = RangeReading>>(iter: I) -> Self {
        Scan {
            readings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Scan {
    type Item = &'a RangeReading;
    type IntoIter = std::slice::Iter<'a, RangeReading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

impl std::ops::Deref for Scan {
    type Target = [RangeReading];

    fn deref(&self) -> &[RangeReading] {
        &self.readings
    }
}

/// A range sensor that can be asked for one sweep at a time.
pub trait RangeSource {
    /// Error produced when the sensor cannot deliver a sweep.
    type Error;

    /// Acquire the next sweep.
    fn sweep(&mut self) -> Result<Scan, Self::Error>;
}

/// A localization source that reports the robot's current pose.
pub trait PoseSource {
    /// Error produced when no pose is available.
    type Error;

    /// Snapshot of the current pose.
    fn current_pose(&mut self) -> Result<Pose, Self::Error>;
}
