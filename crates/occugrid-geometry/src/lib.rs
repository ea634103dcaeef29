#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library of 2D geometry primitives for occupancy mapping."]
#![doc = ""]
#![doc = "This crate provides the `Point` and `Pose` types shared by the mapping engine"]
#![doc = "and its collaborators, along with distance, bearing and angle helpers."]

use core::f64::consts::PI;
use core::fmt;
use core::ops::{Add, Sub};
use libm::{atan2, sqrt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Converts an angle from degrees to radians.
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Converts an angle from radians to degrees.
pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// A 2‑D coordinate.
///
/// The same type is used for world coordinates and grid coordinates; the
/// meaning depends on where the point is consumed. Equality is exact
/// floating-point equality on both coordinates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Construct a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Returns the x coordinate.
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Returns the y coordinate.
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Sets the x coordinate.
    pub fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    /// Sets the y coordinate.
    pub fn set_y(&mut self, y: f64) {
        self.y = y;
    }

    /// Returns both coordinates as an `(x, y)` pair.
    pub const fn point(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Sets both coordinates at once.
    pub fn set_point(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        sqrt(dx * dx + dy * dy)
    }

    /// Bearing from this point to `other` in radians, within `(-PI, PI]`.
    ///
    /// Measured counter‑clockwise from the +x axis. The bearing to an
    /// identical point is `0.0`.
    pub fn bearing_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        // Covers signed zeros, which compare equal but steer atan2.
        if dx == 0.0 && dy == 0.0 {
            return 0.0;
        }
        let bearing = atan2(dy, dx);
        // atan2 yields -PI for a negative-zero dy on the -x axis.
        if bearing == -PI { PI } else { bearing }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A 2‑D pose `(x, y, θ)` in world units and radians (θ measured counter‑clockwise
/// from the x‑axis in the world frame).
///
/// This is the snapshot a localization source hands to the mapper. The mapper
/// only consumes the position part.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// World‑frame x position.
    pub x: f64,
    /// World‑frame y position.
    pub y: f64,
    /// Heading (rad).
    pub theta: f64,
}

impl Pose {
    /// Construct a new pose.
    ///
    /// # Arguments
    ///
    /// * `x`: World-frame x position.
    /// * `y`: World-frame y position.
    /// * `theta`: Heading in radians.
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose { x, y, theta }
    }

    /// Normalize an angle to be within `[-PI, PI)`.
    ///
    /// Angles at `PI` will be normalized to `-PI`.
    ///
    /// # Arguments
    ///
    /// * `angle`: The angle in radians to normalize.
    ///
    /// # Returns
    ///
    /// The normalized angle in radians.
    pub fn normalize_angle(angle: f64) -> f64 {
        let a = angle % (2.0 * PI);
        if a >= PI {
            a - 2.0 * PI
        } else if a < -PI {
            a + 2.0 * PI
        } else {
            a
        }
    }

    /// The position part of the pose.
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        self.position().distance_to(&other.position())
    }

    /// Bearing from this pose's position to `other`'s position, in radians.
    pub fn bearing_to(&self, other: &Pose) -> f64 {
        self.position().bearing_to(&other.position())
    }
}

impl Add for Pose {
    type Output = Pose;

    fn add(self, rhs: Pose) -> Pose {
        Pose {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            theta: Pose::normalize_angle(self.theta + rhs.theta),
        }
    }
}

impl Sub for Pose {
    type Output = Pose;

    fn sub(self, rhs: Pose) -> Pose {
        Pose {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            theta: Pose::normalize_angle(self.theta - rhs.theta),
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, θ: {:.2} rad)", self.x, self.y, self.theta)
    }
}
