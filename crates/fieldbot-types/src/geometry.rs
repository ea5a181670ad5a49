//! Planar and spatial geometry shared by the facades, the simulated world and
//! the telemetry sink.
//!
//! Conventions follow the usual field frame: `x` points away from the blue
//! alliance wall, `y` to the left, angles are counter-clockwise positive and
//! stored in radians.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// A planar rotation, stored in radians and normalised to `(-π, π]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation2d {
    radians: f64,
}

impl Rotation2d {
    pub const ZERO: Rotation2d = Rotation2d { radians: 0.0 };

    pub fn from_radians(radians: f64) -> Self {
        Self {
            radians: normalize_angle(radians),
        }
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self::from_radians(degrees.to_radians())
    }

    pub fn radians(&self) -> f64 {
        self.radians
    }

    pub fn degrees(&self) -> f64 {
        self.radians.to_degrees()
    }

    pub fn cos(&self) -> f64 {
        self.radians.cos()
    }

    pub fn sin(&self) -> f64 {
        self.radians.sin()
    }

    /// Compose two rotations.
    pub fn rotate_by(&self, other: Rotation2d) -> Self {
        Self::from_radians(self.radians + other.radians)
    }

    pub fn inverse(&self) -> Self {
        Self::from_radians(-self.radians)
    }
}

/// Wrap `radians` into `(-π, π]`.
pub fn normalize_angle(radians: f64) -> f64 {
    let mut a = radians % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// A planar vector in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation2d {
    pub x: f64,
    pub y: f64,
}

impl Translation2d {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn angle(&self) -> Rotation2d {
        Rotation2d::from_radians(self.y.atan2(self.x))
    }

    pub fn rotate_by(&self, rotation: Rotation2d) -> Self {
        Self {
            x: self.x * rotation.cos() - self.y * rotation.sin(),
            y: self.x * rotation.sin() + self.y * rotation.cos(),
        }
    }

    pub fn plus(&self, other: Translation2d) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn minus(&self, other: Translation2d) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    pub fn distance(&self, other: Translation2d) -> f64 {
        self.minus(other).norm()
    }
}

/// Robot pose on the field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    pub translation: Translation2d,
    pub rotation: Rotation2d,
}

impl Pose2d {
    pub fn new(x: f64, y: f64, rotation: Rotation2d) -> Self {
        Self {
            translation: Translation2d::new(x, y),
            rotation,
        }
    }

    pub fn x(&self) -> f64 {
        self.translation.x
    }

    pub fn y(&self) -> f64 {
        self.translation.y
    }

    /// Transform a point expressed in this pose's frame into the field frame.
    pub fn transform_point(&self, local: Translation2d) -> Translation2d {
        self.translation.plus(local.rotate_by(self.rotation))
    }

    /// Express a field-frame point in this pose's frame.
    pub fn relative_point(&self, field: Translation2d) -> Translation2d {
        field.minus(self.translation).rotate_by(self.rotation.inverse())
    }
}

/// A spatial pose, used for game pieces that leave the ground.
///
/// Only yaw matters for notes, so pitch and roll are kept for visualisers but
/// never integrated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Pose3d {
    /// Lift a planar pose to height `z`.
    pub fn from_pose2d(pose: Pose2d, z: f64) -> Self {
        Self {
            x: pose.x(),
            y: pose.y(),
            z,
            roll: 0.0,
            pitch: 0.0,
            yaw: pose.rotation.radians(),
        }
    }

    pub fn ground_translation(&self) -> Translation2d {
        Translation2d::new(self.x, self.y)
    }
}

/// Chassis velocity. Whether it is robot- or field-relative depends on the
/// call site; the conversion helpers make the frame explicit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    /// Forward velocity, m/s.
    pub vx: f64,
    /// Leftward velocity, m/s.
    pub vy: f64,
    /// Counter-clockwise angular velocity, rad/s.
    pub omega: f64,
}

impl ChassisSpeeds {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    /// Convert field-relative speeds into the robot frame given the robot's
    /// heading.
    pub fn from_field_relative(field: ChassisSpeeds, heading: Rotation2d) -> Self {
        let v = Translation2d::new(field.vx, field.vy).rotate_by(heading.inverse());
        Self::new(v.x, v.y, field.omega)
    }

    /// Convert robot-relative speeds into the field frame.
    pub fn to_field_relative(&self, heading: Rotation2d) -> Self {
        let v = Translation2d::new(self.vx, self.vy).rotate_by(heading);
        Self::new(v.x, v.y, self.omega)
    }
}
