pub mod interpolation;
pub mod shot_calculator;

use nalgebra::Vector3;
use num_traits::Float;

use crate::{geometry::Pose2D, utils::math::angle_error};

pub use self::shot_calculator::RequiredSpeed;

/// Parameters for engaging a target from one pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShotSolution {
    /// Floor distance in metres; target height is ignored.
    pub distance: f64,
    /// Absolute field bearing to the target, not relative to the robot.
    pub bearing: f64,
    pub required_speed: RequiredSpeed,
    pub in_range: bool,
}

/// Floor-plane distance from `pose` to `target`.
pub fn distance_to(pose: &Pose2D, target: &Vector3<f64>) -> f64 {
    (target.xy() - pose.translation()).norm()
}

/// Field bearing from `pose` to `target`, counterclockwise from +x.
pub fn bearing_to(pose: &Pose2D, target: &Vector3<f64>) -> f64 {
    let delta = target.xy() - pose.translation();
    delta.y.atan2(delta.x)
}

/// Rotation the robot must make to face `target`.
pub fn heading_error(pose: &Pose2D, target: &Vector3<f64>) -> f64 {
    angle_error(bearing_to(pose, target), pose.heading())
}
