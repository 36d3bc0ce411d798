pub mod estimator;
pub mod history;
pub mod odometry;

use nalgebra::Vector3;

use crate::{
    geometry::Pose2D,
    kinematics::{ModulePosition, MODULE_COUNT},
};

/// Anything that can report and be told where the robot is.
///
/// Collaborators that only need the pose hold a `Tracking` rather than the
/// concrete estimator.
pub trait Tracking {
    fn position(&self) -> Pose2D;
    fn set_position(&mut self, position: Pose2D);
}

/// One drivetrain reading, stamped on the shared monotonic clock (seconds).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OdometrySample {
    pub timestamp: f64,
    /// Continuous gyro heading in radians; not wrapped by the caller.
    pub gyro_heading: f64,
    pub module_positions: [ModulePosition; MODULE_COUNT],
}

/// A vision pose with its capture time and per-axis standard deviations
/// `(x m, y m, heading rad)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseSample {
    pub pose: Pose2D,
    pub timestamp: f64,
    pub std_devs: Vector3<f64>,
}
