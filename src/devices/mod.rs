pub mod module_group;
pub mod sampler;

use crate::{
    error::DeviceError,
    kinematics::{ModulePosition, ModuleState},
};

/// A yaw source.
pub trait GyroIo {
    /// Continuous counterclockwise yaw in radians. Must not wrap at ±π.
    fn yaw(&self) -> Result<f64, DeviceError>;
}

/// One swerve module's drive encoder and steering sensor.
pub trait ModuleIo {
    /// Cumulative drive distance and current steering angle.
    fn position(&self) -> Result<ModulePosition, DeviceError>;

    /// Drive speed and current steering angle.
    fn state(&self) -> Result<ModuleState, DeviceError>;
}
