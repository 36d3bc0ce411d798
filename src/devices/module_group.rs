use alloc::boxed::Box;

use crate::{
    devices::ModuleIo,
    error::DeviceError,
    kinematics::{ModulePosition, ModuleState, MODULE_COUNT},
};

/// The four modules of a swerve drive, in the same order as the kinematics
/// offsets.
pub struct SwerveModuleGroup {
    modules: [Box<dyn ModuleIo>; MODULE_COUNT],
}

impl SwerveModuleGroup {
    pub fn new(modules: [Box<dyn ModuleIo>; MODULE_COUNT]) -> Self {
        Self { modules }
    }

    pub fn position_all(&self) -> [Result<ModulePosition, DeviceError>; MODULE_COUNT] {
        core::array::from_fn(|i| self.modules[i].position())
    }

    pub fn state_all(&self) -> [Result<ModuleState, DeviceError>; MODULE_COUNT] {
        core::array::from_fn(|i| self.modules[i].state())
    }
}
