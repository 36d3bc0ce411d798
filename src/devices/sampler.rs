use alloc::{boxed::Box, vec};

use log::debug;

use super::{module_group::SwerveModuleGroup, GyroIo};
use crate::{
    error::DeviceError,
    kinematics::{ModulePosition, ModuleState, MODULE_COUNT},
    robot_state::DrivetrainInputs,
    tracking::OdometrySample,
};

/// Reads the drivetrain once per cycle into [`DrivetrainInputs`].
///
/// A device that fails to read this cycle contributes its previous reading,
/// so one dropped packet shows up as a missed step rather than a jump. A
/// device that has never produced a reading holds the whole sample back. A
/// non-finite value counts as a failed read.
pub struct DrivetrainSampler {
    gyro: Box<dyn GyroIo>,
    modules: SwerveModuleGroup,
    prev_yaw: Option<f64>,
    prev_positions: [Option<ModulePosition>; MODULE_COUNT],
    prev_states: [ModuleState; MODULE_COUNT],
}

impl DrivetrainSampler {
    pub fn new(gyro: Box<dyn GyroIo>, modules: SwerveModuleGroup) -> Self {
        Self {
            gyro,
            modules,
            prev_yaw: None,
            prev_positions: [None; MODULE_COUNT],
            prev_states: [ModuleState::default(); MODULE_COUNT],
        }
    }

    pub fn sample(&mut self, timestamp: f64) -> Option<DrivetrainInputs> {
        match valid(self.gyro.yaw(), |yaw| yaw.is_finite()) {
            Ok(yaw) => self.prev_yaw = Some(yaw),
            Err(err) => debug!("gyro read failed: {err}"),
        }

        for (i, position) in self.modules.position_all().into_iter().enumerate() {
            match valid(position, ModulePosition::is_finite) {
                Ok(position) => self.prev_positions[i] = Some(position),
                Err(err) => debug!("module {i} position read failed: {err}"),
            }
        }
        for (i, state) in self.modules.state_all().into_iter().enumerate() {
            match valid(state, |state| state.speed.is_finite() && state.angle.is_finite()) {
                Ok(state) => self.prev_states[i] = state,
                Err(err) => debug!("module {i} state read failed: {err}"),
            }
        }

        let gyro_heading = self.prev_yaw?;
        let [Some(fl), Some(fr), Some(bl), Some(br)] = self.prev_positions else {
            return None;
        };

        Some(DrivetrainInputs {
            odometry: vec![OdometrySample {
                timestamp,
                gyro_heading,
                module_positions: [fl, fr, bl, br],
            }],
            module_states: self.prev_states,
        })
    }
}

fn valid<T>(reading: Result<T, DeviceError>, check: impl Fn(&T) -> bool) -> Result<T, DeviceError> {
    reading.and_then(|value| {
        if check(&value) {
            Ok(value)
        } else {
            Err(DeviceError::InvalidReading)
        }
    })
}
