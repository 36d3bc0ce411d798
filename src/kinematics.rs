use nalgebra::{Rotation2, SMatrix, SVector, Vector2};
use num_traits::Float;

use crate::{error::ConfigurationError, geometry::Twist2d};

pub const MODULE_COUNT: usize = 4;

/// Which frame a [`ChassisVelocity`] is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame {
    /// +x forward, +y left, fixed to the chassis.
    RobotRelative,
    /// +x toward the red alliance wall, +y left as seen from blue.
    FieldRelative,
}

/// Chassis velocity with an explicit frame tag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChassisVelocity {
    pub vx: f64,
    pub vy: f64,
    /// Counterclockwise positive, radians per second.
    pub omega: f64,
    pub frame: Frame,
}

impl ChassisVelocity {
    pub fn robot_relative(vx: f64, vy: f64, omega: f64) -> Self {
        Self {
            vx,
            vy,
            omega,
            frame: Frame::RobotRelative,
        }
    }

    pub fn field_relative(vx: f64, vy: f64, omega: f64) -> Self {
        Self {
            vx,
            vy,
            omega,
            frame: Frame::FieldRelative,
        }
    }

    pub fn zero(frame: Frame) -> Self {
        Self {
            vx: 0.0,
            vy: 0.0,
            omega: 0.0,
            frame,
        }
    }

    /// Re-expresses the velocity in the field frame, given the robot heading.
    pub fn to_field_relative(self, heading: f64) -> Self {
        match self.frame {
            Frame::FieldRelative => self,
            Frame::RobotRelative => {
                let v = Rotation2::new(heading) * Vector2::new(self.vx, self.vy);
                Self::field_relative(v.x, v.y, self.omega)
            }
        }
    }

    /// Re-expresses the velocity in the robot frame, given the robot heading.
    pub fn to_robot_relative(self, heading: f64) -> Self {
        match self.frame {
            Frame::RobotRelative => self,
            Frame::FieldRelative => {
                let v = Rotation2::new(-heading) * Vector2::new(self.vx, self.vy);
                Self::robot_relative(v.x, v.y, self.omega)
            }
        }
    }
}

/// Instantaneous wheel speed (m/s) and steering angle (rad) of one module.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModuleState {
    pub speed: f64,
    pub angle: f64,
}

/// Cumulative drive distance (m) and steering angle (rad) of one module.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModulePosition {
    pub distance: f64,
    pub angle: f64,
}

impl ModulePosition {
    pub fn new(distance: f64, angle: f64) -> Self {
        Self { distance, angle }
    }

    pub fn is_finite(&self) -> bool {
        self.distance.is_finite() && self.angle.is_finite()
    }
}

impl ModuleState {
    pub fn new(speed: f64, angle: f64) -> Self {
        Self { speed, angle }
    }

    fn from_components(v: Vector2<f64>) -> Self {
        let speed = v.norm();
        if speed < 1e-12 {
            Self::default()
        } else {
            Self {
                speed,
                angle: v.y.atan2(v.x),
            }
        }
    }

    fn components(&self) -> Vector2<f64> {
        Vector2::new(self.speed * self.angle.cos(), self.speed * self.angle.sin())
    }
}

/// Swerve drive kinematics for four modules at fixed offsets from the
/// rotation centre.
///
/// Each module contributes two rows to an 8x3 system mapping chassis
/// velocity `(vx, vy, ω)` to module velocity components. The forward
/// direction solves it in the least-squares sense through a pseudo-inverse
/// computed once at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct SwerveKinematics {
    offsets: [Vector2<f64>; MODULE_COUNT],
    inverse_matrix: SMatrix<f64, 8, 3>,
    forward_matrix: SMatrix<f64, 3, 8>,
}

impl SwerveKinematics {
    pub fn new(offsets: [Vector2<f64>; MODULE_COUNT]) -> Result<Self, ConfigurationError> {
        for (index, offset) in offsets.iter().enumerate() {
            if !offset.x.is_finite() || !offset.y.is_finite() {
                return Err(ConfigurationError::NonFiniteModuleOffset { index });
            }
        }
        for first in 0..MODULE_COUNT {
            for second in first + 1..MODULE_COUNT {
                if (offsets[first] - offsets[second]).norm() < 1e-9 {
                    return Err(ConfigurationError::DuplicateModuleOffset { first, second });
                }
            }
        }

        let mut inverse_matrix = SMatrix::<f64, 8, 3>::zeros();
        for (i, offset) in offsets.iter().enumerate() {
            inverse_matrix[(2 * i, 0)] = 1.0;
            inverse_matrix[(2 * i, 2)] = -offset.y;
            inverse_matrix[(2 * i + 1, 1)] = 1.0;
            inverse_matrix[(2 * i + 1, 2)] = offset.x;
        }
        let transpose = inverse_matrix.transpose();
        let normal = (transpose * inverse_matrix)
            .try_inverse()
            .ok_or(ConfigurationError::SingularModuleGeometry)?;

        Ok(Self {
            offsets,
            inverse_matrix,
            forward_matrix: normal * transpose,
        })
    }

    /// Offsets for a rectangular chassis, front-left first, then front-right,
    /// back-left, back-right.
    pub fn rectangular(half_length: f64, half_width: f64) -> Result<Self, ConfigurationError> {
        Self::new([
            Vector2::new(half_length, half_width),
            Vector2::new(half_length, -half_width),
            Vector2::new(-half_length, half_width),
            Vector2::new(-half_length, -half_width),
        ])
    }

    pub fn offsets(&self) -> &[Vector2<f64>; MODULE_COUNT] {
        &self.offsets
    }

    /// Module states that realise `velocity`.
    ///
    /// A field-relative velocity is first brought into the robot frame using
    /// `heading`; for a robot-relative velocity `heading` is ignored. A module
    /// asked for zero speed reports angle zero.
    pub fn inverse(&self, velocity: ChassisVelocity, heading: f64) -> [ModuleState; MODULE_COUNT] {
        let velocity = velocity.to_robot_relative(heading);
        let components =
            self.inverse_matrix * SVector::<f64, 3>::new(velocity.vx, velocity.vy, velocity.omega);
        core::array::from_fn(|i| {
            ModuleState::from_components(Vector2::new(components[2 * i], components[2 * i + 1]))
        })
    }

    /// Robot-relative chassis velocity that best explains the module states.
    pub fn forward(&self, states: &[ModuleState; MODULE_COUNT]) -> ChassisVelocity {
        let solved = self.solve(states.map(|state| state.components()));
        ChassisVelocity::robot_relative(solved.x, solved.y, solved.z)
    }

    /// Robot-relative motion implied by per-module distance deltas.
    ///
    /// Each delta's `angle` is the steering angle the module held while
    /// covering `distance`.
    pub fn to_twist(&self, deltas: &[ModulePosition; MODULE_COUNT]) -> Twist2d {
        let solved = self.solve(deltas.map(|delta| {
            Vector2::new(
                delta.distance * delta.angle.cos(),
                delta.distance * delta.angle.sin(),
            )
        }));
        Twist2d {
            dx: solved.x,
            dy: solved.y,
            dtheta: solved.z,
        }
    }

    fn solve(&self, components: [Vector2<f64>; MODULE_COUNT]) -> SVector<f64, 3> {
        let mut stacked = SVector::<f64, 8>::zeros();
        for (i, component) in components.iter().enumerate() {
            stacked[2 * i] = component.x;
            stacked[2 * i + 1] = component.y;
        }
        self.forward_matrix * stacked
    }

    /// Scales every module speed by the same factor so that none exceeds
    /// `max_speed`, preserving the commanded direction of motion.
    pub fn desaturate(states: &mut [ModuleState; MODULE_COUNT], max_speed: f64) {
        let fastest = states
            .iter()
            .map(|state| state.speed.abs())
            .fold(0.0, f64::max);
        if fastest > max_speed && fastest > 0.0 {
            let scale = max_speed / fastest;
            for state in states.iter_mut() {
                state.speed *= scale;
            }
        }
    }
}
