use crate::{
    error::RejectReason,
    geometry::{Pose2D, PoseDelta},
    kinematics::{ModulePosition, SwerveKinematics, MODULE_COUNT},
};

/// Dead reckoning from swerve module positions and a gyro.
///
/// Translation is integrated from the change in each module's drive distance
/// since the previous reading. Heading changes come only from the change in
/// gyro heading, so wheel slip never leaks into the heading and a
/// correction or reset stays in place until the gyro actually turns.
#[derive(Clone, Debug)]
pub struct SwerveOdometry {
    kinematics: SwerveKinematics,
    pose: Pose2D,
    prev_gyro_heading: Option<f64>,
    prev_module_positions: Option<[ModulePosition; MODULE_COUNT]>,
}

impl SwerveOdometry {
    pub fn new(kinematics: SwerveKinematics, initial_pose: Pose2D) -> Self {
        Self {
            kinematics,
            pose: initial_pose,
            prev_gyro_heading: None,
            prev_module_positions: None,
        }
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    /// Integrates one reading. `gyro_heading` must be continuous (unwrapped)
    /// across calls.
    ///
    /// The first reading after construction only anchors the baselines. A
    /// reading with any non-finite value is rejected and the previous
    /// baselines are kept.
    pub fn update(
        &mut self,
        gyro_heading: f64,
        positions: &[ModulePosition; MODULE_COUNT],
    ) -> Result<Pose2D, RejectReason> {
        if !gyro_heading.is_finite() || positions.iter().any(|position| !position.is_finite()) {
            return Err(RejectReason::NonFiniteOdometry);
        }

        let (Some(prev_gyro_heading), Some(prev_positions)) =
            (self.prev_gyro_heading, self.prev_module_positions)
        else {
            self.prev_gyro_heading = Some(gyro_heading);
            self.prev_module_positions = Some(*positions);
            return Ok(self.pose);
        };

        let deltas: [ModulePosition; MODULE_COUNT] = core::array::from_fn(|i| {
            ModulePosition::new(
                positions[i].distance - prev_positions[i].distance,
                positions[i].angle,
            )
        });
        let mut twist = self.kinematics.to_twist(&deltas);
        twist.dtheta = gyro_heading - prev_gyro_heading;

        self.pose = self.pose.exp(&twist);
        self.prev_gyro_heading = Some(gyro_heading);
        self.prev_module_positions = Some(*positions);
        Ok(self.pose)
    }

    /// Moves the estimate to `pose`. The latest readings become the new
    /// baseline, so only motion after the reset is integrated.
    pub fn reset(&mut self, pose: Pose2D) {
        self.pose = pose;
    }

    /// Shifts the estimate by a field-frame correction.
    pub fn apply_correction(&mut self, correction: &PoseDelta) {
        self.pose = self.pose.corrected(correction);
    }
}

#[cfg(test)]
mod tests {
    use core::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_abs_diff_eq;

    use super::*;

    fn odometry() -> SwerveOdometry {
        SwerveOdometry::new(
            SwerveKinematics::rectangular(0.3, 0.3).unwrap(),
            Pose2D::default(),
        )
    }

    fn positions(distance: f64, angle: f64) -> [ModulePosition; MODULE_COUNT] {
        [ModulePosition::new(distance, angle); MODULE_COUNT]
    }

    #[test]
    fn zero_deltas_leave_pose_unchanged() {
        let mut odometry = odometry();
        odometry.update(0.4, &positions(1.0, 0.3)).unwrap();
        let before = odometry.pose();
        odometry.update(0.4, &positions(1.0, 0.3)).unwrap();
        assert_eq!(odometry.pose(), before);
    }

    #[test]
    fn first_reading_anchors_heading_to_initial_pose() {
        let mut odometry = SwerveOdometry::new(
            SwerveKinematics::rectangular(0.3, 0.3).unwrap(),
            Pose2D::new(1.0, 2.0, FRAC_PI_2),
        );
        let pose = odometry.update(PI, &positions(5.0, 0.0)).unwrap();
        assert_eq!(pose, Pose2D::new(1.0, 2.0, FRAC_PI_2));
        let pose = odometry.update(PI + 0.1, &positions(5.0, 0.0)).unwrap();
        assert_abs_diff_eq!(pose.heading(), FRAC_PI_2 + 0.1, epsilon = 1e-12);
    }

    #[test]
    fn drives_forward_in_field_frame() {
        let mut odometry = odometry();
        odometry.update(FRAC_PI_2, &positions(0.0, 0.0)).unwrap();
        odometry.reset(Pose2D::new(0.0, 0.0, FRAC_PI_2));
        let pose = odometry.update(FRAC_PI_2, &positions(1.5, 0.0)).unwrap();
        assert_abs_diff_eq!(pose.x(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pose.y(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn heading_follows_gyro_not_wheels() {
        let mut odometry = odometry();
        odometry.update(0.0, &positions(0.0, 0.0)).unwrap();
        // Wheels report a pure spin, gyro says no rotation.
        let spin: [ModulePosition; MODULE_COUNT] = core::array::from_fn(|i| {
            let offset = odometry.kinematics().offsets()[i];
            ModulePosition::new(0.1, offset.y.atan2(offset.x) + FRAC_PI_2)
        });
        let pose = odometry.update(0.0, &spin).unwrap();
        assert_abs_diff_eq!(pose.heading(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn non_finite_reading_is_rejected() {
        let mut odometry = odometry();
        odometry.update(0.0, &positions(0.0, 0.0)).unwrap();
        assert_eq!(
            odometry.update(f64::NAN, &positions(1.0, 0.0)),
            Err(RejectReason::NonFiniteOdometry)
        );
        let pose = odometry.update(0.0, &positions(1.0, 0.0)).unwrap();
        assert_abs_diff_eq!(pose.x(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn heading_correction_survives_next_update() {
        let mut odometry = odometry();
        odometry.update(0.0, &positions(0.0, 0.0)).unwrap();
        odometry.apply_correction(&PoseDelta {
            dx: 0.0,
            dy: 0.0,
            dtheta: 0.1,
        });
        let pose = odometry.update(0.0, &positions(0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(pose.heading(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn corrected_heading_is_bit_identical_after_zero_delta() {
        let mut odometry = odometry();
        odometry.update(12.345678, &positions(0.0, 0.0)).unwrap();
        odometry.apply_correction(&PoseDelta {
            dx: 0.0,
            dy: 0.0,
            dtheta: 0.3 / 1.3,
        });
        let before = odometry.pose();
        let after = odometry.update(12.345678, &positions(0.0, 0.0)).unwrap();
        assert_eq!(after.heading().to_bits(), before.heading().to_bits());
        assert_eq!(after.x().to_bits(), before.x().to_bits());
    }
}
