use bon::Builder;
use log::{debug, info};
use nalgebra::Vector3;
use num_traits::Float;

use super::{
    history::PoseHistory, odometry::SwerveOdometry, OdometrySample, PoseSample, Tracking,
};
use crate::{
    error::{ConfigurationError, RejectReason},
    geometry::{Pose2D, PoseDelta},
    kinematics::{ModulePosition, SwerveKinematics, MODULE_COUNT},
    utils::math::confidence_weight,
};

#[derive(Clone, Copy, Debug, PartialEq, Builder)]
pub struct EstimatorConfig {
    /// Maximum number of retained odometry poses.
    #[builder(default = 300)]
    pub history_capacity: usize,

    /// Seconds of odometry retained behind the newest sample. Vision samples
    /// captured earlier than this are stale.
    #[builder(default = 2.0)]
    pub history_window: f64,

    /// Seconds without accepted vision for the confidence indicator to fall
    /// to 1/e.
    #[builder(default = 1.0)]
    pub confidence_time_constant: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EstimatorConfig {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.history_capacity < 2 || !(self.history_window > 0.0) {
            return Err(ConfigurationError::InvalidHistory {
                capacity: self.history_capacity,
                window: self.history_window,
            });
        }
        if !(self.confidence_time_constant > 0.0) {
            return Err(ConfigurationError::InvalidTimeConstant(
                self.confidence_time_constant,
            ));
        }
        Ok(())
    }
}

/// Counters for the estimator's sample intake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EstimatorStats {
    pub odometry_applied: u32,
    pub vision_accepted: u32,
    rejected: [u32; RejectReason::ALL.len()],
}

impl EstimatorStats {
    /// Total rejected samples of any kind.
    pub fn rejected(&self) -> u32 {
        self.rejected.iter().sum()
    }

    pub fn rejected_for(&self, reason: RejectReason) -> u32 {
        self.rejected[reason.index()]
    }

    fn record(&mut self, reason: RejectReason) {
        let count = &mut self.rejected[reason.index()];
        *count = count.saturating_add(1);
    }
}

/// Fuses wheel odometry with delayed vision poses.
///
/// Odometry is integrated every cycle and each resulting pose is recorded in
/// a bounded history. A vision pose is compared against the history at its
/// capture time, and a fraction of the residual, `1 / (1 + σ)` per axis, is
/// applied to the live estimate. History is not re-integrated; every
/// retained entry is shifted by the same correction instead.
///
/// Every call either fully applies or fully rejects its input. Rejections
/// are counted in [`EstimatorStats`] and never disturb the estimate.
#[derive(Clone, Debug)]
pub struct PoseEstimator {
    config: EstimatorConfig,
    odometry: SwerveOdometry,
    history: PoseHistory,
    last_odometry_timestamp: Option<f64>,
    last_vision_timestamp: Option<f64>,
    stats: EstimatorStats,
}

impl PoseEstimator {
    pub fn new(
        kinematics: SwerveKinematics,
        initial_pose: Pose2D,
        config: EstimatorConfig,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            config,
            odometry: SwerveOdometry::new(kinematics, initial_pose),
            history: PoseHistory::new(config.history_capacity, config.history_window),
            last_odometry_timestamp: None,
            last_vision_timestamp: None,
            stats: EstimatorStats::default(),
        })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        self.odometry.kinematics()
    }

    pub fn history(&self) -> &PoseHistory {
        &self.history
    }

    pub fn stats(&self) -> EstimatorStats {
        self.stats
    }

    pub fn estimated_pose(&self) -> Pose2D {
        self.odometry.pose()
    }

    /// Integrates one drivetrain reading taken at `timestamp`.
    ///
    /// Samples must arrive in increasing timestamp order; one that is not
    /// newer than the last applied sample is rejected. Module distances are
    /// cumulative, so dropping a sample loses no motion.
    pub fn add_odometry_sample(
        &mut self,
        timestamp: f64,
        gyro_heading: f64,
        module_positions: &[ModulePosition; MODULE_COUNT],
    ) -> Result<(), RejectReason> {
        let result = self.integrate(timestamp, gyro_heading, module_positions);
        if let Err(reason) = result {
            self.record_rejection(reason);
        }
        result
    }

    /// Applies a batch of sub-cycle readings in increasing timestamp order,
    /// whatever order they were delivered in. Returns how many were applied.
    pub fn add_odometry_batch(&mut self, samples: &mut [OdometrySample]) -> usize {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        samples
            .iter()
            .filter(|sample| {
                self.add_odometry_sample(
                    sample.timestamp,
                    sample.gyro_heading,
                    &sample.module_positions,
                )
                .is_ok()
            })
            .count()
    }

    fn integrate(
        &mut self,
        timestamp: f64,
        gyro_heading: f64,
        module_positions: &[ModulePosition; MODULE_COUNT],
    ) -> Result<(), RejectReason> {
        if !timestamp.is_finite() {
            return Err(RejectReason::NonFiniteOdometry);
        }
        if let Some(last) = self.last_odometry_timestamp {
            if timestamp <= last {
                return Err(RejectReason::OutOfOrderOdometry);
            }
        }
        let pose = self.odometry.update(gyro_heading, module_positions)?;
        self.last_odometry_timestamp = Some(timestamp);
        self.history.push(timestamp, pose);
        self.stats.odometry_applied = self.stats.odometry_applied.saturating_add(1);
        Ok(())
    }

    /// Pulls the estimate toward a vision pose captured at `timestamp`.
    ///
    /// `std_devs` are `(x, y, heading)`. Smaller values pull harder; an
    /// infinite value leaves that axis alone. Non-finite poses, NaN or
    /// non-positive deviations, deviations infinite on every axis, and
    /// timestamps older than the retained history are rejected without
    /// touching the estimate.
    pub fn add_vision_measurement(
        &mut self,
        pose: Pose2D,
        timestamp: f64,
        std_devs: Vector3<f64>,
    ) -> Result<(), RejectReason> {
        let result = self.fuse(pose, timestamp, std_devs);
        match result {
            Ok(()) => {
                self.stats.vision_accepted = self.stats.vision_accepted.saturating_add(1);
                self.last_vision_timestamp = Some(
                    self.last_vision_timestamp
                        .map_or(timestamp, |last| last.max(timestamp)),
                );
            }
            Err(reason) => self.record_rejection(reason),
        }
        result
    }

    pub fn add_pose_sample(&mut self, sample: &PoseSample) -> Result<(), RejectReason> {
        self.add_vision_measurement(sample.pose, sample.timestamp, sample.std_devs)
    }

    fn fuse(
        &mut self,
        pose: Pose2D,
        timestamp: f64,
        std_devs: Vector3<f64>,
    ) -> Result<(), RejectReason> {
        if !pose.is_finite() || !timestamp.is_finite() {
            return Err(RejectReason::NonFinitePose);
        }
        // All-infinite deviations carry no information at all.
        if std_devs.iter().any(|std_dev| !(*std_dev > 0.0))
            || std_devs.iter().all(|std_dev| std_dev.is_infinite())
        {
            return Err(RejectReason::InvalidStdDevs);
        }
        let oldest = self
            .history
            .oldest_timestamp()
            .ok_or(RejectReason::NoHistory)?;
        if timestamp < oldest {
            return Err(RejectReason::Stale);
        }
        let odometry_pose = self.history.sample(timestamp).ok_or(RejectReason::Stale)?;

        let residual = pose - odometry_pose;
        let correction = PoseDelta {
            dx: confidence_weight(std_devs.x) * residual.dx,
            dy: confidence_weight(std_devs.y) * residual.dy,
            dtheta: confidence_weight(std_devs.z) * residual.dtheta,
        };
        self.odometry.apply_correction(&correction);
        self.history.shift(&correction);
        Ok(())
    }

    /// Moves the estimate to `pose` and forgets all history, typically at a
    /// match-phase transition.
    pub fn reset_pose(&mut self, pose: Pose2D) {
        info!(
            "pose reset to ({:.3}, {:.3}, {:.3} rad)",
            pose.x(),
            pose.y(),
            pose.heading()
        );
        self.history.clear();
        self.odometry.reset(pose);
        self.last_vision_timestamp = None;
    }

    /// How recently vision has confirmed the estimate, in `[0, 1]`.
    ///
    /// Decays exponentially from 1 at the last accepted vision capture time;
    /// 0 if nothing has been accepted since the last reset. This is an
    /// indicator only and does not change fusion weights.
    pub fn confidence(&self, now: f64) -> f64 {
        match self.last_vision_timestamp {
            Some(last) => (-(now - last).max(0.0) / self.config.confidence_time_constant).exp(),
            None => 0.0,
        }
    }

    pub(crate) fn record_rejection(&mut self, reason: RejectReason) {
        let source = if reason.is_vision() { "vision" } else { "odometry" };
        debug!("rejected {} sample: {}", source, reason);
        self.stats.record(reason);
    }
}

impl Tracking for PoseEstimator {
    fn position(&self) -> Pose2D {
        self.estimated_pose()
    }

    fn set_position(&mut self, position: Pose2D) {
        self.reset_pose(position);
    }
}

#[cfg(test)]
mod tests {
    use core::f64::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;

    use super::*;

    fn estimator() -> PoseEstimator {
        PoseEstimator::new(
            SwerveKinematics::rectangular(0.2794, 0.2794).unwrap(),
            Pose2D::default(),
            EstimatorConfig::default(),
        )
        .unwrap()
    }

    fn straight(distance: f64) -> [ModulePosition; MODULE_COUNT] {
        [ModulePosition::new(distance, 0.0); MODULE_COUNT]
    }

    fn driven(samples: usize) -> PoseEstimator {
        let mut estimator = estimator();
        for i in 0..samples {
            let t = i as f64 * 0.02;
            estimator
                .add_odometry_sample(t, 0.0, &straight(t))
                .unwrap();
        }
        estimator
    }

    #[test]
    fn zero_motion_keeps_pose() {
        let mut estimator = driven(10);
        let before = estimator.estimated_pose();
        estimator
            .add_odometry_sample(1.0, 0.0, &straight(9.0 * 0.02))
            .unwrap();
        assert_eq!(estimator.estimated_pose(), before);
    }

    #[test]
    fn stale_vision_is_rejected_and_counted() {
        let mut estimator = driven(10);
        let before = estimator.estimated_pose();
        assert_eq!(
            estimator.add_vision_measurement(
                Pose2D::new(3.0, 3.0, 1.0),
                -0.5,
                Vector3::new(0.1, 0.1, 0.1)
            ),
            Err(RejectReason::Stale)
        );
        assert_eq!(estimator.estimated_pose(), before);
        assert_eq!(estimator.stats().rejected_for(RejectReason::Stale), 1);
    }

    #[test]
    fn vision_before_any_odometry_is_rejected() {
        let mut estimator = estimator();
        assert_eq!(
            estimator.add_vision_measurement(Pose2D::default(), 0.0, Vector3::repeat(0.1)),
            Err(RejectReason::NoHistory)
        );
    }

    #[test]
    fn malformed_vision_never_touches_estimate() {
        let mut estimator = driven(10);
        let before = estimator.estimated_pose();
        let cases = [
            (Pose2D::new(f64::NAN, 0.0, 0.0), Vector3::repeat(0.1)),
            (Pose2D::new(f64::INFINITY, 0.0, 0.0), Vector3::repeat(0.1)),
            (Pose2D::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.1, 0.1)),
            (Pose2D::new(1.0, 0.0, 0.0), Vector3::new(0.1, -1.0, 0.1)),
            (Pose2D::new(1.0, 0.0, 0.0), Vector3::new(0.1, 0.1, f64::NAN)),
        ];
        for (pose, std_devs) in cases {
            assert!(estimator.add_vision_measurement(pose, 0.1, std_devs).is_err());
        }
        assert_eq!(estimator.estimated_pose(), before);
        assert_eq!(estimator.stats().rejected(), 5);
        assert_eq!(estimator.stats().vision_accepted, 0);
    }

    #[test]
    fn tighter_std_devs_pull_harder() {
        let correction = |std_dev: f64| {
            let mut estimator = driven(10);
            let before = estimator.estimated_pose();
            estimator
                .add_vision_measurement(Pose2D::new(1.0, 0.5, 0.0), 0.1, Vector3::repeat(std_dev))
                .unwrap();
            estimator.estimated_pose().distance_to(&before)
        };
        assert!(correction(0.05) >= correction(0.5));
        assert!(correction(0.5) >= correction(5.0));
        assert!(correction(5.0) > 0.0);
    }

    #[test]
    fn correction_uses_odometry_pose_at_capture_time() {
        let mut estimator = driven(11);
        // Odometry says x = 0.1 at t = 0.1; vision says 0.2. σ = 1 gives w = 0.5.
        estimator
            .add_vision_measurement(Pose2D::new(0.2, 0.0, 0.0), 0.1, Vector3::repeat(1.0))
            .unwrap();
        assert_abs_diff_eq!(estimator.estimated_pose().x(), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn repeated_vision_does_not_overshoot() {
        let mut estimator = driven(11);
        for _ in 0..20 {
            estimator
                .add_vision_measurement(Pose2D::new(0.2, 0.0, 0.0), 0.1, Vector3::repeat(0.01))
                .unwrap();
        }
        assert_abs_diff_eq!(estimator.estimated_pose().x(), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn earlier_capture_after_later_one_does_not_reapply_residual() {
        let mut estimator = estimator();
        for i in 0..11 {
            estimator
                .add_odometry_sample(i as f64 * 0.02, 0.0, &straight(0.0))
                .unwrap();
        }
        let sigma = Vector3::repeat(0.01);
        estimator
            .add_vision_measurement(Pose2D::new(1.0, 0.0, 0.0), 0.10, sigma)
            .unwrap();
        estimator
            .add_vision_measurement(Pose2D::new(1.0, 0.0, 0.0), 0.08, sigma)
            .unwrap();

        let miss = 0.01 / 1.01;
        let x = estimator.estimated_pose().x();
        assert_abs_diff_eq!(x, 1.0 - miss * miss, epsilon = 1e-9);
        assert!(x <= 1.0);
    }

    #[test]
    fn all_infinite_std_devs_are_rejected() {
        let mut estimator = driven(11);
        let before = estimator.estimated_pose();
        assert_eq!(
            estimator.add_vision_measurement(
                Pose2D::new(0.2, 0.0, 0.5),
                0.1,
                Vector3::repeat(f64::INFINITY)
            ),
            Err(RejectReason::InvalidStdDevs)
        );
        assert_eq!(estimator.estimated_pose(), before);
        assert_eq!(estimator.stats().vision_accepted, 0);
        assert_eq!(estimator.stats().rejected_for(RejectReason::InvalidStdDevs), 1);
        assert_eq!(estimator.confidence(0.1), 0.0);
    }

    #[test]
    fn fused_heading_is_bit_identical_after_zero_delta() {
        let mut estimator = estimator();
        estimator.add_odometry_sample(0.0, 12.345678, &straight(0.0)).unwrap();
        estimator.add_odometry_sample(0.02, 12.345678, &straight(0.0)).unwrap();
        estimator
            .add_vision_measurement(
                Pose2D::new(0.0, 0.0, 0.5),
                0.01,
                Vector3::new(0.1, 0.1, 0.3),
            )
            .unwrap();
        let before = estimator.estimated_pose();
        assert!(before.heading() > 0.0);

        estimator.add_odometry_sample(0.04, 12.345678, &straight(0.0)).unwrap();
        let after = estimator.estimated_pose();
        assert_eq!(after.heading().to_bits(), before.heading().to_bits());
        assert_eq!(after.x().to_bits(), before.x().to_bits());
        assert_eq!(after.y().to_bits(), before.y().to_bits());
    }

    #[test]
    fn infinite_heading_std_dev_leaves_heading_alone() {
        let mut estimator = driven(11);
        estimator
            .add_vision_measurement(
                Pose2D::new(0.2, 0.0, FRAC_PI_2),
                0.1,
                Vector3::new(0.1, 0.1, f64::INFINITY),
            )
            .unwrap();
        assert_eq!(estimator.estimated_pose().heading(), 0.0);
        assert!(estimator.estimated_pose().x() > 0.2);
    }

    #[test]
    fn heading_fusion_is_circular() {
        let mut estimator = estimator();
        estimator.reset_pose(Pose2D::new(0.0, 0.0, 179f64.to_radians()));
        estimator.add_odometry_sample(0.0, 0.0, &straight(0.0)).unwrap();
        estimator
            .add_vision_measurement(
                Pose2D::new(0.0, 0.0, (-179f64).to_radians()),
                0.0,
                Vector3::new(1.0, 1.0, 1.0),
            )
            .unwrap();
        assert_abs_diff_eq!(
            estimator.estimated_pose().heading().abs(),
            180f64.to_radians(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn out_of_order_batch_is_sorted() {
        let mut estimator = estimator();
        let mut batch = [0.06, 0.02, 0.04, 0.0].map(|t| OdometrySample {
            timestamp: t,
            gyro_heading: 0.0,
            module_positions: straight(t * 10.0),
        });
        assert_eq!(estimator.add_odometry_batch(&mut batch), 4);
        assert_abs_diff_eq!(estimator.estimated_pose().x(), 0.6, epsilon = 1e-9);
        assert_eq!(estimator.history().len(), 4);
    }

    #[test]
    fn late_single_sample_is_rejected() {
        let mut estimator = driven(5);
        assert_eq!(
            estimator.add_odometry_sample(0.01, 0.0, &straight(5.0)),
            Err(RejectReason::OutOfOrderOdometry)
        );
        assert_eq!(
            estimator.stats().rejected_for(RejectReason::OutOfOrderOdometry),
            1
        );
    }

    #[test]
    fn reset_clears_history_and_moves_pose() {
        let mut estimator = driven(10);
        estimator.set_position(Pose2D::new(5.0, 5.0, 1.0));
        assert!(estimator.history().is_empty());
        assert_eq!(estimator.position(), Pose2D::new(5.0, 5.0, 1.0));
        estimator
            .add_odometry_sample(1.0, 0.0, &straight(9.0 * 0.02))
            .unwrap();
        assert_abs_diff_eq!(estimator.estimated_pose().x(), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(estimator.estimated_pose().heading(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn confidence_decays_without_vision() {
        let mut estimator = driven(11);
        assert_eq!(estimator.confidence(0.2), 0.0);
        estimator
            .add_vision_measurement(Pose2D::new(0.2, 0.0, 0.0), 0.1, Vector3::repeat(0.1))
            .unwrap();
        assert_abs_diff_eq!(estimator.confidence(0.1), 1.0);
        assert!(estimator.confidence(0.6) < estimator.confidence(0.2));
        assert_abs_diff_eq!(estimator.confidence(1.1), (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn invalid_config_fails_fast() {
        let config = EstimatorConfig::builder().history_capacity(1).build();
        assert!(matches!(
            PoseEstimator::new(
                SwerveKinematics::rectangular(0.3, 0.3).unwrap(),
                Pose2D::default(),
                config
            ),
            Err(ConfigurationError::InvalidHistory { .. })
        ));
    }
}
