use alloc::vec::Vec;

use bon::bon;
use nalgebra::{Vector2, Vector3};

use crate::{
    error::ConfigurationError,
    field::FieldLayout,
    geometry::Pose2D,
    kinematics::{ChassisVelocity, ModuleState, SwerveKinematics, MODULE_COUNT},
    targeting::{
        bearing_to, distance_to, heading_error, shot_calculator::ShotCalculator, RequiredSpeed,
        ShotSolution,
    },
    tracking::{
        estimator::{EstimatorConfig, EstimatorStats, PoseEstimator},
        OdometrySample,
    },
    utils::AllianceColor,
    vision::{VisionFilter, VisionObservation, VisionSource},
};

/// Everything the drivetrain reports in one control cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrivetrainInputs {
    /// Odometry readings taken since the last cycle, in any order.
    pub odometry: Vec<OdometrySample>,
    /// Latest measured module states, for velocity queries.
    pub module_states: [ModuleState; MODULE_COUNT],
}

/// The robot's shared picture of where it is and what it is aiming at.
///
/// Owned by the host's composition root and handed by reference to anything
/// that needs the pose. The host calls [`RobotState::tick`] once per control
/// cycle; every query between ticks reads the state that tick produced.
pub struct RobotState {
    estimator: PoseEstimator,
    field: FieldLayout,
    vision_filter: VisionFilter,
    shot_calculator: ShotCalculator,
    alliance: AllianceColor,
    module_states: [ModuleState; MODULE_COUNT],
    last_tick: Option<f64>,
    observations: Vec<VisionObservation>,
}

#[bon]
impl RobotState {
    #[builder]
    pub fn new(
        module_offsets: [Vector2<f64>; MODULE_COUNT],
        initial_pose: Option<Pose2D>,
        estimator_config: Option<EstimatorConfig>,
        field: Option<FieldLayout>,
        vision_filter: Option<VisionFilter>,
        shot_calculator: Option<ShotCalculator>,
        #[builder(default)] alliance: AllianceColor,
    ) -> Result<Self, ConfigurationError> {
        let field = field.unwrap_or_default();
        field.validate()?;
        let estimator = PoseEstimator::new(
            SwerveKinematics::new(module_offsets)?,
            initial_pose.unwrap_or_default(),
            estimator_config.unwrap_or_default(),
        )?;

        Ok(Self {
            estimator,
            field,
            vision_filter: vision_filter.unwrap_or_default(),
            shot_calculator: shot_calculator.unwrap_or_default(),
            alliance,
            module_states: [ModuleState::default(); MODULE_COUNT],
            last_tick: None,
            observations: Vec::new(),
        })
    }
}

impl RobotState {
    /// Runs one control cycle at time `now`.
    ///
    /// Odometry is applied first so that vision captured during this cycle
    /// has history to be compared against. Vision is applied oldest first.
    pub fn tick(&mut self, now: f64, mut inputs: DrivetrainInputs, vision: &mut dyn VisionSource) {
        self.estimator.add_odometry_batch(&mut inputs.odometry);
        self.module_states = inputs.module_states;
        self.last_tick = Some(now);

        let mut observations = core::mem::take(&mut self.observations);
        observations.clear();
        vision.drain(&mut observations);
        observations.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        for observation in &observations {
            match self.vision_filter.evaluate(observation, &self.field) {
                Ok(sample) => {
                    let _ = self.estimator.add_pose_sample(&sample);
                }
                Err(reason) => self.estimator.record_rejection(reason),
            }
        }
        self.observations = observations;
    }

    pub fn estimator(&self) -> &PoseEstimator {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut PoseEstimator {
        &mut self.estimator
    }

    pub fn field(&self) -> &FieldLayout {
        &self.field
    }

    pub fn shot_calculator(&self) -> &ShotCalculator {
        &self.shot_calculator
    }

    pub fn estimated_pose(&self) -> Pose2D {
        self.estimator.estimated_pose()
    }

    pub fn reset_pose(&mut self, pose: Pose2D) {
        self.estimator.reset_pose(pose);
    }

    pub fn stats(&self) -> EstimatorStats {
        self.estimator.stats()
    }

    /// Vision confidence as of the last tick.
    pub fn confidence(&self) -> f64 {
        self.last_tick
            .map_or(0.0, |now| self.estimator.confidence(now))
    }

    pub fn alliance(&self) -> AllianceColor {
        self.alliance
    }

    pub fn set_alliance(&mut self, alliance: AllianceColor) {
        self.alliance = alliance;
    }

    pub fn robot_relative_velocity(&self) -> ChassisVelocity {
        self.estimator.kinematics().forward(&self.module_states)
    }

    pub fn field_relative_velocity(&self) -> ChassisVelocity {
        self.robot_relative_velocity()
            .to_field_relative(self.estimated_pose().heading())
    }

    pub fn alliance_hub(&self) -> Vector3<f64> {
        self.field.alliance_hub(self.alliance)
    }

    pub fn opposing_hub(&self) -> Vector3<f64> {
        self.field.opposing_hub(self.alliance)
    }

    pub fn distance_to_alliance_hub(&self) -> f64 {
        distance_to(&self.estimated_pose(), &self.alliance_hub())
    }

    pub fn distance_to_opposing_hub(&self) -> f64 {
        distance_to(&self.estimated_pose(), &self.opposing_hub())
    }

    /// Absolute field bearing to our hub.
    pub fn angle_to_alliance_hub(&self) -> f64 {
        bearing_to(&self.estimated_pose(), &self.alliance_hub())
    }

    /// Rotation needed to face our hub.
    pub fn heading_error_to_alliance_hub(&self) -> f64 {
        heading_error(&self.estimated_pose(), &self.alliance_hub())
    }

    pub fn required_speed_for_distance(&self, distance: f64) -> RequiredSpeed {
        self.shot_calculator.required_speed_for_distance(distance)
    }

    pub fn is_within_effective_range(&self, distance: f64) -> bool {
        self.shot_calculator.is_within_effective_range(distance)
    }

    pub fn shot_for_alliance_hub(&self) -> ShotSolution {
        self.shot_calculator
            .solve(&self.estimated_pose(), &self.alliance_hub())
    }
}
