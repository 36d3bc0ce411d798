use alloc::{vec, vec::Vec};

use bon::Builder;
use nalgebra::Vector3;
use num_traits::Float;

use super::{PoseSolveKind, VisionObservation};
use crate::{error::RejectReason, field::FieldLayout, geometry::Pose2D, tracking::PoseSample};

#[derive(Clone, Debug, PartialEq, Builder)]
pub struct VisionFilterConfig {
    /// Single-tag solves more ambiguous than this are dropped.
    #[builder(default = 0.3)]
    pub max_ambiguity: f64,

    /// Metres of reported height tolerated before a solve is dropped.
    #[builder(default = 0.75)]
    pub max_z_error: f64,

    /// Linear standard deviation of one tag at 1 m, metres.
    #[builder(default = 0.02)]
    pub linear_std_dev_baseline: f64,

    /// Angular standard deviation of one tag at 1 m, radians.
    #[builder(default = 0.06)]
    pub angular_std_dev_baseline: f64,

    /// Per-camera multipliers on both deviations. Cameras without an entry
    /// use 1.0.
    #[builder(default = vec![1.0, 1.0])]
    pub camera_std_dev_factors: Vec<f64>,

    #[builder(default = 0.5)]
    pub heading_constrained_linear_factor: f64,
}

impl Default for VisionFilterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Quality gate between the camera pipeline and the estimator.
///
/// Turns a raw observation into a [`PoseSample`] whose standard deviations
/// grow with the square of tag distance and shrink with tag count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisionFilter {
    config: VisionFilterConfig,
}

impl VisionFilter {
    pub fn new(config: VisionFilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VisionFilterConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        observation: &VisionObservation,
        field: &FieldLayout,
    ) -> Result<PoseSample, RejectReason> {
        let finite = [
            observation.timestamp,
            observation.x,
            observation.y,
            observation.z,
            observation.heading,
            observation.ambiguity,
            observation.average_tag_distance,
        ]
        .iter()
        .all(|value| value.is_finite());
        if !finite {
            return Err(RejectReason::NonFinitePose);
        }
        if observation.tag_count == 0 {
            return Err(RejectReason::NoTags);
        }
        if observation.tag_count == 1 && observation.ambiguity > self.config.max_ambiguity {
            return Err(RejectReason::Ambiguous);
        }
        if observation.z.abs() > self.config.max_z_error {
            return Err(RejectReason::ZError);
        }
        if !field.contains(observation.x, observation.y) {
            return Err(RejectReason::OutsideField);
        }

        Ok(PoseSample {
            pose: Pose2D::new(observation.x, observation.y, observation.heading),
            timestamp: observation.timestamp,
            std_devs: self.std_devs(observation),
        })
    }

    fn std_devs(&self, observation: &VisionObservation) -> Vector3<f64> {
        let distance = observation.average_tag_distance;
        let camera_factor = self
            .config
            .camera_std_dev_factors
            .get(observation.camera)
            .copied()
            .unwrap_or(1.0);
        let scale = distance * distance / observation.tag_count as f64 * camera_factor;

        let mut linear = self.config.linear_std_dev_baseline * scale;
        let angular = match observation.kind {
            PoseSolveKind::FullSolve => self.config.angular_std_dev_baseline * scale,
            PoseSolveKind::HeadingConstrained => {
                linear *= self.config.heading_constrained_linear_factor;
                f64::INFINITY
            }
        };
        // A tag at the lens would otherwise claim perfect certainty.
        let linear = linear.max(f64::EPSILON);
        Vector3::new(linear, linear, angular.max(f64::EPSILON))
    }
}
