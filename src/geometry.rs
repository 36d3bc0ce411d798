use core::ops::Sub;

use nalgebra::{Rotation2, Vector2, Vector3};
use num_traits::{AsPrimitive, Float, Num};

use crate::utils::math::wrap_angle;

/// A field-relative position and heading.
///
/// The heading is kept in `(-π, π]` by every constructor, so two poses that
/// describe the same orientation compare equal.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Pose2D {
    translation: Vector2<f64>,
    heading: f64,
}

/// A change of pose expressed in the frame of the starting pose.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Twist2d {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

/// The difference between two poses in the field frame, heading wrapped.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct PoseDelta {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

impl Pose2D {
    pub fn new<T: Num + AsPrimitive<f64>, U: Num + AsPrimitive<f64>, V: Num + AsPrimitive<f64>>(
        x: T,
        y: U,
        heading: V,
    ) -> Self {
        Self::from_parts(Vector2::new(x.as_(), y.as_()), heading.as_())
    }

    pub fn from_parts(translation: Vector2<f64>, heading: f64) -> Self {
        Self {
            translation,
            heading: wrap_angle(heading),
        }
    }

    pub fn x(&self) -> f64 {
        self.translation.x
    }

    pub fn y(&self) -> f64 {
        self.translation.y
    }

    /// Heading in radians, counterclockwise from the field +x axis.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn translation(&self) -> Vector2<f64> {
        self.translation
    }

    pub fn is_finite(&self) -> bool {
        self.translation.x.is_finite() && self.translation.y.is_finite() && self.heading.is_finite()
    }

    pub fn distance_to(&self, pose: &Self) -> f64 {
        self.translation.metric_distance(&pose.translation)
    }

    /// Applies a robot-relative twist, integrating along a constant-curvature
    /// arc.
    ///
    /// The arc is replaced by its chord, which has length
    /// `2 sin(dθ/2) / dθ` times the arc length and points along the average
    /// heading of the step.
    pub fn exp(&self, twist: &Twist2d) -> Self {
        let chord_scale = if twist.dtheta.abs() < 1e-9 {
            1.0
        } else {
            2.0 * (twist.dtheta / 2.0).sin() / twist.dtheta
        };
        let average_heading = self.heading + twist.dtheta / 2.0;
        let local = Vector2::new(twist.dx, twist.dy) * chord_scale;
        let global = Rotation2::new(average_heading) * local;
        Self::from_parts(self.translation + global, self.heading + twist.dtheta)
    }

    /// Shifts the pose by a field-frame correction.
    pub fn corrected(&self, delta: &PoseDelta) -> Self {
        Self::from_parts(
            self.translation + Vector2::new(delta.dx, delta.dy),
            self.heading + delta.dtheta,
        )
    }

    /// Interpolates translation linearly and heading along the shorter arc.
    pub fn interpolate(&self, end: &Self, t: f64) -> Self {
        Self::from_parts(
            self.translation.lerp(&end.translation, t),
            crate::utils::math::lerp_angle(self.heading, end.heading, t),
        )
    }
}

impl Sub for Pose2D {
    type Output = PoseDelta;

    fn sub(self, rhs: Self) -> PoseDelta {
        PoseDelta {
            dx: self.translation.x - rhs.translation.x,
            dy: self.translation.y - rhs.translation.y,
            dtheta: crate::utils::math::angle_error(self.heading, rhs.heading),
        }
    }
}

impl From<Vector3<f64>> for Pose2D {
    fn from(vector: Vector3<f64>) -> Self {
        Pose2D::new(vector.x, vector.y, vector.z)
    }
}

impl From<Pose2D> for Vector3<f64> {
    fn from(pose: Pose2D) -> Self {
        Vector3::new(pose.translation.x, pose.translation.y, pose.heading)
    }
}
