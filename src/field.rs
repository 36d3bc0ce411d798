use core::f64::consts::PI;

use bon::Builder;
use nalgebra::{Vector2, Vector3};

use crate::{error::ConfigurationError, geometry::Pose2D, utils::AllianceColor};

/// How the red half of the field relates to the blue half.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldSymmetry {
    /// Reflected across the centre line between the driver stations.
    #[default]
    Mirrored,
    /// Rotated 180° about the field centre.
    Rotational,
}

/// Field dimensions and landmarks, authored from the blue alliance's side.
///
/// Red coordinates are produced by flipping; nothing here is stored twice.
#[derive(Clone, Copy, Debug, PartialEq, Builder)]
pub struct FieldLayout {
    /// Metres along x, between the driver station walls.
    #[builder(default = 16.541)]
    pub length: f64,

    /// Metres along y.
    #[builder(default = 8.069)]
    pub width: f64,

    #[builder(default)]
    pub symmetry: FieldSymmetry,

    /// Blue alliance hub centre, height included.
    #[builder(default = Vector3::new(4.6256, 4.0345, 1.8288))]
    pub hub: Vector3<f64>,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FieldLayout {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.length > 0.0 && self.length.is_finite())
            || !(self.width > 0.0 && self.width.is_finite())
        {
            return Err(ConfigurationError::InvalidField {
                length: self.length,
                width: self.width,
            });
        }
        Ok(())
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.length).contains(&x) && (0.0..=self.width).contains(&y)
    }

    /// Expresses a blue-side translation as seen by `alliance`.
    pub fn flip_translation(&self, translation: Vector2<f64>, alliance: AllianceColor) -> Vector2<f64> {
        if alliance != AllianceColor::Red {
            return translation;
        }
        match self.symmetry {
            FieldSymmetry::Mirrored => Vector2::new(self.length - translation.x, translation.y),
            FieldSymmetry::Rotational => {
                Vector2::new(self.length - translation.x, self.width - translation.y)
            }
        }
    }

    /// Flips a pose. Applying the same flip twice gives back the same pose.
    pub fn flip_pose(&self, pose: &Pose2D, alliance: AllianceColor) -> Pose2D {
        if alliance != AllianceColor::Red {
            return *pose;
        }
        let heading = match self.symmetry {
            FieldSymmetry::Mirrored => PI - pose.heading(),
            FieldSymmetry::Rotational => pose.heading() + PI,
        };
        Pose2D::from_parts(self.flip_translation(pose.translation(), alliance), heading)
    }

    /// Flips a 3-D landmark; height is unaffected.
    pub fn flip_point(&self, point: Vector3<f64>, alliance: AllianceColor) -> Vector3<f64> {
        let flat = self.flip_translation(point.xy(), alliance);
        Vector3::new(flat.x, flat.y, point.z)
    }

    /// The hub `alliance` scores into.
    pub fn alliance_hub(&self, alliance: AllianceColor) -> Vector3<f64> {
        self.flip_point(self.hub, alliance)
    }

    pub fn opposing_hub(&self, alliance: AllianceColor) -> Vector3<f64> {
        self.alliance_hub(alliance.opponent())
    }
}
