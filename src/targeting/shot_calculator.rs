use bon::Builder;
use log::warn;
use nalgebra::Vector3;

use super::{bearing_to, distance_to, interpolation::InterpolatingTable, ShotSolution};
use crate::{error::ConfigurationError, geometry::Pose2D};

/// Distance of the single stock calibration point, 5 ft.
const DEFAULT_CALIBRATION_DISTANCE: f64 = 1.524;
const DEFAULT_CALIBRATION_SPEED: f64 = 990.0;

#[derive(Clone, Copy, Debug, PartialEq, Builder)]
pub struct ShotCalculatorConfig {
    /// Lowest speed ever commanded, RPM.
    #[builder(default = 100.0)]
    pub min_speed: f64,

    /// Highest speed ever commanded, RPM.
    #[builder(default = 5600.0)]
    pub max_speed: f64,

    /// Closest distance, in metres, a shot is attempted from.
    #[builder(default = 0.5)]
    pub min_range: f64,

    #[builder(default = 15.0)]
    pub max_range: f64,
}

impl Default for ShotCalculatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ShotCalculatorConfig {
    fn validate(&self) -> Result<(), ConfigurationError> {
        let valid = |min: f64, max: f64| min.is_finite() && max.is_finite() && min <= max;
        if !valid(self.min_speed, self.max_speed) {
            return Err(ConfigurationError::InvalidRange {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if !valid(self.min_range, self.max_range) {
            return Err(ConfigurationError::InvalidRange {
                min: self.min_range,
                max: self.max_range,
            });
        }
        Ok(())
    }
}

/// A speed lookup result. `degenerate` is set when the value is the safety
/// minimum because the calibration table had nothing to offer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RequiredSpeed {
    pub speed: f64,
    pub degenerate: bool,
}

/// Maps target distance to a flywheel speed through a calibration table,
/// clamped to a fixed safety envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct ShotCalculator {
    config: ShotCalculatorConfig,
    table: InterpolatingTable,
}

impl Default for ShotCalculator {
    fn default() -> Self {
        let table = match InterpolatingTable::from_points(&[(
            DEFAULT_CALIBRATION_DISTANCE,
            DEFAULT_CALIBRATION_SPEED,
        )]) {
            Ok(table) => table,
            Err(err) => {
                warn!("stock shot calibration rejected: {err}");
                InterpolatingTable::new()
            }
        };
        Self {
            config: ShotCalculatorConfig::default(),
            table,
        }
    }
}

impl ShotCalculator {
    pub fn new(
        config: ShotCalculatorConfig,
        table: InterpolatingTable,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        if table.is_empty() {
            warn!("shot calibration table is empty, every lookup returns the minimum speed");
        }
        Ok(Self { config, table })
    }

    pub fn config(&self) -> &ShotCalculatorConfig {
        &self.config
    }

    pub fn table(&self) -> &InterpolatingTable {
        &self.table
    }

    pub fn required_speed_for_distance(&self, distance: f64) -> RequiredSpeed {
        match self.table.get(distance) {
            Some(speed) => RequiredSpeed {
                speed: speed.clamp(self.config.min_speed, self.config.max_speed),
                degenerate: false,
            },
            None => {
                if self.table.is_empty() {
                    warn!("no shot calibration, commanding minimum speed");
                }
                RequiredSpeed {
                    speed: self.config.min_speed,
                    degenerate: self.table.is_empty(),
                }
            }
        }
    }

    /// Whether `distance` is inside the configured shooting range. This does
    /// not depend on the calibration table's domain.
    pub fn is_within_effective_range(&self, distance: f64) -> bool {
        (self.config.min_range..=self.config.max_range).contains(&distance)
    }

    /// Everything needed to take a shot at `target` from `pose`. Computed
    /// fresh on every call.
    pub fn solve(&self, pose: &Pose2D, target: &Vector3<f64>) -> ShotSolution {
        let distance = distance_to(pose, target);
        ShotSolution {
            distance,
            bearing: bearing_to(pose, target),
            required_speed: self.required_speed_for_distance(distance),
            in_range: self.is_within_effective_range(distance),
        }
    }
}
