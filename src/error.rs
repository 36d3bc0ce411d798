use thiserror::Error;

/// A construction-time problem that cannot be corrected while running.
///
/// Returned from constructors so the host fails at boot instead of driving
/// with a broken estimator.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigurationError {
    #[error("module offset {index} is not finite")]
    NonFiniteModuleOffset { index: usize },

    #[error("module offsets {first} and {second} coincide")]
    DuplicateModuleOffset { first: usize, second: usize },

    #[error("module offsets do not span the chassis plane")]
    SingularModuleGeometry,

    #[error("calibration point ({distance}, {value}) is not finite")]
    NonFiniteCalibrationPoint { distance: f64, value: f64 },

    #[error("range [{min}, {max}] is empty or not finite")]
    InvalidRange { min: f64, max: f64 },

    #[error("history must hold at least 2 entries over a positive window, got {capacity} over {window} s")]
    InvalidHistory { capacity: usize, window: f64 },

    #[error("confidence time constant must be positive, got {0}")]
    InvalidTimeConstant(f64),

    #[error("field dimensions {length} x {width} must be positive")]
    InvalidField { length: f64, width: f64 },
}

/// Why a sensor sample was dropped.
///
/// These never propagate past the estimator; they are counted and logged so
/// the control loop keeps running on bad input.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    #[error("pose or timestamp is not finite")]
    NonFinitePose,

    #[error("standard deviations must be positive")]
    InvalidStdDevs,

    #[error("sample is older than the retained history")]
    Stale,

    #[error("no odometry history to compare against")]
    NoHistory,

    #[error("odometry sample is not newer than the last applied sample")]
    OutOfOrderOdometry,

    #[error("odometry reading is not finite")]
    NonFiniteOdometry,

    #[error("observation saw no tags")]
    NoTags,

    #[error("single-tag observation is too ambiguous")]
    Ambiguous,

    #[error("observed height is too far from the floor")]
    ZError,

    #[error("observed pose is outside the field")]
    OutsideField,
}

impl RejectReason {
    pub const ALL: [RejectReason; 10] = [
        RejectReason::NonFinitePose,
        RejectReason::InvalidStdDevs,
        RejectReason::Stale,
        RejectReason::NoHistory,
        RejectReason::OutOfOrderOdometry,
        RejectReason::NonFiniteOdometry,
        RejectReason::NoTags,
        RejectReason::Ambiguous,
        RejectReason::ZError,
        RejectReason::OutsideField,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the sample came from the vision pipeline rather than odometry.
    pub fn is_vision(self) -> bool {
        !matches!(
            self,
            RejectReason::OutOfOrderOdometry | RejectReason::NonFiniteOdometry
        )
    }
}

/// A device read that did not produce a value this cycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device is disconnected")]
    Disconnected,

    #[error("device returned an invalid reading")]
    InvalidReading,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reason_indices_match_table() {
        for (i, reason) in RejectReason::ALL.iter().enumerate() {
            assert_eq!(reason.index(), i);
        }
    }

    #[test]
    fn odometry_reasons_are_not_vision() {
        assert!(!RejectReason::OutOfOrderOdometry.is_vision());
        assert!(RejectReason::Ambiguous.is_vision());
    }
}
