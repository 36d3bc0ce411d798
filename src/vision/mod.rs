pub mod filter;

use alloc::{collections::VecDeque, vec::Vec};

pub use self::filter::{VisionFilter, VisionFilterConfig};

/// How the camera pipeline solved for the robot pose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PoseSolveKind {
    /// Position and heading solved from the tags alone.
    #[default]
    FullSolve,
    /// Solved with the robot's own gyro heading as a constraint; the heading
    /// carries no new information.
    HeadingConstrained,
}

/// A raw robot pose reported by one camera, before any quality gating.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VisionObservation {
    /// Capture time on the shared monotonic clock, seconds.
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    /// Height of the solved pose; a grounded robot should be near zero.
    pub z: f64,
    pub heading: f64,
    /// Pose ambiguity of a single-tag solve, 0 to 1.
    pub ambiguity: f64,
    pub tag_count: u32,
    /// Mean camera-to-tag distance, metres.
    pub average_tag_distance: f64,
    pub kind: PoseSolveKind,
    /// Index into the filter's per-camera trust factors.
    pub camera: usize,
}

/// Producer of vision observations, drained once per control cycle.
///
/// Implementations that are fed from another thread do their own
/// synchronisation; the estimator only ever sees the drained batch.
pub trait VisionSource {
    /// Moves every pending observation into `out`.
    fn drain(&mut self, out: &mut Vec<VisionObservation>);
}

/// An owned FIFO of observations that the host fills between ticks.
#[derive(Clone, Debug, Default)]
pub struct VisionQueue {
    pending: VecDeque<VisionObservation>,
}

impl VisionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observation: VisionObservation) {
        self.pending.push_back(observation);
    }
}

impl VisionSource for VisionQueue {
    fn drain(&mut self, out: &mut Vec<VisionObservation>) {
        out.extend(self.pending.drain(..));
    }
}
