use alloc::collections::VecDeque;

use crate::{
    geometry::{Pose2D, PoseDelta},
    ilerp,
};

/// A bounded, time-ordered record of recent pose estimates.
///
/// Entries are dropped from the front once the buffer exceeds either its
/// entry capacity or its time window, so lookups stay bounded no matter how
/// fast odometry arrives.
#[derive(Clone, Debug)]
pub struct PoseHistory {
    entries: VecDeque<(f64, Pose2D)>,
    capacity: usize,
    window: f64,
}

impl PoseHistory {
    /// `window` is in seconds, measured back from the newest entry.
    pub fn new(capacity: usize, window: f64) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            window,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn oldest_timestamp(&self) -> Option<f64> {
        self.entries.front().map(|(timestamp, _)| *timestamp)
    }

    pub fn newest(&self) -> Option<(f64, Pose2D)> {
        self.entries.back().copied()
    }

    /// Appends a pose. Returns `false` and leaves the buffer untouched if
    /// `timestamp` is not newer than the newest entry.
    pub fn push(&mut self, timestamp: f64, pose: Pose2D) -> bool {
        if let Some((newest, _)) = self.entries.back() {
            if timestamp <= *newest {
                return false;
            }
        }
        self.entries.push_back((timestamp, pose));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        while let Some((oldest, _)) = self.entries.front() {
            if timestamp - *oldest > self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
        true
    }

    /// The pose at `timestamp`.
    ///
    /// `None` if the buffer is empty or `timestamp` predates the oldest entry.
    /// Timestamps past the newest entry return the newest pose; anything in
    /// between is interpolated from the two bracketing entries.
    pub fn sample(&self, timestamp: f64) -> Option<Pose2D> {
        let (oldest, first) = *self.entries.front()?;
        if timestamp < oldest {
            return None;
        }
        if timestamp == oldest {
            return Some(first);
        }
        let upper = self.entries.partition_point(|(t, _)| *t < timestamp);
        if upper == self.entries.len() {
            return self.newest().map(|(_, pose)| pose);
        }
        let (t1, p1) = self.entries[upper];
        let (t0, p0) = self.entries[upper - 1];
        if t1 == timestamp {
            return Some(p1);
        }
        Some(p0.interpolate(&p1, ilerp!(t0, t1, timestamp)))
    }

    /// Applies `correction` to every retained entry.
    ///
    /// The history then describes the corrected trajectory, so a later
    /// vision sample sees the correction no matter when it was captured and
    /// does not apply the same residual again.
    pub fn shift(&mut self, correction: &PoseDelta) {
        for (_, pose) in self.entries.iter_mut() {
            *pose = pose.corrected(correction);
        }
    }
}
