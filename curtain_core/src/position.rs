//! Position/threshold model.
//!
//! All positions are signed rotations of the output shaft. The record keeps
//! `left <= current <= right` after every mutation that goes through this
//! module; every motion entry point plans through [`PositionRecord::plan_move`].

use crate::error::{CommandError, Side};

/// Factory value of the left threshold; also the "not calibrated" marker.
pub const DEFAULT_LEFT: f32 = -100.0;
/// Factory value of the right threshold; also the "not calibrated" marker.
pub const DEFAULT_RIGHT: f32 = 100.0;
/// Tolerance for comparing a threshold against its sentinel.
pub const THRESHOLD_EPSILON: f32 = 1e-5;
/// Travel (rotations) below which a reconciliation leaves `current` alone.
pub const TRAVEL_EPSILON: f32 = 1e-5;

/// The persisted four-value position record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRecord {
    pub left: f32,
    /// `current` as it was before the most recent move or stop.
    pub previous: f32,
    /// Authoritative only while the motor is idle.
    pub current: f32,
    pub right: f32,
}

impl Default for PositionRecord {
    fn default() -> Self {
        Self {
            left: DEFAULT_LEFT,
            previous: 0.0,
            current: 0.0,
            right: DEFAULT_RIGHT,
        }
    }
}

/// Output of [`PositionRecord::plan_move`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovePlan {
    /// Rotations the motor is actually commanded to travel.
    pub clamped_delta: f32,
    /// Record to persist before the motor command is issued.
    pub record: PositionRecord,
}

impl PositionRecord {
    pub fn is_left_set(&self) -> bool {
        (self.left - DEFAULT_LEFT).abs() > THRESHOLD_EPSILON
    }

    pub fn is_right_set(&self) -> bool {
        (self.right - DEFAULT_RIGHT).abs() > THRESHOLD_EPSILON
    }

    /// `left <= current <= right`, all finite.
    pub fn is_consistent(&self) -> bool {
        [self.left, self.previous, self.current, self.right]
            .iter()
            .all(|v| v.is_finite())
            && self.left <= self.current
            && self.current <= self.right
    }

    /// Clamp `current + requested_delta` into `[left, right]`.
    ///
    /// The returned delta is always `new.current - old.current`, so it is what
    /// the motor must traverse to make the record true. A non-finite request
    /// plans a zero move. Busy-motor rejection is the caller's job.
    pub fn plan_move(&self, requested_delta: f32) -> MovePlan {
        let target = if requested_delta.is_finite() {
            self.current + requested_delta
        } else {
            self.current
        };
        let new_current = if target < self.left {
            self.left
        } else if target > self.right {
            self.right
        } else {
            target
        };
        MovePlan {
            clamped_delta: new_current - self.current,
            record: PositionRecord {
                previous: self.current,
                current: new_current,
                ..*self
            },
        }
    }

    /// Rebuild `current` from the hardware step counter after a halt.
    ///
    /// `current = previous + raw / steps_per_revolution` when the travel is
    /// non-negligible, otherwise `current` is kept. The result stays inside
    /// `[left, right]`.
    pub fn reconcile_after_stop(&self, raw_steps_traveled: i64, steps_per_revolution: u32) -> Self {
        let moved = raw_steps_traveled as f32 / steps_per_revolution.max(1) as f32;
        let mut next = *self;
        if moved.abs() > TRAVEL_EPSILON {
            next.current = (self.previous + moved).max(self.left).min(self.right);
        }
        next
    }

    /// Set the left threshold, defaulting to the current position.
    pub fn set_left(&mut self, value: Option<f32>) -> Result<f32, CommandError> {
        let v = value.unwrap_or(self.current);
        if !v.is_finite() || v > self.right || v > self.current {
            return Err(CommandError::InvalidThreshold(format!(
                "{} = {v} must be <= current ({}) and <= right ({})",
                Side::Left,
                self.current,
                self.right
            )));
        }
        self.left = v;
        Ok(v)
    }

    /// Set the right threshold, defaulting to the current position.
    pub fn set_right(&mut self, value: Option<f32>) -> Result<f32, CommandError> {
        let v = value.unwrap_or(self.current);
        if !v.is_finite() || v < self.left || v < self.current {
            return Err(CommandError::InvalidThreshold(format!(
                "{} = {v} must be >= current ({}) and >= left ({})",
                Side::Right,
                self.current,
                self.left
            )));
        }
        self.right = v;
        Ok(v)
    }

    /// Restore the left sentinel. A right threshold below it is restored as
    /// well, and a position outside the new range is pulled onto its edge.
    pub fn reset_left(&mut self) {
        self.left = DEFAULT_LEFT;
        if self.right < self.left {
            self.right = DEFAULT_RIGHT;
        }
        self.clamp_positions();
    }

    /// Mirror of [`reset_left`](Self::reset_left).
    pub fn reset_right(&mut self) {
        self.right = DEFAULT_RIGHT;
        if self.left > self.right {
            self.left = DEFAULT_LEFT;
        }
        self.clamp_positions();
    }

    /// Declare the present shaft position to be zero. Thresholds are kept, so
    /// when zero lies outside them the nearest threshold is taken instead.
    pub fn reset_current(&mut self) {
        self.current = 0.0_f32.max(self.left).min(self.right);
        self.previous = self.current;
    }

    /// Repair a record read from storage.
    ///
    /// Usable thresholds (finite, `left <= right`) are kept and the positions
    /// are clamped into them; a non-finite position becomes zero first.
    /// Returns `None` when the thresholds themselves cannot be trusted.
    pub fn recovered(&self) -> Option<Self> {
        if !(self.left.is_finite() && self.right.is_finite() && self.left <= self.right) {
            return None;
        }
        let finite_or_zero = |v: f32| if v.is_finite() { v } else { 0.0 };
        let mut next = PositionRecord {
            previous: finite_or_zero(self.previous),
            current: finite_or_zero(self.current),
            ..*self
        };
        next.clamp_positions();
        Some(next)
    }

    fn clamp_positions(&mut self) {
        self.current = self.current.max(self.left).min(self.right);
        self.previous = self.previous.max(self.left).min(self.right);
    }

    /// Signed distance to a calibrated threshold.
    pub fn distance_to(&self, side: Side) -> Result<f32, CommandError> {
        match side {
            Side::Left if self.is_left_set() => Ok(self.left - self.current),
            Side::Right if self.is_right_set() => Ok(self.right - self.current),
            _ => Err(CommandError::NotCalibrated(side)),
        }
    }
}
