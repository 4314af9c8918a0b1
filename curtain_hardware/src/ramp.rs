//! Trapezoidal speed profile shared by the simulated and GPIO steppers.
//!
//! The ramp owns the step counter and the target. `advance(now)` returns the
//! signed number of steps that became due since the previous call; the caller
//! is responsible for physically emitting them.

use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Upper bound on steps emitted by one `advance` call so a stalled caller
/// cannot turn a long gap into an unbounded burst.
pub const MAX_STEPS_PER_ADVANCE: u32 = 4096;

#[derive(Debug, Clone)]
pub struct Ramp {
    acceleration: f32,
    max_speed: f32,
    /// Current speed magnitude in steps/s; 0 when idle.
    speed: f32,
    position: i64,
    target: i64,
    last_step_at: Option<Instant>,
}

impl Default for Ramp {
    fn default() -> Self {
        Self {
            acceleration: 400.0,
            max_speed: 500.0,
            speed: 0.0,
            position: 0,
            target: 0,
            last_step_at: None,
        }
    }
}

impl Ramp {
    pub fn new(acceleration: f32, max_speed: f32) -> Result<Self> {
        let mut r = Self::default();
        r.set_motion(acceleration, max_speed)?;
        Ok(r)
    }

    pub fn set_motion(&mut self, acceleration: f32, max_speed: f32) -> Result<()> {
        if !(acceleration.is_finite() && acceleration > 0.0) {
            return Err(HwError::InvalidParam(format!(
                "acceleration must be > 0, got {acceleration}"
            )));
        }
        if !(max_speed.is_finite() && max_speed > 0.0) {
            return Err(HwError::InvalidParam(format!(
                "max_speed must be > 0, got {max_speed}"
            )));
        }
        self.acceleration = acceleration;
        self.max_speed = max_speed;
        self.speed = self.speed.min(max_speed);
        Ok(())
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn distance_to_go(&self) -> i64 {
        self.target - self.position
    }

    pub fn is_running(&self) -> bool {
        self.position != self.target
    }

    /// Retarget relative to the current position.
    pub fn move_by(&mut self, steps: i64) {
        self.target = self.position.saturating_add(steps);
        if !self.is_running() {
            self.halt();
        }
    }

    /// Collapse the target onto the current position and drop all speed.
    pub fn halt(&mut self) {
        self.target = self.position;
        self.speed = 0.0;
        self.last_step_at = None;
    }

    /// Redefine the current position as zero.
    pub fn reset_position(&mut self) {
        self.position = 0;
        self.halt();
    }

    /// Speed reached after one step from rest: v² = 2·a·1.
    #[inline]
    fn start_speed(&self) -> f32 {
        (2.0 * self.acceleration).sqrt().min(self.max_speed)
    }

    /// Emit the steps that are due at `now`. Returns the signed step delta.
    pub fn advance(&mut self, now: Instant) -> i64 {
        if !self.is_running() {
            self.halt();
            return 0;
        }
        let Some(mut last) = self.last_step_at else {
            // First call of a move only arms the timer.
            self.last_step_at = Some(now);
            self.speed = self.start_speed();
            return 0;
        };

        let dir: i64 = if self.distance_to_go() > 0 { 1 } else { -1 };
        let mut emitted: i64 = 0;
        for _ in 0..MAX_STEPS_PER_ADVANCE {
            if !self.is_running() {
                break;
            }
            let interval = Duration::from_secs_f32(1.0 / self.speed.max(1.0));
            let due = last + interval;
            if due > now {
                break;
            }
            self.position += dir;
            emitted += dir;
            last = due;

            let remaining = self.distance_to_go().unsigned_abs() as f32;
            let braking = self.speed * self.speed / (2.0 * self.acceleration);
            let dv = self.acceleration * interval.as_secs_f32();
            self.speed = if remaining <= braking {
                (self.speed - dv).max(self.start_speed())
            } else {
                (self.speed + dv).min(self.max_speed)
            };
        }

        if self.is_running() {
            self.last_step_at = Some(last);
        } else {
            self.halt();
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_params() {
        assert!(Ramp::new(0.0, 100.0).is_err());
        assert!(Ramp::new(100.0, f32::NAN).is_err());
        assert!(Ramp::new(100.0, 100.0).is_ok());
    }

    #[test]
    fn reaches_target_and_never_overshoots() {
        let mut r = Ramp::new(1000.0, 500.0).unwrap();
        let t0 = Instant::now();
        r.move_by(300);
        let mut t = t0;
        for _ in 0..10_000 {
            r.advance(t);
            assert!(r.position() <= 300);
            if !r.is_running() {
                break;
            }
            t += Duration::from_millis(1);
        }
        assert_eq!(r.position(), 300);
        assert!(!r.is_running());
    }

    #[test]
    fn negative_moves_count_down() {
        let mut r = Ramp::new(1000.0, 1000.0).unwrap();
        let t0 = Instant::now();
        r.move_by(-50);
        let mut t = t0;
        while r.is_running() {
            r.advance(t);
            t += Duration::from_millis(5);
        }
        assert_eq!(r.position(), -50);
    }

    #[test]
    fn halt_freezes_position() {
        let mut r = Ramp::new(1000.0, 1000.0).unwrap();
        let t0 = Instant::now();
        r.move_by(1000);
        r.advance(t0);
        r.advance(t0 + Duration::from_millis(100));
        let pos = r.position();
        assert!(pos > 0 && pos < 1000);
        r.halt();
        assert!(!r.is_running());
        assert_eq!(r.advance(t0 + Duration::from_secs(5)), 0);
        assert_eq!(r.position(), pos);
    }
}
