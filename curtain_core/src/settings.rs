//! Runtime settings record owned by the controller.

use curtain_traits::MotorKind;

use crate::position::PositionRecord;

/// Motion parameters of the active motor profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorParams {
    pub kind: MotorKind,
    /// steps/s²
    pub acceleration: f32,
    /// steps/s
    pub max_speed: f32,
    /// Fixed by `kind`; kept alongside so stored files are self-describing.
    pub steps_per_revolution: u32,
}

impl MotorParams {
    pub fn new(kind: MotorKind, acceleration: f32, max_speed: f32) -> Self {
        Self {
            kind,
            acceleration,
            max_speed,
            steps_per_revolution: kind.steps_per_revolution(),
        }
    }

    /// Rotations to raw steps, rounded to the nearest step.
    pub fn rotations_to_steps(&self, rotations: f32) -> i64 {
        (f64::from(rotations) * f64::from(self.steps_per_revolution)).round() as i64
    }
}

impl Default for MotorParams {
    fn default() -> Self {
        Self::new(MotorKind::default(), 400.0, 500.0)
    }
}

/// Everything that survives a reboot.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub position: PositionRecord,
    pub motor: MotorParams,
    pub api_key: String,
}

impl Settings {
    /// Factory settings: sentinel thresholds at position zero.
    pub fn factory(motor: MotorParams, api_key: impl Into<String>) -> Self {
        Self {
            position: PositionRecord::default(),
            motor,
            api_key: api_key.into(),
        }
    }
}
