//! `From` implementations bridging `curtain_config` types to `curtain_core` types.

use curtain_config::{Config, SettingsVersion, StoredMotor, StoredPosition, StoredSettings};

use crate::dispatcher::ControllerCfg;
use crate::position::PositionRecord;
use crate::settings::{MotorParams, Settings};

// ── Stored settings ──────────────────────────────────────────────────────────

impl From<StoredPosition> for PositionRecord {
    fn from(p: StoredPosition) -> Self {
        Self {
            left: p.left,
            previous: p.previous,
            current: p.current,
            right: p.right,
        }
    }
}

impl From<PositionRecord> for StoredPosition {
    fn from(p: PositionRecord) -> Self {
        Self {
            left: p.left,
            previous: p.previous,
            current: p.current,
            right: p.right,
        }
    }
}

impl From<StoredMotor> for MotorParams {
    /// `steps_per_revolution` is re-derived from the kind; a stale stored
    /// value never wins over the profile constant.
    fn from(m: StoredMotor) -> Self {
        MotorParams::new(m.kind.into(), m.acceleration, m.max_speed)
    }
}

impl From<&Settings> for StoredSettings {
    fn from(s: &Settings) -> Self {
        Self {
            version: SettingsVersion::default(),
            position: s.position.into(),
            motor: StoredMotor {
                kind: s.motor.kind.into(),
                acceleration: s.motor.acceleration,
                max_speed: s.motor.max_speed,
                steps_per_revolution: s.motor.steps_per_revolution,
            },
            api_key: s.api_key.clone(),
        }
    }
}

impl From<StoredSettings> for Settings {
    fn from(s: StoredSettings) -> Self {
        Self {
            position: s.position.into(),
            motor: s.motor.into(),
            api_key: s.api_key,
        }
    }
}

// ── Controller ───────────────────────────────────────────────────────────────

impl From<&Config> for ControllerCfg {
    fn from(c: &Config) -> Self {
        Self {
            pins: (&c.pins).into(),
            step_rotations: c.control.step_rotations,
            disable_when_idle: c.motor.disable_when_idle,
            factory: Settings::factory(
                MotorParams::new(c.motor.kind.into(), c.motor.acceleration, c.motor.max_speed),
                c.auth.api_key.clone(),
            ),
        }
    }
}
