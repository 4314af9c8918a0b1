#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and persisted-settings storage for the curtain controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `settings` holds the on-disk schema of the mutable settings record and
//!   the atomic file store used to persist it.
use curtain_traits::{MotorKind, PinMap};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod settings;

pub use settings::{
    LoadOutcome, SETTINGS_MAJOR, SETTINGS_MINOR, SettingsFile, SettingsVersion, StoredMotor,
    StoredPosition, StoredSettings,
};

/// GPIO assignment. Both wiring profiles are listed so the motor type can be
/// switched at runtime without editing the file.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pins {
    /// ULN2003 coil inputs IN1..IN4
    pub in1: u8,
    pub in2: u8,
    pub in3: u8,
    pub in4: u8,
    /// A4988 STEP / DIR / optional ENABLE (active low)
    pub step: u8,
    pub dir: u8,
    pub enable: Option<u8>,
}

impl From<&Pins> for PinMap {
    fn from(p: &Pins) -> Self {
        Self {
            in1: p.in1,
            in2: p.in2,
            in3: p.in3,
            in4: p.in4,
            step: p.step,
            dir: p.dir,
            enable: p.enable,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepperKind {
    #[default]
    Uln4wire,
    A4988,
}

impl From<StepperKind> for MotorKind {
    fn from(k: StepperKind) -> Self {
        match k {
            StepperKind::Uln4wire => MotorKind::Uln4Wire,
            StepperKind::A4988 => MotorKind::A4988,
        }
    }
}

impl From<MotorKind> for StepperKind {
    fn from(k: MotorKind) -> Self {
        match k {
            MotorKind::Uln4Wire => StepperKind::Uln4wire,
            MotorKind::A4988 => StepperKind::A4988,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MotorCfg {
    /// Wiring profile used on first boot (persisted afterwards)
    pub kind: StepperKind,
    /// steps/s², first-boot default
    pub acceleration: f32,
    /// steps/s, first-boot default
    pub max_speed: f32,
    /// Cut coil current once a move has settled
    pub disable_when_idle: bool,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self {
            kind: StepperKind::Uln4wire,
            acceleration: 400.0,
            max_speed: 500.0,
            disable_when_idle: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Control loop passes per second
    pub loop_hz: u32,
    /// Rotations travelled by one step-left / step-right button press
    pub step_rotations: f32,
}

impl ControlCfg {
    /// Sleep between loop passes; `loop_hz` is floored at 1 and the period at 1 µs.
    pub fn period(&self) -> Duration {
        Duration::from_micros((1_000_000 / u64::from(self.loop_hz.max(1))).max(1))
    }
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            loop_hz: 1000,
            step_rotations: 1.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Storage {
    /// Settings file (TOML), written atomically
    pub path: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            path: PathBuf::from("var/curtain_settings.toml"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    /// Initial shared API key; the persisted key wins once settings exist.
    pub api_key: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub motor: MotorCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub storage: Storage,
    pub auth: Auth,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let coils = [self.pins.in1, self.pins.in2, self.pins.in3, self.pins.in4];
        for (i, a) in coils.iter().enumerate() {
            if coils[i + 1..].contains(a) {
                eyre::bail!("pins.in1..in4 must be distinct (pin {a} repeated)");
            }
        }
        if self.pins.step == self.pins.dir {
            eyre::bail!("pins.step and pins.dir must differ");
        }
        if let Some(en) = self.pins.enable
            && (en == self.pins.step || en == self.pins.dir)
        {
            eyre::bail!("pins.enable must differ from step and dir");
        }

        // Motor
        if !(self.motor.acceleration.is_finite() && self.motor.acceleration > 0.0) {
            eyre::bail!("motor.acceleration must be > 0");
        }
        if !(self.motor.max_speed.is_finite() && self.motor.max_speed > 0.0) {
            eyre::bail!("motor.max_speed must be > 0");
        }

        // Control
        if self.control.loop_hz == 0 || self.control.loop_hz > 100_000 {
            eyre::bail!("control.loop_hz must be in [1, 100000]");
        }
        if !(self.control.step_rotations.is_finite() && self.control.step_rotations > 0.0) {
            eyre::bail!("control.step_rotations must be > 0");
        }

        // Storage
        if self.storage.path.as_os_str().is_empty() {
            eyre::bail!("storage.path must not be empty");
        }

        // Auth
        if self.auth.api_key.trim().is_empty() {
            eyre::bail!("auth.api_key must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly (got {rot})");
        }

        Ok(())
    }
}
