pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::fmt;
use std::str::FromStr;

/// Boxed error crossing the hardware seam.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Stepper wiring profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorKind {
    /// Unipolar motor behind a ULN2003 board, four coil inputs.
    #[default]
    Uln4Wire,
    /// Bipolar motor behind an A4988 step/dir driver.
    A4988,
}

impl MotorKind {
    /// Full steps per output-shaft revolution for the profile.
    pub const fn steps_per_revolution(self) -> u32 {
        match self {
            MotorKind::Uln4Wire => 2048,
            MotorKind::A4988 => 200,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MotorKind::Uln4Wire => "uln4wire",
            MotorKind::A4988 => "a4988",
        }
    }
}

impl fmt::Display for MotorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMotorKind(pub String);

impl fmt::Display for UnknownMotorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown motor kind '{}' (expected uln4wire or a4988)", self.0)
    }
}

impl std::error::Error for UnknownMotorKind {}

impl FromStr for MotorKind {
    type Err = UnknownMotorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uln4wire" | "uln2003" | "4wire" => Ok(MotorKind::Uln4Wire),
            "a4988" | "driver" => Ok(MotorKind::A4988),
            other => Err(UnknownMotorKind(other.to_string())),
        }
    }
}

/// GPIO assignment for every supported wiring profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    pub in1: u8,
    pub in2: u8,
    pub in3: u8,
    pub in4: u8,
    pub step: u8,
    pub dir: u8,
    pub enable: Option<u8>,
}

impl PinMap {
    /// Select the pins used by `kind`.
    pub fn wiring(&self, kind: MotorKind) -> Wiring {
        match kind {
            MotorKind::Uln4Wire => Wiring::Uln4Wire {
                pins: [self.in1, self.in2, self.in3, self.in4],
            },
            MotorKind::A4988 => Wiring::A4988 {
                step: self.step,
                dir: self.dir,
                enable: self.enable,
            },
        }
    }
}

/// Concrete wiring handed to a stepper on (re)configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wiring {
    Uln4Wire { pins: [u8; 4] },
    A4988 { step: u8, dir: u8, enable: Option<u8> },
}

impl Wiring {
    pub fn kind(&self) -> MotorKind {
        match self {
            Wiring::Uln4Wire { .. } => MotorKind::Uln4Wire,
            Wiring::A4988 { .. } => MotorKind::A4988,
        }
    }
}

/// Non-blocking stepper driver.
///
/// Positions are raw steps counted since the last `reset_position`. Motion only
/// happens inside `run`, which the owner calls once per control-loop pass.
pub trait Stepper {
    fn configure(&mut self, wiring: &Wiring) -> HwResult<()>;
    /// Acceleration (steps/s²) and max speed (steps/s) are always applied together.
    fn set_motion(&mut self, acceleration: f32, max_speed: f32) -> HwResult<()>;
    /// Queue a relative move of `raw_steps` from the current target.
    fn move_by(&mut self, raw_steps: i64) -> HwResult<()>;
    /// Halt immediately; the target collapses to the current position.
    fn stop(&mut self) -> HwResult<()>;
    /// Emit any steps that are due. Returns whether motion is still in progress.
    fn run(&mut self) -> HwResult<bool>;
    fn is_running(&self) -> bool;
    fn current_position(&self) -> i64;
    fn reset_position(&mut self);
    fn enable_outputs(&mut self) -> HwResult<()>;
    fn disable_outputs(&mut self) -> HwResult<()>;
}

impl<T: Stepper + ?Sized> Stepper for Box<T> {
    fn configure(&mut self, wiring: &Wiring) -> HwResult<()> {
        (**self).configure(wiring)
    }
    fn set_motion(&mut self, acceleration: f32, max_speed: f32) -> HwResult<()> {
        (**self).set_motion(acceleration, max_speed)
    }
    fn move_by(&mut self, raw_steps: i64) -> HwResult<()> {
        (**self).move_by(raw_steps)
    }
    fn stop(&mut self) -> HwResult<()> {
        (**self).stop()
    }
    fn run(&mut self) -> HwResult<bool> {
        (**self).run()
    }
    fn is_running(&self) -> bool {
        (**self).is_running()
    }
    fn current_position(&self) -> i64 {
        (**self).current_position()
    }
    fn reset_position(&mut self) {
        (**self).reset_position()
    }
    fn enable_outputs(&mut self) -> HwResult<()> {
        (**self).enable_outputs()
    }
    fn disable_outputs(&mut self) -> HwResult<()> {
        (**self).disable_outputs()
    }
}
