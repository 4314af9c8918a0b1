pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod phase;
pub mod ramp;

use curtain_traits::{Clock, HwResult, MonotonicClock, Stepper, Wiring};

use crate::error::HwError;
use crate::ramp::Ramp;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::GpioStepper;

/// Simulated stepper implementation.
///
/// Follows the same speed ramp as the GPIO driver, but only counts steps.
pub struct SimulatedStepper<C: Clock = MonotonicClock> {
    clock: C,
    ramp: Ramp,
    wiring: Option<Wiring>,
    outputs_enabled: bool,
}

impl SimulatedStepper<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for SimulatedStepper<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SimulatedStepper<C> {
    pub fn with_clock(clock: C) -> Self {
        SimulatedStepper {
            clock,
            ramp: Ramp::default(),
            wiring: None,
            outputs_enabled: false,
        }
    }

    pub fn wiring(&self) -> Option<&Wiring> {
        self.wiring.as_ref()
    }

    pub fn outputs_enabled(&self) -> bool {
        self.outputs_enabled
    }

    pub fn ramp(&self) -> &Ramp {
        &self.ramp
    }
}

impl<C: Clock> Stepper for SimulatedStepper<C> {
    fn configure(&mut self, wiring: &Wiring) -> HwResult<()> {
        tracing::info!(kind = %wiring.kind(), ?wiring, "stepper configured (simulated)");
        self.ramp.halt();
        self.wiring = Some(*wiring);
        Ok(())
    }

    fn set_motion(&mut self, acceleration: f32, max_speed: f32) -> HwResult<()> {
        self.ramp.set_motion(acceleration, max_speed)?;
        tracing::debug!(acceleration, max_speed, "motion parameters applied (simulated)");
        Ok(())
    }

    fn move_by(&mut self, raw_steps: i64) -> HwResult<()> {
        if self.wiring.is_none() {
            return Err(Box::new(HwError::NotConfigured));
        }
        self.ramp.move_by(raw_steps);
        tracing::debug!(raw_steps, target = self.ramp.target(), "move queued (simulated)");
        Ok(())
    }

    fn stop(&mut self) -> HwResult<()> {
        self.ramp.halt();
        tracing::debug!(position = self.ramp.position(), "stepper stopped (simulated)");
        Ok(())
    }

    fn run(&mut self) -> HwResult<bool> {
        let now = self.clock.now();
        self.ramp.advance(now);
        Ok(self.ramp.is_running())
    }

    fn is_running(&self) -> bool {
        self.ramp.is_running()
    }

    fn current_position(&self) -> i64 {
        self.ramp.position()
    }

    fn reset_position(&mut self) {
        self.ramp.reset_position();
    }

    fn enable_outputs(&mut self) -> HwResult<()> {
        self.outputs_enabled = true;
        Ok(())
    }

    fn disable_outputs(&mut self) -> HwResult<()> {
        self.outputs_enabled = false;
        Ok(())
    }
}
