//! rppal-backed stepper for Raspberry Pi class hosts.
use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, trace};

use curtain_traits::{Clock, HwResult, MonotonicClock, Stepper, Wiring};

use crate::error::{HwError, Result};
use crate::phase::{FULL_STEP, next_phase};
use crate::ramp::Ramp;

enum Outputs {
    Uln4Wire {
        coils: [OutputPin; 4],
        phase: usize,
    },
    A4988 {
        step: OutputPin,
        dir: OutputPin,
        enable: Option<OutputPin>,
    },
}

fn open_output(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    gpio.get(pin)
        .map(|p| p.into_output_low())
        .map_err(|e| HwError::Gpio(format!("open pin {pin}: {e}")))
}

impl Outputs {
    fn open(wiring: &Wiring) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        match *wiring {
            Wiring::Uln4Wire { pins } => Ok(Outputs::Uln4Wire {
                coils: [
                    open_output(&gpio, pins[0])?,
                    open_output(&gpio, pins[1])?,
                    open_output(&gpio, pins[2])?,
                    open_output(&gpio, pins[3])?,
                ],
                phase: 0,
            }),
            Wiring::A4988 { step, dir, enable } => Ok(Outputs::A4988 {
                step: open_output(&gpio, step)?,
                dir: open_output(&gpio, dir)?,
                enable: enable.map(|p| open_output(&gpio, p)).transpose()?,
            }),
        }
    }

    fn pulse(&mut self, forward: bool) {
        match self {
            Outputs::Uln4Wire { coils, phase } => {
                *phase = next_phase(*phase, forward);
                for (coil, on) in coils.iter_mut().zip(FULL_STEP[*phase]) {
                    if on {
                        coil.set_high();
                    } else {
                        coil.set_low();
                    }
                }
            }
            Outputs::A4988 { step, dir, .. } => {
                if forward {
                    dir.set_high();
                } else {
                    dir.set_low();
                }
                step.set_high();
                // A4988 needs >= 1us high time.
                spin_delay_us(2);
                step.set_low();
            }
        }
    }

    fn set_enabled(&mut self, on: bool) {
        match self {
            Outputs::Uln4Wire { coils, phase } => {
                if on {
                    for (coil, high) in coils.iter_mut().zip(FULL_STEP[*phase]) {
                        if high {
                            coil.set_high();
                        } else {
                            coil.set_low();
                        }
                    }
                } else {
                    coils.iter_mut().for_each(OutputPin::set_low);
                }
            }
            Outputs::A4988 { enable, .. } => {
                // Enable input is active low.
                if let Some(en) = enable {
                    if on {
                        en.set_low();
                    } else {
                        en.set_high();
                    }
                }
            }
        }
    }
}

pub struct GpioStepper<C: Clock = MonotonicClock> {
    clock: C,
    ramp: Ramp,
    outputs: Option<Outputs>,
}

impl GpioStepper<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for GpioStepper<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> GpioStepper<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            ramp: Ramp::default(),
            outputs: None,
        }
    }

    fn outputs_mut(&mut self) -> Result<&mut Outputs> {
        self.outputs.as_mut().ok_or(HwError::NotConfigured)
    }
}

impl<C: Clock> Stepper for GpioStepper<C> {
    fn configure(&mut self, wiring: &Wiring) -> HwResult<()> {
        // Release old pins first so a profile switch can reuse them.
        self.outputs = None;
        self.ramp.halt();
        self.outputs = Some(Outputs::open(wiring)?);
        debug!(kind = %wiring.kind(), ?wiring, "stepper configured");
        Ok(())
    }

    fn set_motion(&mut self, acceleration: f32, max_speed: f32) -> HwResult<()> {
        self.ramp.set_motion(acceleration, max_speed)?;
        Ok(())
    }

    fn move_by(&mut self, raw_steps: i64) -> HwResult<()> {
        self.outputs_mut()?;
        self.ramp.move_by(raw_steps);
        Ok(())
    }

    fn stop(&mut self) -> HwResult<()> {
        self.ramp.halt();
        Ok(())
    }

    fn run(&mut self) -> HwResult<bool> {
        let now = self.clock.now();
        let delta = self.ramp.advance(now);
        if delta != 0 {
            let outputs = self.outputs_mut()?;
            for _ in 0..delta.unsigned_abs() {
                outputs.pulse(delta > 0);
            }
            trace!(delta, position = self.ramp.position(), "steps emitted");
        }
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
        self.outputs_mut()?.set_enabled(true);
        Ok(())
    }

    fn disable_outputs(&mut self) -> HwResult<()> {
        self.outputs_mut()?.set_enabled(false);
        Ok(())
    }
}

#[inline(always)]
fn spin_delay_us(us: u64) {
    let until = std::time::Instant::now() + std::time::Duration::from_micros(us);
    while std::time::Instant::now() < until {
        std::hint::spin_loop();
    }
}
