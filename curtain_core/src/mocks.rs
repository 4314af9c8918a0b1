//! Test and helper mocks for curtain_core

use curtain_traits::{HwResult, Stepper, Wiring};

use crate::error::Result;
use crate::settings::Settings;
use crate::store::SettingsStore;

/// Calls recorded by [`SpyStepper`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepperCall {
    Configure(Wiring),
    SetMotion(f32, f32),
    MoveBy(i64),
    Stop,
    ResetPosition,
    EnableOutputs,
    DisableOutputs,
}

/// Stepper whose state is set directly by the test.
///
/// `move_by` marks it running; `run` jumps straight to the target when
/// `complete_on_run` is set, otherwise it keeps running until the test
/// changes `running` or calls `stop`.
#[derive(Debug, Default)]
pub struct SpyStepper {
    pub position: i64,
    pub target: i64,
    pub running: bool,
    pub complete_on_run: bool,
    /// Fail the next `move_by` with a hardware error.
    pub fail_next_move: bool,
    pub calls: Vec<StepperCall>,
}

impl SpyStepper {
    pub fn completing() -> Self {
        Self {
            complete_on_run: true,
            ..Self::default()
        }
    }

    pub fn moves(&self) -> Vec<i64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StepperCall::MoveBy(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl Stepper for SpyStepper {
    fn configure(&mut self, wiring: &Wiring) -> HwResult<()> {
        self.calls.push(StepperCall::Configure(*wiring));
        self.target = self.position;
        self.running = false;
        Ok(())
    }

    fn set_motion(&mut self, acceleration: f32, max_speed: f32) -> HwResult<()> {
        self.calls
            .push(StepperCall::SetMotion(acceleration, max_speed));
        Ok(())
    }

    fn move_by(&mut self, raw_steps: i64) -> HwResult<()> {
        if std::mem::take(&mut self.fail_next_move) {
            return Err(Box::new(std::io::Error::other("driver fault")));
        }
        self.calls.push(StepperCall::MoveBy(raw_steps));
        self.target = self.position + raw_steps;
        self.running = raw_steps != 0;
        Ok(())
    }

    fn stop(&mut self) -> HwResult<()> {
        self.calls.push(StepperCall::Stop);
        self.target = self.position;
        self.running = false;
        Ok(())
    }

    fn run(&mut self) -> HwResult<bool> {
        if self.running && self.complete_on_run {
            self.position = self.target;
            self.running = false;
        }
        Ok(self.running)
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn current_position(&self) -> i64 {
        self.position
    }

    fn reset_position(&mut self) {
        self.calls.push(StepperCall::ResetPosition);
        self.position = 0;
        self.target = 0;
        self.running = false;
    }

    fn enable_outputs(&mut self) -> HwResult<()> {
        self.calls.push(StepperCall::EnableOutputs);
        Ok(())
    }

    fn disable_outputs(&mut self) -> HwResult<()> {
        self.calls.push(StepperCall::DisableOutputs);
        Ok(())
    }
}

/// In-memory settings store that counts saves.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub stored: Option<Settings>,
    pub saves: usize,
    /// Make every `save` fail.
    pub fail_saves: bool,
}

impl MemoryStore {
    pub fn with(settings: Settings) -> Self {
        Self {
            stored: Some(settings),
            ..Self::default()
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&mut self) -> Result<Option<Settings>> {
        Ok(self.stored.clone())
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        if self.fail_saves {
            eyre::bail!("storage full");
        }
        self.stored = Some(settings.clone());
        self.saves += 1;
        Ok(())
    }
}
