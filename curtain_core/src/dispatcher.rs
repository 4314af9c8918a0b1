//! Command dispatcher and scheduler tick.
//!
//! `Controller` owns the settings record, the stepper and the store. It is
//! driven from a single cooperative loop: at most one request per pass via
//! [`Controller::handle`], then one [`Controller::tick`]. Nothing blocks on
//! motor completion; a commanded move finishes across later ticks.

use curtain_traits::{MotorKind, PinMap, Stepper};
use eyre::WrapErr;
use tracing::{debug, error, info, warn};

use crate::auth::verify_api_key;
use crate::command::{Command, Outcome, Reply, StatusReport};
use crate::error::{BuildError, CommandError, Result, Side};
use crate::hw_error::{command_hw_error, map_hw_error};
use crate::position::PositionRecord;
use crate::settings::{MotorParams, Settings};
use crate::store::SettingsStore;

/// Static controller configuration (from the config file).
#[derive(Debug, Clone)]
pub struct ControllerCfg {
    pub pins: PinMap,
    /// Rotations per step-left / step-right press.
    pub step_rotations: f32,
    /// Disable coil outputs once a move has settled.
    pub disable_when_idle: bool,
    /// Settings used on first boot and by `erase`.
    pub factory: Settings,
}

/// What a scheduler tick observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Idle,
    Moving,
    /// The motor halted this tick; the record was reconciled and persisted.
    Settled(PositionRecord),
}

pub struct Controller<M: Stepper, S: SettingsStore> {
    stepper: M,
    store: S,
    settings: Settings,
    cfg: ControllerCfg,
    /// A move was commanded and has not been reconciled yet.
    in_flight: bool,
}

impl<M: Stepper, S: SettingsStore> core::fmt::Debug for Controller<M, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("position", &self.settings.position)
            .field("motor", &self.settings.motor)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

pub struct Missing;

/// Type-state builder: `start()` exists only once a stepper and a store are set.
pub struct ControllerBuilder<M, S> {
    stepper: M,
    store: S,
    cfg: Option<ControllerCfg>,
}

impl ControllerBuilder<Missing, Missing> {
    pub fn new() -> Self {
        ControllerBuilder {
            stepper: Missing,
            store: Missing,
            cfg: None,
        }
    }
}

impl Default for ControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, S> ControllerBuilder<M, S> {
    pub fn with_stepper<M2: Stepper>(self, stepper: M2) -> ControllerBuilder<M2, S> {
        ControllerBuilder {
            stepper,
            store: self.store,
            cfg: self.cfg,
        }
    }

    pub fn with_store<S2: SettingsStore>(self, store: S2) -> ControllerBuilder<M, S2> {
        ControllerBuilder {
            stepper: self.stepper,
            store,
            cfg: self.cfg,
        }
    }

    pub fn with_cfg(mut self, cfg: ControllerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }
}

impl<M: Stepper, S: SettingsStore> ControllerBuilder<M, S> {
    /// Boot: load settings (factory on first boot), configure the stepper for
    /// the stored profile, apply motion parameters, zero the step counter.
    pub fn start(self) -> Result<Controller<M, S>> {
        let cfg = self
            .cfg
            .ok_or(BuildError::InvalidConfig("controller config not set"))?;
        if !(cfg.step_rotations.is_finite() && cfg.step_rotations > 0.0) {
            return Err(BuildError::InvalidConfig("step_rotations must be > 0").into());
        }
        let mut store = self.store;
        let mut stepper = self.stepper;

        let settings = match store.load().wrap_err("boot: load settings")? {
            Some(mut s) => {
                if !s.position.is_consistent() {
                    match s.position.recovered() {
                        Some(fixed) => {
                            warn!(stored = ?s.position, recovered = ?fixed, "stored position outside thresholds, clamped");
                            s.position = fixed;
                        }
                        None => {
                            warn!(position = ?s.position, "stored thresholds unusable, resetting to factory position");
                            s.position = PositionRecord::default();
                        }
                    }
                }
                s
            }
            None => {
                let s = cfg.factory.clone();
                if let Err(e) = store.save(&s) {
                    error!(error = %e, "failed to persist factory settings");
                }
                s
            }
        };

        let wiring = cfg.pins.wiring(settings.motor.kind);
        stepper
            .configure(&wiring)
            .map_err(|e| map_hw_error(e.as_ref()))
            .wrap_err("boot: configure stepper")?;
        stepper
            .set_motion(settings.motor.acceleration, settings.motor.max_speed)
            .map_err(|e| map_hw_error(e.as_ref()))
            .wrap_err("boot: apply motion parameters")?;
        stepper.reset_position();
        if cfg.disable_when_idle {
            stepper
                .disable_outputs()
                .map_err(|e| map_hw_error(e.as_ref()))?;
        }
        info!(
            kind = %settings.motor.kind,
            position = settings.position.current,
            left = settings.position.left,
            right = settings.position.right,
            "controller started"
        );

        Ok(Controller {
            stepper,
            store,
            settings,
            cfg,
            in_flight: false,
        })
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

impl<M: Stepper, S: SettingsStore> Controller<M, S> {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn record(&self) -> &PositionRecord {
        &self.settings.position
    }

    pub fn stepper(&self) -> &M {
        &self.stepper
    }

    pub fn stepper_mut(&mut self) -> &mut M {
        &mut self.stepper
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.stepper.is_running()
    }

    /// Transport entry point: authorize, parse, execute, and render a reply.
    pub fn handle(&mut self, action: &str, value: Option<&str>, token: &str) -> Reply {
        if !verify_api_key(&self.settings.api_key, token) {
            warn!(action, "unauthorized request rejected");
            return Reply::from(Err(CommandError::Unauthorized));
        }
        let reply = Reply::from(Command::parse(action, value).and_then(|cmd| self.execute(cmd)));
        debug!(action, ?value, status = reply.status.as_str(), message = %reply.message, "request handled");
        reply
    }

    pub fn execute(&mut self, cmd: Command) -> std::result::Result<Outcome, CommandError> {
        let name = cmd.name();
        let out = match cmd {
            Command::MoveBy(delta) => self.move_by(delta),
            Command::StepLeft => self.move_by(-self.cfg.step_rotations),
            Command::StepRight => self.move_by(self.cfg.step_rotations),
            Command::TotalLeft => self.move_total(Side::Left),
            Command::TotalRight => self.move_total(Side::Right),
            Command::Stop => self.stop_motor(),
            Command::SetLeft(v) => self.set_threshold(Side::Left, v),
            Command::SetRight(v) => self.set_threshold(Side::Right, v),
            Command::ResetLeft => self.mutate(|r| r.reset_left(), "left threshold reset"),
            Command::ResetRight => self.mutate(|r| r.reset_right(), "right threshold reset"),
            Command::ResetCurrent => self.mutate(|r| r.reset_current(), "current position reset"),
            Command::SetMotorParams {
                acceleration,
                max_speed,
            } => self.set_motor_params(acceleration, max_speed),
            Command::SetMotorType(kind) => self.set_motor_type(kind),
            Command::SetApiKey(key) => {
                self.settings.api_key = key;
                self.persist();
                Ok(Outcome::Done("api key updated".to_string()))
            }
            Command::Status => Ok(Outcome::Status(self.status())),
        };
        if let Err(e) = &out {
            info!(action = name, kind = ?e.kind(), error = %e, "command rejected");
        }
        out
    }

    pub fn status(&self) -> StatusReport {
        let p = &self.settings.position;
        StatusReport {
            position: *p,
            motor: self.settings.motor,
            running: self.stepper.is_running(),
            left_set: p.is_left_set(),
            right_set: p.is_right_set(),
            raw_steps: self.stepper.current_position(),
        }
    }

    /// Relative move, clamped to the thresholds.
    ///
    /// The planned record is persisted before the motor is commanded, so the
    /// stored destination survives a power cut mid-move.
    pub fn move_by(&mut self, delta: f32) -> std::result::Result<Outcome, CommandError> {
        if !delta.is_finite() {
            return Err(CommandError::InvalidValue {
                action: "move",
                value: delta.to_string(),
            });
        }
        if self.stepper.is_running() {
            info!(delta, "motor busy, move ignored");
            return Ok(Outcome::Busy);
        }

        let before = self.settings.position;
        let plan = before.plan_move(delta);
        let raw_steps = self.settings.motor.rotations_to_steps(plan.clamped_delta);
        self.settings.position = plan.record;
        self.persist();

        if raw_steps != 0
            && let Err(e) = self.command_motion(raw_steps)
        {
            self.settings.position = before;
            self.persist();
            return Err(e);
        }
        self.in_flight = raw_steps != 0;

        info!(
            requested = delta,
            clamped = plan.clamped_delta,
            raw_steps,
            from = before.current,
            to = plan.record.current,
            "move commanded"
        );
        Ok(Outcome::Done(format!(
            "moving {:.3} rotations to {:.3}",
            plan.clamped_delta, plan.record.current
        )))
    }

    fn command_motion(&mut self, raw_steps: i64) -> std::result::Result<(), CommandError> {
        self.stepper.enable_outputs().map_err(command_hw_error)?;
        self.stepper.move_by(raw_steps).map_err(command_hw_error)
    }

    fn move_total(&mut self, side: Side) -> std::result::Result<Outcome, CommandError> {
        let delta = self.settings.position.distance_to(side)?;
        self.move_by(delta)
    }

    /// Halt immediately and rebuild the position from the traveled steps.
    /// Safe at any time; when idle with nothing to reconcile it only reports.
    pub fn stop_motor(&mut self) -> std::result::Result<Outcome, CommandError> {
        let was_running = self.stepper.is_running();
        self.stepper.stop().map_err(command_hw_error)?;
        let raw = self.stepper.current_position();
        if !was_running && !self.in_flight && raw == 0 {
            return Ok(Outcome::Done("motor idle, nothing to stop".to_string()));
        }
        let record = self.settle(raw);
        Ok(Outcome::Done(format!("stopped at {:.3}", record.current)))
    }

    /// Scheduler tick: advance the motor one control step and reconcile when
    /// it went from moving to idle.
    pub fn tick(&mut self) -> Result<Tick> {
        let running = self
            .stepper
            .run()
            .map_err(|e| map_hw_error(e.as_ref()))
            .wrap_err("tick: advance stepper")?;
        if running {
            return Ok(Tick::Moving);
        }
        if self.in_flight {
            let raw = self.stepper.current_position();
            let record = self.settle(raw);
            return Ok(Tick::Settled(record));
        }
        Ok(Tick::Idle)
    }

    /// Reconcile from `raw` traveled steps, zero the counter, persist.
    fn settle(&mut self, raw: i64) -> PositionRecord {
        let p = self.settings.position;
        let mut next = p.reconcile_after_stop(raw, self.settings.motor.steps_per_revolution);
        if raw == 0 && self.in_flight {
            // Halted before the first step: nothing was traveled.
            next.current = p.previous;
        }
        self.settings.position = next;
        self.stepper.reset_position();
        self.in_flight = false;
        self.persist();
        if self.cfg.disable_when_idle
            && let Err(e) = self.stepper.disable_outputs()
        {
            warn!(error = %map_hw_error(e.as_ref()), "failed to disable outputs");
        }
        info!(
            raw_steps = raw,
            previous = next.previous,
            current = next.current,
            "position reconciled"
        );
        next
    }

    fn set_threshold(
        &mut self,
        side: Side,
        value: Option<f32>,
    ) -> std::result::Result<Outcome, CommandError> {
        let mut p = self.settings.position;
        let v = match side {
            Side::Left => p.set_left(value)?,
            Side::Right => p.set_right(value)?,
        };
        self.settings.position = p;
        self.persist();
        info!(%side, value = v, "threshold set");
        Ok(Outcome::Done(format!("{side} threshold set to {v:.3}")))
    }

    fn mutate(
        &mut self,
        f: impl FnOnce(&mut PositionRecord),
        message: &str,
    ) -> std::result::Result<Outcome, CommandError> {
        f(&mut self.settings.position);
        self.persist();
        info!(position = ?self.settings.position, "{message}");
        Ok(Outcome::Done(message.to_string()))
    }

    /// Both values go to the hardware together; the driver takes them jointly.
    fn set_motor_params(
        &mut self,
        acceleration: f32,
        max_speed: f32,
    ) -> std::result::Result<Outcome, CommandError> {
        if !(acceleration.is_finite() && acceleration > 0.0 && max_speed.is_finite() && max_speed > 0.0)
        {
            return Err(CommandError::InvalidValue {
                action: "set_motor_params",
                value: format!("{acceleration},{max_speed}"),
            });
        }
        self.stepper
            .set_motion(acceleration, max_speed)
            .map_err(command_hw_error)?;
        self.settings.motor.acceleration = acceleration;
        self.settings.motor.max_speed = max_speed;
        self.persist();
        info!(acceleration, max_speed, "motor parameters updated");
        Ok(Outcome::Done(format!(
            "acceleration {acceleration}, max speed {max_speed}"
        )))
    }

    /// Switch wiring profile. A move in progress is stopped and reconciled
    /// first, because reconfiguring drops the hardware target.
    fn set_motor_type(&mut self, kind: MotorKind) -> std::result::Result<Outcome, CommandError> {
        if self.stepper.is_running() || self.in_flight {
            self.stop_motor()?;
        }
        let motor = MotorParams::new(kind, self.settings.motor.acceleration, self.settings.motor.max_speed);
        let wiring = self.cfg.pins.wiring(kind);
        self.stepper.configure(&wiring).map_err(command_hw_error)?;
        self.stepper
            .set_motion(motor.acceleration, motor.max_speed)
            .map_err(command_hw_error)?;
        self.stepper.reset_position();
        if self.cfg.disable_when_idle
            && let Err(e) = self.stepper.disable_outputs()
        {
            warn!(error = %map_hw_error(e.as_ref()), "failed to disable outputs");
        }
        self.settings.motor = motor;
        self.persist();
        info!(%kind, steps_per_revolution = motor.steps_per_revolution, "motor type switched");
        Ok(Outcome::Done(format!(
            "motor type {kind}, {} steps/rev",
            motor.steps_per_revolution
        )))
    }

    /// Restore factory settings (position, motor, API key) and persist.
    pub fn erase(&mut self) -> Result<()> {
        if self.stepper.is_running() {
            self.stepper
                .stop()
                .map_err(|e| map_hw_error(e.as_ref()))?;
        }
        self.in_flight = false;
        let factory = self.cfg.factory.clone();
        let wiring = self.cfg.pins.wiring(factory.motor.kind);
        self.stepper
            .configure(&wiring)
            .map_err(|e| map_hw_error(e.as_ref()))?;
        self.stepper
            .set_motion(factory.motor.acceleration, factory.motor.max_speed)
            .map_err(|e| map_hw_error(e.as_ref()))?;
        self.stepper.reset_position();
        self.settings = factory;
        self.store
            .save(&self.settings)
            .wrap_err("erase: persist factory settings")?;
        warn!("all settings erased");
        Ok(())
    }

    /// Synchronous save. A failing store is logged and the controller carries
    /// on with the in-memory record.
    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.settings) {
            error!(error = %e, "failed to persist settings");
        }
    }
}
