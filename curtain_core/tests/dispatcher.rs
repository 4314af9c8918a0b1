use curtain_core::mocks::{MemoryStore, SpyStepper, StepperCall};
use curtain_core::{
    Command, CommandError, Controller, ControllerBuilder, ControllerCfg, MotorParams, Outcome,
    PositionRecord, ReplyStatus, Settings, Side, Tick,
};
use curtain_traits::{MotorKind, PinMap, Stepper, Wiring};
use rstest::rstest;

const KEY: &str = "s3cret";

fn pins() -> PinMap {
    PinMap {
        in1: 5,
        in2: 6,
        in3: 13,
        in4: 19,
        step: 20,
        dir: 21,
        enable: Some(26),
    }
}

fn cfg() -> ControllerCfg {
    ControllerCfg {
        pins: pins(),
        step_rotations: 2.0,
        disable_when_idle: true,
        factory: Settings::factory(MotorParams::new(MotorKind::A4988, 400.0, 500.0), KEY),
    }
}

fn stored(record: PositionRecord) -> Settings {
    Settings {
        position: record,
        ..cfg().factory
    }
}

fn controller(stepper: SpyStepper, record: PositionRecord) -> Controller<SpyStepper, MemoryStore> {
    ControllerBuilder::new()
        .with_stepper(stepper)
        .with_store(MemoryStore::with(stored(record)))
        .with_cfg(cfg())
        .start()
        .expect("controller start")
}

fn rec(left: f32, previous: f32, current: f32, right: f32) -> PositionRecord {
    PositionRecord {
        left,
        previous,
        current,
        right,
    }
}

fn settle(c: &mut Controller<SpyStepper, MemoryStore>) -> Tick {
    c.tick().expect("tick")
}

#[rstest]
fn first_boot_persists_factory_settings() {
    let c = ControllerBuilder::new()
        .with_stepper(SpyStepper::default())
        .with_store(MemoryStore::default())
        .with_cfg(cfg())
        .start()
        .unwrap();
    assert_eq!(c.store().saves, 1);
    assert_eq!(c.settings(), &cfg().factory);
    assert!(
        c.stepper()
            .calls
            .contains(&StepperCall::Configure(pins().wiring(MotorKind::A4988)))
    );
    assert!(c.stepper().calls.contains(&StepperCall::SetMotion(400.0, 500.0)));
}

#[rstest]
fn inconsistent_stored_position_falls_back_to_factory_position() {
    let c = controller(SpyStepper::default(), rec(10.0, 0.0, 50.0, 5.0));
    assert_eq!(c.record(), &PositionRecord::default());
}

#[rstest]
fn stored_position_outside_thresholds_is_clamped_on_boot() {
    let c = controller(SpyStepper::default(), rec(5.0, 0.0, 0.0, 20.0));
    assert_eq!(c.record(), &rec(5.0, 5.0, 5.0, 20.0));
    assert!(c.record().is_left_set());
    assert!(c.record().is_right_set());
}

#[rstest]
fn end_to_end_calibrate_and_clamp() {
    let mut c = controller(SpyStepper::completing(), PositionRecord::default());

    assert_eq!(c.handle("set_left", None, KEY).status, ReplyStatus::Ok);
    assert_eq!(c.record(), &rec(0.0, 0.0, 0.0, 100.0));

    assert_eq!(c.handle("move", Some("50"), KEY).status, ReplyStatus::Ok);
    assert_eq!(c.record(), &rec(0.0, 0.0, 50.0, 100.0));
    assert_eq!(c.stepper().moves(), vec![10_000]);
    assert_eq!(settle(&mut c), Tick::Settled(rec(0.0, 0.0, 50.0, 100.0)));

    assert_eq!(c.handle("move", Some("-100"), KEY).status, ReplyStatus::Ok);
    assert_eq!(c.record(), &rec(0.0, 50.0, 0.0, 100.0));
    assert_eq!(c.stepper().moves(), vec![10_000, -10_000]);
    assert_eq!(settle(&mut c), Tick::Settled(rec(0.0, 50.0, 0.0, 100.0)));
    assert_eq!(settle(&mut c), Tick::Idle);

    // The last record written is the reconciled one.
    let persisted = c.store().stored.as_ref().map(|s| s.position);
    assert_eq!(persisted, Some(rec(0.0, 50.0, 0.0, 100.0)));
}

#[rstest]
fn planned_record_is_persisted_before_motion() {
    let mut c = controller(SpyStepper::default(), PositionRecord::default());
    c.execute(Command::MoveBy(3.0)).unwrap();
    assert!(c.is_running());
    let persisted = c.store().stored.as_ref().map(|s| s.position);
    assert_eq!(persisted, Some(rec(-100.0, 0.0, 3.0, 100.0)));
    assert_eq!(settle(&mut c), Tick::Moving);
}

#[rstest]
fn busy_motor_ignores_moves() {
    let mut c = controller(SpyStepper::default(), rec(-10.0, 0.0, 0.0, 10.0));
    c.execute(Command::MoveBy(5.0)).unwrap();
    let record = *c.record();
    let saves = c.store().saves;

    for cmd in [
        Command::MoveBy(1.0),
        Command::StepLeft,
        Command::StepRight,
        Command::TotalLeft,
    ] {
        assert_eq!(c.execute(cmd), Ok(Outcome::Busy));
    }
    let reply = c.handle("move", Some("-3"), KEY);
    assert_eq!(reply.status, ReplyStatus::Busy);
    assert_eq!(reply.message, "motor busy, ignored");

    assert_eq!(c.record(), &record);
    assert_eq!(c.store().saves, saves);
    assert_eq!(c.stepper().moves(), vec![1000]);
}

#[rstest]
#[case(Command::TotalLeft, Side::Left)]
#[case(Command::TotalRight, Side::Right)]
fn total_moves_require_calibration(#[case] cmd: Command, #[case] side: Side) {
    let mut c = controller(SpyStepper::default(), PositionRecord::default());
    assert_eq!(c.execute(cmd), Err(CommandError::NotCalibrated(side)));
    assert!(c.stepper().moves().is_empty());
    assert_eq!(c.record(), &PositionRecord::default());
}

#[rstest]
fn total_moves_travel_to_thresholds() {
    let mut c = controller(SpyStepper::completing(), rec(-4.0, 0.0, 1.0, 6.5));
    c.execute(Command::TotalRight).unwrap();
    assert_eq!(c.record().current, 6.5);
    assert_eq!(c.stepper().moves(), vec![1100]);
    settle(&mut c);
    c.execute(Command::TotalLeft).unwrap();
    assert_eq!(c.record().current, -4.0);
    assert_eq!(c.stepper().moves(), vec![1100, -2100]);
}

#[rstest]
fn step_buttons_use_configured_size() {
    let mut c = controller(SpyStepper::completing(), rec(-1.0, 0.0, 0.0, 100.0));
    c.execute(Command::StepRight).unwrap();
    assert_eq!(c.record().current, 2.0);
    settle(&mut c);
    c.execute(Command::StepLeft).unwrap();
    assert_eq!(c.execute(Command::StepLeft), Ok(Outcome::Busy));
    settle(&mut c);
    assert_eq!(c.record().current, 0.0);
    c.execute(Command::StepLeft).unwrap();
    assert_eq!(c.record().current, -1.0);
}

#[rstest]
fn stop_mid_move_reconciles_from_traveled_steps() {
    let mut c = controller(SpyStepper::default(), rec(-100.0, 0.0, 2.0, 100.0));
    c.execute(Command::MoveBy(40.0)).unwrap();
    assert_eq!(c.stepper().moves(), vec![8000]);
    assert_eq!(c.record().previous, 2.0);

    c.stepper_mut().position = 60;
    let out = c.execute(Command::Stop).unwrap();
    assert!(matches!(out, Outcome::Done(ref m) if m.starts_with("stopped at")));
    assert!((c.record().current - 2.3).abs() < 1e-5);
    assert!(!c.is_running());
    assert_eq!(c.stepper().current_position(), 0);

    // Already reconciled: the next tick has nothing to do.
    assert_eq!(settle(&mut c), Tick::Idle);
}

#[rstest]
fn stop_before_first_step_restores_previous() {
    let mut c = controller(SpyStepper::default(), rec(-100.0, 7.0, 1.0, 100.0));
    c.execute(Command::MoveBy(5.0)).unwrap();
    assert_eq!(c.record().current, 6.0);
    c.execute(Command::Stop).unwrap();
    assert_eq!(c.record().current, 1.0);
}

#[rstest]
fn stop_when_idle_is_a_no_op() {
    let mut c = controller(SpyStepper::default(), rec(-100.0, 0.0, 1.0, 100.0));
    let saves = c.store().saves;
    let out = c.execute(Command::Stop).unwrap();
    assert_eq!(out, Outcome::Done("motor idle, nothing to stop".into()));
    assert_eq!(c.store().saves, saves);
    assert_eq!(c.record().current, 1.0);
}

#[rstest]
fn settled_move_disables_outputs() {
    let mut c = controller(SpyStepper::completing(), PositionRecord::default());
    c.execute(Command::MoveBy(1.0)).unwrap();
    assert_eq!(c.stepper().calls.last(), Some(&StepperCall::MoveBy(200)));
    settle(&mut c);
    assert_eq!(c.stepper().calls.last(), Some(&StepperCall::DisableOutputs));
}

#[rstest]
#[case("set_left", Some("5"), rec(-100.0, 0.0, 1.0, 100.0))]
#[case("set_left", Some("200"), rec(-100.0, 0.0, 1.0, 100.0))]
#[case("set_right", Some("0.5"), rec(-100.0, 0.0, 1.0, 100.0))]
#[case("set_right", Some("-150"), rec(-100.0, 0.0, 1.0, 100.0))]
fn invalid_thresholds_are_rejected(
    #[case] action: &str,
    #[case] value: Option<&str>,
    #[case] start: PositionRecord,
) {
    let mut c = controller(SpyStepper::default(), start);
    let saves = c.store().saves;
    let reply = c.handle(action, value, KEY);
    assert_eq!(reply.status, ReplyStatus::Error);
    assert!(matches!(reply.error, Some(CommandError::InvalidThreshold(_))));
    assert_eq!(c.record(), &start);
    assert_eq!(c.store().saves, saves);
}

#[rstest]
fn thresholds_and_resets_persist() {
    let mut c = controller(SpyStepper::default(), rec(-100.0, 0.0, 1.0, 100.0));
    c.execute(Command::SetLeft(Some(-3.0))).unwrap();
    c.execute(Command::SetRight(None)).unwrap();
    assert_eq!(c.record(), &rec(-3.0, 0.0, 1.0, 1.0));

    c.execute(Command::ResetRight).unwrap();
    c.execute(Command::ResetLeft).unwrap();
    let once = *c.record();
    c.execute(Command::ResetLeft).unwrap();
    assert_eq!(c.record(), &once);
    assert_eq!(once, rec(-100.0, 0.0, 1.0, 100.0));

    c.execute(Command::ResetCurrent).unwrap();
    assert_eq!(c.record(), &PositionRecord::default());
    let persisted = c.store().stored.as_ref().map(|s| s.position);
    assert_eq!(persisted, Some(PositionRecord::default()));
}

#[rstest]
fn reset_current_outside_thresholds_survives_reboot() {
    let mut c = controller(SpyStepper::completing(), PositionRecord::default());
    c.execute(Command::MoveBy(10.0)).unwrap();
    assert!(matches!(settle(&mut c), Tick::Settled(_)));
    c.execute(Command::SetLeft(Some(5.0))).unwrap();
    c.execute(Command::SetRight(Some(20.0))).unwrap();

    c.execute(Command::ResetCurrent).unwrap();
    assert_eq!(c.record(), &rec(5.0, 5.0, 5.0, 20.0));
    assert!(c.record().is_consistent());

    let rebooted = ControllerBuilder::new()
        .with_stepper(SpyStepper::default())
        .with_store(c.store().clone())
        .with_cfg(cfg())
        .start()
        .unwrap();
    assert_eq!(rebooted.record().left, 5.0);
    assert_eq!(rebooted.record().right, 20.0);
    assert_eq!(rebooted.record(), c.record());
}

#[rstest]
fn motor_params_are_applied_together() {
    let mut c = controller(SpyStepper::default(), PositionRecord::default());
    let reply = c.handle("set_motor_params", Some("800,1200"), KEY);
    assert_eq!(reply.status, ReplyStatus::Ok);
    assert_eq!(c.stepper().calls.last(), Some(&StepperCall::SetMotion(800.0, 1200.0)));
    assert_eq!(c.settings().motor.acceleration, 800.0);
    assert_eq!(c.settings().motor.max_speed, 1200.0);
    let persisted = c.store().stored.as_ref().map(|s| s.motor.max_speed);
    assert_eq!(persisted, Some(1200.0));
}

#[rstest]
fn motor_type_switch_resets_steps_per_revolution() {
    let mut c = controller(SpyStepper::default(), PositionRecord::default());
    assert_eq!(c.settings().motor.steps_per_revolution, 200);
    let reply = c.handle("set_motor_type", Some("uln4wire"), KEY);
    assert_eq!(reply.status, ReplyStatus::Ok);
    assert_eq!(c.settings().motor.kind, MotorKind::Uln4Wire);
    assert_eq!(c.settings().motor.steps_per_revolution, 2048);
    assert!(c.stepper().calls.contains(&StepperCall::Configure(Wiring::Uln4Wire {
        pins: [5, 6, 13, 19]
    })));

    c.execute(Command::MoveBy(1.0)).unwrap();
    assert_eq!(c.stepper().moves(), vec![2048]);
}

#[rstest]
fn motor_type_switch_mid_move_reconciles_first() {
    let mut c = controller(SpyStepper::default(), PositionRecord::default());
    c.execute(Command::MoveBy(10.0)).unwrap();
    c.stepper_mut().position = 100;
    c.execute(Command::SetMotorType(MotorKind::Uln4Wire)).unwrap();
    assert!((c.record().current - 0.5).abs() < 1e-6);
    assert!(!c.is_running());
}

#[rstest]
#[case("dance", None, "unsupported action: dance")]
#[case("move", None, "missing value for move")]
#[case("move", Some("far"), "invalid value for move: far")]
#[case("set_motor_type", Some("servo"), "invalid value for set_motor_type: servo")]
fn malformed_requests_change_nothing(
    #[case] action: &str,
    #[case] value: Option<&str>,
    #[case] message: &str,
) {
    let mut c = controller(SpyStepper::default(), PositionRecord::default());
    let saves = c.store().saves;
    let reply = c.handle(action, value, KEY);
    assert_eq!(reply.status, ReplyStatus::Error);
    assert_eq!(reply.message, message);
    assert_eq!(c.store().saves, saves);
    assert!(c.stepper().moves().is_empty());
}

#[rstest]
#[case("status")]
#[case("move")]
#[case("stop")]
fn wrong_token_is_unauthorized(#[case] action: &str) {
    let mut c = controller(SpyStepper::default(), PositionRecord::default());
    let reply = c.handle(action, Some("1"), "nope");
    assert_eq!(reply.status, ReplyStatus::Error);
    assert_eq!(reply.error, Some(CommandError::Unauthorized));
    assert!(c.stepper().moves().is_empty());
}

#[rstest]
fn api_key_can_be_rotated() {
    let mut c = controller(SpyStepper::default(), PositionRecord::default());
    assert_eq!(c.handle("set_api_key", Some("n3w"), KEY).status, ReplyStatus::Ok);
    assert_eq!(c.handle("status", None, KEY).status, ReplyStatus::Error);
    assert_eq!(c.handle("status", None, "n3w").status, ReplyStatus::Ok);
}

#[rstest]
fn status_reports_calibration_and_motion() {
    let mut c = controller(SpyStepper::default(), rec(-2.0, 0.0, 0.0, 100.0));
    c.execute(Command::MoveBy(1.0)).unwrap();
    let reply = c.handle("status", None, KEY);
    let report = reply.report.expect("status report");
    assert!(report.left_set);
    assert!(!report.right_set);
    assert!(report.running);
    assert_eq!(report.position.current, 1.0);
    assert_eq!(report.motor.kind, MotorKind::A4988);
}

#[rstest]
fn hardware_failure_rolls_back_the_plan() {
    let stepper = SpyStepper {
        fail_next_move: true,
        ..SpyStepper::default()
    };
    let mut c = controller(stepper, rec(-100.0, 0.0, 1.0, 100.0));
    let err = c.execute(Command::MoveBy(3.0)).expect_err("driver fault");
    assert!(matches!(err, CommandError::Hardware(_)));
    assert_eq!(c.record(), &rec(-100.0, 0.0, 1.0, 100.0));
    let persisted = c.store().stored.as_ref().map(|s| s.position);
    assert_eq!(persisted, Some(rec(-100.0, 0.0, 1.0, 100.0)));
}

#[rstest]
fn failing_store_does_not_block_commands() {
    let store = MemoryStore {
        fail_saves: true,
        ..MemoryStore::with(stored(PositionRecord::default()))
    };
    let mut c = ControllerBuilder::new()
        .with_stepper(SpyStepper::completing())
        .with_store(store)
        .with_cfg(cfg())
        .start()
        .unwrap();
    assert!(matches!(c.execute(Command::MoveBy(1.0)), Ok(Outcome::Done(_))));
    assert_eq!(c.record().current, 1.0);
    assert_eq!(settle(&mut c), Tick::Settled(rec(-100.0, 0.0, 1.0, 100.0)));
    assert_eq!(c.store().saves, 0);
}

#[rstest]
fn erase_restores_factory_settings() {
    let mut c = controller(SpyStepper::default(), rec(-5.0, 1.0, 2.0, 5.0));
    c.execute(Command::SetMotorType(MotorKind::Uln4Wire)).unwrap();
    c.execute(Command::SetApiKey("other".into())).unwrap();
    c.erase().unwrap();
    assert_eq!(c.settings(), &cfg().factory);
    assert_eq!(c.store().stored.as_ref(), Some(&cfg().factory));
}
