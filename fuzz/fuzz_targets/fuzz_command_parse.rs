#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    action: &'a str,
    value: Option<&'a str>,
    delta: f32,
}

fuzz_target!(|input: Input<'_>| {
    let _ = curtain_core::Command::parse(input.action, input.value);

    let record = curtain_core::PositionRecord::default();
    let plan = record.plan_move(input.delta);
    assert!(plan.record.is_consistent());
});
