//! Coil sequencing for a unipolar motor behind a ULN2003 board.
//!
//! One entry per full step with two coils energized, so a 28BYJ-48 turns
//! once every `MotorKind::Uln4Wire.steps_per_revolution()` entries.

/// Two-phase-on full-step sequence, coils IN1..IN4.
pub const FULL_STEP: [[bool; 4]; 4] = [
    [true, true, false, false],
    [false, true, true, false],
    [false, false, true, true],
    [true, false, false, true],
];

/// Phase index after one step in the given direction.
#[inline]
pub fn next_phase(phase: usize, forward: bool) -> usize {
    let n = FULL_STEP.len();
    if forward {
        (phase + 1) % n
    } else {
        (phase + n - 1) % n
    }
}
