#![no_main]
use curtain_config::LoadOutcome;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Whatever is on disk, loading classifies it and a loaded record converts.
    if let LoadOutcome::Loaded(stored) = curtain_config::parse_settings(data) {
        let settings = curtain_core::Settings::from(stored);
        let _ = settings.position.is_consistent();
    }
});
