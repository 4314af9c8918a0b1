//! Human-readable error descriptions and structured JSON error formatting.

use curtain_core::error::{BuildError, CurtainError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingStepper => {
                "What happened: No stepper driver was provided to the controller.\nLikely causes: The motor driver failed to initialize.\nHow to fix: Check the [pins] section and GPIO access, then rerun.".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No settings store was provided to the controller.\nLikely causes: [storage].path could not be opened.\nHow to fix: Point [storage].path at a writable location.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CurtainError>() {
        return match ce {
            CurtainError::Hardware(m) | CurtainError::HardwareFault(m) => format!(
                "What happened: The stepper driver reported an error ({m}).\nLikely causes: Wrong pin numbers, missing GPIO permissions, or a wiring fault.\nHow to fix: Verify [pins] and the driver wiring; run `curtain self-check`."
            ),
            CurtainError::Persistence(m) => format!(
                "What happened: Settings could not be stored ({m}).\nLikely causes: Read-only or full filesystem.\nHow to fix: Check [storage].path and free space."
            ),
            CurtainError::Config(m) => format!(
                "What happened: Invalid configuration ({m}).\nLikely causes: Out-of-range motor values.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config with an existing TOML file. Original: {msg}"
        );
    }

    if lower.contains("parse config") || lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [pins] or [auth], an unknown motor kind, or out-of-range values.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    if lower.contains("settings") && (lower.contains("load") || lower.contains("persist")) {
        return format!(
            "What happened: The settings file could not be accessed.\nLikely causes: Permissions on [storage].path.\nHow to fix: Fix permissions or remove the file to start from factory settings. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 config, 3 hardware, 4 persistence, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if let Some(ce) = err.downcast_ref::<CurtainError>() {
        return match ce {
            CurtainError::Config(_) => 2,
            CurtainError::Hardware(_) | CurtainError::HardwareFault(_) => 3,
            CurtainError::Persistence(_) => 4,
        };
    }
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("read config")
        || lower.contains("parse config")
        || lower.contains("invalid configuration")
    {
        return 2;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = match err.downcast_ref::<CurtainError>() {
        Some(CurtainError::Hardware(_) | CurtainError::HardwareFault(_)) => "Hardware",
        Some(CurtainError::Persistence(_)) => "Persistence",
        Some(CurtainError::Config(_)) => "Config",
        None if exit_code_for_error(err) == 2 => "Config",
        None => "Error",
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
