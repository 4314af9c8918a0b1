//! Maps `Box<dyn Error>` from the stepper seam to typed errors.
//!
//! The `Stepper` trait uses `Box<dyn Error + Send + Sync>` so any driver can
//! plug in; this module converts those to `CurtainError`, with an optional
//! feature-gated path for `curtain_hardware::HwError` downcasting.

use crate::error::{CommandError, CurtainError};

/// Map a trait-boundary error to a typed `CurtainError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to the plain message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> CurtainError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<curtain_hardware::error::HwError>() {
            return match hw {
                curtain_hardware::error::HwError::InvalidParam(msg) => {
                    CurtainError::Config(msg.clone())
                }
                other => CurtainError::HardwareFault(other.to_string()),
            };
        }
    }

    CurtainError::Hardware(e.to_string())
}

/// Same mapping, surfaced as a command rejection.
pub fn command_hw_error(e: Box<dyn std::error::Error + Send + Sync>) -> CommandError {
    CommandError::Hardware(map_hw_error(e.as_ref()).to_string())
}
