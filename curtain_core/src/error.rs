use std::fmt;

use thiserror::Error;

/// Which threshold an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Left => "left",
            Side::Right => "right",
        })
    }
}

/// Coarse class of a rejected command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, unparsable or out-of-range argument, or unknown action.
    Validation,
    /// Request conflicts with current state (threshold ordering).
    Conflict,
    /// Move-to-threshold before that threshold was set.
    NotCalibrated,
    Unauthorized,
    Hardware,
}

/// Reason a command was rejected. No state is changed when one is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),
    #[error("missing value for {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {action}: {value}")]
    InvalidValue { action: &'static str, value: String },
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("{0} threshold not calibrated")]
    NotCalibrated(Side),
    #[error("unauthorized")]
    Unauthorized,
    #[error("hardware error: {0}")]
    Hardware(String),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::UnsupportedAction(_)
            | CommandError::MissingValue(_)
            | CommandError::InvalidValue { .. } => ErrorKind::Validation,
            CommandError::InvalidThreshold(_) => ErrorKind::Conflict,
            CommandError::NotCalibrated(_) => ErrorKind::NotCalibrated,
            CommandError::Unauthorized => ErrorKind::Unauthorized,
            CommandError::Hardware(_) => ErrorKind::Hardware,
        }
    }
}

/// Failures outside the command path: boot, tick, persistence.
#[derive(Debug, Error, Clone)]
pub enum CurtainError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing stepper")]
    MissingStepper,
    #[error("missing settings store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
