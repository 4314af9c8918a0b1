//! Command surface: `(action, value)` pairs parsed into typed commands, and
//! the replies handed back to the transport.

use curtain_traits::MotorKind;

use crate::error::CommandError;
use crate::position::PositionRecord;
use crate::settings::MotorParams;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    MoveBy(f32),
    StepLeft,
    StepRight,
    TotalLeft,
    TotalRight,
    Stop,
    SetLeft(Option<f32>),
    SetRight(Option<f32>),
    ResetLeft,
    ResetRight,
    ResetCurrent,
    SetMotorParams { acceleration: f32, max_speed: f32 },
    SetMotorType(MotorKind),
    SetApiKey(String),
    Status,
}

/// Empty or whitespace-only values count as absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_f32(action: &'static str, raw: &str) -> Result<f32, CommandError> {
    match raw.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CommandError::InvalidValue {
            action,
            value: raw.to_string(),
        }),
    }
}

fn required_f32(action: &'static str, value: Option<&str>) -> Result<f32, CommandError> {
    let raw = present(value).ok_or(CommandError::MissingValue(action))?;
    parse_f32(action, raw)
}

fn optional_f32(action: &'static str, value: Option<&str>) -> Result<Option<f32>, CommandError> {
    present(value).map(|raw| parse_f32(action, raw)).transpose()
}

impl Command {
    /// Parse a transport-level action name and optional argument.
    pub fn parse(action: &str, value: Option<&str>) -> Result<Self, CommandError> {
        let cmd = match action.trim().to_ascii_lowercase().as_str() {
            "move" | "move_by" | "move_motor" => Command::MoveBy(required_f32("move", value)?),
            "step_left" => Command::StepLeft,
            "step_right" => Command::StepRight,
            "total_left" | "move_total_left" => Command::TotalLeft,
            "total_right" | "move_total_right" => Command::TotalRight,
            "stop" | "stop_motor" => Command::Stop,
            "set_left" => Command::SetLeft(optional_f32("set_left", value)?),
            "set_right" => Command::SetRight(optional_f32("set_right", value)?),
            "reset_left" => Command::ResetLeft,
            "reset_right" => Command::ResetRight,
            "reset_current" => Command::ResetCurrent,
            "set_motor_params" => {
                const ACTION: &str = "set_motor_params";
                let raw = present(value).ok_or(CommandError::MissingValue(ACTION))?;
                let (acc, speed) = raw
                    .split_once(',')
                    .ok_or_else(|| CommandError::InvalidValue {
                        action: ACTION,
                        value: raw.to_string(),
                    })?;
                let acceleration = parse_f32(ACTION, acc.trim())?;
                let max_speed = parse_f32(ACTION, speed.trim())?;
                if acceleration <= 0.0 || max_speed <= 0.0 {
                    return Err(CommandError::InvalidValue {
                        action: ACTION,
                        value: raw.to_string(),
                    });
                }
                Command::SetMotorParams {
                    acceleration,
                    max_speed,
                }
            }
            "set_motor_type" => {
                let raw = present(value).ok_or(CommandError::MissingValue("set_motor_type"))?;
                let kind = raw
                    .parse::<MotorKind>()
                    .map_err(|_| CommandError::InvalidValue {
                        action: "set_motor_type",
                        value: raw.to_string(),
                    })?;
                Command::SetMotorType(kind)
            }
            "set_api_key" => {
                let raw = present(value).ok_or(CommandError::MissingValue("set_api_key"))?;
                Command::SetApiKey(raw.to_string())
            }
            "status" => Command::Status,
            other => return Err(CommandError::UnsupportedAction(other.to_string())),
        };
        Ok(cmd)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::MoveBy(_) => "move",
            Command::StepLeft => "step_left",
            Command::StepRight => "step_right",
            Command::TotalLeft => "total_left",
            Command::TotalRight => "total_right",
            Command::Stop => "stop",
            Command::SetLeft(_) => "set_left",
            Command::SetRight(_) => "set_right",
            Command::ResetLeft => "reset_left",
            Command::ResetRight => "reset_right",
            Command::ResetCurrent => "reset_current",
            Command::SetMotorParams { .. } => "set_motor_params",
            Command::SetMotorType(_) => "set_motor_type",
            Command::SetApiKey(_) => "set_api_key",
            Command::Status => "status",
        }
    }
}

/// Read-only snapshot returned by `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub position: PositionRecord,
    pub motor: MotorParams,
    pub running: bool,
    pub left_set: bool,
    pub right_set: bool,
    /// Steps counted by the hardware since the last reconciliation.
    pub raw_steps: i64,
}

/// Successful result of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done(String),
    /// A move arrived while the motor was running; nothing changed.
    Busy,
    Status(StatusReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    Busy,
    Error,
}

impl ReplyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyStatus::Ok => "ok",
            ReplyStatus::Busy => "busy",
            ReplyStatus::Error => "error",
        }
    }
}

/// Transport-facing reply: status, human-readable message, optional snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: ReplyStatus,
    pub message: String,
    pub report: Option<StatusReport>,
    pub error: Option<CommandError>,
}

pub const BUSY_MESSAGE: &str = "motor busy, ignored";

impl From<Result<Outcome, CommandError>> for Reply {
    fn from(r: Result<Outcome, CommandError>) -> Self {
        match r {
            Ok(Outcome::Done(message)) => Reply {
                status: ReplyStatus::Ok,
                message,
                report: None,
                error: None,
            },
            Ok(Outcome::Busy) => Reply {
                status: ReplyStatus::Busy,
                message: BUSY_MESSAGE.to_string(),
                report: None,
                error: None,
            },
            Ok(Outcome::Status(report)) => Reply {
                status: ReplyStatus::Ok,
                message: "status".to_string(),
                report: Some(report),
                error: None,
            },
            Err(e) => Reply {
                status: ReplyStatus::Error,
                message: e.to_string(),
                report: None,
                error: Some(e),
            },
        }
    }
}
