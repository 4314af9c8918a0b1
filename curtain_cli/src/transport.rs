//! JSON line transport: one request object per line in, one reply per line out.

use curtain_core::{Controller, Reply, SettingsStore, StatusReport};
use curtain_traits::Stepper;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Request {
    pub action: String,
    /// Accepts `"12.5"`, `12.5`, `"800,1200"` or null.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub token: String,
}

impl Request {
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PositionData {
    pub left: f32,
    pub previous: f32,
    pub current: f32,
    pub right: f32,
    pub left_set: bool,
    pub right_set: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MotorData {
    pub kind: String,
    pub acceleration: f32,
    pub max_speed: f32,
    pub steps_per_revolution: u32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StatusData {
    pub position: PositionData,
    pub motor: MotorData,
    pub running: bool,
    pub raw_steps: i64,
}

impl From<&StatusReport> for StatusData {
    fn from(r: &StatusReport) -> Self {
        Self {
            position: PositionData {
                left: r.position.left,
                previous: r.position.previous,
                current: r.position.current,
                right: r.position.right,
                left_set: r.left_set,
                right_set: r.right_set,
            },
            motor: MotorData {
                kind: r.motor.kind.to_string(),
                acceleration: r.motor.acceleration,
                max_speed: r.motor.max_speed,
                steps_per_revolution: r.motor.steps_per_revolution,
            },
            running: r.running,
            raw_steps: r.raw_steps,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplyLine {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StatusData>,
}

impl From<&Reply> for ReplyLine {
    fn from(r: &Reply) -> Self {
        Self {
            status: r.status.as_str(),
            message: r.message.clone(),
            data: r.report.as_ref().map(StatusData::from),
        }
    }
}

pub fn render(reply: &Reply) -> String {
    let line = ReplyLine::from(reply);
    serde_json::to_string(&line).unwrap_or_else(|e| {
        serde_json::json!({ "status": "error", "message": format!("encode reply: {e}") })
            .to_string()
    })
}

/// Parse one request line, dispatch it and render the reply line.
pub fn handle_line<M: Stepper, S: SettingsStore>(ctrl: &mut Controller<M, S>, line: &str) -> String {
    match serde_json::from_str::<Request>(line) {
        Ok(req) => {
            let value = req.value_text();
            render(&ctrl.handle(&req.action, value.as_deref(), &req.token))
        }
        Err(e) => {
            tracing::warn!(error = %e, "malformed request line");
            serde_json::json!({ "status": "error", "message": format!("malformed request: {e}") })
                .to_string()
        }
    }
}

/// One-line human summary of a status snapshot.
pub fn describe(r: &StatusReport) -> String {
    let side = |v: f32, set: bool| {
        if set {
            format!("{v:.3}")
        } else {
            format!("{v:.3} (unset)")
        }
    };
    format!(
        "position {:.3} (previous {:.3}), left {}, right {}, motor {} acc {} max {} ({} steps/rev), {}",
        r.position.current,
        r.position.previous,
        side(r.position.left, r.left_set),
        side(r.position.right, r.right_set),
        r.motor.kind,
        r.motor.acceleration,
        r.motor.max_speed,
        r.motor.steps_per_revolution,
        if r.running { "moving" } else { "idle" }
    )
}
