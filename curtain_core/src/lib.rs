#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Curtain position model and command dispatcher (hardware-agnostic).
//!
//! All hardware interaction goes through `curtain_traits::Stepper`; all
//! persistence goes through [`store::SettingsStore`].
//!
//! ## Architecture
//!
//! - **Position model**: thresholds, clamped moves, reconciliation (`position`)
//! - **Commands**: action parsing and replies (`command`)
//! - **Dispatcher**: `Controller`, the single owner of settings, stepper and store (`dispatcher`)
//! - **Persistence**: settings record and its store seam (`settings`, `store`)
//!
//! Positions are signed rotations; the stepper works in raw steps and the
//! conversion uses the active profile's steps per revolution.

pub mod auth;
pub mod command;
pub mod conversions;
pub mod dispatcher;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod position;
pub mod settings;
pub mod store;

pub use command::{Command, Outcome, Reply, ReplyStatus, StatusReport};
pub use dispatcher::{Controller, ControllerBuilder, ControllerCfg, Tick};
pub use error::{CommandError, CurtainError, ErrorKind, Side};
pub use position::{MovePlan, PositionRecord};
pub use settings::{MotorParams, Settings};
pub use store::SettingsStore;
