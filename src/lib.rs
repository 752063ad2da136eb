//! Live sensor dashboard client.
//!
//! Pulls per-sensor history from a REST backend, follows its websocket delta
//! channel, and keeps one bounded buffer per sensor from which statistics,
//! current status and an alert feed are derived.

pub mod alerts;
pub mod buffer;
pub mod config;
pub mod domain;
pub mod error;
pub mod history;
pub mod live;
pub mod normalize;
pub mod server;
pub mod session;
pub mod state;
pub mod stats;

pub use domain::{DeltaMessage, DisplayPoint, RawPoint, SensorKey};
pub use error::{DashError, Result};
pub use session::DashboardSession;
pub use state::{DashboardEvent, DashboardState, SharedState};
