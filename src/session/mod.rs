//! Grip-force session management
//!
//! This module provides the `SessionController` that manages:
//! - Connecting to the sensor transport
//! - Parsing, smoothing and classifying each reading
//! - Enforcing the duration cap and the cooperative stop signal
//! - Handing the finished record to storage and the summary

mod config;
mod controller;
mod record;
mod report;
mod summary;

pub use config::{ConfigError, SessionConfig};
pub use controller::{
    EndReason, SessionController, SessionOutcome, SessionProgress, SessionState, StopHandle,
};
pub use record::{RecordError, Sample, SessionRecord};
pub use report::{finalize, SessionReport};
pub use summary::{ChannelStats, SessionSummary};
