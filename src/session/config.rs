use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::signal::Classification;
use crate::transport::{TransportError, TransportTarget, DEFAULT_BAUD_RATE};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("smoothing window must be at least 1")]
    ZeroSmoothingWindow,

    #[error("duration cap must be a positive number of seconds, got {0}")]
    InvalidDurationCap(f64),

    #[error("read timeout must be greater than zero")]
    ZeroReadTimeout,

    #[error("band minimum {min} is above maximum {max}")]
    InvertedBand { min: i64, max: i64 },
}

/// Configuration for a grip-force session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (used in logs)
    pub session_id: String,

    /// Serial device path, `tcp://host:port` or `ws://` URL
    pub transport_target: String,

    /// Baud rate for serial targets, ignored otherwise
    pub baud_rate: Option<u32>,

    /// Raw values averaged per channel
    /// Default: 3
    pub smoothing_window: usize,

    /// Wall-clock length of the session
    /// Default: 120 seconds
    pub duration_cap_seconds: f64,

    /// Band or threshold the samples are classified against
    pub classification: Classification,

    /// Upper bound for one blocking read; also the stop-signal latency
    pub read_timeout: Duration,

    /// Upper bound for opening the transport
    pub connect_timeout: Duration,

    /// Overrides the transport's own settle delay when set
    pub settle_delay: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            transport_target: "/dev/cu.usbserial-0001".to_string(),
            baud_rate: Some(DEFAULT_BAUD_RATE),
            smoothing_window: 3,
            duration_cap_seconds: 120.0,
            classification: Classification::default(),
            read_timeout: Duration::from_millis(100),
            connect_timeout: Duration::from_secs(5),
            settle_delay: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smoothing_window == 0 {
            return Err(ConfigError::ZeroSmoothingWindow);
        }

        if self.duration_cap_seconds <= 0.0
            || Duration::try_from_secs_f64(self.duration_cap_seconds).is_err()
        {
            return Err(ConfigError::InvalidDurationCap(self.duration_cap_seconds));
        }

        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroReadTimeout);
        }

        if let Classification::Band { min, max } = self.classification {
            if min > max {
                return Err(ConfigError::InvertedBand { min, max });
            }
        }

        Ok(())
    }

    pub fn target(&self) -> Result<TransportTarget, TransportError> {
        TransportTarget::parse(&self.transport_target, self.baud_rate)
    }

    /// Saturates at `Duration::MAX` for caps `validate` would reject
    pub fn duration_cap(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration_cap_seconds.max(0.0)).unwrap_or(Duration::MAX)
    }
}
