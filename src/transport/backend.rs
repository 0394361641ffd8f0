use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::signal::LineFormat;

/// Baud rate the grip-ball firmware prints at
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// The ESP32 resets when the port opens and prints noise for a moment
pub const SERIAL_SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {target}: {reason}")]
    Open { target: String, reason: String },

    #[error("read from {target} failed: {reason}")]
    Read { target: String, reason: String },

    #[error("unsupported transport target: {0:?}")]
    UnsupportedTarget(String),
}

/// Where the sensor stream comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    /// USB serial device, one integer per line
    Serial { path: String, baud_rate: u32 },
    /// Raw TCP socket, one comma-separated tuple per line
    Tcp { addr: String },
    /// WebSocket endpoint, one comma-separated tuple per message
    WebSocket { url: String },
}

impl TransportTarget {
    /// Interpret a configured target string.
    ///
    /// `ws://` and `wss://` select the WebSocket transport, `tcp://host:port`
    /// a raw socket, and anything without a scheme is treated as a serial
    /// device path.
    pub fn parse(target: &str, baud_rate: Option<u32>) -> Result<Self, TransportError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(TransportError::UnsupportedTarget(target.to_string()));
        }

        if target.starts_with("ws://") || target.starts_with("wss://") {
            return Ok(Self::WebSocket {
                url: target.to_string(),
            });
        }

        if let Some(addr) = target.strip_prefix("tcp://") {
            if addr.is_empty() {
                return Err(TransportError::UnsupportedTarget(target.to_string()));
            }
            return Ok(Self::Tcp {
                addr: addr.to_string(),
            });
        }

        if target.contains("://") {
            return Err(TransportError::UnsupportedTarget(target.to_string()));
        }

        Ok(Self::Serial {
            path: target.to_string(),
            baud_rate: baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
        })
    }

    pub fn line_format(&self) -> LineFormat {
        match self {
            Self::Serial { .. } => LineFormat::Single,
            Self::Tcp { .. } | Self::WebSocket { .. } => LineFormat::CSV,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        match self {
            Self::Serial { .. } => SERIAL_SETTLE_DELAY,
            Self::Tcp { .. } | Self::WebSocket { .. } => Duration::ZERO,
        }
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { path, baud_rate } => write!(f, "{} @ {} baud", path, baud_rate),
            Self::Tcp { addr } => write!(f, "tcp://{}", addr),
            Self::WebSocket { url } => f.write_str(url),
        }
    }
}

/// A byte-stream source yielding one raw line per read
///
/// Implementations:
/// - Serial: newline-framed USB serial device
/// - TCP: newline-framed socket
/// - WebSocket: one text or binary message per line
#[async_trait]
pub trait Transport: Send {
    /// Read the next raw line
    ///
    /// Returns `Ok(None)` once the peer has closed the stream. The session
    /// drops this future when its per-read timeout expires, so
    /// implementations must not lose buffered data when cancelled.
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Release the underlying device or connection
    async fn close(&mut self) -> Result<(), TransportError>;

    /// How lines from this source are laid out
    fn line_format(&self) -> LineFormat;

    /// Time to wait after opening before the first read
    fn settle_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Drop input that arrived but has not been read yet
    ///
    /// Called once after the settle delay. Sources without a receive buffer
    /// of their own keep the default no-op.
    fn discard_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Transport name for logging
    fn name(&self) -> &str;
}

/// Transport factory
pub struct TransportFactory;

impl TransportFactory {
    /// Open the transport matching `target`
    pub async fn open(target: &TransportTarget) -> Result<Box<dyn Transport>, TransportError> {
        info!("Opening transport: {}", target);

        match target {
            TransportTarget::Serial { path, baud_rate } => {
                let transport = super::lines::open_serial(path, *baud_rate)?;
                Ok(Box::new(transport))
            }

            TransportTarget::Tcp { addr } => {
                let transport = super::lines::open_tcp(addr).await?;
                Ok(Box::new(transport))
            }

            TransportTarget::WebSocket { url } => {
                let transport = super::websocket::WebSocketTransport::connect(url).await?;
                Ok(Box::new(transport))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial_path_uses_default_baud() {
        let target = TransportTarget::parse("/dev/ttyUSB0", None).unwrap();
        assert_eq!(
            target,
            TransportTarget::Serial {
                path: "/dev/ttyUSB0".to_string(),
                baud_rate: DEFAULT_BAUD_RATE,
            }
        );
        assert_eq!(target.line_format(), LineFormat::Single);
        assert_eq!(target.settle_delay(), SERIAL_SETTLE_DELAY);
    }

    #[test]
    fn test_parse_serial_path_with_baud() {
        let target = TransportTarget::parse("COM3", Some(9600)).unwrap();
        assert_eq!(
            target,
            TransportTarget::Serial {
                path: "COM3".to_string(),
                baud_rate: 9600,
            }
        );
    }

    #[test]
    fn test_parse_websocket_url() {
        let target = TransportTarget::parse("ws://192.168.4.1/ws", Some(115_200)).unwrap();
        assert_eq!(
            target,
            TransportTarget::WebSocket {
                url: "ws://192.168.4.1/ws".to_string(),
            }
        );
        assert_eq!(target.line_format(), LineFormat::CSV);
        assert_eq!(target.settle_delay(), Duration::ZERO);
    }

    #[test]
    fn test_parse_tcp_address() {
        let target = TransportTarget::parse("tcp://127.0.0.1:81", None).unwrap();
        assert_eq!(
            target,
            TransportTarget::Tcp {
                addr: "127.0.0.1:81".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_scheme_and_empty() {
        assert!(matches!(
            TransportTarget::parse("http://example.com", None),
            Err(TransportError::UnsupportedTarget(_))
        ));
        assert!(matches!(
            TransportTarget::parse("tcp://", None),
            Err(TransportError::UnsupportedTarget(_))
        ));
        assert!(matches!(
            TransportTarget::parse("   ", None),
            Err(TransportError::UnsupportedTarget(_))
        ));
    }
}
