// Newline-framed transports
//
// Serial devices and raw TCP sockets both deliver a byte stream where each
// reading ends with '\n'. Framing is done by `FramedRead`, which keeps any
// partial line in its own buffer, so a read that is cancelled by the session
// timeout never loses bytes.

use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::{debug, info};

use super::backend::{Transport, TransportError, SERIAL_SETTLE_DELAY};
use crate::signal::LineFormat;

/// Line transport over any async byte reader
pub struct LineTransport<R> {
    name: String,
    frames: Option<FramedRead<R, AnyDelimiterCodec>>,
    format: LineFormat,
    settle_delay: Duration,
    clear_input: Option<fn(&R) -> Result<(), String>>,
}

impl<R> LineTransport<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(name: impl Into<String>, reader: R, format: LineFormat) -> Self {
        let codec = AnyDelimiterCodec::new(b"\n".to_vec(), b"\n".to_vec());

        Self {
            name: name.into(),
            frames: Some(FramedRead::new(reader, codec)),
            format,
            settle_delay: Duration::ZERO,
            clear_input: None,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Hook that flushes the reader's OS-level receive buffer
    pub fn with_input_clear(mut self, clear_input: fn(&R) -> Result<(), String>) -> Self {
        self.clear_input = Some(clear_input);
        self
    }
}

#[async_trait]
impl<R> Transport for LineTransport<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let Some(frames) = self.frames.as_mut() else {
            return Ok(None);
        };

        match frames.next().await {
            Some(Ok(line)) => Ok(Some(line.to_vec())),
            Some(Err(e)) => Err(TransportError::Read {
                target: self.name.clone(),
                reason: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.frames.take().is_some() {
            debug!("Released {}", self.name);
        }
        Ok(())
    }

    fn line_format(&self) -> LineFormat {
        self.format
    }

    fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        let Some(frames) = self.frames.as_mut() else {
            return Ok(());
        };

        let buffered = frames.read_buffer().len();
        frames.read_buffer_mut().clear();

        if let Some(clear) = self.clear_input {
            clear(frames.get_ref()).map_err(|reason| TransportError::Read {
                target: self.name.clone(),
                reason,
            })?;
        }

        debug!("Discarded pending input on {} ({} bytes buffered)", self.name, buffered);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Open a serial device printing one integer per line
pub fn open_serial(
    path: &str,
    baud_rate: u32,
) -> Result<LineTransport<SerialStream>, TransportError> {
    let port = tokio_serial::new(path, baud_rate)
        .open_native_async()
        .map_err(|e| TransportError::Open {
            target: path.to_string(),
            reason: e.to_string(),
        })?;

    info!("Opened serial port {} at {} baud", path, baud_rate);

    Ok(LineTransport::new(path, port, LineFormat::Single)
        .with_settle_delay(SERIAL_SETTLE_DELAY)
        .with_input_clear(clear_serial_input))
}

fn clear_serial_input(port: &SerialStream) -> Result<(), String> {
    port.clear(ClearBuffer::Input).map_err(|e| e.to_string())
}

/// Connect to a socket printing one comma-separated tuple per line
pub async fn open_tcp(addr: &str) -> Result<LineTransport<TcpStream>, TransportError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| TransportError::Open {
            target: format!("tcp://{}", addr),
            reason: e.to_string(),
        })?;

    info!("Connected to tcp://{}", addr);

    Ok(LineTransport::new(
        format!("tcp://{}", addr),
        stream,
        LineFormat::CSV,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_lines_and_reports_close() {
        let input: &[u8] = b"1500\r\n2100\n\n17";
        let mut transport = LineTransport::new("memory", input, LineFormat::Single);

        assert_eq!(transport.read_line().await.unwrap(), Some(b"1500\r".to_vec()));
        assert_eq!(transport.read_line().await.unwrap(), Some(b"2100".to_vec()));
        assert_eq!(transport.read_line().await.unwrap(), Some(Vec::new()));
        // Trailing data without a terminator is still delivered at EOF
        assert_eq!(transport.read_line().await.unwrap(), Some(b"17".to_vec()));
        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_after_close_is_closed() {
        let input: &[u8] = b"1500\n";
        let mut transport = LineTransport::new("memory", input, LineFormat::Single);

        transport.close().await.unwrap();
        assert_eq!(transport.read_line().await.unwrap(), None);
        assert!(transport.discard_input().is_ok());
    }

    #[tokio::test]
    async fn test_discard_input_runs_clear_hook() {
        fn refuse(_: &&[u8]) -> Result<(), String> {
            Err("port gone".to_string())
        }

        let input: &[u8] = b"1500\n";
        let mut plain = LineTransport::new("memory", input, LineFormat::Single);
        assert!(plain.discard_input().is_ok());

        let mut hooked =
            LineTransport::new("memory", input, LineFormat::Single).with_input_clear(refuse);
        let err = hooked.discard_input().unwrap_err();
        assert!(err.to_string().contains("port gone"));
    }
}
