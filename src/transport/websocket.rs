use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::backend::{Transport, TransportError};
use crate::signal::LineFormat;

/// WebSocket link to the Wi-Fi firmware
///
/// The firmware broadcasts one text message per reading, e.g.
/// `"1500,2147,2473,2659"` for four fingers.
pub struct WebSocketTransport {
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WebSocketTransport {
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        info!("Connecting to WebSocket at {}", url);

        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Open {
                target: url.to_string(),
                reason: e.to_string(),
            })?;

        info!("Connected to {}", url);

        Ok(Self {
            url: url.to_string(),
            stream: Some(stream),
        })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.into_bytes())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Close(frame))) => {
                    debug!("{} sent close frame: {:?}", self.url, frame);
                    return Ok(None);
                }
                // Ping, pong and raw frames carry no readings
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Ok(None)
                }
                Some(Err(e)) => {
                    return Err(TransportError::Read {
                        target: self.url.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            match stream.close(None).await {
                Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {}
                Err(e) => warn!("Failed to close {} cleanly: {}", self.url, e),
            }
            debug!("Released {}", self.url);
        }
        Ok(())
    }

    fn line_format(&self) -> LineFormat {
        LineFormat::CSV
    }

    fn name(&self) -> &str {
        &self.url
    }
}
