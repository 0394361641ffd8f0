pub mod backend;
pub mod lines;
pub mod websocket;

pub use backend::{
    Transport, TransportError, TransportFactory, TransportTarget, DEFAULT_BAUD_RATE,
    SERIAL_SETTLE_DELAY,
};
pub use lines::{open_serial, open_tcp, LineTransport};
pub use websocket::WebSocketTransport;
