// Command transports
//
// Provides:
// - Serial link polled one byte at a time
// - Tiny HTTP endpoint that takes a `cmd=` query token and answers with the control page

pub mod http;
pub mod serial;

pub use http::{HttpConnection, HttpEndpoint, extract_token};
pub use serial::{ByteSource, SerialLink, decode_token};

use std::net::SocketAddr;

/// Error types for both transports
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind HTTP endpoint on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Byte 0x{byte:02X} is not a valid command character")]
    Decode { byte: u8 },

    #[error("Timed out waiting for client data")]
    Timeout,
}
