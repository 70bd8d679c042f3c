// Serial command channel
//
// Every received byte is one command token. Polling never blocks: the buffered
// byte count is checked before reading.

use std::io::Read;
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use super::TransportError;

/// Source of single command bytes
pub trait ByteSource {
    /// Next buffered byte, or None if nothing is waiting
    fn poll_byte(&mut self) -> Result<Option<u8>, TransportError>;
}

/// Serial port carrying the command channel (e.g. a Bluetooth UART bridge)
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open the serial device at the given baudrate
    pub fn open(port_name: &str, baudrate: u32, timeout: Duration) -> Result<Self, TransportError> {
        info!("Opening serial command channel on {} @ {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate).timeout(timeout).open()?;
        Ok(Self { port })
    }
}

impl ByteSource for SerialLink {
    fn poll_byte(&mut self) -> Result<Option<u8>, TransportError> {
        if self.port.bytes_to_read()? == 0 {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(Some(byte[0]))
    }
}

/// Decode one byte into a trimmed token (empty for whitespace)
pub fn decode_token(byte: u8) -> Result<String, TransportError> {
    let bytes = [byte];
    let text = std::str::from_utf8(&bytes).map_err(|_| TransportError::Decode { byte })?;
    Ok(text.trim().to_string())
}
