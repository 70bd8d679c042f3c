// HTTP control endpoint
//
// One connection per loop iteration at most. Requests are not parsed: the raw
// bytes are searched for `cmd=`, and every request gets the same 200 response.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info};

use super::TransportError;

/// Status line and headers of the only response ever produced
pub const RESPONSE_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n";

/// Static control page served as the response body
pub const CONTROL_PAGE: &str = include_str!("../../assets/index.html");

const CMD_KEY: &str = "cmd=";

/// Extract the command token from raw request bytes
///
/// Token = text after the first `cmd=`, cut at the first space, `+`, `&` or line break.
pub fn extract_token(request: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(request);
    let start = text.find(CMD_KEY)? + CMD_KEY.len();
    let rest = &text[start..];
    let end = rest
        .find(|c: char| matches!(c, ' ' | '+' | '&' | '\r' | '\n'))
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// Listening socket for the control endpoint
pub struct HttpEndpoint {
    listener: TcpListener,
    accept_timeout: Duration,
    read_limit: usize,
}

impl HttpEndpoint {
    pub async fn bind(
        addr: SocketAddr,
        accept_timeout: Duration,
        read_limit: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        info!("HTTP control endpoint listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            accept_timeout,
            read_limit,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait up to the accept timeout for one pending connection
    ///
    /// No connection within the timeout is the common case and returns Ok(None).
    pub async fn try_accept(&self) -> Result<Option<HttpConnection>, TransportError> {
        match timeout(self.accept_timeout, self.listener.accept()).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok((stream, peer))) => {
                debug!("HTTP connection from {}", peer);
                Ok(Some(HttpConnection {
                    stream,
                    peer,
                    io_timeout: self.accept_timeout,
                    read_limit: self.read_limit,
                }))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

/// One accepted client connection
pub struct HttpConnection {
    stream: TcpStream,
    peer: SocketAddr,
    io_timeout: Duration,
    read_limit: usize,
}

impl HttpConnection {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Read up to the read limit in a single read and extract the command token
    pub async fn read_token(&mut self) -> Result<Option<String>, TransportError> {
        let mut buf = vec![0u8; self.read_limit];
        let n = timeout(self.io_timeout, self.stream.read(&mut buf))
            .await
            .map_err(|_| TransportError::Timeout)??;
        Ok(extract_token(&buf[..n]))
    }

    /// Write the fixed 200 response with the control page, then close
    pub async fn respond(mut self) -> Result<(), TransportError> {
        self.stream.write_all(RESPONSE_HEAD.as_bytes()).await?;
        self.stream.write_all(CONTROL_PAGE.as_bytes()).await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}
