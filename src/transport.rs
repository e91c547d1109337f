//! TCP connection establishment.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{NclinkError, Result};

/// Open a TCP connection to the device, bounded by `connect_timeout`.
///
/// Nagle is disabled: frames are small and the ACK round-trip gates every
/// send, so coalescing only adds latency.
pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<TcpStream> {
    let addr = format!("{host}:{port}");
    debug!(%addr, "connecting");

    let stream = timeout(connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| {
            NclinkError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect to {addr} timed out"),
            ))
        })??;
    stream.set_nodelay(true)?;

    debug!(%addr, "connected");
    Ok(stream)
}
