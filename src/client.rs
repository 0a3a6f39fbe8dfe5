//! Client side: forwards this invocation's arguments to a warm server.

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::protocol::{self, ProtocolError, Request};
use crate::registry::{PortRegistry, RegistryError};
use crate::transport;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("no server port available: {0}")]
    Discovery(#[source] RegistryError),

    #[error("failed to connect to server on port {port:?}: {source}")]
    Connection {
        port: String,
        source: std::io::Error,
    },

    #[error("request of {bytes} bytes exceeds the {limit} byte limit")]
    TooLarge { bytes: u64, limit: u64 },

    #[error("failed to encode request: {0}")]
    Encode(#[source] ProtocolError),

    #[error("failed to send request: {0}")]
    Transport(#[source] std::io::Error),
}

impl ClientError {
    /// True when no server could be found or reached, so the caller may run standalone.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Discovery(_) | Self::Connection { .. })
    }
}

/// Sends `args` to the server advertised in `registry`. No reply is awaited.
///
/// Oversized requests are rejected before any connection is made.
pub async fn send_request(registry: &PortRegistry, args: Vec<String>) -> Result<(), ClientError> {
    let payload = protocol::encode(&Request::new(args)).map_err(|e| match e {
        ProtocolError::TooLarge { bytes, limit } => ClientError::TooLarge { bytes, limit },
        e => ClientError::Encode(e),
    })?;

    let port = registry.resolve().map_err(ClientError::Discovery)?;

    let mut stream = transport::connect(&port)
        .await
        .map_err(|source| ClientError::Connection {
            port: port.clone(),
            source,
        })?;

    stream
        .write_all(&payload)
        .await
        .map_err(ClientError::Transport)?;
    stream.shutdown().await.map_err(ClientError::Transport)?;

    debug!(port = %port.trim(), bytes = payload.len(), "forwarded invocation");
    Ok(())
}
