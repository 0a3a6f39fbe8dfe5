//! Listener loop: serves forwarded invocations one connection at a time until the cache
//! times out or the application asks to exit.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{self, ProtocolError, Request};
use crate::registry::{PortRegistry, RegistryError};
use crate::session::{Application, ServerSession};
use crate::transport::Listener;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("failed to publish server port: {0}")]
    Persist(#[from] RegistryError),

    #[error("failed to accept client: {0}")]
    Accept(#[source] std::io::Error),

    #[error("failed to decode client request: {0}")]
    Decode(#[from] ProtocolError),
}

/// What came out of one accepted connection.
#[derive(Debug)]
enum Received {
    Request(Request),
    /// The client closed the connection without sending anything.
    Closed,
    /// Nothing arrived within the session's request timeout.
    TimedOut,
}

/// Binds an ephemeral port, publishes it in `registry` and serves client calls.
///
/// Returns `Ok(())` when the cache times out or a dispatch asks a non-daemon to exit.
pub async fn listen<A: Application>(
    session: &ServerSession,
    registry: &PortRegistry,
    app: &mut A,
) -> Result<(), ServerError> {
    let listener = Listener::bind().await.map_err(ServerError::Bind)?;
    let port = listener.port().to_string();
    registry.persist(&port)?;
    info!(port = %port, registry = %registry.path().display(), "listening for client calls");

    loop {
        let accepted = match session.remaining_cache_time() {
            Some(remaining) => {
                match tokio::time::timeout(remaining, listener.accept()).await {
                    Ok(accepted) => accepted,
                    Err(_) => {
                        info!("cache timed out");
                        return Ok(());
                    }
                }
            }
            None => listener.accept().await,
        };
        let (stream, peer) = accepted.map_err(ServerError::Accept)?;

        match receive(stream, peer, session).await? {
            Received::Request(request) => {
                info!(args = ?request.args, "received a client call");
                let should_exit = app.handle_request(request.args, true);
                if session.should_stop(should_exit) {
                    info!("application requested exit");
                    return Ok(());
                }
            }
            Received::Closed => debug!(%peer, "client closed without sending a request"),
            Received::TimedOut => warn!(%peer, "received request timed out"),
        }
    }
}

/// Decodes one request off `stream` in its own task, waiting at most the request timeout.
async fn receive(
    stream: TcpStream,
    peer: SocketAddr,
    session: &ServerSession,
) -> Result<Received, ProtocolError> {
    let cancel = CancellationToken::new();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(decode(stream, peer, cancel.clone(), tx));

    match tokio::time::timeout(session.request_timeout, rx).await {
        Ok(Ok(Ok(Some(request)))) => Ok(Received::Request(request)),
        Ok(Ok(Ok(None))) => Ok(Received::Closed),
        Ok(Ok(Err(e))) => Err(e),
        // Decode task went away without reporting; nothing to dispatch.
        Ok(Err(_)) => Ok(Received::Closed),
        Err(_) => {
            cancel.cancel();
            Ok(Received::TimedOut)
        }
    }
}

/// Owns the connection; dropping it on cancellation closes the socket.
async fn decode(
    stream: TcpStream,
    peer: SocketAddr,
    cancel: CancellationToken,
    tx: oneshot::Sender<Result<Option<Request>, ProtocolError>>,
) {
    let mut reader = BufReader::new(stream);

    let result = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(%peer, "abandoned connection");
            return;
        }
        result = protocol::read_request(&mut reader) => result,
    };

    if cancel.is_cancelled() {
        return;
    }
    let _ = tx.send(result);
}
