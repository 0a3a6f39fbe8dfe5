//! Loopback TCP transport between client and warm server.

use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};

/// Loopback address the server binds and clients dial.
const LOOPBACK: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Listener on an OS-chosen ephemeral port.
pub struct Listener {
    inner: TcpListener,
    port: u16,
}

impl Listener {
    pub async fn bind() -> std::io::Result<Self> {
        let inner = TcpListener::bind((LOOPBACK, 0)).await?;
        let port = inner.local_addr()?.port();
        Ok(Self { inner, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }
}

/// Dials the server advertised on `port`. Surrounding whitespace in the entry is ignored.
pub async fn connect(port: &str) -> std::io::Result<TcpStream> {
    TcpStream::connect(dial_target(port)).await
}

/// `host:port` on the same loopback address `Listener::bind` uses, so name
/// resolution of `localhost` never comes into play.
fn dial_target(port: &str) -> String {
    format!("{}:{}", LOOPBACK, port.trim())
}
