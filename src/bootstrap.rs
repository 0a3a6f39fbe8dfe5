//! Server bootstrap: decides between direct execution, caching and daemon mode.

use tracing::info;

use crate::registry::PortRegistry;
use crate::server::{self, ServerError};
use crate::session::{Application, Mode, ServerSession};

/// Process outcome of a server run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    /// A direct execution reported a fatal or declined outcome.
    Failure,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::Failure => 1,
        }
    }
}

pub async fn run<A: Application>(
    session: &ServerSession,
    registry: &PortRegistry,
    app: &mut A,
) -> Result<Exit, ServerError> {
    if session.daemon {
        info!("executing as daemon");
    }

    match session.mode() {
        Mode::Direct => {
            if app.execute_once() {
                return Ok(Exit::Failure);
            }
            Ok(Exit::Success)
        }
        Mode::Cached => {
            if app.execute_once() {
                info!("foreground invocation finished, not caching");
                return Ok(Exit::Success);
            }
            server::listen(session, registry, app).await?;
            Ok(Exit::Success)
        }
        Mode::Daemon => {
            server::listen(session, registry, app).await?;
            Ok(Exit::Success)
        }
    }
}
