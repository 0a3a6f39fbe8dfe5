mod app;
mod bootstrap;
mod client;
mod logging;
mod protocol;
mod registry;
mod server;
mod session;
mod transport;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error};

use crate::app::EchoApp;
use crate::registry::PortRegistry;
use crate::session::{DEFAULT_CACHE_TIMEOUT, ServerSession};

#[derive(Parser, Debug)]
#[command(name = "warmcache")]
#[command(about = "Keeps application state warm and forwards later invocations to it")]
struct Cli {
    /// Listen without a foreground invocation and never time out
    #[arg(long)]
    daemon: bool,

    /// Run once in the foreground without caching
    #[arg(long)]
    no_cache: bool,

    /// Seconds an idle cache stays alive
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_CACHE_TIMEOUT.as_secs())]
    cache_timeout: u64,

    /// Start a server even if one is already running
    #[arg(long)]
    server: bool,

    /// Arguments handed to the application
    #[arg(last = true)]
    args: Vec<String>,
}

impl Cli {
    fn tries_client_first(&self) -> bool {
        !(self.daemon || self.no_cache || self.server)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();
    let registry = PortRegistry::in_cache_dir();

    if cli.tries_client_first() {
        match client::send_request(&registry, cli.args.clone()).await {
            Ok(()) => return ExitCode::SUCCESS,
            Err(e) if e.is_unreachable() => {
                debug!("no warm server, starting one: {}", e);
            }
            Err(e) => {
                error!("Client error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let session = ServerSession::new(
        cli.daemon,
        cli.no_cache,
        Duration::from_secs(cli.cache_timeout),
    );
    let mut app = EchoApp::new(cli.args);

    match bootstrap::run(&session, &registry, &mut app).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
