//! Stand-in application: echoes each invocation against state kept since start-up.

use std::io::Write;
use std::time::Instant;

use tracing::{debug, warn};

use crate::session::Application;

const QUIT_FLAG: &str = "--quit";
const AUTOTYPE_FLAG: &str = "--autotype";

pub struct EchoApp<W> {
    args: Vec<String>,
    served: usize,
    warmed_at: Instant,
    out: W,
}

impl EchoApp<std::io::Stdout> {
    pub fn new(args: Vec<String>) -> Self {
        Self::with_writer(args, std::io::stdout())
    }
}

impl<W: Write> EchoApp<W> {
    pub fn with_writer(args: Vec<String>, out: W) -> Self {
        Self {
            args,
            served: 0,
            warmed_at: Instant::now(),
            out,
        }
    }

    fn show(&mut self, autotype_suppressed: bool) -> bool {
        self.served += 1;
        let line = self.args.join(" ");
        debug!(served = self.served, warm_for = ?self.warmed_at.elapsed(), "serving invocation");

        let autotype = !autotype_suppressed && self.args.iter().any(|a| a == AUTOTYPE_FLAG);
        if let Err(e) = self.write_output(&line, autotype) {
            warn!("Failed to write output: {}", e);
        }

        self.args.iter().any(|a| a == QUIT_FLAG)
    }

    fn write_output(&mut self, line: &str, autotype: bool) -> std::io::Result<()> {
        writeln!(self.out, "[{}] {}", self.served, line)?;
        if autotype {
            writeln!(self.out, "autotype: {}", line)?;
        }
        self.out.flush()
    }
}

impl<W: Write> Application for EchoApp<W> {
    fn execute_once(&mut self) -> bool {
        self.show(false)
    }

    fn handle_request(&mut self, args: Vec<String>, autotype_suppressed: bool) -> bool {
        self.args = args;
        self.show(autotype_suppressed)
    }
}
