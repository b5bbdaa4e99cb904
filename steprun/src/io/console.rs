//! Console reporter: human-readable progress lines on stdout.

use std::io::{self, Write};

use tracing::warn;

use crate::core::report::Reporter;
use crate::core::types::StepFailure;

pub const FINISHED_LINE: &str = "Finished.";

/// Writes one banner per step boundary plus status and finalization lines.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            warn!(err = %e, "failed to write progress line");
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn run_started(&mut self, title: &str) {
        self.emit(title);
    }

    fn step_started(&mut self, position: usize, total: usize, name: &str) {
        self.emit(&format!("\n>>>>> [{position}/{total}] {name}\n"));
    }

    fn step_failed(&mut self, failure: &StepFailure) {
        self.emit(&format!(
            "Step {} ({}) failed: {}",
            failure.position, failure.step_name, failure.message
        ));
    }

    fn succeeded(&mut self, message: &str) {
        self.emit(message);
    }

    fn finished(&mut self) {
        self.emit(FINISHED_LINE);
    }
}
