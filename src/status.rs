use std::fmt::Display;
use std::time::Instant;

use atty::Stream;
use crossterm::style::{Color, ResetColor, SetForegroundColor};

/// Verbosity-gated diagnostics on stderr, stamped with the time since start.
/// Shared read-only by every chart worker.
#[derive(Debug, Clone)]
pub struct Status {
    verbose: u8,
    start: Instant,
    color: bool,
}

impl Status {
    pub fn new(verbose: u8) -> Status {
        Status { verbose, start: Instant::now(), color: atty::is(Stream::Stderr) }
    }

    /// No output at all; used by tests and library callers.
    pub fn quiet() -> Status {
        Status { verbose: 0, start: Instant::now(), color: false }
    }

    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    fn stamp(&self) -> String {
        format!("[{:.3} ms]", self.start.elapsed().as_secs_f64() * 1000.0)
    }

    /// Printed when running with at least `level` `-v` flags; level 0 always prints.
    pub fn info(&self, level: u8, msg: impl Display) {
        if self.verbose >= level {
            eprintln!("{}: {}", self.stamp(), msg);
        }
    }

    pub fn warn(&self, msg: impl Display) {
        if self.color {
            eprintln!("{}{}: {}{}", SetForegroundColor(Color::Yellow), self.stamp(), msg, ResetColor);
        } else {
            eprintln!("{}: {}", self.stamp(), msg);
        }
    }

    pub fn error(&self, msg: impl Display) {
        if self.color {
            eprintln!("{}{}: {}{}", SetForegroundColor(Color::Red), self.stamp(), msg, ResetColor);
        } else {
            eprintln!("{}: {}", self.stamp(), msg);
        }
    }
}
