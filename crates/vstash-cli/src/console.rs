//! Output sinks for commands
//!
//! Results go to `out`, warnings to `err` as `warning: ...` lines. Tests
//! pass in byte buffers.

use std::fmt::Display;
use std::io::{self, Write};

/// Pair of writers a command prints to
pub struct Console<O, E> {
    out: O,
    err: E,
    warnings: usize,
}

impl Console<io::Stdout, io::Stderr> {
    /// Process stdout and stderr
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Console<O, E> {
    /// Console over the given writers
    pub fn new(out: O, err: E) -> Self {
        Self { out, err, warnings: 0 }
    }

    /// Print one result line
    ///
    /// # Errors
    /// Write failure
    pub fn line(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    /// Print text as-is
    ///
    /// # Errors
    /// Write failure
    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    /// Print a warning
    ///
    /// # Errors
    /// Write failure
    pub fn warn(&mut self, message: impl Display) -> io::Result<()> {
        self.warnings += 1;
        writeln!(self.err, "warning: {message}")
    }

    /// Warnings printed so far
    #[inline]
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Give back both writers
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}
