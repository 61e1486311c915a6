// Licensed under the Apache-2.0 license

//! Logging abstraction shared by the driver modules.
//!
//! Controllers are generic over a [`Logger`] so production builds can route
//! diagnostics to a UART (or any byte sink) while the default build carries
//! no logging cost at all.

use core::fmt;

/// Sink for driver diagnostics.
pub trait Logger {
    fn log(&mut self, args: fmt::Arguments<'_>);
}

/// Default logger that discards everything.
#[derive(Default, Clone, Copy)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Adapter routing log lines to any [`embedded_io::Write`] sink.
pub struct WriteLogger<W: embedded_io::Write> {
    writer: W,
}

impl<W: embedded_io::Write> WriteLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn release(self) -> W {
        self.writer
    }
}

impl<W: embedded_io::Write> Logger for WriteLogger<W> {
    fn log(&mut self, args: fmt::Arguments<'_>) {
        // Logging must never fail the operation being logged.
        let _ = self.writer.write_fmt(args);
        let _ = self.writer.write_all(b"\r\n");
    }
}
