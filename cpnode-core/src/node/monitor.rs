//! Text diagnostics
//!
//! A node may be given a `core::fmt::Write` sink (a debug UART, a USB CDC
//! port, a `String` in tests). Lines are only written for the categories
//! enabled in [`TraceFlags`].

use core::fmt::{self, Write};

use crate::config::TraceFlags;

/// Sink used when no monitor is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMonitor;

impl Write for NoMonitor {
    fn write_str(&mut self, _s: &str) -> fmt::Result {
        Ok(())
    }
}

/// Optional sink plus the enabled categories
#[derive(Debug)]
pub(crate) struct Tracer<W> {
    sink: Option<W>,
    flags: TraceFlags,
}

impl<W: Write> Tracer<W> {
    pub(crate) fn new(sink: Option<W>, flags: TraceFlags) -> Self {
        Self { sink, flags }
    }

    pub(crate) fn set_flags(&mut self, flags: TraceFlags) {
        self.flags = flags;
    }

    pub(crate) fn flags(&self) -> TraceFlags {
        self.flags
    }

    /// Whether lines of `category` reach a sink
    pub(crate) fn enabled(&self, category: TraceFlags) -> bool {
        self.sink.is_some() && self.flags.contains(category)
    }

    /// Write formatted text if `category` is enabled
    ///
    /// Monitor write errors are dropped.
    pub(crate) fn emit(&mut self, category: TraceFlags, args: fmt::Arguments<'_>) {
        if !self.flags.contains(category) {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            let _ = sink.write_fmt(args);
        }
    }

    /// Write `bytes` as a bracketed hex list
    pub(crate) fn emit_hex(&mut self, category: TraceFlags, bytes: &[u8]) {
        if !self.enabled(category) {
            return;
        }
        self.emit(category, format_args!("["));
        for (i, byte) in bytes.iter().enumerate() {
            let sep = if i == 0 { "" } else { ", " };
            self.emit(category, format_args!("{}0x{:02x}", sep, byte));
        }
        self.emit(category, format_args!("]\n"));
    }

    #[cfg(test)]
    pub(crate) fn into_sink(self) -> Option<W> {
        self.sink
    }
}
