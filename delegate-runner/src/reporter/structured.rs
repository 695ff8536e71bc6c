// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting of events in a streaming, structured fashion.

use crate::notifier::{NotificationEvent, RunListener};
use std::io::{self, Write};
use tracing::debug;

/// Writes each event as one JSON object per line.
///
/// Every object has an `event` field naming the kind of event, plus `timestamp` and `elapsed`.
#[derive(Debug)]
pub struct JsonLinesListener<W> {
    writer: W,
}

impl JsonLinesListener<io::Stdout> {
    /// Creates a listener that writes to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesListener<W> {
    /// Creates a listener that writes to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, event: &NotificationEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> RunListener for JsonLinesListener<W> {
    fn on_event(&mut self, event: &NotificationEvent) {
        if let Err(error) = self.write_event(event) {
            debug!(%error, "failed to write structured event");
        }
    }
}
