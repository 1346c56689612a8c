//! Hand-off of assembled events to persistence.
//!
//! The engine stops at an ordered event list; whatever stores events
//! implements [`EventSink`]. Two sinks ship with the crate: an in-memory
//! one for tests and embedding, and a JSON Lines writer.

use std::io::Write;

use crate::classify::SemanticEvent;

/// Append-only receiver of semantic events.
pub trait EventSink {
    /// Append one file's events, in order.
    fn append(&mut self, events: &[SemanticEvent]) -> anyhow::Result<()>;

    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<SemanticEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for MemorySink {
    fn append(&mut self, events: &[SemanticEvent]) -> anyhow::Result<()> {
        self.events.extend_from_slice(events);
        Ok(())
    }
}

/// Writes one JSON object per event per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of events written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn append(&mut self, events: &[SemanticEvent]) -> anyhow::Result<()> {
        for event in events {
            serde_json::to_writer(&mut self.writer, event)?;
            self.writer.write_all(b"\n")?;
            self.written += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
