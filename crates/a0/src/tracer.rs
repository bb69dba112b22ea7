//! Execution tracing.
//!
//! The evaluator emits structured events at documented points (run
//! boundaries, iteration constructs, function and tool calls, evidence).
//! Hosts pick a sink at execution time: [`NoopSink`] for production runs,
//! [`RecordingSink`] to capture events in memory, [`WriterSink`] to stream
//! JSON lines to a file. Sinks must not fail; the writer sink swallows I/O
//! errors rather than disturbing execution.

use std::io;

use serde::{Serialize, Serializer};

use crate::diag::Span;

/// Event kinds, rendered in snake_case. Trace-file tooling matches on the
/// exact strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TraceEventKind {
    RunStart,
    RunEnd,
    ForStart,
    ForEnd,
    FilterStart,
    FilterEnd,
    LoopStart,
    LoopEnd,
    MatchStart,
    MatchEnd,
    TryStart,
    TryEnd,
    MapStart,
    MapEnd,
    ReduceStart,
    ReduceEnd,
    FnCallStart,
    FnCallEnd,
    ToolStart,
    ToolEnd,
    Evidence,
    Error,
}

impl Serialize for TraceEventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

/// One trace event.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    /// ISO-8601 wall-clock timestamp.
    pub ts: String,
    /// Opaque identifier correlating events of a single execution.
    pub run_id: String,
    #[serde(rename = "event")]
    pub kind: TraceEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Small event-specific payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Receives trace events synchronously, in execution order.
pub trait TraceSink {
    fn emit(&mut self, event: &TraceEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn emit(&mut self, _event: &TraceEvent) {}
}

/// Captures every event in memory, for tests and post-mortem inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<TraceEvent>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// The event kinds in emission order; convenient for sequence asserts.
    #[must_use]
    pub fn kinds(&self) -> Vec<TraceEventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }
}

impl TraceSink for RecordingSink {
    fn emit(&mut self, event: &TraceEvent) {
        self.events.push(event.clone());
    }
}

/// Streams events as JSON lines to a writer.
#[derive(Debug)]
pub struct WriterSink<W: io::Write> {
    writer: W,
}

impl<W: io::Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> TraceSink for WriterSink<W> {
    fn emit(&mut self, event: &TraceEvent) {
        // A sink must not disturb execution; drop events the writer rejects.
        if let Ok(line) = serde_json::to_string(event) {
            let _ = writeln!(self.writer, "{line}");
        }
    }
}
