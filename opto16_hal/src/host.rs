//! Ready-made result sinks.
//!
//! - [`CollectingSink`] keeps everything in memory (one-shot CLI reads)
//! - [`JsonLineSink`] writes forwarded messages as JSON lines (`serve`)

use crate::error::InputError;
use crate::node::{Message, NodeStatus, ResultSink};
use std::io::Write;
use tracing::{error, info, warn};

/// Sink that records every outcome.
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Forwarded messages.
    pub sent: Vec<Message>,
    /// Reported errors with their messages.
    pub errors: Vec<(InputError, Message)>,
    /// Status updates, oldest first.
    pub statuses: Vec<NodeStatus>,
}

impl CollectingSink {
    /// Most recent status, if any.
    pub fn last_status(&self) -> Option<&NodeStatus> {
        self.statuses.last()
    }
}

impl ResultSink for CollectingSink {
    fn send(&mut self, msg: Message) {
        self.sent.push(msg);
    }

    fn error(&mut self, err: &InputError, msg: &Message) {
        self.errors.push((err.clone(), msg.clone()));
    }

    fn status(&mut self, status: NodeStatus) {
        self.statuses.push(status);
    }
}

/// Sink writing each forwarded message as one JSON line.
///
/// Errors and status changes go to the log; the error log carries the
/// originating message so it can be correlated.
pub struct JsonLineSink<W: Write> {
    out: W,
    status: NodeStatus,
    forwarded: usize,
    failed: usize,
}

impl<W: Write> JsonLineSink<W> {
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self {
            out,
            status: NodeStatus::Clear,
            forwarded: 0,
            failed: 0,
        }
    }

    /// Current status.
    pub fn current_status(&self) -> &NodeStatus {
        &self.status
    }

    /// Messages forwarded and requests failed so far.
    pub fn counts(&self) -> (usize, usize) {
        (self.forwarded, self.failed)
    }
}

impl<W: Write> ResultSink for JsonLineSink<W> {
    fn send(&mut self, msg: Message) {
        let written = serde_json::to_writer(&mut self.out, &msg)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        match written {
            Ok(()) => self.forwarded += 1,
            Err(e) => {
                self.failed += 1;
                error!("Failed to forward message: {}", e);
            }
        }
    }

    fn error(&mut self, err: &InputError, msg: &Message) {
        self.failed += 1;
        let original = serde_json::to_string(msg).unwrap_or_default();
        error!(msg = %original, "{}", err);
    }

    fn status(&mut self, status: NodeStatus) {
        if let NodeStatus::Fault(_) = status {
            self.failed += 1;
        }
        if status != self.status {
            match &status {
                NodeStatus::Clear => info!("Status cleared"),
                NodeStatus::Fault(text) => warn!("Status: {}", text),
            }
            self.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opto16_common::bus::BusError;
    use serde_json::json;

    #[test]
    fn test_json_line_sink_writes_lines() {
        let mut out = Vec::new();
        let mut sink = JsonLineSink::new(&mut out);
        let mut msg = Message::new(0, 0);
        msg.payload = json!(42);
        sink.send(msg.clone());
        sink.send(msg);

        assert_eq!(sink.counts(), (2, 0));
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["payload"], json!(42));
    }

    #[test]
    fn test_json_line_sink_counts_failures() {
        let mut out = Vec::new();
        let mut sink = JsonLineSink::new(&mut out);
        sink.error(&InputError::Bus(BusError::Timeout(0x20)), &Message::default());
        sink.status(NodeStatus::Fault("bad stack".to_string()));
        sink.status(NodeStatus::Fault("bad stack".to_string()));
        assert_eq!(sink.current_status(), &NodeStatus::Fault("bad stack".to_string()));
        sink.status(NodeStatus::Clear);

        assert_eq!(sink.counts(), (0, 3));
        assert_eq!(sink.current_status(), &NodeStatus::Clear);
        assert!(out.is_empty());
    }

    #[test]
    fn test_collecting_sink() {
        let mut sink = CollectingSink::default();
        sink.status(NodeStatus::Clear);
        sink.send(Message::default());
        assert_eq!(sink.last_status(), Some(&NodeStatus::Clear));
        assert_eq!(sink.sent.len(), 1);
    }
}
