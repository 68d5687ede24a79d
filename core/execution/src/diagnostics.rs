// dryrun/core/execution/src/diagnostics.rs

use crate::engine::LogSink;
use crate::types::LogEvent;
use tracing::debug;

/// Collects the log events of exactly one execution call
#[derive(Debug, Default)]
pub struct DiagnosticsCollector {
    session: String,
    events: Vec<LogEvent>,
}

impl DiagnosticsCollector {
    pub fn new(session: &str) -> Self {
        Self {
            session: session.to_string(),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<LogEvent> {
        self.events
    }
}

impl LogSink for DiagnosticsCollector {
    fn log(&mut self, event: LogEvent) {
        debug!(session = %self.session, contract = %event.script_hash, "{}", event.message);
        self.events.push(event);
    }
}
