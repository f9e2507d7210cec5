//! Diagnostics sink
//!
//! The server core never logs directly; it reports structured events
//! `{event, fields}` through an injected [`Diagnostics`] collaborator. The
//! production sink forwards to the JSON [`Logger`]; tests inject
//! [`CapturingDiagnostics`] and assert on the recorded events.

use std::sync::Mutex;

use super::logger::Logger;

/// Structured event sink injected into the server core
pub trait Diagnostics: Send + Sync {
    /// Record a normal-operations event
    fn info(&self, event: &str, fields: &[(&str, &str)]);

    /// Record an operation failure
    fn error(&self, event: &str, fields: &[(&str, &str)]);
}

/// Production sink: one JSON line per event via [`Logger`]
#[derive(Debug, Default)]
pub struct JsonDiagnostics;

impl JsonDiagnostics {
    pub fn new() -> Self {
        Self
    }
}

impl Diagnostics for JsonDiagnostics {
    fn info(&self, event: &str, fields: &[(&str, &str)]) {
        Logger::info(event, fields);
    }

    fn error(&self, event: &str, fields: &[(&str, &str)]) {
        Logger::error(event, fields);
    }
}

/// A recorded diagnostics event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub event: String,
    pub fields: Vec<(String, String)>,
    pub is_error: bool,
}

/// Test sink that records events instead of writing them
#[derive(Debug, Default)]
pub struct CapturingDiagnostics {
    events: Mutex<Vec<RecordedEvent>>,
}

impl CapturingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded events
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns true if an event with the given name was recorded
    pub fn saw(&self, event: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e.event == event)
    }

    fn record(&self, event: &str, fields: &[(&str, &str)], is_error: bool) {
        self.events.lock().unwrap().push(RecordedEvent {
            event: event.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            is_error,
        });
    }
}

impl Diagnostics for CapturingDiagnostics {
    fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.record(event, fields, false);
    }

    fn error(&self, event: &str, fields: &[(&str, &str)]) {
        self.record(event, fields, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capturing_records_in_order() {
        let sink = CapturingDiagnostics::new();
        sink.info("first", &[("a", "1")]);
        sink.error("second", &[]);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "first");
        assert_eq!(events[0].fields, vec![("a".to_string(), "1".to_string())]);
        assert!(!events[0].is_error);
        assert!(events[1].is_error);
    }

    #[test]
    fn test_saw_matches_by_name() {
        let sink = CapturingDiagnostics::new();
        sink.info("signal_caught", &[("signal", "SIGTERM")]);
        assert!(sink.saw("signal_caught"));
        assert!(!sink.saw("drain_started"));
    }
}
