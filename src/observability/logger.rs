//! Structured JSON logger
//!
//! One log line = one event. Lines are JSON objects with the event name
//! first, then severity, then the remaining fields in sorted order so the
//! output is deterministic. Writes are synchronous and unbuffered.

use std::fmt;
use std::io::{self, Write};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal operations
    Info = 0,
    /// Recoverable issues
    Warn = 1,
    /// Operation failures
    Error = 2,
    /// Unrecoverable, process exits
    Fatal = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that emits one JSON object per line
pub struct Logger;

impl Logger {
    /// Log an event at INFO level to stdout
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::write_line(Severity::Info, event, fields, &mut io::stdout());
    }

    /// Log an event at WARN level to stdout
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::write_line(Severity::Warn, event, fields, &mut io::stdout());
    }

    /// Log an event at ERROR level to stderr
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::write_line(Severity::Error, event, fields, &mut io::stderr());
    }

    /// Log an event at FATAL level to stderr
    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::write_line(Severity::Fatal, event, fields, &mut io::stderr());
    }

    fn write_line<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        // Build the line manually so key ordering is deterministic: event
        // first, severity second, remaining fields sorted by key.
        let mut line = String::with_capacity(128);

        line.push_str("{\"event\":\"");
        Self::escape_into(&mut line, event);
        line.push_str("\",\"severity\":\"");
        line.push_str(severity.as_str());
        line.push('"');

        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        for (key, value) in sorted {
            line.push_str(",\"");
            Self::escape_into(&mut line, key);
            line.push_str("\":\"");
            Self::escape_into(&mut line, value);
            line.push('"');
        }

        line.push_str("}\n");

        // One write_all call so concurrent loggers do not interleave.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    fn escape_into(out: &mut String, s: &str) {
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => {
                    out.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => out.push(c),
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn render_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::write_line(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_is_valid_json() {
        let line = render_line(Severity::Info, "server_started", &[("addr", "0.0.0.0:4000")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "server_started");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["addr"], "0.0.0.0:4000");
    }

    #[test]
    fn test_field_ordering_is_deterministic() {
        let a = render_line(Severity::Info, "e", &[("b", "2"), ("a", "1")]);
        let b = render_line(Severity::Info, "e", &[("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
        assert!(a.find("\"a\"").unwrap() < a.find("\"b\"").unwrap());
    }

    #[test]
    fn test_event_comes_first() {
        let line = render_line(Severity::Warn, "drain_started", &[("addr", "x")]);
        assert!(line.starts_with("{\"event\":\"drain_started\""));
    }

    #[test]
    fn test_escapes_special_characters() {
        let line = render_line(Severity::Error, "task_failed", &[("cause", "a \"b\"\nc")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["cause"], "a \"b\"\nc");
    }

    #[test]
    fn test_exactly_one_line() {
        let line = render_line(Severity::Info, "e", &[("k", "v")]);
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
    }
}
