//! # Observability
//!
//! Structured JSON logging and the injectable diagnostics sink used by the
//! server core (shutdown coordinator, background task tracker, handlers).

pub mod diagnostics;
pub mod logger;

pub use diagnostics::{CapturingDiagnostics, Diagnostics, JsonDiagnostics};
pub use logger::{Logger, Severity};
