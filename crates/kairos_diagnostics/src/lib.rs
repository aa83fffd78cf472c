//! Structured diagnostics for the kairos timing engine.
//!
//! Analysis-time conditions that the user should see (constraint warnings,
//! clock relationship warnings) are reported as [`Diagnostic`] values
//! accumulated in a thread-safe [`DiagnosticSink`]. Internal engine failures
//! are *not* diagnostics; they surface as `InternalError` results.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use severity::Severity;
pub use sink::DiagnosticSink;
