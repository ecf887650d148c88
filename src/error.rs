//! Error and diagnostic reporting.
//!
//! The reader distinguishes *fatal* conditions, which abort the stream and
//! are surfaced to the caller as [`Error`], from *recoverable* conditions,
//! which are repaired in place and reported only through [`Diagnostics`].
//! See spec §7 for the full classification.

use std::fmt;

/// The error type returned by fatal operations on the reader.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Propagated from the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input was not valid UTF-8.
    #[error("input is not valid UTF-8 at byte offset {0}")]
    Utf8(usize),

    /// Neither `href` nor an input stream was configured before the first `read`.
    #[error("no input configured: set `href` or `input_stream` before the first `read`")]
    NoInput,

    /// The DOCTYPE name found in the document does not match the name of the
    /// DTD that was explicitly loaded via [`crate::config::ReaderConfig::dtd`].
    #[error("DOCTYPE name `{found}` does not match the loaded DTD `{expected}`")]
    DtdMismatch { expected: String, found: String },
}

/// A specialized `Result` type where the error is hard-wired to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A single recoverable diagnostic, identifying where in the input it occurred.
///
/// Diagnostics never abort parsing; they describe a repair that was already
/// applied. See spec §6.2 / §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Name of the entity (main document or a nested entity) current when
    /// the diagnostic was raised.
    pub entity: String,
    /// Resolved URI (path only) of that entity, if known.
    pub uri: Option<String>,
    /// 1-based line number.
    pub line: u64,
    /// 1-based column number.
    pub column: u64,
    /// Short human-readable message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uri {
            Some(uri) => write!(
                f,
                "{} ({}) line {}, column {}: {}",
                self.entity, uri, self.line, self.column, self.message
            ),
            None => write!(
                f,
                "{} line {}, column {}: {}",
                self.entity, self.line, self.column, self.message
            ),
        }
    }
}

/// A pluggable sink for recoverable diagnostics (the `error_log` configuration knob).
///
/// Every diagnostic is also emitted through the `log` facade at the call
/// site (`log::debug!` for routine repairs, `log::warn!` for anything that
/// drops data the input expressed), so installing a sink here is optional.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &Diagnostic);
}

impl<F: FnMut(&Diagnostic)> DiagnosticSink for F {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// A [`DiagnosticSink`] that forwards every diagnostic to the `log` facade only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn report(&mut self, diagnostic: &Diagnostic) {
        log::warn!("{diagnostic}");
    }
}
