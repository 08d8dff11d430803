//! Diagnostic channel
//!
//! The accessor path must never fail the page code that assigned a script
//! source, so every problem found there is reported here instead of being
//! returned. The default sink forwards to `tracing`.

use crate::result::StubError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    /// Harmless misuse
    Warn,
    /// Something did not work; behavior degraded to pass-through
    Error,
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Host refused the accessor override
    InstallRefused,
    /// Install was attempted a second time
    AlreadyInstalled,
    /// A URL parameter failed to decode
    MalformedParameter,
    /// Formatting the payload or creating the resource failed
    SynthesisFailed,
}

/// A reported diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Category
    pub kind: DiagnosticKind,
    /// Severity
    pub level: DiagnosticLevel,
    /// Human-readable message
    pub message: String,
    /// Script source being assigned, if any
    pub source: Option<String>,
}

impl Diagnostic {
    /// Build a diagnostic from an error
    #[must_use]
    pub fn from_error(error: &StubError, source: Option<&str>) -> Self {
        let (kind, level) = match error {
            StubError::AlreadyInstalled => {
                (DiagnosticKind::AlreadyInstalled, DiagnosticLevel::Warn)
            }
            StubError::InstallRefused { .. } => {
                (DiagnosticKind::InstallRefused, DiagnosticLevel::Error)
            }
            StubError::MalformedParameter { .. } => {
                (DiagnosticKind::MalformedParameter, DiagnosticLevel::Error)
            }
            _ => (DiagnosticKind::SynthesisFailed, DiagnosticLevel::Error),
        };
        Self {
            kind,
            level,
            message: error.to_string(),
            source: source.map(ToString::to_string),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {} (src: {})", self.kind, self.message, src),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

/// Receives diagnostics
pub trait DiagnosticSink {
    /// Report a diagnostic
    fn report(&self, diagnostic: Diagnostic);
}

/// Sink that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        let src = diagnostic.source.as_deref().unwrap_or("");
        match diagnostic.level {
            DiagnosticLevel::Warn => tracing::warn!(
                kind = ?diagnostic.kind,
                src,
                "{}",
                diagnostic.message
            ),
            DiagnosticLevel::Error => tracing::error!(
                kind = ?diagnostic.kind,
                src,
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Sink that keeps diagnostics in memory and also traces them
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    recorded: Rc<RefCell<Vec<Diagnostic>>>,
}

impl RecordingSink {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics so far
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.recorded.borrow().clone()
    }

    /// Diagnostics of one kind
    #[must_use]
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.recorded
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of diagnostics
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded.borrow().len()
    }

    /// Check if nothing was reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorded.borrow().is_empty()
    }

    /// Forget recorded diagnostics
    pub fn clear(&self) {
        self.recorded.borrow_mut().clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        TracingSink.report(diagnostic.clone());
        self.recorded.borrow_mut().push(diagnostic);
    }
}
