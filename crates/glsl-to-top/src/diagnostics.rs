//! Diagnostic sink shared by every lowering component.

use alloc::{string::String, vec::Vec};
use core::fmt::Write;

use crate::error::{LowerError, Severity};

/// A reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub error: LowerError,
    pub severity: Severity,
}

/// Accumulates reports and renders the info log.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    poisoned: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem.
    pub fn report(&mut self, error: LowerError, severity: Severity) {
        match severity {
            Severity::Continue if !error.poisons() => log::warn!("{}", error),
            _ => log::error!("{}", error),
        }
        if error.poisons() || severity == Severity::Abort {
            self.poisoned = true;
        }
        self.entries.push(Diagnostic { error, severity });
    }

    /// Report an unsupported construct and keep going.
    pub fn unsupported(&mut self, msg: impl Into<String>) {
        self.report(LowerError::unsupported(msg), Severity::Continue);
    }

    /// Report a broken internal assumption and keep going.
    pub fn invariant(&mut self, msg: impl Into<String>) {
        self.report(LowerError::invariant(msg), Severity::Continue);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once an internal invariant failed or lowering was aborted.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Number of entries that match `pred`.
    pub fn count(&self, pred: impl Fn(&LowerError) -> bool) -> usize {
        self.entries.iter().filter(|d| pred(&d.error)).count()
    }

    /// Render every entry, one per line.
    pub fn info_log(&self) -> String {
        let mut log = String::new();
        for entry in &self.entries {
            let tag = match entry.severity {
                Severity::Continue => "WARNING",
                Severity::Abort => "ERROR",
            };
            let _ = writeln!(log, "{}: {}", tag, entry.error);
        }
        log
    }
}
