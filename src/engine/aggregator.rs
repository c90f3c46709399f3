//! Ordered diagnostic store with immediate forwarding to the host sink.

use super::isolation::{isolate, Stage};
use crate::check::CheckRegistry;
use crate::config::Suppressions;
use crate::core::{Diagnostic, DiagnosticKind};
use std::convert::Infallible;
use tracing::warn;

/// Host-side receiver of the diagnostic stream.
///
/// Every call is a discrete append; the engine never batches records except
/// for the catalog envelope.
pub trait DiagnosticSink: Send {
    /// Violations and internal errors.
    fn report_err(&mut self, diagnostic: &Diagnostic);

    /// Free-text progress lines.
    fn report_out(&mut self, message: &str);

    /// Informational notes.
    fn report_info(&mut self, diagnostic: &Diagnostic);

    fn report_status(
        &mut self,
        _file_index: usize,
        _file_count: usize,
        _size_done: u64,
        _size_total: u64,
    ) {
    }

    fn catalog_begin(&mut self) {}

    fn catalog_end(&mut self) {}
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report_err(&mut self, _diagnostic: &Diagnostic) {}
    fn report_out(&mut self, _message: &str) {}
    fn report_info(&mut self, _diagnostic: &Diagnostic) {}
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Box<S> {
    fn report_err(&mut self, diagnostic: &Diagnostic) {
        (**self).report_err(diagnostic)
    }

    fn report_out(&mut self, message: &str) {
        (**self).report_out(message)
    }

    fn report_info(&mut self, diagnostic: &Diagnostic) {
        (**self).report_info(diagnostic)
    }

    fn report_status(&mut self, file_index: usize, file_count: usize, done: u64, total: u64) {
        (**self).report_status(file_index, file_count, done, total)
    }

    fn catalog_begin(&mut self) {
        (**self).catalog_begin()
    }

    fn catalog_end(&mut self) {
        (**self).catalog_end()
    }
}

/// Engine-lifetime ordered record list.
///
/// Records are kept in emission order; nothing is reordered or deduplicated
/// here. Suppressed records are dropped before they are stored.
pub struct ErrorAggregator {
    records: Vec<Diagnostic>,
    sink: Box<dyn DiagnosticSink>,
    suppressions: Suppressions,
}

impl ErrorAggregator {
    pub fn new(sink: Box<dyn DiagnosticSink>, suppressions: Suppressions) -> Self {
        Self {
            records: Vec::new(),
            sink,
            suppressions,
        }
    }

    /// Store and forward one record. Returns true when the record was accepted
    /// and counts towards the caller's error tally.
    pub fn report(&mut self, diagnostic: Diagnostic) -> bool {
        if self.suppressions.is_suppressed(&diagnostic) {
            return false;
        }
        self.forward(&diagnostic);
        let counted = diagnostic.kind.is_counted();
        self.records.push(diagnostic);
        counted
    }

    pub fn progress(&mut self, message: impl Into<String>) {
        self.report(Diagnostic::progress(message));
    }

    pub fn status(&mut self, file_index: usize, file_count: usize, done: u64, total: u64) {
        self.sink.report_status(file_index, file_count, done, total);
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    /// Copy the accumulated records, clearing them when `clear` is set.
    pub fn drain(&mut self, clear: bool) -> Vec<Diagnostic> {
        if clear {
            std::mem::take(&mut self.records)
        } else {
            self.records.clone()
        }
    }

    /// Ask every registered check for its catalog inside one envelope.
    ///
    /// Catalog entries go straight to the sink; they are not file diagnostics
    /// and are neither stored nor counted.
    pub fn emit_catalog(&mut self, checks: &CheckRegistry) {
        self.sink.catalog_begin();
        for check in checks.iter() {
            let entries = isolate(check.name(), Stage::Catalog, || {
                Ok::<_, Infallible>(check.catalog())
            });
            match entries {
                Ok(entries) => entries.iter().for_each(|d| self.forward(d)),
                Err(crash) => {
                    warn!(%crash, "Catalog failed");
                    self.forward(&Diagnostic::internal(format!(
                        "Internal error while listing the catalog: {crash}"
                    )));
                }
            }
        }
        self.sink.catalog_end();
    }

    fn forward(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::Violation | DiagnosticKind::Internal => {
                self.sink.report_err(diagnostic)
            }
            DiagnosticKind::Info => self.sink.report_info(diagnostic),
            DiagnosticKind::Progress => self.sink.report_out(&diagnostic.message),
        }
    }
}

impl std::fmt::Debug for ErrorAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorAggregator")
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}
