use crate::core::Diagnostic;
use crate::engine::DiagnosticSink;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Err(Diagnostic),
    Out(String),
    Info(Diagnostic),
    Status {
        file_index: usize,
        file_count: usize,
        size_done: u64,
        size_total: u64,
    },
    CatalogBegin,
    CatalogEnd,
}

/// Sink recording every call. Clones share the same event log, so a test can
/// keep one handle and give the other to the engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Err(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn infos(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Info(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Out(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().push(event);
    }
}

impl DiagnosticSink for RecordingSink {
    fn report_err(&mut self, diagnostic: &Diagnostic) {
        self.push(SinkEvent::Err(diagnostic.clone()));
    }

    fn report_out(&mut self, message: &str) {
        self.push(SinkEvent::Out(message.to_string()));
    }

    fn report_info(&mut self, diagnostic: &Diagnostic) {
        self.push(SinkEvent::Info(diagnostic.clone()));
    }

    fn report_status(
        &mut self,
        file_index: usize,
        file_count: usize,
        size_done: u64,
        size_total: u64,
    ) {
        self.push(SinkEvent::Status {
            file_index,
            file_count,
            size_done,
            size_total,
        });
    }

    fn catalog_begin(&mut self) {
        self.push(SinkEvent::CatalogBegin);
    }

    fn catalog_end(&mut self) {
        self.push(SinkEvent::CatalogEnd);
    }
}
