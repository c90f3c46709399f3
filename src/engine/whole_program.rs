//! Whole-program aggregation: per-file artifacts and the single cross-file pass.

use super::aggregator::ErrorAggregator;
use super::cancel::CancellationToken;
use super::isolation::{isolate, Stage};
use crate::check::{Artifact, CheckRegistry};
use crate::core::Diagnostic;
use crate::observability::{set_phase, AnalysisPhase};
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span, warn};

/// An artifact produced by one check for one file and configuration.
pub struct FileInfo {
    check: String,
    file: PathBuf,
    configuration: String,
    payload: Artifact,
}

impl FileInfo {
    pub fn new(
        check: impl Into<String>,
        file: impl Into<PathBuf>,
        configuration: impl Into<String>,
        payload: Artifact,
    ) -> Self {
        Self {
            check: check.into(),
            file: file.into(),
            configuration: configuration.into(),
            payload,
        }
    }

    pub fn check(&self) -> &str {
        &self.check
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileInfo")
            .field("check", &self.check)
            .field("file", &self.file)
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

/// File info collected since the last whole-program pass.
#[derive(Debug, Default)]
pub struct FileInfoStore {
    entries: Vec<FileInfo>,
}

impl FileInfoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: FileInfo) {
        self.entries.push(info);
    }

    /// Take over every artifact of `other` (host-level merge of parallel engines).
    pub fn absorb(&mut self, mut other: FileInfoStore) {
        self.entries.append(&mut other.entries);
    }

    pub fn for_check(&self, check: &str) -> Vec<&FileInfo> {
        self.entries.iter().filter(|i| i.check == check).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The cross-file pass. Consuming `self` makes a second run impossible and
/// frees every artifact when the pass returns.
pub struct WholeProgramPass {
    store: FileInfoStore,
}

impl WholeProgramPass {
    pub fn new(store: FileInfoStore) -> Self {
        Self { store }
    }

    /// Run every whole-program capable check once; returns the number of
    /// counted diagnostics reported.
    pub fn run_once(
        self,
        checks: &CheckRegistry,
        errors: &mut ErrorAggregator,
        cancel: &CancellationToken,
    ) -> usize {
        let _phase = set_phase(AnalysisPhase::WholeProgram);
        let _span = info_span!("whole_program", artifacts = self.store.len()).entered();

        let mut reported = 0;
        for check in checks.iter().filter(|c| c.supports_whole_program()) {
            if cancel.is_cancelled() {
                debug!("Cancellation requested, stopping whole-program pass");
                break;
            }
            let infos = self.store.for_check(check.name());
            debug!(check = check.name(), artifacts = infos.len(), "Whole-program check");

            let diagnostics =
                match isolate(check.name(), Stage::WholeProgram, || check.analyse_whole_program(&infos)) {
                    Ok(diagnostics) => diagnostics,
                    Err(crash) => {
                        warn!(%crash, "Whole-program check failed");
                        vec![Diagnostic::internal(format!(
                            "Internal error during whole-program analysis: {crash}"
                        ))]
                    }
                };
            for diagnostic in diagnostics {
                if errors.report(diagnostic) {
                    reported += 1;
                }
            }
        }
        reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_filters_by_check() {
        let mut store = FileInfoStore::new();
        store.push(FileInfo::new("a", "x.c", "", Box::new(1u32)));
        store.push(FileInfo::new("b", "x.c", "", Box::new(2u32)));
        store.push(FileInfo::new("a", "y.c", "WIN32", Box::new(3u32)));

        let infos = store.for_check("a");
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].configuration(), "WIN32");
        assert_eq!(infos[1].downcast_ref::<u32>(), Some(&3));
        assert_eq!(infos[0].downcast_ref::<String>(), None);
    }

    #[test]
    fn test_absorb_moves_entries() {
        let mut left = FileInfoStore::new();
        let mut right = FileInfoStore::new();
        right.push(FileInfo::new("a", "x.c", "", Box::new(())));
        left.absorb(right);
        assert_eq!(left.len(), 1);
    }
}
