//! Host-side batch driver.
//!
//! Files are independent, so with `jobs > 1` each file runs on its own
//! [`Engine`] inside a rayon pool. All engines report to one shared sink and
//! observe one cancellation token. Their file info and large-header state is
//! merged into a single engine afterwards, which runs the whole-program pass
//! exactly once.

use crate::check::CheckRegistry;
use crate::config::Settings;
use crate::core::Diagnostic;
use crate::engine::{
    AnalyzeStatus, CancellationToken, DiagnosticSink, Engine, EngineBuilder, FileInfoStore,
    LargeHeaderTracker, RuleSet,
};
use crate::errors::{Error, Result};
use crate::io::file_size;
use crate::observability::{increment_processed, set_progress};
use crate::preprocess::Preprocessor;
use crate::tokenize::Tokenizer;
use indicatif::ProgressBar;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, info_span, warn};

/// A sink shared by every engine of a batch. Each call holds the lock for
/// one record, so records from different files never interleave mid-line.
#[derive(Clone)]
pub struct SharedSink {
    inner: Arc<Mutex<Box<dyn DiagnosticSink>>>,
}

impl SharedSink {
    pub fn new(sink: impl DiagnosticSink + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(sink))),
        }
    }
}

impl DiagnosticSink for SharedSink {
    fn report_err(&mut self, diagnostic: &Diagnostic) {
        self.inner.lock().report_err(diagnostic);
    }

    fn report_out(&mut self, message: &str) {
        self.inner.lock().report_out(message);
    }

    fn report_info(&mut self, diagnostic: &Diagnostic) {
        self.inner.lock().report_info(diagnostic);
    }

    fn report_status(
        &mut self,
        file_index: usize,
        file_count: usize,
        size_done: u64,
        size_total: u64,
    ) {
        self.inner
            .lock()
            .report_status(file_index, file_count, size_done, size_total);
    }

    fn catalog_begin(&mut self) {
        self.inner.lock().catalog_begin();
    }

    fn catalog_end(&mut self) {
        self.inner.lock().catalog_end();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Check,
    Analyze,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: usize,
    /// Counted diagnostics over all files plus the whole-program pass
    pub errors: u64,
    /// Files whose analysis recorded an internal error (analyze mode) or
    /// could not be read
    pub failed_files: usize,
    pub whole_program_errors: usize,
    pub large_headers: BTreeSet<PathBuf>,
    pub cancelled: bool,
}

struct FileOutcome {
    errors: u32,
    failed: bool,
    file_infos: FileInfoStore,
    large_headers: LargeHeaderTracker,
}

pub struct BatchRunner {
    settings: Settings,
    checks: Option<CheckRegistry>,
    preprocessor: Option<Arc<dyn Preprocessor>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    sink: SharedSink,
    cancel: CancellationToken,
    progress: ProgressBar,
}

impl BatchRunner {
    pub fn new(settings: Settings, sink: impl DiagnosticSink + 'static) -> Self {
        Self {
            settings,
            checks: None,
            preprocessor: None,
            tokenizer: None,
            sink: SharedSink::new(sink),
            cancel: CancellationToken::new(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn checks(mut self, checks: CheckRegistry) -> Self {
        self.checks = Some(checks);
        self
    }

    pub fn preprocessor(mut self, preprocessor: Arc<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// `rules` set: reuse a rule set compiled (and reported) by another engine.
    fn engine(&self, rules: Option<&RuleSet>) -> Result<Engine> {
        let mut builder = EngineBuilder::new(self.settings.clone())
            .sink(self.sink.clone())
            .cancellation(self.cancel.clone());
        if let Some(rules) = rules {
            builder = builder.rules(rules.clone());
        }
        if let Some(checks) = &self.checks {
            builder = builder.checks(checks.clone());
        }
        if let Some(preprocessor) = &self.preprocessor {
            builder = builder.shared_preprocessor(Arc::clone(preprocessor));
        }
        if let Some(tokenizer) = &self.tokenizer {
            builder = builder.shared_tokenizer(Arc::clone(tokenizer));
        }
        builder.build()
    }

    /// Emit the catalog of every configured check through the shared sink.
    pub fn catalog(&self) -> Result<()> {
        self.engine(None)?.emit_catalog();
        Ok(())
    }

    pub fn run(&self, files: &[PathBuf], mode: BatchMode) -> Result<BatchReport> {
        let _span = info_span!("batch", files = files.len(), jobs = self.settings.jobs).entered();
        // Validates settings and reports invalid rules before any worker starts.
        let mut host = self.engine(None)?;
        let rules = host.rules().clone();

        let sizes: Vec<u64> = files.iter().map(|f| file_size(f)).collect();
        let total: u64 = sizes.iter().sum();
        let done = AtomicU64::new(0);
        let finished = AtomicUsize::new(0);
        self.progress.set_length(files.len() as u64);
        set_progress(0, files.len());

        let run_file = |engine: &mut Engine, index: usize| -> FileOutcome {
            let path = &files[index];
            let (errors, failed) = match mode {
                BatchMode::Check => match engine.check(path) {
                    Ok(count) => (count, false),
                    Err(e) => {
                        warn!("{}", e);
                        engine.report_progress(&e.to_string());
                        (0, true)
                    }
                },
                BatchMode::Analyze => match engine.analyze(path) {
                    Ok(status) => (0, status == AnalyzeStatus::Failed),
                    Err(e) => {
                        warn!("{}", e);
                        engine.report_progress(&e.to_string());
                        (0, true)
                    }
                },
            };

            let size_done = done.fetch_add(sizes[index], Ordering::SeqCst) + sizes[index];
            let file_index = finished.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.settings.quiet {
                engine.report_status(file_index, files.len(), size_done, total);
            }
            self.progress.inc(1);
            increment_processed();

            FileOutcome {
                errors,
                failed,
                file_infos: engine.take_file_infos(),
                large_headers: engine.take_large_headers(),
            }
        };

        let outcomes: Vec<FileOutcome> = if self.settings.jobs <= 1 {
            let mut engine = self.engine(Some(&rules))?;
            (0..files.len())
                .take_while(|_| !self.cancel.is_cancelled())
                .map(|index| run_file(&mut engine, index))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.settings.jobs)
                .build()
                .map_err(|e| Error::configuration(format!("unable to start workers: {e}")))?;
            pool.install(|| {
                (0..files.len())
                    .into_par_iter()
                    .filter(|_| !self.cancel.is_cancelled())
                    .map(|index| {
                        let mut engine = self.engine(Some(&rules))?;
                        Ok(run_file(&mut engine, index))
                    })
                    .collect::<Result<Vec<_>>>()
            })?
        };

        let mut report = BatchReport {
            files: outcomes.len(),
            ..BatchReport::default()
        };
        for outcome in outcomes {
            report.errors += u64::from(outcome.errors);
            report.failed_files += usize::from(outcome.failed);
            host.absorb_file_infos(outcome.file_infos);
            host.merge_large_headers(outcome.large_headers);
        }

        report.whole_program_errors = host.analyse_whole_program();
        report.errors += report.whole_program_errors as u64;
        report.large_headers = host.large_headers().clone();
        report.cancelled = self.cancel.is_cancelled();
        self.progress.finish_and_clear();

        info!(
            files = report.files,
            errors = report.errors,
            failed = report.failed_files,
            "Batch finished"
        );
        Ok(report)
    }
}
