//! The analysis engine: configuration driver, fault isolation, reduction,
//! diagnostic aggregation and the whole-program pass.
//!
//! An [`Engine`] owns its collaborators and an engine-lifetime diagnostic
//! store. Each `check*`/`analyze*` call creates a fresh [`AnalysisUnit`];
//! checksum sets, the configuration ceiling and the internal-error flag never
//! outlive the call. File info accumulates across calls until
//! [`Engine::analyse_whole_program`] consumes it.
//!
//! ```no_run
//! use cfgscan::config::Settings;
//! use cfgscan::engine::EngineBuilder;
//!
//! let mut engine = EngineBuilder::new(Settings::default()).build()?;
//! let errors = engine.check_content("main.c", "int f() { return 1 / 0; }\n");
//! engine.analyse_whole_program();
//! # Ok::<(), cfgscan::errors::Error>(())
//! ```

pub mod aggregator;
pub mod cancel;
pub mod checksum;
mod driver;
pub mod isolation;
pub mod large_headers;
pub mod reducer;
pub mod rules;
pub mod unit;
pub mod whole_program;

pub use aggregator::{DiagnosticSink, ErrorAggregator, NullSink};
pub use cancel::CancellationToken;
pub use isolation::{isolate, Crash, CrashClass, CrashKind, Stage};
pub use large_headers::LargeHeaderTracker;
pub use reducer::{reduce, ReducerConfig, Reduction};
pub use rules::RuleSet;
pub use unit::AnalysisUnit;
pub use whole_program::{FileInfo, FileInfoStore, WholeProgramPass};

use crate::check::CheckRegistry;
use crate::config::{Settings, Suppressions};
use crate::core::Diagnostic;
use crate::errors::{Error, Result};
use crate::preprocess::{DirectivePreprocessor, Preprocessor};
use crate::tokenize::{CTokenizer, Tokenizer};
use driver::{Driver, Mode};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of an `analyze*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeStatus {
    Ok,
    /// At least one check or collaborator failed on this file
    Failed,
}

impl AnalyzeStatus {
    /// Process-style status code: 0 for success, 1 for failure.
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Failed => 1,
        }
    }
}

/// Assembles an [`Engine`]. Collaborators that are not supplied fall back to
/// the built-in preprocessor, tokenizer and checks.
pub struct EngineBuilder {
    settings: Settings,
    preprocessor: Option<Arc<dyn Preprocessor>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    checks: Option<CheckRegistry>,
    rules: Option<RuleSet>,
    sink: Option<Box<dyn DiagnosticSink>>,
    cancel: Option<CancellationToken>,
}

impl EngineBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            preprocessor: None,
            tokenizer: None,
            checks: None,
            rules: None,
            sink: None,
            cancel: None,
        }
    }

    pub fn preprocessor(mut self, preprocessor: impl Preprocessor + 'static) -> Self {
        self.preprocessor = Some(Arc::new(preprocessor));
        self
    }

    pub fn shared_preprocessor(mut self, preprocessor: Arc<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Some(Arc::new(tokenizer));
        self
    }

    pub fn shared_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn checks(mut self, checks: CheckRegistry) -> Self {
        self.checks = Some(checks);
        self
    }

    pub fn sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Use an already compiled rule set instead of compiling `settings.rules`.
    /// Nothing is reported for it; whoever compiled it reported its errors.
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Share a cancellation flag, e.g. with other engines of the same batch.
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<Engine> {
        self.settings.validate()?;
        let suppressions = Suppressions::new(self.settings.parsed_suppressions()?);
        let (rules, invalid_rules) = match self.rules {
            Some(rules) => (rules, Vec::new()),
            None => RuleSet::compile(&self.settings.rules),
        };

        let preprocessor = self.preprocessor.unwrap_or_else(|| {
            Arc::new(DirectivePreprocessor::new(
                self.settings.include_paths.clone(),
            ))
        });
        let tokenizer = self
            .tokenizer
            .unwrap_or_else(|| Arc::new(CTokenizer::new()));
        let checks = self
            .checks
            .unwrap_or_else(|| CheckRegistry::builtin(&self.settings));
        let sink = self.sink.unwrap_or_else(|| Box::new(NullSink));

        let mut errors = ErrorAggregator::new(sink, suppressions);
        for err in invalid_rules {
            errors.progress(format!("{err}; the rule is skipped"));
        }
        debug!(checks = ?checks, rules = rules.len(), "Engine assembled");

        Ok(Engine {
            large_headers: LargeHeaderTracker::new(&self.settings.large_headers),
            settings: self.settings,
            preprocessor,
            tokenizer,
            checks,
            rules,
            errors,
            file_infos: FileInfoStore::new(),
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// One analysis pipeline instance. Not shared between threads; hosts run
/// independent files on independent engines.
pub struct Engine {
    settings: Settings,
    preprocessor: Arc<dyn Preprocessor>,
    tokenizer: Arc<dyn Tokenizer>,
    checks: CheckRegistry,
    rules: RuleSet,
    errors: ErrorAggregator,
    file_infos: FileInfoStore,
    large_headers: LargeHeaderTracker,
    cancel: CancellationToken,
}

impl Engine {
    pub fn builder(settings: Settings) -> EngineBuilder {
        EngineBuilder::new(settings)
    }

    fn driver(&mut self, mode: Mode) -> Driver<'_> {
        Driver {
            settings: &self.settings,
            preprocessor: self.preprocessor.as_ref(),
            tokenizer: self.tokenizer.as_ref(),
            checks: &self.checks,
            rules: &self.rules,
            errors: &mut self.errors,
            file_infos: &mut self.file_infos,
            large_headers: &mut self.large_headers,
            cancel: &self.cancel,
            mode,
        }
    }

    /// Check a file on disk. Only reading the file can fail.
    pub fn check(&mut self, path: &Path) -> Result<u32> {
        let content = read_source(path)?;
        Ok(self.check_content(path, content))
    }

    /// Check in-memory content under `path`; returns the number of violations
    /// and internal errors reported for it.
    pub fn check_content(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> u32 {
        let mut unit = AnalysisUnit::new(path, content);
        self.check_unit(&mut unit)
    }

    /// Drive an existing unit, leaving its bookkeeping available to the caller.
    pub fn check_unit(&mut self, unit: &mut AnalysisUnit) -> u32 {
        self.driver(Mode::Check).run(unit);
        info!(
            file = %unit.path.display(),
            errors = unit.error_count,
            configurations = unit.config_count,
            "File checked"
        );
        unit.error_count
    }

    pub fn analyze(&mut self, path: &Path) -> Result<AnalyzeStatus> {
        let content = read_source(path)?;
        Ok(self.analyze_content(path, content))
    }

    pub fn analyze_content(
        &mut self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> AnalyzeStatus {
        let mut unit = AnalysisUnit::new(path, content);
        self.analyze_unit(&mut unit)
    }

    pub fn analyze_unit(&mut self, unit: &mut AnalysisUnit) -> AnalyzeStatus {
        self.driver(Mode::Analyze).run(unit);
        if unit.internal_error_found {
            AnalyzeStatus::Failed
        } else {
            AnalyzeStatus::Ok
        }
    }

    /// Request cooperative cancellation of any running or future call.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    /// A handle that can request cancellation from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Copy the accumulated records, clearing them when `clear` is set.
    pub fn drain_errors(&mut self, clear: bool) -> Vec<Diagnostic> {
        self.errors.drain(clear)
    }

    pub fn errors(&self) -> &[Diagnostic] {
        self.errors.records()
    }

    /// Run the cross-file pass over every artifact collected so far.
    ///
    /// The artifacts are released whether or not any check ran, so calling
    /// this twice never repeats a diagnostic. Returns the number of counted
    /// diagnostics reported.
    pub fn analyse_whole_program(&mut self) -> usize {
        let store = std::mem::take(&mut self.file_infos);
        if !self.settings.whole_program || store.is_empty() {
            return 0;
        }
        WholeProgramPass::new(store).run_once(&self.checks, &mut self.errors, &self.cancel)
    }

    /// Whether the cross-file unused-symbol pass is enabled and has a check
    /// that can use it.
    pub fn unused_function_check_enabled(&self) -> bool {
        self.settings.whole_program && self.checks.has_whole_program()
    }

    pub fn pending_file_infos(&self) -> usize {
        self.file_infos.len()
    }

    /// Hand collected artifacts to another engine (host-level merge).
    pub fn take_file_infos(&mut self) -> FileInfoStore {
        std::mem::take(&mut self.file_infos)
    }

    pub fn absorb_file_infos(&mut self, store: FileInfoStore) {
        self.file_infos.absorb(store);
    }

    pub fn large_headers(&self) -> &BTreeSet<PathBuf> {
        self.large_headers.headers()
    }

    pub fn take_large_headers(&mut self) -> LargeHeaderTracker {
        let fresh = LargeHeaderTracker::new(&self.settings.large_headers);
        std::mem::replace(&mut self.large_headers, fresh)
    }

    pub fn merge_large_headers(&mut self, other: LargeHeaderTracker) {
        self.large_headers.merge(other);
    }

    /// Ask every registered check for its catalog, in one envelope.
    pub fn emit_catalog(&mut self) {
        self.errors.emit_catalog(&self.checks);
    }

    /// Free-text line on the progress channel.
    pub fn report_progress(&mut self, message: &str) {
        self.errors.progress(message);
    }

    pub fn report_status(&mut self, file_index: usize, file_count: usize, done: u64, total: u64) {
        self.errors.status(file_index, file_count, done, total);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn checks(&self) -> &CheckRegistry {
        &self.checks
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Skip the simplified token list for subsequent calls.
    pub fn dont_simplify(&mut self) {
        self.settings.simplify = false;
    }

    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Build-time suffix from `CFGSCAN_EXTRA_VERSION`, empty when unset.
    pub fn extra_version() -> &'static str {
        option_env!("CFGSCAN_EXTRA_VERSION").unwrap_or("")
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("checks", &self.checks)
            .field("errors", &self.errors)
            .field("file_infos", &self.file_infos.len())
            .finish_non_exhaustive()
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| Error::read_failed(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DiagnosticKind, Severity};

    fn engine(settings: Settings) -> Engine {
        EngineBuilder::new(settings).build().unwrap()
    }

    #[test]
    fn test_builtin_pipeline_reports_folded_division() {
        let mut engine = engine(Settings::default());
        let errors = engine.check_content("a.c", "int f(int x) {\n  return x / (1 - 1);\n}\n");
        assert_eq!(errors, 1);
        let records = engine.drain_errors(false);
        let violation = records
            .iter()
            .find(|d| d.kind == DiagnosticKind::Violation)
            .unwrap();
        assert_eq!(violation.id, "zerodiv");
        assert_eq!(violation.severity, Severity::Error);
        assert_eq!(violation.configuration.as_deref(), Some(""));
        assert!(records
            .iter()
            .any(|d| d.kind == DiagnosticKind::Progress && d.message == "Checking a.c ..."));
    }

    #[test]
    fn test_invalid_rule_is_reported_once_as_progress() {
        let settings = Settings {
            rules: vec![crate::config::RuleConfig {
                pattern: "(".into(),
                id: "broken".into(),
                severity: Severity::Style,
                summary: None,
                tokenlist: "simple".into(),
            }],
            ..Default::default()
        };
        let mut engine = engine(settings);
        let records = engine.drain_errors(true);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiagnosticKind::Progress);
        assert!(records[0].message.contains("broken"));
    }

    #[test]
    fn test_precompiled_rules_are_not_reported_again() {
        let settings = Settings {
            rules: vec![crate::config::RuleConfig {
                pattern: "(".into(),
                id: "broken".into(),
                severity: Severity::Style,
                summary: None,
                tokenlist: "simple".into(),
            }],
            ..Default::default()
        };
        let first = engine(settings.clone());
        let mut second = EngineBuilder::new(settings)
            .rules(first.rules().clone())
            .build()
            .unwrap();
        assert!(second.drain_errors(true).is_empty());
        assert!(second.rules().is_empty());
    }

    #[test]
    fn test_read_failure_is_an_error() {
        let mut engine = engine(Settings::default());
        assert!(engine.check(Path::new("/definitely/not/here.c")).is_err());
    }

    #[test]
    fn test_unused_function_gate() {
        assert!(!engine(Settings::default()).unused_function_check_enabled());
        let settings = Settings {
            unused_function: true,
            ..Default::default()
        };
        assert!(engine(settings.clone()).unused_function_check_enabled());
        let settings = Settings {
            whole_program: false,
            ..settings
        };
        assert!(!engine(settings).unused_function_check_enabled());
    }

    #[test]
    fn test_analyze_status_codes() {
        assert_eq!(AnalyzeStatus::Ok.code(), 0);
        assert_eq!(AnalyzeStatus::Failed.code(), 1);
    }

    #[test]
    fn test_version_is_crate_version() {
        assert_eq!(Engine::version(), env!("CARGO_PKG_VERSION"));
    }
}
