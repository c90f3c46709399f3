use crate::check::{Artifact, Check, CheckResult};
use crate::core::{Diagnostic, Location, Severity, TokenList, TokenListKind};
use crate::engine::FileInfo;
use crate::errors::CheckError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type TokenPredicate = Arc<dyn Fn(&TokenList) -> bool + Send + Sync>;
type RunHook = Arc<dyn Fn(&TokenList) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    Panic,
    Error,
}

/// Invocation counters shared between a [`StubCheck`] and the test.
#[derive(Debug, Default)]
pub struct StubCounters {
    runs: AtomicUsize,
    analyzes: AtomicUsize,
    file_infos: AtomicUsize,
    whole_program: AtomicUsize,
    whole_program_artifacts: AtomicUsize,
}

impl StubCounters {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn analyzes(&self) -> usize {
        self.analyzes.load(Ordering::SeqCst)
    }

    pub fn file_infos(&self) -> usize {
        self.file_infos.load(Ordering::SeqCst)
    }

    /// Number of whole-program passes this check took part in
    pub fn whole_program_runs(&self) -> usize {
        self.whole_program.load(Ordering::SeqCst)
    }

    /// Artifacts received by the most recent whole-program pass
    pub fn whole_program_artifacts(&self) -> usize {
        self.whole_program_artifacts.load(Ordering::SeqCst)
    }
}

/// Artifact produced by a [`StubCheck`] with file info enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubArtifact {
    pub file: PathBuf,
    pub configuration: String,
    pub tokens: usize,
}

/// A check plugin whose behaviour is configured by the test.
#[derive(Clone)]
pub struct StubCheck {
    name: String,
    kinds: Vec<TokenListKind>,
    violation: Option<String>,
    fault: Option<(FaultMode, TokenPredicate)>,
    file_info: bool,
    on_run: Option<RunHook>,
    counters: Arc<StubCounters>,
}

impl StubCheck {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kinds: vec![TokenListKind::Normal, TokenListKind::Simplified],
            violation: None,
            fault: None,
            file_info: false,
            on_run: None,
            counters: Arc::new(StubCounters::default()),
        }
    }

    /// Report one violation with `id` per run, at the first token.
    pub fn reporting(mut self, id: impl Into<String>) -> Self {
        self.violation = Some(id.into());
        self
    }

    pub fn on(mut self, kinds: &[TokenListKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    pub fn normal_only(self) -> Self {
        self.on(&[TokenListKind::Normal])
    }

    /// Fail the `run`/`analyze` hook whenever `predicate` holds.
    pub fn faulting_when(
        mut self,
        mode: FaultMode,
        predicate: impl Fn(&TokenList) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fault = Some((mode, Arc::new(predicate)));
        self
    }

    /// Produce a [`StubArtifact`] per configuration and take part in the
    /// whole-program pass.
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Call `hook` at the start of every `run`.
    pub fn on_run(mut self, hook: impl Fn(&TokenList) + Send + Sync + 'static) -> Self {
        self.on_run = Some(Arc::new(hook));
        self
    }

    pub fn counters(&self) -> Arc<StubCounters> {
        Arc::clone(&self.counters)
    }

    fn maybe_fault(&self, tokens: &TokenList) -> Result<(), CheckError> {
        match &self.fault {
            Some((mode, predicate)) if predicate(tokens) => match mode {
                FaultMode::Panic => panic!("{} crashed on {} tokens", self.name, tokens.len()),
                FaultMode::Error => Err(CheckError::failed(format!(
                    "{} refused {} tokens",
                    self.name,
                    tokens.len()
                ))),
            },
            _ => Ok(()),
        }
    }
}

impl Check for StubCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn runs_on(&self, kind: TokenListKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn run(&self, tokens: &TokenList) -> CheckResult {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.on_run {
            hook(tokens);
        }
        self.maybe_fault(tokens)?;

        let Some(id) = &self.violation else {
            return Ok(Vec::new());
        };
        let mut diagnostic = Diagnostic::violation(
            id,
            Severity::Warning,
            format!("{} found {} tokens", self.name, tokens.len()),
        );
        if let Some(first) = tokens.iter().next() {
            diagnostic = diagnostic.at(tokens.location_of(first));
        }
        Ok(vec![diagnostic])
    }

    fn analyze(&self, tokens: &TokenList) -> CheckResult {
        self.counters.analyzes.fetch_add(1, Ordering::SeqCst);
        self.maybe_fault(tokens)?;
        Ok(Vec::new())
    }

    fn file_info(&self, tokens: &TokenList) -> Result<Option<Artifact>, CheckError> {
        if !self.file_info {
            return Ok(None);
        }
        self.counters.file_infos.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(StubArtifact {
            file: tokens.source_file().to_path_buf(),
            configuration: tokens.configuration.clone(),
            tokens: tokens.len(),
        })))
    }

    fn supports_whole_program(&self) -> bool {
        self.file_info
    }

    fn analyse_whole_program(&self, infos: &[&FileInfo]) -> CheckResult {
        self.counters.whole_program.fetch_add(1, Ordering::SeqCst);
        self.counters
            .whole_program_artifacts
            .store(infos.len(), Ordering::SeqCst);

        let mut files: Vec<&PathBuf> = infos
            .iter()
            .filter_map(|i| i.downcast_ref::<StubArtifact>())
            .map(|a| &a.file)
            .collect();
        files.sort();
        files.dedup();
        Ok(files
            .into_iter()
            .map(|file| {
                Diagnostic::violation(
                    format!("{}.wholeProgram", self.name),
                    Severity::Style,
                    format!("{} saw {}", self.name, file.display()),
                )
                .at(Location::new(file.clone(), 1))
            })
            .collect())
    }

    fn catalog(&self) -> Vec<Diagnostic> {
        let id = self.violation.clone().unwrap_or_else(|| self.name.clone());
        vec![Diagnostic::violation(id, Severity::Warning, "stub catalog entry")]
    }
}
