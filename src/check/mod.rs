//! Check plugins: independently implemented rule modules.
//!
//! The engine only sees the [`Check`] capability set. A check may fail by
//! returning [`CheckError`] or by panicking; either way the failure is caught
//! at the isolation boundary and never reaches other checks.

pub mod unused_functions;
pub mod zero_division;

pub use unused_functions::UnusedFunctions;
pub use zero_division::ZeroDivision;

use crate::config::Settings;
use crate::core::{Diagnostic, TokenList, TokenListKind};
use crate::engine::whole_program::FileInfo;
use crate::errors::CheckError;
use std::any::Any;
use std::sync::Arc;

/// Opaque per-file artifact handed back to the producing check.
pub type Artifact = Box<dyn Any + Send + Sync>;

pub type CheckResult = Result<Vec<Diagnostic>, CheckError>;

pub trait Check: Send + Sync {
    /// Stable identity, used to key file info and name crashes.
    fn name(&self) -> &str;

    /// Whether the check wants to see this kind of token list.
    fn runs_on(&self, _kind: TokenListKind) -> bool {
        true
    }

    /// Full diagnostic run over one configuration's tokens.
    fn run(&self, tokens: &TokenList) -> CheckResult;

    /// Lighter-weight hook used by the `analyze` entry points.
    fn analyze(&self, _tokens: &TokenList) -> CheckResult {
        Ok(Vec::new())
    }

    /// Artifact collected for the whole-program pass.
    fn file_info(&self, _tokens: &TokenList) -> Result<Option<Artifact>, CheckError> {
        Ok(None)
    }

    fn supports_whole_program(&self) -> bool {
        false
    }

    /// Cross-file pass over every artifact this check produced in the batch.
    fn analyse_whole_program(&self, _infos: &[&FileInfo]) -> CheckResult {
        Ok(Vec::new())
    }

    /// File-independent diagnostics describing what the check can report.
    fn catalog(&self) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// Ordered set of registered checks.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: Vec<Arc<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in checks enabled by `settings`.
    pub fn builtin(settings: &Settings) -> Self {
        let mut registry = Self::new();
        registry.register(ZeroDivision);
        if settings.unused_function {
            registry.register(UnusedFunctions);
        }
        registry
    }

    pub fn register(&mut self, check: impl Check + 'static) -> &mut Self {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn register_shared(&mut self, check: Arc<dyn Check>) -> &mut Self {
        self.checks.push(check);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Check>> {
        self.checks.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn has_whole_program(&self) -> bool {
        self.checks.iter().any(|c| c.supports_whole_program())
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
