use crate::core::TokenList;
use crate::errors::{PreprocessError, TokenizeError};
use crate::preprocess::{Expansion, HeaderExpansion, Preprocessor};
use crate::tokenize::{CTokenizer, Tokenizer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Script {
    Expand(Expansion),
    Unresolvable(String),
    Fail(String),
    Panic(String),
}

/// Preprocessor that ignores the source and answers from a script.
///
/// Configurations are returned in insertion order. Expanding a configuration
/// that was never scripted fails with a directive error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPreprocessor {
    scripts: Vec<(String, Script)>,
    expand_calls: Arc<AtomicUsize>,
}

impl ScriptedPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configuration(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.script(name, Script::Expand(Expansion::new(text)))
    }

    /// Configuration whose expansion also inlines `headers` as
    /// `(path, expanded size)` pairs.
    pub fn configuration_with_headers(
        self,
        name: impl Into<String>,
        text: impl Into<String>,
        headers: &[(&str, usize)],
    ) -> Self {
        let expansion = Expansion {
            text: text.into(),
            headers: headers
                .iter()
                .map(|(path, size)| HeaderExpansion {
                    identity: PathBuf::from(path),
                    expanded_size: *size,
                })
                .collect(),
        };
        self.script(name, Script::Expand(expansion))
    }

    pub fn unresolvable(self, name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.script(name, Script::Unresolvable(reason.into()))
    }

    pub fn failing(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.script(name, Script::Fail(message.into()))
    }

    pub fn panicking(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.script(name, Script::Panic(message.into()))
    }

    /// Shared counter of `expand` calls.
    pub fn expand_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.expand_calls)
    }

    fn script(mut self, name: impl Into<String>, script: Script) -> Self {
        self.scripts.push((name.into(), script));
        self
    }
}

impl Preprocessor for ScriptedPreprocessor {
    fn configurations(
        &self,
        _path: &Path,
        _source: &str,
    ) -> Result<Vec<String>, PreprocessError> {
        Ok(self.scripts.iter().map(|(name, _)| name.clone()).collect())
    }

    fn expand(
        &self,
        path: &Path,
        _source: &str,
        configuration: &str,
    ) -> Result<Expansion, PreprocessError> {
        self.expand_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .iter()
            .find(|(name, _)| name == configuration)
            .map(|(_, script)| script);
        match script {
            Some(Script::Expand(expansion)) => Ok(expansion.clone()),
            Some(Script::Unresolvable(reason)) => {
                Err(PreprocessError::unresolvable(configuration, reason.clone()))
            }
            Some(Script::Fail(message)) => {
                Err(PreprocessError::directive(path, 1, message.clone()))
            }
            Some(Script::Panic(message)) => panic!("{message}"),
            None => Err(PreprocessError::directive(
                path,
                1,
                format!("no script for configuration '{configuration}'"),
            )),
        }
    }
}

#[derive(Debug, Default)]
pub struct TokenizerCounters {
    tokenize: AtomicUsize,
    simplify: AtomicUsize,
}

impl TokenizerCounters {
    pub fn tokenize_calls(&self) -> usize {
        self.tokenize.load(Ordering::SeqCst)
    }

    pub fn simplify_calls(&self) -> usize {
        self.simplify.load(Ordering::SeqCst)
    }
}

/// [`CTokenizer`] with call counters.
#[derive(Debug, Clone, Default)]
pub struct CountingTokenizer {
    inner: CTokenizer,
    counters: Arc<TokenizerCounters>,
}

impl CountingTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Arc<TokenizerCounters> {
        Arc::clone(&self.counters)
    }
}

impl Tokenizer for CountingTokenizer {
    fn tokenize(
        &self,
        path: &Path,
        expanded: &str,
        configuration: &str,
    ) -> Result<TokenList, TokenizeError> {
        self.counters.tokenize.fetch_add(1, Ordering::SeqCst);
        self.inner.tokenize(path, expanded, configuration)
    }

    fn simplify(&self, tokens: &TokenList) -> Result<TokenList, TokenizeError> {
        self.counters.simplify.fetch_add(1, Ordering::SeqCst);
        self.inner.simplify(tokens)
    }
}
