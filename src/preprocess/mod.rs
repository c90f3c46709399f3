//! Preprocessor collaborator: configuration discovery and expansion.

mod directive;
mod expr;
mod text;

pub use directive::{DirectivePreprocessor, DEFAULT_MAX_INCLUDE_DEPTH};

use crate::errors::PreprocessError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Marker opening an inlined header in expanded text: `#file "path"`.
pub const FILE_MARKER: &str = "#file";
/// Marker closing an inlined header.
pub const END_FILE_MARKER: &str = "#endfile";

/// Size metric for one header expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderExpansion {
    pub identity: PathBuf,
    pub expanded_size: usize,
}

/// Fully expanded text of one configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    pub headers: Vec<HeaderExpansion>,
}

impl Expansion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            headers: Vec::new(),
        }
    }
}

pub trait Preprocessor: Send + Sync {
    /// Configurations discovered in `source`, in a deterministic order.
    /// The empty string names the default configuration.
    fn configurations(&self, path: &Path, source: &str)
        -> Result<Vec<String>, PreprocessError>;

    /// Expand `source` under `configuration`.
    fn expand(
        &self,
        path: &Path,
        source: &str,
        configuration: &str,
    ) -> Result<Expansion, PreprocessError>;
}

/// Macro definitions named by a configuration string such as `A;B=2`.
///
/// A name without a value is defined as `1`.
pub fn configuration_defines(configuration: &str) -> HashMap<String, String> {
    configuration
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
            None => (entry.to_string(), "1".to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_defines() {
        let defines = configuration_defines("A; B=2;;");
        assert_eq!(defines.len(), 2);
        assert_eq!(defines["A"], "1");
        assert_eq!(defines["B"], "2");
        assert!(configuration_defines("").is_empty());
    }
}
