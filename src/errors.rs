//! Shared error types for the analysis core.
//!
//! Collaborator failures (`PreprocessError`, `TokenizeError`, `CheckError`) are
//! values handed across the isolation boundary; they never escape a single
//! configuration. The crate-level [`Error`] is reserved for host glue such as
//! reading files and loading settings.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cfgscan operations
#[derive(Debug, Error)]
pub enum Error {
    /// File system related errors
    #[error("File system error: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid suppression entry
    #[error("Invalid suppression '{entry}': {reason}")]
    Suppression { entry: String, reason: String },

    /// Invalid pattern rule
    #[error("Invalid rule '{id}': {source}")]
    Rule {
        id: String,
        #[source]
        source: regex::Error,
    },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Glob pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Create a file system error with path context
    pub fn file_system(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.into()),
            source: None,
        }
    }

    /// Wrap an I/O error that happened while touching `path`
    pub fn read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::FileSystem {
            message: format!("unable to read {}", path.display()),
            path: Some(path),
            source: Some(source),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a preprocessor collaborator for one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    /// The configuration cannot be resolved (contradictory macro state,
    /// `#error` in active code). The configuration is purged, not crashed.
    #[error("configuration '{configuration}' cannot be resolved: {reason}")]
    Unresolvable {
        configuration: String,
        reason: String,
    },

    /// Malformed preprocessor directive
    #[error("{file}:{line}: {message}")]
    Directive {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// Include nesting went deeper than the preprocessor allows
    #[error("#include nested too deeply at {0}")]
    IncludeDepth(PathBuf),
}

impl PreprocessError {
    pub fn unresolvable(configuration: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unresolvable {
            configuration: configuration.into(),
            reason: reason.into(),
        }
    }

    pub fn directive(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Directive {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Whether this failure purges the configuration instead of crashing it.
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Self::Unresolvable { .. })
    }
}

/// Failure reported by a tokenizer collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("syntax error at {file}:{line}: {message}")]
    Syntax {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("unbalanced '{bracket}' at {file}:{line}")]
    Unbalanced {
        file: PathBuf,
        line: usize,
        bracket: char,
    },

    #[error("malformed file marker at line {0}")]
    Marker(usize),
}

impl TokenizeError {
    pub fn syntax(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

/// Failure returned (rather than panicked) by a check plugin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("{0}")]
    Failed(String),

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("file info of check '{expected}' has an unexpected type")]
    ForeignFileInfo { expected: String },
}

impl CheckError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_system_error_display() {
        let err = Error::file_system("missing", "/tmp/a.c");
        assert_eq!(err.to_string(), "File system error: missing");
    }

    #[test]
    fn test_read_failed_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::read_failed("a.c", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("unable to read a.c"));
    }

    #[test]
    fn test_unresolvable_classification() {
        let purged = PreprocessError::unresolvable("WIN32", "#error unsupported");
        let broken = PreprocessError::directive("a.c", 3, "#endif without #if");
        assert!(purged.is_unresolvable());
        assert!(!broken.is_unresolvable());
        assert_eq!(broken.to_string(), "a.c:3: #endif without #if");
    }

    #[test]
    fn test_check_error_display() {
        assert_eq!(CheckError::failed("boom").to_string(), "boom");
        assert_eq!(
            CheckError::Unsupported("goto".into()).to_string(),
            "unsupported construct: goto"
        );
    }
}
