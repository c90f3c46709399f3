//! Diagnostic records flowing from checks and the pipeline into the aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Well-known diagnostic ids emitted by the pipeline itself.
pub mod ids {
    pub const INTERNAL_ERROR: &str = "internalError";
    pub const TOO_MANY_CONFIGS: &str = "toomanyconfigs";
    pub const PURGED_CONFIGURATION: &str = "purgedConfiguration";
    pub const PROGRESS: &str = "progress";
}

/// Which channel a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Normal finding from a check or pattern rule
    Violation,
    /// A check or collaborator failed on one configuration
    Internal,
    /// Informational note (overflow, purged configuration)
    Info,
    /// Free-text progress ("Checking main.cpp...")
    Progress,
}

impl DiagnosticKind {
    /// Violations and internal errors count towards a file's error tally.
    pub fn is_counted(self) -> bool {
        matches!(self, Self::Violation | Self::Internal)
    }
}

/// Rule severity, as configured for pattern rules and used by checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Style,
    Performance,
    Portability,
    Information,
    Debug,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Style => "style",
            Self::Performance => "performance",
            Self::Portability => "portability",
            Self::Information => "information",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "style" => Ok(Self::Style),
            "performance" => Ok(Self::Performance),
            "portability" => Ok(Self::Portability),
            "information" | "info" => Ok(Self::Information),
            "debug" => Ok(Self::Debug),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Source position of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// One record of the ordered diagnostic stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Preprocessor configuration the record was produced under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    /// Minimized reproducer attached to internal errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reproducer: Option<String>,
}

impl Diagnostic {
    fn new(
        kind: DiagnosticKind,
        id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            severity,
            message: message.into(),
            location: None,
            configuration: None,
            reproducer: None,
        }
    }

    /// A finding reported by a check or pattern rule.
    pub fn violation(id: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Violation, id, severity, message)
    }

    /// An isolated failure of a check or collaborator.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            DiagnosticKind::Internal,
            ids::INTERNAL_ERROR,
            Severity::Error,
            message,
        )
    }

    /// An informational note.
    pub fn info(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, id, Severity::Information, message)
    }

    /// A free-text progress line.
    pub fn progress(message: impl Into<String>) -> Self {
        Self::new(
            DiagnosticKind::Progress,
            ids::PROGRESS,
            Severity::Information,
            message,
        )
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    pub fn with_reproducer(mut self, code: impl Into<String>) -> Self {
        self.reproducer = Some(code.into());
        self
    }

    /// Fill in the configuration unless the producer already set one.
    pub(crate) fn stamp_configuration(mut self, configuration: &str) -> Self {
        if self.configuration.is_none() {
            self.configuration = Some(configuration.to_string());
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    /// `[file:line]: (severity) message`, the classic one-line form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == DiagnosticKind::Progress {
            return f.write_str(&self.message);
        }
        if let Some(location) = &self.location {
            write!(f, "[{location}]: ")?;
        }
        write!(f, "({}) {}", self.severity, self.message)
    }
}
