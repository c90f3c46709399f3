// Export modules for library usage
pub mod batch;
pub mod check;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod errors;
pub mod io;
pub mod observability;
pub mod preprocess;
pub mod progress;
pub mod testkit;
pub mod tokenize;

// Re-export commonly used types
pub use crate::core::{Diagnostic, DiagnosticKind, Location, Severity, TokenList, TokenListKind};
pub use crate::engine::{
    AnalysisUnit, AnalyzeStatus, CancellationToken, DiagnosticSink, Engine, EngineBuilder,
};
pub use crate::errors::{Error, Result};
