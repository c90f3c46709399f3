//! Core data model shared by the pipeline, checks and collaborators.

pub mod diagnostic;
pub mod token;

pub use diagnostic::{ids, Diagnostic, DiagnosticKind, Location, Severity};
pub use token::{Token, TokenClass, TokenList, TokenListKind};
