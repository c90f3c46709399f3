use super::{Check, CheckResult};
use crate::core::{Diagnostic, Severity, TokenList, TokenListKind};
use crate::tokenize::integer_value;

pub const ID: &str = "zerodiv";
const MESSAGE: &str = "Division by zero.";

/// Integer division or modulo by a literal zero.
///
/// Runs on the simplified list only, where constant sub-expressions have
/// already been folded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroDivision;

impl Check for ZeroDivision {
    fn name(&self) -> &str {
        ID
    }

    fn runs_on(&self, kind: TokenListKind) -> bool {
        kind == TokenListKind::Simplified
    }

    fn run(&self, tokens: &TokenList) -> CheckResult {
        let found = tokens
            .tokens
            .windows(2)
            .filter(|pair| {
                (pair[0].is("/") || pair[0].is("%"))
                    && pair[1].is_number()
                    && integer_value(&pair[1].text) == Some(0)
            })
            .map(|pair| {
                Diagnostic::violation(ID, Severity::Error, MESSAGE).at(tokens.location_of(&pair[0]))
            })
            .collect();
        Ok(found)
    }

    fn catalog(&self) -> Vec<Diagnostic> {
        vec![Diagnostic::violation(ID, Severity::Error, MESSAGE)]
    }
}
