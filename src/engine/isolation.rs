//! The fault-isolation boundary.
//!
//! This is the only place in the crate where unwinding is caught. A check or
//! collaborator that panics or returns an error becomes a [`Crash`] value for
//! exactly one invocation; the caller decides what to report.

use crate::check::Check;
use crate::core::{Diagnostic, TokenList, TokenListKind};
use crate::observability::{enter_isolation, payload_message};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Crash origin used for the preprocessor collaborator.
pub const PREPROCESSOR: &str = "preprocessor";
/// Crash origin used for the tokenizer collaborator.
pub const TOKENIZER: &str = "tokenizer";

/// What was being invoked when the fault happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configurations,
    Expand,
    Tokenize,
    Simplify,
    Run(TokenListKind),
    Analyze,
    FileInfo,
    WholeProgram,
    Catalog,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configurations => f.write_str("enumerating configurations"),
            Self::Expand => f.write_str("expanding"),
            Self::Tokenize => f.write_str("tokenizing"),
            Self::Simplify => f.write_str("simplifying"),
            Self::Run(kind) => write!(f, "running on the {kind} token list"),
            Self::Analyze => f.write_str("analyzing"),
            Self::FileInfo => f.write_str("collecting file info"),
            Self::WholeProgram => f.write_str("running whole-program analysis"),
            Self::Catalog => f.write_str("listing its catalog"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashKind {
    /// The invocation unwound
    Panic,
    /// The invocation returned an error
    Failure,
}

/// Identity used by the reducer to decide whether a candidate still fails
/// "the same way". Messages are deliberately excluded: they often embed sizes
/// that change as the input shrinks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrashClass {
    pub origin: String,
    pub stage: Stage,
    pub kind: CrashKind,
}

/// A caught failure of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crash {
    pub origin: String,
    pub stage: Stage,
    pub kind: CrashKind,
    pub message: String,
}

impl Crash {
    /// A failure reported as a value rather than by unwinding.
    pub fn failure(origin: &str, stage: Stage, err: impl fmt::Display) -> Self {
        Self {
            origin: origin.to_string(),
            stage,
            kind: CrashKind::Failure,
            message: err.to_string(),
        }
    }

    /// Whether the failing input is expanded text the reducer can shrink.
    pub fn is_reducible(&self) -> bool {
        !matches!(
            self.stage,
            Stage::Configurations | Stage::Expand | Stage::WholeProgram | Stage::Catalog
        )
    }

    pub fn class(&self) -> CrashClass {
        CrashClass {
            origin: self.origin.clone(),
            stage: self.stage,
            kind: self.kind,
        }
    }
}

impl fmt::Display for Crash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            CrashKind::Panic => "panicked",
            CrashKind::Failure => "failed",
        };
        write!(
            f,
            "'{}' {} while {}: {}",
            self.origin, verb, self.stage, self.message
        )
    }
}

/// Invoke `f` under the isolation boundary.
pub fn isolate<T, E, F>(origin: &str, stage: Stage, f: F) -> Result<T, Crash>
where
    E: fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    let _guard = enter_isolation(origin);
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Crash::failure(origin, stage, err)),
        Err(payload) => Err(Crash {
            origin: origin.to_string(),
            stage,
            kind: CrashKind::Panic,
            message: payload_message(payload.as_ref()),
        }),
    }
}

/// Run one check on one token list.
pub fn run_check(check: &dyn Check, tokens: &TokenList) -> Result<Vec<Diagnostic>, Crash> {
    isolate(check.name(), Stage::Run(tokens.kind), || check.run(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckResult;
    use crate::errors::CheckError;
    use crate::observability::get_current_context;

    struct Panicky;

    impl Check for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        fn run(&self, tokens: &TokenList) -> CheckResult {
            if tokens.is_empty() {
                panic!("no tokens");
            }
            Err(CheckError::failed("refused"))
        }
    }

    #[test]
    fn test_ok_passes_through() {
        let result = isolate("x", Stage::Tokenize, || Ok::<_, CheckError>(7));
        assert_eq!(result, Ok(7));
    }

    #[test]
    fn test_panic_becomes_crash() {
        let tokens = TokenList::new("a.c", "");
        let crash = run_check(&Panicky, &tokens).unwrap_err();
        assert_eq!(crash.kind, CrashKind::Panic);
        assert_eq!(crash.message, "no tokens");
        assert_eq!(crash.stage, Stage::Run(TokenListKind::Normal));
        assert!(!get_current_context().is_isolated());
    }

    #[test]
    fn test_error_becomes_failure() {
        let mut tokens = TokenList::new("a.c", "");
        tokens
            .tokens
            .push(crate::core::Token::new("x", crate::core::TokenClass::Name, 1, 0));
        let crash = run_check(&Panicky, &tokens).unwrap_err();
        assert_eq!(crash.kind, CrashKind::Failure);
        assert_eq!(
            crash.to_string(),
            "'panicky' failed while running on the normal token list: refused"
        );
    }

    #[test]
    fn test_class_ignores_message() {
        let a = Crash {
            origin: "c".into(),
            stage: Stage::Analyze,
            kind: CrashKind::Panic,
            message: "500 tokens".into(),
        };
        let b = Crash {
            message: "101 tokens".into(),
            ..a.clone()
        };
        assert_eq!(a.class(), b.class());
    }
}
