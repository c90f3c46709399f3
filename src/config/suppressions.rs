//! `id[:file[:line]]` suppressions applied before records reach the aggregator.

use crate::core::{Diagnostic, DiagnosticKind};
use crate::errors::Error;
use glob::Pattern;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Suppression {
    /// Diagnostic id, or `*` for any id
    pub id: String,
    pub file: Option<Pattern>,
    pub line: Option<usize>,
}

impl Suppression {
    pub fn matches(&self, diagnostic: &Diagnostic) -> bool {
        if diagnostic.kind == DiagnosticKind::Progress {
            return false;
        }
        if self.id != "*" && self.id != diagnostic.id {
            return false;
        }
        let location = diagnostic.location.as_ref();
        let file_ok = match (&self.file, location) {
            (None, _) => true,
            (Some(pattern), Some(loc)) => pattern.matches_path(&loc.file),
            (Some(_), None) => false,
        };
        let line_ok = match (self.line, location) {
            (None, _) => true,
            (Some(line), Some(loc)) => loc.line == line,
            (Some(_), None) => false,
        };
        file_ok && line_ok
    }
}

impl FromStr for Suppression {
    type Err = Error;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::Suppression {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        // A trailing line number is only present when there are two separators.
        let (rest, line) = match entry.rsplit_once(':') {
            Some((rest, tail)) if rest.contains(':') => {
                let line = tail
                    .parse::<usize>()
                    .map_err(|_| invalid("line must be a number"))?;
                (rest, Some(line))
            }
            _ => (entry, None),
        };
        let (id, file) = match rest.split_once(':') {
            Some((id, file)) => (id, Some(file)),
            None => (rest, None),
        };

        if id.trim().is_empty() {
            return Err(invalid("missing id"));
        }
        let file = file
            .filter(|f| !f.is_empty())
            .map(Pattern::new)
            .transpose()?;

        Ok(Self {
            id: id.trim().to_string(),
            file,
            line,
        })
    }
}

/// The active suppression list.
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    entries: Vec<Suppression>,
}

impl Suppressions {
    pub fn new(entries: Vec<Suppression>) -> Self {
        Self { entries }
    }

    pub fn is_suppressed(&self, diagnostic: &Diagnostic) -> bool {
        self.entries.iter().any(|s| s.matches(diagnostic))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Location, Severity};

    fn zerodiv_at(file: &str, line: usize) -> Diagnostic {
        Diagnostic::violation("zerodiv", Severity::Error, "Division by zero.")
            .at(Location::new(file, line))
    }

    #[test]
    fn test_id_only() {
        let s: Suppression = "zerodiv".parse().unwrap();
        assert!(s.matches(&zerodiv_at("a.c", 1)));
        assert!(!s.matches(&Diagnostic::violation("other", Severity::Style, "m")));
    }

    #[test]
    fn test_file_glob_and_line() {
        let s: Suppression = "zerodiv:src/*.c:12".parse().unwrap();
        assert!(s.matches(&zerodiv_at("src/a.c", 12)));
        assert!(!s.matches(&zerodiv_at("src/a.c", 13)));
        assert!(!s.matches(&zerodiv_at("lib/a.c", 12)));
    }

    #[test]
    fn test_file_without_line() {
        let s: Suppression = "zerodiv:legacy/*".parse().unwrap();
        assert_eq!(s.line, None);
        assert!(s.matches(&zerodiv_at("legacy/old.c", 99)));
    }

    #[test]
    fn test_wildcard_id_never_hides_progress() {
        let s: Suppression = "*".parse().unwrap();
        assert!(s.matches(&zerodiv_at("a.c", 1)));
        assert!(!s.matches(&Diagnostic::progress("Checking a.c ...")));
    }

    #[test]
    fn test_rejects_bad_entries() {
        assert!("".parse::<Suppression>().is_err());
        assert!(":a.c".parse::<Suppression>().is_err());
        assert!("zerodiv:a.c:x".parse::<Suppression>().is_err());
    }
}
