//! Functions defined somewhere in the batch and referenced nowhere.

use super::{Artifact, Check, CheckResult};
use crate::core::{Diagnostic, Location, Severity, TokenList, TokenListKind};
use crate::engine::whole_program::FileInfo;
use crate::errors::CheckError;
use std::collections::{BTreeSet, HashSet};

pub const ID: &str = "unusedFunction";

const ENTRY_POINTS: &[&str] = &["main", "wmain", "WinMain", "_tmain", "DllMain"];

const KEYWORDS: &[&str] = &[
    "if", "while", "for", "switch", "return", "sizeof", "alignof", "decltype", "catch", "do",
    "else", "case", "throw", "new", "delete", "typeof", "__attribute__", "static_assert",
];

/// Per-file artifact: definitions and every other name reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionUsage {
    pub definitions: Vec<(String, Location)>,
    pub used: HashSet<String>,
}

impl FunctionUsage {
    pub fn collect(tokens: &TokenList) -> Self {
        let list = &tokens.tokens;
        let mut usage = Self::default();
        let mut depth = 0usize;
        let mut i = 0;

        while i < list.len() {
            let tok = &list[i];
            if tok.is("{") {
                depth += 1;
            } else if tok.is("}") {
                depth = depth.saturating_sub(1);
            } else if tok.is_name() && !KEYWORDS.contains(&tok.text.as_str()) {
                let preceded_by_member = i > 0 && (list[i - 1].is(".") || list[i - 1].is("->"));
                let signature_end = (depth == 0
                    && !preceded_by_member
                    && list.get(i + 1).is_some_and(|t| t.is("(")))
                .then(|| matching_paren(tokens, i + 1))
                .flatten();

                match signature_end.map(|close| body_follows(tokens, close)) {
                    Some(Signature::Definition) => {
                        usage
                            .definitions
                            .push((tok.text.clone(), tokens.location_of(tok)));
                    }
                    Some(Signature::Declaration) => {}
                    Some(Signature::Other) | None => {
                        usage.used.insert(tok.text.clone());
                    }
                }
            }
            i += 1;
        }
        usage
    }
}

enum Signature {
    Definition,
    Declaration,
    Other,
}

fn matching_paren(tokens: &TokenList, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, tok) in tokens.tokens[open..].iter().enumerate() {
        if tok.is("(") {
            depth += 1;
        } else if tok.is(")") {
            depth -= 1;
            if depth == 0 {
                return Some(open + offset);
            }
        }
    }
    None
}

/// Classify what follows the closing parenthesis of a parameter list.
fn body_follows(tokens: &TokenList, close: usize) -> Signature {
    // trailing qualifiers such as `const`, `noexcept` or `override`
    let next = tokens.tokens[close + 1..].iter().find(|t| !t.is_name());
    match next {
        Some(t) if t.is("{") => Signature::Definition,
        Some(t) if t.is(";") => Signature::Declaration,
        _ => Signature::Other,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnusedFunctions;

impl Check for UnusedFunctions {
    fn name(&self) -> &str {
        ID
    }

    fn runs_on(&self, kind: TokenListKind) -> bool {
        kind == TokenListKind::Normal
    }

    fn run(&self, _tokens: &TokenList) -> CheckResult {
        Ok(Vec::new())
    }

    fn file_info(&self, tokens: &TokenList) -> Result<Option<Artifact>, CheckError> {
        Ok(Some(Box::new(FunctionUsage::collect(tokens))))
    }

    fn supports_whole_program(&self) -> bool {
        true
    }

    fn analyse_whole_program(&self, infos: &[&FileInfo]) -> CheckResult {
        let usages = infos
            .iter()
            .map(|info| {
                info.downcast_ref::<FunctionUsage>()
                    .ok_or_else(|| CheckError::ForeignFileInfo {
                        expected: ID.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let used: HashSet<&str> = usages
            .iter()
            .flat_map(|u| u.used.iter().map(String::as_str))
            .collect();

        let unused: BTreeSet<(&Location, &str)> = usages
            .iter()
            .flat_map(|u| u.definitions.iter())
            .filter(|(name, _)| !used.contains(name.as_str()))
            .filter(|(name, _)| !ENTRY_POINTS.contains(&name.as_str()))
            .map(|(name, location)| (location, name.as_str()))
            .collect();

        Ok(unused
            .into_iter()
            .map(|(location, name)| {
                Diagnostic::violation(
                    ID,
                    Severity::Style,
                    format!("The function '{name}' is never used."),
                )
                .at(location.clone())
            })
            .collect())
    }

    fn catalog(&self) -> Vec<Diagnostic> {
        vec![Diagnostic::violation(
            ID,
            Severity::Style,
            "The function 'funcName' is never used.",
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::{CTokenizer, Tokenizer};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn usage(file: &str, code: &str) -> FunctionUsage {
        let tokens = CTokenizer.tokenize(Path::new(file), code, "").unwrap();
        FunctionUsage::collect(&tokens)
    }

    #[test]
    fn test_collect_separates_definitions_from_uses() {
        let u = usage(
            "a.c",
            indoc! {"
                static int helper(int x);
                int helper(int x) { return x; }
                int api(void) const { return helper(1) + other(); }
            "},
        );
        let names: Vec<&str> = u.definitions.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["helper", "api"]);
        assert_eq!(u.definitions[1].1, Location::new("a.c", 3));
        assert!(u.used.contains("helper"));
        assert!(u.used.contains("other"));
        assert!(!u.used.contains("api"));
    }

    #[test]
    fn test_whole_program_reports_unreferenced_functions_once() {
        let a = usage("a.c", "int used(void) { return 0; }\nint dead(void) { return 1; }\n");
        let b = usage("b.c", "int main(void) { return used(); }\n");
        let infos = [
            FileInfo::new(ID, "a.c", "", Box::new(a.clone())),
            FileInfo::new(ID, "a.c", "DEBUG", Box::new(a)),
            FileInfo::new(ID, "b.c", "", Box::new(b)),
        ];
        let refs: Vec<&FileInfo> = infos.iter().collect();

        let found = UnusedFunctions.analyse_whole_program(&refs).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "The function 'dead' is never used.");
        assert_eq!(found[0].location, Some(Location::new("a.c", 2)));
    }

    #[test]
    fn test_foreign_artifact_is_an_error() {
        let info = FileInfo::new(ID, "a.c", "", Box::new(42u8));
        let err = UnusedFunctions.analyse_whole_program(&[&info]).unwrap_err();
        assert!(matches!(err, CheckError::ForeignFileInfo { .. }));
    }
}
