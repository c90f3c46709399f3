//! Regex pattern rules run over the rendered token list.

use crate::config::RuleConfig;
use crate::core::{Diagnostic, Severity, TokenList, TokenListKind};
use crate::errors::Error;
use regex::Regex;

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    id: String,
    severity: Severity,
    summary: Option<String>,
    tokenlist: TokenListKind,
}

/// Compiled pattern rules, independent of check plugins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every rule; rules whose pattern does not compile or whose
    /// token list is unknown are returned as errors and left out of the set.
    pub fn compile(configs: &[RuleConfig]) -> (Self, Vec<Error>) {
        let mut rules = Vec::with_capacity(configs.len());
        let mut invalid = Vec::new();
        for config in configs {
            let Some(tokenlist) = config.token_list_kind() else {
                invalid.push(Error::configuration(format!(
                    "rule '{}': unknown tokenlist '{}'",
                    config.id, config.tokenlist
                )));
                continue;
            };
            match Regex::new(&config.pattern) {
                Ok(regex) => rules.push(CompiledRule {
                    regex,
                    id: config.id.clone(),
                    severity: config.severity,
                    summary: config.summary.clone(),
                    tokenlist,
                }),
                Err(source) => invalid.push(Error::Rule {
                    id: config.id.clone(),
                    source,
                }),
            }
        }
        (Self { rules }, invalid)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run the rules selected for `kind` over `tokens`.
    ///
    /// One violation is produced per non-overlapping match, located at the
    /// token containing the start of the match.
    pub fn execute(&self, tokens: &TokenList, kind: TokenListKind) -> Vec<Diagnostic> {
        let selected: Vec<&CompiledRule> = self
            .rules
            .iter()
            .filter(|r| r.tokenlist == kind)
            .collect();
        if selected.is_empty() || tokens.is_empty() {
            return Vec::new();
        }

        let text = tokens.rule_text();
        let mut found = Vec::new();
        for rule in selected {
            for m in rule.regex.find_iter(&text) {
                if m.as_str().is_empty() {
                    continue;
                }
                let message = rule
                    .summary
                    .clone()
                    .unwrap_or_else(|| format!("found '{}'", m.as_str()));
                let mut diagnostic = Diagnostic::violation(&rule.id, rule.severity, message)
                    .with_configuration(tokens.configuration.clone());
                if let Some(token) = tokens.token_at_rule_offset(m.start()) {
                    diagnostic = diagnostic.at(tokens.location_of(token));
                }
                found.push(diagnostic);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Location, Token, TokenClass};
    use pretty_assertions::assert_eq;

    fn rule(pattern: &str, tokenlist: &str) -> RuleConfig {
        RuleConfig {
            pattern: pattern.into(),
            id: "banned".into(),
            severity: Severity::Warning,
            summary: None,
            tokenlist: tokenlist.into(),
        }
    }

    fn tokens(kind: TokenListKind) -> TokenList {
        let mut tl = TokenList::new("a.c", "WIN32");
        tl.kind = kind;
        for (i, (text, class)) in [
            ("strcpy", TokenClass::Name),
            ("(", TokenClass::Op),
            ("a", TokenClass::Name),
            (")", TokenClass::Op),
            (";", TokenClass::Op),
            ("strcpy", TokenClass::Name),
        ]
        .into_iter()
        .enumerate()
        {
            tl.tokens.push(Token::new(text, class, i + 1, 0));
        }
        tl
    }

    #[test]
    fn test_one_violation_per_match() {
        let (set, invalid) = RuleSet::compile(&[rule(r"strcpy", "simple")]);
        assert!(invalid.is_empty());
        let found = set.execute(&tokens(TokenListKind::Simplified), TokenListKind::Simplified);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].message, "found 'strcpy'");
        assert_eq!(found[0].location, Some(Location::new("a.c", 1)));
        assert_eq!(found[1].location, Some(Location::new("a.c", 6)));
        assert_eq!(found[1].configuration.as_deref(), Some("WIN32"));
    }

    #[test]
    fn test_rules_select_token_list_kind() {
        let (set, _) = RuleSet::compile(&[rule(r"strcpy", "normal")]);
        let tl = tokens(TokenListKind::Simplified);
        assert!(set.execute(&tl, TokenListKind::Simplified).is_empty());
        assert_eq!(set.execute(&tl, TokenListKind::Normal).len(), 2);
    }

    #[test]
    fn test_match_start_on_separator_space() {
        let (set, _) = RuleSet::compile(&[rule(r" \( a", "simple")]);
        let found = set.execute(&tokens(TokenListKind::Simplified), TokenListKind::Simplified);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location, Some(Location::new("a.c", 2)));
    }

    #[test]
    fn test_custom_summary() {
        let mut config = rule(r"strcpy", "simple");
        config.summary = Some("Use strncpy".into());
        let (set, _) = RuleSet::compile(&[config]);
        let found = set.execute(&tokens(TokenListKind::Simplified), TokenListKind::Simplified);
        assert!(found.iter().all(|d| d.message == "Use strncpy"));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let (set, invalid) = RuleSet::compile(&[rule(r"(", "simple"), rule("x", "simple")]);
        assert_eq!(set.len(), 1);
        assert_eq!(invalid.len(), 1);
        assert!(invalid[0].to_string().starts_with("Invalid rule 'banned'"));
    }

    #[test]
    fn test_unknown_tokenlist_is_reported_not_dropped() {
        let (set, invalid) =
            RuleSet::compile(&[rule("strcpy", "simplified"), rule("strcpy", " Normal ")]);
        assert_eq!(set.len(), 1);
        assert_eq!(invalid.len(), 1);
        assert!(invalid[0].to_string().contains("unknown tokenlist 'simplified'"));
        let tl = tokens(TokenListKind::Normal);
        assert_eq!(set.execute(&tl, TokenListKind::Normal).len(), 2);
    }
}
