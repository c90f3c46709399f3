//! Token lists produced by the tokenizer collaborator and consumed by checks.

use super::diagnostic::Location;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which pass a token list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenListKind {
    Normal,
    Simplified,
}

impl TokenListKind {
    /// Name used by pattern rule configuration (`normal` / `simple`).
    pub fn rule_key(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Simplified => "simple",
        }
    }
}

impl fmt::Display for TokenListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Simplified => f.write_str("simplified"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenClass {
    Name,
    Number,
    String,
    Char,
    Op,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    pub class: TokenClass,
    pub line: usize,
    /// Index into [`TokenList::files`]
    pub file: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, class: TokenClass, line: usize, file: usize) -> Self {
        Self {
            text: text.into(),
            class,
            line,
            file,
        }
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_name(&self) -> bool {
        self.class == TokenClass::Name
    }

    pub fn is_number(&self) -> bool {
        self.class == TokenClass::Number
    }
}

/// Tokens of one configuration of one file.
#[derive(Debug, Clone, Serialize)]
pub struct TokenList {
    pub kind: TokenListKind,
    pub configuration: String,
    /// File table; index 0 is the analysed source file
    pub files: Vec<PathBuf>,
    pub tokens: Vec<Token>,
}

impl TokenList {
    pub fn new(path: impl Into<PathBuf>, configuration: impl Into<String>) -> Self {
        Self {
            kind: TokenListKind::Normal,
            configuration: configuration.into(),
            files: vec![path.into()],
            tokens: Vec::new(),
        }
    }

    pub fn source_file(&self) -> &Path {
        &self.files[0]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn location_of(&self, token: &Token) -> Location {
        let file = self
            .files
            .get(token.file)
            .unwrap_or(&self.files[0])
            .clone();
        Location::new(file, token.line)
    }

    /// Register a file in the table, returning its index.
    pub fn file_index(&mut self, path: &Path) -> usize {
        match self.files.iter().position(|f| f == path) {
            Some(idx) => idx,
            None => {
                self.files.push(path.to_path_buf());
                self.files.len() - 1
            }
        }
    }

    /// Space-prefixed rendering used by pattern rules: `" int x ;"`.
    pub fn rule_text(&self) -> String {
        let capacity = self.tokens.iter().map(|t| t.text.len() + 1).sum();
        self.tokens
            .iter()
            .fold(String::with_capacity(capacity), |mut acc, tok| {
                acc.push(' ');
                acc.push_str(&tok.text);
                acc
            })
    }

    /// Token whose rendered span in [`rule_text`](Self::rule_text) contains `offset`.
    pub fn token_at_rule_offset(&self, offset: usize) -> Option<&Token> {
        let mut len = 0usize;
        self.tokens.iter().find(|tok| {
            len += 1 + tok.text.len();
            len > offset
        })
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
