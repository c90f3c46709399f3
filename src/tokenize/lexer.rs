use super::simplify::simplify_tokens;
use super::Tokenizer;
use crate::core::{Token, TokenClass, TokenList};
use crate::errors::TokenizeError;
use crate::preprocess::{END_FILE_MARKER, FILE_MARKER};
use std::path::{Path, PathBuf};

/// Longest operators first so that matching is greedy.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "...", "->*", "::", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&",
    "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "##", ".*",
];

const STRING_PREFIXES: &[&str] = &["L", "u", "U", "u8", "R"];

/// Lexer for preprocessed C and C++.
#[derive(Debug, Clone, Copy, Default)]
pub struct CTokenizer;

impl CTokenizer {
    pub fn new() -> Self {
        Self
    }
}

/// Position bookkeeping across `#file` / `#endfile` markers.
struct Cursor {
    file: usize,
    line: usize,
    /// Including file and the line its `#include` stood on minus one
    stack: Vec<(usize, usize)>,
}

struct OpenBracket {
    bracket: char,
    file: usize,
    line: usize,
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

impl Tokenizer for CTokenizer {
    fn tokenize(
        &self,
        path: &Path,
        expanded: &str,
        configuration: &str,
    ) -> Result<TokenList, TokenizeError> {
        let mut list = TokenList::new(path, configuration);
        let mut cursor = Cursor {
            file: 0,
            line: 0,
            stack: Vec::new(),
        };
        let mut brackets: Vec<OpenBracket> = Vec::new();

        for (idx, raw) in expanded.lines().enumerate() {
            cursor.line += 1;
            let trimmed = raw.trim_start();

            if let Some(rest) = trimmed.strip_prefix(FILE_MARKER) {
                if rest.starts_with(|c: char| c.is_whitespace()) {
                    let name = rest
                        .trim()
                        .strip_prefix('"')
                        .and_then(|r| r.strip_suffix('"'))
                        .ok_or(TokenizeError::Marker(idx + 1))?;
                    cursor.stack.push((cursor.file, cursor.line - 1));
                    cursor.file = list.file_index(&PathBuf::from(name));
                    cursor.line = 0;
                    continue;
                }
            }
            if trimmed.trim_end() == END_FILE_MARKER {
                let (file, line) = cursor.stack.pop().ok_or(TokenizeError::Marker(idx + 1))?;
                cursor.file = file;
                cursor.line = line + 1;
                continue;
            }
            if trimmed.starts_with('#') {
                continue;
            }

            lex_line(raw, &cursor, &mut list, &mut brackets)?;
        }

        if let Some(open) = brackets.pop() {
            return Err(TokenizeError::Unbalanced {
                file: list.files[open.file].clone(),
                line: open.line,
                bracket: open.bracket,
            });
        }
        Ok(list)
    }

    fn simplify(&self, tokens: &TokenList) -> Result<TokenList, TokenizeError> {
        Ok(simplify_tokens(tokens))
    }
}

fn lex_line(
    line: &str,
    cursor: &Cursor,
    list: &mut TokenList,
    brackets: &mut Vec<OpenBracket>,
) -> Result<(), TokenizeError> {
    let chars: Vec<char> = line.chars().collect();
    let file_path = |list: &TokenList| list.files[cursor.file].clone();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        let class = if c.is_whitespace() {
            i += 1;
            continue;
        } else if c.is_ascii_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match chars.get(i) {
                Some(&q) if matches!(q, '"' | '\'') && STRING_PREFIXES.contains(&word.as_str()) => {
                    i = end_of_literal(&chars, i, q).ok_or_else(|| {
                        TokenizeError::syntax(file_path(list), cursor.line, "unterminated literal")
                    })?;
                    if q == '"' {
                        TokenClass::String
                    } else {
                        TokenClass::Char
                    }
                }
                _ => TokenClass::Name,
            }
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let hex = c == '0' && matches!(chars.get(i + 1), Some('x' | 'X'));
            i += 1;
            while i < chars.len() {
                let n = chars[i];
                let exponent_sign = matches!(n, '+' | '-')
                    && match chars[i - 1] {
                        'e' | 'E' => !hex,
                        'p' | 'P' => hex,
                        _ => false,
                    };
                if n.is_ascii_alphanumeric() || n == '_' || n == '.' || exponent_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            TokenClass::Number
        } else if c == '"' || c == '\'' {
            i = end_of_literal(&chars, i, c).ok_or_else(|| {
                let what = if c == '"' { "string" } else { "character" };
                TokenizeError::syntax(
                    file_path(list),
                    cursor.line,
                    format!("unterminated {what} literal"),
                )
            })?;
            if c == '"' {
                TokenClass::String
            } else {
                TokenClass::Char
            }
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let len = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .map_or(1, |op| op.len());
            i += len;
            match c {
                '(' | '[' | '{' if len == 1 => brackets.push(OpenBracket {
                    bracket: c,
                    file: cursor.file,
                    line: cursor.line,
                }),
                ')' | ']' | '}' => match brackets.pop() {
                    Some(open) if closing_for(open.bracket) == c => {}
                    _ => {
                        return Err(TokenizeError::Unbalanced {
                            file: file_path(list),
                            line: cursor.line,
                            bracket: c,
                        })
                    }
                },
                _ => {}
            }
            TokenClass::Op
        };

        let text: String = chars[start..i].iter().collect();
        list.tokens
            .push(Token::new(text, class, cursor.line, cursor.file));
    }
    Ok(())
}

/// Index one past the closing quote of the literal opening at `open`.
fn end_of_literal(chars: &[char], open: usize, quote: char) -> Option<usize> {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}
