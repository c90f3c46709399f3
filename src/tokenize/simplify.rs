//! Simplified token list: qualifiers removed, null constants normalised and
//! small integer expressions folded.

use crate::core::{Token, TokenClass, TokenList, TokenListKind};

const DROPPED_KEYWORDS: &[&str] = &[
    "const",
    "volatile",
    "register",
    "inline",
    "__inline",
    "__inline__",
    "restrict",
    "__restrict",
];

const NULL_CONSTANTS: &[&str] = &["NULL", "nullptr"];

pub(crate) fn simplify_tokens(list: &TokenList) -> TokenList {
    let tokens = list
        .iter()
        .filter(|t| !(t.is_name() && DROPPED_KEYWORDS.contains(&t.text.as_str())))
        .map(|t| {
            if t.is_name() && NULL_CONSTANTS.contains(&t.text.as_str()) {
                Token::new("0", TokenClass::Number, t.line, t.file)
            } else {
                t.clone()
            }
        })
        .collect();

    let mut simplified = TokenList {
        kind: TokenListKind::Simplified,
        configuration: list.configuration.clone(),
        files: list.files.clone(),
        tokens,
    };
    while fold_once(&mut simplified.tokens) {}
    simplified
}

/// Integer value of a literal such as `10`, `0x1f`, `017` or `3u`.
pub fn integer_value(text: &str) -> Option<i64> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

/// Whether the `(` at `idx` groups an expression rather than opening a call.
fn is_grouping(tokens: &[Token], idx: usize) -> bool {
    // `f(1)`, `a[i](2)` and `(x)(3)` are calls
    match idx.checked_sub(1).map(|p| &tokens[p]) {
        None => true,
        Some(prev) => prev.class == TokenClass::Op && !prev.is(")") && !prev.is("]"),
    }
}

/// Apply the first available fold. Returns false when nothing changed.
fn fold_once(tokens: &mut Vec<Token>) -> bool {
    for i in 0..tokens.len() {
        if !tokens[i].is("(") {
            continue;
        }
        let window = &tokens[i..];

        // ( num )
        if window.len() >= 3
            && window[1].is_number()
            && window[2].is(")")
            && integer_value(&window[1].text).is_some()
            && is_grouping(tokens, i)
        {
            tokens.remove(i + 2);
            tokens.remove(i);
            return true;
        }

        // ( num op num )
        if window.len() >= 5 && window[4].is(")") && window[1].is_number() && window[3].is_number()
        {
            let folded = match (integer_value(&window[1].text), integer_value(&window[3].text)) {
                (Some(l), Some(r)) => match window[2].text.as_str() {
                    "+" => l.checked_add(r),
                    "-" => l.checked_sub(r),
                    "*" => l.checked_mul(r),
                    _ => None,
                },
                _ => None,
            };
            if let Some(value) = folded.filter(|v| *v >= 0) {
                let (line, file) = (tokens[i + 1].line, tokens[i + 1].file);
                tokens[i + 1] = Token::new(value.to_string(), TokenClass::Number, line, file);
                tokens.drain(i + 2..i + 4);
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::{CTokenizer, Tokenizer};
    use std::path::Path;

    fn simplified(code: &str) -> String {
        let tokens = CTokenizer
            .tokenize(Path::new("a.c"), code, "")
            .unwrap();
        let list = simplify_tokens(&tokens);
        assert_eq!(list.kind, TokenListKind::Simplified);
        list.iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_drops_qualifiers_and_maps_null() {
        assert_eq!(
            simplified("static const volatile int *p = NULL;"),
            "static int * p = 0 ;"
        );
        assert_eq!(simplified("char *q = nullptr;"), "char * q = 0 ;");
    }

    #[test]
    fn test_folds_nested_constant_expressions() {
        assert_eq!(simplified("x = y / ((2 - 2) * 5);"), "x = y / 0 ;");
        assert_eq!(simplified("x = (0x10 + 1);"), "x = 17 ;");
    }

    #[test]
    fn test_calls_and_negative_results_are_kept() {
        assert_eq!(simplified("f(1); g(2 + 3);"), "f ( 1 ) ; g ( 5 ) ;");
        assert_eq!(simplified("x = (1 - 2);"), "x = ( 1 - 2 ) ;");
    }

    #[test]
    fn test_integer_value() {
        assert_eq!(integer_value("0"), Some(0));
        assert_eq!(integer_value("0x0"), Some(0));
        assert_eq!(integer_value("017"), Some(15));
        assert_eq!(integer_value("3UL"), Some(3));
        assert_eq!(integer_value("0.0"), None);
    }
}
