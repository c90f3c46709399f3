//! Constant-expression evaluation for `#if` / `#elif`.

use super::text::{is_ident_char, is_ident_start};
use std::collections::HashMap;

const MAX_EXPANSION_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(i64),
    Op(&'static str),
}

const OPERATORS: [&str; 18] = [
    "&&", "||", "==", "!=", "<=", ">=", "<<", ">>", "(", ")", "!", "<", ">", "+", "-", "*", "/",
    "%",
];

/// Evaluate a preprocessor condition. Unknown identifiers are `0`.
pub(crate) fn evaluate(expr: &str, macros: &HashMap<String, Option<String>>) -> Result<bool, String> {
    let tokens = lex(expr, macros, 0)?;
    if tokens.is_empty() {
        return Err("missing expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.or()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("unexpected trailing tokens in '{}'", expr.trim()));
    }
    Ok(value != 0)
}

fn lex(
    expr: &str,
    macros: &HashMap<String, Option<String>>,
    depth: usize,
) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(Tok::Num(parse_number(&literal)?));
        } else if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            if name == "defined" {
                let (target, next) = defined_operand(&chars, i)?;
                tokens.push(Tok::Num(i64::from(macros.contains_key(&target))));
                i = next;
            } else if name == "true" {
                tokens.push(Tok::Num(1));
            } else {
                match macros.get(&name) {
                    Some(Some(value)) if depth < MAX_EXPANSION_DEPTH && !value.trim().is_empty() => {
                        tokens.extend(lex(value, macros, depth + 1)?)
                    }
                    Some(Some(_)) => tokens.push(Tok::Num(1)),
                    _ => tokens.push(Tok::Num(0)),
                }
            }
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .copied()
                .ok_or_else(|| format!("unexpected character '{c}' in #if"))?;
            tokens.push(Tok::Op(op));
            i += op.len();
        }
    }
    Ok(tokens)
}

fn defined_operand(chars: &[char], mut i: usize) -> Result<(String, usize), String> {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    let parenthesized = chars.get(i) == Some(&'(');
    if parenthesized {
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
    }
    let start = i;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    if start == i {
        return Err("'defined' without a macro name".to_string());
    }
    let name: String = chars[start..i].iter().collect();
    if parenthesized {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if chars.get(i) != Some(&')') {
            return Err("missing ')' after 'defined'".to_string());
        }
        i += 1;
    }
    Ok((name, i))
}

fn parse_number(literal: &str) -> Result<i64, String> {
    let digits = literal.trim_end_matches(['u', 'U', 'l', 'L']);
    let parsed = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse()
    };
    parsed.map_err(|_| format!("invalid number '{literal}' in #if"))
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn eat(&mut self, op: &str) -> bool {
        if matches!(self.tokens.get(self.pos), Some(Tok::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Tok::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn binary(
        &mut self,
        ops: &[&'static str],
        next: fn(&mut Self) -> Result<i64, String>,
        apply: fn(&'static str, i64, i64) -> Result<i64, String>,
    ) -> Result<i64, String> {
        let mut left = next(self)?;
        while let Some(op) = self.peek_op().filter(|op| ops.contains(op)) {
            self.pos += 1;
            let right = next(self)?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<i64, String> {
        self.binary(&["||"], Self::and, |_, l, r| Ok(i64::from(l != 0 || r != 0)))
    }

    fn and(&mut self) -> Result<i64, String> {
        self.binary(&["&&"], Self::equality, |_, l, r| {
            Ok(i64::from(l != 0 && r != 0))
        })
    }

    fn equality(&mut self) -> Result<i64, String> {
        self.binary(&["==", "!="], Self::relational, |op, l, r| {
            Ok(i64::from(if op == "==" { l == r } else { l != r }))
        })
    }

    fn relational(&mut self) -> Result<i64, String> {
        self.binary(&["<", ">", "<=", ">="], Self::shift, |op, l, r| {
            Ok(i64::from(match op {
                "<" => l < r,
                ">" => l > r,
                "<=" => l <= r,
                _ => l >= r,
            }))
        })
    }

    fn shift(&mut self) -> Result<i64, String> {
        self.binary(&["<<", ">>"], Self::additive, |op, l, r| {
            let amount = u32::try_from(r).map_err(|_| "negative shift in #if".to_string())?;
            Ok(if op == "<<" {
                l.checked_shl(amount).unwrap_or(0)
            } else {
                l.checked_shr(amount).unwrap_or(0)
            })
        })
    }

    fn additive(&mut self) -> Result<i64, String> {
        self.binary(&["+", "-"], Self::multiplicative, |op, l, r| {
            Ok(if op == "+" {
                l.wrapping_add(r)
            } else {
                l.wrapping_sub(r)
            })
        })
    }

    fn multiplicative(&mut self) -> Result<i64, String> {
        self.binary(&["*", "/", "%"], Self::unary, |op, l, r| match op {
            "*" => Ok(l.wrapping_mul(r)),
            _ if r == 0 => Err("division by zero in #if".to_string()),
            "/" => Ok(l.wrapping_div(r)),
            _ => Ok(l.wrapping_rem(r)),
        })
    }

    fn unary(&mut self) -> Result<i64, String> {
        if self.eat("!") {
            return Ok(i64::from(self.unary()? == 0));
        }
        if self.eat("-") {
            return Ok(self.unary()?.wrapping_neg());
        }
        if self.eat("+") {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<i64, String> {
        match self.tokens.get(self.pos).cloned() {
            Some(Tok::Num(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Tok::Op("(")) => {
                self.pos += 1;
                let value = self.or()?;
                if !self.eat(")") {
                    return Err("missing ')' in #if".to_string());
                }
                Ok(value)
            }
            Some(Tok::Op(op)) => Err(format!("unexpected '{op}' in #if")),
            None => Err("unexpected end of #if expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn macros(entries: &[(&str, Option<&str>)]) -> HashMap<String, Option<String>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_defined_forms() {
        let m = macros(&[("WIN32", Some("1"))]);
        assert_eq!(evaluate("defined(WIN32)", &m), Ok(true));
        assert_eq!(evaluate("defined WIN32 && !defined(LINUX)", &m), Ok(true));
        assert_eq!(evaluate("defined(LINUX) || 0", &m), Ok(false));
    }

    #[test]
    fn test_macro_values_and_arithmetic() {
        let m = macros(&[("VERSION", Some("3")), ("LIMIT", Some("VERSION * 2"))]);
        assert_eq!(evaluate("VERSION >= 2 && LIMIT == 6", &m), Ok(true));
        assert_eq!(evaluate("(1 + 2) * 3 == 9", &m), Ok(true));
        assert_eq!(evaluate("0x10 == 16 && 010 == 8 && 1UL", &m), Ok(true));
        assert_eq!(evaluate("UNKNOWN", &m), Ok(false));
        assert_eq!(evaluate("-1 < 0", &m), Ok(true));
    }

    #[test]
    fn test_errors() {
        let m = HashMap::new();
        assert!(evaluate("", &m).is_err());
        assert!(evaluate("1 / 0", &m).is_err());
        assert!(evaluate("(1", &m).is_err());
        assert!(evaluate("defined()", &m).is_err());
        assert!(evaluate("1 2", &m).is_err());
    }
}
