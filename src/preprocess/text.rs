//! Line-preserving text passes shared by configuration discovery and expansion.

use std::collections::{HashMap, HashSet};

const MAX_SUBSTITUTION_DEPTH: usize = 16;

/// Replace comments with whitespace. Newlines inside block comments are kept
/// so that line numbers do not move.
pub(crate) fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q || c == '\n' {
                quote = None;
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                out.push(' ');
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            ('"' | '\'', _) => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Join backslash-continued lines, padding with empty lines afterwards so the
/// total line count is unchanged.
pub(crate) fn splice_continuations(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut pending = 0usize;
    for line in source.split_inclusive('\n') {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let body = body.strip_suffix('\r').unwrap_or(body);
        match body.strip_suffix('\\') {
            Some(joined) => {
                out.push_str(joined);
                pending += 1;
            }
            None => {
                out.push_str(body);
                if line.ends_with('\n') {
                    out.push('\n');
                }
                for _ in 0..pending {
                    out.push('\n');
                }
                pending = 0;
            }
        }
    }
    for _ in 0..pending {
        out.push('\n');
    }
    out
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Identifiers appearing in `text`, outside string and character literals.
pub(crate) fn identifiers(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let bytes: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;
    while i < bytes.len() {
        let (start, c) = bytes[i];
        if c == '"' || c == '\'' {
            i = skip_literal(&bytes, i);
        } else if is_ident_start(c) {
            let mut j = i + 1;
            while j < bytes.len() && is_ident_char(bytes[j].1) {
                j += 1;
            }
            let end = bytes.get(j).map_or(text.len(), |(idx, _)| *idx);
            found.push(&text[start..end]);
            i = j;
        } else if c.is_ascii_digit() {
            i += 1;
            while i < bytes.len() && is_ident_char(bytes[i].1) {
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    found
}

fn skip_literal(chars: &[(usize, char)], open: usize) -> usize {
    let quote = chars[open].1;
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i].1 {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            '\n' => return i,
            _ => i += 1,
        }
    }
    i
}

/// Replace object-like macros in one line of active code.
///
/// `macros` maps a name to its replacement; names mapped to `None` are
/// function-like and left untouched.
pub(crate) fn substitute(line: &str, macros: &HashMap<String, Option<String>>) -> String {
    if macros.is_empty() {
        return line.to_string();
    }
    let mut hidden = HashSet::new();
    substitute_inner(line, macros, &mut hidden, 0)
}

fn substitute_inner<'a>(
    line: &str,
    macros: &'a HashMap<String, Option<String>>,
    hidden: &mut HashSet<&'a str>,
    depth: usize,
) -> String {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        let (start, c) = chars[i];
        if c == '"' || c == '\'' {
            let end_idx = skip_literal(&chars, i);
            let end = chars.get(end_idx).map_or(line.len(), |(idx, _)| *idx);
            out.push_str(&line[start..end]);
            i = end_idx;
        } else if is_ident_start(c) {
            let mut j = i + 1;
            while j < chars.len() && is_ident_char(chars[j].1) {
                j += 1;
            }
            let end = chars.get(j).map_or(line.len(), |(idx, _)| *idx);
            let name = &line[start..end];
            match macros.get_key_value(name) {
                Some((key, Some(value)))
                    if depth < MAX_SUBSTITUTION_DEPTH && !hidden.contains(key.as_str()) =>
                {
                    hidden.insert(key.as_str());
                    out.push_str(&substitute_inner(value, macros, hidden, depth + 1));
                    hidden.remove(key.as_str());
                }
                _ => out.push_str(name),
            }
            i = j;
        } else if c.is_ascii_digit() {
            let mut j = i + 1;
            while j < chars.len() && is_ident_char(chars[j].1) {
                j += 1;
            }
            let end = chars.get(j).map_or(line.len(), |(idx, _)| *idx);
            out.push_str(&line[start..end]);
            i = j;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_strip_comments_keeps_lines() {
        let source = indoc! {r#"
            int a; // trailing
            /* block
               spanning */ int b;
            char *s = "// not a comment";
        "#};
        let stripped = strip_comments(source);
        assert_eq!(stripped.lines().count(), source.lines().count());
        assert!(stripped.starts_with("int a; \n"));
        assert!(!stripped.contains("trailing"));
        assert!(!stripped.contains("spanning"));
        assert!(stripped.contains("int b;"));
        assert!(stripped.contains("\"// not a comment\""));
    }

    #[test]
    fn test_splice_continuations_pads_lines() {
        let source = "#define A 1 + \\\n  2\nint x;\n";
        let spliced = splice_continuations(source);
        assert_eq!(spliced, "#define A 1 +   2\n\nint x;\n");
    }

    #[test]
    fn test_identifiers_skip_literals_and_numbers() {
        assert_eq!(
            identifiers(r#"foo(1u, "bar", 'c') + _baz2"#),
            vec!["foo", "_baz2"]
        );
    }

    #[test]
    fn test_substitute_object_like() {
        let macros: HashMap<String, Option<String>> = [
            ("SIZE".to_string(), Some("(N * 2)".to_string())),
            ("N".to_string(), Some("4".to_string())),
            ("F".to_string(), None),
            ("SELF".to_string(), Some("SELF + 1".to_string())),
        ]
        .into_iter()
        .collect();
        assert_eq!(substitute("int a[SIZE];", &macros), "int a[(4 * 2)];");
        assert_eq!(substitute("F(SIZE)", &macros), "F((4 * 2))");
        assert_eq!(substitute("\"SIZE\"", &macros), "\"SIZE\"");
        assert_eq!(substitute("SELF", &macros), "SELF + 1");
    }
}
