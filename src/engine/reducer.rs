//! Deterministic reducer for crash-reproducing inputs.
//!
//! Greedy delta-debugging over text: the code is split into units (first
//! lines, then lexemes), spans of units are removed at halving granularity,
//! and a removal is kept only if the caller's `reproduce` predicate still
//! reports the failure. No randomness is used.
//!
//! Guarantees:
//! - the returned code reproduces whenever the input did;
//! - the returned code is never longer than the input;
//! - at most `max_steps` reproduce attempts are made.

use super::cancel::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct ReducerConfig {
    /// Maximum number of `reproduce` calls.
    pub max_steps: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self { max_steps: 2048 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub code: String,
    /// Number of `reproduce` calls made
    pub steps: usize,
    /// False when nothing could be removed (the input is returned unmodified)
    pub shrunk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Lines,
    Lexemes,
}

struct Budget<'a, F> {
    reproduce: F,
    steps: usize,
    max_steps: usize,
    cancel: Option<&'a CancellationToken>,
}

impl<F: Fn(&str) -> bool> Budget<'_, F> {
    fn exhausted(&self) -> bool {
        self.steps >= self.max_steps || self.cancel.is_some_and(|c| c.is_cancelled())
    }

    fn attempt(&mut self, candidate: &str) -> bool {
        self.steps += 1;
        (self.reproduce)(candidate)
    }
}

/// Shrink `code` while `reproduce` keeps returning true.
pub fn reduce(
    code: &str,
    config: ReducerConfig,
    cancel: Option<&CancellationToken>,
    reproduce: impl Fn(&str) -> bool,
) -> Reduction {
    let mut budget = Budget {
        reproduce,
        steps: 0,
        max_steps: config.max_steps,
        cancel,
    };

    if budget.exhausted() || !budget.attempt(code) {
        return Reduction {
            code: code.to_string(),
            steps: budget.steps,
            shrunk: false,
        };
    }

    let mut current = code.to_string();
    for granularity in [Granularity::Lines, Granularity::Lexemes] {
        if budget.exhausted() {
            break;
        }
        current = shrink(&current, granularity, &mut budget);
    }

    Reduction {
        shrunk: current.len() < code.len(),
        code: current,
        steps: budget.steps,
    }
}

fn shrink<F: Fn(&str) -> bool>(
    code: &str,
    granularity: Granularity,
    budget: &mut Budget<'_, F>,
) -> String {
    let mut units = split_units(code, granularity);
    let mut chunk = (units.len() / 2).max(1);

    while !units.is_empty() && !budget.exhausted() {
        let removed = sweep(&mut units, chunk, budget);
        if chunk == 1 {
            if !removed {
                break;
            }
        } else {
            chunk = (chunk / 2).max(1);
        }
    }

    units.concat()
}

/// Try removing every `chunk`-sized span once, left to right.
fn sweep<F: Fn(&str) -> bool>(
    units: &mut Vec<&str>,
    chunk: usize,
    budget: &mut Budget<'_, F>,
) -> bool {
    let mut removed_any = false;
    let mut start = 0;
    while start < units.len() {
        if budget.exhausted() {
            break;
        }
        let end = (start + chunk).min(units.len());
        let candidate: String = units[..start]
            .iter()
            .chain(&units[end..])
            .copied()
            .collect();
        if budget.attempt(&candidate) {
            units.drain(start..end);
            removed_any = true;
        } else {
            start = end;
        }
    }
    removed_any
}

fn split_units(code: &str, granularity: Granularity) -> Vec<&str> {
    match granularity {
        Granularity::Lines => code.split_inclusive('\n').collect(),
        Granularity::Lexemes => split_lexemes(code),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Space,
    Punct,
}

fn class_of(c: char) -> CharClass {
    if c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else if c.is_whitespace() {
        CharClass::Space
    } else {
        CharClass::Punct
    }
}

/// Each unit is one word or punctuation character plus its trailing whitespace.
fn split_lexemes(code: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut prev: Option<CharClass> = None;

    for (idx, c) in code.char_indices() {
        let class = class_of(c);
        let boundary = match (prev, class) {
            (None, _) => false,
            (Some(_), CharClass::Space) => false,
            (Some(CharClass::Word), CharClass::Word) => false,
            _ => true,
        };
        if boundary && idx > start {
            units.push(&code[start..idx]);
            start = idx;
        }
        prev = Some(class);
    }
    if start < code.len() {
        units.push(&code[start..]);
    }
    units
}
