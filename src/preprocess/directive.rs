//! Built-in preprocessor understanding conditionals, object-like macros and
//! `#include`.

use super::expr::evaluate;
use super::text::{identifiers, splice_continuations, strip_comments, substitute};
use super::{
    configuration_defines, Expansion, HeaderExpansion, Preprocessor, END_FILE_MARKER, FILE_MARKER,
};
use crate::errors::PreprocessError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct DirectivePreprocessor {
    include_paths: Vec<PathBuf>,
    max_include_depth: usize,
}

impl Default for DirectivePreprocessor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// One preprocessor directive line: `# name rest`.
struct Directive<'a> {
    name: &'a str,
    rest: &'a str,
}

fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let body = line.trim_start().strip_prefix('#')?.trim_start();
    let end = body
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(body.len());
    Some(Directive {
        name: &body[..end],
        rest: body[end..].trim(),
    })
}

fn first_word(text: &str) -> &str {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .unwrap_or("")
}

#[derive(Debug, Clone, Copy)]
struct Conditional {
    /// Whether the enclosing region is active
    parent_active: bool,
    /// Whether some branch of this conditional has already been taken
    taken: bool,
    active: bool,
    line: usize,
}

/// Mutable state of one configuration's expansion.
struct ExpandState<'a> {
    configuration: &'a str,
    macros: HashMap<String, Option<String>>,
    output: String,
    headers: Vec<HeaderExpansion>,
    include_stack: Vec<PathBuf>,
}

impl DirectivePreprocessor {
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        Self {
            include_paths,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    fn prepare(source: &str) -> String {
        splice_continuations(&strip_comments(source))
    }

    fn resolve_include(&self, including: &Path, spec: &str) -> Option<PathBuf> {
        let (name, quoted) = if let Some(inner) = spec.strip_prefix('"') {
            (inner.split('"').next()?, true)
        } else if let Some(inner) = spec.strip_prefix('<') {
            (inner.split('>').next()?, false)
        } else {
            return None;
        };
        let local = quoted
            .then(|| including.parent().map(|dir| dir.join(name)))
            .flatten();
        local
            .into_iter()
            .chain(self.include_paths.iter().map(|dir| dir.join(name)))
            .find(|candidate| candidate.is_file())
    }

    fn expand_file(
        &self,
        path: &Path,
        source: &str,
        state: &mut ExpandState<'_>,
    ) -> Result<(), PreprocessError> {
        let prepared = Self::prepare(source);
        let mut stack: Vec<Conditional> = Vec::new();

        for (idx, line) in prepared.lines().enumerate() {
            let line_no = idx + 1;
            let active = stack.last().map_or(true, |c| c.active);
            let Some(directive) = parse_directive(line) else {
                if active {
                    state.output.push_str(&substitute(line, &state.macros));
                }
                state.output.push('\n');
                continue;
            };

            match directive.name {
                "ifdef" | "ifndef" => {
                    let name = first_word(directive.rest);
                    if name.is_empty() {
                        return Err(PreprocessError::directive(
                            path,
                            line_no,
                            format!("#{} without a macro name", directive.name),
                        ));
                    }
                    let defined = state.macros.contains_key(name);
                    let holds = if directive.name == "ifdef" {
                        defined
                    } else {
                        !defined
                    };
                    stack.push(Conditional {
                        parent_active: active,
                        taken: active && holds,
                        active: active && holds,
                        line: line_no,
                    });
                }
                "if" => {
                    let holds = active && self.condition(path, line_no, directive.rest, state)?;
                    stack.push(Conditional {
                        parent_active: active,
                        taken: holds,
                        active: holds,
                        line: line_no,
                    });
                }
                "elif" | "else" => {
                    let Some(top) = stack.last().copied() else {
                        return Err(PreprocessError::directive(
                            path,
                            line_no,
                            format!("#{} without #if", directive.name),
                        ));
                    };
                    let eligible = top.parent_active && !top.taken;
                    let holds = if directive.name == "else" {
                        eligible
                    } else {
                        eligible && self.condition(path, line_no, directive.rest, state)?
                    };
                    if let Some(current) = stack.last_mut() {
                        current.active = holds;
                        current.taken |= holds;
                    }
                }
                "endif" => {
                    if stack.pop().is_none() {
                        return Err(PreprocessError::directive(
                            path,
                            line_no,
                            "#endif without #if",
                        ));
                    }
                }
                _ if !active => {}
                "define" => {
                    let name = first_word(directive.rest);
                    let after = &directive.rest[name.len()..];
                    let value = if after.starts_with('(') {
                        None
                    } else {
                        Some(after.trim().to_string())
                    };
                    state.macros.insert(name.to_string(), value);
                }
                "undef" => {
                    state.macros.remove(first_word(directive.rest));
                }
                "include" => {
                    self.include(path, line_no, directive.rest, state)?;
                    continue;
                }
                "error" => {
                    return Err(PreprocessError::unresolvable(
                        state.configuration,
                        format!("#error {}", directive.rest),
                    ));
                }
                // #pragma, #line, #warning and unknown directives
                _ => {}
            }
            state.output.push('\n');
        }

        match stack.last() {
            Some(open) => Err(PreprocessError::directive(
                path,
                open.line,
                "unterminated conditional directive",
            )),
            None => Ok(()),
        }
    }

    fn condition(
        &self,
        path: &Path,
        line: usize,
        expression: &str,
        state: &ExpandState<'_>,
    ) -> Result<bool, PreprocessError> {
        evaluate(expression, &state.macros)
            .map_err(|message| PreprocessError::directive(path, line, message))
    }

    /// Inline an included header between file markers. The closing marker
    /// takes the place of the `#include` line.
    fn include(
        &self,
        path: &Path,
        line: usize,
        spec: &str,
        state: &mut ExpandState<'_>,
    ) -> Result<(), PreprocessError> {
        let spec = substitute(spec, &state.macros);
        let Some(header) = self.resolve_include(path, spec.trim()) else {
            debug!(file = %path.display(), line, include = %spec, "Include not found");
            state.output.push('\n');
            return Ok(());
        };
        if state.include_stack.contains(&header) {
            debug!(header = %header.display(), "Skipping recursive include");
            state.output.push('\n');
            return Ok(());
        }
        if state.include_stack.len() >= self.max_include_depth {
            return Err(PreprocessError::IncludeDepth(header));
        }
        let content = fs::read_to_string(&header).map_err(|err| {
            PreprocessError::directive(path, line, format!("cannot read {}: {err}", header.display()))
        })?;

        state
            .output
            .push_str(&format!("{FILE_MARKER} \"{}\"\n", header.display()));
        let start = state.output.len();
        state.include_stack.push(header.clone());
        let result = self.expand_file(&header, &content, state);
        state.include_stack.pop();
        result?;
        let expanded_size = state.output.len() - start;
        state.output.push_str(END_FILE_MARKER);
        state.output.push('\n');
        state.headers.push(HeaderExpansion {
            identity: header,
            expanded_size,
        });
        Ok(())
    }
}

impl Preprocessor for DirectivePreprocessor {
    /// The default configuration followed by every distinct nested macro set
    /// guarding a conditional block, in order of first appearance.
    fn configurations(
        &self,
        path: &Path,
        source: &str,
    ) -> Result<Vec<String>, PreprocessError> {
        let prepared = Self::prepare(source);
        let lines: Vec<&str> = prepared.lines().collect();
        let mut configurations = vec![String::new()];
        let mut frames: Vec<Vec<String>> = Vec::new();
        let mut defined_here: Vec<String> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let Some(directive) = parse_directive(line) else {
                continue;
            };
            let names = match directive.name {
                "ifdef" => vec![first_word(directive.rest).to_string()],
                "ifndef" => {
                    let name = first_word(directive.rest);
                    if is_include_guard(&lines[idx + 1..], name) {
                        Vec::new()
                    } else {
                        vec![name.to_string()]
                    }
                }
                "if" | "elif" => identifiers(directive.rest)
                    .into_iter()
                    .filter(|id| *id != "defined")
                    .map(str::to_string)
                    .collect(),
                "else" => continue,
                "endif" => {
                    if frames.pop().is_none() {
                        return Err(PreprocessError::directive(
                            path,
                            idx + 1,
                            "#endif without #if",
                        ));
                    }
                    continue;
                }
                "define" => {
                    defined_here.push(first_word(directive.rest).to_string());
                    continue;
                }
                _ => continue,
            };
            let names: Vec<String> = names
                .into_iter()
                .filter(|n| !n.is_empty() && !defined_here.contains(n))
                .collect();

            if directive.name == "elif" {
                match frames.last_mut() {
                    Some(top) => *top = names,
                    None => {
                        return Err(PreprocessError::directive(
                            path,
                            idx + 1,
                            "#elif without #if",
                        ))
                    }
                }
            } else {
                frames.push(names);
            }

            let mut combined: Vec<&str> = Vec::new();
            for name in frames.iter().flatten() {
                if !combined.contains(&name.as_str()) {
                    combined.push(name);
                }
            }
            let configuration = combined.join(";");
            if !configuration.is_empty() && !configurations.contains(&configuration) {
                configurations.push(configuration);
            }
        }
        Ok(configurations)
    }

    fn expand(
        &self,
        path: &Path,
        source: &str,
        configuration: &str,
    ) -> Result<Expansion, PreprocessError> {
        let mut state = ExpandState {
            configuration,
            macros: configuration_defines(configuration)
                .into_iter()
                .map(|(name, value)| (name, Some(value)))
                .collect(),
            output: String::with_capacity(source.len()),
            headers: Vec::new(),
            include_stack: vec![path.to_path_buf()],
        };
        self.expand_file(path, source, &mut state)?;
        Ok(Expansion {
            text: state.output,
            headers: state.headers,
        })
    }
}

/// `#ifndef X` immediately followed by `#define X`.
fn is_include_guard(following: &[&str], name: &str) -> bool {
    following
        .iter()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| parse_directive(line))
        .is_some_and(|next| next.name == "define" && first_word(next.rest) == name)
}
