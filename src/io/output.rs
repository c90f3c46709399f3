//! Diagnostic sinks used by the binary: coloured text and JSON lines.

use crate::core::{Diagnostic, Severity};
use crate::engine::DiagnosticSink;
use clap::ValueEnum;
use colored::*;
use serde_json::json;
use std::env;
use std::io::{IsTerminal, Write};
use tracing::warn;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// `NO_COLOR` and `CLICOLOR=0` turn `Auto` off; `Auto` otherwise follows
    /// whether stdout is a terminal.
    pub fn should_use_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                env::var_os("NO_COLOR").is_none()
                    && env::var("CLICOLOR").map_or(true, |v| v != "0")
                    && std::io::stdout().is_terminal()
            }
        }
    }
}

/// One line per diagnostic: `file:line: (severity) message [id]`.
pub fn format_diagnostic(diagnostic: &Diagnostic, color: bool) -> String {
    let location = diagnostic
        .location
        .as_ref()
        .map_or_else(|| "cfgscan".to_string(), ToString::to_string);
    let severity = format!("({})", diagnostic.severity);
    let severity = if color {
        match diagnostic.severity {
            Severity::Error => severity.red().bold().to_string(),
            Severity::Warning => severity.yellow().to_string(),
            Severity::Style | Severity::Performance | Severity::Portability => {
                severity.cyan().to_string()
            }
            Severity::Information | Severity::Debug => severity.dimmed().to_string(),
        }
    } else {
        severity
    };

    let mut line = format!(
        "{location}: {severity} {} [{}]",
        diagnostic.message, diagnostic.id
    );
    if let Some(code) = &diagnostic.reproducer {
        line.push_str("\n  reproducer:");
        for code_line in code.lines() {
            line.push_str("\n    ");
            line.push_str(code_line);
        }
    }
    line
}

/// Human-readable sink. Diagnostics go to `out`, progress lines to `progress`.
pub struct TextSink<W: Write + Send, P: Write + Send> {
    out: W,
    progress: P,
    color: bool,
}

impl<W: Write + Send, P: Write + Send> TextSink<W, P> {
    pub fn new(out: W, progress: P, color: bool) -> Self {
        Self {
            out,
            progress,
            color,
        }
    }

    fn write_out(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!("Failed to write diagnostic: {}", e);
        }
    }
}

impl<W: Write + Send, P: Write + Send> DiagnosticSink for TextSink<W, P> {
    fn report_err(&mut self, diagnostic: &Diagnostic) {
        let line = format_diagnostic(diagnostic, self.color);
        self.write_out(&line);
    }

    fn report_out(&mut self, message: &str) {
        if let Err(e) = writeln!(self.progress, "{message}") {
            warn!("Failed to write progress: {}", e);
        }
    }

    fn report_info(&mut self, diagnostic: &Diagnostic) {
        let line = format_diagnostic(diagnostic, self.color);
        self.write_out(&line);
    }

    fn report_status(
        &mut self,
        file_index: usize,
        file_count: usize,
        size_done: u64,
        size_total: u64,
    ) {
        let percent = if size_total == 0 {
            100
        } else {
            size_done * 100 / size_total
        };
        self.report_out(&format!(
            "{file_index}/{file_count} files checked {percent}% done"
        ));
    }

    fn catalog_begin(&mut self) {
        let header = if self.color {
            "Checks:".bold().to_string()
        } else {
            "Checks:".to_string()
        };
        self.write_out(&header);
    }

    fn catalog_end(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Failed to flush output: {}", e);
        }
    }
}

/// JSON-lines sink. Every record is one object with a `type` field; the
/// catalog is buffered and written as a single `{"type":"catalog"}` object.
pub struct JsonSink<W: Write + Send> {
    out: W,
    catalog: Option<Vec<Diagnostic>>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, catalog: None }
    }

    fn write_value(&mut self, value: serde_json::Value) {
        if let Err(e) = writeln!(self.out, "{value}") {
            warn!("Failed to write JSON record: {}", e);
        }
    }

    fn write_diagnostic(&mut self, kind: &str, diagnostic: &Diagnostic) {
        if let Some(entries) = self.catalog.as_mut() {
            entries.push(diagnostic.clone());
            return;
        }
        match serde_json::to_value(diagnostic) {
            Ok(mut value) => {
                if let Some(object) = value.as_object_mut() {
                    object.insert("type".to_string(), json!(kind));
                }
                self.write_value(value);
            }
            Err(e) => warn!("Failed to serialize diagnostic: {}", e),
        }
    }
}

impl<W: Write + Send> DiagnosticSink for JsonSink<W> {
    fn report_err(&mut self, diagnostic: &Diagnostic) {
        self.write_diagnostic("error", diagnostic);
    }

    fn report_out(&mut self, message: &str) {
        self.write_value(json!({ "type": "progress", "message": message }));
    }

    fn report_info(&mut self, diagnostic: &Diagnostic) {
        self.write_diagnostic("info", diagnostic);
    }

    fn report_status(
        &mut self,
        file_index: usize,
        file_count: usize,
        size_done: u64,
        size_total: u64,
    ) {
        self.write_value(json!({
            "type": "status",
            "file_index": file_index,
            "file_count": file_count,
            "size_done": size_done,
            "size_total": size_total,
        }));
    }

    fn catalog_begin(&mut self) {
        self.catalog = Some(Vec::new());
    }

    fn catalog_end(&mut self) {
        let entries = self.catalog.take().unwrap_or_default();
        self.write_value(json!({ "type": "catalog", "checks": entries }));
    }
}
