//! The per-file configuration loop.
//!
//! For each configuration: expand, deduplicate by checksum, apply the
//! ceiling, tokenize, then run every check through the isolation boundary on
//! the normal and (optionally) simplified token lists. Cancellation is polled
//! before each configuration and before each check invocation; when it trips
//! the loop returns with whatever has already been reported.

use super::aggregator::ErrorAggregator;
use super::cancel::CancellationToken;
use super::checksum::checksum;
use super::isolation::{isolate, run_check, Crash, CrashClass, Stage, PREPROCESSOR, TOKENIZER};
use super::large_headers::LargeHeaderTracker;
use super::reducer::{reduce, ReducerConfig};
use super::rules::RuleSet;
use super::unit::AnalysisUnit;
use super::whole_program::{FileInfo, FileInfoStore};
use crate::check::{Check, CheckRegistry};
use crate::config::Settings;
use crate::core::{ids, Diagnostic, TokenList, TokenListKind};
use crate::observability::{set_configuration, set_current_file, set_phase, AnalysisPhase};
use crate::preprocess::{Expansion, Preprocessor};
use crate::tokenize::Tokenizer;
use std::convert::Infallible;
use std::path::Path;
use tracing::{debug, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Full diagnostics: `run` hooks on both lists plus pattern rules
    Check,
    /// `analyze` hooks on the normal list only
    Analyze,
}

/// Borrowed view of the engine for one entry-point call.
pub(crate) struct Driver<'e> {
    pub settings: &'e Settings,
    pub preprocessor: &'e dyn Preprocessor,
    pub tokenizer: &'e dyn Tokenizer,
    pub checks: &'e CheckRegistry,
    pub rules: &'e RuleSet,
    pub errors: &'e mut ErrorAggregator,
    pub file_infos: &'e mut FileInfoStore,
    pub large_headers: &'e mut LargeHeaderTracker,
    pub cancel: &'e CancellationToken,
    pub mode: Mode,
}

impl Driver<'_> {
    pub fn run(&mut self, unit: &mut AnalysisUnit) {
        let _file = set_current_file(&unit.path);
        let _span = info_span!("analyze_file", file = %unit.path.display(), mode = ?self.mode)
            .entered();

        if self.cancel.is_cancelled() {
            debug!("Cancellation requested before start");
            return;
        }

        let configurations = match &self.settings.user_defines {
            Some(defines) => vec![defines.clone()],
            None => {
                let _phase = set_phase(AnalysisPhase::Preprocessing);
                let preprocessor = self.preprocessor;
                let found = isolate(PREPROCESSOR, Stage::Configurations, || {
                    preprocessor.configurations(&unit.path, &unit.source)
                });
                match found {
                    Ok(configurations) => configurations,
                    Err(crash) => {
                        self.internal_error(unit, "", crash, None);
                        return;
                    }
                }
            }
        };
        debug!(count = configurations.len(), "Configurations enumerated");

        for configuration in &configurations {
            if self.cancel.is_cancelled() {
                debug!(configuration, "Cancellation requested, stopping");
                break;
            }
            if unit.too_many_configs {
                break;
            }
            self.process_configuration(unit, configuration, configurations.len());
        }
    }

    fn process_configuration(&mut self, unit: &mut AnalysisUnit, configuration: &str, total: usize) {
        let _cfg = set_configuration(configuration);

        let Some(expansion) = self.expand(unit, configuration) else {
            return;
        };
        for header in &expansion.headers {
            self.large_headers
                .note_header(&header.identity, header.expanded_size);
        }

        let sum = checksum(&expansion.text);
        if unit.checksums.seen(sum) {
            debug!(configuration, "Expansion already analysed, skipping");
            return;
        }
        if let Some(limit) = self.settings.ceiling() {
            if unit.config_count >= limit {
                unit.too_many_configs = true;
                debug!(limit, total, "Configuration ceiling reached");
                self.errors.report(
                    Diagnostic::info(
                        ids::TOO_MANY_CONFIGS,
                        format!(
                            "Too many #ifdef configurations - only {limit} of {total} configurations are checked. Use --force to check all configurations."
                        ),
                    )
                    .with_configuration(configuration),
                );
                return;
            }
        }
        unit.checksums.record(sum);
        unit.config_count += 1;

        if !self.settings.quiet {
            let path = unit.path.display();
            self.errors.progress(if unit.config_count == 1 {
                format!("Checking {path} ...")
            } else {
                format!("Checking {path}: {configuration}...")
            });
        }

        let code = expansion.text.as_str();
        let normal = {
            let _phase = set_phase(AnalysisPhase::Tokenizing);
            let tokenizer = self.tokenizer;
            match isolate(TOKENIZER, Stage::Tokenize, || {
                tokenizer.tokenize(&unit.path, code, configuration)
            }) {
                Ok(tokens) => tokens,
                Err(crash) => {
                    self.internal_error(unit, configuration, crash, Some(code));
                    return;
                }
            }
        };
        debug!(configuration, tokens = normal.len(), "Tokenized");

        if !self.run_checks(unit, &normal, code) {
            return;
        }
        if self.settings.whole_program && !self.collect_file_info(unit, &normal, code) {
            return;
        }
        if self.mode == Mode::Analyze {
            return;
        }
        self.execute_rules(unit, &normal);

        if !self.settings.simplify || self.cancel.is_cancelled() {
            return;
        }
        let simplified = {
            let _phase = set_phase(AnalysisPhase::Simplifying);
            let tokenizer = self.tokenizer;
            match isolate(TOKENIZER, Stage::Simplify, || tokenizer.simplify(&normal)) {
                Ok(tokens) => tokens,
                Err(crash) => {
                    self.internal_error(unit, configuration, crash, Some(code));
                    return;
                }
            }
        };
        if self.run_checks(unit, &simplified, code) {
            self.execute_rules(unit, &simplified);
        }
    }

    /// `None` when the configuration was purged or the preprocessor failed.
    fn expand(&mut self, unit: &mut AnalysisUnit, configuration: &str) -> Option<Expansion> {
        let _phase = set_phase(AnalysisPhase::Preprocessing);
        let preprocessor = self.preprocessor;
        let outcome = isolate(PREPROCESSOR, Stage::Expand, || {
            Ok::<_, Infallible>(preprocessor.expand(&unit.path, &unit.source, configuration))
        });
        match outcome {
            Ok(Ok(expansion)) => Some(expansion),
            Ok(Err(err)) if err.is_unresolvable() => {
                debug!(configuration, %err, "Configuration purged");
                self.errors.report(
                    Diagnostic::info(
                        ids::PURGED_CONFIGURATION,
                        format!("Skipping {}: {err}", unit.path.display()),
                    )
                    .with_configuration(configuration),
                );
                None
            }
            Ok(Err(err)) => {
                let crash = Crash::failure(PREPROCESSOR, Stage::Expand, err);
                self.internal_error(unit, configuration, crash, None);
                None
            }
            Err(crash) => {
                self.internal_error(unit, configuration, crash, None);
                None
            }
        }
    }

    /// Run every applicable check on `tokens`. Returns false on cancellation.
    fn run_checks(&mut self, unit: &mut AnalysisUnit, tokens: &TokenList, code: &str) -> bool {
        let _phase = set_phase(AnalysisPhase::RunningChecks);
        let checks = self.checks;
        for check in checks.iter() {
            if self.cancel.is_cancelled() {
                debug!(check = check.name(), "Cancellation requested before check");
                return false;
            }
            if !check.runs_on(tokens.kind) {
                continue;
            }
            let outcome = match self.mode {
                Mode::Check => run_check(check.as_ref(), tokens),
                Mode::Analyze => isolate(check.name(), Stage::Analyze, || check.analyze(tokens)),
            };
            match outcome {
                Ok(diagnostics) => {
                    for diagnostic in diagnostics {
                        self.record(unit, diagnostic.stamp_configuration(&tokens.configuration));
                    }
                }
                Err(crash) => self.internal_error(unit, &tokens.configuration, crash, Some(code)),
            }
        }
        true
    }

    /// Hand each whole-program check's artifact to the store. Returns false
    /// on cancellation.
    fn collect_file_info(&mut self, unit: &mut AnalysisUnit, tokens: &TokenList, code: &str) -> bool {
        let checks = self.checks;
        for check in checks.iter().filter(|c| c.supports_whole_program()) {
            if self.cancel.is_cancelled() {
                return false;
            }
            match isolate(check.name(), Stage::FileInfo, || check.file_info(tokens)) {
                Ok(Some(payload)) => self.file_infos.push(FileInfo::new(
                    check.name(),
                    unit.path.clone(),
                    tokens.configuration.clone(),
                    payload,
                )),
                Ok(None) => {}
                Err(crash) => self.internal_error(unit, &tokens.configuration, crash, Some(code)),
            }
        }
        true
    }

    fn execute_rules(&mut self, unit: &mut AnalysisUnit, tokens: &TokenList) {
        if self.rules.is_empty() {
            return;
        }
        let _phase = set_phase(AnalysisPhase::ExecutingRules);
        for diagnostic in self.rules.execute(tokens, tokens.kind) {
            self.record(unit, diagnostic);
        }
    }

    fn record(&mut self, unit: &mut AnalysisUnit, diagnostic: Diagnostic) {
        if self.errors.report(diagnostic) {
            unit.error_count += 1;
        }
    }

    /// Report a crash for one configuration, attaching a reduced reproducer
    /// when enabled and the failing input is known.
    fn internal_error(
        &mut self,
        unit: &mut AnalysisUnit,
        configuration: &str,
        crash: Crash,
        code: Option<&str>,
    ) {
        unit.internal_error_found = true;
        warn!(
            file = %unit.path.display(),
            configuration,
            %crash,
            "Internal error"
        );

        let scope = if configuration.is_empty() {
            String::new()
        } else {
            format!(" [{configuration}]")
        };
        let mut diagnostic = Diagnostic::internal(format!(
            "Internal error while checking {}{scope}: {crash}",
            unit.path.display()
        ))
        .with_configuration(configuration);

        if let Some(code) = code.filter(|_| self.settings.reducer.enabled && crash.is_reducible()) {
            let _phase = set_phase(AnalysisPhase::Reducing);
            let target = crash.class();
            let config = ReducerConfig {
                max_steps: self.settings.reducer.max_steps,
            };
            let reduction = reduce(code, config, Some(self.cancel), |candidate| {
                self.reproduces(&target, &unit.path, configuration, candidate)
            });
            debug!(
                steps = reduction.steps,
                shrunk = reduction.shrunk,
                size = reduction.code.len(),
                "Reduction finished"
            );
            diagnostic = diagnostic.with_reproducer(reduction.code);
        }

        self.record(unit, diagnostic);
    }

    /// Whether `candidate` still fails with the same crash class.
    fn reproduces(&self, target: &CrashClass, path: &Path, configuration: &str, candidate: &str) -> bool {
        matches!(self.replay(target, path, configuration, candidate), Err(crash) if crash.class() == *target)
    }

    /// Re-run the pipeline on `candidate` up to the stage that failed.
    fn replay(
        &self,
        target: &CrashClass,
        path: &Path,
        configuration: &str,
        candidate: &str,
    ) -> Result<(), Crash> {
        let tokenizer = self.tokenizer;
        let normal = isolate(TOKENIZER, Stage::Tokenize, || {
            tokenizer.tokenize(path, candidate, configuration)
        })?;
        if target.stage == Stage::Tokenize {
            return Ok(());
        }

        let needs_simplified = matches!(
            target.stage,
            Stage::Simplify | Stage::Run(TokenListKind::Simplified)
        );
        let tokens = if needs_simplified {
            isolate(TOKENIZER, Stage::Simplify, || tokenizer.simplify(&normal))?
        } else {
            normal
        };
        if target.stage == Stage::Simplify {
            return Ok(());
        }

        let Some(check) = self.checks.iter().find(|c| c.name() == target.origin) else {
            return Ok(());
        };
        replay_hook(check.as_ref(), target.stage, &tokens)
    }
}

fn replay_hook(check: &dyn Check, stage: Stage, tokens: &TokenList) -> Result<(), Crash> {
    match stage {
        Stage::Run(_) => run_check(check, tokens).map(drop),
        Stage::Analyze => isolate(check.name(), stage, || check.analyze(tokens)).map(drop),
        Stage::FileInfo => isolate(check.name(), stage, || check.file_info(tokens)).map(drop),
        _ => Ok(()),
    }
}
