// Shared fixtures for cfgscan integration tests
#![allow(dead_code)]

use cfgscan::check::CheckRegistry;
use cfgscan::config::Settings;
use cfgscan::core::{Diagnostic, DiagnosticKind};
use cfgscan::engine::{Engine, EngineBuilder};
use cfgscan::preprocess::Preprocessor;
use cfgscan::testkit::{RecordingSink, StubCheck};

/// Settings without progress lines.
pub fn quiet_settings() -> Settings {
    Settings {
        quiet: true,
        ..Settings::default()
    }
}

pub fn registry(checks: Vec<StubCheck>) -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    for check in checks {
        registry.register(check);
    }
    registry
}

/// Engine over a scripted preprocessor, the given stubs and a recording sink.
pub fn stub_engine(
    settings: Settings,
    preprocessor: impl Preprocessor + 'static,
    checks: Vec<StubCheck>,
    sink: &RecordingSink,
) -> Engine {
    EngineBuilder::new(settings)
        .preprocessor(preprocessor)
        .checks(registry(checks))
        .sink(sink.clone())
        .build()
        .expect("engine should build")
}

pub fn of_kind(records: &[Diagnostic], kind: DiagnosticKind) -> Vec<Diagnostic> {
    records.iter().filter(|d| d.kind == kind).cloned().collect()
}

pub fn configurations_of(records: &[Diagnostic]) -> Vec<String> {
    records
        .iter()
        .map(|d| d.configuration.clone().unwrap_or_default())
        .collect()
}
