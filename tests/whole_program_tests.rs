//! Whole-program pass: single firing, artifact release and batch merging.

mod common;

use cfgscan::batch::{BatchMode, BatchRunner};
use cfgscan::check::CheckRegistry;
use cfgscan::config::Settings;
use cfgscan::engine::EngineBuilder;
use cfgscan::testkit::{write_sources, RecordingSink, ScriptedPreprocessor, StubCheck};
use cfgscan::{assert_diagnostic, assert_no_diagnostic};
use common::{quiet_settings, registry, stub_engine};
use indoc::indoc;
use pretty_assertions::assert_eq;

#[test]
fn test_pass_runs_once_over_all_files() {
    let stub = StubCheck::new("stub").normal_only().with_file_info();
    let counters = stub.counters();
    let sink = RecordingSink::new();
    let preprocessor = ScriptedPreprocessor::new()
        .configuration("", "int a;\n")
        .configuration("A", "int b;\n");
    let mut engine = stub_engine(quiet_settings(), preprocessor, vec![stub], &sink);

    for file in ["a.c", "b.c", "c.c"] {
        engine.check_content(file, "");
    }
    assert_eq!(counters.whole_program_runs(), 0);
    assert_eq!(engine.pending_file_infos(), 6);

    assert_eq!(engine.analyse_whole_program(), 3);
    assert_eq!(counters.whole_program_runs(), 1);
    assert_eq!(counters.whole_program_artifacts(), 6);
    assert_eq!(engine.pending_file_infos(), 0);

    // Artifacts are gone, so a second call cannot repeat diagnostics.
    assert_eq!(engine.analyse_whole_program(), 0);
    assert_eq!(counters.whole_program_runs(), 1);
}

#[test]
fn test_disabled_pass_collects_nothing() {
    let stub = StubCheck::new("stub").normal_only().with_file_info();
    let counters = stub.counters();
    let sink = RecordingSink::new();
    let mut settings = quiet_settings();
    settings.whole_program = false;
    let preprocessor = ScriptedPreprocessor::new().configuration("", "int a;\n");
    let mut engine = stub_engine(settings, preprocessor, vec![stub], &sink);

    engine.check_content("a.c", "");
    assert!(!engine.unused_function_check_enabled());
    assert_eq!(engine.pending_file_infos(), 0);
    assert_eq!(engine.analyse_whole_program(), 0);
    assert_eq!(counters.file_infos(), 0);
    assert_eq!(counters.whole_program_runs(), 0);
}

#[test]
fn test_analyze_mode_collects_file_info() {
    let stub = StubCheck::new("stub").with_file_info();
    let sink = RecordingSink::new();
    let preprocessor = ScriptedPreprocessor::new().configuration("", "int a;\n");
    let mut engine = stub_engine(quiet_settings(), preprocessor, vec![stub], &sink);

    engine.analyze_content("a.c", "");
    engine.analyze_content("b.c", "");
    assert!(engine.unused_function_check_enabled());
    assert_eq!(engine.analyse_whole_program(), 2);
}

#[test]
fn test_unused_function_across_files() {
    let mut settings = quiet_settings();
    settings.unused_function = true;
    let sink = RecordingSink::new();
    let mut engine = EngineBuilder::new(settings)
        .sink(sink.clone())
        .build()
        .unwrap();

    engine.check_content(
        "lib.c",
        indoc! {"
            int helper(int x) { return x + 1; }
            int orphan(void) { return 0; }
        "},
    );
    engine.check_content(
        "main.c",
        indoc! {"
            int helper(int x);
            int main(void) { return helper(1); }
        "},
    );
    assert!(engine.unused_function_check_enabled());
    assert_eq!(engine.analyse_whole_program(), 1);

    let unused = assert_diagnostic!(sink.errors(), "unusedFunction");
    assert_eq!(unused.message, "The function 'orphan' is never used.");
    assert_eq!(unused.location.as_ref().map(|l| l.line), Some(2));
}

#[test]
fn test_batch_merges_workers_before_single_pass() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_sources(
        dir.path(),
        &[
            ("src/one.c", "int one(void) { return 1; }\n"),
            ("src/two.c", "int one(void);\nint main(void) { return one(); }\n"),
            ("src/three.c", "static int three(void) { return 3; }\n"),
        ],
    )
    .unwrap();
    let sink = RecordingSink::new();
    let settings = Settings {
        jobs: 3,
        quiet: true,
        unused_function: true,
        ..Settings::default()
    };

    let report = BatchRunner::new(settings, sink.clone())
        .run(&files, BatchMode::Check)
        .unwrap();

    assert_eq!(report.files, 3);
    assert_eq!(report.whole_program_errors, 1);
    let unused: Vec<_> = sink
        .errors()
        .into_iter()
        .filter(|d| d.id == "unusedFunction")
        .collect();
    assert_eq!(unused.len(), 1);
    assert!(unused[0].message.contains("'three'"));
}

#[test]
fn test_faulting_whole_program_check_is_isolated() {
    struct Exploding;
    impl cfgscan::check::Check for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }
        fn runs_on(&self, _kind: cfgscan::TokenListKind) -> bool {
            true
        }
        fn run(&self, _tokens: &cfgscan::TokenList) -> cfgscan::check::CheckResult {
            Ok(Vec::new())
        }
        fn file_info(
            &self,
            _tokens: &cfgscan::TokenList,
        ) -> Result<Option<cfgscan::check::Artifact>, cfgscan::errors::CheckError> {
            Ok(Some(Box::new(())))
        }
        fn supports_whole_program(&self) -> bool {
            true
        }
        fn analyse_whole_program(
            &self,
            _infos: &[&cfgscan::engine::FileInfo],
        ) -> cfgscan::check::CheckResult {
            panic!("cross-file index corrupted")
        }
    }

    let healthy = StubCheck::new("healthy").normal_only().with_file_info();
    let mut checks: CheckRegistry = registry(vec![]);
    checks.register(Exploding);
    checks.register(healthy);
    let sink = RecordingSink::new();
    let mut engine = EngineBuilder::new(quiet_settings())
        .preprocessor(ScriptedPreprocessor::new().configuration("", "int a;\n"))
        .checks(checks)
        .sink(sink.clone())
        .build()
        .unwrap();

    engine.check_content("a.c", "");
    engine.analyse_whole_program();

    let internal = assert_diagnostic!(sink.errors(), "internalError");
    assert!(internal.message.contains("exploding"));
    assert_diagnostic!(sink.errors(), "healthy.wholeProgram");
    assert_no_diagnostic!(sink.infos(), "internalError");
}
