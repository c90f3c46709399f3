//! The built-in preprocessor and tokenizer driven through the engine.

mod common;

use cfgscan::core::ids;
use cfgscan::engine::EngineBuilder;
use cfgscan::preprocess::DirectivePreprocessor;
use cfgscan::testkit::{write_sources, RecordingSink};
use cfgscan::{assert_diagnostic, assert_no_diagnostic};
use common::quiet_settings;
use indoc::indoc;
use pretty_assertions::assert_eq;

#[test]
fn test_diagnostic_in_included_header_points_at_header() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sources(
        dir.path(),
        &[
            ("inc/div.h", "int bad(int x) {\n  return x / 0;\n}\n"),
            ("src/a.c", "#include \"div.h\"\nint a;\n"),
        ],
    )
    .unwrap();
    let mut settings = quiet_settings();
    settings.include_paths = vec![dir.path().join("inc")];
    let sink = RecordingSink::new();
    let mut engine = EngineBuilder::new(settings)
        .sink(sink.clone())
        .build()
        .unwrap();

    assert_eq!(engine.check(&paths[1]).unwrap(), 1);
    let zerodiv = assert_diagnostic!(sink.errors(), "zerodiv");
    let location = zerodiv.location.expect("located");
    assert_eq!(location.file, paths[0]);
    assert_eq!(location.line, 2);
}

#[test]
fn test_object_macro_substitution_reaches_checks() {
    let source = indoc! {"
        #define ZERO 0
        int f(int x) { return x / ZERO; }
    "};
    let mut engine = EngineBuilder::new(quiet_settings()).build().unwrap();
    assert_eq!(engine.check_content("macro.c", source), 1);
}

#[test]
fn test_function_like_macro_is_not_substituted() {
    let source = indoc! {"
        #define DIV(a) ((a) / 0)
        int f(int x) { return DIV(x); }
    "};
    let mut engine = EngineBuilder::new(quiet_settings()).build().unwrap();
    assert_eq!(engine.check_content("fn_macro.c", source), 0);
}

#[test]
fn test_missing_include_is_skipped() {
    let sink = RecordingSink::new();
    let mut engine = EngineBuilder::new(quiet_settings())
        .sink(sink.clone())
        .build()
        .unwrap();
    let source = "#include \"nope.h\"\nint f(int x) { return x % 0; }\n";

    assert_eq!(engine.check_content("missing.c", source), 1);
    assert_no_diagnostic!(sink.errors(), ids::INTERNAL_ERROR);
}

#[test]
fn test_include_depth_limit_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sources(
        dir.path(),
        &[("b.h", "int b;\n"), ("a.c", "#include \"b.h\"\nint a;\n")],
    )
    .unwrap();
    let sink = RecordingSink::new();
    let mut engine = EngineBuilder::new(quiet_settings())
        .preprocessor(DirectivePreprocessor::new(Vec::new()).with_max_include_depth(1))
        .sink(sink.clone())
        .build()
        .unwrap();

    assert_eq!(engine.check(&paths[1]).unwrap(), 1);
    let internal = assert_diagnostic!(sink.errors(), ids::INTERNAL_ERROR);
    assert!(internal.message.contains("nested too deeply"));
}

#[test]
fn test_header_expanded_repeatedly_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sources(
        dir.path(),
        &[
            ("common.h", "int shared;\n"),
            (
                "a.c",
                indoc! {"
                    #include \"common.h\"
                    #ifdef A
                    int a;
                    #endif
                "},
            ),
        ],
    )
    .unwrap();
    let mut settings = quiet_settings();
    settings.large_headers.repeat_threshold = 2;
    let mut engine = EngineBuilder::new(settings).build().unwrap();

    engine.check(&paths[1]).unwrap();
    assert!(engine.large_headers().contains(&paths[0]));
}

#[test]
fn test_unreadable_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.c");
    let mut engine = EngineBuilder::new(quiet_settings()).build().unwrap();

    let result = engine.check(&missing);
    cfgscan::assert_contains_error!(result, "unable to read");
    assert!(engine.errors().is_empty());
}
