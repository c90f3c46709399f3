//! Reducer safety, monotonicity and the end-to-end reproducer scenario.

mod common;

use cfgscan::core::{ids, DiagnosticKind};
use cfgscan::engine::checksum::checksum;
use cfgscan::engine::{reduce, ReducerConfig};
use cfgscan::testkit::{token_source, FaultMode, RecordingSink, ScriptedPreprocessor, StubCheck};
use cfgscan::tokenize::{CTokenizer, Tokenizer};
use common::{of_kind, quiet_settings, stub_engine};
use proptest::prelude::*;
use std::path::Path;

fn token_count(code: &str) -> usize {
    CTokenizer::new()
        .tokenize(Path::new("repro.c"), code, "")
        .map(|tokens| tokens.len())
        .unwrap_or(0)
}

proptest! {
    #[test]
    fn prop_reduction_reproduces_and_never_grows(
        words in prop::collection::vec("[a-z]{1,6}", 1..60),
        needle_at in 0usize..60,
        max_steps in 1usize..400,
    ) {
        let mut words = words;
        let at = needle_at % (words.len() + 1);
        words.insert(at, "crash".to_string());
        let code = words.join(" ");
        let reproduce = |candidate: &str| candidate.contains("crash");

        let reduction = reduce(&code, ReducerConfig { max_steps }, None, reproduce);

        prop_assert!(reproduce(&reduction.code));
        prop_assert!(reduction.code.len() <= code.len());
        prop_assert!(reduction.steps <= max_steps);
    }

    #[test]
    fn prop_non_reproducing_input_is_returned_unchanged(code in "[a-z ;\n]{0,80}") {
        let reduction = reduce(&code, ReducerConfig::default(), None, |_| false);
        prop_assert_eq!(&reduction.code, &code);
        prop_assert!(!reduction.shrunk);
    }

    #[test]
    fn prop_checksum_is_deterministic(text in ".{0,200}") {
        prop_assert_eq!(checksum(&text), checksum(&text.clone()));
    }
}

#[test]
fn test_threshold_predicate_reduces_to_boundary() {
    let code = token_source(500, 10);
    let reproduce = |candidate: &str| token_count(candidate) > 100;

    let reduction = reduce(&code, ReducerConfig::default(), None, reproduce);

    assert!(reduction.shrunk);
    assert_eq!(token_count(&reduction.code), 101);
}

#[test]
fn test_engine_attaches_minimized_reproducer() {
    let stub = StubCheck::new("stub")
        .normal_only()
        .faulting_when(FaultMode::Panic, |tokens| tokens.len() > 100);
    let sink = RecordingSink::new();
    let preprocessor = ScriptedPreprocessor::new().configuration("", token_source(500, 10));
    let mut settings = quiet_settings();
    settings.reducer.enabled = true;
    let mut engine = stub_engine(settings, preprocessor, vec![stub], &sink);

    assert_eq!(engine.check_content("big.c", ""), 1);

    let internal = of_kind(engine.errors(), DiagnosticKind::Internal);
    assert_eq!(internal.len(), 1);
    assert_eq!(internal[0].id, ids::INTERNAL_ERROR);
    let reproducer = internal[0]
        .reproducer
        .as_deref()
        .expect("reducer enabled");
    let tokens = token_count(reproducer);
    assert!(tokens <= 101, "reproducer still has {tokens} tokens");
    assert!(tokens > 100, "reproducer no longer faults");
}

#[test]
fn test_reducer_disabled_attaches_nothing() {
    let stub = StubCheck::new("stub")
        .normal_only()
        .faulting_when(FaultMode::Panic, |tokens| tokens.len() > 100);
    let sink = RecordingSink::new();
    let preprocessor = ScriptedPreprocessor::new().configuration("", token_source(500, 10));
    let mut engine = stub_engine(quiet_settings(), preprocessor, vec![stub], &sink);

    engine.check_content("big.c", "");
    let internal = of_kind(engine.errors(), DiagnosticKind::Internal);
    assert_eq!(internal.len(), 1);
    assert!(internal[0].reproducer.is_none());
}
