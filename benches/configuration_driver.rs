use cfgscan::config::Settings;
use cfgscan::engine::EngineBuilder;
use cfgscan::testkit::{token_source, ScriptedPreprocessor};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn quiet_settings() -> Settings {
    Settings {
        quiet: true,
        force: true,
        ..Settings::default()
    }
}

/// A file whose `#ifdef` blocks multiply into `flags` configurations.
fn ifdef_source(flags: usize) -> String {
    let mut source = String::new();
    for i in 0..flags {
        source.push_str(&format!(
            "#ifdef FLAG_{i}\nint flag_{i}(int x) {{ return x / {}; }}\n#endif\n",
            i + 1
        ));
    }
    source.push_str(&token_source(2_000, 12));
    source
}

fn bench_directive_configurations(c: &mut Criterion) {
    let mut group = c.benchmark_group("directive_configurations");
    for flags in [1, 4, 12] {
        let source = ifdef_source(flags);
        group.bench_with_input(BenchmarkId::from_parameter(flags), &source, |b, source| {
            let mut engine = EngineBuilder::new(quiet_settings())
                .build()
                .expect("engine");
            b.iter(|| black_box(engine.check_content("bench.c", source.as_str())));
        });
    }
    group.finish();
}

fn bench_duplicate_expansions(c: &mut Criterion) {
    let expansion = token_source(5_000, 12);
    let preprocessor = (0..32).fold(ScriptedPreprocessor::new(), |p, i| {
        p.configuration(format!("CFG_{i}"), expansion.clone())
    });
    let mut engine = EngineBuilder::new(quiet_settings())
        .preprocessor(preprocessor)
        .build()
        .expect("engine");

    c.bench_function("duplicate_expansions", |b| {
        b.iter(|| black_box(engine.check_content("dup.c", "")))
    });
}

criterion_group!(benches, bench_directive_configurations, bench_duplicate_expansions);
criterion_main!(benches);
