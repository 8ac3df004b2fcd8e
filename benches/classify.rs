use berth::agent::{validate_spec, AgentSpec};
use berth::template::{classify, KeywordTable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_classify(c: &mut Criterion) {
    let description = "Reviews pull requests, ".repeat(40);

    c.bench_function("classify_short_match", |b| {
        b.iter(|| classify(black_box("Code Helper"), black_box(None)))
    });

    c.bench_function("classify_long_description_no_match", |b| {
        b.iter(|| classify(black_box("Assistant"), black_box(Some(description.as_str()))))
    });

    let mut table = KeywordTable::builtin();
    for i in 0..100 {
        table.push(format!("keyword-{}", i), berth::template::Category::Reasoning);
    }
    c.bench_function("classify_extended_table", |b| {
        b.iter(|| table.classify(black_box("Planner"), black_box(Some("keyword-99"))))
    });

    let spec = AgentSpec::new("Code Helper").with_description(description.clone());
    c.bench_function("validate_spec", |b| b.iter(|| validate_spec(black_box(&spec))));
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
