use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use chrono::Utc;
use invtrack_custom_id::{FormatDefinition, RenderContext, parse, render, serialize};
use rand::SeedableRng;
use rand::rngs::StdRng;

const DEFAULT_FORMAT: &str = r#"[{"type":"fixed","value":"ITEM-"},{"type":"seq","pad":4}]"#;
const RICH_FORMAT: &str = r#"[
    {"type":"fixed","value":"INV-"},
    {"type":"date","format":"yyyyMMdd"},
    {"type":"fixed","value":"-"},
    {"type":"random_hex","length":6},
    {"type":"fixed","value":"-"},
    {"type":"seq","pad":6}
]"#;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, raw) in [("default", DEFAULT_FORMAT), ("rich", RICH_FORMAT)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), raw, |b, raw| {
            b.iter(|| parse(black_box(raw)))
        });
    }
    group.finish();

    let def = FormatDefinition::default_item();
    c.bench_function("serialize/default", |b| b.iter(|| serialize(black_box(&def))));
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let now = Utc::now();
    for (name, raw) in [("default", DEFAULT_FORMAT), ("rich", RICH_FORMAT)] {
        let def = match parse(raw) {
            Ok(def) => def,
            Err(e) => panic!("benchmark format must parse: {e}"),
        };
        let mut rng = StdRng::seed_from_u64(7);
        group.bench_function(name, |b| {
            let mut ordinal = 0u64;
            b.iter(|| {
                ordinal += 1;
                let mut ctx = RenderContext::new(now, &mut rng);
                render(black_box(&def), ordinal, &mut ctx)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
