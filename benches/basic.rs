use criterion::{black_box, criterion_group, criterion_main, Criterion};

use compact_graphs::aggregate::average_metrics;
use compact_graphs::classify::classify_mult;
use compact_graphs::jitter::filter_jitter;
use compact_graphs::record::{Field, Record};

// a benchmark sweep: 4 approaches x 3 masks x 4 types x 6 thread counts x 5 selectivities x 5 trials
fn synthetic_trials() -> Vec<Record> {
    let mut rows = Vec::new();
    for approach in ["scalar", "avx2", "avx512", "branchless"] {
        for mask in ["uniform", "cluster", "single"] {
            for data_type in ["float", "double", "uint32_t", "uint64_t"] {
                for tc in [1u64, 2, 4, 8, 16, 32] {
                    for (i, sel) in [0.01, 0.1, 0.25, 0.5, 0.9].iter().enumerate() {
                        for trial in 0..5 {
                            let ms = 200.0 / tc as f64 + i as f64 + trial as f64 * 0.1;
                            if let Ok(r) = Record::new(approach, tc, data_type, 1 << 26, mask, *sel, ms) {
                                rows.push(r);
                            }
                        }
                    }
                }
            }
        }
    }
    rows
}

fn bench_aggregate(c: &mut Criterion) {
    let rows = synthetic_trials();
    let keys = Field::complement(&Field::METRICS);
    c.bench_function("average_metrics_7200", |b| b.iter(|| black_box(average_metrics(&rows, &Field::METRICS))));
    c.bench_function("classify_mult_7200", |b| b.iter(|| black_box(classify_mult(&rows, &keys).len())));
    c.bench_function("filter_jitter_7200", |b| b.iter(|| black_box(filter_jitter(&rows, 0.05).dropped)));
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
