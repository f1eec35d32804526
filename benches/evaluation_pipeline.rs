/// Evaluation pipeline benchmarks
///
/// Measures load + reclassify + aggregate and report construction over
/// synthetic traces of growing iteration counts.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cyclestat::config::EvalConfig;
use cyclestat::evaluation::{evaluate_many, Evaluation};
use cyclestat::grouping::GroupingRegistry;
use cyclestat::stats::Reducer;
use cyclestat::store::{MemoryTraceStore, Selection};

const FUNCTIONS: [&str; 6] = ["main", "ntt", "intt", "basemul", "poly_tomont", "cbd2"];
const MNEMONICS: [&str; 5] = ["bn.mulqacc", "bn.addm", "bn.subm", "bn.wsrr", "bn.lid"];

/// One run per benchmark id, `iterations` iterations each
fn synthetic_store(runs: u64, iterations: u64) -> MemoryTraceStore {
    let mut store = MemoryTraceStore::new();
    for run in 1..=runs {
        store.add_run(run, "indcpa_enc").unwrap();
        for i in 0..iterations {
            let id = run * 100_000 + i;
            let mut total = 0i64;
            let mut records = Vec::new();
            for (f, function) in FUNCTIONS.iter().enumerate() {
                for (m, mnemonic) in MNEMONICS.iter().enumerate() {
                    let count = ((f + 1) * (m + 3)) as i64 * 10 + (i % 7) as i64;
                    let stall = (i % 3) as i64 * m as i64;
                    total += count + stall;
                    records.push((*function, *mnemonic, count, stall));
                }
            }
            store.add_iteration(id, run, total).unwrap();
            for (function, mnemonic, count, stall) in records {
                store.add_instruction(id, function, mnemonic, count, stall).unwrap();
            }
            for function in &FUNCTIONS[1..] {
                store.add_calls(id, function, 1 + (i % 4) as i64).unwrap();
            }
        }
    }
    store
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation_load");
    let config = EvalConfig::default();

    for iterations in [10u64, 100, 1000] {
        let store = synthetic_store(1, iterations);
        group.throughput(Throughput::Elements(iterations));
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &store,
            |b, store| {
                b.iter(|| {
                    Evaluation::load(black_box(store), &Selection::single(1), &config).unwrap()
                })
            },
        );
    }
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation_report");
    let registry = GroupingRegistry::default_schemes().unwrap();
    let mlkem = registry.scheme("mlkem").unwrap();
    let store = synthetic_store(1, 500);
    let eval = Evaluation::load(&store, &Selection::single(1), &EvalConfig::default()).unwrap();

    for reducer in Reducer::ALL {
        group.bench_function(reducer.name(), |b| {
            b.iter(|| eval.report(black_box(reducer), mlkem).unwrap())
        });
    }
    group.finish();
}

fn bench_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_many");
    let registry = GroupingRegistry::default_schemes().unwrap();
    let mlkem = registry.scheme("mlkem").unwrap();
    let config = EvalConfig::default();
    let store = synthetic_store(8, 200);
    let selections: Vec<Selection> = (1..=8).map(Selection::single).collect();

    for jobs in [1usize, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(jobs), &jobs, |b, &jobs| {
            b.iter(|| {
                evaluate_many(&store, &selections, Reducer::Median, mlkem, &config, jobs).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_load, bench_report, bench_many);
criterion_main!(benches);
