use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{Criterion, criterion_group, criterion_main};
use rulekit::{DataContext, MemoryRuleStore, RuleEngine};

/// An engine holding `combined` combined rules, each built from three base rules.
fn build_shared_engine(combined: usize) -> (Arc<RuleEngine<MemoryRuleStore>>, DataContext) {
    let engine = RuleEngine::new(MemoryRuleStore::new());

    for i in 0..combined {
        let ids: Vec<_> = [
            format!("age > {i} AND dept = 'Sales'"),
            format!("salary > {} OR experience > 5", i * 1000),
            // Never true for the benchmark context, so every rule is checked.
            format!("region = 'r{i}'"),
        ]
        .iter()
        .map(|text| engine.create_rule(text).unwrap().id)
        .collect();
        engine.combine_rules(&ids).unwrap();
    }

    let ctx = DataContext::new()
        .set("age", 40)
        .set("dept", "Sales")
        .set("salary", 60000)
        .set("region", "none");

    (Arc::new(engine), ctx)
}

fn bench_throughput(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];

    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(5));

    for &threads in &thread_counts {
        let (engine, ctx) = build_shared_engine(20);

        group.bench_function(&format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let engine = Arc::clone(&engine);
                        let c = ctx.clone();
                        thread::spawn(move || {
                            let start = Instant::now();
                            for _ in 0..per_thread {
                                let _ = engine.evaluate(&c);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                let mut max_elapsed = Duration::ZERO;
                for h in handles {
                    let elapsed = h.join().unwrap();
                    if elapsed > max_elapsed {
                        max_elapsed = elapsed;
                    }
                }
                max_elapsed
            });
        });
    }

    group.finish();
}

fn bench_authoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("authoring");

    group.bench_function("create_rule", |b| {
        let engine = RuleEngine::new(MemoryRuleStore::new());
        b.iter(|| {
            engine
                .create_rule("(age > 30 AND dept = 'Sales') OR experience > 5")
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_throughput, bench_authoring);
criterion_main!(benches);
