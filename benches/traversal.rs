#![allow(missing_docs)]

use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use cycleguard::{CycleGuard, FieldLabels, GraphObject};
use serde::Serialize;

#[derive(Clone, Serialize, GraphObject)]
struct BenchItem {
    id: u64,
    payload: Vec<u64>,
}

#[derive(GraphObject)]
struct BenchList {
    items: Vec<BenchItem>,
}

#[derive(GraphObject)]
struct Chain {
    depth: u32,
    next: Option<Box<Chain>>,
}

fn generate_list(count: usize) -> BenchList {
    let items = (0..count)
        .map(|i| BenchItem {
            id: i as u64,
            payload: vec![i as u64; 16],
        })
        .collect();
    BenchList { items }
}

fn generate_chain(depth: u32) -> Chain {
    let mut chain = Chain { depth: 0, next: None };
    for d in 1..depth {
        chain = Chain {
            depth: d,
            next: Some(Box::new(chain)),
        };
    }
    chain
}

#[derive(GraphObject)]
struct SharedFan {
    children: Vec<Rc<BenchItem>>,
}

// --- BENCHMARKS ---

fn bench_wide(c: &mut Criterion) {
    let item_count = 10_000;
    let data = generate_list(item_count);

    let mut group = c.benchmark_group("Wide Graph");
    group.throughput(Throughput::Elements(item_count as u64));

    // Baseline: plain bincode, no identity tracking.
    group.bench_function("bincode_serialize", |b| {
        let raw: Vec<BenchItem> = data.items.clone();
        b.iter(|| {
            bincode::serde::encode_to_vec(black_box(&raw), bincode::config::standard())
                .expect("bincode serialization failed")
        });
    });

    group.bench_function("cycleguard_names", |b| {
        b.iter(|| CycleGuard::to_bytes(black_box(&data)).expect("serialization failed"));
    });

    group.bench_function("cycleguard_indices", |b| {
        let options = CycleGuard::builder().labels(FieldLabels::Indices);
        b.iter(|| options.to_bytes(black_box(&data)).expect("serialization failed"));
    });

    group.finish();
}

fn bench_deep(c: &mut Criterion) {
    let chain = generate_chain(500);
    c.bench_function("deep_chain_500", |b| {
        b.iter(|| CycleGuard::to_bytes(black_box(&chain)).expect("serialization failed"));
    });

    let shared = Rc::new(BenchItem {
        id: 0,
        payload: vec![1; 16],
    });
    let fan = SharedFan {
        children: (0..1_000).map(|_| shared.clone()).collect(),
    };
    c.bench_function("shared_fan_1000", |b| {
        b.iter(|| CycleGuard::to_bytes(black_box(&fan)).expect("serialization failed"));
    });
}

criterion_group!(benches, bench_wide, bench_deep);
criterion_main!(benches);
