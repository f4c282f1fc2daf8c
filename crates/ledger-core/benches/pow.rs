use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{mine::mine_block_parallel, Block};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::Value;

fn template() -> Block {
    let mut rng = StdRng::seed_from_u64(42);
    let txs: Vec<String> = (0..10)
        .map(|i| format!("alice-{i} pays bob {}", rng.gen_range(1..10)))
        .collect();
    Block::with_timestamp(1, 1_700_000_000_000, Value::from(txs), [0u8; 32])
}

fn bench_pow(c: &mut Criterion) {
    let block = template();

    c.bench_function("mine_block_difficulty_3", |b| {
        b.iter(|| {
            let mut candidate = block.clone();
            candidate.mine(3);
            candidate
        });
    });

    c.bench_function("mine_block_parallel_difficulty_3", |b| {
        b.iter(|| {
            let mut candidate = block.clone();
            mine_block_parallel(&mut candidate, 3, None).unwrap();
            candidate
        });
    });

    c.bench_function("calculate_hash", |b| b.iter(|| block.calculate_hash()));
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
