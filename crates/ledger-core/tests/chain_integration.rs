use ledger_core::{pow, Block, Chain, ChainConfig, LedgerError, ValidationError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn demo_chain(difficulty: u32) -> Chain {
    let mut chain = Chain::new(difficulty);
    chain
        .append(&["Alice pays Bob 10 BTC", "Bob pays Charlie 5 BTC"])
        .unwrap();
    chain
        .append(&["Charlie pays Dave 2 BTC", "Dave pays Alice 1 BTC"])
        .unwrap();
    chain
}

#[test]
fn test_demo_scenario() {
    let mut chain = demo_chain(2);
    assert!(chain.is_valid());
    assert_eq!(chain.len(), 3);

    chain.blocks_mut()[1].transactions = json!(["Alice pays Bob 100 BTC"]);
    assert!(!chain.is_valid());
}

#[test]
fn test_sealed_blocks_meet_difficulty_and_link() {
    let chain = demo_chain(2);
    let blocks = chain.blocks();
    for (i, block) in blocks.iter().enumerate().skip(1) {
        assert_eq!(block.index, i as u64);
        assert!(pow::count_leading_zero_nibbles(&block.hash) >= 2);
        assert_eq!(block.hash, block.calculate_hash());
        assert_eq!(block.previous_hash, blocks[i - 1].hash);
    }
}

#[test]
fn test_genesis_skips_difficulty() {
    let chain = Chain::new(3);
    let genesis = &chain.blocks()[0];
    assert_eq!(genesis.index, 0);
    assert_eq!(genesis.previous_hash, [0u8; 32]);
    assert_eq!(genesis.nonce, 0);

    // A genesis whose hash has no leading zero at all still anchors a valid chain.
    let mut chain = Chain::new(3);
    let genesis = Block::with_timestamp(0, 1_600_000_000_000, json!("Genesis Block"), [0u8; 32]);
    assert_eq!(
        genesis.hash_hex(),
        "98b73b61614864751378d9765172117e3afa7b631ed153957c3fe2b228103bae"
    );
    assert!(!genesis.meets_difficulty(1));
    chain.blocks_mut()[0] = genesis;

    chain.append(&["Alice pays Bob 10 BTC"]).unwrap();
    assert!(chain.blocks()[1].meets_difficulty(3));
    assert!(!chain.blocks()[0].meets_difficulty(3));
    assert!(chain.is_valid());
}

#[test]
fn test_any_field_tamper_is_detected() {
    let mut rng = StdRng::seed_from_u64(7);
    let base = {
        let mut chain = Chain::new(1);
        for i in 0..6 {
            chain.append(&[format!("batch {i}")]).unwrap();
        }
        chain
    };

    for round in 0..40 {
        let mut chain = base.clone();
        let position = rng.gen_range(1..chain.len());
        let block = &mut chain.blocks_mut()[position];
        match round % 5 {
            0 => block.index += rng.gen_range(1..100),
            1 => block.timestamp ^= 1,
            2 => block.transactions = json!([format!("forged {}", rng.gen::<u32>())]),
            3 => block.nonce = block.nonce.wrapping_add(rng.gen_range(1..1000)),
            _ => block.previous_hash = rng.gen(),
        }
        assert!(!chain.is_valid(), "round {round} at position {position}");
        assert_eq!(chain.verify().unwrap_err().position(), position);
    }
}

#[test]
fn test_previous_hash_tamper_reports_link() {
    let mut chain = demo_chain(1);
    let block = &mut chain.blocks_mut()[2];
    block.previous_hash = [0x11; 32];
    block.hash = block.calculate_hash();

    assert_eq!(
        chain.verify(),
        Err(ValidationError::BrokenLink {
            position: 2,
            expected: chain.blocks()[1].hash,
            found: [0x11; 32],
        })
    );
}

#[test]
fn test_identical_fields_identical_digest() {
    let payload = json!({"batch": ["x", "y"], "memo": null});
    let a = Block::with_timestamp(5, 1_700_000_000_000, payload.clone(), [3u8; 32]);
    let b = Block::with_timestamp(5, 1_700_000_000_000, payload, [3u8; 32]);
    assert_eq!(a.calculate_hash(), b.calculate_hash());
    assert_eq!(a, b);
}

#[test]
fn test_cancel_from_another_thread() {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    // Difficulty 12 will not be found in the time the test runs.
    let handle = thread::spawn(move || {
        let mut chain = Chain::new(12);
        let result = chain.append_until(&["slow"], &flag).map(|b| b.index);
        (result, chain.len())
    });

    thread::sleep(Duration::from_millis(50));
    cancel.store(true, Ordering::Relaxed);
    let (result, len) = handle.join().unwrap();

    assert!(matches!(result, Err(LedgerError::MiningCancelled { index: 1, .. })));
    assert_eq!(len, 1);
}

#[test]
fn test_parallel_and_sequential_chains_agree() {
    let template = Block::with_timestamp(1, 1_650_000_000_000, json!(["p"]), [0u8; 32]);

    let mut sequential = template.clone();
    sequential.mine(2);
    let mut parallel = template;
    ledger_core::mine::mine_block_parallel(&mut parallel, 2, None).unwrap();
    assert_eq!(sequential, parallel);

    let mut chain = Chain::with_config(ChainConfig {
        difficulty: 2,
        parallel: true,
    });
    chain.append(&["p"]).unwrap();
    assert!(chain.is_valid());
}

#[test]
fn test_chain_serializes_blocks_as_json() {
    let chain = demo_chain(1);
    let json = serde_json::to_value(chain.blocks()).unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["transactions"], "Genesis Block");
    assert_eq!(rows[2]["previous_hash"], chain.blocks()[1].hash_hex());
}
