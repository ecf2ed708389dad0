//! # Property Tests
//!
//! The contract-level properties of the index, checked end-to-end over the
//! real pipeline rather than against any single layer.

use std::collections::HashMap;

use mi_03_index::IndexReader;
use mi_05_mapper::TrieStore;
use shared_types::{Payload, ZERO_COMMITMENT};

use crate::fixtures::*;

/// Payload monotonicity: a register keeps its value across heights with no
/// intervening write.
#[tokio::test]
async fn property_payload_monotonicity() {
    let index = TestIndex::new();

    let register = path(0x0A);
    let other = path(0x0B);

    let mut probe = TrieStore::new();
    let mut root = ZERO_COMMITMENT;
    let mut updates = Vec::new();
    let mut records = Vec::new();
    for height in 1..=12u64 {
        // The register is written only at height 3; everything else
        // touches an unrelated path.
        let writes = if height == 3 {
            vec![(register, payload(b"steady"))]
        } else {
            vec![(other, payload(&height.to_be_bytes()))]
        };
        let step = update(root, &writes);
        root = probe.apply_update(&step);
        records.push(block(height, root));
        updates.push(step);
    }

    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    for height in 3..=12 {
        assert_eq!(
            reader.values(height, &[register]).unwrap(),
            vec![payload(b"steady")],
            "value drifted at height {height}"
        );
    }
    for height in 1..3 {
        assert_eq!(
            reader.values(height, &[register]).unwrap(),
            vec![Payload::null()]
        );
    }
}

/// Event filtering: the unfiltered query equals the union of the per-type
/// queries, as a multiset.
#[tokio::test]
async fn property_event_filter_union() {
    let index = TestIndex::new();

    let updates = vec![update(ZERO_COMMITMENT, &[(path(0x01), payload(b"x"))])];
    let commits = expected_commits(&updates);

    let mut record = block(1, commits[0]);
    record.events = vec![
        event("Deposit", 0, 0),
        event("Withdraw", 0, 1),
        event("Deposit", 1, 0),
        event("Transfer", 1, 1),
        event("Deposit", 2, 0),
    ];
    index.run_mapper(&[record], &updates).await.unwrap();

    let reader = index.reader();
    let all = reader.events(1, &[]).unwrap();
    assert_eq!(all.len(), 5);

    let mut by_type_union: HashMap<(u32, u32), usize> = HashMap::new();
    for name in ["Deposit", "Withdraw", "Transfer"] {
        for ev in reader.events(1, &[name.to_string()]).unwrap() {
            assert_eq!(ev.event_type, name);
            *by_type_union
                .entry((ev.transaction_index, ev.event_index))
                .or_default() += 1;
        }
    }

    let mut all_counted: HashMap<(u32, u32), usize> = HashMap::new();
    for ev in &all {
        *all_counted
            .entry((ev.transaction_index, ev.event_index))
            .or_default() += 1;
    }
    assert_eq!(by_type_union, all_counted);
}

/// Height/block-id round trip across the whole indexed range.
#[tokio::test]
async fn property_height_block_roundtrip() {
    let index = TestIndex::new();

    let mut probe = TrieStore::new();
    let mut root = ZERO_COMMITMENT;
    let mut updates = Vec::new();
    let mut records = Vec::new();
    for height in 1..=8u64 {
        let step = update(root, &[(path(height as u8), payload(&[height as u8]))]);
        root = probe.apply_update(&step);
        records.push(block(height, root));
        updates.push(step);
    }

    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    for height in 1..=8u64 {
        let header = reader.header(height).unwrap();
        assert_eq!(reader.height_for_block(&header.id()).unwrap(), height);
    }
}

/// Atomic visibility: once `last` reports a height, every entity of that
/// height is retrievable.
#[tokio::test]
async fn property_atomic_visibility() {
    let index = TestIndex::new();

    let tx = transaction(0x31);
    let updates = vec![update(ZERO_COMMITMENT, &[(path(0x01), payload(b"x"))])];
    let commits = expected_commits(&updates);

    let mut record = block(1, commits[0]);
    record.transactions = vec![tx.clone()];
    record.results = vec![result(&tx)];
    record.collections = vec![collection(std::slice::from_ref(&tx))];
    record.events = vec![event("T", 0, 0)];
    record.seals = vec![seal(0x41)];

    index.run_mapper(&[record.clone()], &updates).await.unwrap();

    let reader = index.reader();
    let last = reader.last().unwrap();
    assert_eq!(last, 1);

    // Every per-height entity answers at the reported height.
    assert_eq!(reader.header(last).unwrap(), record.header);
    assert_eq!(reader.commit(last).unwrap(), record.commit);
    assert_eq!(reader.values(last, &[path(0x01)]).unwrap(), vec![payload(b"x")]);
    assert_eq!(reader.events(last, &[]).unwrap().len(), 1);
    assert_eq!(reader.transactions_by_height(last).unwrap().len(), 1);
    assert_eq!(reader.collections_by_height(last).unwrap().len(), 1);
    assert_eq!(reader.seals_by_height(last).unwrap().len(), 1);
    assert_eq!(reader.height_for_block(&record.header.id()).unwrap(), last);
}

/// Restart idempotence: resuming over the same replayed streams leaves the
/// index exactly where a crash-free run would.
#[tokio::test]
async fn property_restart_idempotence() {
    let index = TestIndex::new();

    let register = path(0x0C);
    let mut probe = TrieStore::new();
    let mut root = ZERO_COMMITMENT;
    let mut updates = Vec::new();
    let mut records = Vec::new();
    for height in 1..=6u64 {
        let step = update(root, &[(register, payload(&height.to_be_bytes()))]);
        root = probe.apply_update(&step);
        records.push(block(height, root));
        updates.push(step);
    }

    // First run indexes only the first half: the chain log ends at 3, as
    // if the process died there.
    index.run_mapper(&records[..3], &updates).await.unwrap();
    assert_eq!(index.reader().last().unwrap(), 3);

    // Restart with the full streams replayed from the beginning.
    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    assert_eq!(reader.last().unwrap(), 6);
    for height in 1..=6u64 {
        assert_eq!(
            reader.values(height, &[register]).unwrap(),
            vec![payload(&height.to_be_bytes())],
            "register wrong at height {height}"
        );
        assert_eq!(reader.commit(height).unwrap(), records[height as usize - 1].commit);
    }
}

/// Randomized register history: a seeded schedule of writes across many
/// registers and heights always reads back as the latest write at or
/// below the queried height.
#[tokio::test]
async fn property_random_register_history() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0x4D45_5249_4449_414E);
    let index = TestIndex::new();

    let registers: Vec<_> = (0u8..20).map(path).collect();
    let heights = 1..=10u64;

    let mut probe = TrieStore::new();
    let mut root = ZERO_COMMITMENT;
    let mut updates = Vec::new();
    let mut records = Vec::new();
    // expected[register] = chronological (height, value) writes.
    let mut expected: HashMap<usize, Vec<(u64, Payload)>> = HashMap::new();

    for height in heights.clone() {
        let mut writes = Vec::new();
        for (slot, register) in registers.iter().enumerate() {
            if rng.gen_bool(0.4) {
                let value = payload(&[slot as u8, height as u8, rng.gen()]);
                writes.push((*register, value.clone()));
                expected.entry(slot).or_default().push((height, value));
            }
        }
        // Keep every height non-empty so the commit chain advances.
        if writes.is_empty() {
            writes.push((path(0xFF), payload(&height.to_be_bytes())));
        }
        let step = update(root, &writes);
        root = probe.apply_update(&step);
        records.push(block(height, root));
        updates.push(step);
    }

    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    for height in heights {
        for (slot, register) in registers.iter().enumerate() {
            let want = expected
                .get(&slot)
                .and_then(|writes| {
                    writes
                        .iter()
                        .rev()
                        .find(|(written_at, _)| *written_at <= height)
                })
                .map(|(_, value)| value.clone())
                .unwrap_or_else(Payload::null);

            let got = reader.values(height, &[*register]).unwrap().remove(0);
            assert_eq!(got, want, "register {slot} at height {height}");
        }
    }
}

/// Commit chaining: each height's commitment is the one reached by
/// applying that height's updates to the previous commitment.
#[tokio::test]
async fn property_commit_chain_continuity() {
    let index = TestIndex::new();

    let mut probe = TrieStore::new();
    let mut root = ZERO_COMMITMENT;
    let mut updates = Vec::new();
    let mut records = Vec::new();
    for height in 1..=5u64 {
        let step = update(root, &[(path(height as u8), payload(&[height as u8]))]);
        root = probe.apply_update(&step);
        records.push(block(height, root));
        updates.push(step);
    }

    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    let mut replay = TrieStore::new();
    let mut expected = ZERO_COMMITMENT;
    for (height, step) in (1..=5u64).zip(&updates) {
        expected = replay.apply_update(step);
        assert_eq!(reader.commit(height).unwrap(), expected);
    }
}
