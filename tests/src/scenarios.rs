//! # End-to-End Scenarios
//!
//! Each test drives the full pipeline from on-disk input streams to index
//! queries: chain record log + WAL segments → mapper → reader.

use mi_03_index::{IndexError, IndexReader};
use mi_05_mapper::TrieStore;
use shared_types::{Payload, ZERO_COMMITMENT};

use crate::fixtures::*;

/// Single height, single register: the smallest complete indexing run.
#[tokio::test]
async fn scenario_single_height_single_register() {
    let index = TestIndex::new();

    let updates = vec![update(ZERO_COMMITMENT, &[(path(0x01), payload(b"v1"))])];
    let commits = expected_commits(&updates);
    let records = vec![block(1, commits[0])];

    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    assert_eq!(reader.last().unwrap(), 1);
    assert_eq!(reader.commit(1).unwrap(), commits[0]);
    assert_eq!(
        reader.values(1, &[path(0x01), path(0x02)]).unwrap(),
        vec![payload(b"v1"), Payload::null()]
    );
}

/// Payload version walk across sparse write heights.
#[tokio::test]
async fn scenario_payload_version_walk() {
    let index = TestIndex::new();

    // The register changes at heights 5, 10, and 15; other heights carry
    // writes to an unrelated register so every height has an update.
    let register = path(0x55);
    let noise = path(0x66);

    let mut updates = Vec::new();
    let mut root = ZERO_COMMITMENT;
    let mut probe = TrieStore::new();
    let mut records = Vec::new();

    for height in 1..=16u64 {
        let writes = match height {
            5 => vec![(register, payload(b"a"))],
            10 => vec![(register, payload(b"b"))],
            15 => vec![(register, payload(b"c"))],
            _ => vec![(noise, payload(&height.to_be_bytes()))],
        };
        let step = update(root, &writes);
        root = probe.apply_update(&step);
        records.push(block(height, root));
        updates.push(step);
    }

    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    let value_at = |height| reader.values(height, &[register]).unwrap().remove(0);

    assert_eq!(value_at(4), Payload::null());
    for height in 5..=9 {
        assert_eq!(value_at(height), payload(b"a"), "height {height}");
    }
    for height in 10..=14 {
        assert_eq!(value_at(height), payload(b"b"), "height {height}");
    }
    for height in 15..=16 {
        assert_eq!(value_at(height), payload(b"c"), "height {height}");
    }
}

/// Events grouped and filtered by type.
#[tokio::test]
async fn scenario_events_by_type() {
    let index = TestIndex::new();

    let updates = vec![update(ZERO_COMMITMENT, &[(path(0x01), payload(b"x"))])];
    let commits = expected_commits(&updates);

    let mut record = block(7, commits[0]);
    record.events = vec![event("T1", 0, 0), event("T2", 0, 1), event("T1", 1, 0)];
    // Heights 1-6 carry no ledger writes; their commit stays at the empty
    // root and the single update lands at height 7.
    let records: Vec<_> = (1..7)
        .map(|h| block(h, ZERO_COMMITMENT))
        .chain([record])
        .collect();

    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();

    let t1 = reader.events(7, &["T1".to_string()]).unwrap();
    assert_eq!(t1.len(), 2);
    assert!(t1.iter().all(|e| e.event_type == "T1"));

    let t2 = reader.events(7, &["T2".to_string()]).unwrap();
    assert_eq!(t2.len(), 1);

    let all = reader.events(7, &[]).unwrap();
    assert_eq!(all.len(), 3);

    let unknown = reader.events(7, &["UNKNOWN".to_string()]).unwrap();
    assert!(unknown.is_empty());
}

/// Speculative branches: the losing branch leaves no trace.
#[tokio::test]
async fn scenario_speculative_branch_pruning() {
    let index = TestIndex::new();

    let register = path(0x42);

    // Two updates from the same prior root produce sibling trees; the
    // chain finalizes the second.
    let update_a = update(ZERO_COMMITMENT, &[(register, payload(b"branch-a"))]);
    let update_b = update(ZERO_COMMITMENT, &[(register, payload(b"branch-b"))]);

    let mut probe = TrieStore::new();
    let commit_b = probe.apply_update(&update_b);

    let records = vec![block(1, commit_b)];
    index
        .run_mapper(&records, &[update_a, update_b])
        .await
        .unwrap();

    let reader = index.reader();
    assert_eq!(
        reader.values(1, &[register]).unwrap(),
        vec![payload(b"branch-b")]
    );
    assert_eq!(reader.commit(1).unwrap(), commit_b);
}

/// Queries outside the indexed range are rejected, not answered.
#[tokio::test]
async fn scenario_out_of_range_reject() {
    let index = TestIndex::new();

    let mut updates = Vec::new();
    let mut records = Vec::new();
    let mut root = ZERO_COMMITMENT;
    let mut probe = TrieStore::new();
    for height in 100..=102u64 {
        let step = update(root, &[(path(0x01), payload(&height.to_be_bytes()))]);
        root = probe.apply_update(&step);
        records.push(block(height, root));
        updates.push(step);
    }

    // The chain's lowest record is height 100, so the bootstrap root (and
    // the index's first height) is 99.
    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    assert_eq!(reader.first().unwrap(), 99);
    assert_eq!(reader.last().unwrap(), 102);

    for height in [50u64, 250u64] {
        match reader.values(height, &[path(0x01)]) {
            Err(IndexError::OutOfRange { first, last, .. }) => {
                assert_eq!((first, last), (99, 102));
            }
            other => panic!("expected OutOfRange at {height}, got {other:?}"),
        }
    }
}

/// Transaction-to-block traversal across every index direction.
#[tokio::test]
async fn scenario_transaction_block_traversal() {
    let index = TestIndex::new();

    let tx = transaction(0x11);
    let tx_id = tx.id();
    let coll = collection(std::slice::from_ref(&tx));
    let coll_id = coll.id();

    let updates = vec![update(ZERO_COMMITMENT, &[(path(0x01), payload(b"x"))])];
    let commits = expected_commits(&updates);

    let mut records: Vec<_> = (1..42).map(|h| block(h, ZERO_COMMITMENT)).collect();
    let mut target = block(42, commits[0]);
    target.collections = vec![coll.clone()];
    target.transactions = vec![tx.clone()];
    target.results = vec![result(&tx)];
    records.push(target);

    index.run_mapper(&records, &updates).await.unwrap();

    let reader = index.reader();
    assert_eq!(reader.height_for_transaction(&tx_id).unwrap(), 42);
    assert!(reader
        .collection(&coll_id)
        .unwrap()
        .transaction_ids
        .contains(&tx_id));
    assert!(reader
        .transactions_by_height(42)
        .unwrap()
        .contains(&tx_id));
    assert!(reader
        .collections_by_height(42)
        .unwrap()
        .contains(&coll_id));
    assert_eq!(reader.transaction(&tx_id).unwrap(), tx);
    assert_eq!(reader.result(&tx_id).unwrap().transaction_id, tx_id);
}

/// Seals land under both their own id and the height list.
#[tokio::test]
async fn scenario_seals_by_height() {
    let index = TestIndex::new();

    let updates = vec![update(ZERO_COMMITMENT, &[(path(0x01), payload(b"x"))])];
    let commits = expected_commits(&updates);

    let first_seal = seal(0x21);
    let second_seal = seal(0x22);
    let mut record = block(1, commits[0]);
    record.seals = vec![first_seal.clone(), second_seal.clone()];

    index.run_mapper(&[record], &updates).await.unwrap();

    let reader = index.reader();
    let ids = reader.seals_by_height(1).unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first_seal.id()));
    assert!(ids.contains(&second_seal.id()));
    assert_eq!(reader.seal(&first_seal.id()).unwrap(), first_seal);
}
