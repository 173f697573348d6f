//! Concurrency contract of the fact store: concurrent batch loads
//! serialize, each batch is atomic, and the result is the multiset union of
//! the batches with duplicates collapsing idempotently.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::thread;

use cortex_core::facts::predicate;
use cortex_core::{Fact, FactStore};

fn topic(turn: u64, name: &str) -> Fact {
    Fact::new(predicate::TURN_TOPIC, vec![turn.into(), name.into()])
}

#[test]
fn concurrent_loads_union_without_loss() {
    let store = Arc::new(FactStore::new());
    let mut handles = Vec::new();

    for worker in 0..8u64 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..50u64 {
                let batch = vec![
                    topic(i, &format!("worker-{worker}-step-{i}")),
                    // Shared fact every worker races to insert
                    topic(i, "shared-step"),
                ];
                store.load_facts(batch).expect("batch loads");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker finishes");
    }

    let topics = store.query(predicate::TURN_TOPIC);
    // 8 workers × 50 distinct + 50 shared (deduplicated across workers)
    assert_eq!(topics.len(), 8 * 50 + 50);
}

#[test]
fn facts_visible_to_queries_started_after_load_returns() {
    let store = Arc::new(FactStore::new());
    store
        .load_facts(vec![topic(0, "visibility-probe")])
        .expect("load succeeds");
    // Sequenced after load_facts returned: must be visible
    let seen = store.query(predicate::TURN_TOPIC);
    assert_eq!(seen.len(), 1);

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.query(predicate::TURN_TOPIC).len())
    };
    assert_eq!(reader.join().expect("reader finishes"), 1);
}

#[test]
fn rejected_batch_leaves_concurrent_state_clean() {
    let store = Arc::new(FactStore::new());
    let good = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..100u64 {
                store
                    .load_facts(vec![topic(i, "good-batch")])
                    .expect("good batches load");
            }
        })
    };
    let bad = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..100u64 {
                let result = store.load_facts(vec![
                    topic(i, "poisoned-batch"),
                    Fact::new("unregistered_predicate", vec![i.into()]),
                ]);
                assert!(result.is_err());
            }
        })
    };
    good.join().expect("good worker finishes");
    bad.join().expect("bad worker finishes");

    let topics = store.query(predicate::TURN_TOPIC);
    assert_eq!(topics.len(), 100);
    assert!(topics
        .iter()
        .all(|f| f.args[1].as_text() == "good-batch"));
}
