//! Long-horizon retrieval scenarios: a 50-turn debugging session where the
//! interesting facts are buried dozens of turns behind an overwhelming
//! recency signal.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cortex_core::facts::predicate;
use cortex_core::{Fact, Intent, Speaker};
use cortex_testkit::{turn, ScenarioRunner};

/// Filler chatter with vocabulary disjoint from the probes.
fn filler_message(i: u64) -> String {
    const PHRASES: [&str; 5] = [
        "inspecting allocation paths in the scheduler",
        "tracing lock contention around the worker pool",
        "stepping through the retry loop once more",
        "comparing goroutine dumps between runs",
        "adjusting instrumentation before another attempt",
    ];
    format!("{} (pass {i})", PHRASES[(i as usize) % PHRASES.len()])
}

fn seed_debug_session(runner: &mut ScenarioRunner, turns: u64) {
    runner
        .ingest(
            &turn(
                0,
                Speaker::User,
                "nil pointer dereference in handler.go line 142",
                Intent::Debug,
            )
            .error("nil pointer dereference in handler.go line 142")
            .topic("original-error")
            .file("handler.go")
            .build(),
        )
        .expect("turn 0 ingests");

    for i in 1..turns {
        let speaker = if i % 2 == 0 {
            Speaker::User
        } else {
            Speaker::Assistant
        };
        let mut builder = turn(i, speaker, &filler_message(i), Intent::Debug);
        if i % 5 == 0 {
            builder = builder.topic(&format!("instrumentation-pass-{i}"));
        }
        runner.ingest(&builder.build()).expect("filler ingests");
    }
}

#[test]
fn original_error_recalled_after_45_turns() {
    let mut runner = ScenarioRunner::new();
    seed_debug_session(&mut runner, 45);

    let probe = turn(45, Speaker::User, "What was the original error?", Intent::Recall)
        .refers_back(Some(0))
        .build();
    let activation = runner.probe_turn(&probe, 2000).expect("probe scores");

    let expected = vec![
        Fact::new(
            predicate::TURN_ERROR_MESSAGE,
            vec![
                0u64.into(),
                "nil pointer dereference in handler.go line 142".into(),
            ],
        ),
        Fact::new(
            predicate::TURN_TOPIC,
            vec![0u64.into(), "original-error".into()],
        ),
    ];
    let metrics = runner.evaluate(&activation, &expected);

    assert!(
        metrics.recall >= 0.5,
        "recall {} below 0.5; selected: {:?}",
        metrics.recall,
        activation
            .facts
            .iter()
            .map(|f| (&f.fact.predicate, f.fact.turn_index()))
            .collect::<Vec<_>>()
    );
    // Both canonical turn-0 facts made it back despite 45 turns of recency
    for fact in &expected {
        assert!(
            activation.facts.iter().any(|f| f.fact.key() == fact.key()),
            "{} missing from activation",
            fact.predicate
        );
    }
    assert!(activation.total_cost <= 2000);
}

#[test]
fn failed_solutions_enumerated_from_topic_probe() {
    let mut runner = ScenarioRunner::new();

    runner
        .ingest(
            &turn(
                0,
                Speaker::User,
                "nil pointer dereference in handler.go line 142",
                Intent::Debug,
            )
            .error("nil pointer dereference in handler.go line 142")
            .topic("original-error")
            .build(),
        )
        .expect("turn 0 ingests");

    let marked: [u64; 4] = [3, 10, 20, 30];
    for i in 1..49 {
        let speaker = if i % 2 == 0 {
            Speaker::User
        } else {
            Speaker::Assistant
        };
        let mut builder = turn(i, speaker, &filler_message(i), Intent::Debug);
        if marked.contains(&i) {
            builder = builder.topic("failed-solution");
        } else if i % 5 == 0 {
            builder = builder.topic(&format!("instrumentation-pass-{i}"));
        }
        runner.ingest(&builder.build()).expect("filler ingests");
    }

    let probe = turn(
        49,
        Speaker::User,
        "Which approaches did not pan out?",
        Intent::Recall,
    )
    .refers_back(None)
    .topic("failed-solution")
    .build();
    let activation = runner.probe_turn(&probe, 2000).expect("probe scores");

    let expected: Vec<Fact> = marked
        .iter()
        .map(|i| {
            Fact::new(
                predicate::TURN_TOPIC,
                vec![(*i).into(), "failed-solution".into()],
            )
        })
        .collect();
    let metrics = runner.evaluate(&activation, &expected);

    let retrieved_marked = expected
        .iter()
        .filter(|fact| activation.facts.iter().any(|f| f.fact.key() == fact.key()))
        .count();
    assert!(
        retrieved_marked >= 2,
        "only {retrieved_marked} of 4 failed-solution topics retrieved"
    );
    assert!(
        metrics.precision >= 0.15,
        "precision {} below 0.15 ({} facts selected)",
        metrics.precision,
        activation.facts.len()
    );
}

#[test]
fn compression_ratio_is_reported_and_finite() {
    let mut runner = ScenarioRunner::new();
    seed_debug_session(&mut runner, 20);
    let ratio = runner.compression_ratio();
    assert!(ratio > 0.0, "ratio should be positive, got {ratio}");
    assert!(ratio.is_finite());
}
