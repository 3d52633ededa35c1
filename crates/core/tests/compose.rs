//! Composing sub-checkers over one history.

mod common;

use std::time::Duration;

use verdict_core::checker::{AnomalyKind, CheckCtx, CheckerSet, Validity};
use verdict_core::linear::{LinearChecker, Model};
use verdict_core::txn::{TxnChecker, TxnOpts, Workload};
use verdict_core::History;

#[test]
fn labels_keep_sub_results_apart() {
    let history = history! {
        0: invoke txn [(append x 1)],
        0: ok     txn [(append x 1)],
        1: invoke txn [(r x _)],
        1: ok     txn [(r x [1])],
    };
    let set = CheckerSet::new()
        .with(
            "append",
            TxnChecker::new(Workload::ListAppend, TxnOpts::default()),
        )
        .with(
            "append-strict",
            TxnChecker::new(
                Workload::ListAppend,
                TxnOpts {
                    linearizable_keys: true,
                    ..TxnOpts::default()
                },
            ),
        );
    let result = set.run(&history, &CheckCtx::new());
    assert_eq!(result.validity, Validity::True);
    assert_eq!(result.results.len(), 2);
    assert!(result.results.contains_key("append"));
    assert!(result.results.contains_key("append-strict"));
}

#[test]
fn one_failing_checker_fails_the_composition() {
    let history = history! {
        0: invoke txn [(append x 1)],
        0: fail   txn [(append x 1)],
        1: invoke txn [(r x _)],
        1: ok     txn [(r x [1])],
    };
    let set = CheckerSet::new()
        .with(
            "append",
            TxnChecker::new(Workload::ListAppend, TxnOpts::default()),
        )
        // A register checker on an append history has no committed
        // writes to object to; it stays quiet.
        .with(
            "register",
            TxnChecker::new(Workload::WriteRegister, TxnOpts::default()),
        );
    let result = set.run(&history, &CheckCtx::new());
    assert_eq!(result.validity, Validity::False);
    assert_eq!(result.results["append"].validity, Validity::False);
    assert!(result.results["append"]
        .anomalies
        .contains_key(&AnomalyKind::G1a));
}

#[test]
fn empty_history_composes_to_unknown_for_txn_checkers() {
    let set = CheckerSet::new().with(
        "append",
        TxnChecker::new(Workload::ListAppend, TxnOpts::default()),
    );
    let result = set.run(&History::index(vec![]), &CheckCtx::new());
    assert_eq!(result.validity, Validity::Unknown);
}

#[test]
fn empty_history_composes_to_valid_for_linear_checkers() {
    let set = CheckerSet::new().with("register", LinearChecker::new(Model::cas_register()));
    let result = set.run(&History::index(vec![]), &CheckCtx::new());
    assert_eq!(result.validity, Validity::True);
}

#[test]
fn expired_deadline_yields_unknown_with_timeout() {
    let history = history! {
        0: invoke txn [(append x 1)],
        0: ok     txn [(append x 1)],
        1: invoke txn [(r x _)],
        1: ok     txn [(r x [1])],
    };
    // A deadline of zero expires before the cycle search begins.
    let ctx = CheckCtx::with_time_limit(Duration::from_secs(0));
    let set = CheckerSet::new().with(
        "append",
        TxnChecker::new(Workload::ListAppend, TxnOpts::default()),
    );
    let result = set.run(&history, &ctx);
    assert_eq!(result.validity, Validity::Unknown);
    assert!(result.results["append"].timeout);
    assert!(result.results["append"]
        .anomalies
        .contains_key(&AnomalyKind::Timeout));
}

#[test]
fn composed_runs_are_deterministic() {
    let history = history! {
        0: invoke txn [(append x 1), (append y 1)],
        0: ok     txn [(append x 1), (append y 1)],
        1: invoke txn [(append x 2), (append y 2)],
        1: ok     txn [(append x 2), (append y 2)],
        2: invoke txn [(r x _), (r y _)],
        2: ok     txn [(r x [1, 2]), (r y [2, 1])],
    };
    let set = CheckerSet::new()
        .with(
            "append",
            TxnChecker::new(Workload::ListAppend, TxnOpts::default()),
        )
        .with(
            "append-seq",
            TxnChecker::new(
                Workload::ListAppend,
                TxnOpts {
                    sequential_keys: true,
                    ..TxnOpts::default()
                },
            ),
        );
    let first = set.run(&history, &CheckCtx::new());
    let second = set.run(&history, &CheckCtx::new());
    assert_eq!(first, second);
    assert_eq!(format!("{first:?}"), format!("{second:?}"));
}
