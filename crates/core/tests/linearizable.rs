//! End-to-end linearizability checking against the abstract models.

mod common;

use verdict_core::checker::{Anomaly, AnomalyKind, CheckCtx, Checker, Validity};
use verdict_core::linear::{LinearChecker, Model};
use verdict_core::History;

fn check(history: &History, model: Model) -> verdict_core::CheckResult {
    LinearChecker::new(model).check(history, &CheckCtx::new())
}

// -- CAS register --------------------------------------------------------

#[test]
fn sequential_write_cas_read_is_linearizable() {
    let history = history! {
        0: invoke write 1,
        0: ok     write 1,
        0: invoke cas [1, 2],
        0: ok     cas [1, 2],
        0: invoke read _,
        0: ok     read 2,
    };
    let result = check(&history, Model::cas_register());
    assert_eq!(result.validity, Validity::True);
}

#[test]
fn stale_read_after_completed_write_is_not_linearizable() {
    // write 2 demonstrably takes effect before the first read returns
    // (the read observes it); the later read of 1 has no explanation.
    let history = history! {
        0: invoke write 1,
        0: ok     write 1,
        1: invoke write 2,
        2: invoke read _,
        2: ok     read 2,
        1: ok     write 2,
        2: invoke read _,
        2: ok     read 1,
    };
    let result = check(&history, Model::cas_register());
    assert_eq!(result.validity, Validity::False);

    let [Anomaly::Nonlinearizable(cx)] =
        result.anomalies[&AnomalyKind::Nonlinearizable].as_slice()
    else {
        panic!("expected a counterexample");
    };
    assert_eq!(cx.op, 7);
    assert_eq!(cx.prefix, 7);
    assert!(!cx.linearized.is_empty());
}

#[test]
fn concurrent_writes_may_linearize_in_either_order() {
    let history = history! {
        0: invoke write 1,
        1: invoke write 2,
        0: ok     write 1,
        2: invoke read _,
        2: ok     read 1,
        1: ok     write 2,
        2: invoke read _,
        2: ok     read 1,
    };
    // write 2 is concurrent with write 1, so it may linearize first and
    // both reads of 1 are explained.
    let result = check(&history, Model::cas_register());
    assert_eq!(result.validity, Validity::True);
}

#[test]
fn cas_must_observe_its_precondition() {
    let history = history! {
        0: invoke write 1,
        0: ok     write 1,
        1: invoke cas [3, 4],
        1: ok     cas [3, 4],
    };
    let result = check(&history, Model::cas_register());
    assert_eq!(result.validity, Validity::False);
}

#[test]
fn failed_cas_is_ignored() {
    let history = history! {
        0: invoke write 1,
        0: ok     write 1,
        1: invoke cas [3, 4],
        1: fail   cas [3, 4],
        0: invoke read _,
        0: ok     read 1,
    };
    let result = check(&history, Model::cas_register());
    assert_eq!(result.validity, Validity::True);
}

// -- Counter -------------------------------------------------------------

#[test]
fn counter_adds_commute() {
    let history = history! {
        0: invoke add 1,
        1: invoke add 2,
        1: ok     add 2,
        0: ok     add 1,
        2: invoke read _,
        2: ok     read 3,
    };
    let result = check(&history, Model::counter());
    assert_eq!(result.validity, Validity::True);
}

#[test]
fn counter_cannot_skip_a_completed_add() {
    let history = history! {
        0: invoke add 5,
        0: ok     add 5,
        1: invoke read _,
        1: ok     read 0,
    };
    let result = check(&history, Model::counter());
    assert_eq!(result.validity, Validity::False);
}

// -- Grow-only set -------------------------------------------------------

#[test]
fn set_reads_reflect_completed_adds() {
    let history = history! {
        0: invoke add 1,
        0: ok     add 1,
        1: invoke add 2,
        1: ok     add 2,
        2: invoke read _,
        2: ok     read [1, 2],
    };
    let result = check(&history, Model::add_set());
    assert_eq!(result.validity, Validity::True);
}

#[test]
fn set_read_missing_an_element_fails() {
    let history = history! {
        0: invoke add 1,
        0: ok     add 1,
        1: invoke add 2,
        1: ok     add 2,
        2: invoke read _,
        2: ok     read [2],
    };
    let result = check(&history, Model::add_set());
    assert_eq!(result.validity, Validity::False);
}

#[test]
fn pending_add_may_or_may_not_be_present() {
    let history = history! {
        0: invoke add 1,
        0: ok     add 1,
        1: invoke add 2,
        2: invoke read _,
        2: ok     read [1],
        2: invoke read _,
        2: ok     read [1, 2],
    };
    // add 2 never completes; it can linearize between the two reads.
    let result = check(&history, Model::add_set());
    assert_eq!(result.validity, Validity::True);
}

// -- Mutex ---------------------------------------------------------------

#[test]
fn mutex_alternation_is_legal() {
    let history = history! {
        0: invoke acquire _,
        0: ok     acquire _,
        0: invoke release _,
        0: ok     release _,
        1: invoke acquire _,
        1: ok     acquire _,
    };
    let result = check(&history, Model::mutex());
    assert_eq!(result.validity, Validity::True);
}

#[test]
fn double_acquire_without_release_fails() {
    let history = history! {
        0: invoke acquire _,
        0: ok     acquire _,
        1: invoke acquire _,
        1: ok     acquire _,
    };
    let result = check(&history, Model::mutex());
    assert_eq!(result.validity, Validity::False);
}

// -- Boundaries ----------------------------------------------------------

#[test]
fn empty_history_is_linearizable() {
    let result = check(&History::index(vec![]), Model::cas_register());
    assert_eq!(result.validity, Validity::True);
}

#[test]
fn invokes_only_history_is_linearizable() {
    let history = history! {
        0: invoke write 1,
        1: invoke write 2,
        2: invoke read _,
    };
    let result = check(&history, Model::cas_register());
    assert_eq!(result.validity, Validity::True);
}

#[test]
fn single_op_history_is_linearizable_for_every_model() {
    let write = history! {
        0: invoke write 1,
        0: ok     write 1,
    };
    assert_eq!(
        check(&write, Model::cas_register()).validity,
        Validity::True
    );

    let add = history! {
        0: invoke add 1,
        0: ok     add 1,
    };
    assert_eq!(check(&add, Model::counter()).validity, Validity::True);
    assert_eq!(check(&add, Model::add_set()).validity, Validity::True);

    let acquire = history! {
        0: invoke acquire _,
        0: ok     acquire _,
    };
    assert_eq!(check(&acquire, Model::mutex()).validity, Validity::True);
}

#[test]
fn verdicts_are_deterministic() {
    let history = history! {
        0: invoke write 1,
        0: ok     write 1,
        1: invoke write 2,
        2: invoke read _,
        2: ok     read 2,
        1: ok     write 2,
        2: invoke read _,
        2: ok     read 1,
    };
    let first = check(&history, Model::cas_register());
    let second = check(&history, Model::cas_register());
    assert_eq!(first, second);
}
