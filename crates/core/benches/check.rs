use criterion::{black_box, criterion_group, criterion_main, Criterion};
use verdict_core::checker::{CheckCtx, Checker};
use verdict_core::history::{Fun, Mop, Op, Value};
use verdict_core::linear::{LinearChecker, Model};
use verdict_core::txn::{TxnChecker, TxnOpts, Workload};
use verdict_core::History;

/// Build a clean list-append history.
/// processes: client count
/// txns_per_process: transactions each client runs
/// keys: how many lists the transactions spread over
fn build_append_history(processes: u64, txns_per_process: usize, keys: i64) -> History {
    let mut ops = Vec::new();
    let mut lists: std::collections::BTreeMap<i64, Vec<i64>> = std::collections::BTreeMap::new();
    let mut element = 0i64;

    for t in 0..txns_per_process {
        for p in 0..processes {
            let key = (element + p as i64) % keys;
            let key_name = format!("k{key}");
            element += 1;

            let list = lists.entry(key).or_default();
            let mops = if t % 2 == 0 {
                list.push(element);
                vec![Mop::append(key_name.clone(), element)]
            } else {
                vec![Mop::read_list(key_name.clone(), list.iter().copied())]
            };
            ops.push(Op::invoke(p, Fun::Txn, Mop::to_list(&mops)));
            ops.push(Op::ok(p, Fun::Txn, Mop::to_list(&mops)));
        }
    }
    History::index(ops)
}

/// Build a register history with some concurrency between writers and
/// readers.
fn build_register_history(rounds: usize) -> History {
    let mut ops = Vec::new();
    for round in 0..rounds {
        let value = round as i64 + 1;
        ops.push(Op::invoke(0, Fun::Write, Value::Int(value)));
        ops.push(Op::invoke(1, Fun::Read, Value::Nil));
        ops.push(Op::ok(0, Fun::Write, Value::Int(value)));
        ops.push(Op::ok(1, Fun::Read, Value::Int(value)));
    }
    History::index(ops)
}

fn bench_checkers(c: &mut Criterion) {
    let append_small = build_append_history(2, 10, 3);
    let append_medium = build_append_history(4, 50, 5);
    let append_large = build_append_history(8, 100, 10);

    let register_small = build_register_history(20);
    let register_large = build_register_history(200);

    let mut group = c.benchmark_group("check");

    for (name, history) in [
        ("append_small", &append_small),
        ("append_medium", &append_medium),
        ("append_large", &append_large),
    ] {
        group.bench_function(name, |b| {
            let checker = TxnChecker::new(Workload::ListAppend, TxnOpts::default());
            b.iter(|| checker.check(black_box(history), &CheckCtx::new()));
        });
    }

    for (name, history) in [
        ("register_small", &register_small),
        ("register_large", &register_large),
    ] {
        group.bench_function(name, |b| {
            let checker = LinearChecker::new(Model::cas_register());
            b.iter(|| checker.check(black_box(history), &CheckCtx::new()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_checkers);
criterion_main!(benches);
