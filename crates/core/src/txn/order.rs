//! Ordering extractors: process order, realtime order, and the per-key
//! monotonic-read order for counter workloads.

use std::collections::BTreeMap;

use crate::checker::anomaly::Evidence;
use crate::graph::{DepGraph, DepGraphBuilder, Rel};
use crate::history::{History, Kind, Process};
use crate::txn::index::{ObsValue, TxnIndex};
use crate::txn::EvidenceMap;

/// Link successive committed transactions of each client process.
#[must_use]
pub fn process_graph(index: &TxnIndex, history: &History, evidence: &mut EvidenceMap) -> DepGraph {
    let mut builder = DepGraphBuilder::new(index.op_count);
    let mut last_by_process: BTreeMap<u64, u32> = BTreeMap::new();

    for txn in &index.txns {
        if txn.kind != Kind::Ok {
            continue;
        }
        let Some(op) = history.get(txn.op as usize) else {
            continue;
        };
        let Process::Client(process) = op.process else {
            continue;
        };
        if let Some(prev) = last_by_process.insert(process, txn.op) {
            builder.link(prev, txn.op, Rel::Process);
            evidence.insert(
                (prev, txn.op, Rel::Process),
                Evidence::ProcessOrder { process },
            );
        }
    }
    builder.freeze()
}

/// Link `A -> B` whenever `A`'s completion precedes `B`'s invocation.
///
/// Rather than the full quadratic relation, each invocation links from a
/// frontier of completions not yet superseded: when `A` completes, every
/// frontier member that completed before `A` was invoked is covered by
/// `A` transitively and drops out. The result preserves reachability.
/// Only `ok` transactions participate; an indeterminate completion says
/// nothing about when the operation took effect.
#[must_use]
pub fn realtime_graph(index: &TxnIndex, evidence: &mut EvidenceMap) -> DepGraph {
    let mut builder = DepGraphBuilder::new(index.op_count);

    // Completion index -> invocation index, ok transactions only.
    let mut window: BTreeMap<u32, u32> = BTreeMap::new();
    for txn in &index.txns {
        if txn.kind == Kind::Ok {
            window.insert(txn.op, txn.invoke);
        }
    }

    let mut frontier: Vec<u32> = Vec::new();
    // Events in index order: each transaction has an invoke and a
    // completion position.
    let mut events: Vec<(u32, bool, u32)> = Vec::new(); // (position, is_completion, completion)
    for (&completion, &invoke) in &window {
        events.push((invoke, false, completion));
        events.push((completion, true, completion));
    }
    events.sort_unstable();

    for (_, is_completion, completion) in events {
        if is_completion {
            let invoked = window[&completion];
            frontier.retain(|&d| d >= invoked);
            frontier.push(completion);
        } else {
            for &a in &frontier {
                builder.link(a, completion, Rel::Realtime);
                evidence.insert((a, completion, Rel::Realtime), Evidence::RealtimeOrder);
            }
        }
    }
    builder.freeze()
}

/// For each key of an integer counter, link any read of a lower value to
/// any read of a strictly higher value.
#[must_use]
pub fn monotonic_graph(index: &TxnIndex, evidence: &mut EvidenceMap) -> DepGraph {
    let mut builder = DepGraphBuilder::new(index.op_count);

    for (key, key_index) in &index.keys {
        let mut observations: Vec<(i64, u32)> = key_index
            .reads
            .iter()
            .filter_map(|read| match &read.value {
                ObsValue::Scalar(crate::history::Version::Val(v)) => Some((*v, read.op)),
                _ => None,
            })
            .collect();
        observations.sort_unstable();

        for (i, &(v1, a)) in observations.iter().enumerate() {
            for &(v2, b) in &observations[i + 1..] {
                if v2 > v1 && a != b {
                    builder.link(a, b, Rel::PerKey);
                    evidence.entry((a, b, Rel::PerKey)).or_insert_with(|| {
                        Evidence::MonotonicReads {
                            key: key.clone(),
                            v1,
                            v2,
                        }
                    });
                }
            }
        }
    }
    builder.freeze()
}
