//! Direct anomaly scans that need no cycle search: G1a (aborted read),
//! G1b (intermediate read), and internal consistency.

use std::collections::BTreeSet;

use crate::checker::anomaly::Anomaly;
use crate::history::{Kind, Mop, Value, Version};
use crate::txn::index::{ObsValue, TxnIndex};
use crate::txn::Workload;

/// G1a: `ok` reads of values written only by definitely-failed
/// transactions. For lists, every observed element is checked.
#[must_use]
pub fn aborted_reads(index: &TxnIndex) -> Vec<Anomaly> {
    let mut seen: BTreeSet<(usize, &str, i64)> = BTreeSet::new();
    let mut found = Vec::new();

    for (key, key_index) in &index.keys {
        for read in &key_index.reads {
            let observed: Vec<i64> = match &read.value {
                ObsValue::Scalar(Version::Val(v)) => vec![*v],
                ObsValue::Scalar(Version::Init) => Vec::new(),
                ObsValue::List(items) => items.clone(),
            };
            for element in observed {
                if key_index.writers.contains_key(&element) {
                    continue;
                }
                let Some(failed) = key_index.failed.get(&element) else {
                    continue;
                };
                if seen.insert((read.op as usize, key.as_str(), element)) {
                    found.push(Anomaly::AbortedRead {
                        op: read.op as usize,
                        writer: failed[0] as usize,
                        key: key.clone(),
                        element,
                    });
                }
            }
        }
    }
    found
}

/// G1b: `ok` reads of a version some committed transaction overwrote
/// within itself. A list read is intermediate when it *ends* at an
/// element whose writer appended again to the same key.
#[must_use]
pub fn intermediate_reads(index: &TxnIndex) -> Vec<Anomaly> {
    let mut found = Vec::new();

    for (key, key_index) in &index.keys {
        for read in &key_index.reads {
            let Version::Val(version) = read.value.version() else {
                continue;
            };
            let Some(&(writer, overwritten_with)) = key_index.intermediate.get(&version) else {
                continue;
            };
            if writer == read.op {
                continue;
            }
            found.push(Anomaly::IntermediateRead {
                op: read.op as usize,
                writer: writer as usize,
                key: key.clone(),
                version,
                overwritten_with,
            });
        }
    }
    found
}

/// What a transaction's own prior micro-ops imply about a key's state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Track {
    /// Register: the value the key must currently hold.
    Exact(Version),
    /// List: the full list is known.
    Known(Vec<i64>),
    /// List: only a suffix is known (appends before any read).
    Suffix(Vec<i64>),
}

/// Internal consistency: within one committed transaction, every read of
/// a key must agree with the transaction's own prior reads and writes of
/// that key.
#[must_use]
pub fn internal(index: &TxnIndex) -> Vec<Anomaly> {
    let mut found = Vec::new();

    for txn in &index.txns {
        if txn.kind != Kind::Ok {
            continue;
        }
        let mut state: std::collections::BTreeMap<&str, Track> = std::collections::BTreeMap::new();

        for (pos, mop) in txn.mops.iter().enumerate() {
            match (index.workload, mop) {
                (Workload::ListAppend, Mop::Append { key, element }) => {
                    match state.entry(key.as_str()).or_insert_with(|| Track::Suffix(Vec::new())) {
                        Track::Known(items) | Track::Suffix(items) => items.push(*element),
                        Track::Exact(_) => unreachable!("list keys never track Exact"),
                    }
                }
                (Workload::ListAppend, Mop::Read { key, value }) => {
                    let nil = Value::Nil;
                    let value = value.as_ref().unwrap_or(&nil);
                    let Some(observed) = list_observation(value) else {
                        continue;
                    };
                    let entry = state
                        .entry(key.as_str())
                        .or_insert_with(|| Track::Suffix(Vec::new()));
                    let consistent = match &*entry {
                        Track::Known(expected) => *expected == observed,
                        Track::Suffix(suffix) => observed.ends_with(suffix),
                        Track::Exact(_) => unreachable!("list keys never track Exact"),
                    };
                    if consistent {
                        *entry = Track::Known(observed);
                    } else {
                        let expected = match &*entry {
                            Track::Known(items) | Track::Suffix(items) => {
                                Value::ints(items.iter().copied())
                            }
                            Track::Exact(_) => unreachable!(),
                        };
                        found.push(Anomaly::Internal {
                            op: txn.op as usize,
                            mop: pos,
                            key: (*key).clone(),
                            expected,
                            observed: Value::ints(observed),
                        });
                    }
                }
                (Workload::WriteRegister, Mop::Write { key, value }) => {
                    state.insert(key.as_str(), Track::Exact(Version::Val(*value)));
                }
                (Workload::WriteRegister, Mop::Cas { key, old, new }) => {
                    if let Some(Track::Exact(expected)) = state.get(key.as_str()) {
                        if *expected != Version::Val(*old) {
                            found.push(Anomaly::Internal {
                                op: txn.op as usize,
                                mop: pos,
                                key: (*key).clone(),
                                expected: version_value(*expected),
                                observed: Value::Int(*old),
                            });
                        }
                    }
                    state.insert(key.as_str(), Track::Exact(Version::Val(*new)));
                }
                (Workload::WriteRegister, Mop::Read { key, value }) => {
                    let nil = Value::Nil;
                    let value = value.as_ref().unwrap_or(&nil);
                    let observed = if value.is_nil() {
                        Version::Init
                    } else if let Some(v) = value.as_int() {
                        Version::Val(v)
                    } else {
                        continue;
                    };
                    if let Some(Track::Exact(expected)) = state.get(key.as_str()) {
                        if *expected != observed {
                            found.push(Anomaly::Internal {
                                op: txn.op as usize,
                                mop: pos,
                                key: (*key).clone(),
                                expected: version_value(*expected),
                                observed: version_value(observed),
                            });
                        }
                    }
                    state.insert(key.as_str(), Track::Exact(observed));
                }
                _ => {}
            }
        }
    }
    found
}

fn list_observation(value: &Value) -> Option<Vec<i64>> {
    if value.is_nil() {
        Some(Vec::new())
    } else {
        value.as_int_list()
    }
}

const fn version_value(version: Version) -> Value {
    match version {
        Version::Init => Value::Nil,
        Version::Val(v) => Value::Int(v),
    }
}
