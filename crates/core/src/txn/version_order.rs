//! Per-key version orders.
//!
//! A version order is never observed directly; it is inferred from a
//! prioritized list of sources and merged one source at a time. A source
//! whose edges would make the order cyclic contradicts the evidence
//! already merged: it is dropped, reported as `cyclic-versions`, and the
//! remaining sources are still attempted.

use core::fmt::{self, Display, Formatter};
use std::collections::BTreeMap;

use crate::checker::anomaly::Anomaly;
use crate::graph::{DepGraph, DiGraph};
use crate::history::{Key, Kind, Mop, Version};
use crate::txn::index::{ObsValue, TxnIndex, TxnView};
use crate::txn::Workload;

/// Where a version-order edge came from, in merge priority order.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoSource {
    /// Every version follows the initial unwritten state.
    InitialState,
    /// A transaction read `v1` and then wrote `v2` to the same key.
    WritesFollowReads,
    /// Per-key sequential assumption over the process order.
    SequentialKeys,
    /// Per-key linearizable assumption over the realtime order.
    LinearizableKeys,
    /// Observed list prefixes totally order appended elements.
    ListAppend,
}

impl VoSource {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InitialState => "initial-state",
            Self::WritesFollowReads => "writes-follow-reads",
            Self::SequentialKeys => "sequential-keys",
            Self::LinearizableKeys => "linearizable-keys",
            Self::ListAppend => "list-append",
        }
    }
}

impl Display for VoSource {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which optional inference sources are enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoOpts {
    pub wfr: bool,
    pub sequential: bool,
    pub linearizable: bool,
}

/// The merged per-key version orders, as sorted edge lists.
#[derive(Debug, Clone, Default)]
pub struct VersionOrders {
    pub per_key: BTreeMap<Key, Vec<(Version, Version)>>,
}

/// The first version a transaction interacts with on `key`: its external
/// read if any, otherwise its first write.
fn first_version(txn: &TxnView, key: &Key, workload: Workload) -> Option<Version> {
    for mop in &txn.mops {
        if mop.key() != key {
            continue;
        }
        return match mop {
            Mop::Read { value: Some(v), .. } => observed_version(v, workload),
            Mop::Read { value: None, .. } => None,
            Mop::Write { value, .. } => Some(Version::Val(*value)),
            Mop::Append { element, .. } => Some(Version::Val(*element)),
            Mop::Cas { old, .. } => Some(Version::Val(*old)),
        };
    }
    None
}

/// The last version a transaction leaves behind on `key`: its final
/// write if any, otherwise its read.
fn last_version(txn: &TxnView, key: &Key, workload: Workload) -> Option<Version> {
    for mop in txn.mops.iter().rev() {
        if mop.key() != key {
            continue;
        }
        return match mop {
            Mop::Read { value: Some(v), .. } => observed_version(v, workload),
            Mop::Read { value: None, .. } => None,
            Mop::Write { value, .. } => Some(Version::Val(*value)),
            Mop::Append { element, .. } => Some(Version::Val(*element)),
            Mop::Cas { new, .. } => Some(Version::Val(*new)),
        };
    }
    None
}

fn observed_version(value: &crate::history::Value, workload: Workload) -> Option<Version> {
    match workload {
        Workload::ListAppend => {
            let items = if value.is_nil() {
                Vec::new()
            } else {
                value.as_int_list()?
            };
            Some(items.last().map_or(Version::Init, |&e| Version::Val(e)))
        }
        Workload::WriteRegister | Workload::Counter => {
            if value.is_nil() {
                Some(Version::Init)
            } else {
                value.as_int().map(Version::Val)
            }
        }
    }
}

/// Build the merged version order for every key.
#[must_use]
pub fn build(
    index: &TxnIndex,
    opts: VoOpts,
    process: &DepGraph,
    realtime: &DepGraph,
    anomalies: &mut Vec<Anomaly>,
) -> VersionOrders {
    let mut orders = VersionOrders::default();

    for (key, key_index) in &index.keys {
        let mut sources: Vec<(VoSource, Vec<(Version, Version)>)> = Vec::new();

        // 1. Initial state precedes every known version.
        let mut versions: std::collections::BTreeSet<i64> =
            key_index.writers.keys().copied().collect();
        versions.extend(key_index.readers.keys().filter_map(|v| match v {
            Version::Val(v) => Some(*v),
            Version::Init => None,
        }));
        sources.push((
            VoSource::InitialState,
            versions
                .iter()
                .map(|&v| (Version::Init, Version::Val(v)))
                .collect(),
        ));

        // 2. Writes follow reads within one committed transaction.
        if opts.wfr {
            let mut edges = Vec::new();
            for read in &key_index.reads {
                let Some(&txn_pos) = index.by_op.get(&read.op) else {
                    continue;
                };
                let txn = &index.txns[txn_pos];
                if txn.kind != Kind::Ok {
                    continue;
                }
                if let Some(written) = last_written(txn, key) {
                    let v1 = read.value.version();
                    if v1 != Version::Val(written) {
                        edges.push((v1, Version::Val(written)));
                    }
                }
            }
            sources.push((VoSource::WritesFollowReads, edges));
        }

        // 3 & 4. Declared per-key orders: the ordering graph collapsed to
        // transactions touching this key yields edges from the final
        // version of one transaction to the first version of the next.
        for (enabled, source, graph) in [
            (opts.sequential, VoSource::SequentialKeys, process),
            (opts.linearizable, VoSource::LinearizableKeys, realtime),
        ] {
            if !enabled {
                continue;
            }
            let collapsed = graph.collapse(|v| index.touches(v, key));
            let mut edges = Vec::new();
            for (a, b, _) in collapsed.edges() {
                let (Some(&ta), Some(&tb)) = (index.by_op.get(&a), index.by_op.get(&b)) else {
                    continue;
                };
                let v1 = last_version(&index.txns[ta], key, index.workload);
                let v2 = first_version(&index.txns[tb], key, index.workload);
                if let (Some(v1), Some(v2)) = (v1, v2) {
                    if v1 != v2 {
                        edges.push((v1, v2));
                    }
                }
            }
            sources.push((source, edges));
        }

        // 5. Observed list prefixes give direct evidence for appends.
        if index.workload == Workload::ListAppend {
            sources.push((
                VoSource::ListAppend,
                append_evidence(key, key_index, anomalies),
            ));
        }

        // Merge in priority order, dropping any source that contradicts
        // what is already established.
        let mut merged: DiGraph<Version> = DiGraph::default();
        for (source, edges) in sources {
            if edges.is_empty() {
                continue;
            }
            let mut candidate = merged.clone();
            for &(v1, v2) in &edges {
                if v1 != v2 {
                    candidate.add_edge(v1, v2);
                }
            }
            if candidate.has_cycle() {
                let edge = candidate
                    .find_cycle_edge()
                    .expect("cyclic graph has a cycle edge");
                tracing::debug!(key = %key, source = %source, "version-order source dropped");
                anomalies.push(Anomaly::CyclicVersions {
                    key: key.clone(),
                    source,
                    edge,
                });
            } else {
                merged = candidate;
            }
        }

        orders.per_key.insert(key.clone(), merged.edges_sorted());
    }

    orders
}

/// The final value a committed transaction writes to `key`, if any.
fn last_written(txn: &TxnView, key: &Key) -> Option<i64> {
    txn.mops.iter().rev().find_map(|mop| match mop {
        Mop::Write { key: k, value } if k == key => Some(*value),
        Mop::Append { key: k, element } if k == key => Some(*element),
        Mop::Cas { key: k, new, .. } if k == key => Some(*new),
        _ => None,
    })
}

/// Order appended elements by the longest observed list; any two reads
/// whose lists are not prefix-comparable contradict each other.
fn append_evidence(
    key: &Key,
    key_index: &crate::txn::index::KeyIndex,
    anomalies: &mut Vec<Anomaly>,
) -> Vec<(Version, Version)> {
    // Distinct observed lists with the first op that observed each.
    let mut lists: Vec<(Vec<i64>, u32)> = Vec::new();
    for read in &key_index.reads {
        if let ObsValue::List(items) = &read.value {
            if !lists.iter().any(|(l, _)| l == items) {
                lists.push((items.clone(), read.op));
            }
        }
    }
    lists.sort();
    lists.sort_by_key(|(l, _)| l.len());

    for pair in lists.windows(2) {
        let (shorter, a) = &pair[0];
        let (longer, b) = &pair[1];
        if !longer.starts_with(shorter) {
            anomalies.push(Anomaly::IncompatibleOrder {
                key: key.clone(),
                ops: vec![*a as usize, *b as usize],
                observed: vec![shorter.clone(), longer.clone()],
            });
        }
    }

    let Some((longest, _)) = lists.last() else {
        return Vec::new();
    };
    let mut edges = Vec::with_capacity(longest.len());
    let mut prev = Version::Init;
    for &element in longest {
        edges.push((prev, Version::Val(element)));
        prev = Version::Val(element);
    }
    edges
}
