use core::fmt::{self, Display, Formatter};
use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::checker::anomaly::Anomaly;
use crate::checker::error::CheckError;
use crate::history::{Fun, History, Key, Kind, Mop, MopParseError, PairIndex, Version};
use crate::txn::Workload;

/// A transaction payload that is not a well-formed micro-op list,
/// with the offending operation's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadError {
    pub index: usize,
    pub source: MopParseError,
}

impl Display for PayloadError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "malformed payload at op {}: {}", self.index, self.source)
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// One transaction: a client `txn` invocation paired with its completion.
///
/// The completion's index is the transaction's canonical vertex in every
/// dependency graph.
#[derive(Debug, Clone)]
pub struct TxnView {
    pub op: u32,
    pub invoke: u32,
    pub kind: Kind,
    pub mops: Vec<Mop>,
}

/// What a read observed: a register scalar or a list prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObsValue {
    Scalar(Version),
    List(Vec<i64>),
}

impl ObsValue {
    /// The version identifying the observed state. A list state is
    /// identified by its last element; an empty list is the initial state.
    #[must_use]
    pub fn version(&self) -> Version {
        match self {
            Self::Scalar(v) => *v,
            Self::List(items) => items.last().map_or(Version::Init, |&e| Version::Val(e)),
        }
    }
}

/// An external read: the first observation of a key by a transaction,
/// before any of its own writes to that key.
#[derive(Debug, Clone)]
pub struct ReadObs {
    pub op: u32,
    pub mop: usize,
    pub value: ObsValue,
}

/// Per-key indexes of writers, readers, failed and intermediate writes.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    /// Committed (and possibly-committed `info`) writers per version.
    pub writers: BTreeMap<i64, Vec<u32>>,
    /// Writers whose transaction definitely had no effect.
    pub failed: BTreeMap<i64, Vec<u32>>,
    /// Versions a committed transaction overwrote within itself:
    /// `version -> (writer, overwriting version)`.
    pub intermediate: BTreeMap<i64, (u32, i64)>,
    /// External read observations, in operation order.
    pub reads: Vec<ReadObs>,
    /// Readers per observed version.
    pub readers: BTreeMap<Version, Vec<u32>>,
}

/// The transactional view of a history: parsed micro-ops plus per-key
/// indexes. Built once, then shared read-only by the extractors.
#[derive(Debug, Clone)]
pub struct TxnIndex {
    pub workload: Workload,
    /// History length; the vertex space of every dependency graph.
    pub op_count: usize,
    /// Committed and indeterminate transactions, in completion order.
    pub txns: Vec<TxnView>,
    /// Completion index -> position in `txns`.
    pub by_op: HashMap<u32, usize>,
    pub keys: BTreeMap<Key, KeyIndex>,
    pub pairs: PairIndex,
}

impl TxnIndex {
    /// Index a history for transactional analysis.
    ///
    /// Input-sanity findings (duplicate appends, multiple writers of one
    /// version) are pushed into `anomalies`; they degrade the verdict but
    /// do not stop the analysis.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] when the history is structurally broken or
    /// an operation payload cannot be parsed as a micro-op list.
    pub fn build(
        history: &History,
        workload: Workload,
        anomalies: &mut Vec<Anomaly>,
    ) -> Result<Self, CheckError> {
        let pairs = history.pair_index()?;
        let mut index = Self {
            workload,
            op_count: history.len(),
            txns: Vec::new(),
            by_op: HashMap::new(),
            keys: BTreeMap::new(),
            pairs,
        };

        for op in history.client_ops() {
            if op.f != Fun::Txn || !op.kind.is_completion() {
                continue;
            }
            // A nil payload (an indeterminate completion the runner knew
            // nothing about) is an empty transaction.
            let mops = if op.value.is_nil() {
                Vec::new()
            } else {
                Mop::parse_list(&op.value).map_err(|e| PayloadError {
                    index: op.index,
                    source: e,
                })?
            };
            let completion = u32::try_from(op.index).expect("op index fits u32");

            match op.kind {
                Kind::Fail => index.index_failed(completion, &mops),
                Kind::Ok | Kind::Info => {
                    let invoke = index
                        .pairs
                        .invocation_of(op.index)
                        .expect("completion was paired");
                    index.index_txn(
                        TxnView {
                            op: completion,
                            invoke: u32::try_from(invoke).expect("op index fits u32"),
                            kind: op.kind,
                            mops,
                        },
                        anomalies,
                    );
                }
                Kind::Invoke => unreachable!("filtered above"),
            }
        }

        tracing::debug!(
            txns = index.txns.len(),
            keys = index.keys.len(),
            workload = ?index.workload,
            "indexed transactions"
        );
        Ok(index)
    }

    #[must_use]
    pub fn key(&self, key: &Key) -> Option<&KeyIndex> {
        self.keys.get(key)
    }

    /// Does the transaction at completion index `op` read or write `key`?
    #[must_use]
    pub fn touches(&self, op: u32, key: &Key) -> bool {
        self.by_op
            .get(&op)
            .is_some_and(|&i| self.txns[i].mops.iter().any(|m| m.key() == key))
    }

    /// Writes of definitely-aborted transactions never become versions;
    /// they only feed the aborted-read scan.
    fn index_failed(&mut self, op: u32, mops: &[Mop]) {
        for mop in mops {
            match mop {
                Mop::Write { key, value } | Mop::Cas { key, new: value, .. } => {
                    self.keys
                        .entry(key.clone())
                        .or_default()
                        .failed
                        .entry(*value)
                        .or_default()
                        .push(op);
                }
                Mop::Append { key, element } => {
                    self.keys
                        .entry(key.clone())
                        .or_default()
                        .failed
                        .entry(*element)
                        .or_default()
                        .push(op);
                }
                Mop::Read { .. } => {}
            }
        }
    }

    fn index_txn(&mut self, txn: TxnView, anomalies: &mut Vec<Anomaly>) {
        let op = txn.op;
        let committed = txn.kind == Kind::Ok;
        // Keys this transaction has already written, for internal-read
        // classification, plus the write chain per key.
        let mut written: HashMap<&Key, Vec<i64>> = HashMap::new();
        let mut seen_read: hashbrown::HashSet<&Key> = hashbrown::HashSet::new();

        for (mop_pos, mop) in txn.mops.iter().enumerate() {
            match mop {
                Mop::Read { key, value } => {
                    if written.contains_key(key) {
                        continue; // internal read, judged by the internal scan
                    }
                    // A nil read in an indeterminate completion is not an
                    // observation; in an `ok` it observes the initial state.
                    let observed = match value {
                        Some(v) if !v.is_nil() => v.clone(),
                        _ if committed => crate::history::Value::Nil,
                        _ => continue,
                    };
                    if !seen_read.insert(key) {
                        continue; // repeatable-read disagreements are internal anomalies
                    }
                    let obs = match self.workload {
                        Workload::ListAppend => {
                            if observed.is_nil() {
                                Some(ObsValue::List(Vec::new()))
                            } else {
                                observed.as_int_list().map(ObsValue::List)
                            }
                        }
                        Workload::WriteRegister | Workload::Counter => {
                            if observed.is_nil() {
                                Some(ObsValue::Scalar(Version::Init))
                            } else {
                                observed.as_int().map(|v| ObsValue::Scalar(Version::Val(v)))
                            }
                        }
                    };
                    if let Some(obs) = obs {
                        let entry = self.keys.entry(key.clone()).or_default();
                        entry.readers.entry(obs.version()).or_default().push(op);
                        entry.reads.push(ReadObs {
                            op,
                            mop: mop_pos,
                            value: obs,
                        });
                    }
                }
                Mop::Write { key, value } => {
                    written.entry(key).or_default().push(*value);
                }
                Mop::Cas { key, old, new } => {
                    // A successful compare-and-set observes the old value
                    // and installs the new one.
                    if !written.contains_key(key) && seen_read.insert(key) {
                        let entry = self.keys.entry(key.clone()).or_default();
                        entry
                            .readers
                            .entry(Version::Val(*old))
                            .or_default()
                            .push(op);
                        entry.reads.push(ReadObs {
                            op,
                            mop: mop_pos,
                            value: ObsValue::Scalar(Version::Val(*old)),
                        });
                    }
                    written.entry(key).or_default().push(*new);
                }
                Mop::Append { key, element } => {
                    let entry = self.keys.entry(key.clone()).or_default();
                    let writers = entry.writers.entry(*element).or_default();
                    if !writers.is_empty() {
                        anomalies.push(Anomaly::DuplicateElements {
                            key: key.clone(),
                            element: *element,
                            writers: writers
                                .iter()
                                .map(|&w| w as usize)
                                .chain([op as usize])
                                .collect(),
                        });
                    }
                    writers.push(op);
                    written.entry(key).or_default().push(*element);
                }
            }
        }

        // Register writes: the last write per key is the external version;
        // earlier ones are intermediate. Appends were indexed above, and
        // every non-final append is intermediate.
        let mut chains: Vec<(&Key, Vec<i64>)> = written.into_iter().collect();
        chains.sort_by(|a, b| a.0.cmp(b.0));
        for (key, chain) in chains {
            let entry = self.keys.entry(key.clone()).or_default();
            if self.workload == Workload::WriteRegister {
                let &external = chain.last().expect("chain is non-empty");
                let writers = entry.writers.entry(external).or_default();
                if !writers.is_empty() {
                    anomalies.push(Anomaly::MultipleWriters {
                        key: key.clone(),
                        version: external,
                        writers: writers
                            .iter()
                            .map(|&w| w as usize)
                            .chain([op as usize])
                            .collect(),
                    });
                }
                writers.push(op);
            }
            if committed {
                for pair in chain.windows(2) {
                    entry.intermediate.insert(pair[0], (op, pair[1]));
                }
            }
        }

        drop(seen_read);
        self.by_op.insert(op, self.txns.len());
        self.txns.push(txn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Op;

    fn txn_ok(process: u64, mops: &[Mop]) -> [Op; 2] {
        [
            Op::invoke(process, Fun::Txn, Mop::to_list(mops)),
            Op::ok(process, Fun::Txn, Mop::to_list(mops)),
        ]
    }

    fn build(ops: Vec<Op>, workload: Workload) -> (TxnIndex, Vec<Anomaly>) {
        let history = History::index(ops);
        let mut anomalies = Vec::new();
        let index = TxnIndex::build(&history, workload, &mut anomalies).unwrap();
        (index, anomalies)
    }

    #[test]
    fn indexes_writers_and_readers() {
        let mut ops = Vec::new();
        ops.extend(txn_ok(0, &[Mop::append("x", 1)]));
        ops.extend(txn_ok(1, &[Mop::read_list("x", [1])]));
        let (index, anomalies) = build(ops, Workload::ListAppend);

        assert!(anomalies.is_empty());
        assert_eq!(index.txns.len(), 2);
        let x = index.key(&"x".to_string()).unwrap();
        assert_eq!(x.writers[&1], vec![1]);
        assert_eq!(x.readers[&Version::Val(1)], vec![3]);
    }

    #[test]
    fn internal_reads_are_excluded() {
        let mut ops = Vec::new();
        ops.extend(txn_ok(0, &[Mop::append("x", 1), Mop::read_list("x", [1])]));
        let (index, _) = build(ops, Workload::ListAppend);
        let x = index.key(&"x".to_string()).unwrap();
        assert!(x.reads.is_empty());
    }

    #[test]
    fn failed_writes_never_become_versions() {
        let mut ops = Vec::new();
        ops.push(Op::invoke(0, Fun::Txn, Mop::to_list(&[Mop::append("x", 1)])));
        ops.push(Op::fail(0, Fun::Txn, Mop::to_list(&[Mop::append("x", 1)])));
        let (index, _) = build(ops, Workload::ListAppend);
        let x = index.key(&"x".to_string()).unwrap();
        assert!(x.writers.is_empty());
        assert_eq!(x.failed[&1], vec![1]);
    }

    #[test]
    fn duplicate_appends_are_reported() {
        let mut ops = Vec::new();
        ops.extend(txn_ok(0, &[Mop::append("x", 1)]));
        ops.extend(txn_ok(1, &[Mop::append("x", 1)]));
        let (_, anomalies) = build(ops, Workload::ListAppend);
        assert!(matches!(
            anomalies.as_slice(),
            [Anomaly::DuplicateElements { element: 1, .. }]
        ));
    }

    #[test]
    fn register_intermediate_writes_are_tracked() {
        let mut ops = Vec::new();
        ops.extend(txn_ok(0, &[Mop::write("x", 1), Mop::write("x", 2)]));
        let (index, anomalies) = build(ops, Workload::WriteRegister);
        assert!(anomalies.is_empty());
        let x = index.key(&"x".to_string()).unwrap();
        assert_eq!(x.writers.len(), 1);
        assert!(x.writers.contains_key(&2));
        assert_eq!(x.intermediate[&1], (1, 2));
    }

    #[test]
    fn register_duplicate_versions_are_reported() {
        let mut ops = Vec::new();
        ops.extend(txn_ok(0, &[Mop::write("x", 7)]));
        ops.extend(txn_ok(1, &[Mop::write("x", 7)]));
        let (_, anomalies) = build(ops, Workload::WriteRegister);
        assert!(matches!(
            anomalies.as_slice(),
            [Anomaly::MultipleWriters { version: 7, .. }]
        ));
    }

    #[test]
    fn info_nil_reads_are_not_observations() {
        let mut ops = Vec::new();
        ops.push(Op::invoke(0, Fun::Txn, Mop::to_list(&[Mop::read("x")])));
        ops.push(Op::info(0, Fun::Txn, Mop::to_list(&[Mop::read("x")])));
        let (index, _) = build(ops, Workload::ListAppend);
        assert!(index.keys.get(&"x".to_string()).is_none_or(|k| k.reads.is_empty()));
    }

    #[test]
    fn ok_nil_read_observes_initial_state() {
        let mut ops = Vec::new();
        ops.extend(txn_ok(0, &[Mop::read("x")]));
        let (index, _) = build(ops, Workload::ListAppend);
        let x = index.key(&"x".to_string()).unwrap();
        assert_eq!(x.readers[&Version::Init], vec![1]);
    }

    #[test]
    fn cas_reads_old_and_writes_new() {
        let mut ops = Vec::new();
        ops.extend(txn_ok(0, &[Mop::cas("x", 1, 2)]));
        let (index, _) = build(ops, Workload::WriteRegister);
        let x = index.key(&"x".to_string()).unwrap();
        assert_eq!(x.readers[&Version::Val(1)], vec![1]);
        assert!(x.writers.contains_key(&2));
    }
}
