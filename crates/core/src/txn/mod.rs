//! Transactional-isolation checking.
//!
//! The pipeline: index the history's transactions, run the direct scans
//! (internal consistency, aborted and intermediate reads), infer per-key
//! version orders, emit the typed dependency graph, then search it for
//! cycles and classify them into the Adya hierarchy.

pub mod cycles;
pub mod deps;
pub mod explain;
pub mod g1;
pub mod index;
pub mod order;
pub mod version_order;

pub use index::{PayloadError, TxnIndex};
pub use version_order::{VoOpts, VoSource};

use hashbrown::HashMap;

use crate::checker::anomaly::{Anomaly, AnomalyKind, Evidence};
use crate::checker::compose::{CheckCtx, Checker};
use crate::checker::result::CheckResult;
use crate::graph::{DepGraphBuilder, Rel};
use crate::history::History;

/// Evidence recorded for every emitted dependency edge, keyed by
/// `(from, to, relation)`.
pub type EvidenceMap = HashMap<(u32, u32, Rel), Evidence>;

/// The transactional workload families the extractors understand.
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Transactions append unique elements to per-key lists and read the
    /// lists back; observed prefixes order versions directly.
    ListAppend,
    /// Transactions write unique scalars to per-key registers; version
    /// orders come from assumptions and read-write composition.
    WriteRegister,
    /// Per-key monotonic counters; only the ordering graphs apply.
    Counter,
}

/// Options for the transactional checker.
#[derive(Debug, Clone)]
pub struct TxnOpts {
    /// Anomaly classes to search for, before expansion.
    pub anomalies: Vec<AnomalyKind>,
    /// Infer version order from reads followed by writes in one
    /// transaction.
    pub wfr_keys: bool,
    /// Assume each key is sequentially consistent per process.
    pub sequential_keys: bool,
    /// Assume each key is linearizable.
    pub linearizable_keys: bool,
    /// Include the process order in the combined graph.
    pub process_order: bool,
    /// Include the realtime order in the combined graph.
    pub realtime_order: bool,
}

impl Default for TxnOpts {
    fn default() -> Self {
        Self {
            anomalies: vec![AnomalyKind::G1, AnomalyKind::G2, AnomalyKind::Internal],
            wfr_keys: false,
            sequential_keys: false,
            linearizable_keys: false,
            process_order: true,
            realtime_order: true,
        }
    }
}

/// The transactional-isolation checker.
#[derive(Debug, Clone)]
pub struct TxnChecker {
    pub workload: Workload,
    pub opts: TxnOpts,
}

impl TxnChecker {
    #[must_use]
    pub const fn new(workload: Workload, opts: TxnOpts) -> Self {
        Self { workload, opts }
    }
}

impl Checker for TxnChecker {
    fn check(&self, history: &History, ctx: &CheckCtx) -> CheckResult {
        let mut anomalies: Vec<Anomaly> = Vec::new();

        let index = match TxnIndex::build(history, self.workload, &mut anomalies) {
            Ok(index) => index,
            Err(err) => return CheckResult::error(err.to_string()),
        };
        if index.txns.is_empty() {
            return CheckResult::from_anomalies([Anomaly::EmptyTransactionGraph], false);
        }

        let mut requested = AnomalyKind::expand(self.opts.anomalies.iter().copied());
        // Ordering contradictions are always meaningful and cheap to find.
        requested.insert(AnomalyKind::RealtimeViolation);

        if requested.contains(&AnomalyKind::Internal) {
            anomalies.extend(g1::internal(&index));
        }
        if requested.contains(&AnomalyKind::G1a) {
            anomalies.extend(g1::aborted_reads(&index));
        }
        if requested.contains(&AnomalyKind::G1b) {
            anomalies.extend(g1::intermediate_reads(&index));
        }

        let mut evidence = EvidenceMap::default();
        let process = order::process_graph(&index, history, &mut evidence);
        let realtime = order::realtime_graph(&index, &mut evidence);

        let mut builder = DepGraphBuilder::new(index.op_count);
        match self.workload {
            Workload::ListAppend | Workload::WriteRegister => {
                let orders = version_order::build(
                    &index,
                    VoOpts {
                        wfr: self.opts.wfr_keys,
                        sequential: self.opts.sequential_keys,
                        linearizable: self.opts.linearizable_keys,
                    },
                    &process,
                    &realtime,
                    &mut anomalies,
                );
                deps::link_wr(&mut builder, &mut evidence, &index);
                deps::link_ww_rw(&mut builder, &mut evidence, &index, &orders);
            }
            Workload::Counter => {
                let monotonic = order::monotonic_graph(&index, &mut evidence);
                for (a, b, rels) in monotonic.edges() {
                    builder.link_set(a, b, rels);
                }
            }
        }

        let mut combined = builder.freeze();
        if self.opts.process_order {
            combined = combined.union(&process);
        }
        if self.opts.realtime_order {
            combined = combined.union(&realtime);
        }

        let mut timed_out = false;
        anomalies.extend(cycles::cycle_anomalies(
            &combined,
            &requested,
            &evidence,
            ctx,
            &mut timed_out,
        ));
        if timed_out {
            anomalies.push(Anomaly::Timeout);
        }

        tracing::debug!(
            anomalies = anomalies.len(),
            timed_out,
            workload = ?self.workload,
            "transactional check done"
        );
        CheckResult::from_anomalies(anomalies, timed_out)
    }
}
