//! Render structured witnesses as human-readable text.
//!
//! The witness data is authoritative; rendering is a pure function of it
//! plus the workload (which only changes the verbs: registers are
//! written, lists are appended to).

use core::fmt::Write as _;

use crate::checker::anomaly::{Anomaly, CycleStep, CycleWitness, Evidence};
use crate::history::Version;
use crate::txn::Workload;

/// One sentence for one cycle edge.
#[must_use]
pub fn render_step(step: &CycleStep, workload: Workload) -> String {
    let from = step.from;
    let to = step.to;
    let append = workload == Workload::ListAppend;
    match &step.evidence {
        Evidence::WriteRead { key, version } => {
            if append {
                format!("T{from} appended {version} to {key}, which T{to} observed")
            } else {
                format!("T{from} wrote {key} = {version}, which T{to} read")
            }
        }
        Evidence::WriteWrite { key, v1, v2 } => {
            if append {
                format!("T{from} appended {v1} to {key}, which T{to} followed by appending {v2}")
            } else {
                format!("T{from} wrote {key} = {v1}, which T{to} overwrote with {v2}")
            }
        }
        Evidence::ReadWrite { key, v1, v2 } => match (append, v1) {
            (true, Version::Init) => {
                format!("T{from} observed {key} empty, which T{to} extended by appending {v2}")
            }
            (true, _) => format!(
                "T{from} observed {key} ending in {v1}, which T{to} extended by appending {v2}"
            ),
            (false, Version::Init) => {
                format!("T{from} read {key} unwritten, which T{to} overwrote with {v2}")
            }
            (false, _) => {
                format!("T{from} read {key} = {v1}, which T{to} overwrote with {v2}")
            }
        },
        Evidence::ProcessOrder { process } => {
            format!("process {process} executed T{from} before T{to}")
        }
        Evidence::RealtimeOrder => format!("T{from} completed before T{to} was invoked"),
        Evidence::MonotonicReads { key, v1, v2 } => {
            format!("T{from} read {key} = {v1}, a lower value than T{to}'s read of {v2}")
        }
        Evidence::Unlabeled => format!("T{from} precedes T{to} ({})", step.rel),
    }
}

/// The full cycle, one sentence per edge, closing the loop.
#[must_use]
pub fn render_cycle(witness: &CycleWitness, workload: Workload) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} cycle of {} operations:",
        witness.kind,
        witness.steps.len()
    );
    for step in &witness.steps {
        let _ = writeln!(out, "  {}.", render_step(step, workload));
    }
    out
}

/// Render any anomaly as a short report.
#[must_use]
pub fn render_anomaly(anomaly: &Anomaly, workload: Workload) -> String {
    match anomaly {
        Anomaly::Cycle(witness) => render_cycle(witness, workload),
        Anomaly::AbortedRead {
            op,
            writer,
            key,
            element,
        } => format!(
            "T{op} read {element} of {key}, which was written only by failed operation T{writer}.\n"
        ),
        Anomaly::IntermediateRead {
            op,
            writer,
            key,
            version,
            overwritten_with,
        } => format!(
            "T{op} read {version} of {key}, an intermediate value T{writer} replaced with {overwritten_with}.\n"
        ),
        Anomaly::Internal {
            op,
            mop,
            key,
            expected,
            observed,
        } => format!(
            "T{op} micro-op {mop} observed {key} = {observed}, but its own prior operations imply {expected}.\n"
        ),
        Anomaly::IncompatibleOrder { key, ops, observed } => {
            let mut out = format!("reads of {key} observed incompatible orders:\n");
            for (op, list) in ops.iter().zip(observed) {
                let _ = writeln!(out, "  T{op} observed {list:?}");
            }
            out
        }
        Anomaly::CyclicVersions { key, source, edge } => format!(
            "version order for {key} from source {source} contradicts stronger sources at {} -> {}.\n",
            edge.0, edge.1
        ),
        Anomaly::MultipleWriters {
            key,
            version,
            writers,
        } => {
            let writers: Vec<String> = writers.iter().map(|w| format!("T{w}")).collect();
            format!(
                "{} claim the same write {key} = {version}; unique-write inference is unsound here.\n",
                writers.join(", ")
            )
        }
        Anomaly::DuplicateElements {
            key,
            element,
            writers,
        } => {
            let writers: Vec<String> = writers.iter().map(|w| format!("T{w}")).collect();
            format!(
                "element {element} was appended to {key} more than once ({}).\n",
                writers.join(", ")
            )
        }
        Anomaly::EmptyTransactionGraph => {
            "no committed transactions to analyze; the transaction graph is empty.\n".to_string()
        }
        Anomaly::Nonlinearizable(cx) => {
            let mut out = format!(
                "no serialization explains completion T{} (ops 0..={}):\n",
                cx.op, cx.prefix
            );
            let order: Vec<String> = cx.linearized.iter().map(|op| format!("T{op}")).collect();
            let _ = writeln!(out, "  longest linearizable prefix: [{}]", order.join(" "));
            let _ = writeln!(out, "  model state there: {}", cx.state);
            out
        }
        Anomaly::Timeout => "analysis deadline expired; verdict is unknown.\n".to_string(),
    }
}
