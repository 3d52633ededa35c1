use core::fmt::{self, Display, Formatter};
use core::str::FromStr;

use crate::graph::rel::Rel;
use crate::history::value::{Key, Value, Version};
use crate::txn::version_order::VoSource;

/// The anomaly classes a checker can report.
///
/// `G1` is an umbrella: requesting it expands to G1a, G1b and G1c, and it
/// never appears in a result. The remaining kinds are concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnomalyKind {
    /// Write cycle: a cycle of write-write dependencies.
    G0,
    /// Aborted read: an `ok` read observed a value written only by a
    /// failed transaction.
    G1a,
    /// Intermediate read: an `ok` read observed a value a committed
    /// transaction overwrote within itself.
    G1b,
    /// Circular information flow: a cycle of ww/wr dependencies with at
    /// least one wr edge.
    G1c,
    /// Umbrella for G1a + G1b + G1c.
    G1,
    /// A dependency cycle with exactly one anti-dependency edge.
    GSingle,
    /// A dependency cycle with two or more anti-dependency edges.
    G2,
    /// A transaction disagreeing with its own prior reads and writes.
    Internal,
    /// A cycle of ordering edges only: a later operation observed an
    /// earlier state.
    RealtimeViolation,
    /// Two reads of the same key observed non-prefix-comparable lists.
    IncompatibleOrder,
    /// A version-order source contradicted the evidence already merged.
    CyclicVersions,
    /// Two operations claim the same write, breaking uniqueness inference.
    MultipleWriters,
    /// The same element appended twice.
    DuplicateElements,
    /// No committed transactions to analyze.
    EmptyTransactionGraph,
    /// No valid serialization of the concurrent history exists.
    Nonlinearizable,
    /// The deadline expired before analysis finished.
    Timeout,
}

/// Whether an anomaly refutes the model or merely degrades the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The history definitely violates the model: `valid? = false`.
    Fatal,
    /// Test or workload misuse, or incomplete analysis: `valid? = unknown`.
    Undetermined,
}

impl AnomalyKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::G0 => "G0",
            Self::G1a => "G1a",
            Self::G1b => "G1b",
            Self::G1c => "G1c",
            Self::G1 => "G1",
            Self::GSingle => "G-single",
            Self::G2 => "G2",
            Self::Internal => "internal",
            Self::RealtimeViolation => "realtime-violation",
            Self::IncompatibleOrder => "incompatible-order",
            Self::CyclicVersions => "cyclic-versions",
            Self::MultipleWriters => "multiple-writers",
            Self::DuplicateElements => "duplicate-elements",
            Self::EmptyTransactionGraph => "empty-transaction-graph",
            Self::Nonlinearizable => "nonlinearizable",
            Self::Timeout => "timeout",
        }
    }

    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::G0
            | Self::G1a
            | Self::G1b
            | Self::G1c
            | Self::G1
            | Self::GSingle
            | Self::G2
            | Self::Internal
            | Self::RealtimeViolation
            | Self::IncompatibleOrder
            | Self::CyclicVersions
            | Self::Nonlinearizable => Severity::Fatal,
            Self::MultipleWriters
            | Self::DuplicateElements
            | Self::EmptyTransactionGraph
            | Self::Timeout => Severity::Undetermined,
        }
    }

    /// Close a requested anomaly set under the implication rules:
    /// G2 implies G-single and G1c; G1 implies G1a, G1b and G1c; G1c
    /// implies G0. The umbrella `G1` is expanded away.
    #[must_use]
    pub fn expand<I: IntoIterator<Item = Self>>(requested: I) -> std::collections::BTreeSet<Self> {
        let mut set: std::collections::BTreeSet<Self> = requested.into_iter().collect();
        loop {
            let mut grew = false;
            for kind in set.clone() {
                let implied: &[Self] = match kind {
                    Self::G2 => &[Self::GSingle, Self::G1c],
                    Self::G1 => &[Self::G1a, Self::G1b, Self::G1c],
                    Self::G1c => &[Self::G0],
                    _ => &[],
                };
                for &k in implied {
                    grew |= set.insert(k);
                }
            }
            if !grew {
                break;
            }
        }
        set.remove(&Self::G1);
        set
    }
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnomalyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        match lowered.as_str() {
            "g0" => Ok(Self::G0),
            "g1a" => Ok(Self::G1a),
            "g1b" => Ok(Self::G1b),
            "g1c" => Ok(Self::G1c),
            "g1" => Ok(Self::G1),
            "g-single" | "gsingle" => Ok(Self::GSingle),
            "g2" => Ok(Self::G2),
            "internal" => Ok(Self::Internal),
            "realtime-violation" => Ok(Self::RealtimeViolation),
            "incompatible-order" => Ok(Self::IncompatibleOrder),
            "cyclic-versions" => Ok(Self::CyclicVersions),
            "multiple-writers" => Ok(Self::MultipleWriters),
            "duplicate-elements" => Ok(Self::DuplicateElements),
            "empty-transaction-graph" => Ok(Self::EmptyTransactionGraph),
            "nonlinearizable" => Ok(Self::Nonlinearizable),
            "timeout" => Ok(Self::Timeout),
            _ => Err(format!("unknown anomaly kind {s:?}")),
        }
    }
}

#[cfg(feature = "serde")]
impl ::serde::Serialize for AnomalyKind {
    fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(feature = "serde")]
impl<'de> ::serde::Deserialize<'de> for AnomalyKind {
    fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(::serde::de::Error::custom)
    }
}

/// Why one edge of a cycle exists: the key, the versions, and what the
/// two operations did to them. Rendering is a pure function of this data.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// `from` installed `version` of `key`; `to` observed it.
    WriteRead { key: Key, version: i64 },
    /// `from` installed `v1`; `to` installed its successor `v2`.
    WriteWrite { key: Key, v1: Version, v2: Version },
    /// `from` observed `v1`; `to` installed its successor `v2`.
    ReadWrite { key: Key, v1: Version, v2: Version },
    /// Successive operations of one process.
    ProcessOrder { process: u64 },
    /// `from` completed before `to` was invoked.
    RealtimeOrder,
    /// Reads of a monotonic key, ordered by value.
    MonotonicReads { key: Key, v1: i64, v2: i64 },
    /// No recorded evidence (should not appear in practice).
    Unlabeled,
}

/// One edge of a cycle witness.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStep {
    pub from: usize,
    pub to: usize,
    pub rel: Rel,
    pub evidence: Evidence,
}

/// A classified cycle: the anomaly class plus one step per edge, in
/// order, closing the loop (the last step's `to` equals the first's
/// `from`).
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleWitness {
    pub kind: AnomalyKind,
    pub steps: Vec<CycleStep>,
}

impl CycleWitness {
    /// The vertex sequence `v0, .., vn-1, v0`.
    #[must_use]
    pub fn vertices(&self) -> Vec<usize> {
        let mut vs: Vec<usize> = self.steps.iter().map(|s| s.from).collect();
        if let Some(first) = self.steps.first() {
            vs.push(first.from);
        }
        vs
    }
}

/// A witness that a concurrent history has no valid serialization.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterexample {
    /// Index of the completion that cannot be placed.
    pub op: usize,
    /// Every operation in the minimal failing prefix must linearize before
    /// this index.
    pub prefix: usize,
    /// The longest linearization reached, as completion indexes.
    pub linearized: Vec<usize>,
    /// The model state at that point.
    pub state: String,
}

/// A concrete violation witness. Anomalies are data, never exceptions.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    Cycle(CycleWitness),
    AbortedRead {
        op: usize,
        writer: usize,
        key: Key,
        element: i64,
    },
    IntermediateRead {
        op: usize,
        writer: usize,
        key: Key,
        version: i64,
        overwritten_with: i64,
    },
    Internal {
        op: usize,
        mop: usize,
        key: Key,
        expected: Value,
        observed: Value,
    },
    IncompatibleOrder {
        key: Key,
        ops: Vec<usize>,
        observed: Vec<Vec<i64>>,
    },
    CyclicVersions {
        key: Key,
        source: VoSource,
        edge: (Version, Version),
    },
    MultipleWriters {
        key: Key,
        version: i64,
        writers: Vec<usize>,
    },
    DuplicateElements {
        key: Key,
        element: i64,
        writers: Vec<usize>,
    },
    EmptyTransactionGraph,
    Nonlinearizable(Counterexample),
    Timeout,
}

impl Anomaly {
    #[must_use]
    pub const fn kind(&self) -> AnomalyKind {
        match self {
            Self::Cycle(witness) => witness.kind,
            Self::AbortedRead { .. } => AnomalyKind::G1a,
            Self::IntermediateRead { .. } => AnomalyKind::G1b,
            Self::Internal { .. } => AnomalyKind::Internal,
            Self::IncompatibleOrder { .. } => AnomalyKind::IncompatibleOrder,
            Self::CyclicVersions { .. } => AnomalyKind::CyclicVersions,
            Self::MultipleWriters { .. } => AnomalyKind::MultipleWriters,
            Self::DuplicateElements { .. } => AnomalyKind::DuplicateElements,
            Self::EmptyTransactionGraph => AnomalyKind::EmptyTransactionGraph,
            Self::Nonlinearizable(_) => AnomalyKind::Nonlinearizable,
            Self::Timeout => AnomalyKind::Timeout,
        }
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.kind().severity()
    }
}
