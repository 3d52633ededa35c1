//! The indexed, immutable operation stream and its derived lookup tables.

pub mod error;
pub mod op;
pub mod value;

pub use error::HistoryError;
pub use op::{Fun, Kind, Op, Process};
pub use value::{Key, Mop, MopParseError, Value, Version};

use hashbrown::HashMap;

/// An indexed history: a dense, immutable vector of operations.
///
/// Construction via [`History::index`] assigns `index = 0..n-1` in input
/// order; operations are never mutated afterwards. All downstream analysis
/// is a deterministic function of this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    ops: Vec<Op>,
}

impl History {
    /// Ingest operations, assigning dense indexes in input order.
    #[must_use]
    pub fn index(mut ops: Vec<Op>) -> Self {
        for (i, op) in ops.iter_mut().enumerate() {
            op.index = i;
        }
        Self { ops }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Op> {
        self.ops.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter()
    }

    pub fn oks(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter().filter(|op| op.kind == Kind::Ok)
    }

    pub fn fails(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter().filter(|op| op.kind == Kind::Fail)
    }

    pub fn infos(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter().filter(|op| op.kind == Kind::Info)
    }

    /// All operations by client processes, nemesis events stripped.
    pub fn client_ops(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter().filter(|op| op.process.is_client())
    }

    pub fn by_process(&self, process: Process) -> impl Iterator<Item = &Op> + '_ {
        self.ops.iter().filter(move |op| op.process == process)
    }

    /// Pair every invocation with its completion.
    ///
    /// Also serves as the type-sanity check: each process must be
    /// sequential, completions must follow their invocations, and no
    /// completion may arrive without a pending invocation.
    ///
    /// # Errors
    ///
    /// Returns the first [`HistoryError`] in index order.
    pub fn pair_index(&self) -> Result<PairIndex, HistoryError> {
        let n = self.ops.len();
        let mut completion = vec![None; n];
        let mut invocation = vec![None; n];
        let mut pending: HashMap<Process, usize> = HashMap::new();

        for op in &self.ops {
            // Nemesis events are unpaired by construction.
            if !op.process.is_client() {
                continue;
            }
            match op.kind {
                Kind::Invoke => {
                    if let Some(&prev) = pending.get(&op.process) {
                        return Err(HistoryError::ConcurrentInvoke {
                            process: op.process,
                            pending: prev,
                            index: op.index,
                        });
                    }
                    pending.insert(op.process, op.index);
                }
                Kind::Ok | Kind::Fail | Kind::Info => {
                    let Some(invoke) = pending.remove(&op.process) else {
                        return Err(HistoryError::DanglingCompletion {
                            process: op.process,
                            index: op.index,
                        });
                    };
                    if self.ops[invoke].f != op.f {
                        return Err(HistoryError::MismatchedCompletion {
                            process: op.process,
                            invoke,
                            index: op.index,
                        });
                    }
                    completion[invoke] = Some(op.index);
                    invocation[op.index] = Some(invoke);
                }
            }
        }

        Ok(PairIndex {
            completion,
            invocation,
        })
    }

    /// Verify the structural invariants without retaining the pairing.
    ///
    /// # Errors
    ///
    /// Returns the first [`HistoryError`] in index order.
    pub fn check_sanity(&self) -> Result<(), HistoryError> {
        self.pair_index().map(|_| ())
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Op;
    type IntoIter = core::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// Invocation/completion pairing for a [`History`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairIndex {
    completion: Vec<Option<usize>>,
    invocation: Vec<Option<usize>>,
}

impl PairIndex {
    /// The completion of the invocation at `index`, if it completed within
    /// the recorded window.
    #[must_use]
    pub fn completion_of(&self, index: usize) -> Option<usize> {
        self.completion.get(index).copied().flatten()
    }

    /// The invocation of the completion at `index`.
    #[must_use]
    pub fn invocation_of(&self, index: usize) -> Option<usize> {
        self.invocation.get(index).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(ops: Vec<Op>) -> History {
        History::index(ops)
    }

    #[test]
    fn index_assigns_dense_positions() {
        let h = indexed(vec![
            Op::invoke(0, Fun::Write, Value::Int(1)),
            Op::ok(0, Fun::Write, Value::Int(1)),
        ]);
        assert_eq!(h.get(0).unwrap().index, 0);
        assert_eq!(h.get(1).unwrap().index, 1);
    }

    #[test]
    fn pairing_matches_invokes_to_completions() {
        let h = indexed(vec![
            Op::invoke(0, Fun::Write, Value::Int(1)),
            Op::invoke(1, Fun::Read, Value::Nil),
            Op::ok(1, Fun::Read, Value::Int(1)),
            Op::ok(0, Fun::Write, Value::Int(1)),
        ]);
        let pairs = h.pair_index().unwrap();
        assert_eq!(pairs.completion_of(0), Some(3));
        assert_eq!(pairs.completion_of(1), Some(2));
        assert_eq!(pairs.invocation_of(2), Some(1));
        assert_eq!(pairs.invocation_of(3), Some(0));
        assert_eq!(pairs.completion_of(2), None);
    }

    #[test]
    fn concurrent_invoke_is_rejected() {
        let h = indexed(vec![
            Op::invoke(0, Fun::Write, Value::Int(1)),
            Op::invoke(0, Fun::Write, Value::Int(2)),
        ]);
        assert_eq!(
            h.check_sanity(),
            Err(HistoryError::ConcurrentInvoke {
                process: Process::Client(0),
                pending: 0,
                index: 1,
            })
        );
    }

    #[test]
    fn dangling_completion_is_rejected() {
        let h = indexed(vec![Op::ok(0, Fun::Write, Value::Int(1))]);
        assert!(matches!(
            h.check_sanity(),
            Err(HistoryError::DanglingCompletion { index: 0, .. })
        ));
    }

    #[test]
    fn mismatched_completion_is_rejected() {
        let h = indexed(vec![
            Op::invoke(0, Fun::Write, Value::Int(1)),
            Op::ok(0, Fun::Read, Value::Int(1)),
        ]);
        assert!(matches!(
            h.check_sanity(),
            Err(HistoryError::MismatchedCompletion {
                invoke: 0,
                index: 1,
                ..
            })
        ));
    }

    #[test]
    fn open_invocations_are_allowed() {
        let h = indexed(vec![Op::invoke(0, Fun::Write, Value::Int(1))]);
        let pairs = h.pair_index().unwrap();
        assert_eq!(pairs.completion_of(0), None);
    }

    #[test]
    fn filters() {
        let h = indexed(vec![
            Op::invoke(0, Fun::Write, Value::Int(1)),
            Op::new(Process::Nemesis, Kind::Info, Fun::Start, Value::Nil),
            Op::ok(0, Fun::Write, Value::Int(1)),
            Op::invoke(1, Fun::Write, Value::Int(2)),
            Op::fail(1, Fun::Write, Value::Int(2)),
        ]);
        assert_eq!(h.oks().count(), 1);
        assert_eq!(h.fails().count(), 1);
        assert_eq!(h.infos().count(), 1);
        assert_eq!(h.client_ops().count(), 4);
        assert_eq!(h.by_process(Process::Client(1)).count(), 2);
    }
}
