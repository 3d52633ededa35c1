use core::fmt::{self, Display, Formatter};

use crate::history::op::Process;

/// Structural defect in a recorded history.
///
/// These indicate a broken recorder or workload, not a database bug, and
/// every variant names the offending operation's index.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// A process invoked a second operation while one was still pending.
    ConcurrentInvoke {
        process: Process,
        pending: usize,
        index: usize,
    },
    /// A completion arrived for a process with no pending invocation.
    DanglingCompletion { process: Process, index: usize },
    /// A completion does not match its invocation's operation kind.
    MismatchedCompletion {
        process: Process,
        invoke: usize,
        index: usize,
    },
}

impl HistoryError {
    /// Index of the operation that triggered the error.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::ConcurrentInvoke { index, .. }
            | Self::DanglingCompletion { index, .. }
            | Self::MismatchedCompletion { index, .. } => *index,
        }
    }
}

impl Display for HistoryError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::ConcurrentInvoke {
                process,
                pending,
                index,
            } => write!(
                f,
                "process {process} invoked op {index} while op {pending} was still pending"
            ),
            Self::DanglingCompletion { process, index } => write!(
                f,
                "process {process} completed op {index} with no pending invocation"
            ),
            Self::MismatchedCompletion {
                process,
                invoke,
                index,
            } => write!(
                f,
                "process {process} completed op {index} which does not match invocation {invoke}"
            ),
        }
    }
}

impl std::error::Error for HistoryError {}
