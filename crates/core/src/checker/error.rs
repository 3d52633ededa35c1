use core::fmt::{self, Display, Formatter};

use ::derive_more::From;

use crate::history::error::HistoryError;
use crate::txn::index::PayloadError;

/// Error returned when a history cannot be analyzed at all.
///
/// These indicate recorder or workload misuse rather than database bugs.
/// Checkers catch them, convert them to `valid? = unknown` with a
/// diagnostic, and never disturb sibling checkers.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum CheckError {
    /// The history has a structural defect.
    History(HistoryError),
    /// An operation payload could not be interpreted for its workload.
    Payload(PayloadError),
}

impl Display for CheckError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::History(err) => write!(f, "{err}"),
            Self::Payload(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::History(err) => Some(err),
            Self::Payload(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::value::MopParseError;
    use crate::history::Process;

    #[test]
    fn sub_errors_convert_via_from() {
        let history_err = HistoryError::DanglingCompletion {
            process: Process::Client(2),
            index: 5,
        };
        let err: CheckError = history_err.clone().into();
        assert_eq!(err, CheckError::History(history_err));

        let payload_err = PayloadError {
            index: 3,
            source: MopParseError {
                position: 1,
                detail: "unknown micro-op tag \"q\"".to_string(),
            },
        };
        let err: CheckError = payload_err.clone().into();
        assert_eq!(err, CheckError::Payload(payload_err));
    }

    #[test]
    fn display_names_the_offending_op() {
        let err = CheckError::from(PayloadError {
            index: 7,
            source: MopParseError {
                position: 0,
                detail: "transaction payload must be a list, got 3".to_string(),
            },
        });
        assert_eq!(
            err.to_string(),
            "malformed payload at op 7: micro-op 0: transaction payload must be a list, got 3"
        );
    }
}
