//! Linearizability checking of single-object concurrent histories.

pub mod model;
pub mod wgl;

pub use model::{Inconsistent, Model};
pub use wgl::{CallRec, Outcome};

use crate::checker::anomaly::Anomaly;
use crate::checker::compose::{CheckCtx, Checker};
use crate::checker::result::CheckResult;
use crate::history::{Fun, History, Kind};

/// Decides whether a history of register/counter/set operations is
/// linearizable against an abstract [`Model`].
#[derive(Debug, Clone)]
pub struct LinearChecker {
    pub model: Model,
}

impl LinearChecker {
    #[must_use]
    pub const fn new(model: Model) -> Self {
        Self { model }
    }
}

impl Checker for LinearChecker {
    fn check(&self, history: &History, ctx: &CheckCtx) -> CheckResult {
        let pairs = match history.pair_index() {
            Ok(pairs) => pairs,
            Err(err) => return CheckResult::error(err.to_string()),
        };

        let mut calls: Vec<CallRec> = Vec::new();
        for op in history.client_ops() {
            if op.kind != Kind::Invoke {
                continue;
            }
            match pairs.completion_of(op.index).map(|c| &history.ops()[c]) {
                Some(completion) if completion.kind == Kind::Ok => calls.push(CallRec {
                    invoke: op.index,
                    ret: Some(completion.index),
                    f: op.f,
                    // Reads carry nil until completion fills them in.
                    value: completion.value.clone(),
                }),
                // A definite failure had no effect; drop both halves.
                Some(completion) if completion.kind == Kind::Fail => {}
                // Indeterminate or still open. A timed-out read has no
                // effect either way, so remapping it to `fail` is sound
                // and prunes a pending-forever branch; anything else may
                // have taken effect at any later time, or never.
                _ if op.f == Fun::Read => {}
                _ => calls.push(CallRec {
                    invoke: op.index,
                    ret: None,
                    f: op.f,
                    value: op.value.clone(),
                }),
            }
        }

        tracing::debug!(calls = calls.len(), model = ?self.model, "linearizability search");

        match wgl::search(&self.model, &calls, ctx) {
            Outcome::Linearizable { order } => {
                tracing::debug!(linearized = order.len(), "linearizable");
                CheckResult::valid()
            }
            Outcome::Nonlinearizable(cx) => {
                CheckResult::from_anomalies([Anomaly::Nonlinearizable(cx)], false)
            }
            Outcome::Timeout => CheckResult::from_anomalies([Anomaly::Timeout], true),
        }
    }
}
