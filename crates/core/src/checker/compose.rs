use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::checker::result::{CheckResult, ComposedResult, Validity};
use crate::history::History;

/// Shared deadline and cancellation for one analysis run.
///
/// Checkers poll [`expired`](Self::expired) at every loop whose iteration
/// cost is non-trivial and yield partial results with `timeout = true`
/// when it fires.
#[derive(Debug, Clone, Default)]
pub struct CheckCtx {
    deadline: Option<Instant>,
    cancel: Arc<AtomicBool>,
}

impl CheckCtx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose deadline is `limit` from now.
    #[must_use]
    pub fn with_time_limit(limit: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(limit),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation of every checker sharing this context.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// A consistency checker over a recorded history.
///
/// Implementations never panic on bad input: structural problems become
/// `unknown` results carrying a diagnostic.
pub trait Checker: Send + Sync {
    fn check(&self, history: &History, ctx: &CheckCtx) -> CheckResult;
}

impl<C: Checker + ?Sized> Checker for Box<C> {
    fn check(&self, history: &History, ctx: &CheckCtx) -> CheckResult {
        (**self).check(history, ctx)
    }
}

/// An ordered set of labeled sub-checkers run in parallel over one
/// history.
///
/// Labels are unique by construction of the result map; each sub-checker
/// owns its own result slot, so parallel runs never contend on an anomaly
/// key. The merged verdict is the conjunction of the parts.
#[derive(Default)]
pub struct CheckerSet {
    entries: Vec<(String, Box<dyn Checker>)>,
}

impl CheckerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, label: impl Into<String>, checker: impl Checker + 'static) -> Self {
        self.entries.push((label.into(), Box::new(checker)));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every sub-checker and merge the verdicts.
    #[must_use]
    pub fn run(&self, history: &History, ctx: &CheckCtx) -> ComposedResult {
        tracing::debug!(
            checkers = self.entries.len(),
            ops = history.len(),
            "running checker set"
        );

        let results: Vec<(String, CheckResult)> = self
            .entries
            .par_iter()
            .map(|(label, checker)| {
                tracing::debug!(checker = %label, "sub-checker start");
                let result = checker.check(history, ctx);
                tracing::debug!(checker = %label, validity = %result.validity, "sub-checker done");
                (label.clone(), result)
            })
            .collect();

        let mut validity = Validity::True;
        let mut map = BTreeMap::new();
        for (label, result) in results {
            validity = validity.and(result.validity);
            map.insert(label, result);
        }

        ComposedResult {
            validity,
            results: map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::anomaly::Anomaly;

    struct Fixed(CheckResult);

    impl Checker for Fixed {
        fn check(&self, _history: &History, _ctx: &CheckCtx) -> CheckResult {
            self.0.clone()
        }
    }

    struct Slow;

    impl Checker for Slow {
        fn check(&self, _history: &History, ctx: &CheckCtx) -> CheckResult {
            while !ctx.expired() {
                std::thread::sleep(Duration::from_millis(1));
            }
            CheckResult::from_anomalies([Anomaly::Timeout], true)
        }
    }

    #[test]
    fn empty_set_is_valid() {
        let set = CheckerSet::new();
        let result = set.run(&History::default(), &CheckCtx::new());
        assert_eq!(result.validity, Validity::True);
        assert!(result.results.is_empty());
    }

    #[test]
    fn verdicts_conjoin() {
        let set = CheckerSet::new()
            .with("a", Fixed(CheckResult::valid()))
            .with("b", Fixed(CheckResult::error("input problem")));
        let result = set.run(&History::default(), &CheckCtx::new());
        assert_eq!(result.validity, Validity::Unknown);
        assert_eq!(result.results["a"].validity, Validity::True);
        assert_eq!(result.results["b"].validity, Validity::Unknown);
    }

    #[test]
    fn unknown_does_not_absorb_false() {
        let set = CheckerSet::new()
            .with("a", Fixed(CheckResult::error("unknown")))
            .with(
                "b",
                Fixed(CheckResult::from_anomalies(
                    [Anomaly::EmptyTransactionGraph],
                    false,
                )),
            )
            .with(
                "c",
                Fixed(CheckResult {
                    validity: Validity::False,
                    anomalies: BTreeMap::new(),
                    timeout: false,
                    error: None,
                }),
            );
        let result = set.run(&History::default(), &CheckCtx::new());
        assert_eq!(result.validity, Validity::False);
    }

    #[test]
    fn deadline_surfaces_as_timeout() {
        let set = CheckerSet::new().with("slow", Slow);
        let ctx = CheckCtx::with_time_limit(Duration::from_millis(10));
        let result = set.run(&History::default(), &ctx);
        assert_eq!(result.validity, Validity::Unknown);
        assert!(result.results["slow"].timeout);
    }

    #[test]
    fn cancellation_stops_checkers() {
        let set = CheckerSet::new().with("slow", Slow);
        let ctx = CheckCtx::new();
        ctx.cancel();
        let result = set.run(&History::default(), &ctx);
        assert!(result.results["slow"].timeout);
    }
}
