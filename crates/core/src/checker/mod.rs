//! Checker composition: the [`Checker`] trait, verdicts, anomaly
//! vocabulary, and the parallel [`CheckerSet`] runner.

pub mod anomaly;
pub mod compose;
pub mod error;
pub mod result;

pub use anomaly::{Anomaly, AnomalyKind, Counterexample, CycleStep, CycleWitness, Evidence, Severity};
pub use compose::{CheckCtx, Checker, CheckerSet};
pub use error::CheckError;
pub use result::{CheckResult, ComposedResult, Validity};
