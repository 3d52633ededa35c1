//! History-based consistency checking for distributed systems.
//!
//! `verdict_core` decides whether a recorded history of client operations
//! could have been produced by a legal execution of a given consistency
//! model. Two families of checkers are provided:
//!
//! 1. **Transactional isolation** -- builds a typed dependency graph over
//!    transactions (write-read, write-write, read-write, process order,
//!    realtime order) and searches it for cycles, which are classified into
//!    the Adya anomaly hierarchy: G0 (write cycle), G1a (aborted read),
//!    G1b (intermediate read), G1c (circular information flow), G-single
//!    (single anti-dependency cycle), and G2 (anti-dependency cycle).
//! 2. **Linearizability** -- searches over interleavings of concurrent
//!    operations against a pure abstract model (compare-and-set register,
//!    counter, grow-only set, mutex), returning a structured counterexample
//!    when no valid serialization exists.
//!
//! Anomalies are data, not exceptions: every checker returns a
//! [`CheckResult`] holding a verdict and concrete witnesses. Given the same
//! input history, every checker produces byte-identical output, including
//! the vertex order of reported cycles.
//!
//! # Entry point
//!
//! Checkers are composed with [`CheckerSet`] and run in parallel under a
//! shared deadline:
//!
//! ```rust,ignore
//! use verdict_core::checker::{CheckCtx, CheckerSet};
//! use verdict_core::txn::{TxnChecker, TxnOpts, Workload};
//!
//! let set = CheckerSet::new()
//!     .with("append", TxnChecker::new(Workload::ListAppend, TxnOpts::default()));
//! let result = set.run(&history, &CheckCtx::default());
//! assert!(result.validity.is_ok());
//! ```
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` on the operation wire
//!   format and on verdict trees ([`Op`](history::Op), [`Value`](history::Value),
//!   [`CheckResult`], anomalies).

pub mod checker;
pub mod graph;
pub mod history;
pub mod linear;
pub mod txn;

pub use checker::{CheckCtx, CheckError, CheckResult, Checker, CheckerSet, ComposedResult, Validity};
pub use history::History;
