//! DSL macros for building test histories.
//!
//! `history!` produces an indexed [`verdict_core::History`]; one line per
//! operation, in the compact `process: kind f value` form:
//!
//! ```ignore
//! history! {
//!     0: invoke txn [(append x 1), (r y _)],
//!     0: ok     txn [(append x 1), (r y [1])],
//!     1: invoke write 2,
//!     1: ok     write 2,
//!     2: invoke read _,
//!     2: ok     read [1, 2],
//! }
//! ```
//!
//! - `_` is nil; `[..]` is a list; anything else is an integer.
//! - Micro-ops are parenthesized: `(r k _)`, `(r k [1, 2])`, `(r k 3)`,
//!   `(w k 3)`, `(append k 3)`, `(cas k 1 2)`.

/// Build a single micro-op.
#[macro_export]
macro_rules! mop {
    (r $k:ident _) => {
        verdict_core::history::Mop::read(stringify!($k))
    };
    (r $k:ident [ $($e:expr),* $(,)? ]) => {
        verdict_core::history::Mop::read_list(stringify!($k), [$($e),*])
    };
    (r $k:ident $v:expr) => {
        verdict_core::history::Mop::read_int(stringify!($k), $v)
    };
    (w $k:ident $v:expr) => {
        verdict_core::history::Mop::write(stringify!($k), $v)
    };
    (append $k:ident $e:expr) => {
        verdict_core::history::Mop::append(stringify!($k), $e)
    };
    (cas $k:ident $old:literal $new:literal) => {
        verdict_core::history::Mop::cas(stringify!($k), $old, $new)
    };
}

/// Map a kind keyword to [`verdict_core::history::Kind`].
#[macro_export]
macro_rules! kind_of {
    (invoke) => {
        verdict_core::history::Kind::Invoke
    };
    (ok) => {
        verdict_core::history::Kind::Ok
    };
    (fail) => {
        verdict_core::history::Kind::Fail
    };
    (info) => {
        verdict_core::history::Kind::Info
    };
}

/// Map an operation keyword to [`verdict_core::history::Fun`].
#[macro_export]
macro_rules! fun_of {
    (txn) => {
        verdict_core::history::Fun::Txn
    };
    (read) => {
        verdict_core::history::Fun::Read
    };
    (write) => {
        verdict_core::history::Fun::Write
    };
    (cas) => {
        verdict_core::history::Fun::Cas
    };
    (add) => {
        verdict_core::history::Fun::Add
    };
    (acquire) => {
        verdict_core::history::Fun::Acquire
    };
    (release) => {
        verdict_core::history::Fun::Release
    };
}

/// Build one operation.
#[macro_export]
macro_rules! op {
    ($p:literal : $kind:ident txn [ $(($($m:tt)+)),* $(,)? ]) => {
        verdict_core::history::Op::new(
            verdict_core::history::Process::Client($p),
            $crate::kind_of!($kind),
            verdict_core::history::Fun::Txn,
            verdict_core::history::Mop::to_list(&[$($crate::mop!($($m)+)),*]),
        )
    };
    ($p:literal : $kind:ident $f:ident _) => {
        verdict_core::history::Op::new(
            verdict_core::history::Process::Client($p),
            $crate::kind_of!($kind),
            $crate::fun_of!($f),
            verdict_core::history::Value::Nil,
        )
    };
    ($p:literal : $kind:ident $f:ident [ $($e:expr),* $(,)? ]) => {
        verdict_core::history::Op::new(
            verdict_core::history::Process::Client($p),
            $crate::kind_of!($kind),
            $crate::fun_of!($f),
            verdict_core::history::Value::ints([$($e),*]),
        )
    };
    ($p:literal : $kind:ident $f:ident $v:expr) => {
        verdict_core::history::Op::new(
            verdict_core::history::Process::Client($p),
            $crate::kind_of!($kind),
            $crate::fun_of!($f),
            verdict_core::history::Value::Int($v),
        )
    };
}

/// Build an indexed history from op lines.
#[macro_export]
macro_rules! history {
    ($($p:literal : $kind:ident $f:ident $value:tt),* $(,)?) => {
        verdict_core::History::index(vec![
            $($crate::op!($p : $kind $f $value)),*
        ])
    };
}
