//! Random workload generation: well-formed histories for exercising the
//! checkers and the CLI.
//!
//! Generated histories satisfy the operation-stream contract: dense
//! indexes, monotone times, sequential processes, reads nil on
//! invocation and filled on completion, and coherent observations (every
//! read sees a state the history really produced).

pub mod generator;

pub use generator::{
    generate_mult_histories, generate_single_history, GenParams, GenWorkload, GeneratedHistory,
};
