//! verdict CLI -- check recorded histories, generate workloads, format
//! compact history files.

pub mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use verdict_core::checker::{AnomalyKind, CheckerSet};
use verdict_core::linear::{LinearChecker, Model};
use verdict_core::txn::{TxnChecker, TxnOpts, Workload};

#[derive(Debug, Parser)]
#[command(
    name = "verdict",
    about = "History-based consistency checking for distributed systems"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a recorded history against a workload's consistency model
    Check(CheckArgs),
    /// Generate random well-formed histories
    Generate(GenerateArgs),
    /// Format compact history (.ops) files
    Fmt(FmtArgs),
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// History file: `.jsonl` (one op per line), `.json` (generated
    /// document), or compact text
    #[arg(long)]
    pub history: PathBuf,
    /// Workload the history was recorded under
    #[arg(long)]
    pub workload: WorkloadArg,
    /// Anomaly classes to search for (e.g. G1, G2, internal)
    #[arg(long, value_delimiter = ',')]
    pub anomalies: Vec<String>,
    /// Assume per-key sequential consistency when inferring version orders
    #[arg(long)]
    pub sequential_keys: bool,
    /// Assume per-key linearizability when inferring version orders
    #[arg(long)]
    pub linearizable_keys: bool,
    /// Infer version order from reads followed by writes in one transaction
    #[arg(long)]
    pub wfr_keys: bool,
    /// Analysis deadline in seconds
    #[arg(long)]
    pub time_limit: Option<u64>,
    /// Directory to write the run layout (history.jsonl, results.json,
    /// anomalies/)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Print the verdict tree as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Number of histories to generate
    #[arg(long)]
    pub n_hist: u64,
    /// Number of client processes
    #[arg(long)]
    pub n_process: u64,
    /// Number of keys
    #[arg(long)]
    pub n_key: u64,
    /// Number of transactions per history
    #[arg(long)]
    pub n_txn: u64,
    /// Number of micro-ops per transaction
    #[arg(long)]
    pub n_mop: u64,
    /// Workload to generate
    #[arg(long, default_value = "list-append")]
    pub workload: GenWorkloadArg,
    /// Output directory for generated history files
    #[arg(long)]
    pub output_dir: PathBuf,
}

#[derive(Debug, Parser)]
pub struct FmtArgs {
    /// Input files to format
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Check formatting without modifying files (exit 1 if unformatted)
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WorkloadArg {
    /// Transactions appending to per-key lists
    ListAppend,
    /// Transactions writing unique scalars to per-key registers
    Register,
    /// Per-key monotonic counters read through transactions
    Counter,
    /// A single compare-and-set register, checked for linearizability
    CasRegister,
    /// A single counter, checked for linearizability
    LinearCounter,
    /// A grow-only set, checked for linearizability
    Set,
    /// A mutex, checked for linearizability
    Mutex,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GenWorkloadArg {
    ListAppend,
    Register,
}

impl From<GenWorkloadArg> for verdict_testgen::GenWorkload {
    fn from(arg: GenWorkloadArg) -> Self {
        match arg {
            GenWorkloadArg::ListAppend => Self::ListAppend,
            GenWorkloadArg::Register => Self::Register,
        }
    }
}

impl CheckArgs {
    /// Build the checker set this invocation asks for.
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown anomaly name.
    pub fn checker_set(&self) -> Result<CheckerSet, String> {
        let mut opts = TxnOpts {
            sequential_keys: self.sequential_keys,
            linearizable_keys: self.linearizable_keys,
            wfr_keys: self.wfr_keys,
            ..TxnOpts::default()
        };
        if !self.anomalies.is_empty() {
            opts.anomalies = self
                .anomalies
                .iter()
                .map(|name| name.parse::<AnomalyKind>())
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(match self.workload {
            WorkloadArg::ListAppend => CheckerSet::new().with(
                "append",
                TxnChecker::new(Workload::ListAppend, opts),
            ),
            WorkloadArg::Register => CheckerSet::new().with(
                "register",
                TxnChecker::new(Workload::WriteRegister, opts),
            ),
            WorkloadArg::Counter => {
                CheckerSet::new().with("counter", TxnChecker::new(Workload::Counter, opts))
            }
            WorkloadArg::CasRegister => CheckerSet::new().with(
                "cas-register",
                LinearChecker::new(Model::cas_register()),
            ),
            WorkloadArg::LinearCounter => {
                CheckerSet::new().with("counter", LinearChecker::new(Model::counter()))
            }
            WorkloadArg::Set => CheckerSet::new().with("set", LinearChecker::new(Model::add_set())),
            WorkloadArg::Mutex => {
                CheckerSet::new().with("mutex", LinearChecker::new(Model::mutex()))
            }
        })
    }

    /// The workload family, for witness rendering.
    #[must_use]
    pub const fn render_workload(&self) -> Workload {
        match self.workload {
            WorkloadArg::Register => Workload::WriteRegister,
            WorkloadArg::Counter | WorkloadArg::LinearCounter => Workload::Counter,
            _ => Workload::ListAppend,
        }
    }
}
