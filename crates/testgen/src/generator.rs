use std::collections::HashMap;

use chrono::{DateTime, Duration, Local};
use rand::distr::{Distribution, Uniform};
use rand::RngExt;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use verdict_core::history::{Fun, Mop, Op, Value};

/// Which transactional workload to generate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum GenWorkload {
    #[default]
    ListAppend,
    Register,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, TypedBuilder)]
pub struct GenParams {
    pub id: u64,
    pub n_process: u64,
    pub n_key: u64,
    pub n_txn: u64,
    pub n_mop: u64,
    #[builder(default)]
    pub workload: GenWorkload,
}

/// A generated history with its parameters and wall-clock bounds.
#[derive(Deserialize, Serialize, Debug)]
pub struct GeneratedHistory {
    params: GenParams,
    info: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    data: Vec<Op>,
}

impl GeneratedHistory {
    #[must_use]
    pub const fn get_id(&self) -> u64 {
        self.params.id
    }

    #[must_use]
    pub const fn get_data(&self) -> &Vec<Op> {
        &self.data
    }

    #[must_use]
    pub const fn get_params(&self) -> &GenParams {
        &self.params
    }

    #[must_use]
    pub fn get_duration(&self) -> Duration {
        self.end - self.start
    }

    #[must_use]
    pub fn into_history(self) -> verdict_core::History {
        verdict_core::History::index(self.data)
    }
}

/// Generate a single well-formed history.
///
/// # Coherence invariant
///
/// Every generated read observes a state the history actually produced:
/// a `latest` map tracks each key's current register value or list, reads
/// sample from it, and writes draw from per-key counters so versions and
/// elements are unique. Every transaction commits, each process runs one
/// operation at a time, `index` is dense and `time` monotonic, and reads
/// are nil on invocation and filled in on completion.
///
/// # Panics
///
/// Panics if `n_key` is zero (cannot sample from an empty key range).
#[must_use]
pub fn generate_single_history(params: &GenParams) -> Vec<Op> {
    let mut counters: HashMap<u64, i64> = HashMap::new();
    let mut latest: HashMap<u64, Vec<i64>> = HashMap::new();
    let mut rng = rand::rng();
    let key_range = Uniform::new(0, params.n_key).unwrap();

    let mut ops = Vec::new();
    let mut clock: i64 = 0;

    for txn in 0..params.n_txn {
        let process = txn % params.n_process.max(1);

        let mut invoke_mops = Vec::new();
        let mut ok_mops = Vec::new();
        for _ in 0..params.n_mop {
            let key = key_range.sample(&mut rng);
            let key_name = format!("k{key}");
            let want_read = rng.random::<bool>();
            if want_read {
                invoke_mops.push(Mop::read(key_name.clone()));
                let state = latest.get(&key);
                let observed = match params.workload {
                    GenWorkload::ListAppend => state.map_or(Value::List(Vec::new()), |items| {
                        Value::ints(items.iter().copied())
                    }),
                    GenWorkload::Register => state
                        .and_then(|items| items.last().copied())
                        .map_or(Value::Nil, Value::Int),
                };
                ok_mops.push(Mop::Read {
                    key: key_name,
                    value: Some(observed),
                });
            } else {
                let version = {
                    let entry = counters.entry(key).or_default();
                    *entry += 1;
                    *entry
                };
                let mop = match params.workload {
                    GenWorkload::ListAppend => {
                        latest.entry(key).or_default().push(version);
                        Mop::append(key_name, version)
                    }
                    GenWorkload::Register => {
                        latest.insert(key, vec![version]);
                        Mop::write(key_name, version)
                    }
                };
                invoke_mops.push(mop.clone());
                ok_mops.push(mop);
            }
        }

        let mut invoke = Op::invoke(process, Fun::Txn, Mop::to_list(&invoke_mops));
        invoke.time = clock;
        clock += 1_000;
        let mut ok = Op::ok(process, Fun::Txn, Mop::to_list(&ok_mops));
        ok.time = clock;
        clock += 1_000;
        ops.push(invoke);
        ops.push(ok);
    }

    ops
}

/// Generate a batch of histories in parallel.
#[must_use]
pub fn generate_mult_histories(n_hist: u64, params: &GenParams) -> Vec<GeneratedHistory> {
    (0..n_hist)
        .into_par_iter()
        .map(|id| {
            let start = Local::now();
            let data = generate_single_history(&GenParams {
                id,
                ..params.clone()
            });
            let end = Local::now();
            GeneratedHistory {
                params: GenParams {
                    id,
                    ..params.clone()
                },
                info: "generated".to_string(),
                start,
                end,
                data,
            }
        })
        .collect()
}
