//! The persisted run layout:
//!
//! ```text
//! <out>/history.jsonl            canonical history, one op per line
//! <out>/results.json             the verdict tree
//! <out>/anomalies/<kind>/<n>.txt one rendered witness per file
//! ```

use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

use verdict_core::checker::ComposedResult;
use verdict_core::txn::{explain, Workload};
use verdict_core::History;

/// Write a history as canonical JSONL.
///
/// # Errors
///
/// Returns any I/O or serialization error.
pub fn write_history_jsonl(path: &Path, history: &History) -> io::Result<()> {
    let mut file = io::BufWriter::new(fs::File::create(path)?);
    for op in history {
        serde_json::to_writer(&mut file, op).map_err(io::Error::other)?;
        file.write_all(b"\n")?;
    }
    file.flush()
}

/// Read a history from canonical JSONL.
///
/// # Errors
///
/// Returns any I/O or parse error.
pub fn read_history_jsonl(path: &Path) -> io::Result<History> {
    let content = fs::read_to_string(path)?;
    let mut ops = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        ops.push(serde_json::from_str(line).map_err(io::Error::other)?);
    }
    Ok(History::index(ops))
}

/// Write the full run layout under `dir`.
///
/// # Errors
///
/// Returns any I/O or serialization error.
pub fn write_store(
    dir: &Path,
    history: &History,
    result: &ComposedResult,
    workload: Workload,
) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    write_history_jsonl(&dir.join("history.jsonl"), history)?;

    let results = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
    fs::write(dir.join("results.json"), results)?;

    for sub in result.results.values() {
        for (kind, anomalies) in &sub.anomalies {
            let kind_dir = dir.join("anomalies").join(kind.name());
            fs::create_dir_all(&kind_dir)?;
            for (n, anomaly) in anomalies.iter().enumerate() {
                fs::write(
                    kind_dir.join(format!("{n}.txt")),
                    explain::render_anomaly(anomaly, workload),
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use verdict_core::checker::{CheckCtx, CheckResult, CheckerSet, Validity};
    use verdict_core::history::{Fun, Mop, Op};
    use verdict_core::txn::{TxnChecker, TxnOpts};

    use super::*;

    fn sample_history() -> History {
        let append = Mop::to_list(&[Mop::append("x", 1)]);
        let read_invoke = Mop::to_list(&[Mop::read("x")]);
        let read_ok = Mop::to_list(&[Mop::read_list("x", [1])]);
        History::index(vec![
            Op::invoke(0, Fun::Txn, append.clone()),
            Op::fail(0, Fun::Txn, append),
            Op::invoke(1, Fun::Txn, read_invoke),
            Op::ok(1, Fun::Txn, read_ok),
        ])
    }

    #[test]
    fn jsonl_roundtrip_is_identity() {
        let dir = std::env::temp_dir().join(format!("verdict-store-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("history.jsonl");

        let history = sample_history();
        write_history_jsonl(&path, &history).unwrap();
        let back = read_history_jsonl(&path).unwrap();
        assert_eq!(back, history);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn store_layout_is_written() {
        let dir = std::env::temp_dir().join(format!("verdict-run-{}", std::process::id()));
        let history = sample_history();
        let set = CheckerSet::new().with(
            "append",
            TxnChecker::new(Workload::ListAppend, TxnOpts::default()),
        );
        let result = set.run(&history, &CheckCtx::new());
        assert_eq!(result.validity, Validity::False);

        write_store(&dir, &history, &result, Workload::ListAppend).unwrap();

        assert!(dir.join("history.jsonl").is_file());
        assert!(dir.join("results.json").is_file());
        assert!(dir.join("anomalies").join("G1a").join("0.txt").is_file());
        let witness = fs::read_to_string(dir.join("anomalies/G1a/0.txt")).unwrap();
        assert!(witness.contains("failed"));

        // The verdict tree parses back.
        let text = fs::read_to_string(dir.join("results.json")).unwrap();
        let parsed: ComposedResult = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, result);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_results_serialize_compactly() {
        let result = ComposedResult {
            validity: Validity::True,
            results: BTreeMap::from([("r".to_string(), CheckResult::valid())]),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"valid?":true,"results":{"r":{"valid?":true}}}"#);
    }
}
