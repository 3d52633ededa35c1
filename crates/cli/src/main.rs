use std::path::Path;
use std::time::Duration;
use std::{fs, process};

use clap::Parser;
use verdict_cli::{store, App, CheckArgs, Command, FmtArgs, GenerateArgs};
use verdict_core::checker::CheckCtx;
use verdict_core::{History, Validity};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    match &app.command {
        Command::Check(args) => check(args),
        Command::Generate(args) => generate(args),
        Command::Fmt(args) => fmt(args),
    }
}

fn read_history(path: &Path) -> Result<History, String> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "jsonl" => store::read_history_jsonl(path).map_err(|e| e.to_string()),
        "json" => {
            let file = fs::File::open(path).map_err(|e| e.to_string())?;
            let document: verdict_testgen::GeneratedHistory =
                serde_json::from_reader(file).map_err(|e| e.to_string())?;
            Ok(document.into_history())
        }
        _ => {
            let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
            verdict_parser::parse_history(&text).map_err(|e| e.to_string())
        }
    }
}

fn check(args: &CheckArgs) {
    let history = read_history(&args.history).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {e}", args.history.display());
        process::exit(2);
    });

    let set = args.checker_set().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(2);
    });

    let ctx = args.time_limit.map_or_else(CheckCtx::new, |secs| {
        CheckCtx::with_time_limit(Duration::from_secs(secs))
    });

    let result = set.run(&history, &ctx);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).expect("verdict tree serializes")
        );
    } else {
        println!("valid?: {}", result.validity);
        for (label, sub) in &result.results {
            let mut counts: Vec<String> = Vec::new();
            for (kind, anomalies) in &sub.anomalies {
                counts.push(format!("{kind} x{}", anomalies.len()));
            }
            let detail = if counts.is_empty() {
                "clean".to_string()
            } else {
                counts.join(", ")
            };
            println!("  {label}: {} ({detail})", sub.validity);
            if let Some(error) = &sub.error {
                println!("    error: {error}");
            }
        }
    }

    if let Some(dir) = &args.out {
        store::write_store(dir, &history, &result, args.render_workload()).unwrap_or_else(|e| {
            eprintln!("Failed to write {}: {e}", dir.display());
            process::exit(2);
        });
    }

    process::exit(match result.validity {
        Validity::True => 0,
        Validity::False => 1,
        Validity::Unknown => 2,
    });
}

fn generate(args: &GenerateArgs) {
    fs::create_dir_all(&args.output_dir).unwrap_or_else(|e| {
        eprintln!("Failed to create output directory: {e}");
        process::exit(2);
    });

    let params = verdict_testgen::GenParams::builder()
        .id(0)
        .n_process(args.n_process)
        .n_key(args.n_key)
        .n_txn(args.n_txn)
        .n_mop(args.n_mop)
        .workload(args.workload.into())
        .build();
    let histories = verdict_testgen::generate_mult_histories(args.n_hist, &params);

    for history in &histories {
        let path = args.output_dir.join(format!("{}.json", history.get_id()));
        let file = fs::File::create(&path).unwrap_or_else(|e| {
            eprintln!("Failed to create {}: {e}", path.display());
            process::exit(2);
        });
        serde_json::to_writer_pretty(file, history).unwrap_or_else(|e| {
            eprintln!("Failed to write {}: {e}", path.display());
            process::exit(2);
        });
    }

    println!(
        "Generated {} histories to {}",
        histories.len(),
        args.output_dir.display()
    );
}

fn fmt(args: &FmtArgs) {
    let mut unformatted = false;

    for path in &args.paths {
        let text = fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Failed to read {}: {e}", path.display());
            process::exit(2);
        });
        let history = verdict_parser::parse_history(&text).unwrap_or_else(|e| {
            eprintln!("{}: {e}", path.display());
            process::exit(2);
        });
        let formatted = verdict_parser::format_history(&history);

        if formatted == text {
            continue;
        }
        if args.check {
            println!("{}: needs formatting", path.display());
            unformatted = true;
        } else {
            fs::write(path, formatted).unwrap_or_else(|e| {
                eprintln!("Failed to write {}: {e}", path.display());
                process::exit(2);
            });
            println!("{}: formatted", path.display());
        }
    }

    if unformatted {
        process::exit(1);
    }
}
