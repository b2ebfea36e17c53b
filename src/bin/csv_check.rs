//! Check a routes CSV before uploading it.
//!
//! Exit codes: 0 ok, 1 unreadable, 2 missing columns, 3 invalid rows, 64 usage.

use schoolroutes::{
    ingest::{normalize_and_validate, read_table, ValidateOptions, REQUIRED_COLUMNS},
    RouteError,
};
use std::{env, fs, process::ExitCode};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [path] = args.as_slice() else {
        println!("Usage: csv_check <CSV_PATH>");
        return ExitCode::from(64);
    };

    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            println!("[ERROR] cannot read {path}: {e}");
            return ExitCode::from(1);
        }
    };

    let (raw, encoding) = match read_table(&bytes) {
        Ok(t) => t,
        Err(e) => {
            println!("[ERROR] {e}");
            return ExitCode::from(1);
        }
    };
    debug!(encoding = encoding.as_str(), "decoded");

    let table = match normalize_and_validate(raw, &ValidateOptions::default()) {
        Ok(t) => t,
        Err(RouteError::Schema { missing, found }) => {
            println!("[ERROR] missing required columns: {}", missing.join(", "));
            println!("Detected headers (normalized): {found:?}");
            println!("Expected exactly: {}", REQUIRED_COLUMNS.join(", "));
            return ExitCode::from(2);
        }
        Err(e) => {
            println!("[ERROR] {e}");
            return ExitCode::from(1);
        }
    };

    println!(
        "[OK] read CSV with encoding '{}'. Data rows: {}",
        encoding.as_str(),
        table.len()
    );
    if !table.report.out_of_range.is_empty() {
        println!(
            "[WARN] {} rows with coordinates outside lon/lat range (lines: {:?})",
            table.report.out_of_range.len(),
            &table.report.out_of_range[..table.report.out_of_range.len().min(15)]
        );
    }
    if table.report.is_clean() {
        println!("[OK] every row has numeric latitudes/longitudes.");
        ExitCode::SUCCESS
    } else {
        for msg in table.report.messages() {
            println!("[WARN] {msg}");
        }
        ExitCode::from(3)
    }
}
