use anyhow::{Context, Result};
use schoolroutes::{export, Config, ErrorResponse, RouteService, SessionId};
use serde::Serialize;
use std::{env, fs, num::NonZeroUsize, path::PathBuf, process::ExitCode};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Serialize)]
struct RunSummary<'a> {
    total_routes: usize,
    total_km: f64,
    skipped_rows: &'a [usize],
    geojson: PathBuf,
    csv: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) args + config ────────────────────────────────────────────
    let mut args = env::args().skip(1);
    let Some(csv_path) = args.next().map(PathBuf::from) else {
        eprintln!("Usage: schoolroutes <CSV_PATH> [LIMIT]");
        return Ok(ExitCode::from(64));
    };
    let limit = match args.next() {
        Some(raw) => Some(
            raw.parse::<NonZeroUsize>()
                .with_context(|| format!("LIMIT must be a positive integer, got {raw:?}"))?,
        ),
        None => None,
    };
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap_or_else(|_| "out".to_string()));

    let config = Config::from_env()?;
    info!(mode = ?config.mode, enrichment = config.directions.is_some(), "startup");
    let service = RouteService::from_config(config).context("building route service")?;
    let session = SessionId::default();

    // ─── 3) upload ───────────────────────────────────────────────────
    let bytes =
        fs::read(&csv_path).with_context(|| format!("reading {}", csv_path.display()))?;
    let upload = match service.upload(&session, &bytes) {
        Ok(summary) => summary,
        Err(e) => {
            error!("upload failed: {}", e);
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            return Ok(ExitCode::from(2));
        }
    };
    info!(
        rows = upload.rows,
        invalid = upload.invalid_rows,
        encoding = upload.encoding.as_str(),
        "uploaded {}",
        csv_path.display()
    );

    // ─── 4) compute (+ enrichment when configured) ───────────────────
    let routes = match service.compute_enriched(&session, limit).await {
        Ok(routes) => routes,
        Err(e) => {
            error!("compute failed: {}", e);
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            return Ok(ExitCode::from(3));
        }
    };

    // ─── 5) export ───────────────────────────────────────────────────
    let stem = csv_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "routes".to_string());
    let (geojson, csv) = export::export_files(&routes, &out_dir, &stem)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&RunSummary {
            total_routes: routes.count,
            total_km: routes.total_km,
            skipped_rows: &routes.skipped,
            geojson,
            csv,
        })?
    );

    info!("all done");
    Ok(ExitCode::SUCCESS)
}
