// src/export/mod.rs
use crate::error::RouteResult;
use crate::routes::engine::{DESTINATION_NAME_COLUMN, ORIGIN_NAME_COLUMN};
use crate::routes::{to_feature_collection, FeatureCollection, RouteCollection, RouteRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

pub const ACCESSIBILITY_COLUMN: &str = "accesibilidad";
const DEFAULT_ACCESSIBILITY: &str = "Estándar";

const FIXED_COLUMNS: [&str; 10] = [
    "id",
    "origen",
    "origen_latitud",
    "origen_longitud",
    "destino",
    "destino_latitud",
    "destino_longitud",
    "distancia_km",
    "tiempo_minutos",
    ACCESSIBILITY_COLUMN,
];

const FOLDED_COLUMNS: [&str; 3] =
    [ORIGIN_NAME_COLUMN, DESTINATION_NAME_COLUMN, ACCESSIBILITY_COLUMN];

/// Passthrough columns not already folded into the fixed columns.
fn extra_columns(route: &RouteRecord) -> impl Iterator<Item = &(String, String)> {
    route
        .passthrough
        .iter()
        .filter(|(name, _)| !FOLDED_COLUMNS.contains(&name.as_str()))
}

/// One CSV row per route with distance and travel time appended.
pub fn write_routes_csv<W: Write>(routes: &RouteCollection, w: W) -> RouteResult<()> {
    let mut wtr = WriterBuilder::new().from_writer(w);

    let mut header: Vec<&str> = FIXED_COLUMNS.to_vec();
    if let Some(first) = routes.routes.first() {
        header.extend(extra_columns(first).map(|(name, _)| name.as_str()));
    }
    wtr.write_record(&header)?;

    for r in &routes.routes {
        let accessibility = r
            .passthrough
            .iter()
            .find(|(name, value)| name == ACCESSIBILITY_COLUMN && !value.trim().is_empty())
            .map_or(DEFAULT_ACCESSIBILITY, |(_, value)| value.as_str());

        let mut record = vec![
            r.id.to_string(),
            r.origin_name.clone(),
            r.origin.lat.to_string(),
            r.origin.lon.to_string(),
            r.destination_name.clone(),
            r.destination.lat.to_string(),
            r.destination.lon.to_string(),
            format!("{:.2}", r.dist_km),
            format!("{:.2}", r.time_min),
            accessibility.to_string(),
        ];
        record.extend(extra_columns(r).map(|(_, value)| value.clone()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct GeoJsonExport {
    #[serde(flatten)]
    collection: FeatureCollection,
    exported_at: String,
}

/// The route FeatureCollection stamped with its export time.
pub fn write_geojson<W: Write>(
    routes: &RouteCollection,
    w: W,
    exported_at: DateTime<Utc>,
) -> RouteResult<()> {
    let doc = GeoJsonExport {
        collection: to_feature_collection(routes),
        exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    serde_json::to_writer_pretty(w, &doc)?;
    Ok(())
}

/// Write `<stem>.geojson` and `<stem>_routes.csv` into `out_dir`.
pub fn export_files(
    routes: &RouteCollection,
    out_dir: &Path,
    stem: &str,
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let geojson_path = out_dir.join(format!("{stem}.geojson"));
    let file = File::create(&geojson_path)
        .with_context(|| format!("creating {}", geojson_path.display()))?;
    write_geojson(routes, BufWriter::new(file), Utc::now())
        .with_context(|| format!("writing {}", geojson_path.display()))?;

    let csv_path = out_dir.join(format!("{stem}_routes.csv"));
    let file =
        File::create(&csv_path).with_context(|| format!("creating {}", csv_path.display()))?;
    write_routes_csv(routes, BufWriter::new(file))
        .with_context(|| format!("writing {}", csv_path.display()))?;

    info!(
        geojson = %geojson_path.display(),
        csv = %csv_path.display(),
        routes = routes.count,
        "exports written"
    );
    Ok((geojson_path, csv_path))
}
