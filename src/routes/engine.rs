use crate::error::{RouteError, RouteResult};
use crate::ingest::{ValidatedRow, ValidatedTable};
use crate::routes::haversine::{estimate_travel_minutes, haversine_km, Coordinate};
use serde::Serialize;
use std::num::NonZeroUsize;
use tracing::{info, warn};

pub const ORIGIN_NAME_COLUMN: &str = "nombre_origen";
pub const DESTINATION_NAME_COLUMN: &str = "nombre_destino";

/// Where a route's distance and geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceSource {
    /// Straight-line great-circle estimate.
    Haversine,
    /// Routed path reported by a directions service.
    Directions,
}

/// One computed origin→destination route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    /// 0-based row index in the stored table.
    pub id: usize,
    /// 1-based source line.
    pub line: usize,
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub origin_name: String,
    pub destination_name: String,
    pub dist_km: f64,
    pub time_min: f64,
    pub source: DistanceSource,
    /// LineString positions, `[lon, lat]`.
    pub geometry: Vec<[f64; 2]>,
    /// Non-coordinate columns, verbatim, in source order.
    pub passthrough: Vec<(String, String)>,
}

/// All routes of one compute pass plus totals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteCollection {
    pub routes: Vec<RouteRecord>,
    pub total_km: f64,
    pub count: usize,
    /// Source lines of rows skipped for missing coordinates.
    pub skipped: Vec<usize>,
}

impl RouteCollection {
    /// Re-sum totals in route order, e.g. after enrichment replaced distances.
    pub fn recompute_totals(&mut self) {
        self.count = self.routes.len();
        self.total_km = self.routes.iter().map(|r| r.dist_km).sum();
    }
}

fn build_record(
    table: &ValidatedTable,
    id: usize,
    row: &ValidatedRow,
    speed_kmh: f64,
) -> Option<RouteRecord> {
    let (lon_a, lat_a, lon_b, lat_b) = row.coords.complete()?;
    let origin = Coordinate::new(lon_a, lat_a);
    let destination = Coordinate::new(lon_b, lat_b);
    let dist_km = haversine_km(origin, destination);

    let cell = |name: &str| {
        table
            .column_index(name)
            .and_then(|i| row.cells.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(RouteRecord {
        id,
        line: row.line,
        origin,
        destination,
        origin_name: cell(ORIGIN_NAME_COLUMN).unwrap_or_else(|| format!("Origen {id}")),
        destination_name: cell(DESTINATION_NAME_COLUMN)
            .unwrap_or_else(|| format!("Destino {id}")),
        dist_km,
        time_min: estimate_travel_minutes(dist_km, speed_kmh),
        source: DistanceSource::Haversine,
        geometry: vec![origin.position(), destination.position()],
        passthrough: table
            .passthrough_columns()
            .map(|(i, name)| (name.to_string(), row.cells.get(i).cloned().unwrap_or_default()))
            .collect(),
    })
}

/// Compute straight-line routes for the first `limit` rows (all rows when
/// `None`). Rows missing a coordinate are skipped and reported, never fatal.
///
/// Totals are summed in row order.
#[tracing::instrument(level = "info", skip(table), fields(rows = table.len()))]
pub fn compute_routes(
    table: &ValidatedTable,
    limit: Option<NonZeroUsize>,
    speed_kmh: f64,
) -> RouteResult<RouteCollection> {
    if table.is_empty() {
        return Err(RouteError::NoData);
    }

    let take = limit.map_or(table.len(), NonZeroUsize::get);
    let mut out = RouteCollection::default();

    for (id, row) in table.rows.iter().enumerate().take(take) {
        match build_record(table, id, row, speed_kmh) {
            Some(route) => {
                out.total_km += route.dist_km;
                out.routes.push(route);
            }
            None => {
                warn!(line = row.line, "skipping row with missing coordinates");
                out.skipped.push(row.line);
            }
        }
    }
    out.count = out.routes.len();

    info!(
        routes = out.count,
        skipped = out.skipped.len(),
        total_km = out.total_km,
        "routes computed"
    );
    Ok(out)
}
