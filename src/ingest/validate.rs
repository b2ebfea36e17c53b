use crate::error::{RouteError, RouteResult};
use crate::ingest::convert::{coerce_coordinate, Axis};
use crate::ingest::header::{missing_required, normalize_header, resolve_aliases, REQUIRED_COLUMNS};
use crate::ingest::raw_table::RawTable;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const AXES: [Axis; 4] = [Axis::Longitude, Axis::Latitude, Axis::Longitude, Axis::Latitude];

#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions {
    pub resolve_aliases: bool,
    /// How many invalid line numbers to keep in diagnostics.
    pub preview_len: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            resolve_aliases: true,
            preview_len: 15,
        }
    }
}

/// The four coerced coordinates of a row. `None` means "no value".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CoordinateSet {
    pub longitud_a: Option<f64>,
    pub latitud_a: Option<f64>,
    pub longitud_b: Option<f64>,
    pub latitud_b: Option<f64>,
}

impl CoordinateSet {
    fn from_values(v: [Option<f64>; 4]) -> Self {
        Self {
            longitud_a: v[0],
            latitud_a: v[1],
            longitud_b: v[2],
            latitud_b: v[3],
        }
    }

    /// `(lon_a, lat_a, lon_b, lat_b)` when all four are present.
    pub fn complete(&self) -> Option<(f64, f64, f64, f64)> {
        Some((
            self.longitud_a?,
            self.latitud_a?,
            self.longitud_b?,
            self.latitud_b?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    /// 1-based source line.
    pub line: usize,
    pub coords: CoordinateSet,
    /// All cells, aligned with [`ValidatedTable::headers`].
    pub cells: Vec<String>,
}

impl ValidatedRow {
    pub fn is_valid(&self) -> bool {
        self.coords.complete().is_some()
    }
}

/// A row whose coordinates could not all be coerced. Non-fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDefect {
    pub line: usize,
    pub columns: Vec<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_rows: usize,
    pub defects: Vec<RowDefect>,
    /// Lines with a coordinate outside the valid lon/lat range. Warning only.
    pub out_of_range: Vec<usize>,
    #[serde(skip)]
    preview_len: usize,
}

impl ValidationReport {
    pub fn invalid_count(&self) -> usize {
        self.defects.len()
    }

    /// First invalid line numbers, bounded for diagnostics.
    pub fn invalid_preview(&self) -> Vec<usize> {
        self.defects
            .iter()
            .take(self.preview_len)
            .map(|d| d.line)
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    /// Human-readable diagnostics; empty when every row is valid.
    pub fn messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.defects.is_empty() {
            out.push(format!(
                "{} rows with invalid coordinates (lines: {:?})",
                self.invalid_count(),
                self.invalid_preview()
            ));
        }
        out
    }

    pub fn to_error(&self) -> RouteError {
        RouteError::InvalidRows {
            count: self.invalid_count(),
            preview: self.invalid_preview(),
        }
    }
}

/// A normalized table with the four coordinate columns present and coerced.
/// Invalid rows are kept and flagged, not removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTable {
    pub headers: Vec<String>,
    pub rows: Vec<ValidatedRow>,
    pub report: ValidationReport,
}

impl ValidatedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Every non-coordinate column as `(index, name)`, in source order.
    pub fn passthrough_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !REQUIRED_COLUMNS.contains(&h.as_str()))
            .map(|(i, h)| (i, h.as_str()))
    }

    /// First `n` rows as header→cell maps. A duplicated header keeps its
    /// first column's cell, matching coordinate resolution.
    pub fn preview(&self, n: usize) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| {
                let mut map = BTreeMap::new();
                for (h, cell) in self.headers.iter().zip(&row.cells) {
                    map.entry(h.clone()).or_insert_with(|| cell.clone());
                }
                map
            })
            .collect()
    }
}

/// Normalize headers, check the required columns, and coerce coordinates.
///
/// Fails only on a missing required column; per-row coercion failures land in
/// the returned table's [`ValidationReport`].
#[tracing::instrument(level = "debug", skip(raw, opts), fields(rows = raw.len()))]
pub fn normalize_and_validate(
    raw: RawTable,
    opts: &ValidateOptions,
) -> RouteResult<ValidatedTable> {
    let RawTable {
        headers,
        rows,
        lines,
    } = raw;

    let mut headers: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    if opts.resolve_aliases {
        for (from, to) in resolve_aliases(&mut headers) {
            info!(from = %from, to = %to, "resolved column alias");
        }
    }

    // first occurrence wins on duplicate names
    let positions: Option<Vec<usize>> = REQUIRED_COLUMNS
        .iter()
        .map(|req| headers.iter().position(|h| h == req))
        .collect();
    let Some(idx) = positions else {
        let missing = missing_required(&headers);
        warn!(?missing, "required columns absent");
        return Err(RouteError::Schema {
            missing,
            found: headers,
        });
    };

    let mut report = ValidationReport {
        total_rows: rows.len(),
        preview_len: opts.preview_len,
        ..Default::default()
    };
    let mut out = Vec::with_capacity(rows.len());

    for (cells, line) in rows.into_iter().zip(lines) {
        let mut values = [None; 4];
        let mut bad = Vec::new();
        for (slot, (&col, name)) in idx.iter().zip(REQUIRED_COLUMNS).enumerate() {
            values[slot] = cells.get(col).and_then(|c| coerce_coordinate(c));
            match values[slot] {
                None => bad.push(name),
                Some(v) if !AXES[slot].in_range(v) => {
                    if report.out_of_range.last() != Some(&line) {
                        report.out_of_range.push(line);
                    }
                }
                Some(_) => {}
            }
        }
        if !bad.is_empty() {
            debug!(line, columns = ?bad, "row has missing coordinates");
            report.defects.push(RowDefect { line, columns: bad });
        }
        out.push(ValidatedRow {
            line,
            coords: CoordinateSet::from_values(values),
            cells,
        });
    }

    if !report.out_of_range.is_empty() {
        warn!(
            count = report.out_of_range.len(),
            lines = ?&report.out_of_range[..report.out_of_range.len().min(opts.preview_len)],
            "coordinates outside lon/lat range"
        );
    }

    Ok(ValidatedTable {
        headers,
        rows: out,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::decode::parse_table;

    fn table(text: &str) -> RawTable {
        parse_table(text).expect("test table parses")
    }

    #[test]
    fn headers_are_normalized_and_coordinates_coerced() {
        let raw = table(
            "Longitud A,Latitud A,LONGITUD  B, latitud_b ,Nombre Origen\n\"-77,03\",,-77.1,-12.1,Colegio\n",
        );
        let t = normalize_and_validate(raw, &ValidateOptions::default()).unwrap();
        assert_eq!(
            t.headers,
            vec!["longitud_a", "latitud_a", "longitud_b", "latitud_b", "nombre_origen"]
        );
        assert_eq!(t.rows[0].coords.longitud_a, Some(-77.03));
        assert_eq!(t.rows[0].coords.latitud_a, None);
        assert_eq!(t.rows[0].cells[4], "Colegio");
        assert_eq!(t.report.invalid_count(), 1);
    }

    #[test]
    fn missing_column_fails_before_row_processing() {
        let raw = table("longitud_a,latitud_a,longitud_b\n1,2,3\n");
        let err = normalize_and_validate(raw, &ValidateOptions::default()).unwrap_err();
        match err {
            RouteError::Schema { missing, found } => {
                assert_eq!(missing, vec!["latitud_b"]);
                assert_eq!(found.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_rows_are_flagged_not_dropped() {
        let mut text = String::from("longitud_a,latitud_a,longitud_b,latitud_b\n");
        for i in 0..10 {
            // row at line 5 has an empty longitud_a
            let lon = if i == 3 { String::new() } else { format!("-77.{i}") };
            text.push_str(&format!("{lon},-12.0,-77.5,-12.5\n"));
        }
        let t = normalize_and_validate(table(&text), &ValidateOptions::default()).unwrap();
        assert_eq!(t.len(), 10);
        assert_eq!(t.report.invalid_count(), 1);
        assert_eq!(t.report.invalid_preview(), vec![5]);
        assert_eq!(t.report.defects[0].columns, vec!["longitud_a"]);
        assert!(!t.rows[3].is_valid());
        assert_eq!(
            t.report.messages(),
            vec!["1 rows with invalid coordinates (lines: [5])".to_string()]
        );
    }

    #[test]
    fn preview_is_bounded() {
        let mut text = String::from("longitud_a,latitud_a,longitud_b,latitud_b\n");
        for _ in 0..20 {
            text.push_str("x,1,2,3\n");
        }
        let opts = ValidateOptions {
            preview_len: 15,
            ..Default::default()
        };
        let t = normalize_and_validate(table(&text), &opts).unwrap();
        assert_eq!(t.report.invalid_count(), 20);
        let preview = t.report.invalid_preview();
        assert_eq!(preview.len(), 15);
        assert_eq!(preview[0], 2);
        assert_eq!(preview[14], 16);
    }

    #[test]
    fn aliases_are_resolved_when_enabled() {
        let text = "lng_a,lat_a,lng_b,lat_b\n1,2,3,4\n";
        let t = normalize_and_validate(table(text), &ValidateOptions::default()).unwrap();
        assert!(t.report.is_clean());

        let strict = ValidateOptions {
            resolve_aliases: false,
            ..Default::default()
        };
        let err = normalize_and_validate(table(text), &strict).unwrap_err();
        assert!(matches!(err, RouteError::Schema { ref missing, .. } if missing.len() == 4));
    }

    #[test]
    fn out_of_range_is_a_warning_not_a_defect() {
        let text = "longitud_a,latitud_a,longitud_b,latitud_b\n-12.0,-77.0,-77.1,-12.1\n";
        let t = normalize_and_validate(table(text), &ValidateOptions::default()).unwrap();
        assert!(t.report.is_clean());
        assert_eq!(t.report.out_of_range, vec![2]);
    }

    #[test]
    fn passthrough_and_preview_keep_extra_columns() {
        let text = "nombre_origen,longitud_a,latitud_a,longitud_b,latitud_b,accesibilidad\nA,1,2,3,4,Rampa\n";
        let t = normalize_and_validate(table(text), &ValidateOptions::default()).unwrap();
        let extra: Vec<_> = t.passthrough_columns().collect();
        assert_eq!(extra, vec![(0, "nombre_origen"), (5, "accesibilidad")]);
        let preview = t.preview(5);
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0]["accesibilidad"], "Rampa");
    }

    #[test]
    fn duplicate_headers_resolve_to_first_column_everywhere() {
        let text = "Nota,longitud_a,latitud_a,longitud_b,latitud_b,nota,Longitud A\n\
                    primera,-77.0,-12.0,-77.1,-12.1,segunda,-70.0\n";
        let t = normalize_and_validate(table(text), &ValidateOptions::default()).unwrap();
        assert_eq!(t.rows[0].coords.longitud_a, Some(-77.0));
        let preview = t.preview(1);
        assert_eq!(preview[0]["nota"], "primera");
        assert_eq!(preview[0]["longitud_a"], "-77.0");
        assert_eq!(preview[0].len(), 5);
    }
}
