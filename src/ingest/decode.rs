use crate::error::{RouteError, RouteResult};
use crate::ingest::raw_table::RawTable;
use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, trace};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings tried, in order, when reading an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Encoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "utf-8-sig")]
    Utf8Sig,
    #[serde(rename = "latin-1")]
    Latin1,
}

impl Encoding {
    pub const FALLBACK_ORDER: [Encoding; 3] =
        [Encoding::Utf8, Encoding::Utf8Sig, Encoding::Latin1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf8Sig => "utf-8-sig",
            Encoding::Latin1 => "latin-1",
        }
    }

    /// Decode `bytes` into text. Plain UTF-8 refuses a leading byte order
    /// mark so that the signature-aware candidate handles it.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, String> {
        match self {
            Encoding::Utf8 => {
                if bytes.starts_with(UTF8_BOM) {
                    return Err("byte order mark present".into());
                }
                std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|e| e.to_string())
            }
            Encoding::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body)
                    .map(str::to_owned)
                    .map_err(|e| e.to_string())
            }
            // Every byte is a valid Latin-1 code point.
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Pick the delimiter that occurs most often on the header line.
/// Comma wins ties and header lines without any candidate.
pub fn sniff_delimiter(text: &str) -> u8 {
    let first = text.lines().next().unwrap_or("");
    let mut best = (b',', first.matches(',').count());
    for cand in [b';', b'\t'] {
        let n = first.matches(cand as char).count();
        if n > best.1 {
            best = (cand, n);
        }
    }
    best.0
}

/// Parse decoded text as a header line followed by data records.
pub fn parse_table(text: &str) -> Result<RawTable, String> {
    let delimiter = sniff_delimiter(text);
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err("no header line".into());
    }

    let width = headers.len();
    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format!("record {}: {}", idx + 1, e))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        if record.len() > width {
            trace!(line, fields = record.len(), width, "dropping cells beyond header width");
        }
        let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
        lines.push(line);
    }

    Ok(RawTable {
        headers,
        rows,
        lines,
    })
}

/// Try each candidate encoding in order; the first one that both decodes and
/// parses wins. The error carries the last attempt's failure.
pub fn read_table(bytes: &[u8]) -> RouteResult<(RawTable, Encoding)> {
    let mut last_err = String::from("no encodings attempted");
    for enc in Encoding::FALLBACK_ORDER {
        match enc.decode(bytes).and_then(|text| parse_table(&text)) {
            Ok(table) => {
                debug!(encoding = enc.as_str(), rows = table.len(), "table decoded");
                return Ok((table, enc));
            }
            Err(e) => {
                debug!(encoding = enc.as_str(), error = %e, "decode attempt failed");
                last_err = e;
            }
        }
    }
    Err(RouteError::Decode {
        tried: Encoding::FALLBACK_ORDER.iter().map(Encoding::as_str).collect(),
        detail: last_err,
    })
}
