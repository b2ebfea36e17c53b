use thiserror::Error;

/// Result type for upload and compute operations
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors surfaced to callers of the upload/compute operations.
///
/// Per-row coercion defects are not represented here: they are collected in
/// [`crate::ingest::ValidationReport`] and never abort a batch.
#[derive(Error, Debug)]
pub enum RouteError {
    /// No candidate encoding produced a parseable table
    #[error("could not read table with encodings [{}]: {detail}", .tried.join(", "))]
    Decode {
        tried: Vec<&'static str>,
        detail: String,
    },

    /// Required columns are absent after header normalization
    #[error("missing required columns: {}", .missing.join(", "))]
    Schema {
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// Strict-mode rejection of a table with invalid coordinate rows
    #[error("{count} rows with invalid coordinates (lines: {preview:?})")]
    InvalidRows { count: usize, preview: Vec<usize> },

    /// Compute requested before any table was stored, or the table is empty
    #[error("no data loaded")]
    NoData,

    #[error("upload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RouteError {
    /// Human-readable error list for structured responses.
    pub fn messages(&self) -> Vec<String> {
        match self {
            RouteError::Schema { missing, found } => vec![
                format!("missing required columns: {}", missing.join(", ")),
                format!("columns found (normalized): {}", found.join(", ")),
            ],
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_missing_and_found() {
        let err = RouteError::Schema {
            missing: vec!["latitud_b".into()],
            found: vec!["longitud_a".into(), "latitud_a".into()],
        };
        let msgs = err.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], "missing required columns: latitud_b");
        assert!(msgs[1].contains("longitud_a, latitud_a"));
    }

    #[test]
    fn invalid_rows_message_carries_preview() {
        let err = RouteError::InvalidRows {
            count: 2,
            preview: vec![3, 7],
        };
        assert_eq!(
            err.messages(),
            vec!["2 rows with invalid coordinates (lines: [3, 7])".to_string()]
        );
    }

    #[test]
    fn decode_error_names_every_attempt() {
        let err = RouteError::Decode {
            tried: vec!["utf-8", "utf-8-sig", "latin-1"],
            detail: "empty input".into(),
        };
        assert_eq!(
            err.to_string(),
            "could not read table with encodings [utf-8, utf-8-sig, latin-1]: empty input"
        );
    }
}
