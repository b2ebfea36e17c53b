/// A delimited table as read from the upload, before any normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names exactly as they appear in the header line.
    pub headers: Vec<String>,
    /// Each data record, one String per field. Short records are padded with
    /// empty cells to the header width.
    pub rows: Vec<Vec<String>>,
    /// 1-based source line of each row (header is line 1).
    pub lines: Vec<usize>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
