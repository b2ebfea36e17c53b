/// Coerce a raw cell into a coordinate value. A comma is read as the decimal
/// separator. Empty, unparsable or non-finite input yields `None`.
///
/// Cells arrive already unquoted by the CSV reader, so any quote left in the
/// text is part of the value and makes it unparsable.
pub fn coerce_coordinate(raw: &str) -> Option<f64> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Which half of a coordinate pair a value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Longitude,
    Latitude,
}

impl Axis {
    pub fn in_range(&self, v: f64) -> bool {
        match self {
            Axis::Longitude => (-180.0..=180.0).contains(&v),
            Axis::Latitude => (-90.0..=90.0).contains(&v),
        }
    }
}
