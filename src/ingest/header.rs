use once_cell::sync::Lazy;
use regex::Regex;

pub const LONGITUD_A: &str = "longitud_a";
pub const LATITUD_A: &str = "latitud_a";
pub const LONGITUD_B: &str = "longitud_b";
pub const LATITUD_B: &str = "latitud_b";

/// The four coordinate columns, in the order they are reported.
pub const REQUIRED_COLUMNS: [&str; 4] = [LONGITUD_A, LATITUD_A, LONGITUD_B, LATITUD_B];

/// Accepted spellings per required column, canonical name first.
static ALIASES: &[(&str, &[&str])] = &[
    (LONGITUD_A, &["longitud_a", "longitude_a", "long_a", "lng_a"]),
    (LATITUD_A, &["latitud_a", "latitude_a", "lat_a"]),
    (LONGITUD_B, &["longitud_b", "longitude_b", "long_b", "lng_b"]),
    (LATITUD_B, &["latitud_b", "latitude_b", "lat_b"]),
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Lowercase, trim, and collapse inner whitespace runs to `_`.
pub fn normalize_header(raw: &str) -> String {
    WHITESPACE
        .replace_all(raw.trim(), "_")
        .to_lowercase()
}

/// Rename the first alias found for each required column that is not present
/// under its canonical name. Returns the `(from, to)` renames applied.
pub fn resolve_aliases(headers: &mut [String]) -> Vec<(String, String)> {
    let mut renamed = Vec::new();
    for (canonical, alternatives) in ALIASES {
        if headers.iter().any(|h| h == canonical) {
            continue;
        }
        let hit = alternatives
            .iter()
            .find_map(|alt| headers.iter().position(|h| h == alt));
        if let Some(pos) = hit {
            let from = std::mem::replace(&mut headers[pos], canonical.to_string());
            renamed.push((from, canonical.to_string()));
        }
    }
    renamed
}

/// Required columns absent from `headers`, in reporting order.
pub fn missing_required(headers: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|req| !headers.iter().any(|h| h == *req))
        .map(|s| s.to_string())
        .collect()
}
