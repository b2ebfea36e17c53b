// src/config.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path, str::FromStr, time::Duration};
use tracing::debug;

/// What an upload does with rows whose coordinates could not be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Reject the whole upload if any row is invalid.
    #[default]
    Strict,
    /// Store the table; invalid rows are skipped at compute time.
    Lenient,
}

impl FromStr for ValidationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "lenient" => Ok(ValidationMode::Lenient),
            other => bail!("validation mode must be strict or lenient, got {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectionsConfig {
    pub access_token: String,
    pub profile: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Max in-flight directions requests per batch.
    pub concurrency: usize,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            profile: "driving".into(),
            base_url: "https://api.mapbox.com/directions/v5/mapbox".into(),
            timeout_secs: 10,
            concurrency: 4,
        }
    }
}

impl DirectionsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: ValidationMode,
    pub resolve_aliases: bool,
    pub average_speed_kmh: f64,
    pub invalid_preview_len: usize,
    pub max_upload_bytes: usize,
    /// Enrichment is off unless this is set.
    pub directions: Option<DirectionsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Strict,
            resolve_aliases: true,
            average_speed_kmh: 30.0,
            invalid_preview_len: 15,
            max_upload_bytes: 50 * 1024 * 1024,
            directions: None,
        }
    }
}

impl Config {
    /// Load from the YAML file named by `ROUTES_CONFIG` (if any), then apply
    /// environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match env::var("ROUTES_CONFIG") {
            Ok(path) => Self::read_yaml_file(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_env_overrides()?;
        cfg.check()?;
        Ok(cfg)
    }

    /// Load and check a YAML config file, without environment overrides.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let cfg = Self::read_yaml_file(path)?;
        cfg.check()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(cfg)
    }

    fn read_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let cfg: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config file");
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(token) = env::var("MAPBOX_TOKEN") {
            if !token.trim().is_empty() {
                self.directions.get_or_insert_with(Default::default).access_token = token;
            }
        }
        if let Ok(mode) = env::var("ROUTES_MODE") {
            self.mode = mode.parse().context("ROUTES_MODE")?;
        }
        if let Ok(speed) = env::var("ROUTES_SPEED_KMH") {
            self.average_speed_kmh = speed
                .trim()
                .parse()
                .with_context(|| format!("ROUTES_SPEED_KMH is not a number: {speed:?}"))?;
        }
        Ok(())
    }

    /// Reject settings that would produce non-finite travel times or a
    /// directions client that cannot run.
    pub fn check(&self) -> Result<()> {
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            bail!("average_speed_kmh must be positive, got {}", self.average_speed_kmh);
        }
        if let Some(d) = &self.directions {
            if d.access_token.is_empty() {
                bail!("directions configured without an access_token");
            }
            if d.concurrency == 0 {
                bail!("directions.concurrency must be at least 1");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.mode, ValidationMode::Strict);
        assert_eq!(cfg.invalid_preview_len, 15);
        assert_eq!(cfg.average_speed_kmh, 30.0);
        assert!(cfg.directions.is_none());
    }

    #[test]
    fn yaml_file_fills_unspecified_fields_with_defaults() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(
            tmp,
            "mode: lenient\ndirections:\n  access_token: abc\n  timeout_secs: 3\n"
        )?;
        let cfg = Config::from_yaml_file(tmp.path())?;
        assert_eq!(cfg.mode, ValidationMode::Lenient);
        assert!(cfg.resolve_aliases);
        let d = cfg.directions.as_ref().expect("directions section");
        assert_eq!(d.access_token, "abc");
        assert_eq!(d.timeout(), Duration::from_secs(3));
        assert_eq!(d.profile, "driving");
        cfg.check()
    }

    #[test]
    fn rejects_non_positive_speed() {
        let cfg = Config {
            average_speed_kmh: 0.0,
            ..Config::default()
        };
        assert!(cfg.check().is_err());
    }

    #[test]
    fn yaml_file_with_zero_speed_is_rejected() -> Result<()> {
        for speed in ["0", "-12.5"] {
            let mut tmp = NamedTempFile::new()?;
            writeln!(tmp, "average_speed_kmh: {speed}")?;
            let err = Config::from_yaml_file(tmp.path()).unwrap_err();
            assert!(
                format!("{err:#}").contains("average_speed_kmh must be positive"),
                "unexpected error: {err:#}"
            );
        }
        Ok(())
    }

    #[test]
    fn mode_parsing_is_case_insensitive() {
        assert_eq!(" Lenient ".parse::<ValidationMode>().unwrap(), ValidationMode::Lenient);
        assert_eq!("STRICT".parse::<ValidationMode>().unwrap(), ValidationMode::Strict);
        assert!("loose".parse::<ValidationMode>().is_err());
    }
}
