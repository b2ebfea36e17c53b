//! Upload and compute operations over a [`DatasetStore`].

use crate::config::{Config, ValidationMode};
use crate::directions::{enrich_routes, DirectionsProvider, MapboxDirections};
use crate::error::{RouteError, RouteResult};
use crate::ingest::{normalize_and_validate, read_table, Encoding, ValidateOptions};
use crate::routes::{compute_routes, to_feature_collection, FeatureCollection, RouteCollection};
use crate::store::{DatasetStore, SessionId};
use serde::Serialize;
use std::{collections::BTreeMap, num::NonZeroUsize, sync::Arc};
use tracing::{info, warn};

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub rows: usize,
    pub invalid_rows: usize,
    pub invalid_preview: Vec<usize>,
    pub columns: Vec<String>,
    pub encoding: Encoding,
    pub preview: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeSummary {
    pub total_routes: usize,
    pub total_km: f64,
    pub skipped_rows: Vec<usize>,
    pub geojson: FeatureCollection,
}

impl From<&RouteCollection> for ComputeSummary {
    fn from(routes: &RouteCollection) -> Self {
        Self {
            total_routes: routes.count,
            total_km: routes.total_km,
            skipped_rows: routes.skipped.clone(),
            geojson: to_feature_collection(routes),
        }
    }
}

/// Structured failure body for upload/compute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
}

impl From<&RouteError> for ErrorResponse {
    fn from(err: &RouteError) -> Self {
        Self {
            errors: err.messages(),
        }
    }
}

pub struct RouteService {
    config: Config,
    store: DatasetStore,
    directions: Option<Arc<dyn DirectionsProvider>>,
}

impl RouteService {
    pub fn new(config: Config, store: DatasetStore) -> Self {
        Self {
            config,
            store,
            directions: None,
        }
    }

    /// Check `config`, then build a service, wiring the Mapbox client when
    /// directions are configured.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        config.check()?;
        let directions = match &config.directions {
            Some(d) => {
                let client = MapboxDirections::new(d.clone())?;
                Some(Arc::new(client) as Arc<dyn DirectionsProvider>)
            }
            None => None,
        };
        Ok(Self {
            config,
            store: DatasetStore::new(),
            directions,
        })
    }

    pub fn with_directions(mut self, provider: Arc<dyn DirectionsProvider>) -> Self {
        self.directions = Some(provider);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    fn validate_options(&self) -> ValidateOptions {
        ValidateOptions {
            resolve_aliases: self.config.resolve_aliases,
            preview_len: self.config.invalid_preview_len,
        }
    }

    /// Decode, validate and store a table for `session`. The stored table is
    /// only replaced once validation has fully succeeded.
    #[tracing::instrument(
        level = "info",
        skip(self, bytes),
        fields(session = session.as_str(), bytes = bytes.len())
    )]
    pub fn upload(&self, session: &SessionId, bytes: &[u8]) -> RouteResult<UploadSummary> {
        let limit = self.config.max_upload_bytes;
        if bytes.len() > limit {
            return Err(RouteError::PayloadTooLarge {
                size: bytes.len(),
                limit,
            });
        }

        let (raw, encoding) = read_table(bytes)?;
        let table = normalize_and_validate(raw, &self.validate_options())?;

        if !table.report.is_clean() {
            match self.config.mode {
                ValidationMode::Strict => {
                    warn!(invalid = table.report.invalid_count(), "upload rejected");
                    return Err(table.report.to_error());
                }
                ValidationMode::Lenient => {
                    for msg in table.report.messages() {
                        warn!("{}", msg);
                    }
                }
            }
        }

        let summary = UploadSummary {
            rows: table.len(),
            invalid_rows: table.report.invalid_count(),
            invalid_preview: table.report.invalid_preview(),
            columns: table.headers.clone(),
            encoding,
            preview: table.preview(PREVIEW_ROWS),
        };
        self.store.replace(session, table);
        info!(rows = summary.rows, encoding = encoding.as_str(), "table stored");
        Ok(summary)
    }

    /// Straight-line routes for the session's stored table.
    pub fn compute(
        &self,
        session: &SessionId,
        limit: Option<NonZeroUsize>,
    ) -> RouteResult<RouteCollection> {
        let table = self.store.get(session).ok_or(RouteError::NoData)?;
        compute_routes(&table, limit, self.config.average_speed_kmh)
    }

    /// Like [`compute`](Self::compute), then enriched through the directions
    /// provider when one is configured.
    pub async fn compute_enriched(
        &self,
        session: &SessionId,
        limit: Option<NonZeroUsize>,
    ) -> RouteResult<RouteCollection> {
        let routes = self.compute(session, limit)?;
        let Some(provider) = &self.directions else {
            return Ok(routes);
        };
        let limits = self.config.directions.clone().unwrap_or_default();
        Ok(enrich_routes(routes, Arc::clone(provider), limits.concurrency, limits.timeout()).await)
    }
}
