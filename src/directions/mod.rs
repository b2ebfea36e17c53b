//! Optional enrichment of straight-line routes with a directions service.
//!
//! Any failure here degrades to the haversine estimate for that row; nothing
//! is surfaced to callers.

use crate::config::DirectionsConfig;
use crate::routes::haversine::{round2, Coordinate};
use crate::routes::{DistanceSource, RouteCollection};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum DirectionsError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(u16),

    #[error("bad request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unreadable response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no route between points")]
    NoRoute,
}

/// A routed path as reported by a directions service.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedRoute {
    pub geometry: Vec<[f64; 2]>,
    pub distance_km: f64,
    pub duration_min: f64,
}

pub trait DirectionsProvider: Send + Sync {
    fn route(&self, from: Coordinate, to: Coordinate)
        -> BoxFuture<'_, Result<DirectedRoute, DirectionsError>>;
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Deserialize)]
struct ApiRoute {
    geometry: ApiGeometry,
    /// metres
    distance: f64,
    /// seconds
    duration: f64,
}

#[derive(Deserialize)]
struct ApiGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Take the first route of a Mapbox-style directions response.
pub fn parse_response(body: &str) -> Result<DirectedRoute, DirectionsError> {
    let resp: ApiResponse = serde_json::from_str(body)?;
    let first = resp.routes.into_iter().next().ok_or(DirectionsError::NoRoute)?;
    Ok(DirectedRoute {
        geometry: first.geometry.coordinates,
        distance_km: first.distance / 1000.0,
        duration_min: first.duration / 60.0,
    })
}

/// Mapbox Directions API client.
pub struct MapboxDirections {
    client: Client,
    cfg: DirectionsConfig,
}

impl MapboxDirections {
    pub fn new(cfg: DirectionsConfig) -> Result<Self, DirectionsError> {
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self { client, cfg })
    }

    pub fn request_url(&self, from: Coordinate, to: Coordinate) -> Result<Url, DirectionsError> {
        let mut url = Url::parse(&format!(
            "{}/{}/{},{};{},{}",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.profile,
            from.lon,
            from.lat,
            to.lon,
            to.lat
        ))?;
        url.query_pairs_mut()
            .append_pair("access_token", &self.cfg.access_token)
            .append_pair("geometries", "geojson")
            .append_pair("overview", "full");
        Ok(url)
    }
}

impl DirectionsProvider for MapboxDirections {
    fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> BoxFuture<'_, Result<DirectedRoute, DirectionsError>> {
        async move {
            let url = self.request_url(from, to)?;
            let resp = self.client.get(url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(DirectionsError::Status(status.as_u16()));
            }
            let body = resp.text().await?;
            parse_response(&body)
        }
        .boxed()
    }
}

/// Replace each route's straight line with a routed path where the provider
/// answers within `timeout`. At most `concurrency` lookups run at once; a
/// failed or slow lookup leaves that route untouched.
#[tracing::instrument(level = "info", skip_all, fields(routes = routes.routes.len()))]
pub async fn enrich_routes(
    mut routes: RouteCollection,
    provider: Arc<dyn DirectionsProvider>,
    concurrency: usize,
    timeout: Duration,
) -> RouteCollection {
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(routes.routes.len());

    for (pos, route) in routes.routes.iter().enumerate() {
        let provider = Arc::clone(&provider);
        let sem = Arc::clone(&sem);
        let (from, to, line) = (route.origin, route.destination, route.line);

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return None;
            };
            match tokio::time::timeout(timeout, provider.route(from, to)).await {
                // a route needs two points to draw; treat anything less as no route
                Ok(Ok(directed)) if directed.geometry.len() < 2 => {
                    warn!(
                        line,
                        points = directed.geometry.len(),
                        error = %DirectionsError::NoRoute,
                        "directions unavailable, keeping straight line"
                    );
                    None
                }
                Ok(Ok(directed)) => Some((pos, directed)),
                Ok(Err(e)) => {
                    warn!(line, error = %e, "directions unavailable, keeping straight line");
                    None
                }
                Err(_) => {
                    warn!(line, ?timeout, "directions timed out, keeping straight line");
                    None
                }
            }
        }));
    }

    let mut enriched = 0usize;
    for h in handles {
        match h.await {
            Ok(Some((pos, directed))) => {
                let route = &mut routes.routes[pos];
                route.geometry = directed.geometry;
                route.dist_km = directed.distance_km;
                route.time_min = round2(directed.duration_min);
                route.source = DistanceSource::Directions;
                debug!(line = route.line, dist_km = route.dist_km, "route enriched");
                enriched += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "directions task failed"),
        }
    }

    routes.recompute_totals();
    info!(
        enriched,
        fallback = routes.count - enriched,
        total_km = routes.total_km,
        "enrichment finished"
    );
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{decode::parse_table, normalize_and_validate, ValidateOptions};
    use crate::routes::compute_routes;

    /// Answers with a fixed 3-point route, fails west of -77.05 and stalls on
    /// the exact origin (-77.03, -12.0).
    struct FakeProvider;

    impl DirectionsProvider for FakeProvider {
        fn route(
            &self,
            from: Coordinate,
            to: Coordinate,
        ) -> BoxFuture<'_, Result<DirectedRoute, DirectionsError>> {
            async move {
                if from.lon < -77.05 {
                    return Err(DirectionsError::NoRoute);
                }
                if from.lon == -77.03 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok(DirectedRoute {
                    geometry: vec![from.position(), [from.lon, to.lat], to.position()],
                    distance_km: 10.0,
                    duration_min: 20.004,
                })
            }
            .boxed()
        }
    }

    fn sample_routes() -> RouteCollection {
        let text = "longitud_a,latitud_a,longitud_b,latitud_b\n\
                    -77.01,-12.0,-77.5,-12.5\n\
                    -77.03,-12.0,-77.5,-12.5\n\
                    -77.09,-12.0,-77.5,-12.5\n\
                    -77.02,-12.0,-77.5,-12.5\n";
        let t = normalize_and_validate(parse_table(text).unwrap(), &ValidateOptions::default())
            .unwrap();
        compute_routes(&t, None, 30.0).unwrap()
    }

    #[tokio::test]
    async fn failures_and_timeouts_fall_back_per_row() {
        let base = sample_routes();
        let out = enrich_routes(
            base.clone(),
            Arc::new(FakeProvider),
            2,
            Duration::from_millis(100),
        )
        .await;

        let sources: Vec<_> = out.routes.iter().map(|r| r.source).collect();
        assert_eq!(
            sources,
            vec![
                DistanceSource::Directions,
                DistanceSource::Haversine,
                DistanceSource::Haversine,
                DistanceSource::Directions,
            ]
        );
        assert_eq!(out.routes[0].dist_km, 10.0);
        assert_eq!(out.routes[0].time_min, 20.0);
        assert_eq!(out.routes[0].geometry.len(), 3);
        assert_eq!(out.routes[1], base.routes[1]);
        assert_eq!(out.routes[2], base.routes[2]);

        let expected = 10.0 + base.routes[1].dist_km + base.routes[2].dist_km + 10.0;
        assert!((out.total_km - expected).abs() < 1e-9);
        assert_eq!(out.count, 4);
    }

    /// Answers every lookup with a single-point geometry.
    struct PointOnlyProvider;

    impl DirectionsProvider for PointOnlyProvider {
        fn route(
            &self,
            from: Coordinate,
            _to: Coordinate,
        ) -> BoxFuture<'_, Result<DirectedRoute, DirectionsError>> {
            async move {
                Ok(DirectedRoute {
                    geometry: vec![from.position()],
                    distance_km: 99.0,
                    duration_min: 99.0,
                })
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn short_geometry_keeps_the_whole_straight_line_record() {
        let base = sample_routes();
        let out = enrich_routes(
            base.clone(),
            Arc::new(PointOnlyProvider),
            4,
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(out.routes, base.routes);
        assert!(out.routes.iter().all(|r| r.source == DistanceSource::Haversine));
        assert!((out.total_km - base.total_km).abs() < 1e-9);
    }

    #[test]
    fn parses_first_route_of_response() {
        let body = r#"{"routes":[{"geometry":{"type":"LineString","coordinates":[[-77.0,-12.0],[-77.05,-12.02],[-77.1,-12.1]]},"distance":15234.0,"duration":1800.0,"legs":[]}],"code":"Ok"}"#;
        let r = parse_response(body).unwrap();
        assert_eq!(r.geometry.len(), 3);
        assert_eq!(r.distance_km, 15.234);
        assert_eq!(r.duration_min, 30.0);
    }

    #[test]
    fn empty_route_list_is_no_route() {
        let err = parse_response(r#"{"routes":[],"code":"NoRoute"}"#).unwrap_err();
        assert!(matches!(err, DirectionsError::NoRoute));
        assert!(matches!(parse_response("not json"), Err(DirectionsError::Decode(_))));
    }

    #[test]
    fn request_url_uses_lon_lat_order() {
        let client = MapboxDirections::new(DirectionsConfig {
            access_token: "tok".into(),
            base_url: "https://api.example.test/directions/v5/mapbox/".into(),
            ..Default::default()
        })
        .unwrap();
        let url = client
            .request_url(Coordinate::new(-77.0, -12.0), Coordinate::new(-77.1, -12.1))
            .unwrap();
        assert_eq!(url.path(), "/directions/v5/mapbox/driving/-77,-12;-77.1,-12.1");
        let query: Vec<_> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("access_token".into(), "tok".into())));
        assert!(query.contains(&("geometries".into(), "geojson".into())));
    }
}
