//! Compute side of the pipeline: [`ValidatedTable`](crate::ingest::ValidatedTable)
//! → [`RouteCollection`] → GeoJSON.

pub mod engine;
pub mod geojson;
pub mod haversine;

pub use engine::{compute_routes, DistanceSource, RouteCollection, RouteRecord};
pub use geojson::{to_feature_collection, Feature, FeatureCollection, Geometry};
pub use haversine::{haversine_km, Coordinate, EARTH_RADIUS_KM};
